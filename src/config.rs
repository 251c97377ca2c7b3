//! TOML configuration.
//!
//! Every section has defaults matching the reference deployment (Gemini
//! embeddings and generation, 5000/500 character chunks, top-4 retrieval,
//! temperature 0.3), so running without a config file is supported.
//!
//! ```toml
//! [chunking]
//! chunk_size = 5000
//! chunk_overlap = 500
//!
//! [retrieval]
//! top_k = 4
//! metric = "cosine"
//!
//! [embedding]
//! provider = "gemini"
//! model = "models/embedding-001"
//!
//! [generation]
//! provider = "gemini"
//! model = "gemini-1.5-flash"
//! temperature = 0.3
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub chunking: ChunkingConfig,
    pub retrieval: RetrievalConfig,
    pub embedding: EmbeddingConfig,
    pub generation: GenerationConfig,
    pub history: HistoryConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum chunk length in characters.
    pub chunk_size: usize,
    /// Characters shared between neighboring chunks.
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 5000,
            chunk_overlap: 500,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    #[default]
    Cosine,
    L2,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
    pub metric: DistanceMetric,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 4,
            metric: DistanceMetric::Cosine,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: String,
    pub model: String,
    /// Overrides the provider's public endpoint (proxies, tests).
    pub base_url: Option<String>,
    pub batch_size: usize,
    /// Unset means no timeout.
    pub timeout_secs: Option<u64>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: "models/embedding-001".to_string(),
            base_url: None,
            batch_size: 100,
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GenerationConfig {
    pub provider: String,
    pub model: String,
    pub base_url: Option<String>,
    pub temperature: f64,
    pub timeout_secs: Option<u64>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: "gemini-1.5-flash".to_string(),
            base_url: None,
            temperature: 0.3,
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HistoryConfig {
    /// Number of trailing exchanges used as prompt context and shown after each answer.
    pub window: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { window: 5 }
    }
}

pub const PROVIDERS: &[&str] = &["gemini", "openai"];

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    config.validate()?;
    Ok(config)
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        // Validate chunking
        if self.chunking.chunk_size == 0 {
            anyhow::bail!("chunking.chunk_size must be > 0");
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            anyhow::bail!(
                "chunking.chunk_overlap ({}) must be smaller than chunking.chunk_size ({})",
                self.chunking.chunk_overlap,
                self.chunking.chunk_size
            );
        }

        // Validate retrieval
        if self.retrieval.top_k < 1 {
            anyhow::bail!("retrieval.top_k must be >= 1");
        }

        // Validate providers
        for (section, provider) in [
            ("embedding", &self.embedding.provider),
            ("generation", &self.generation.provider),
        ] {
            if !PROVIDERS.contains(&provider.as_str()) {
                anyhow::bail!(
                    "Unknown {} provider: '{}'. Must be one of: {}",
                    section,
                    provider,
                    PROVIDERS.join(", ")
                );
            }
        }
        if self.embedding.model.trim().is_empty() {
            anyhow::bail!("embedding.model must not be empty");
        }
        if self.generation.model.trim().is_empty() {
            anyhow::bail!("generation.model must not be empty");
        }
        if self.embedding.batch_size == 0 {
            anyhow::bail!("embedding.batch_size must be > 0");
        }
        if !(0.0..=2.0).contains(&self.generation.temperature) {
            anyhow::bail!("generation.temperature must be in [0.0, 2.0]");
        }

        if self.history.window == 0 {
            anyhow::bail!("history.window must be >= 1");
        }

        Ok(())
    }
}
