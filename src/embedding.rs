//! Embedding provider abstraction and implementations.
//!
//! Defines the [`EmbeddingProvider`] trait and the HTTP backends:
//! - **[`GeminiProvider`]**: Google Generative Language `batchEmbedContents`,
//!   with `RETRIEVAL_DOCUMENT` / `RETRIEVAL_QUERY` task types.
//! - **[`OpenAIProvider`]**: any OpenAI-compatible `/v1/embeddings` endpoint.
//!
//! Also provides the vector metrics used by the index:
//! - [`cosine_similarity`]: similarity between two embedding vectors
//! - [`l2_distance`]: Euclidean distance between two embedding vectors
//!
//! # Provider Selection
//!
//! Use [`create_provider`] to instantiate the configured provider. The
//! credential is passed in explicitly; nothing is read from or written to
//! the process environment.
//!
//! # Failures
//!
//! Every failure (non-2xx status, network error, malformed body) maps to
//! [`PipelineError::EmbeddingService`]. There is no retry.

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use crate::config::EmbeddingConfig;
use crate::error::PipelineError;
use crate::http;
use crate::models::Credential;

/// What an embedding will be used for. Providers that support it embed
/// stored passages and search queries differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskType {
    RetrievalDocument,
    RetrievalQuery,
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::RetrievalDocument => "RETRIEVAL_DOCUMENT",
            TaskType::RetrievalQuery => "RETRIEVAL_QUERY",
        }
    }
}

/// Trait for embedding providers.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Returns the model identifier (e.g. `"models/embedding-001"`).
    fn model_name(&self) -> &str;

    /// Embed a batch of document passages, one vector per input in input order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, PipelineError>;

    /// Embed a single search query.
    ///
    /// Defaults to a one-element [`embed`](EmbeddingProvider::embed) call for
    /// providers without a separate query mode.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, PipelineError> {
        first_vector(self.embed(&[text.to_string()]).await?)
    }
}

fn first_vector(results: Vec<Vec<f32>>) -> Result<Vec<f32>, PipelineError> {
    results
        .into_iter()
        .next()
        .ok_or_else(|| PipelineError::embedding("Empty embedding response"))
}

/// Create the configured [`EmbeddingProvider`].
///
/// | Config Value | Provider |
/// |-------------|----------|
/// | `"gemini"` | [`GeminiProvider`] |
/// | `"openai"` | [`OpenAIProvider`] |
pub fn create_provider(
    config: &EmbeddingConfig,
    credential: &Credential,
) -> Result<Box<dyn EmbeddingProvider>, PipelineError> {
    let client = http::build_client(config.timeout_secs)
        .map_err(|e| PipelineError::embedding(e.to_string()))?;
    match config.provider.as_str() {
        "gemini" => Ok(Box::new(GeminiProvider {
            client,
            base_url: http::base_url(config.base_url.as_deref(), http::GEMINI_BASE_URL),
            model: http::gemini_model_path(&config.model),
            credential: credential.clone(),
        })),
        "openai" => Ok(Box::new(OpenAIProvider {
            client,
            base_url: http::base_url(config.base_url.as_deref(), http::OPENAI_BASE_URL),
            model: config.model.clone(),
            credential: credential.clone(),
        })),
        other => Err(PipelineError::embedding(format!(
            "Unknown embedding provider: {}",
            other
        ))),
    }
}

// ============ Gemini Provider ============

/// Embedding provider using the Google Generative Language API.
///
/// Calls `POST {base}/v1beta/{model}:batchEmbedContents` with the API key in
/// the `x-goog-api-key` header.
pub struct GeminiProvider {
    client: reqwest::Client,
    base_url: String,
    /// Full model path, e.g. `"models/embedding-001"`.
    model: String,
    credential: Credential,
}

#[async_trait]
impl EmbeddingProvider for GeminiProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, PipelineError> {
        self.batch_embed(texts, TaskType::RetrievalDocument).await
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, PipelineError> {
        first_vector(
            self.batch_embed(&[text.to_string()], TaskType::RetrievalQuery)
                .await?,
        )
    }
}

impl GeminiProvider {
    async fn batch_embed(
        &self,
        texts: &[String],
        task: TaskType,
    ) -> Result<Vec<Vec<f32>>, PipelineError> {
        let url = format!("{}/v1beta/{}:batchEmbedContents", self.base_url, self.model);
        let body = gemini_request_body(&self.model, texts, task);

        debug!(
            model = %self.model,
            inputs = texts.len(),
            task = task.as_str(),
            "gemini embed request"
        );
        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", self.credential.expose())
            .json(&body)
            .send()
            .await
            .map_err(|e| PipelineError::embedding(e.to_string()))?;

        let json = read_json(resp).await?;
        parse_gemini_response(&json)
    }
}

fn gemini_request_body(model: &str, texts: &[String], task: TaskType) -> serde_json::Value {
    let requests: Vec<serde_json::Value> = texts
        .iter()
        .map(|t| {
            json!({
                "model": model,
                "content": { "parts": [{ "text": t }] },
                "taskType": task.as_str(),
            })
        })
        .collect();
    json!({ "requests": requests })
}

/// Parse a `batchEmbedContents` response: `embeddings[].values`.
fn parse_gemini_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>, PipelineError> {
    let data = json
        .get("embeddings")
        .and_then(|d| d.as_array())
        .ok_or_else(|| PipelineError::embedding("Invalid Gemini response: missing embeddings"))?;

    data.iter()
        .map(|item| {
            item.get("values")
                .and_then(|v| v.as_array())
                .map(|values| to_f32_vec(values))
                .ok_or_else(|| PipelineError::embedding("Invalid Gemini response: missing values"))
        })
        .collect()
}

// ============ OpenAI Provider ============

/// Embedding provider for OpenAI-compatible endpoints.
///
/// Calls `POST {base}/v1/embeddings` with a bearer token. Batches go out in
/// a single request.
pub struct OpenAIProvider {
    client: reqwest::Client,
    base_url: String,
    /// Model name (e.g. `"text-embedding-3-small"`).
    model: String,
    credential: Credential,
}

#[async_trait]
impl EmbeddingProvider for OpenAIProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, PipelineError> {
        let body = json!({
            "model": self.model,
            "input": texts,
        });

        debug!(model = %self.model, inputs = texts.len(), "openai embed request");
        let resp = self
            .client
            .post(format!("{}/v1/embeddings", self.base_url))
            .bearer_auth(self.credential.expose())
            .json(&body)
            .send()
            .await
            .map_err(|e| PipelineError::embedding(e.to_string()))?;

        let json = read_json(resp).await?;
        parse_openai_response(&json)
    }
}

/// Parse the OpenAI embeddings API response JSON.
///
/// Extracts the `data[].embedding` arrays, ordered by their `index` field.
fn parse_openai_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>, PipelineError> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| PipelineError::embedding("Invalid OpenAI response: missing data array"))?;

    let mut indexed = Vec::with_capacity(data.len());
    for (pos, item) in data.iter().enumerate() {
        let embedding = item
            .get("embedding")
            .and_then(|e| e.as_array())
            .ok_or_else(|| PipelineError::embedding("Invalid OpenAI response: missing embedding"))?;
        let index = item
            .get("index")
            .and_then(|i| i.as_u64())
            .map(|i| i as usize)
            .unwrap_or(pos);
        indexed.push((index, to_f32_vec(embedding)));
    }

    indexed.sort_by_key(|(index, _)| *index);
    Ok(indexed.into_iter().map(|(_, v)| v).collect())
}

async fn read_json(resp: reqwest::Response) -> Result<serde_json::Value, PipelineError> {
    let status = resp.status();
    if !status.is_success() {
        let body_text = resp.text().await.unwrap_or_default();
        return Err(PipelineError::embedding(http::describe_failure(
            status, &body_text,
        )));
    }
    resp.json()
        .await
        .map_err(|e| PipelineError::embedding(format!("Invalid response body: {}", e)))
}

fn to_f32_vec(values: &[serde_json::Value]) -> Vec<f32> {
    values
        .iter()
        .map(|v| v.as_f64().unwrap_or(0.0) as f32)
        .collect()
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`:
/// - `1.0` = identical direction
/// - `0.0` = orthogonal (unrelated)
/// - `-1.0` = opposite direction
///
/// Returns `0.0` for empty vectors or vectors of different lengths.
///
/// # Formula
///
/// ```text
///            a · b
/// cos(θ) = ─────────
///          ‖a‖ × ‖b‖
/// ```
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}

/// Euclidean distance between two vectors. Mismatched lengths are infinitely far apart.
pub fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return f32::INFINITY;
    }
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}
