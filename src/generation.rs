//! Text generation providers.
//!
//! A [`GenerationProvider`] turns one rendered prompt into one completion.
//! The model identifier and sampling temperature are fixed at construction
//! from [`GenerationConfig`]; the credential is passed in explicitly.
//!
//! Backends:
//! - **[`GeminiGenerator`]**: `POST {base}/v1beta/models/{model}:generateContent`
//! - **[`OpenAIGenerator`]**: `POST {base}/v1/chat/completions`
//!
//! All failures map to [`PipelineError::GenerationService`].

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use crate::config::GenerationConfig;
use crate::error::PipelineError;
use crate::http;
use crate::models::Credential;

#[async_trait]
pub trait GenerationProvider: Send + Sync {
    fn model_name(&self) -> &str;

    /// Return the model's completion for `prompt`, verbatim.
    async fn generate(&self, prompt: &str) -> Result<String, PipelineError>;
}

pub fn create_generator(
    config: &GenerationConfig,
    credential: &Credential,
) -> Result<Box<dyn GenerationProvider>, PipelineError> {
    let client = http::build_client(config.timeout_secs)
        .map_err(|e| PipelineError::generation(e.to_string()))?;
    match config.provider.as_str() {
        "gemini" => Ok(Box::new(GeminiGenerator {
            client,
            base_url: http::base_url(config.base_url.as_deref(), http::GEMINI_BASE_URL),
            model: http::gemini_model_path(&config.model),
            temperature: config.temperature,
            credential: credential.clone(),
        })),
        "openai" => Ok(Box::new(OpenAIGenerator {
            client,
            base_url: http::base_url(config.base_url.as_deref(), http::OPENAI_BASE_URL),
            model: config.model.clone(),
            temperature: config.temperature,
            credential: credential.clone(),
        })),
        other => Err(PipelineError::generation(format!(
            "Unknown generation provider: {}",
            other
        ))),
    }
}

pub struct GeminiGenerator {
    client: reqwest::Client,
    base_url: String,
    model: String,
    temperature: f64,
    credential: Credential,
}

#[async_trait]
impl GenerationProvider for GeminiGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String, PipelineError> {
        let url = format!("{}/v1beta/{}:generateContent", self.base_url, self.model);
        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": { "temperature": self.temperature },
        });

        debug!(model = %self.model, prompt_chars = prompt.len(), "gemini generate request");
        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", self.credential.expose())
            .json(&body)
            .send()
            .await
            .map_err(|e| PipelineError::generation(e.to_string()))?;

        let json = read_json(resp).await?;
        parse_gemini_response(&json)
    }
}

/// Concatenate the text parts of the first candidate.
fn parse_gemini_response(json: &serde_json::Value) -> Result<String, PipelineError> {
    let candidate = match json
        .get("candidates")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
    {
        Some(c) => c,
        None => {
            let reason = json
                .pointer("/promptFeedback/blockReason")
                .and_then(|r| r.as_str());
            return Err(match reason {
                Some(reason) => PipelineError::generation(format!("prompt blocked: {}", reason)),
                None => PipelineError::generation("Invalid Gemini response: no candidates"),
            });
        }
    };

    let text: String = candidate
        .pointer("/content/parts")
        .and_then(|p| p.as_array())
        .map(|parts| {
            parts
                .iter()
                .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
                .collect()
        })
        .unwrap_or_default();

    if text.is_empty() {
        let finish = candidate
            .get("finishReason")
            .and_then(|r| r.as_str())
            .unwrap_or("unknown");
        return Err(PipelineError::generation(format!(
            "empty completion (finish reason: {})",
            finish
        )));
    }
    Ok(text)
}

pub struct OpenAIGenerator {
    client: reqwest::Client,
    base_url: String,
    model: String,
    temperature: f64,
    credential: Credential,
}

#[async_trait]
impl GenerationProvider for OpenAIGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String, PipelineError> {
        let body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": self.temperature,
        });

        debug!(model = %self.model, prompt_chars = prompt.len(), "openai chat request");
        let resp = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(self.credential.expose())
            .json(&body)
            .send()
            .await
            .map_err(|e| PipelineError::generation(e.to_string()))?;

        let json = read_json(resp).await?;
        parse_openai_response(&json)
    }
}

fn parse_openai_response(json: &serde_json::Value) -> Result<String, PipelineError> {
    json.pointer("/choices/0/message/content")
        .and_then(|c| c.as_str())
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .ok_or_else(|| PipelineError::generation("Invalid OpenAI response: missing message content"))
}

async fn read_json(resp: reqwest::Response) -> Result<serde_json::Value, PipelineError> {
    let status = resp.status();
    if !status.is_success() {
        let body_text = resp.text().await.unwrap_or_default();
        return Err(PipelineError::generation(http::describe_failure(
            status, &body_text,
        )));
    }
    resp.json()
        .await
        .map_err(|e| PipelineError::generation(format!("Invalid response body: {}", e)))
}
