//! Pipeline error taxonomy.
//!
//! Every stage that can fail returns a [`PipelineError`]. The interaction
//! handler in [`crate::session`] turns these into user-visible messages;
//! nothing in the pipeline retries.

use std::fmt;

/// An input the user must supply before the pipeline can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputField {
    Credential,
    Document,
    Query,
}

impl fmt::Display for InputField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputField::Credential => write!(f, "API key"),
            InputField::Document => write!(f, "PDF document"),
            InputField::Query => write!(f, "query"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The uploaded bytes are not a parseable PDF.
    #[error("could not read document: {0}")]
    Format(String),

    /// The embedding provider rejected or failed a request (auth, quota, network).
    #[error("embedding service error: {0}")]
    EmbeddingService(String),

    /// The generation provider rejected or failed a request.
    #[error("generation service error: {0}")]
    GenerationService(String),

    #[error("missing input: {0}")]
    MissingInput(InputField),
}

impl PipelineError {
    pub fn embedding(msg: impl Into<String>) -> Self {
        PipelineError::EmbeddingService(msg.into())
    }

    pub fn generation(msg: impl Into<String>) -> Self {
        PipelineError::GenerationService(msg.into())
    }
}
