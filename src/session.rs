//! Interaction handling for one question-answering session.
//!
//! A session's mutable state (chat history and the prepared-document cache)
//! lives in an owned [`SessionState`] that is moved into each handler and
//! handed back with the [`Outcome`]. The credential is not stored here; the
//! caller supplies it with every [`Interaction`] and it is threaded into the
//! providers through a [`ServiceFactory`].
//!
//! # Flow of [`handle_query`]
//!
//! 1. Missing credential or document: advise on every missing field and stop
//!    before any provider is built.
//! 2. Prepare the document (cache hit, or extract → chunk → embed).
//! 3. Missing query: advise and stop; the document stays prepared.
//! 4. Document without text: advise and stop.
//! 5. Retrieve, generate, append to history.
//!
//! Any [`PipelineError`] becomes [`Outcome::Failed`] and leaves history untouched.

use std::fmt;
use std::sync::Arc;

use tracing::{info, warn};

use crate::answer;
use crate::cache::DocumentCache;
use crate::config::Config;
use crate::embedding::{self, EmbeddingProvider};
use crate::error::{InputField, PipelineError};
use crate::generation::{self, GenerationProvider};
use crate::history::ChatHistory;
use crate::index::{self, ScoredChunk};
use crate::models::{Chunk, Credential, Upload};

/// The two external services a pipeline run talks to.
pub struct Services {
    pub embedder: Box<dyn EmbeddingProvider>,
    pub generator: Box<dyn GenerationProvider>,
}

/// Builds [`Services`] for a credential.
///
/// Building must not perform network I/O; only the calls on the returned
/// providers do.
pub trait ServiceFactory: Send + Sync {
    fn connect(&self, config: &Config, credential: &Credential) -> Result<Services, PipelineError>;
}

/// Production factory: HTTP providers as configured.
pub struct HttpServices;

impl ServiceFactory for HttpServices {
    fn connect(&self, config: &Config, credential: &Credential) -> Result<Services, PipelineError> {
        Ok(Services {
            embedder: embedding::create_provider(&config.embedding, credential)?,
            generator: generation::create_generator(&config.generation, credential)?,
        })
    }
}

/// Configuration plus the way to reach the providers. Shared, read-only.
#[derive(Clone)]
pub struct Pipeline {
    config: Config,
    services: Arc<dyn ServiceFactory>,
}

impl Pipeline {
    pub fn new(config: Config, services: Arc<dyn ServiceFactory>) -> Self {
        Self { config, services }
    }

    pub fn http(config: Config) -> Self {
        Self::new(config, Arc::new(HttpServices))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub history: ChatHistory,
    pub documents: DocumentCache,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }
}

/// What the user supplied for one interaction.
#[derive(Debug, Clone, Default)]
pub struct Interaction {
    pub credential: Option<Credential>,
    pub document: Option<Upload>,
    pub query: Option<String>,
}

impl Interaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn credential(mut self, credential: Option<Credential>) -> Self {
        self.credential = credential;
        self
    }

    pub fn document(mut self, document: Option<Upload>) -> Self {
        self.document = document;
        self
    }

    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }
}

/// Non-error conditions the user should act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advisory {
    Missing(InputField),
    NoExtractableText,
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Advisory::Missing(InputField::Credential) => write!(f, "Please enter a valid API key."),
            Advisory::Missing(InputField::Document) => write!(f, "Upload a PDF file."),
            Advisory::Missing(InputField::Query) => write!(f, "Enter a query to get an answer."),
            Advisory::NoExtractableText => write!(
                f,
                "The document has no extractable text (scanned or image-only PDFs are not supported)."
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Outcome {
    Answered {
        answer: String,
        sources: Vec<ScoredChunk>,
    },
    Advisory(Vec<Advisory>),
    Failed(String),
}

/// Run one interaction. See the module docs for the exact flow.
pub async fn handle_query(
    pipeline: &Pipeline,
    mut state: SessionState,
    input: Interaction,
) -> (SessionState, Outcome) {
    let query = input.query.filter(|q| !q.trim().is_empty());

    let (credential, upload) = match (input.credential, input.document) {
        (Some(credential), Some(upload)) => (credential, upload),
        (credential, document) => {
            let mut missing = Vec::new();
            if credential.is_none() {
                missing.push(Advisory::Missing(InputField::Credential));
            }
            if document.is_none() {
                missing.push(Advisory::Missing(InputField::Document));
            }
            if query.is_none() {
                missing.push(Advisory::Missing(InputField::Query));
            }
            return (state, Outcome::Advisory(missing));
        }
    };

    let outcome = match run(pipeline, &mut state, &credential, &upload, query.as_deref()).await {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!(error = %e, "interaction failed");
            Outcome::Failed(e.to_string())
        }
    };
    (state, outcome)
}

/// Clear the conversation history. The prepared document stays cached.
pub fn handle_reset(mut state: SessionState) -> SessionState {
    state.history.reset();
    info!("chat history reset");
    state
}

async fn run(
    pipeline: &Pipeline,
    state: &mut SessionState,
    credential: &Credential,
    upload: &Upload,
    query: Option<&str>,
) -> Result<Outcome, PipelineError> {
    let config = &pipeline.config;
    let services = pipeline.services.connect(config, credential)?;

    let doc = state
        .documents
        .get_or_build(upload, config, services.embedder.as_ref())
        .await?;

    let query = match query {
        Some(q) => q,
        None => return Ok(Outcome::Advisory(vec![Advisory::Missing(InputField::Query)])),
    };
    if doc.has_no_text() {
        return Ok(Outcome::Advisory(vec![Advisory::NoExtractableText]));
    }

    let sources = index::retrieve(
        services.embedder.as_ref(),
        &doc.index,
        query,
        config.retrieval.top_k,
    )
    .await?;
    let chunks: Vec<Chunk> = sources.iter().map(|s| s.chunk.clone()).collect();

    let answer = answer::answer(
        services.generator.as_ref(),
        &chunks,
        state.history.recent(config.history.window),
        query,
    )
    .await?;

    state.history.append(query, answer.clone());
    Ok(Outcome::Answered { answer, sources })
}
