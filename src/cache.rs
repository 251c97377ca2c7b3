//! Memoization of the per-document pipeline (extract → chunk → index).
//!
//! Keyed by [`DocumentId`], the content hash of the uploaded bytes. The
//! cache holds a single document: preparing a different upload replaces it,
//! which is how a new upload invalidates the previous chunks and index.
//! Failed builds are never stored, so a retry with the same bytes runs the
//! pipeline again.

use tracing::{debug, info};

use crate::chunk::chunk_text;
use crate::config::Config;
use crate::embedding::EmbeddingProvider;
use crate::error::PipelineError;
use crate::extract;
use crate::index::VectorIndex;
use crate::models::{DocumentId, Upload};

/// Everything derived from one upload.
#[derive(Debug, Clone)]
pub struct PreparedDocument {
    pub id: DocumentId,
    pub name: String,
    pub pages: usize,
    pub text_chars: usize,
    pub index: VectorIndex,
}

impl PreparedDocument {
    /// Extract, chunk, and embed `upload`.
    pub async fn build(
        upload: &Upload,
        config: &Config,
        embedder: &dyn EmbeddingProvider,
    ) -> Result<Self, PipelineError> {
        let id = upload.id();
        let pages = extract::extract_pages_blocking(upload.bytes.clone()).await?;
        let text = extract::join_pages(&pages);
        let chunks = chunk_text(&id, &text, &config.chunking);
        info!(
            document = %upload.name,
            id = id.short(),
            pages = pages.len(),
            chunks = chunks.len(),
            "prepared document text"
        );
        let index = VectorIndex::build(
            embedder,
            chunks,
            config.embedding.batch_size,
            config.retrieval.metric,
        )
        .await?;

        Ok(Self {
            id,
            name: upload.name.clone(),
            pages: pages.len(),
            text_chars: text.chars().count(),
            index,
        })
    }

    /// True when extraction produced no usable text (e.g. a scanned PDF).
    pub fn has_no_text(&self) -> bool {
        self.index.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct DocumentCache {
    current: Option<PreparedDocument>,
}

impl DocumentCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &DocumentId) -> Option<&PreparedDocument> {
        self.current.as_ref().filter(|doc| &doc.id == id)
    }

    pub fn current(&self) -> Option<&PreparedDocument> {
        self.current.as_ref()
    }

    /// Store `doc`, evicting whatever document was cached before.
    pub fn insert(&mut self, doc: PreparedDocument) -> &PreparedDocument {
        if let Some(old) = &self.current {
            if old.id != doc.id {
                debug!(evicted = old.id.short(), "replacing cached document");
            }
        }
        self.current.insert(doc)
    }

    pub fn clear(&mut self) {
        self.current = None;
    }

    /// Return the cached preparation of `upload`, building it on a miss.
    pub async fn get_or_build(
        &mut self,
        upload: &Upload,
        config: &Config,
        embedder: &dyn EmbeddingProvider,
    ) -> Result<&PreparedDocument, PipelineError> {
        let id = upload.id();
        if self.get(&id).is_some() {
            debug!(id = id.short(), "document cache hit");
        } else {
            debug!(id = id.short(), "document cache miss");
            let doc = PreparedDocument::build(upload, config, embedder).await?;
            self.insert(doc);
        }
        self.get(&id)
            .ok_or_else(|| PipelineError::embedding("prepared document missing from cache"))
    }
}
