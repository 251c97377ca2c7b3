//! Core data models used throughout the pipeline.
//!
//! These types represent the uploaded document, its chunks, and the
//! conversation history that flow through a question-answering session.

use std::fmt;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

/// Content identity of an uploaded document: the SHA-256 hex digest of its bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn of_bytes(bytes: &[u8]) -> Self {
        DocumentId(sha256_hex(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 hex digits, for log lines.
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Raw uploaded document before extraction.
#[derive(Debug, Clone)]
pub struct Upload {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    pub fn id(&self) -> DocumentId {
        DocumentId::of_bytes(&self.bytes)
    }
}

/// A chunk of a document's extracted text.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub document_id: DocumentId,
    pub chunk_index: usize,
    pub text: String,
    pub hash: String,
}

impl Chunk {
    pub fn new(document_id: &DocumentId, chunk_index: usize, text: &str) -> Self {
        Self {
            document_id: document_id.clone(),
            chunk_index,
            text: text.to_string(),
            hash: sha256_hex(text.as_bytes()),
        }
    }
}

/// One answered question.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub query: String,
    pub answer: String,
    pub answered_at: DateTime<Utc>,
}

/// API key for the embedding and generation providers.
///
/// `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Returns `None` for blank input so an empty password field counts as missing.
    pub fn new(key: impl Into<String>) -> Option<Self> {
        let key = key.into();
        let trimmed = key.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Credential(trimmed.to_string()))
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_id_depends_only_on_bytes() {
        let a = Upload::new("a.pdf", b"%PDF-1.4 same".to_vec());
        let b = Upload::new("renamed.pdf", b"%PDF-1.4 same".to_vec());
        let c = Upload::new("a.pdf", b"%PDF-1.4 other".to_vec());
        assert_eq!(a.id(), b.id());
        assert_ne!(a.id(), c.id());
        assert_eq!(a.id().as_str().len(), 64);
        assert_eq!(a.id().short().len(), 12);
    }

    #[test]
    fn chunk_carries_its_document_id() {
        let upload = Upload::new("a.pdf", b"%PDF-1.4 same".to_vec());
        let chunk = Chunk::new(&upload.id(), 3, "Alpha.");
        assert_eq!(chunk.document_id, upload.id());
        assert_eq!(chunk.chunk_index, 3);
        assert_eq!(chunk.hash, sha256_hex(b"Alpha."));
    }

    #[test]
    fn blank_credential_is_missing() {
        assert!(Credential::new("").is_none());
        assert!(Credential::new("   ").is_none());
        let c = Credential::new(" key-123 ").unwrap();
        assert_eq!(c.expose(), "key-123");
    }

    #[test]
    fn credential_debug_is_redacted() {
        let c = Credential::new("super-secret").unwrap();
        assert!(!format!("{:?}", c).contains("super-secret"));
    }
}
