//! Recursive character text splitter.
//!
//! Splits extracted document text into [`Chunk`]s of at most `chunk_size`
//! characters, with neighboring chunks sharing up to `chunk_overlap`
//! characters so that a passage straddling a boundary is still retrievable.
//!
//! # Algorithm
//!
//! 1. Pick the first separator in [`SEPARATORS`] that occurs in the text
//!    (paragraph, line, sentence, word, then single characters).
//! 2. Split on it, keeping the separator on the end of each piece.
//! 3. Greedily merge pieces smaller than `chunk_size` into chunks. When a
//!    chunk is full, emit it and keep its trailing pieces (up to
//!    `chunk_overlap` characters) as the start of the next one.
//! 4. Pieces that are themselves too large are split again with the
//!    remaining, finer separators.
//!
//! Lengths are counted in characters, not bytes, so multi-byte text is never
//! cut mid-codepoint. Emitted chunks are trimmed of surrounding whitespace
//! and whitespace-only chunks are dropped.
//!
//! # Example
//!
//! ```rust
//! use pdf_qa::chunk::TextSplitter;
//!
//! let splitter = TextSplitter::new(5000, 500);
//! let chunks = splitter.split_text("Alpha. Beta. Gamma.");
//! assert_eq!(chunks, vec!["Alpha. Beta. Gamma.".to_string()]);
//! ```

use std::collections::VecDeque;

use tracing::debug;

use crate::config::ChunkingConfig;
use crate::models::{Chunk, DocumentId};

/// Split boundaries, coarsest first. The empty separator splits into characters.
pub const SEPARATORS: &[&str] = &["\n\n", "\n", ". ", " ", ""];

#[derive(Debug, Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl TextSplitter {
    /// `chunk_overlap` is clamped below `chunk_size`; config validation rejects
    /// such values before they get here.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size - 1),
        }
    }

    pub fn from_config(config: &ChunkingConfig) -> Self {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, SEPARATORS)
    }

    fn split_recursive(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let mut separator = separators.last().copied().unwrap_or("");
        let mut finer: &[&str] = &[];
        for (i, sep) in separators.iter().enumerate() {
            if sep.is_empty() {
                separator = sep;
                break;
            }
            if text.contains(sep) {
                separator = sep;
                finer = &separators[i + 1..];
                break;
            }
        }

        let mut chunks = Vec::new();
        let mut small: Vec<&str> = Vec::new();
        for piece in split_keeping_separator(text, separator) {
            if char_len(piece) < self.chunk_size {
                small.push(piece);
                continue;
            }
            if !small.is_empty() {
                chunks.extend(self.merge(&small));
                small.clear();
            }
            if finer.is_empty() {
                push_trimmed(&mut chunks, piece);
            } else {
                chunks.extend(self.split_recursive(piece, finer));
            }
        }
        if !small.is_empty() {
            chunks.extend(self.merge(&small));
        }
        chunks
    }

    /// Greedily pack pieces into chunks, carrying a tail of each full chunk
    /// into the next one as overlap.
    fn merge(&self, pieces: &[&str]) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for &piece in pieces {
            let len = char_len(piece);
            if total + len > self.chunk_size && !current.is_empty() {
                push_trimmed(&mut chunks, &current.iter().copied().collect::<String>());
                // Drop from the front until what is left fits as overlap and
                // leaves room for the incoming piece.
                while total > self.chunk_overlap || (total > 0 && total + len > self.chunk_size)
                {
                    match current.pop_front() {
                        Some(first) => total -= char_len(first),
                        None => break,
                    }
                }
            }
            current.push_back(piece);
            total += len;
        }

        if !current.is_empty() {
            push_trimmed(&mut chunks, &current.iter().copied().collect::<String>());
        }
        chunks
    }
}

impl Default for TextSplitter {
    fn default() -> Self {
        Self::from_config(&ChunkingConfig::default())
    }
}

/// Split document text into [`Chunk`]s with contiguous indices starting at 0.
///
/// Empty or whitespace-only text yields no chunks.
pub fn chunk_text(
    document_id: &DocumentId,
    text: &str,
    config: &ChunkingConfig,
) -> Vec<Chunk> {
    let chunks: Vec<Chunk> = TextSplitter::from_config(config)
        .split_text(text)
        .iter()
        .enumerate()
        .map(|(i, t)| Chunk::new(document_id, i, t))
        .collect();
    debug!(
        chunks = chunks.len(),
        chars = char_len(text),
        "split document text"
    );
    chunks
}

fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect();
    }
    let mut pieces = Vec::new();
    let mut start = 0;
    for (idx, m) in text.match_indices(separator) {
        let end = idx + m.len();
        pieces.push(&text[start..end]);
        start = end;
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces
}

fn push_trimmed(out: &mut Vec<String>, s: &str) {
    let trimmed = s.trim();
    if !trimmed.is_empty() {
        out.push(trimmed.to_string());
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}
