//! Rolling conversation history for one session.
//!
//! Entries are append-only and kept in the order they were answered. Only a
//! trailing window is used for prompting and display, but older entries stay
//! stored until [`ChatHistory::reset`].

use chrono::Utc;

use crate::models::HistoryEntry;

#[derive(Debug, Clone, Default)]
pub struct ChatHistory {
    entries: Vec<HistoryEntry>,
}

impl ChatHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, query: impl Into<String>, answer: impl Into<String>) {
        self.entries.push(HistoryEntry {
            query: query.into(),
            answer: answer.into(),
            answered_at: Utc::now(),
        });
    }

    /// The last `n` entries, oldest first.
    pub fn recent(&self, n: usize) -> &[HistoryEntry] {
        let start = self.entries.len().saturating_sub(n);
        &self.entries[start..]
    }

    pub fn reset(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
