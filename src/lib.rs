//! # pdf-qa
//!
//! Ask questions about a single PDF using retrieval-augmented generation.
//!
//! One uploaded document is extracted, split into overlapping chunks,
//! embedded into an in-memory vector index, and queried: the nearest chunks
//! plus recent chat history go into a prompt for a text generation model.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────┐   ┌──────────┐   ┌───────────┐   ┌──────────┐
//! │ Extract  │──▶│  Chunk   │──▶│  Index   │──▶│ Retrieve  │──▶│  Answer  │
//! │  (PDF)   │   │ 5000/500 │   │ (embed)  │   │  (top-k)  │   │ (prompt) │
//! └──────────┘   └──────────┘   └────┬─────┘   └───────────┘   └──────────┘
//!                                    │
//!                           ┌────────┴────────┐
//!                           │  DocumentCache  │  keyed by SHA-256 of the bytes
//!                           └─────────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`error`] | Pipeline error taxonomy |
//! | [`extract`] | PDF text extraction |
//! | [`chunk`] | Recursive character splitting |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`generation`] | Text generation provider abstraction |
//! | [`index`] | In-memory vector index and retrieval |
//! | [`answer`] | Prompt rendering and answering |
//! | [`history`] | Chat history |
//! | [`cache`] | Per-document memoization |
//! | [`session`] | Interaction handling |
//! | [`shell`] | Terminal front end |

pub mod answer;
pub mod cache;
pub mod chunk;
pub mod config;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod generation;
pub mod history;
mod http;
pub mod index;
pub mod models;
pub mod session;
pub mod shell;
