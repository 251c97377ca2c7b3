//! PDF text extraction.
//!
//! Extraction is best-effort: pages with no text layer (scanned images)
//! contribute an empty string rather than an error. Only bytes that cannot
//! be parsed as a PDF at all fail, with [`PipelineError::Format`].
//!
//! The PDF parser panics on some malformed content streams (for example
//! text drawn before any font is selected). Those panics are caught here and
//! reported as [`PipelineError::Format`] as well.

use std::any::Any;
use std::panic;

use tracing::{debug, warn};

use crate::error::PipelineError;

/// Extract the text of every page, in document order.
pub fn extract_pages(bytes: &[u8]) -> Result<Vec<String>, PipelineError> {
    let pages = panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(bytes))
        .map_err(|payload| {
            let reason = panic_message(payload.as_ref());
            warn!(reason = %reason, "pdf parser panicked");
            PipelineError::Format(format!("malformed PDF content: {}", reason))
        })?
        .map_err(|e| PipelineError::Format(e.to_string()))?;
    debug!(pages = pages.len(), "extracted pdf pages");
    Ok(pages)
}

/// [`extract_pages`] on the blocking thread pool.
pub async fn extract_pages_blocking(bytes: Vec<u8>) -> Result<Vec<String>, PipelineError> {
    tokio::task::spawn_blocking(move || extract_pages(&bytes))
        .await
        .map_err(|e| PipelineError::Format(format!("extraction task failed: {}", e)))?
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Extract the whole document as one string, each page followed by `\n`.
pub fn extract_text(bytes: &[u8]) -> Result<String, PipelineError> {
    Ok(join_pages(&extract_pages(bytes)?))
}

pub fn join_pages(pages: &[String]) -> String {
    let mut out = String::with_capacity(pages.iter().map(|p| p.len() + 1).sum());
    for page in pages {
        out.push_str(page);
        out.push('\n');
    }
    out
}
