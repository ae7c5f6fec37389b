pub mod http;
pub mod stdout;
pub mod wire;

use crate::shipper::entry::EntryMetadata;
use serde_json::Value;
use thiserror::Error;

pub use http::{HttpClient, HttpLogger};
pub use stdout::StdoutClient;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ingestion endpoint returned status {status}: {message}")]
    Backend { status: u16, message: String },
}

/// Source of batches for one log stream.
///
/// Batches are created, filled and committed on the worker thread, so the
/// client must be shareable across threads.
pub trait IngestionClient: Send + Sync + 'static {
    type Batch: LogBatch;

    /// Start a new, empty batch.
    fn batch(&self) -> Self::Batch;
}

/// Accumulates log calls and submits them as one unit.
pub trait LogBatch: Send {
    /// Plain-text call. `None` means a summary record with no body.
    fn add_text(&mut self, text: Option<String>, metadata: EntryMetadata);

    fn add_structured(&mut self, value: Value, metadata: EntryMetadata);

    /// Number of log calls added so far.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn commit(self) -> Result<(), IngestError>;
}
