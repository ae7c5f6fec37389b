use crate::ingestion::wire::{LogTarget, WireEntry, WirePayload};
use crate::ingestion::{IngestError, IngestionClient, LogBatch};
use crate::shipper::entry::EntryMetadata;
use serde_json::Value;
use std::io::Write;

/// Writes each entry as one JSON line on stdout, for local runs and for
/// platforms that collect structured logs from stdout.
#[derive(Debug, Clone)]
pub struct StdoutClient {
    target: LogTarget,
}

impl StdoutClient {
    pub fn new(project_id: Option<String>, log_name: &str) -> Self {
        Self {
            target: LogTarget::new(project_id, log_name),
        }
    }
}

impl IngestionClient for StdoutClient {
    type Batch = StdoutBatch;

    fn batch(&self) -> StdoutBatch {
        StdoutBatch {
            target: self.target.clone(),
            entries: Vec::new(),
        }
    }
}

pub struct StdoutBatch {
    target: LogTarget,
    entries: Vec<WireEntry>,
}

impl StdoutBatch {
    /// Write the batch as JSON lines to `out`.
    pub fn write_to<W: Write>(&self, out: &mut W) -> Result<(), IngestError> {
        for entry in &self.entries {
            serde_json::to_writer(&mut *out, entry)?;
            out.write_all(b"\n")?;
        }
        out.flush()?;
        Ok(())
    }
}

impl LogBatch for StdoutBatch {
    fn add_text(&mut self, text: Option<String>, metadata: EntryMetadata) {
        let payload = text.map(WirePayload::Text);
        self.entries.push(self.target.entry(payload, metadata));
    }

    fn add_structured(&mut self, value: Value, metadata: EntryMetadata) {
        let payload = Some(WirePayload::structured(value));
        self.entries.push(self.target.entry(payload, metadata));
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn commit(self) -> Result<(), IngestError> {
        // One lock for the whole batch keeps its lines contiguous
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        self.write_to(&mut out)
    }
}
