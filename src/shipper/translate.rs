use crate::ingestion::LogBatch;
use crate::shipper::entry::LogEntry;
use crate::shipper::literal::parse_literal;
use serde_json::Value;

/// What kind of log call an entry turns into.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// No message: request summary carrying metadata only
    Summary,
    Structured(Value),
    Text(String),
}

impl Payload {
    /// Classify a message, trying a strict literal parse before falling back
    /// to text. Never fails.
    pub fn from_message(message: Option<String>) -> Self {
        match message {
            None => Payload::Summary,
            Some(text) => match parse_literal(&text) {
                Ok(value) => Payload::Structured(value),
                Err(_) => Payload::Text(text),
            },
        }
    }
}

/// Append the log call for `entry` to `batch`.
pub fn add_entry<B: LogBatch>(batch: &mut B, entry: LogEntry) {
    let LogEntry { message, metadata } = entry;
    match Payload::from_message(message) {
        Payload::Summary => batch.add_text(None, metadata),
        Payload::Structured(value) => batch.add_structured(value, metadata),
        Payload::Text(text) => batch.add_text(Some(text), metadata),
    }
}
