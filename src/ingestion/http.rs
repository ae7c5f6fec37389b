use crate::config::types::IngestionConfig;
use crate::ingestion::wire::{LogTarget, WireEntry, WirePayload, WriteRequest};
use crate::ingestion::{IngestError, IngestionClient, LogBatch};
use crate::shipper::entry::EntryMetadata;
use serde_json::Value;

pub type Result<T> = std::result::Result<T, IngestError>;

/// Blocking HTTP client for the log ingestion API.
///
/// Commits happen on worker threads, never inside the async runtime, so the
/// blocking reqwest client is used.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::blocking::Client,
    endpoint: String,
    project_id: Option<String>,
    access_token: Option<String>,
}

impl HttpClient {
    pub fn new(config: &IngestionConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            project_id: config.project_id.clone(),
            access_token: config.access_token.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Client bound to one log stream.
    pub fn logger(&self, log_name: &str) -> HttpLogger {
        HttpLogger {
            client: self.clone(),
            target: LogTarget::new(self.project_id.clone(), log_name),
        }
    }

    /// POST one `entries:write` request
    fn write(&self, log_name: &str, entries: &[WireEntry]) -> Result<()> {
        let body = WriteRequest {
            log_name,
            entries,
            partial_success: false,
        };

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }

        let response = request.send()?;
        if !response.status().is_success() {
            return Err(IngestError::Backend {
                status: response.status().as_u16(),
                message: response.text().unwrap_or_default(),
            });
        }

        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct HttpLogger {
    client: HttpClient,
    target: LogTarget,
}

impl HttpLogger {
    pub fn log_name(&self) -> &str {
        &self.target.log_name
    }
}

impl IngestionClient for HttpLogger {
    type Batch = HttpBatch;

    fn batch(&self) -> HttpBatch {
        HttpBatch {
            client: self.client.clone(),
            target: self.target.clone(),
            entries: Vec::new(),
        }
    }
}

pub struct HttpBatch {
    client: HttpClient,
    target: LogTarget,
    entries: Vec<WireEntry>,
}

impl LogBatch for HttpBatch {
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

    fn commit(self) -> Result<()> {
        if self.entries.is_empty() {
            return Ok(());
        }
        self.client
            .write(&self.target.full_log_name(), &self.entries)
    }
}
