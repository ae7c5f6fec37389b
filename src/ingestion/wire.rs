//! JSON shape of entries sent to the ingestion API (Cloud Logging `entries:write`).

use crate::shipper::entry::{EntryMetadata, HttpRequestInfo, Resource, Severity};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum WirePayload {
    #[serde(rename = "textPayload")]
    Text(String),
    #[serde(rename = "jsonPayload")]
    Json(Map<String, Value>),
}

impl WirePayload {
    /// The API only accepts objects as JSON payloads; other values are wrapped.
    pub fn structured(value: Value) -> Self {
        match value {
            Value::Object(map) => WirePayload::Json(map),
            other => {
                let mut map = Map::new();
                map.insert("value".to_string(), other);
                WirePayload::Json(map)
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WireEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_name: Option<String>,
    pub resource: Resource,
    pub timestamp: DateTime<Utc>,
    pub severity: Severity,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub labels: HashMap<String, String>,
    pub insert_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_request: Option<HttpRequestInfo>,
    #[serde(flatten)]
    pub payload: Option<WirePayload>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteRequest<'a> {
    pub log_name: &'a str,
    pub entries: &'a [WireEntry],
    pub partial_success: bool,
}

/// Names entries for one log stream.
#[derive(Debug, Clone)]
pub struct LogTarget {
    pub project_id: Option<String>,
    pub log_name: String,
}

impl LogTarget {
    pub fn new(project_id: Option<String>, log_name: impl Into<String>) -> Self {
        Self {
            project_id,
            log_name: log_name.into(),
        }
    }

    /// `projects/<p>/logs/<name>` with the name percent-encoded, or the bare
    /// name when no project is known.
    pub fn full_log_name(&self) -> String {
        match &self.project_id {
            Some(project) => format!(
                "projects/{}/logs/{}",
                project,
                self.log_name.replace('/', "%2F")
            ),
            None => self.log_name.clone(),
        }
    }

    pub fn qualify_trace(&self, trace: String) -> String {
        match &self.project_id {
            Some(project) if !trace.starts_with("projects/") => {
                format!("projects/{}/traces/{}", project, trace)
            }
            _ => trace,
        }
    }

    pub fn entry(&self, payload: Option<WirePayload>, metadata: EntryMetadata) -> WireEntry {
        WireEntry {
            log_name: Some(self.full_log_name()),
            resource: metadata.resource,
            timestamp: metadata.timestamp,
            severity: metadata.severity,
            labels: metadata.labels,
            insert_id: Uuid::new_v4().to_string(),
            trace: metadata.trace.map(|t| self.qualify_trace(t)),
            span_id: metadata.span_id,
            http_request: metadata.http_request,
            payload,
        }
    }
}
