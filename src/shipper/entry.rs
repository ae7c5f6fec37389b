use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Log severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE", try_from = "String")]
pub enum Severity {
    Default,
    Debug,
    Info,
    Notice,
    Warning,
    Error,
    Critical,
    Alert,
    Emergency,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Default => "DEFAULT",
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Notice => "NOTICE",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
            Severity::Critical => "CRITICAL",
            Severity::Alert => "ALERT",
            Severity::Emergency => "EMERGENCY",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown severity '{0}'")]
pub struct UnknownSeverity(pub String);

impl FromStr for Severity {
    type Err = UnknownSeverity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DEFAULT" => Ok(Severity::Default),
            "TRACE" | "DEBUG" => Ok(Severity::Debug),
            "INFO" => Ok(Severity::Info),
            "NOTICE" => Ok(Severity::Notice),
            "WARN" | "WARNING" => Ok(Severity::Warning),
            "ERROR" => Ok(Severity::Error),
            "CRITICAL" => Ok(Severity::Critical),
            "ALERT" => Ok(Severity::Alert),
            "EMERGENCY" => Ok(Severity::Emergency),
            _ => Err(UnknownSeverity(s.to_string())),
        }
    }
}

impl TryFrom<String> for Severity {
    type Error = UnknownSeverity;

    fn try_from(value: String) -> Result<Self, UnknownSeverity> {
        value.parse()
    }
}

impl From<&tracing::Level> for Severity {
    fn from(level: &tracing::Level) -> Self {
        match *level {
            tracing::Level::TRACE | tracing::Level::DEBUG => Severity::Debug,
            tracing::Level::INFO => Severity::Info,
            tracing::Level::WARN => Severity::Warning,
            tracing::Level::ERROR => Severity::Error,
        }
    }
}

/// Monitored resource an entry is attributed to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    #[serde(rename = "type")]
    pub resource_type: String,
    #[serde(default)]
    pub labels: HashMap<String, String>,
}

impl Default for Resource {
    fn default() -> Self {
        Self {
            resource_type: "global".to_string(),
            labels: HashMap::new(),
        }
    }
}

/// Request/response metadata attached to request summary records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpRequestInfo {
    pub request_method: String,
    pub request_url: String,
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_size: Option<u64>,
    /// Formatted as seconds with a trailing `s`, e.g. `"0.00123s"`
    pub latency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referer: Option<String>,
}

/// Everything about an entry except its body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryMetadata {
    /// When the producer generated the entry (not when it was enqueued)
    pub timestamp: DateTime<Utc>,
    pub severity: Severity,
    pub resource: Resource,
    pub labels: HashMap<String, String>,
    pub trace: Option<String>,
    pub span_id: Option<String>,
    pub http_request: Option<HttpRequestInfo>,
}

/// One log record queued for shipment.
///
/// An absent `message` marks a request summary record: metadata only, no body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub message: Option<String>,
    pub metadata: EntryMetadata,
}

impl LogEntry {
    pub fn new(message: Option<String>, timestamp: DateTime<Utc>, severity: Severity) -> Self {
        Self {
            message,
            metadata: EntryMetadata {
                timestamp,
                severity,
                resource: Resource::default(),
                labels: HashMap::new(),
                trace: None,
                span_id: None,
                http_request: None,
            },
        }
    }

    /// Application message entry stamped with the current time.
    pub fn text(message: impl Into<String>, severity: Severity) -> Self {
        Self::new(Some(message.into()), Utc::now(), severity)
    }

    /// Request summary entry stamped with the current time.
    pub fn summary(severity: Severity, http_request: HttpRequestInfo) -> Self {
        Self::new(None, Utc::now(), severity).with_http_request(http_request)
    }

    pub fn with_resource(mut self, resource: Resource) -> Self {
        self.metadata.resource = resource;
        self
    }

    pub fn with_labels(mut self, labels: HashMap<String, String>) -> Self {
        self.metadata.labels = labels;
        self
    }

    pub fn with_trace(mut self, trace: Option<String>, span_id: Option<String>) -> Self {
        self.metadata.trace = trace;
        self.metadata.span_id = span_id;
        self
    }

    pub fn with_http_request(mut self, http_request: HttpRequestInfo) -> Self {
        self.metadata.http_request = Some(http_request);
        self
    }

    pub fn is_summary(&self) -> bool {
        self.message.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Default < Severity::Debug);
        assert!(Severity::Info < Severity::Warning);
        assert!(Severity::Error < Severity::Critical);
        assert!(Severity::Alert < Severity::Emergency);
        assert_eq!(
            [Severity::Info, Severity::Error, Severity::Warning].iter().max(),
            Some(&Severity::Error)
        );
    }

    #[test]
    fn test_severity_parse_is_case_insensitive() {
        assert_eq!("info".parse::<Severity>().unwrap(), Severity::Info);
        assert_eq!("Warn".parse::<Severity>().unwrap(), Severity::Warning);
        assert_eq!(" CRITICAL ".parse::<Severity>().unwrap(), Severity::Critical);
        assert!("loud".parse::<Severity>().is_err());
    }

    #[test]
    fn test_severity_try_from_string() {
        assert_eq!(Severity::try_from("notice".to_string()).unwrap(), Severity::Notice);
        assert_eq!(Severity::try_from("ERROR".to_string()).unwrap(), Severity::Error);
        let err = Severity::try_from("loud".to_string()).unwrap_err();
        assert_eq!(err.0, "loud");
    }

    #[test]
    fn test_severity_from_tracing_level() {
        assert_eq!(Severity::from(&tracing::Level::TRACE), Severity::Debug);
        assert_eq!(Severity::from(&tracing::Level::WARN), Severity::Warning);
        assert_eq!(Severity::from(&tracing::Level::ERROR), Severity::Error);
    }

    #[test]
    fn test_severity_serializes_uppercase() {
        let json = serde_json::to_string(&Severity::Warning).unwrap();
        assert_eq!(json, "\"WARNING\"");
        let parsed: Severity = serde_json::from_str("\"NOTICE\"").unwrap();
        assert_eq!(parsed, Severity::Notice);
        let parsed: Severity = serde_json::from_str("\"warn\"").unwrap();
        assert_eq!(parsed, Severity::Warning);
    }

    #[test]
    fn test_summary_entry_has_no_message() {
        let http = HttpRequestInfo {
            request_method: "GET".to_string(),
            request_url: "http://localhost/".to_string(),
            status: 200,
            response_size: Some(2),
            latency: "0.00100s".to_string(),
            remote_ip: None,
            request_size: None,
            user_agent: None,
            referer: None,
        };
        let entry = LogEntry::summary(Severity::Info, http.clone());
        assert!(entry.is_summary());
        assert_eq!(entry.metadata.http_request, Some(http));
        assert_eq!(entry.metadata.resource.resource_type, "global");
    }

    #[test]
    fn test_http_request_serializes_camel_case() {
        let http = HttpRequestInfo {
            request_method: "POST".to_string(),
            request_url: "http://localhost/submit".to_string(),
            status: 201,
            response_size: None,
            latency: "0.50000s".to_string(),
            remote_ip: Some("10.0.0.1".to_string()),
            request_size: Some(12),
            user_agent: None,
            referer: None,
        };
        let value = serde_json::to_value(&http).unwrap();
        assert_eq!(value["requestMethod"], "POST");
        assert_eq!(value["remoteIp"], "10.0.0.1");
        assert_eq!(value["requestSize"], 12);
        assert!(value.get("responseSize").is_none());
        assert!(value.get("userAgent").is_none());
    }
}
