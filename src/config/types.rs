use crate::shipper::entry::{Resource, Severity};
use crate::shipper::worker::{DEFAULT_GRACE_PERIOD, DEFAULT_MAX_BATCH_SIZE, DEFAULT_MAX_LATENCY};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://logging.googleapis.com/v2/entries:write";
pub const DEFAULT_TRACE_HEADER: &str = "X-Cloud-Trace-Context";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub ingestion: IngestionConfig,
    #[serde(default)]
    pub resource: Resource,
    /// Attached to every entry of both streams
    #[serde(default)]
    pub labels: HashMap<String, String>,
    /// Header carrying `TRACE_ID/SPAN_ID;o=FLAG`. Unset disables trace correlation.
    #[serde(default)]
    pub trace_header: Option<String>,
    #[serde(default = "default_min_severity")]
    pub min_severity: Severity,
    #[serde(default)]
    pub streams: StreamsConfig,
    #[serde(default)]
    pub web: WebConfig,
}

fn default_min_severity() -> Severity {
    Severity::Info
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionConfig {
    #[serde(default)]
    pub backend: BackendType,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(with = "humantime_serde", default = "default_timeout")]
    pub timeout: Duration,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_timeout() -> Duration {
    Duration::from_secs(10)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    #[default]
    Http,
    Stdout,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamsConfig {
    /// Per-request summary records
    #[serde(default = "default_request_stream")]
    pub request: StreamConfig,
    /// Application messages emitted while handling requests
    #[serde(default = "default_application_stream")]
    pub application: StreamConfig,
}

impl Default for StreamsConfig {
    fn default() -> Self {
        Self {
            request: default_request_stream(),
            application: default_application_stream(),
        }
    }
}

fn default_request_stream() -> StreamConfig {
    StreamConfig::named("request")
}

fn default_application_stream() -> StreamConfig {
    StreamConfig::named("application")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamConfig {
    pub log_name: String,
    #[serde(with = "duration_format", default = "default_grace_period")]
    pub grace_period: Option<Duration>,
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
    #[serde(with = "humantime_serde", default = "default_max_latency")]
    pub max_latency: Duration,
}

impl StreamConfig {
    pub fn named(log_name: &str) -> Self {
        Self {
            log_name: log_name.to_string(),
            grace_period: default_grace_period(),
            max_batch_size: default_max_batch_size(),
            max_latency: default_max_latency(),
        }
    }
}

fn default_grace_period() -> Option<Duration> {
    Some(DEFAULT_GRACE_PERIOD)
}

fn default_max_batch_size() -> usize {
    DEFAULT_MAX_BATCH_SIZE
}

fn default_max_latency() -> Duration {
    DEFAULT_MAX_LATENCY
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    pub listen: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8080".to_string(),
        }
    }
}

// Durations that may be "infinite"
mod duration_format {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => {
                let s = format_duration(*d);
                serializer.serialize_str(&s)
            }
            None => serializer.serialize_str("infinite"),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        if s == "infinite" {
            Ok(None)
        } else {
            parse_duration(&s)
                .map(Some)
                .map_err(serde::de::Error::custom)
        }
    }

    pub(super) fn parse_duration(s: &str) -> Result<Duration, String> {
        let s = s.trim();
        if s.is_empty() {
            return Err("empty duration string".to_string());
        }

        let (value_str, unit) = if let Some(v) = s.strip_suffix("ms") {
            (v, "ms")
        } else if let Some(v) = s.strip_suffix('s') {
            (v, "s")
        } else if let Some(v) = s.strip_suffix('m') {
            (v, "m")
        } else if let Some(v) = s.strip_suffix('h') {
            (v, "h")
        } else {
            return Err(format!("invalid duration format: {}", s));
        };

        let value: u64 = value_str
            .parse()
            .map_err(|_| format!("invalid numeric value: {}", value_str))?;

        let duration = match unit {
            "ms" => Duration::from_millis(value),
            "s" => Duration::from_secs(value),
            "m" => Duration::from_secs(value * 60),
            "h" => Duration::from_secs(value * 3600),
            _ => return Err(format!("unknown unit: {}", unit)),
        };

        Ok(duration)
    }

    pub(super) fn format_duration(d: Duration) -> String {
        let secs = d.as_secs();
        if d.subsec_nanos() != 0 || secs == 0 {
            format!("{}ms", d.as_millis())
        } else if secs % 3600 == 0 {
            format!("{}h", secs / 3600)
        } else if secs % 60 == 0 {
            format!("{}m", secs / 60)
        } else {
            format!("{}s", secs)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::duration_format::{format_duration, parse_duration};
    use super::*;

    #[test]
    fn test_parse_duration_units() {
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration("5s").unwrap(), Duration::from_secs(5));
        assert_eq!(parse_duration("2m").unwrap(), Duration::from_secs(120));
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
        assert!(parse_duration("5 parsecs").is_err());
        assert!(parse_duration("").is_err());
    }

    #[test]
    fn test_format_duration_round_trips_common_values() {
        assert_eq!(format_duration(Duration::from_secs(5)), "5s");
        assert_eq!(format_duration(Duration::from_secs(120)), "2m");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1500ms");
        assert_eq!(format_duration(Duration::ZERO), "0ms");
    }

    #[test]
    fn test_stream_defaults() {
        let stream: StreamConfig = serde_yaml::from_str("log_name: request").unwrap();
        assert_eq!(stream.grace_period, Some(Duration::from_secs(5)));
        assert_eq!(stream.max_batch_size, 10);
        assert_eq!(stream.max_latency, Duration::ZERO);
    }

    #[test]
    fn test_infinite_grace_period() {
        let stream: StreamConfig =
            serde_yaml::from_str("log_name: request\ngrace_period: infinite\nmax_latency: 250ms")
                .unwrap();
        assert_eq!(stream.grace_period, None);
        assert_eq!(stream.max_latency, Duration::from_millis(250));
    }
}
