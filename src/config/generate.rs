pub fn generate_starter_config() -> String {
    r#"# =============================================================================
# LOG-GROUPS CONFIGURATION
# =============================================================================
# This file configures where log entries are shipped, how the two log streams
# are batched, and how requests are correlated with their application logs.
#
# Every request handled by the web service produces one summary entry on the
# request stream. Application logs emitted while handling that request go to
# the application stream and carry the same trace id, so a log viewer can group
# them under the summary.
#
# Config file locations (in order of precedence):
#   1. Path specified via --config argument
#   2. ~/.config/log-groups/config.yml
#   3. /etc/log-groups/config.yml
#
# Any value may reference an environment variable as $env{NAME}.

# =============================================================================
# INGESTION
# =============================================================================
# backend: 'stdout' writes one JSON entry per line (useful locally and on
# platforms that collect stdout), 'http' posts batches to an entries:write API.

ingestion:
  backend: stdout
  # endpoint: https://logging.googleapis.com/v2/entries:write
  # Required for the http backend. Qualifies log names and trace ids.
  # project_id: my-project
  # access_token: $env{LOG_GROUPS_ACCESS_TOKEN}
  timeout: 10s

# =============================================================================
# RESOURCE & LABELS
# =============================================================================
# Monitored resource and common labels attached to every entry.

resource:
  type: global
  labels: {}

labels:
  service: log-groups-demo

# =============================================================================
# REQUEST CORRELATION
# =============================================================================
# Header carrying 'TRACE_ID/SPAN_ID;o=FLAG'. Remove to disable correlation.

trace_header: X-Cloud-Trace-Context

# Application events below this severity are not shipped.
# One of: default, debug, info, notice, warning, error, critical, alert, emergency
min_severity: info

# =============================================================================
# STREAMS
# =============================================================================
# Each stream is served by its own background worker.
#   grace_period:   how long shutdown waits for pending entries ('infinite' waits forever)
#   max_batch_size: entries per commit
#   max_latency:    how long a batch may wait for more entries after its first

streams:
  request:
    log_name: request
    grace_period: 5s
    max_batch_size: 10
    max_latency: 0ms
  application:
    log_name: application
    grace_period: 5s
    max_batch_size: 10
    max_latency: 0ms

# =============================================================================
# WEB SERVER SETTINGS
# =============================================================================

web:
  listen: 127.0.0.1:8080
  # Set to 0.0.0.0:8080 to allow external connections
"#
    .to_string()
}
