use crate::shipper::entry::Severity;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

tokio::task_local! {
    static CURRENT: RequestContext;
}

/// Trace and span ids taken from a `TRACE_ID/SPAN_ID;o=FLAG` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceContext {
    pub trace_id: String,
    pub span_id: Option<String>,
}

impl TraceContext {
    /// Parse a trace header value. Trace options after `;` are dropped.
    ///
    /// Returns `None` when there is no trace id.
    pub fn parse(header: &str) -> Option<Self> {
        let ids = match header.split_once(';') {
            Some((ids, _options)) => ids,
            None => header,
        };

        let (trace_id, span_id) = match ids.split_once('/') {
            Some((trace, span)) => (trace, Some(span)),
            None => (ids, None),
        };

        let trace_id = trace_id.trim();
        if trace_id.is_empty() {
            return None;
        }

        Some(Self {
            trace_id: trace_id.to_string(),
            span_id: span_id
                .map(str::trim)
                .filter(|span| !span.is_empty())
                .map(str::to_string),
        })
    }
}

/// Per-request state shared between the request middleware and the shipping
/// layer.
///
/// Lives in a task-local for the duration of one request, so application
/// events emitted while handling the request can find their trace and report
/// their severity back to the summary.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    inner: Arc<ContextInner>,
}

#[derive(Debug, Default)]
struct ContextInner {
    trace: Option<TraceContext>,
    max_severity: Mutex<Option<Severity>>,
}

impl RequestContext {
    pub fn new(trace: Option<TraceContext>) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                trace,
                max_severity: Mutex::new(None),
            }),
        }
    }

    /// The context of the request being handled on this task, if any.
    pub fn current() -> Option<RequestContext> {
        CURRENT.try_with(|context| context.clone()).ok()
    }

    /// Run `future` with this context installed as the current one.
    pub async fn scope<F: Future>(self, future: F) -> F::Output {
        CURRENT.scope(self, future).await
    }

    /// Synchronous variant of [`RequestContext::scope`].
    pub fn sync_scope<R>(self, f: impl FnOnce() -> R) -> R {
        CURRENT.sync_scope(self, f)
    }

    pub fn trace(&self) -> Option<&TraceContext> {
        self.inner.trace.as_ref()
    }

    pub fn record_severity(&self, severity: Severity) {
        let mut max = self
            .inner
            .max_severity
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if max.map_or(true, |current| severity > current) {
            *max = Some(severity);
        }
    }

    /// Highest severity recorded so far, `None` if nothing was logged.
    pub fn max_severity(&self) -> Option<Severity> {
        *self
            .inner
            .max_severity
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trace_and_span() {
        let trace = TraceContext::parse("105445aa7843bc8bf206b12000100000/1;o=1").unwrap();
        assert_eq!(trace.trace_id, "105445aa7843bc8bf206b12000100000");
        assert_eq!(trace.span_id.as_deref(), Some("1"));
    }

    #[test]
    fn test_parse_trace_without_span() {
        let trace = TraceContext::parse("abc123;o=1").unwrap();
        assert_eq!(trace.trace_id, "abc123");
        assert_eq!(trace.span_id, None);

        let trace = TraceContext::parse("abc123").unwrap();
        assert_eq!(trace.trace_id, "abc123");
        assert_eq!(trace.span_id, None);
    }

    #[test]
    fn test_parse_empty_header() {
        assert_eq!(TraceContext::parse(""), None);
        assert_eq!(TraceContext::parse(";o=1"), None);
        assert_eq!(TraceContext::parse("/span"), None);
    }

    #[test]
    fn test_parse_empty_span_is_dropped() {
        let trace = TraceContext::parse("abc/;o=0").unwrap();
        assert_eq!(trace.span_id, None);
    }

    #[test]
    fn test_record_severity_keeps_maximum() {
        let context = RequestContext::new(None);
        assert_eq!(context.max_severity(), None);

        context.record_severity(Severity::Info);
        context.record_severity(Severity::Error);
        context.record_severity(Severity::Warning);
        assert_eq!(context.max_severity(), Some(Severity::Error));
    }

    #[test]
    fn test_current_is_scoped() {
        assert!(RequestContext::current().is_none());

        let context = RequestContext::new(TraceContext::parse("t/s"));
        let seen = context.clone().sync_scope(|| {
            let current = RequestContext::current().unwrap();
            current.record_severity(Severity::Notice);
            current.trace().map(|t| t.trace_id.clone())
        });

        assert_eq!(seen.as_deref(), Some("t"));
        assert_eq!(context.max_severity(), Some(Severity::Notice));
        assert!(RequestContext::current().is_none());
    }

    #[tokio::test]
    async fn test_scope_spans_await_points() {
        let context = RequestContext::new(None);
        context
            .clone()
            .scope(async {
                tokio::task::yield_now().await;
                if let Some(current) = RequestContext::current() {
                    current.record_severity(Severity::Critical);
                }
            })
            .await;
        assert_eq!(context.max_severity(), Some(Severity::Critical));
    }
}
