use crate::handler::context::{RequestContext, TraceContext};
use crate::ingestion::IngestionClient;
use crate::shipper::entry::{HttpRequestInfo, LogEntry, Resource, Severity};
use crate::shipper::transport::BackgroundTransport;
use axum::body::HttpBody;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::header::{CONTENT_LENGTH, HOST, REFERER, USER_AGENT};
use axum::http::{HeaderMap, HeaderName};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::Router;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Emits one summary entry on the request stream for every request.
pub struct RequestLogger<C: IngestionClient> {
    transport: Arc<BackgroundTransport<C>>,
    trace_header: Option<HeaderName>,
    resource: Resource,
    labels: HashMap<String, String>,
}

impl<C: IngestionClient> RequestLogger<C> {
    pub fn new(transport: Arc<BackgroundTransport<C>>) -> Self {
        Self {
            transport,
            trace_header: None,
            resource: Resource::default(),
            labels: HashMap::new(),
        }
    }

    pub fn with_trace_header(mut self, header: HeaderName) -> Self {
        self.trace_header = Some(header);
        self
    }

    pub fn with_resource(mut self, resource: Resource) -> Self {
        self.resource = resource;
        self
    }

    pub fn with_labels(mut self, labels: HashMap<String, String>) -> Self {
        self.labels = labels;
        self
    }

    fn trace_for(&self, headers: &HeaderMap) -> Option<TraceContext> {
        let header = self.trace_header.as_ref()?;
        let value = headers.get(header)?.to_str().ok()?;
        TraceContext::parse(value)
    }
}

/// Wrap every route of `router` with [`log_requests`].
pub fn with_request_logging<C: IngestionClient>(
    router: Router,
    logger: Arc<RequestLogger<C>>,
) -> Router {
    router.layer(middleware::from_fn_with_state(logger, log_requests::<C>))
}

/// Run the request inside a fresh [`RequestContext`], then ship its summary.
pub async fn log_requests<C: IngestionClient>(
    State(logger): State<Arc<RequestLogger<C>>>,
    request: Request,
    next: Next,
) -> Response {
    let started = Instant::now();
    let trace = logger.trace_for(request.headers());
    let context = RequestContext::new(trace.clone());
    let incoming = IncomingRequest::from_request(&request);

    let response = context.clone().scope(next.run(request)).await;

    let status = response.status().as_u16();
    let http_request = HttpRequestInfo {
        request_method: incoming.method,
        request_url: incoming.url,
        status,
        response_size: response.body().size_hint().exact(),
        latency: format_latency(started.elapsed()),
        remote_ip: incoming.remote_ip,
        request_size: incoming.request_size,
        user_agent: incoming.user_agent,
        referer: incoming.referer,
    };

    let severity = summary_severity(context.max_severity(), status);
    let (trace_id, span_id) = match trace {
        Some(trace) => (Some(trace.trace_id), trace.span_id),
        None => (None, None),
    };

    let entry = LogEntry::summary(severity, http_request)
        .with_resource(logger.resource.clone())
        .with_labels(logger.labels.clone())
        .with_trace(trace_id, span_id);
    logger.transport.send(entry);

    response
}

/// Severity of a request summary: the worst application severity seen while
/// handling it, or one derived from the status when nothing was logged.
pub fn summary_severity(max_seen: Option<Severity>, status: u16) -> Severity {
    match max_seen {
        Some(severity) => severity,
        None if status >= 400 => Severity::Error,
        None => Severity::Info,
    }
}

/// Seconds with five decimals, e.g. `0.00123s`
pub fn format_latency(elapsed: Duration) -> String {
    format!("{:.5}s", elapsed.as_secs_f64())
}

/// Request fields captured before the request is handed to the router.
struct IncomingRequest {
    method: String,
    url: String,
    remote_ip: Option<String>,
    request_size: Option<u64>,
    user_agent: Option<String>,
    referer: Option<String>,
}

impl IncomingRequest {
    fn from_request(request: &Request) -> Self {
        let headers = request.headers();
        let header = |name: HeaderName| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
        };

        let uri = request.uri();
        let url = match (uri.authority(), header(HOST)) {
            (None, Some(host)) => format!("http://{}{}", host, uri),
            _ => uri.to_string(),
        };

        Self {
            method: request.method().to_string(),
            url,
            remote_ip: request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string()),
            request_size: header(CONTENT_LENGTH).and_then(|len| len.parse().ok()),
            user_agent: header(USER_AGENT),
            referer: header(REFERER),
        }
    }
}
