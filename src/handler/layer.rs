use crate::handler::context::RequestContext;
use crate::ingestion::IngestionClient;
use crate::shipper::entry::{LogEntry, Resource, Severity};
use crate::shipper::transport::BackgroundTransport;
use crate::shipper::worker::WORKER_THREAD_PREFIX;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

/// Targets whose events are never shipped: the shipping machinery, whose
/// events would otherwise feed the queue from itself, and the service's own
/// startup and shutdown messages.
const INTERNAL_TARGETS: &[&str] = &[
    "log_groups::shipper",
    "log_groups::ingestion",
    "log_groups::shutdown",
    "log_groups::cli",
    "log_groups::web::server",
];

/// `tracing` layer that ships application events on the application stream.
///
/// Each event at or above `min_severity` becomes one entry carrying the
/// configured resource and labels. Inside a request the entry also carries
/// the request's trace and span, and its severity is reported to the request
/// context so the summary can roll it up.
pub struct GroupingLayer<C: IngestionClient> {
    transport: Arc<BackgroundTransport<C>>,
    min_severity: Severity,
    resource: Resource,
    labels: HashMap<String, String>,
}

impl<C: IngestionClient> GroupingLayer<C> {
    pub fn new(transport: Arc<BackgroundTransport<C>>, min_severity: Severity) -> Self {
        Self {
            transport,
            min_severity,
            resource: Resource::default(),
            labels: HashMap::new(),
        }
    }

    pub fn with_resource(mut self, resource: Resource) -> Self {
        self.resource = resource;
        self
    }

    pub fn with_labels(mut self, labels: HashMap<String, String>) -> Self {
        self.labels = labels;
        self
    }
}

fn is_internal(target: &str) -> bool {
    if INTERNAL_TARGETS.iter().any(|prefix| target.starts_with(prefix)) {
        return true;
    }
    // Anything logged from a worker thread, e.g. by the HTTP client during a commit
    std::thread::current()
        .name()
        .is_some_and(|name| name.starts_with(WORKER_THREAD_PREFIX))
}

impl<S, C> Layer<S> for GroupingLayer<C>
where
    S: Subscriber,
    C: IngestionClient,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if is_internal(metadata.target()) {
            return;
        }

        let severity = Severity::from(metadata.level());
        if severity < self.min_severity {
            return;
        }

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        let (trace, span_id) = match RequestContext::current() {
            Some(context) => {
                context.record_severity(severity);
                match context.trace() {
                    Some(trace) => (Some(trace.trace_id.clone()), trace.span_id.clone()),
                    None => (None, None),
                }
            }
            None => (None, None),
        };

        let entry = LogEntry::text(visitor.finish(), severity)
            .with_resource(self.resource.clone())
            .with_labels(self.labels.clone())
            .with_trace(trace, span_id);
        self.transport.send(entry);
    }
}

/// Collects the `message` field and renders the others as `key=value`.
#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: Vec<String>,
}

impl MessageVisitor {
    fn finish(self) -> String {
        if self.fields.is_empty() {
            self.message
        } else if self.message.is_empty() {
            self.fields.join(" ")
        } else {
            format!("{} {}", self.message, self.fields.join(" "))
        }
    }
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.push(format!("{}={}", field.name(), value));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else {
            self.fields.push(format!("{}={:?}", field.name(), value));
        }
    }
}
