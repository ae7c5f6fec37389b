pub mod context;
pub mod layer;
pub mod middleware;

pub use context::{RequestContext, TraceContext};
pub use layer::GroupingLayer;
pub use middleware::{log_requests, summary_severity, with_request_logging, RequestLogger};
