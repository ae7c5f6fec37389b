pub mod entry;
pub mod literal;
pub mod queue;
pub mod transport;
pub mod translate;
pub mod worker;

pub use entry::{EntryMetadata, HttpRequestInfo, LogEntry, Resource, Severity};
pub use queue::EntryQueue;
pub use transport::BackgroundTransport;
pub use translate::Payload;
pub use worker::{Worker, WorkerConfig};
