use crate::config::types::StreamConfig;
use crate::ingestion::IngestionClient;
use crate::shipper::entry::LogEntry;
use crate::shipper::worker::{Worker, WorkerConfig};
use crate::shutdown::ShutdownRegistry;
use tracing::info;

/// One log stream shipped by its own background worker.
pub struct BackgroundTransport<C: IngestionClient> {
    worker: Worker<C>,
}

impl<C: IngestionClient> BackgroundTransport<C> {
    /// Create the worker and start it.
    pub fn new(
        name: impl Into<String>,
        client: C,
        config: WorkerConfig,
        registry: ShutdownRegistry,
    ) -> std::io::Result<Self> {
        let worker = Worker::new(name, client, config, registry);
        worker.start()?;
        info!(
            stream = worker.name(),
            max_batch_size = worker.config().max_batch_size,
            "Started log transport"
        );
        Ok(Self { worker })
    }

    pub fn from_stream_config(
        client: C,
        stream: &StreamConfig,
        registry: ShutdownRegistry,
    ) -> std::io::Result<Self> {
        Self::new(stream.log_name.clone(), client, WorkerConfig::from(stream), registry)
    }

    /// Fire-and-forget.
    pub fn send(&self, entry: LogEntry) {
        self.worker.enqueue(entry);
    }

    /// Block until everything sent so far has been through a commit attempt.
    pub fn flush(&self) {
        self.worker.flush();
    }

    pub fn worker(&self) -> &Worker<C> {
        &self.worker
    }
}
