use crate::config::types::StreamConfig;
use crate::ingestion::{IngestionClient, LogBatch};
use crate::shipper::entry::LogEntry;
use crate::shipper::queue::EntryQueue;
use crate::shipper::translate::add_entry;
use crate::shutdown::{HookId, ShutdownHook, ShutdownRegistry};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, warn};

pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(5);
pub const DEFAULT_MAX_BATCH_SIZE: usize = 10;
pub const DEFAULT_MAX_LATENCY: Duration = Duration::ZERO;

pub(crate) const WORKER_THREAD_PREFIX: &str = "log-groups-worker";

#[derive(Debug, Clone, PartialEq)]
pub struct WorkerConfig {
    /// How long the shutdown hook waits for pending entries. `None` waits forever.
    pub grace_period: Option<Duration>,
    pub max_batch_size: usize,
    pub max_latency: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            grace_period: Some(DEFAULT_GRACE_PERIOD),
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            max_latency: DEFAULT_MAX_LATENCY,
        }
    }
}

impl From<&StreamConfig> for WorkerConfig {
    fn from(stream: &StreamConfig) -> Self {
        Self {
            grace_period: stream.grace_period,
            max_batch_size: stream.max_batch_size,
            max_latency: stream.max_latency,
        }
    }
}

pub(crate) enum QueueItem {
    Entry(LogEntry),
    Terminator,
}

/// Background worker that ships one log stream in batches.
///
/// Entries are drained from an in-memory queue on a dedicated thread,
/// translated onto a batch from the ingestion client and committed. A failed
/// commit is logged and dropped; delivery is best-effort.
pub struct Worker<C: IngestionClient> {
    inner: Arc<WorkerInner<C>>,
}

struct WorkerInner<C: IngestionClient> {
    name: String,
    client: Arc<C>,
    config: WorkerConfig,
    queue: Arc<EntryQueue<QueueItem>>,
    registry: ShutdownRegistry,
    /// Cleared by the thread itself on exit, so readable without the lifecycle lock
    alive: Arc<AtomicBool>,
    lifecycle: Mutex<Lifecycle>,
}

#[derive(Default)]
struct Lifecycle {
    thread: Option<WorkerThread>,
    registration: Option<HookId>,
}

struct WorkerThread {
    handle: JoinHandle<()>,
    /// Disconnects when the thread exits.
    done: mpsc::Receiver<()>,
    terminator_sent: bool,
}

/// Marks the thread dead and disconnects `done` when dropped, including on panic.
struct ExitGuard {
    alive: Arc<AtomicBool>,
    _done: mpsc::Sender<()>,
}

impl Drop for ExitGuard {
    fn drop(&mut self) {
        self.alive.store(false, Ordering::SeqCst);
    }
}

impl<C: IngestionClient> Worker<C> {
    pub fn new(
        name: impl Into<String>,
        client: C,
        config: WorkerConfig,
        registry: ShutdownRegistry,
    ) -> Self {
        Self {
            inner: Arc::new(WorkerInner {
                name: name.into(),
                client: Arc::new(client),
                config,
                queue: Arc::new(EntryQueue::new()),
                registry,
                alive: Arc::new(AtomicBool::new(false)),
                lifecycle: Mutex::new(Lifecycle::default()),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.inner.config
    }

    pub fn is_alive(&self) -> bool {
        self.inner.is_alive()
    }

    /// Spawn the background thread. No-op while a thread is still alive.
    pub fn start(&self) -> std::io::Result<()> {
        let mut lifecycle = self.inner.lock_lifecycle();
        if self.inner.is_alive() {
            return Ok(());
        }
        if let Some(finished) = lifecycle.thread.take() {
            // Previous thread exited without a stop() call
            if finished.handle.join().is_err() {
                warn!(stream = %self.inner.name, "Previous worker thread panicked");
            }
        }

        let alive = Arc::clone(&self.inner.alive);
        alive.store(true, Ordering::SeqCst);
        let (done_tx, done_rx) = mpsc::channel();
        let guard = ExitGuard {
            alive: Arc::clone(&alive),
            _done: done_tx,
        };

        let name = self.inner.name.clone();
        let client = Arc::clone(&self.inner.client);
        let queue = Arc::clone(&self.inner.queue);
        let config = self.inner.config.clone();

        let spawned = thread::Builder::new()
            .name(format!("{}-{}", WORKER_THREAD_PREFIX, name))
            .spawn(move || {
                let _guard = guard;
                run_worker(&name, client.as_ref(), &queue, &config);
            });
        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                alive.store(false, Ordering::SeqCst);
                return Err(e);
            }
        };

        lifecycle.thread = Some(WorkerThread {
            handle,
            done: done_rx,
            terminator_sent: false,
        });

        if lifecycle.registration.is_none() {
            let inner: Arc<dyn ShutdownHook> = self.inner.clone();
            let hook: Weak<dyn ShutdownHook> = Arc::downgrade(&inner);
            lifecycle.registration = Some(self.inner.registry.register(hook));
        }

        Ok(())
    }

    /// Ask the worker to finish what is queued and exit.
    ///
    /// Waits up to `grace_period` (`None` waits forever) and returns whether the
    /// thread exited in time. A worker that did not is left running; a later
    /// call waits on it again.
    pub fn stop(&self, grace_period: Option<Duration>) -> bool {
        self.inner.stop(grace_period)
    }

    /// Queue an entry for shipment. Never blocks.
    pub fn enqueue(&self, entry: LogEntry) {
        self.inner.queue.enqueue(QueueItem::Entry(entry));
    }

    /// Block until every entry queued so far has been through a commit attempt.
    pub fn flush(&self) {
        self.inner.queue.flush();
    }

    /// Entries (and possibly the terminator) not yet through a commit attempt.
    pub fn pending(&self) -> usize {
        self.inner.queue.unfinished()
    }
}

impl<C: IngestionClient> WorkerInner<C> {
    fn lock_lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    fn stop(&self, grace_period: Option<Duration>) -> bool {
        let mut lifecycle = self.lock_lifecycle();
        let Some(thread) = lifecycle.thread.as_mut() else {
            return true;
        };

        if !thread.terminator_sent && self.is_alive() {
            self.queue.enqueue(QueueItem::Terminator);
            thread.terminator_sent = true;
        }

        if let Some(grace) = grace_period {
            debug!(stream = %self.name, grace_ms = grace.as_millis() as u64, "Waiting for worker to stop");
        }

        let stopped = match grace_period {
            Some(grace) => matches!(
                thread.done.recv_timeout(grace),
                Err(RecvTimeoutError::Disconnected)
            ),
            None => thread.done.recv().is_err(),
        };

        if !stopped {
            warn!(stream = %self.name, pending = self.queue.unfinished(), "Worker did not stop within grace period");
            return false;
        }

        if let Some(thread) = lifecycle.thread.take() {
            if thread.handle.join().is_err() {
                error!(stream = %self.name, "Worker thread panicked");
            }
        }
        if let Some(id) = lifecycle.registration.take() {
            self.registry.deregister(id);
        }

        true
    }
}

impl<C: IngestionClient> ShutdownHook for WorkerInner<C> {
    fn name(&self) -> &str {
        &self.name
    }

    fn on_shutdown(&self) {
        if !self.is_alive() {
            return;
        }

        let queued = self.queue.len();
        if queued > 0 {
            eprintln!(
                "Program shutting down, attempting to send {} queued log entries to '{}'...",
                queued, self.name
            );
        }

        if self.stop(self.config.grace_period) {
            eprintln!("Sent all pending logs for '{}'.", self.name);
        } else {
            // The terminator is still unacknowledged while the thread runs
            let dropped = self.queue.unfinished().saturating_sub(1);
            eprintln!("Failed to send {} pending logs for '{}'.", dropped, self.name);
        }
    }
}

impl<C: IngestionClient> Drop for WorkerInner<C> {
    fn drop(&mut self) {
        // Let a still-running thread exit once it drains what is queued
        let alive = self.alive.load(Ordering::SeqCst);
        let lifecycle = self
            .lifecycle
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(thread) = lifecycle.thread.as_mut() {
            if !thread.terminator_sent && alive {
                self.queue.enqueue(QueueItem::Terminator);
                thread.terminator_sent = true;
            }
        }
    }
}

fn run_worker<C: IngestionClient>(
    name: &str,
    client: &C,
    queue: &EntryQueue<QueueItem>,
    config: &WorkerConfig,
) {
    debug!(stream = name, "Background thread started");

    loop {
        let mut batch = client.batch();
        let items = queue.drain_batch(config.max_batch_size, config.max_latency);
        let drained = items.len();

        let mut quit = false;
        for item in items {
            match item {
                // Keep going: entries pulled alongside the terminator still ship
                QueueItem::Terminator => quit = true,
                QueueItem::Entry(entry) => add_entry(&mut batch, entry),
            }
        }

        commit_batch(name, batch);
        queue.acknowledge(drained);

        if quit {
            break;
        }
    }

    debug!(stream = name, "Background thread exited gracefully");
}

fn commit_batch<B: LogBatch>(name: &str, batch: B) {
    let total = batch.len();
    if total == 0 {
        return;
    }

    match batch.commit() {
        Ok(()) => debug!(stream = name, entries = total, "Submitted logs"),
        Err(e) => error!(stream = name, entries = total, error = %e, "Failed to submit logs"),
    }
}
