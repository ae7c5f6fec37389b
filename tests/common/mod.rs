#![allow(dead_code)]

use log_groups::ingestion::{IngestError, IngestionClient, LogBatch};
use log_groups::shipper::{EntryMetadata, LogEntry, Payload, Severity};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

pub type Commit = Vec<(Payload, EntryMetadata)>;

/// Client that keeps every committed batch in memory.
#[derive(Clone, Default)]
pub struct RecordingClient {
    commits: Arc<Mutex<Vec<Commit>>>,
}

impl RecordingClient {
    pub fn commits(&self) -> Vec<Commit> {
        self.commits.lock().unwrap().clone()
    }

    /// Text of every committed entry, in commit order.
    pub fn messages(&self) -> Vec<String> {
        self.commits()
            .into_iter()
            .flatten()
            .map(|(payload, _)| match payload {
                Payload::Text(text) => text,
                Payload::Structured(value) => value.to_string(),
                Payload::Summary => "<summary>".to_string(),
            })
            .collect()
    }
}

pub struct RecordingBatch {
    commits: Arc<Mutex<Vec<Commit>>>,
    entries: Commit,
}

impl IngestionClient for RecordingClient {
    type Batch = RecordingBatch;

    fn batch(&self) -> RecordingBatch {
        RecordingBatch {
            commits: self.commits.clone(),
            entries: Vec::new(),
        }
    }
}

impl LogBatch for RecordingBatch {
    fn add_text(&mut self, text: Option<String>, metadata: EntryMetadata) {
        let payload = match text {
            Some(text) => Payload::Text(text),
            None => Payload::Summary,
        };
        self.entries.push((payload, metadata));
    }

    fn add_structured(&mut self, value: Value, metadata: EntryMetadata) {
        self.entries.push((Payload::Structured(value), metadata));
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn commit(self) -> Result<(), IngestError> {
        self.commits.lock().unwrap().push(self.entries);
        Ok(())
    }
}

/// Client whose commits always fail.
#[derive(Clone, Default)]
pub struct FailingClient {
    attempts: Arc<AtomicUsize>,
}

impl FailingClient {
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

pub struct FailingBatch {
    attempts: Arc<AtomicUsize>,
    entries: usize,
}

impl IngestionClient for FailingClient {
    type Batch = FailingBatch;

    fn batch(&self) -> FailingBatch {
        FailingBatch {
            attempts: self.attempts.clone(),
            entries: 0,
        }
    }
}

impl LogBatch for FailingBatch {
    fn add_text(&mut self, _text: Option<String>, _metadata: EntryMetadata) {
        self.entries += 1;
    }

    fn add_structured(&mut self, _value: Value, _metadata: EntryMetadata) {
        self.entries += 1;
    }

    fn len(&self) -> usize {
        self.entries
    }

    fn commit(self) -> Result<(), IngestError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(IngestError::Backend {
            status: 503,
            message: "unavailable".to_string(),
        })
    }
}

#[derive(Default)]
struct GateState {
    open: bool,
    commits_started: usize,
}

/// Client whose commits block until the gate is opened.
#[derive(Clone, Default)]
pub struct GatedClient {
    state: Arc<(Mutex<GateState>, Condvar)>,
    recorder: RecordingClient,
}

impl GatedClient {
    pub fn open(&self) {
        let (lock, cvar) = &*self.state;
        lock.lock().unwrap().open = true;
        cvar.notify_all();
    }

    /// Wait until a commit is blocked on the gate.
    pub fn wait_for_commit(&self, timeout: Duration) -> bool {
        let (lock, cvar) = &*self.state;
        let guard = lock.lock().unwrap();
        let (guard, _) = cvar
            .wait_timeout_while(guard, timeout, |state| state.commits_started == 0)
            .unwrap();
        guard.commits_started > 0
    }

    pub fn recorder(&self) -> &RecordingClient {
        &self.recorder
    }
}

pub struct GatedBatch {
    state: Arc<(Mutex<GateState>, Condvar)>,
    inner: RecordingBatch,
}

impl IngestionClient for GatedClient {
    type Batch = GatedBatch;

    fn batch(&self) -> GatedBatch {
        GatedBatch {
            state: self.state.clone(),
            inner: self.recorder.batch(),
        }
    }
}

impl LogBatch for GatedBatch {
    fn add_text(&mut self, text: Option<String>, metadata: EntryMetadata) {
        self.inner.add_text(text, metadata);
    }

    fn add_structured(&mut self, value: Value, metadata: EntryMetadata) {
        self.inner.add_structured(value, metadata);
    }

    fn len(&self) -> usize {
        self.inner.len()
    }

    fn commit(self) -> Result<(), IngestError> {
        let (lock, cvar) = &*self.state;
        let mut state = lock.lock().unwrap();
        state.commits_started += 1;
        cvar.notify_all();
        let state = cvar.wait_while(state, |state| !state.open).unwrap();
        drop(state);
        self.inner.commit()
    }
}

pub fn entry(message: &str) -> LogEntry {
    LogEntry::text(message, Severity::Info)
}
