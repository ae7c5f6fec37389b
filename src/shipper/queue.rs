use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Unbounded FIFO shared between producers and a single draining worker.
///
/// Tracks how many enqueued items are still unacknowledged so producers can
/// block in [`EntryQueue::flush`] until the worker has caught up.
pub struct EntryQueue<T> {
    state: Mutex<QueueState<T>>,
    not_empty: Condvar,
    all_done: Condvar,
}

struct QueueState<T> {
    items: VecDeque<T>,
    unfinished: usize,
}

impl<T> Default for EntryQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> EntryQueue<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::new(),
                unfinished: 0,
            }),
            not_empty: Condvar::new(),
            all_done: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append an item to the tail. Never blocks on the consumer.
    pub fn enqueue(&self, item: T) {
        let mut state = self.lock();
        state.items.push_back(item);
        state.unfinished += 1;
        self.not_empty.notify_one();
    }

    /// Pull up to `max_items` items.
    ///
    /// Blocks indefinitely for the first item, then keeps taking items until
    /// `max_items` is reached or nothing arrives within what is left of the
    /// `max_latency` budget. The budget is shared by the whole pull and starts
    /// once the first item is in hand.
    pub fn drain_batch(&self, max_items: usize, max_latency: Duration) -> Vec<T> {
        let max_items = max_items.max(1);
        let mut state = self.lock();

        let first = loop {
            if let Some(item) = state.items.pop_front() {
                break item;
            }
            state = self
                .not_empty
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        };

        let deadline = Instant::now() + max_latency;
        let mut items = vec![first];

        while items.len() < max_items {
            if let Some(item) = state.items.pop_front() {
                items.push(item);
                continue;
            }

            let now = Instant::now();
            if now >= deadline {
                break;
            }

            let (guard, timeout) = self
                .not_empty
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            state = guard;

            if timeout.timed_out() && state.items.is_empty() {
                break;
            }
        }

        items
    }

    /// Mark `n` drained items as fully processed.
    pub fn acknowledge(&self, n: usize) {
        let mut state = self.lock();
        debug_assert!(n <= state.unfinished, "acknowledged more items than enqueued");
        state.unfinished = state.unfinished.saturating_sub(n);
        if state.unfinished == 0 {
            self.all_done.notify_all();
        }
    }

    /// Block until every item enqueued so far has been acknowledged.
    pub fn flush(&self) {
        let mut state = self.lock();
        while state.unfinished > 0 {
            state = self
                .all_done
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Like [`EntryQueue::flush`] but gives up after `timeout`.
    /// Returns whether everything was acknowledged.
    pub fn flush_timeout(&self, timeout: Duration) -> bool {
        let state = self.lock();
        let (state, _) = self
            .all_done
            .wait_timeout_while(state, timeout, |s| s.unfinished > 0)
            .unwrap_or_else(PoisonError::into_inner);
        state.unfinished == 0
    }

    /// Items waiting to be drained.
    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Items enqueued but not yet acknowledged, including any in-flight batch.
    pub fn unfinished(&self) -> usize {
        self.lock().unfinished
    }
}
