//! Explicit replacement for process-exit callbacks.
//!
//! Components that need a last chance to flush register a hook on start and
//! deregister on stop. The process entry point calls [`ShutdownRegistry::run`]
//! before exiting.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tracing::debug;

pub trait ShutdownHook: Send + Sync {
    fn name(&self) -> &str;

    /// Called once from [`ShutdownRegistry::run`]. Must not panic.
    fn on_shutdown(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HookId(u64);

#[derive(Clone, Default)]
pub struct ShutdownRegistry {
    inner: Arc<Mutex<RegistryInner>>,
}

#[derive(Default)]
struct RegistryInner {
    next_id: u64,
    hooks: Vec<(HookId, Weak<dyn ShutdownHook>)>,
}

impl ShutdownRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RegistryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Hooks are held weakly; one whose owner is gone is skipped.
    pub fn register(&self, hook: Weak<dyn ShutdownHook>) -> HookId {
        let mut inner = self.lock();
        let id = HookId(inner.next_id);
        inner.next_id += 1;
        inner.hooks.push((id, hook));
        id
    }

    pub fn deregister(&self, id: HookId) -> bool {
        let mut inner = self.lock();
        let before = inner.hooks.len();
        inner.hooks.retain(|(hook_id, _)| *hook_id != id);
        inner.hooks.len() != before
    }

    /// Number of live registered hooks.
    pub fn len(&self) -> usize {
        self.lock()
            .hooks
            .iter()
            .filter(|(_, hook)| hook.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run every registered hook in registration order.
    ///
    /// The registry lock is released before hooks run so they may deregister
    /// themselves.
    pub fn run(&self) {
        let hooks: Vec<Arc<dyn ShutdownHook>> = {
            let mut inner = self.lock();
            let hooks = inner
                .hooks
                .iter()
                .filter_map(|(_, hook)| hook.upgrade())
                .collect();
            inner.hooks.clear();
            hooks
        };

        for hook in hooks {
            debug!(hook = hook.name(), "Running shutdown hook");
            hook.on_shutdown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingHook {
        name: String,
        calls: AtomicUsize,
        order: Arc<Mutex<Vec<String>>>,
    }

    impl CountingHook {
        fn new(name: &str, order: Arc<Mutex<Vec<String>>>) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                calls: AtomicUsize::new(0),
                order,
            })
        }
    }

    impl ShutdownHook for CountingHook {
        fn name(&self) -> &str {
            &self.name
        }

        fn on_shutdown(&self) {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.order.lock().unwrap().push(self.name.clone());
        }
    }

    fn as_weak(hook: &Arc<CountingHook>) -> Weak<dyn ShutdownHook> {
        let hook: Arc<dyn ShutdownHook> = hook.clone();
        Arc::downgrade(&hook)
    }

    #[test]
    fn test_run_invokes_hooks_in_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let registry = ShutdownRegistry::new();
        let first = CountingHook::new("request", order.clone());
        let second = CountingHook::new("application", order.clone());

        registry.register(as_weak(&first));
        registry.register(as_weak(&second));
        assert_eq!(registry.len(), 2);

        registry.run();

        assert_eq!(*order.lock().unwrap(), vec!["request", "application"]);
        assert_eq!(first.calls.load(Ordering::SeqCst), 1);
        assert!(registry.is_empty());

        // Hooks run at most once
        registry.run();
        assert_eq!(first.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_deregistered_hook_is_skipped() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let registry = ShutdownRegistry::new();
        let hook = CountingHook::new("request", order.clone());

        let id = registry.register(as_weak(&hook));
        assert!(registry.deregister(id));
        assert!(!registry.deregister(id));

        registry.run();
        assert_eq!(hook.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_dropped_hook_is_skipped() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let registry = ShutdownRegistry::new();
        let hook = CountingHook::new("request", order.clone());

        registry.register(as_weak(&hook));
        drop(hook);

        assert_eq!(registry.len(), 0);
        registry.run();
        assert!(order.lock().unwrap().is_empty());
    }
}
