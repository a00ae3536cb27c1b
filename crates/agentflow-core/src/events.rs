//! Typed publish/subscribe used by the queue, runtime, and workflow engine.
//!
//! Handlers run synchronously on the emitting task, in subscription order.
//! A panicking handler is caught and logged so the remaining handlers still
//! receive the event.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tracing::error;

type Handler<E> = Arc<dyn Fn(&E) + Send + Sync>;

struct Inner<E> {
    name: &'static str,
    handlers: RwLock<Vec<(u64, Handler<E>)>>,
    next_id: AtomicU64,
}

trait Detach: Send + Sync {
    fn detach(&self, id: u64) -> bool;
}

impl<E: 'static> Detach for Inner<E> {
    fn detach(&self, id: u64) -> bool {
        let mut handlers = self.handlers.write();
        let before = handlers.len();
        handlers.retain(|(handler_id, _)| *handler_id != id);
        handlers.len() != before
    }
}

/// Handle returned by [`EventBus::subscribe`].
///
/// Dropping the handle keeps the handler attached; call
/// [`Subscription::unsubscribe`] to detach it.
pub struct Subscription {
    id: u64,
    bus: Weak<dyn Detach>,
}

impl Subscription {
    /// Detach the handler. Returns false if it was already gone.
    pub fn unsubscribe(self) -> bool {
        match self.bus.upgrade() {
            Some(bus) => bus.detach(self.id),
            None => false,
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

/// A set of event handlers for events of type `E`.
pub struct EventBus<E> {
    inner: Arc<Inner<E>>,
}

impl<E: 'static> EventBus<E> {
    /// Create a bus; `name` tags log output for failing handlers.
    pub fn new(name: &'static str) -> Self {
        Self {
            inner: Arc::new(Inner {
                name,
                handlers: RwLock::new(Vec::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Attach a handler.
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        self.inner.handlers.write().push((id, Arc::new(handler)));
        let inner: Arc<dyn Detach> = self.inner.clone();
        Subscription {
            id,
            bus: Arc::downgrade(&inner),
        }
    }

    /// Deliver an event to every handler.
    pub fn emit(&self, event: &E) {
        // Snapshot so handlers may (un)subscribe without deadlocking.
        let handlers: Vec<Handler<E>> = self
            .inner
            .handlers
            .read()
            .iter()
            .map(|(_, h)| h.clone())
            .collect();

        for handler in handlers {
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| handler(event))) {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                error!(bus = self.inner.name, "Event handler error: {}", message);
            }
        }
    }

    /// Remove all handlers.
    pub fn clear(&self) {
        self.inner.handlers.write().clear();
    }

    /// Number of attached handlers.
    pub fn handler_count(&self) -> usize {
        self.inner.handlers.read().len()
    }
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod tests;
