//! Ordered, multi-writer, multi-reader topic → handler association.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use metrics::counter;
use parking_lot::RwLock;
use tracing::{debug, error};

/// Callback invoked for every inbound message on its registered topic.
///
/// Handlers run sequentially on the broker connection's background task and
/// must not block; anything slow belongs on a channel to another task.
pub type TopicHandler = Arc<dyn Fn(&str, &[u8]) + Send + Sync>;

/// Topic → ordered handler list.
///
/// Registrations persist across broker reconnects: this registry is the
/// durable record of what should be subscribed, while broker-side
/// subscriptions are a cache rebuilt from it on every successful connect.
#[derive(Default)]
pub struct TopicHandlerRegistry {
    handlers: RwLock<HashMap<String, Vec<TopicHandler>>>,
}

impl TopicHandlerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a handler for `topic`. Registration order is invocation order.
    ///
    /// Never deduplicates: the same handler registered twice is invoked
    /// twice. Callers own idempotent registration.
    pub fn register(&self, topic: &str, handler: TopicHandler) {
        let mut handlers = self.handlers.write();
        handlers.entry(topic.to_string()).or_default().push(handler);
        debug!(topic, "handler registered");
    }

    /// Snapshot of the handlers for `topic`, in registration order.
    ///
    /// Returns clones of the handler refs so an in-progress dispatch cannot
    /// be corrupted by concurrent registration — including a handler that
    /// itself registers another handler mid-dispatch.
    pub fn handlers_for(&self, topic: &str) -> Vec<TopicHandler> {
        self.handlers.read().get(topic).cloned().unwrap_or_default()
    }

    /// Topics with at least one registered handler.
    pub fn topics(&self) -> Vec<String> {
        self.handlers.read().keys().cloned().collect()
    }

    /// Number of handlers currently registered for `topic`.
    pub fn handler_count(&self, topic: &str) -> usize {
        self.handlers.read().get(topic).map_or(0, Vec::len)
    }

    /// Invoke every handler registered for `topic`, in registration order.
    ///
    /// Each call is isolated: a panicking handler is logged and the
    /// remaining handlers still run, and nothing propagates to the caller
    /// (the connection's poll task). Returns the number of handlers invoked.
    pub fn dispatch(&self, topic: &str, payload: &[u8]) -> usize {
        let handlers = self.handlers_for(topic);
        for (index, handler) in handlers.iter().enumerate() {
            let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| handler(topic, payload)));
            if outcome.is_err() {
                counter!("broker_handler_panics_total").increment(1);
                error!(topic, index, "message handler panicked, continuing with remaining handlers");
            }
        }
        debug!(topic, handlers = handlers.len(), "dispatched message");
        handlers.len()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
