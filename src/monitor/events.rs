//! Event bus implementations

use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;

/// A named event with a JSON payload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    pub name: String,
    pub payload: Value,
}

/// Fire-and-forget event sink
pub trait EventBus: Send + Sync {
    /// Publish an event; delivery failures are not reported to the caller
    fn emit(&self, name: &str, payload: Value);
}

/// Event bus that only logs events
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventBus;

impl EventBus for TracingEventBus {
    fn emit(&self, name: &str, payload: Value) {
        tracing::debug!(event = name, %payload, "Event emitted");
    }
}

/// Event bus fanning out to any number of subscribers
#[derive(Debug, Clone)]
pub struct ChannelEventBus {
    tx: broadcast::Sender<Event>,
}

impl ChannelEventBus {
    /// Create a bus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to events emitted from now on
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

impl Default for ChannelEventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl EventBus for ChannelEventBus {
    fn emit(&self, name: &str, payload: Value) {
        let event = Event {
            name: name.to_string(),
            payload,
        };
        // No subscribers is not an error
        if self.tx.send(event).is_err() {
            tracing::trace!(event = name, "No event subscribers");
        }
    }
}
