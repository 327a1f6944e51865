//! Registry change notifications.
//!
//! Events go out on a tokio broadcast channel. Publishing never blocks and
//! never fails: with no subscribers the event is dropped, and a subscriber
//! that falls more than the channel capacity behind sees `Lagged` on its
//! own receiver. Nothing a subscriber does can reach back into the registry.

use tokio::sync::broadcast;

use crate::record::ConnectionRecord;

/// Events buffered per subscriber before the oldest are overwritten.
pub const EVENT_CAPACITY: usize = 256;

/// A change to the roster. Each carries a copy of the record as of the change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEvent {
    Added(ConnectionRecord),
    Updated(ConnectionRecord),
    Removed(ConnectionRecord),
}

impl RegistryEvent {
    pub fn record(&self) -> &ConnectionRecord {
        match self {
            RegistryEvent::Added(r) | RegistryEvent::Updated(r) | RegistryEvent::Removed(r) => r,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            RegistryEvent::Added(_) => "added",
            RegistryEvent::Updated(_) => "updated",
            RegistryEvent::Removed(_) => "removed",
        }
    }
}

/// Fan-out point for registry events. Cheap to clone; clones share the channel.
#[derive(Debug, Clone)]
pub struct NotificationHub {
    tx: broadcast::Sender<RegistryEvent>,
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationHub {
    pub fn new() -> Self {
        Self::with_capacity(EVENT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Receive every event published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.tx.subscribe()
    }

    /// Fire-and-forget.
    pub fn publish(&self, event: RegistryEvent) {
        let kind = event.kind();
        let addr = event.record().address;
        if self.tx.send(event).is_err() {
            tracing::trace!(kind, %addr, "no subscribers for registry event");
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
