//! Domain event bus
//!
//! Each core operation publishes its events after the surrounding
//! transaction commits. Subscribers (notification dispatch, analytics,
//! cache invalidation) register explicitly; publishing never fails the
//! operation that produced the event.

use fitforge_core::DomainEvent;
use tokio::sync::broadcast;
use tracing::debug;

const DEFAULT_CAPACITY: usize = 256;

/// Broadcast bus for domain events. Cloning is cheap; all clones share
/// the same channel.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<DomainEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Register a subscriber. Slow subscribers may miss events (lagged
    /// receivers); delivery is at-least-once for keeping-up consumers.
    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.tx.subscribe()
    }

    /// Publish fire-and-forget. An event with no subscribers is dropped.
    pub fn publish(&self, event: DomainEvent) {
        if self.tx.send(event).is_err() {
            debug!("domain event dropped: no subscribers");
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
