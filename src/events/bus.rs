//! # Event bus for broadcasting runtime events.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`] that provides
//! non-blocking event publishing from multiple sources (dispatcher actor, slot
//! queues, bind tasks).
//!
//! ## Architecture
//! ```text
//! Publishers (many):                      Consumers:
//!   Dispatcher actor ──┐
//!   Slot queue 0     ──┼──────► Bus ──┬──► subscriber_listener ────► SubscriberSet
//!   Slot queue N     ──┤              └──► Dispatcher::subscribe() receivers
//!   Bind tasks       ──┘
//! ```
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never blocks.
//! - **Per-bus sequence**: every published event gets the next sequence number of
//!   this bus; two dispatchers never share a counter.
//! - **Lag handling**: slow receivers get `RecvError::Lagged(n)` and skip `n` oldest items.
//! - **No persistence**: events are lost if there are no active receivers at send time.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for runtime events.
///
/// Cheap to clone; clones share the channel and the sequence counter.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
    seq: Arc<AtomicU64>,
}

impl Bus {
    /// Creates a new bus with the given channel capacity (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, _rx) = broadcast::channel::<Event>(capacity);
        Self {
            tx,
            seq: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Stamps the event with the next sequence number and publishes it.
    ///
    /// If there are no receivers, the event is dropped.
    pub fn publish(&self, mut ev: Event) {
        ev.seq = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
        let _ = self.tx.send(ev);
    }

    /// Creates a new receiver that will observe subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;

    #[tokio::test]
    async fn sequence_is_per_bus_and_monotonic() {
        let a = Bus::new(8);
        let b = Bus::new(8);
        let mut ra = a.subscribe();
        let mut rb = b.subscribe();

        a.publish(Event::new(EventKind::ShutdownRequested));
        a.clone().publish(Event::new(EventKind::ShutdownComplete));
        b.publish(Event::new(EventKind::ShutdownRequested));

        assert_eq!(ra.recv().await.unwrap().seq, 1);
        assert_eq!(ra.recv().await.unwrap().seq, 2);
        assert_eq!(rb.recv().await.unwrap().seq, 1);
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let bus = Bus::new(0);
        let _rx = bus.subscribe();
        bus.publish(Event::new(EventKind::ShutdownRequested));
    }
}
