//! Runtime events: types and broadcast bus.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast` with a per-instance sequence
//!
//! ## Quick reference
//! - **Publishers**: the dispatcher actor (routing, hand-off, shutdown), slot queues
//!   (execution), `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the dispatcher's subscriber listener (fans out to `SubscriberSet`)
//!   and any receiver obtained from `Dispatcher::subscribe`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
