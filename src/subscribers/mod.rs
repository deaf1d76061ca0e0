//! # Event subscribers.
//!
//! This module provides the [`Subscribe`] trait and the [`SubscriberSet`] fan-out
//! that delivers dispatcher events to user-supplied subscribers.
//!
//! ## Architecture
//! ```text
//! Dispatcher / slot queues ── publish(Event) ──► Bus ──► subscriber_listener
//!                                                              │
//!                                                              ▼
//!                                                        SubscriberSet::emit
//!                                                   ┌──────────┼──────────┐
//!                                                   ▼          ▼          ▼
//!                                               LogWriter   Metrics    Custom
//! ```

#[cfg(feature = "logging")]
mod embedded;
mod set;
mod subscriber;

#[cfg(feature = "logging")]
pub use embedded::LogWriter;
pub use set::SubscriberSet;
pub use subscriber::Subscribe;
