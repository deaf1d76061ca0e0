//! # Runtime events emitted by the dispatcher, its slots and their queues.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Routing events**: where a submitted task went (slot queue, spawn, overflow)
//! - **Slot events**: spawning, hand-off, binding and draining of worker slots
//! - **Execution events**: task start/finish, timeouts
//! - **Shutdown and subscriber events**
//!
//! The [`Event`] struct carries metadata such as the session, slot id, task id/name
//! and a reason string.
//!
//! ## Ordering guarantees
//! Each event gets a sequence number from the [`Bus`](crate::events::Bus) that
//! published it, increasing monotonically per dispatcher instance.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use slotvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::TimeoutHit)
//!     .with_session("alice")
//!     .with_slot(0)
//!     .with_timeout(Duration::from_secs(2));
//!
//! assert_eq!(ev.kind, EventKind::TimeoutHit);
//! assert_eq!(ev.session.as_deref(), Some("alice"));
//! assert_eq!(ev.timeout_ms, Some(2000));
//! ```

use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Routing events ===
    /// Task appended to a slot queue (affinity hit or fresh binding).
    ///
    /// Sets: `session`, `slot`, `task`, `task_id`
    TaskQueued,

    /// Pool full and no idle slot: task parked in the overflow registry.
    ///
    /// Sets: `session`, `task`, `task_id`
    TaskOverflowed,

    // === Slot events ===
    /// Capacity available: a new handle is being created for a session.
    ///
    /// Sets: `session`
    SlotSpawning,

    /// New slot created and bound.
    ///
    /// Sets: `session`, `slot`
    SlotSpawned,

    /// Slot released its session and is being rebound.
    ///
    /// Sets: `session` (new target), `slot`, `reason` (previous session or "unbound")
    HandoffStarted,

    /// Hand-off finished; slot bound to its new session and resumed.
    ///
    /// Sets: `session`, `slot`
    SlotBound,

    /// Binding a session failed; the affected tasks were rejected.
    ///
    /// Sets: `session`, `slot` (absent for a failed spawn), `reason`
    BindFailed,

    /// The binder could not create a handle at all.
    ///
    /// Sets: `session`, `reason`
    HandleUnavailable,

    /// A binder-reported alias already points at another session and was kept.
    ///
    /// Sets: `session` (the session just bound), `reason` (alias and existing target)
    AliasConflict,

    /// Slot queue ran empty after executing work.
    ///
    /// Sets: `session` (if still bound), `slot`
    SlotDrained,

    // === Execution events ===
    /// Task is starting on a slot.
    ///
    /// Sets: `session`, `slot`, `task`, `task_id`
    TaskStarting,

    /// Task finished successfully.
    ///
    /// Sets: `session`, `slot`, `task`, `task_id`
    TaskCompleted,

    /// Task finished with an error (including timeouts).
    ///
    /// Sets: `session`, `slot`, `task`, `task_id`, `reason`
    TaskFailed,

    /// Task exceeded its execution budget; always followed by `TaskFailed`.
    ///
    /// Sets: `session`, `slot`, `task`, `task_id`, `timeout_ms`
    TimeoutHit,

    /// Task waited too long in a queue and was dropped without running.
    ///
    /// Sets: `session`, `slot`, `task`, `task_id`, `timeout_ms`
    QueueTimeoutHit,

    // === Shutdown events ===
    /// `shutdown()` was called.
    ShutdownRequested,

    /// Every handle was released and every pending future rejected.
    ShutdownComplete,

    /// In-flight binds did not resolve within the grace period.
    GraceExceeded,

    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets: `task` (subscriber name), `reason`
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets: `task` (subscriber name), `reason`
    SubscriberOverflow,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic per-bus sequence, assigned on publish
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Sequence number assigned by the publishing bus.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Session the event concerns.
    pub session: Option<Arc<str>>,
    /// Worker slot id.
    pub slot: Option<usize>,
    /// Task name (or subscriber name for subscriber events).
    pub task: Option<Arc<str>>,
    /// Dispatcher-unique task id.
    pub task_id: Option<u64>,
    /// Human-readable reason (errors, previous session, ...).
    pub reason: Option<Arc<str>>,
    /// Timeout in milliseconds (compact).
    pub timeout_ms: Option<u32>,
}

impl Event {
    /// Creates a new event of the given kind with the current timestamp.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: 0,
            at: SystemTime::now(),
            kind,
            session: None,
            slot: None,
            task: None,
            task_id: None,
            reason: None,
            timeout_ms: None,
        }
    }

    /// Attaches a session.
    #[inline]
    pub fn with_session(mut self, session: impl Into<Arc<str>>) -> Self {
        self.session = Some(session.into());
        self
    }

    /// Attaches a slot id.
    #[inline]
    pub fn with_slot(mut self, slot: usize) -> Self {
        self.slot = Some(slot);
        self
    }

    /// Attaches a task name and id.
    #[inline]
    pub fn with_task(mut self, name: impl Into<Arc<str>>, id: u64) -> Self {
        self.task = Some(name.into());
        self.task_id = Some(id);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a timeout duration (stored as milliseconds).
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.timeout_ms = Some(ms);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        let mut ev = Event::new(EventKind::SubscriberOverflow)
            .with_reason(format!("subscriber={subscriber} reason={reason}"));
        ev.task = Some(Arc::from(subscriber));
        ev
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        let mut ev = Event::new(EventKind::SubscriberPanicked).with_reason(info);
        ev.task = Some(Arc::from(subscriber));
        ev
    }

    #[inline]
    pub fn is_subscriber_event(&self) -> bool {
        matches!(
            self.kind,
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_is_clamped_to_u32_millis() {
        let ev = Event::new(EventKind::TimeoutHit).with_timeout(Duration::from_secs(u64::MAX));
        assert_eq!(ev.timeout_ms, Some(u32::MAX));
    }

    #[test]
    fn subscriber_events_carry_subscriber_name() {
        let ev = Event::subscriber_overflow("metrics", "full");
        assert!(ev.is_subscriber_event());
        assert_eq!(ev.task.as_deref(), Some("metrics"));
        assert_eq!(ev.task_id, None);
        assert_eq!(ev.reason.as_deref(), Some("subscriber=metrics reason=full"));
    }
}
