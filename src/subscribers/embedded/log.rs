//! # LogWriter: renders events through `tracing`
//!
//! A subscriber that turns every [`Event`] into one `tracing` record with
//! structured fields. Install any `tracing` subscriber (e.g. `tracing_subscriber::fmt`)
//! to see them.
//!
//! ## Example output (fmt subscriber)
//! ```text
//! INFO slotvisor: slot spawned slot=0 session="alice"
//! DEBUG slotvisor: task starting slot=0 session="alice" task="send" task_id=1
//! WARN slotvisor: task timed out slot=0 session="alice" task="send" timeout_ms=2000
//! INFO slotvisor: hand-off started slot=0 session="bob" from="alice"
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let session = e.session.as_deref().unwrap_or("-");
        let task = e.task.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("-");

        match e.kind {
            EventKind::TaskQueued => {
                tracing::debug!(target: "slotvisor", seq = e.seq, slot = ?e.slot, session, task, task_id = ?e.task_id, "task queued");
            }
            EventKind::TaskOverflowed => {
                tracing::info!(target: "slotvisor", seq = e.seq, session, task, task_id = ?e.task_id, "pool full, task overflowed");
            }
            EventKind::SlotSpawning => {
                tracing::debug!(target: "slotvisor", seq = e.seq, session, "spawning slot");
            }
            EventKind::SlotSpawned => {
                tracing::info!(target: "slotvisor", seq = e.seq, slot = ?e.slot, session, "slot spawned");
            }
            EventKind::HandoffStarted => {
                tracing::info!(target: "slotvisor", seq = e.seq, slot = ?e.slot, session, from = reason, "hand-off started");
            }
            EventKind::SlotBound => {
                tracing::info!(target: "slotvisor", seq = e.seq, slot = ?e.slot, session, "slot bound");
            }
            EventKind::BindFailed => {
                tracing::warn!(target: "slotvisor", seq = e.seq, slot = ?e.slot, session, reason, "bind failed");
            }
            EventKind::HandleUnavailable => {
                tracing::error!(target: "slotvisor", seq = e.seq, session, reason, "session handle unavailable");
            }
            EventKind::AliasConflict => {
                tracing::warn!(target: "slotvisor", seq = e.seq, session, reason, "alias conflict");
            }
            EventKind::SlotDrained => {
                tracing::debug!(target: "slotvisor", seq = e.seq, slot = ?e.slot, session, "slot drained");
            }
            EventKind::TaskStarting => {
                tracing::debug!(target: "slotvisor", seq = e.seq, slot = ?e.slot, session, task, task_id = ?e.task_id, "task starting");
            }
            EventKind::TaskCompleted => {
                tracing::debug!(target: "slotvisor", seq = e.seq, slot = ?e.slot, session, task, task_id = ?e.task_id, "task completed");
            }
            EventKind::TaskFailed => {
                tracing::warn!(target: "slotvisor", seq = e.seq, slot = ?e.slot, session, task, task_id = ?e.task_id, reason, "task failed");
            }
            EventKind::TimeoutHit => {
                tracing::warn!(target: "slotvisor", seq = e.seq, slot = ?e.slot, session, task, timeout_ms = ?e.timeout_ms, "task timed out");
            }
            EventKind::QueueTimeoutHit => {
                tracing::warn!(target: "slotvisor", seq = e.seq, slot = ?e.slot, session, task, timeout_ms = ?e.timeout_ms, "task expired in queue");
            }
            EventKind::ShutdownRequested => {
                tracing::info!(target: "slotvisor", seq = e.seq, "shutdown requested");
            }
            EventKind::ShutdownComplete => {
                tracing::info!(target: "slotvisor", seq = e.seq, "shutdown complete");
            }
            EventKind::GraceExceeded => {
                tracing::error!(target: "slotvisor", seq = e.seq, reason, "shutdown grace exceeded");
            }
            EventKind::SubscriberOverflow => {
                tracing::warn!(target: "slotvisor", seq = e.seq, subscriber = task, reason, "subscriber overflow");
            }
            EventKind::SubscriberPanicked => {
                tracing::error!(target: "slotvisor", seq = e.seq, subscriber = task, reason, "subscriber panicked");
            }
        }
    }

    fn name(&self) -> &'static str {
        "log-writer"
    }
}
