//! # WorkerSlot: one session handle plus its task queue.
//!
//! A slot is bound to at most one session at a time. Rebinding goes through the
//! hand-off protocol, during which the queue is paused so that no task can run while
//! the handle is being pointed at another session:
//!
//! ```text
//!            begin_handoff(K)                 finish_handoff()
//! Bound(A) ───────────────────► Rebinding(K) ──────────────────► Bound(K)   (resumed)
//!  Unbound ───────────────────►   (paused)   ──────────────────► Unbound    (still paused)
//!                                                abort_handoff()
//! ```

use std::sync::Arc;

use tokio::time::Instant;

use super::queue::TaskQueue;
use crate::session::SessionKey;

/// A worker slot owned by the dispatcher actor.
pub(crate) struct WorkerSlot<H> {
    pub(crate) id: usize,
    pub(crate) handle: Arc<H>,
    pub(crate) queue: TaskQueue<H>,
    bound: Option<SessionKey>,
    rebinding: Option<SessionKey>,
}

impl<H> WorkerSlot<H> {
    /// Wraps a freshly bound handle.
    pub(crate) fn new(id: usize, handle: Arc<H>, queue: TaskQueue<H>, session: SessionKey) -> Self {
        Self {
            id,
            handle,
            queue,
            bound: Some(session),
            rebinding: None,
        }
    }

    pub(crate) fn bound(&self) -> Option<&SessionKey> {
        self.bound.as_ref()
    }

    pub(crate) fn rebinding(&self) -> Option<&SessionKey> {
        self.rebinding.as_ref()
    }

    /// True if tasks for `session` belong on this slot: it is bound to it, or being bound to it.
    pub(crate) fn serves(&self, session: &SessionKey) -> bool {
        self.bound.as_ref() == Some(session) || self.rebinding.as_ref() == Some(session)
    }

    pub(crate) fn in_transition(&self) -> bool {
        self.rebinding.is_some()
    }

    /// Eligible for eviction: not mid hand-off, nothing running or waiting.
    pub(crate) fn is_idle(&self) -> bool {
        !self.in_transition() && !self.queue.is_active()
    }

    pub(crate) fn last_activity(&self) -> Instant {
        self.queue.last_activity()
    }

    /// Steps 1 of the hand-off: releases the current session and pauses the queue.
    ///
    /// Returns the session the slot was bound to.
    pub(crate) fn begin_handoff(&mut self, target: SessionKey) -> Option<SessionKey> {
        self.queue.pause();
        self.rebinding = Some(target);
        self.bound.take()
    }

    /// Completes a successful bind and resumes the queue.
    pub(crate) fn finish_handoff(&mut self) -> Option<&SessionKey> {
        self.bound = self.rebinding.take();
        self.queue.resume();
        self.bound.as_ref()
    }

    /// Abandons a failed bind. The slot stays unbound and paused.
    pub(crate) fn abort_handoff(&mut self) -> Option<SessionKey> {
        self.rebinding.take()
    }
}
