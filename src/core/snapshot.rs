//! Point-in-time view of dispatcher state, for diagnostics and tests.

use tokio::time::Instant;

use crate::session::SessionKey;

/// State of one worker slot.
#[derive(Clone, Debug)]
pub struct SlotSnapshot {
    /// Slot id (creation order, starting at 0).
    pub id: usize,
    /// Session the slot is bound to; `None` while rebinding or after a failed bind.
    pub bound: Option<SessionKey>,
    /// Session a hand-off is currently binding the slot to.
    pub rebinding: Option<SessionKey>,
    /// A task is running or waiting on this slot.
    pub active: bool,
    /// Tasks waiting in the slot queue (not counting the running one).
    pub queued: usize,
    /// When a task last started or finished on this slot.
    pub last_activity: Instant,
}

/// State of a whole dispatcher.
#[derive(Clone, Debug, Default)]
pub struct DispatcherSnapshot {
    /// Live slots, by id.
    pub slots: Vec<SlotSnapshot>,
    /// Sessions whose slot is still being created.
    pub spawning: Vec<SessionKey>,
    /// Overflowed sessions in service order, with their waiting task count.
    pub overflow: Vec<(SessionKey, usize)>,
    /// Number of recorded aliases.
    pub aliases: usize,
    /// `shutdown()` has started.
    pub closing: bool,
}

impl DispatcherSnapshot {
    /// Slot bound (or being bound) to `session`, if any.
    pub fn slot_for(&self, session: &str) -> Option<&SlotSnapshot> {
        self.slots.iter().find(|s| {
            s.bound.as_ref().is_some_and(|k| k.as_str() == session)
                || s.rebinding.as_ref().is_some_and(|k| k.as_str() == session)
        })
    }

    /// Slots plus pending spawns; never exceeds the configured worker limit.
    pub fn reserved(&self) -> usize {
        self.slots.len() + self.spawning.len()
    }

    /// Sessions currently binding (spawns and hand-offs).
    pub fn binding(&self) -> Vec<String> {
        self.spawning
            .iter()
            .chain(self.slots.iter().filter_map(|s| s.rebinding.as_ref()))
            .map(|k| k.to_string())
            .collect()
    }
}
