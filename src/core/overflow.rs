//! # Overflow registry: tasks waiting for a worker slot.
//!
//! When every slot is bound and busy, tasks for sessions without a slot park here.
//! The registry keeps two views in lockstep:
//!
//! ```text
//! order:   [ bob, carol ]                 FIFO of sessions, each at most once
//! pending: { bob:   [T2, T5],             FIFO of tasks per session
//!            carol: [T3] }
//! ```
//!
//! ## Invariants
//! - `order` contains exactly the keys of `pending`, in first-arrival order.
//! - No empty task list is ever stored.
//! - Popping yields the oldest session and all of its tasks in submission order.

use std::collections::{HashMap, VecDeque};

use crate::session::SessionKey;
use crate::tasks::Job;

/// FIFO of sessions awaiting capacity, with their FIFO task lists.
pub(crate) struct OverflowRegistry<H> {
    order: VecDeque<SessionKey>,
    pending: HashMap<SessionKey, VecDeque<Job<H>>>,
}

impl<H> OverflowRegistry<H> {
    pub(crate) fn new() -> Self {
        Self {
            order: VecDeque::new(),
            pending: HashMap::new(),
        }
    }

    /// Parks `job` under its session. Returns `true` when the session is new to the registry.
    pub(crate) fn push(&mut self, job: Job<H>) -> bool {
        let session = job.session().clone();
        match self.pending.get_mut(&session) {
            Some(queue) => {
                queue.push_back(job);
                false
            }
            None => {
                self.pending.insert(session.clone(), VecDeque::from([job]));
                self.order.push_back(session);
                true
            }
        }
    }

    /// Removes and returns the oldest waiting session with all of its tasks.
    pub(crate) fn pop_next(&mut self) -> Option<(SessionKey, VecDeque<Job<H>>)> {
        while let Some(session) = self.order.pop_front() {
            if let Some(jobs) = self.pending.remove(&session) {
                return Some((session, jobs));
            }
        }
        None
    }

    /// Removes and returns the tasks waiting for `session` (empty if none).
    pub(crate) fn take(&mut self, session: &SessionKey) -> VecDeque<Job<H>> {
        match self.pending.remove(session) {
            Some(jobs) => {
                self.order.retain(|k| k != session);
                jobs
            }
            None => VecDeque::new(),
        }
    }

    /// Removes task `id` wherever it waits. A session left without tasks loses its turn.
    pub(crate) fn remove(&mut self, id: u64) -> Option<Job<H>> {
        let (session, pos) = self.pending.iter().find_map(|(session, jobs)| {
            jobs.iter()
                .position(|j| j.id() == id)
                .map(|pos| (session.clone(), pos))
        })?;
        let jobs = self.pending.get_mut(&session)?;
        let job = jobs.remove(pos);
        if jobs.is_empty() {
            self.pending.remove(&session);
            self.order.retain(|k| *k != session);
        }
        job
    }

    /// Removes everything, in registry order.
    pub(crate) fn drain(&mut self) -> Vec<Job<H>> {
        let mut out = Vec::new();
        while let Some((_, jobs)) = self.pop_next() {
            out.extend(jobs);
        }
        out
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Number of sessions waiting.
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.order.len()
    }

    /// `(session, waiting tasks)` in service order.
    pub(crate) fn summary(&self) -> Vec<(SessionKey, usize)> {
        self.order
            .iter()
            .map(|k| (k.clone(), self.pending.get(k).map_or(0, VecDeque::len)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::job::tests::{key, noop_job};

    fn ids(jobs: &VecDeque<Job<()>>) -> Vec<u64> {
        jobs.iter().map(Job::id).collect()
    }

    #[test]
    fn session_enters_order_once() {
        let mut reg = OverflowRegistry::new();
        assert!(reg.push(noop_job(1, "bob")));
        assert!(reg.push(noop_job(2, "carol")));
        assert!(!reg.push(noop_job(3, "bob")));

        assert_eq!(reg.len(), 2);
        assert_eq!(reg.summary(), vec![(key("bob"), 2), (key("carol"), 1)]);
    }

    #[test]
    fn pop_serves_oldest_session_with_all_tasks_in_order() {
        let mut reg = OverflowRegistry::new();
        reg.push(noop_job(1, "bob"));
        reg.push(noop_job(2, "carol"));
        reg.push(noop_job(3, "bob"));

        let (session, jobs) = reg.pop_next().unwrap();
        assert_eq!(session, key("bob"));
        assert_eq!(ids(&jobs), vec![1, 3]);

        let (session, jobs) = reg.pop_next().unwrap();
        assert_eq!(session, key("carol"));
        assert_eq!(ids(&jobs), vec![2]);

        assert!(reg.pop_next().is_none());
        assert!(reg.is_empty());
    }

    #[test]
    fn take_removes_session_from_order() {
        let mut reg = OverflowRegistry::new();
        reg.push(noop_job(1, "bob"));
        reg.push(noop_job(2, "carol"));

        assert_eq!(ids(&reg.take(&key("bob"))), vec![1]);
        assert!(reg.take(&key("bob")).is_empty());
        assert_eq!(reg.summary(), vec![(key("carol"), 1)]);

        // A session re-entering after removal goes to the back.
        reg.push(noop_job(3, "bob"));
        assert_eq!(reg.pop_next().unwrap().0, key("carol"));
    }

    #[test]
    fn remove_picks_one_task_and_drops_emptied_session() {
        let mut reg = OverflowRegistry::new();
        reg.push(noop_job(1, "bob"));
        reg.push(noop_job(2, "carol"));
        reg.push(noop_job(3, "bob"));

        assert_eq!(reg.remove(3).map(|j| j.id()), Some(3));
        assert_eq!(reg.summary(), vec![(key("bob"), 1), (key("carol"), 1)]);

        assert_eq!(reg.remove(1).map(|j| j.id()), Some(1));
        assert_eq!(reg.summary(), vec![(key("carol"), 1)]);
        assert!(reg.remove(1).is_none());
    }

    #[test]
    fn drain_empties_in_service_order() {
        let mut reg = OverflowRegistry::new();
        reg.push(noop_job(1, "bob"));
        reg.push(noop_job(2, "carol"));
        reg.push(noop_job(3, "bob"));

        let drained: Vec<u64> = reg.drain().iter().map(Job::id).collect();
        assert_eq!(drained, vec![1, 3, 2]);
        assert!(reg.is_empty());
    }
}
