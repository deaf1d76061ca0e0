//! # Dispatcher configuration.
//!
//! Provides [`Config`], centralized settings for one dispatcher instance.
//!
//! ## Sentinel values
//! - `task_timeout = 0s` → no per-task budget
//! - `queue_timeout = 0s` → queued tasks never expire
//! - `worker_limit = 0` → clamped to 1 (a dispatcher always has at least one slot)

use std::time::Duration;

/// Configuration for a [`Dispatcher`](crate::Dispatcher).
///
/// ## Field semantics
/// - `worker_limit`: Maximum number of worker slots (parallel sessions)
/// - `task_timeout`: Execution budget per task (`0s` = unlimited)
/// - `queue_timeout`: Maximum wait before a not-yet-started task is dropped (`0s` = unlimited)
/// - `bus_capacity`: Event bus ring buffer size (min 1)
/// - `grace`: Maximum wait at shutdown for in-flight session binds
///
/// ## Notes
/// All fields are public for flexibility. Prefer using helper accessors to avoid
/// sprinkling sentinel checks (`0`) across the codebase.
#[derive(Clone, Debug)]
pub struct Config {
    /// Maximum number of worker slots, each bound to at most one session.
    pub worker_limit: usize,

    /// Execution budget for a single task.
    ///
    /// On expiry the task's future is dropped, its handle resolves to
    /// `DispatchError::TaskTimeout`, and the slot moves on to its next task.
    pub task_timeout: Duration,

    /// Maximum time a task may wait (in a slot queue or in overflow) before it starts.
    ///
    /// Expired tasks resolve to `DispatchError::QueueTimeout` without running.
    pub queue_timeout: Duration,

    /// Capacity of the event bus broadcast channel ring buffer.
    pub bus_capacity: usize,

    /// Maximum time `shutdown()` waits for binds that are still in flight.
    pub grace: Duration,
}

impl Config {
    /// Returns the worker limit clamped to a minimum of 1.
    #[inline]
    pub fn worker_limit_clamped(&self) -> usize {
        self.worker_limit.max(1)
    }

    /// Returns the per-task execution budget as an `Option`.
    #[inline]
    pub fn task_timeout(&self) -> Option<Duration> {
        Some(self.task_timeout).filter(|d| !d.is_zero())
    }

    /// Returns the queue wait limit as an `Option`.
    #[inline]
    pub fn queue_timeout(&self) -> Option<Duration> {
        Some(self.queue_timeout).filter(|d| !d.is_zero())
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `worker_limit = 3`
    /// - `task_timeout = 2s`
    /// - `queue_timeout = 0s` (no expiry)
    /// - `bus_capacity = 1024`
    /// - `grace = 30s`
    fn default() -> Self {
        Self {
            worker_limit: 3,
            task_timeout: Duration::from_secs(2),
            queue_timeout: Duration::ZERO,
            bus_capacity: 1024,
            grace: Duration::from_secs(30),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_sentinels_mean_unlimited() {
        let cfg = Config {
            task_timeout: Duration::ZERO,
            queue_timeout: Duration::ZERO,
            ..Config::default()
        };
        assert_eq!(cfg.task_timeout(), None);
        assert_eq!(cfg.queue_timeout(), None);
    }

    #[test]
    fn defaults_match_documented_values() {
        let cfg = Config::default();
        assert_eq!(cfg.worker_limit_clamped(), 3);
        assert_eq!(cfg.task_timeout(), Some(Duration::from_secs(2)));
        assert_eq!(cfg.queue_timeout(), None);
    }

    #[test]
    fn limits_are_clamped() {
        let cfg = Config {
            worker_limit: 0,
            bus_capacity: 0,
            ..Config::default()
        };
        assert_eq!(cfg.worker_limit_clamped(), 1);
        assert_eq!(cfg.bus_capacity_clamped(), 1);
    }
}
