//! # Run a single queued task on a slot.
//!
//! Executes one [`Job`] against the slot's handle with the configured budgets and
//! publishes its lifecycle events to the [`Bus`].
//!
//! ## Event flow
//!
//! ```text
//! Expired in queue:
//!   waited > queue_timeout → publish QueueTimeoutHit → reject(QueueTimeout)
//!
//! Success:
//!   publish TaskStarting → job.run() → Ok   → publish TaskCompleted
//!
//! Failure / panic:
//!   publish TaskStarting → job.run() → Err  → publish TaskFailed
//!
//! Timeout:
//!   publish TaskStarting → budget exceeded → publish TimeoutHit
//!                                          → publish TaskFailed (timeout)
//! ```
//!
//! ## Rules
//! - A started task always publishes **exactly one** terminal event: `TaskCompleted` or `TaskFailed`.
//! - `TimeoutHit` is published **in addition to** `TaskFailed` on timeout.
//! - A task that expired in the queue is never started.

use std::sync::Arc;
use std::time::Duration;

use crate::error::DispatchError;
use crate::events::{Bus, Event, EventKind};
use crate::tasks::Job;

/// Execution budgets applied by a slot queue.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct Budgets {
    pub task_timeout: Option<Duration>,
    pub queue_timeout: Option<Duration>,
}

/// Runs `job` on `handle`, publishing lifecycle events for slot `slot`.
pub(crate) async fn run_once<H>(job: Job<H>, handle: Arc<H>, slot: usize, budgets: Budgets, bus: &Bus) {
    let session = Arc::<str>::from(job.session());
    let name = Arc::clone(job.name());
    let id = job.id();
    let base = |kind| {
        Event::new(kind)
            .with_session(Arc::clone(&session))
            .with_slot(slot)
            .with_task(Arc::clone(&name), id)
    };

    if let Some(limit) = budgets.queue_timeout {
        let waited = job.waited();
        if waited > limit {
            bus.publish(base(EventKind::QueueTimeoutHit).with_timeout(limit));
            job.reject(DispatchError::QueueTimeout { waited, limit });
            return;
        }
    }

    bus.publish(base(EventKind::TaskStarting));

    match job.run(handle, budgets.task_timeout).await {
        Ok(()) => bus.publish(base(EventKind::TaskCompleted)),
        Err(err) => {
            if let DispatchError::TaskTimeout { timeout } = &err {
                bus.publish(base(EventKind::TimeoutHit).with_timeout(*timeout));
            }
            bus.publish(base(EventKind::TaskFailed).with_reason(err.as_message()));
        }
    }
}
