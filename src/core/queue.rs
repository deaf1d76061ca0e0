//! # TaskQueue: strictly sequential executor of one worker slot.
//!
//! Each slot owns one queue and one worker task. The worker pops jobs in arrival
//! order and runs them one at a time against the slot's handle.
//!
//! ## Architecture
//! ```text
//! dispatcher actor ── push(job) ──► [pending FIFO] ──► worker ──► runner::run_once()
//!                  ── pause()  ───►  (no new starts)     │
//!                  ── resume() ───►  (starts again)      └─► on_drained() when FIFO empties
//! ```
//!
//! ## Rules
//! - Concurrency 1: the next job starts only after the previous one settled.
//! - `pause()` never discards jobs and never interrupts the running one.
//! - `on_drained` fires each time the queue runs empty after settling a job.
//! - Stopping the queue drops the running job's future; its handle resolves `DispatcherClosed`.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::runner::{self, Budgets};
use crate::error::DispatchError;
use crate::events::Bus;
use crate::tasks::Job;

/// Callback invoked by the worker when the queue runs empty.
pub(crate) type DrainHook = Box<dyn Fn() + Send + Sync + 'static>;

struct QueueState<H> {
    pending: VecDeque<Job<H>>,
    paused: bool,
    running: bool,
    last_activity: Instant,
}

struct Shared<H> {
    state: Mutex<QueueState<H>>,
    notify: Notify,
}

impl<H> Shared<H> {
    fn lock(&self) -> MutexGuard<'_, QueueState<H>> {
        // Jobs never run under the lock, so a poisoned state is still consistent.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// FIFO executor with pause/resume, bound to one slot handle.
pub(crate) struct TaskQueue<H> {
    shared: Arc<Shared<H>>,
    token: CancellationToken,
    worker: Option<JoinHandle<()>>,
}

impl<H: Send + Sync + 'static> TaskQueue<H> {
    /// Creates the queue and spawns its worker.
    pub(crate) fn start(
        slot: usize,
        handle: Arc<H>,
        budgets: Budgets,
        bus: Bus,
        token: CancellationToken,
        on_drained: DrainHook,
    ) -> Self {
        let shared = Arc::new(Shared {
            state: Mutex::new(QueueState {
                pending: VecDeque::new(),
                paused: false,
                running: false,
                last_activity: Instant::now(),
            }),
            notify: Notify::new(),
        });

        let worker = tokio::spawn(worker_loop(
            Arc::clone(&shared),
            slot,
            handle,
            budgets,
            bus,
            token.clone(),
            on_drained,
        ));

        Self {
            shared,
            token,
            worker: Some(worker),
        }
    }
}

impl<H> TaskQueue<H> {
    /// Appends a job.
    pub(crate) fn push(&self, job: Job<H>) {
        self.shared.lock().pending.push_back(job);
        self.shared.notify.notify_one();
    }

    /// Stops new starts. A job already running keeps running.
    pub(crate) fn pause(&self) {
        self.shared.lock().paused = true;
    }

    /// Allows starts again.
    pub(crate) fn resume(&self) {
        self.shared.lock().paused = false;
        self.shared.notify.notify_one();
    }

    /// True while a job is running or waiting.
    pub(crate) fn is_active(&self) -> bool {
        let st = self.shared.lock();
        st.running || !st.pending.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn is_paused(&self) -> bool {
        self.shared.lock().paused
    }

    /// Number of jobs waiting (not counting the running one).
    pub(crate) fn len(&self) -> usize {
        self.shared.lock().pending.len()
    }

    /// When a job last started or settled (queue creation time before that).
    pub(crate) fn last_activity(&self) -> Instant {
        self.shared.lock().last_activity
    }

    /// Takes waiting job `id` out of the FIFO. `None` once it has started.
    pub(crate) fn remove(&self, id: u64) -> Option<Job<H>> {
        let mut st = self.shared.lock();
        let pos = st.pending.iter().position(|j| j.id() == id)?;
        st.pending.remove(pos)
    }

    /// Resolves every waiting job with `err` without running it.
    pub(crate) fn reject_all(&self, err: &DispatchError) -> usize {
        let drained: Vec<Job<H>> = self.shared.lock().pending.drain(..).collect();
        let n = drained.len();
        for job in drained {
            job.reject(err.clone());
        }
        n
    }

    /// Cancels the worker and waits for it to exit.
    pub(crate) async fn stop(&mut self) {
        self.token.cancel();
        if let Some(worker) = self.worker.take() {
            if let Err(e) = worker.await {
                tracing::warn!(error = %e, "slot worker terminated abnormally");
            }
        }
    }
}

impl<H> Drop for TaskQueue<H> {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

async fn worker_loop<H: Send + Sync + 'static>(
    shared: Arc<Shared<H>>,
    slot: usize,
    handle: Arc<H>,
    budgets: Budgets,
    bus: Bus,
    token: CancellationToken,
    on_drained: DrainHook,
) {
    loop {
        let job = loop {
            let next = {
                let mut st = shared.lock();
                if st.paused {
                    None
                } else {
                    let job = st.pending.pop_front();
                    if job.is_some() {
                        st.running = true;
                        st.last_activity = Instant::now();
                    }
                    job
                }
            };
            if let Some(job) = next {
                break job;
            }
            tokio::select! {
                _ = token.cancelled() => return,
                _ = shared.notify.notified() => {}
            }
        };

        tokio::select! {
            _ = token.cancelled() => return,
            _ = runner::run_once(job, Arc::clone(&handle), slot, budgets, &bus) => {}
        }

        let drained = {
            let mut st = shared.lock();
            st.running = false;
            st.last_activity = Instant::now();
            st.pending.is_empty()
        };
        if drained {
            on_drained();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TaskError;
    use crate::tasks::TaskFn;
    use crate::tasks::job::tests::key;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio::time;

    type Log = Arc<Mutex<Vec<&'static str>>>;

    fn recording(id: u64, name: &'static str, log: &Log, ms: u64) -> (Job<()>, crate::TaskHandle<()>) {
        let log = Arc::clone(log);
        Job::seal(
            id,
            key("alice"),
            TaskFn::new(name, move |_: Arc<()>| async move {
                log.lock().unwrap().push(name);
                time::sleep(Duration::from_millis(ms)).await;
                Ok::<_, TaskError>(())
            }),
        )
    }

    fn queue_with_drain_channel() -> (TaskQueue<()>, mpsc::UnboundedReceiver<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let queue = TaskQueue::start(
            0,
            Arc::new(()),
            Budgets::default(),
            Bus::new(64),
            CancellationToken::new(),
            Box::new(move || {
                let _ = tx.send(());
            }),
        );
        (queue, rx)
    }

    #[tokio::test(start_paused = true)]
    async fn runs_one_at_a_time_in_arrival_order() {
        let log: Log = Arc::default();
        let (queue, mut drained) = queue_with_drain_channel();

        let (a, ha) = recording(1, "a", &log, 50);
        let (b, hb) = recording(2, "b", &log, 10);
        let (c, hc) = recording(3, "c", &log, 10);
        queue.push(a);
        queue.push(b);
        queue.push(c);

        ha.await.unwrap();
        hb.await.unwrap();
        hc.await.unwrap();
        drained.recv().await.unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["a", "b", "c"]);
        assert!(!queue.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn pause_holds_jobs_until_resume() {
        let log: Log = Arc::default();
        let (queue, _drained) = queue_with_drain_channel();
        queue.pause();

        let (a, ha) = recording(1, "a", &log, 0);
        queue.push(a);
        time::sleep(Duration::from_secs(1)).await;

        assert!(log.lock().unwrap().is_empty());
        assert!(queue.is_active());
        assert_eq!(queue.len(), 1);

        queue.resume();
        ha.await.unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["a"]);
    }

    #[tokio::test(start_paused = true)]
    async fn drain_hook_fires_once_per_emptying() {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let queue = TaskQueue::start(
            0,
            Arc::new(()),
            Budgets::default(),
            Bus::new(64),
            CancellationToken::new(),
            Box::new(move || {
                seen.fetch_add(1, Ordering::SeqCst);
            }),
        );
        let log: Log = Arc::default();

        let (a, ha) = recording(1, "a", &log, 10);
        let (b, hb) = recording(2, "b", &log, 10);
        queue.push(a);
        queue.push(b);
        ha.await.unwrap();
        hb.await.unwrap();
        time::sleep(Duration::from_millis(1)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        let (c, hc) = recording(3, "c", &log, 10);
        queue.push(c);
        hc.await.unwrap();
        time::sleep(Duration::from_millis(1)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn remove_takes_only_waiting_jobs() {
        let log: Log = Arc::default();
        let (queue, _drained) = queue_with_drain_channel();

        let (a, _ha) = recording(1, "a", &log, 1_000);
        let (b, hb) = recording(2, "b", &log, 0);
        queue.push(a);
        queue.push(b);
        time::sleep(Duration::from_millis(5)).await;

        assert!(queue.remove(1).is_none(), "running job cannot be taken back");
        let b = queue.remove(2).unwrap();
        b.reject(DispatchError::DispatcherClosed);
        assert_eq!(hb.await, Err(DispatchError::DispatcherClosed));
        assert_eq!(queue.len(), 0);
        assert_eq!(*log.lock().unwrap(), vec!["a"]);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_closes_running_and_reject_all_clears_waiting() {
        let log: Log = Arc::default();
        let (mut queue, _drained) = queue_with_drain_channel();

        let (a, ha) = recording(1, "a", &log, 10_000);
        let (b, hb) = recording(2, "b", &log, 0);
        queue.push(a);
        queue.push(b);
        time::sleep(Duration::from_millis(5)).await;

        queue.stop().await;
        assert_eq!(queue.reject_all(&DispatchError::DispatcherClosed), 1);

        assert_eq!(ha.await, Err(DispatchError::DispatcherClosed));
        assert_eq!(hb.await, Err(DispatchError::DispatcherClosed));
        assert_eq!(*log.lock().unwrap(), vec!["a"]);
    }
}
