//! # Type-erased queued task.
//!
//! [`Job`] is what actually sits in slot queues, spawn reservations and the overflow
//! registry. It hides the task's output type behind [`Envelope`] so tasks producing
//! different types share one queue, and guarantees the result future is resolved
//! exactly once: either by running ([`Job::run`]) or by rejecting ([`Job::reject`]).

use std::any::Any;
use std::marker::PhantomData;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::sync::oneshot;
use tokio::time::{self, Instant};

use crate::error::{DispatchError, TaskError};
use crate::session::SessionKey;
use crate::tasks::{Task, TaskHandle};

trait Envelope<H>: Send {
    fn run(
        self: Box<Self>,
        handle: Arc<H>,
        timeout: Option<Duration>,
    ) -> BoxFuture<'static, Result<(), DispatchError>>;

    fn reject(self: Box<Self>, err: DispatchError);
}

struct Sealed<T: Task<H>, H> {
    task: T,
    tx: oneshot::Sender<Result<T::Output, DispatchError>>,
    _handle: PhantomData<fn() -> H>,
}

impl<H, T> Envelope<H> for Sealed<T, H>
where
    H: Send + Sync + 'static,
    T: Task<H>,
{
    fn run(
        self: Box<Self>,
        handle: Arc<H>,
        timeout: Option<Duration>,
    ) -> BoxFuture<'static, Result<(), DispatchError>> {
        let Sealed { task, tx, .. } = *self;
        Box::pin(async move {
            // spawn() runs inside the guarded future so a panicking closure is contained too.
            let guarded = AssertUnwindSafe(async move { task.spawn(handle).await }).catch_unwind();

            let res = match timeout {
                Some(limit) => match time::timeout(limit, guarded).await {
                    Ok(r) => settle(r),
                    Err(_elapsed) => Err(DispatchError::TaskTimeout { timeout: limit }),
                },
                None => settle(guarded.await),
            };

            let report = match &res {
                Ok(_) => Ok(()),
                Err(e) => Err(e.clone()),
            };
            let _ = tx.send(res);
            report
        })
    }

    fn reject(self: Box<Self>, err: DispatchError) {
        let _ = self.tx.send(Err(err));
    }
}

fn settle<T>(
    res: Result<Result<T, TaskError>, Box<dyn Any + Send>>,
) -> Result<T, DispatchError> {
    match res {
        Ok(Ok(v)) => Ok(v),
        Ok(Err(e)) => Err(e.into()),
        Err(panic) => Err(TaskError::Panicked {
            info: panic_message(panic.as_ref()),
        }
        .into()),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// A queued task with its routing metadata.
pub(crate) struct Job<H> {
    id: u64,
    name: Arc<str>,
    session: SessionKey,
    submitted_at: Instant,
    body: Box<dyn Envelope<H>>,
}

impl<H: Send + Sync + 'static> Job<H> {
    /// Seals `task` and returns the job together with the caller's result future.
    pub(crate) fn seal<T: Task<H>>(
        id: u64,
        session: SessionKey,
        task: T,
    ) -> (Self, TaskHandle<T::Output>) {
        let (tx, rx) = oneshot::channel();
        let name: Arc<str> = Arc::from(task.name());
        let job = Self {
            id,
            name,
            session: session.clone(),
            submitted_at: Instant::now(),
            body: Box::new(Sealed {
                task,
                tx,
                _handle: PhantomData,
            }),
        };
        (job, TaskHandle::new(id, session, rx))
    }
}

impl<H> Job<H> {
    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn name(&self) -> &Arc<str> {
        &self.name
    }

    pub(crate) fn session(&self) -> &SessionKey {
        &self.session
    }

    /// Re-targets the job at the canonical form of its session.
    pub(crate) fn set_session(&mut self, session: SessionKey) {
        self.session = session;
    }

    pub(crate) fn submitted_at(&self) -> Instant {
        self.submitted_at
    }

    /// Time since submission.
    pub(crate) fn waited(&self) -> Duration {
        self.submitted_at.elapsed()
    }

    /// Runs the task against `handle`, resolving its future. Returns a copy of the
    /// failure (if any) for reporting.
    pub(crate) fn run(
        self,
        handle: Arc<H>,
        timeout: Option<Duration>,
    ) -> BoxFuture<'static, Result<(), DispatchError>> {
        self.body.run(handle, timeout)
    }

    /// Resolves the task's future with `err` without running it.
    pub(crate) fn reject(self, err: DispatchError) {
        self.body.reject(err)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::tasks::TaskFn;

    pub(crate) fn key(s: &str) -> SessionKey {
        SessionKey::new(s).unwrap()
    }

    pub(crate) fn noop_job(id: u64, session: &str) -> Job<()> {
        let (job, _handle) = Job::seal(
            id,
            key(session),
            TaskFn::new("noop", |_: Arc<()>| async { Ok::<_, TaskError>(()) }),
        );
        job
    }

    #[tokio::test]
    async fn run_resolves_handle_with_output() {
        let (job, handle) = Job::seal(
            7,
            key("alice"),
            TaskFn::new("len", |h: Arc<String>| async move { Ok::<_, TaskError>(h.len()) }),
        );
        assert_eq!(job.id(), 7);
        assert_eq!(&**job.name(), "len");

        let report = job.run(Arc::new("hello".to_string()), None).await;
        assert!(report.is_ok());
        assert_eq!(handle.await, Ok(5));
    }

    #[tokio::test]
    async fn reject_resolves_handle_with_error() {
        let (job, handle) = Job::seal(
            1,
            key("bob"),
            TaskFn::new("never", |_: Arc<()>| async { Ok::<_, TaskError>(()) }),
        );
        job.reject(DispatchError::DispatcherClosed);
        assert_eq!(handle.await, Err(DispatchError::DispatcherClosed));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_aborts_task() {
        let (job, handle) = Job::seal(
            1,
            key("carol"),
            TaskFn::new("slow", |_: Arc<()>| async {
                time::sleep(Duration::from_secs(10)).await;
                Ok::<_, TaskError>(())
            }),
        );
        let limit = Duration::from_millis(50);
        let report = job.run(Arc::new(()), Some(limit)).await;
        assert_eq!(report, Err(DispatchError::TaskTimeout { timeout: limit }));
        assert_eq!(handle.await, Err(DispatchError::TaskTimeout { timeout: limit }));
    }

    #[tokio::test]
    async fn panic_is_contained_to_the_task() {
        let (job, handle) = Job::seal(
            1,
            key("dave"),
            TaskFn::new("boom", |_: Arc<()>| async {
                if true {
                    panic!("selector not found");
                }
                Ok::<_, TaskError>(())
            }),
        );
        let report = job.run(Arc::new(()), None).await;
        let expected = DispatchError::Task(TaskError::Panicked {
            info: "selector not found".into(),
        });
        assert_eq!(report, Err(expected.clone()));
        assert_eq!(handle.await, Err(expected));
    }
}
