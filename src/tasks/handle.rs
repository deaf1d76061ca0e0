//! # Task result future.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::error::DispatchError;
use crate::session::SessionKey;

/// Future resolving to a submitted task's result.
///
/// If the dispatcher goes away before the task reports back (shutdown, drop), the
/// handle resolves to [`DispatchError::DispatcherClosed`]. Dropping a `TaskHandle`
/// does not cancel the task.
#[must_use = "a TaskHandle does nothing unless awaited; dropping it ignores the result"]
pub struct TaskHandle<T> {
    id: u64,
    session: SessionKey,
    rx: oneshot::Receiver<Result<T, DispatchError>>,
}

impl<T> TaskHandle<T> {
    pub(crate) fn new(
        id: u64,
        session: SessionKey,
        rx: oneshot::Receiver<Result<T, DispatchError>>,
    ) -> Self {
        Self { id, session, rx }
    }

    /// Dispatcher-unique task id (matches `Event::task_id`).
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Session the task was submitted for, as given by the caller.
    pub fn session(&self) -> &SessionKey {
        &self.session
    }
}

impl<T> Future for TaskHandle<T> {
    type Output = Result<T, DispatchError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|res| res.unwrap_or(Err(DispatchError::DispatcherClosed)))
    }
}
