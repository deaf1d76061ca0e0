//! # Task abstraction.
//!
//! A [`Task`] is a one-shot unit of work that runs against the session handle of
//! the worker slot bound to its target session. The handle is shared as `Arc<H>`;
//! the slot guarantees no other task and no rebind touches it while the task runs.
//!
//! Tasks must not rebind or close the handle they are given.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::TaskError;

/// Boxed future returned by [`Task::spawn`].
pub type BoxTaskFuture<T> = Pin<Box<dyn Future<Output = Result<T, TaskError>> + Send + 'static>>;

/// # One-shot asynchronous unit of work.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use slotvisor::{BoxTaskFuture, Task, TaskError};
///
/// struct Greet(&'static str);
///
/// impl Task<String> for Greet {
///     type Output = String;
///
///     fn name(&self) -> &str { "greet" }
///
///     fn spawn(self, page: Arc<String>) -> BoxTaskFuture<String> {
///         Box::pin(async move { Ok(format!("{} from {page}", self.0)) })
///     }
/// }
/// ```
pub trait Task<H>: Send + 'static {
    /// Value the task's future resolves with.
    type Output: Send + 'static;

    /// Returns a human-readable task name used in events.
    fn name(&self) -> &str;

    /// Consumes the task and produces its execution future.
    fn spawn(self, handle: Arc<H>) -> BoxTaskFuture<Self::Output>
    where
        Self: Sized;
}
