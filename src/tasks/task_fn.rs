//! # Function-backed task (`TaskFn`)
//!
//! [`TaskFn`] wraps a closure `F: FnOnce(Arc<H>) -> Fut` under a name. The closure
//! runs exactly once, when the task reaches the front of its slot's queue.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use slotvisor::{Task, TaskError, TaskFn};
//!
//! let t = TaskFn::new("read-thread", |page: Arc<String>| async move {
//!     Ok::<_, TaskError>(page.len())
//! });
//!
//! assert_eq!(Task::<String>::name(&t), "read-thread");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use crate::error::TaskError;
use crate::tasks::task::{BoxTaskFuture, Task};

/// Function-backed task implementation.
#[derive(Debug)]
pub struct TaskFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> TaskFn<F> {
    /// Creates a new function-backed task.
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<H, F, Fut, T> Task<H> for TaskFn<F>
where
    H: Send + Sync + 'static,
    F: FnOnce(Arc<H>) -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, TaskError>> + Send + 'static,
    T: Send + 'static,
{
    type Output = T;

    fn name(&self) -> &str {
        &self.name
    }

    fn spawn(self, handle: Arc<H>) -> BoxTaskFuture<T> {
        Box::pin((self.f)(handle))
    }
}
