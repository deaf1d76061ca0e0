//! # Task abstractions.
//!
//! This module provides the task-related types:
//! - [`Task`] - trait for one-shot async work run against a session handle
//! - [`TaskFn`] - function-based task implementation
//! - [`TaskHandle`] - future resolving to a submitted task's result
//! - `Job` (internal) - type-erased queued task

pub(crate) mod job;

mod handle;
mod task;
mod task_fn;

pub(crate) use job::Job;

pub use handle::TaskHandle;
pub use task::{BoxTaskFuture, Task};
pub use task_fn::TaskFn;
