//! Error types used by the dispatcher, its collaborators and tasks.
//!
//! This module defines four enums:
//!
//! - [`DispatchError`]: the outcome carried by a task's future when it did not succeed.
//! - [`TaskError`]: errors reported by a task body itself.
//! - [`BindError`]: errors reported by a [`SessionBinder`](crate::SessionBinder).
//! - [`RuntimeError`]: errors raised by the dispatcher runtime (shutdown).
//!
//! All of them provide `as_label` (stable snake_case, for logs/metrics) and `as_message`.

use std::time::Duration;
use thiserror::Error;

/// # Errors produced by the dispatcher runtime.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Shutdown grace period was exceeded; some session binds were still in flight.
    #[error("shutdown timeout {grace:?} exceeded; stuck: {stuck:?}; forcing termination")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Sessions whose bind had not resolved in time.
        stuck: Vec<String>,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use slotvisor::RuntimeError;
    /// use std::time::Duration;
    ///
    /// let err = RuntimeError::GraceExceeded { grace: Duration::from_secs(5), stuck: vec![] };
    /// assert_eq!(err.as_label(), "runtime_grace_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RuntimeError::GraceExceeded { grace, stuck } => {
                format!("grace exceeded after {grace:?}; stuck sessions={stuck:?}")
            }
        }
    }
}

/// # Errors reported by a task body.
///
/// Tasks return `Result<T, TaskError>`. Any `anyhow::Error` converts into
/// [`TaskError::Fail`], so task bodies can use `?` freely.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// Task execution failed.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Task body panicked; the panic was contained to this task.
    #[error("task panicked: {info}")]
    Panicked {
        /// Panic payload, when it was a string.
        info: String,
    },
}

impl TaskError {
    /// Shorthand for [`TaskError::Fail`].
    pub fn fail(error: impl std::fmt::Display) -> Self {
        TaskError::Fail {
            error: error.to_string(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Fail { .. } => "task_failed",
            TaskError::Panicked { .. } => "task_panicked",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            TaskError::Fail { error } => format!("error: {error}"),
            TaskError::Panicked { info } => format!("panic: {info}"),
        }
    }
}

impl From<anyhow::Error> for TaskError {
    fn from(err: anyhow::Error) -> Self {
        TaskError::Fail {
            error: format!("{err:#}"),
        }
    }
}

/// # Errors reported by a session binder.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BindError {
    /// The handle could not be associated with the session.
    #[error("session {session} rejected: {reason}")]
    Rejected {
        /// Session the bind targeted.
        session: String,
        /// Collaborator-provided reason.
        reason: String,
    },

    /// The collaborator cannot produce handles at all.
    #[error("no session handle available: {reason}")]
    Unavailable {
        /// Collaborator-provided reason.
        reason: String,
    },
}

impl BindError {
    /// Shorthand for [`BindError::Rejected`].
    pub fn rejected(session: impl Into<String>, reason: impl Into<String>) -> Self {
        BindError::Rejected {
            session: session.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for [`BindError::Unavailable`].
    pub fn unavailable(reason: impl Into<String>) -> Self {
        BindError::Unavailable {
            reason: reason.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            BindError::Rejected { .. } => "bind_rejected",
            BindError::Unavailable { .. } => "bind_unavailable",
        }
    }
}

/// # Failure outcome of a submitted task.
///
/// Every [`TaskHandle`](crate::TaskHandle) resolves to `Ok(output)` or one of these.
/// Only [`DispatchError::InvalidTarget`] is ever returned synchronously from `submit`.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// `submit` was called without a session key.
    #[error("no session target")]
    InvalidTarget,

    /// The slot could not be bound to the task's session.
    #[error("failed to bind session {session}: {error}")]
    BindFailure {
        /// Session the bind targeted.
        session: String,
        /// Error reported by the binder.
        error: BindError,
    },

    /// No new session handle could be created for the task's session.
    #[error("session handle unavailable for {session}: {error}")]
    HandleUnavailable {
        /// Session that needed a new slot.
        session: String,
        /// Error reported by the binder.
        error: BindError,
    },

    /// Task execution exceeded its budget and was aborted.
    #[error("task timed out after {timeout:?}")]
    TaskTimeout {
        /// The configured budget.
        timeout: Duration,
    },

    /// Task waited in a queue longer than allowed and was dropped unstarted.
    #[error("task dropped after waiting {waited:?} in queue (limit {limit:?})")]
    QueueTimeout {
        /// How long the task waited.
        waited: Duration,
        /// The configured limit.
        limit: Duration,
    },

    /// The dispatcher shut down before the task completed.
    #[error("dispatcher closed")]
    DispatcherClosed,

    /// The task ran and reported a failure.
    #[error(transparent)]
    Task(#[from] TaskError),
}

impl DispatchError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use slotvisor::DispatchError;
    /// use std::time::Duration;
    ///
    /// let err = DispatchError::TaskTimeout { timeout: Duration::from_secs(1) };
    /// assert_eq!(err.as_label(), "task_timeout");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            DispatchError::InvalidTarget => "invalid_target",
            DispatchError::BindFailure { .. } => "bind_failure",
            DispatchError::HandleUnavailable { .. } => "handle_unavailable",
            DispatchError::TaskTimeout { .. } => "task_timeout",
            DispatchError::QueueTimeout { .. } => "queue_timeout",
            DispatchError::DispatcherClosed => "dispatcher_closed",
            DispatchError::Task(e) => e.as_label(),
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            DispatchError::InvalidTarget => "no session target".to_string(),
            DispatchError::BindFailure { session, error } => {
                format!("bind failed: session={session} {error}")
            }
            DispatchError::HandleUnavailable { session, error } => {
                format!("handle unavailable: session={session} {error}")
            }
            DispatchError::TaskTimeout { timeout } => format!("timeout: {timeout:?}"),
            DispatchError::QueueTimeout { waited, limit } => {
                format!("queue timeout: waited={waited:?} limit={limit:?}")
            }
            DispatchError::DispatcherClosed => "dispatcher closed".to_string(),
            DispatchError::Task(e) => e.as_message(),
        }
    }

    /// True for failures that are contained to one task and leave the slot usable.
    pub fn is_contained(&self) -> bool {
        matches!(
            self,
            DispatchError::BindFailure { .. }
                | DispatchError::TaskTimeout { .. }
                | DispatchError::QueueTimeout { .. }
                | DispatchError::Task(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anyhow_errors_become_task_failures() {
        let err: TaskError = anyhow::anyhow!("page crashed").context("send").into();
        assert_eq!(
            err,
            TaskError::Fail {
                error: "send: page crashed".into()
            }
        );
        assert_eq!(err.as_label(), "task_failed");
    }

    #[test]
    fn task_errors_keep_their_label_through_dispatch() {
        let err = DispatchError::from(TaskError::fail("boom"));
        assert_eq!(err.as_label(), "task_failed");
        assert_eq!(err.to_string(), "execution failed: boom");
        assert!(err.is_contained());
    }

    #[test]
    fn closed_is_not_contained() {
        assert!(!DispatchError::DispatcherClosed.is_contained());
        assert!(
            !DispatchError::HandleUnavailable {
                session: "a".into(),
                error: BindError::unavailable("pool gone"),
            }
            .is_contained()
        );
    }
}
