//! # Session binder: the collaborator that owns session handles.
//!
//! The dispatcher never knows what a "handle" is. It asks a [`SessionBinder`] to
//! create one per worker slot, to point it at a session, and to tear it down at
//! shutdown. A browser page navigated to a conversation URL is the canonical example.
//!
//! ## Contract
//! - [`open`](SessionBinder::open) is idempotent: opening the session a handle is
//!   already on succeeds without side effects.
//! - `open` must work on a handle that was previously closed or failed a bind.
//! - A handle is never used by the binder and a task at the same time.

use async_trait::async_trait;

use crate::error::BindError;
use crate::session::SessionKey;

/// Result of a successful [`SessionBinder::open`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindOutcome {
    /// Another textual form the session resolved to (e.g. a slug read back from the
    /// handle). The dispatcher records it so later submissions using the alias land
    /// on the same slot.
    pub alias: Option<String>,
}

impl BindOutcome {
    /// Bound, nothing new learned about the session.
    pub fn unchanged() -> Self {
        Self { alias: None }
    }

    /// Bound, and the session is also known as `alias`.
    pub fn aliased(alias: impl Into<String>) -> Self {
        Self {
            alias: Some(alias.into()),
        }
    }
}

/// Creates, binds and releases session handles.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use slotvisor::{BindError, BindOutcome, SessionBinder, SessionKey};
/// use std::sync::Mutex;
///
/// #[derive(Default)]
/// struct Tab { url: Mutex<String> }
///
/// struct Tabs;
///
/// #[async_trait]
/// impl SessionBinder for Tabs {
///     type Handle = Tab;
///
///     async fn create(&self) -> Result<Tab, BindError> {
///         Ok(Tab::default())
///     }
///
///     async fn open(&self, tab: &Tab, session: &SessionKey) -> Result<BindOutcome, BindError> {
///         *tab.url.lock().unwrap() = format!("/messages/{session}");
///         Ok(BindOutcome::unchanged())
///     }
///
///     async fn close(&self, _tab: &Tab) {}
/// }
/// ```
#[async_trait]
pub trait SessionBinder: Send + Sync + 'static {
    /// Execution context owned by one worker slot.
    type Handle: Send + Sync + 'static;

    /// Produces a fresh, unbound handle.
    ///
    /// Failure here means no new slot can exist; the dispatcher reports it to the
    /// waiting tasks as [`DispatchError::HandleUnavailable`](crate::DispatchError::HandleUnavailable).
    async fn create(&self) -> Result<Self::Handle, BindError>;

    /// Associates `handle` with `session`.
    async fn open(
        &self,
        handle: &Self::Handle,
        session: &SessionKey,
    ) -> Result<BindOutcome, BindError>;

    /// Releases `handle`. Called once per handle, at shutdown or after a failed first bind.
    async fn close(&self, handle: &Self::Handle);
}
