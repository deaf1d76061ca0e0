//! # Session keys.
//!
//! [`SessionKey`] identifies a logical session (a conversation, a thread, ...) that
//! tasks run against. Keys are opaque, non-empty and cheap to clone.

use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

use crate::error::DispatchError;

/// Opaque, non-empty identifier of a logical session.
///
/// ## Example
/// ```rust
/// use slotvisor::{DispatchError, SessionKey};
///
/// let key = SessionKey::new("100012345").unwrap();
/// assert_eq!(key.as_str(), "100012345");
/// assert_eq!(SessionKey::new(""), Err(DispatchError::InvalidTarget));
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionKey(Arc<str>);

impl SessionKey {
    /// Creates a key, rejecting the empty string with [`DispatchError::InvalidTarget`].
    pub fn new(raw: impl AsRef<str>) -> Result<Self, DispatchError> {
        let raw = raw.as_ref();
        if raw.is_empty() {
            return Err(DispatchError::InvalidTarget);
        }
        Ok(Self(Arc::from(raw)))
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", &*self.0)
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SessionKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for SessionKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&SessionKey> for Arc<str> {
    fn from(key: &SessionKey) -> Self {
        Arc::clone(&key.0)
    }
}
