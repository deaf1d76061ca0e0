//! # Alias map: alternative textual forms of a session.
//!
//! A session may be addressed by more than one string (a numeric id and a vanity
//! handle, say). Binders report the form a session resolved to; the map remembers
//! `alias → canonical` so later lookups route to the same slot.
//!
//! ## Rules
//! - `record` never replaces an existing alias that points elsewhere; it reports the
//!   conflict and keeps the old entry.
//! - `rebind` is the only way to repoint an alias.
//! - Lookups are single-level: `canonical(a)` is `map[a]` or `a` itself.

use std::collections::HashMap;

use crate::session::SessionKey;

/// `alias → canonical session` mapping.
#[derive(Debug, Default)]
pub(crate) struct AliasMap {
    map: HashMap<String, SessionKey>,
}

impl AliasMap {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Resolves `key` to its canonical session.
    pub(crate) fn canonical(&self, key: &SessionKey) -> SessionKey {
        self.map
            .get(key.as_str())
            .cloned()
            .unwrap_or_else(|| key.clone())
    }

    #[cfg(test)]
    pub(crate) fn get(&self, alias: &str) -> Option<&SessionKey> {
        self.map.get(alias)
    }

    /// Records `alias → canonical` unless the alias already names a different session.
    ///
    /// On conflict the existing target is returned and the map is left untouched.
    pub(crate) fn record(&mut self, alias: &str, canonical: &SessionKey) -> Result<(), SessionKey> {
        if alias.is_empty() || alias == canonical.as_str() {
            return Ok(());
        }
        match self.map.get(alias) {
            Some(existing) if existing != canonical => Err(existing.clone()),
            Some(_) => Ok(()),
            None => {
                self.map.insert(alias.to_string(), canonical.clone());
                Ok(())
            }
        }
    }

    /// Explicitly points `alias` at `canonical`, replacing any previous target.
    ///
    /// Rebinding an alias to itself removes the entry.
    pub(crate) fn rebind(&mut self, alias: &str, canonical: &SessionKey) -> Option<SessionKey> {
        if alias == canonical.as_str() {
            return self.map.remove(alias);
        }
        self.map.insert(alias.to_string(), canonical.clone())
    }

    pub(crate) fn len(&self) -> usize {
        self.map.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::job::tests::key;

    #[test]
    fn unknown_keys_are_their_own_canonical_form() {
        let aliases = AliasMap::new();
        assert_eq!(aliases.canonical(&key("alice")), key("alice"));
    }

    #[test]
    fn record_routes_alias_to_canonical() {
        let mut aliases = AliasMap::new();
        aliases.record("alice.smith", &key("1001")).unwrap();
        assert_eq!(aliases.canonical(&key("alice.smith")), key("1001"));
        assert_eq!(aliases.len(), 1);
    }

    #[test]
    fn record_never_silently_overwrites() {
        let mut aliases = AliasMap::new();
        aliases.record("alice.smith", &key("1001")).unwrap();
        aliases.record("alice.smith", &key("1001")).unwrap();

        assert_eq!(aliases.record("alice.smith", &key("2002")), Err(key("1001")));
        assert_eq!(aliases.get("alice.smith"), Some(&key("1001")));
    }

    #[test]
    fn self_alias_is_ignored() {
        let mut aliases = AliasMap::new();
        aliases.record("1001", &key("1001")).unwrap();
        assert_eq!(aliases.len(), 0);
    }

    #[test]
    fn rebind_repoints_explicitly() {
        let mut aliases = AliasMap::new();
        aliases.record("alice.smith", &key("1001")).unwrap();

        let previous = aliases.rebind("alice.smith", &key("2002"));
        assert_eq!(previous, Some(key("1001")));
        assert_eq!(aliases.canonical(&key("alice.smith")), key("2002"));

        aliases.rebind("alice.smith", &key("alice.smith"));
        assert_eq!(aliases.get("alice.smith"), None);
    }
}
