//! Key aliases.
//!
//! An alias redirects every read and write of one key to a canonical key.
//! Resolution is a single hop: aliases are never followed transitively.

use std::collections::HashMap;

use crate::key::KeyPath;

/// Mapping from alias keys to canonical keys.
///
/// # Examples
///
/// ```
/// use strata::{AliasTable, KeyPath};
///
/// let mut aliases = AliasTable::new();
/// assert!(aliases.register(&KeyPath::new("nameA"), &KeyPath::new("nameB")));
/// assert_eq!(aliases.resolve(&KeyPath::new("NAMEA")), KeyPath::new("nameb"));
/// assert_eq!(aliases.resolve(&KeyPath::new("other")), KeyPath::new("other"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    entries: HashMap<KeyPath, KeyPath>,
}

impl AliasTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `alias` as another name for `canonical`, replacing any
    /// previous mapping for `alias`.
    ///
    /// Returns `false` (and registers nothing) when the alias equals the
    /// canonical key or when `canonical` already redirects to `alias`.
    pub fn register(&mut self, alias: &KeyPath, canonical: &KeyPath) -> bool {
        if alias == canonical {
            return false;
        }
        if self.entries.get(canonical) == Some(alias) {
            log::warn!("refusing circular alias {alias} -> {canonical}");
            return false;
        }
        log::debug!("alias {alias} -> {canonical}");
        self.entries.insert(alias.clone(), canonical.clone());
        true
    }

    /// Returns the canonical key for `key`, or `key` itself.
    #[must_use]
    pub fn resolve(&self, key: &KeyPath) -> KeyPath {
        self.entries.get(key).cloned().unwrap_or_else(|| key.clone())
    }

    /// Returns `true` if some alias resolves to `key`.
    #[must_use]
    pub fn is_target(&self, key: &KeyPath) -> bool {
        self.entries.values().any(|canonical| canonical == key)
    }

    /// Returns `true` if `key` is a registered alias.
    #[must_use]
    pub fn is_alias(&self, key: &KeyPath) -> bool {
        self.entries.contains_key(key)
    }

    /// Iterates over `(alias, canonical)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&KeyPath, &KeyPath)> {
        self.entries.iter()
    }

    /// Removes every alias.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(raw: &str) -> KeyPath {
        KeyPath::new(raw)
    }

    #[test]
    fn test_resolve_unregistered_is_identity() {
        let aliases = AliasTable::new();
        assert_eq!(aliases.resolve(&key("verbose")), key("verbose"));
    }

    #[test]
    fn test_register_overwrites() {
        let mut aliases = AliasTable::new();
        aliases.register(&key("a"), &key("b"));
        aliases.register(&key("a"), &key("c"));
        assert_eq!(aliases.resolve(&key("a")), key("c"));
    }

    #[test]
    fn test_not_transitive() {
        let mut aliases = AliasTable::new();
        aliases.register(&key("a"), &key("b"));
        aliases.register(&key("b"), &key("c"));
        assert_eq!(aliases.resolve(&key("a")), key("b"));
        assert_eq!(aliases.resolve(&key("b")), key("c"));
    }

    #[test]
    fn test_is_target() {
        let mut aliases = AliasTable::new();
        aliases.register(&key("a"), &key("b"));
        assert!(aliases.is_target(&key("B")));
        assert!(!aliases.is_target(&key("a")));
    }

    #[test]
    fn test_self_alias_ignored() {
        let mut aliases = AliasTable::new();
        assert!(!aliases.register(&key("Name"), &key("name")));
        assert!(!aliases.is_alias(&key("name")));
    }

    #[test]
    fn test_circular_alias_refused() {
        let mut aliases = AliasTable::new();
        assert!(aliases.register(&key("a"), &key("b")));
        assert!(!aliases.register(&key("b"), &key("a")));
        assert_eq!(aliases.resolve(&key("b")), key("b"));
    }

    #[test]
    fn test_case_insensitive() {
        let mut aliases = AliasTable::new();
        aliases.register(&key("NameA"), &key("NameB"));
        assert!(aliases.is_alias(&key("namea")));
        assert_eq!(aliases.iter().count(), 1);
        aliases.clear();
        assert_eq!(aliases.iter().count(), 0);
    }
}
