//! Environment variable binding.
//!
//! Keys reach the environment in two ways:
//!
//! - **Explicit bindings** map a key to one or more variable names, fixed at
//!   bind time. Binding a key without names derives one from the current
//!   prefix (`id` with prefix `APP` reads `APP_ID`).
//! - **Automatic mode** derives a name for any key on demand: the key
//!   replacer is applied, the result upper-cased and `PREFIX_` prepended.
//!
//! Variables are read from the process environment on every lookup. Nothing
//! is cached, so values changed by other code are seen immediately.

use std::collections::HashMap;
use std::env;

use crate::key::KeyPath;

/// Derives environment variable names for configuration keys and reads them.
///
/// # Examples
///
/// ```
/// use strata::{EnvBinder, KeyPath};
///
/// let mut binder = EnvBinder::new();
/// binder.set_prefix("app");
/// binder.set_key_replacer(&[(".", "_")]);
/// assert_eq!(binder.derive_name(&KeyPath::new("mysql.addr")), "APP_MYSQL_ADDR");
/// ```
#[derive(Debug, Clone, Default)]
pub struct EnvBinder {
    prefix: Option<String>,
    replacer: Vec<(String, String)>,
    automatic: bool,
    allow_empty: bool,
    bindings: HashMap<KeyPath, Vec<String>>,
}

impl EnvBinder {
    /// Creates a binder with no prefix, no replacer and automatic mode off.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the prefix prepended (with `_`) to derived names.
    ///
    /// A trailing `_` is dropped so that `APP` and `APP_` behave the same.
    /// An empty prefix removes it.
    pub fn set_prefix(&mut self, prefix: &str) {
        let trimmed = prefix.trim_end_matches('_');
        self.prefix = if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_uppercase())
        };
    }

    /// Returns the configured prefix.
    #[must_use]
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Sets the substitutions applied to keys before automatic derivation.
    ///
    /// Pairs are applied in order. Existing explicit bindings are not
    /// re-derived.
    pub fn set_key_replacer(&mut self, pairs: &[(&str, &str)]) {
        self.replacer = pairs
            .iter()
            .filter(|(from, _)| !from.is_empty())
            .map(|(from, to)| ((*from).to_string(), (*to).to_string()))
            .collect();
    }

    /// Enables automatic derivation for every key.
    pub fn enable_automatic(&mut self) {
        self.automatic = true;
    }

    /// Returns `true` if automatic mode is on.
    #[must_use]
    pub const fn is_automatic(&self) -> bool {
        self.automatic
    }

    /// Controls whether a variable set to the empty string counts as a value.
    pub fn set_allow_empty(&mut self, allow: bool) {
        self.allow_empty = allow;
    }

    /// Binds `key` to explicit variable names.
    ///
    /// With no names, the name is derived from the current prefix and the
    /// upper-cased key (the replacer is not applied). Later calls for the
    /// same key replace earlier ones.
    pub fn bind(&mut self, key: &KeyPath, names: &[&str]) {
        let names: Vec<String> = if names.is_empty() {
            vec![self.with_prefix(&key.canonical())]
        } else {
            names.iter().map(|n| (*n).to_string()).collect()
        };
        log::debug!("bound {key} to environment {names:?}");
        self.bindings.insert(key.clone(), names);
    }

    /// Moves the binding of `from` to `to`, unless `to` already has one.
    pub fn move_binding(&mut self, from: &KeyPath, to: &KeyPath) {
        if self.bindings.contains_key(to) {
            return;
        }
        if let Some(names) = self.bindings.remove(from) {
            self.bindings.insert(to.clone(), names);
        }
    }

    /// Returns the keys with an explicit binding.
    pub fn bound_keys(&self) -> impl Iterator<Item = &KeyPath> {
        self.bindings.keys()
    }

    /// Derives the automatic variable name for `key`.
    #[must_use]
    pub fn derive_name(&self, key: &KeyPath) -> String {
        let mut name = key.canonical();
        for (from, to) in &self.replacer {
            name = name.replace(from.as_str(), to);
        }
        self.with_prefix(&name)
    }

    fn with_prefix(&self, name: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}_{name}").to_uppercase(),
            None => name.to_uppercase(),
        }
    }

    /// Reads the environment value for `key`.
    ///
    /// An explicit binding takes priority; otherwise the automatic name is
    /// used when automatic mode is on. Returns the variable name together
    /// with its value.
    #[must_use]
    pub fn lookup(&self, key: &KeyPath) -> Option<(String, String)> {
        if let Some(names) = self.bindings.get(key) {
            return names
                .iter()
                .find_map(|name| self.read(name).map(|v| (name.clone(), v)));
        }

        if self.automatic {
            let name = self.derive_name(key);
            return self.read(&name).map(|v| (name, v));
        }

        None
    }

    fn read(&self, name: &str) -> Option<String> {
        let value = env::var_os(name)?.to_string_lossy().into_owned();
        if value.is_empty() && !self.allow_empty {
            return None;
        }
        Some(value)
    }
}
