//! Tier-ordered value resolution.
//!
//! [`Layers`] holds every source of one instance. A lookup resolves aliases
//! first, then walks the tiers from `Override` down to `Default` and returns
//! the first value found. Flags only count when the user passed them; a
//! flag's own default is consulted last, after every other tier.
//!
//! A lookup that lands on a mapping returns the merged subtree across all
//! tiers, so `get("mysql")` sees `mysql.addr` from a file and `mysql.port`
//! from the environment together.

use std::collections::{BTreeMap, HashMap};

use crate::alias::AliasTable;
use crate::env::EnvBinder;
use crate::flags::FlagBinding;
use crate::key::KeyPath;
use crate::store::{Tier, ValueStore};
use crate::value::{Map, Value};

/// All configuration sources of one instance.
#[derive(Debug, Clone, Default)]
pub(crate) struct Layers {
    pub(crate) defaults: ValueStore,
    pub(crate) file: ValueStore,
    pub(crate) overrides: ValueStore,
    pub(crate) flags: HashMap<KeyPath, FlagBinding>,
    pub(crate) env: EnvBinder,
    pub(crate) aliases: AliasTable,
}

impl Layers {
    /// Resolves `key` to its value and the tier that provided it.
    pub(crate) fn find(&self, key: &KeyPath) -> Option<(Tier, Value)> {
        let key = self.aliases.resolve(key);
        let (tier, value) = self.find_leaf(&key, true)?;
        match value {
            Value::Map(map) => {
                let merged = self.subtree(&key).unwrap_or(map);
                Some((tier, Value::Map(merged)))
            }
            other => Some((tier, other)),
        }
    }

    /// Returns `true` if `key` resolves to a value other than a flag's
    /// built-in default.
    pub(crate) fn is_set(&self, key: &KeyPath) -> bool {
        let key = self.aliases.resolve(key);
        self.find_leaf(&key, false).is_some() || self.subtree(&key).is_some()
    }

    /// Walks the tiers for an already canonical key without expanding
    /// mappings.
    fn find_leaf(&self, key: &KeyPath, flag_defaults: bool) -> Option<(Tier, Value)> {
        if key.is_root() {
            return None;
        }
        for tier in Tier::LOOKUP_ORDER {
            if let Some(value) = self.tier_value(tier, key) {
                return Some((tier, value));
            }
        }

        if flag_defaults {
            let state = self.flags.get(key)?.state()?;
            if !state.value.is_null() {
                return Some((Tier::Flag, state.value));
            }
        }
        None
    }

    /// Returns the value `tier` holds for `key`, if any.
    pub(crate) fn tier_value(&self, tier: Tier, key: &KeyPath) -> Option<Value> {
        let value = match tier {
            Tier::Override => self.overrides.get(key).cloned(),
            Tier::Flag => self
                .flags
                .get(key)
                .and_then(FlagBinding::state)
                .filter(|state| state.changed)
                .map(|state| state.value),
            Tier::Env => self.env.lookup(key).map(|(name, value)| {
                log::debug!("{key} resolved from environment variable {name}");
                Value::String(value)
            }),
            Tier::File => self.file.get(key).cloned(),
            Tier::Default => self.defaults.get(key).cloned(),
        };
        value.filter(|v| !v.is_null())
    }

    /// Every key any source knows about, with keys that are parents of other
    /// keys removed. Sorted by canonical form.
    ///
    /// A key below an ancestor that resolves to a scalar is replaced by that
    /// ancestor, so snapshots agree with [`Layers::find`] when tiers disagree
    /// on the shape of a key.
    fn candidate_keys(&self) -> Vec<KeyPath> {
        let mut keys: BTreeMap<String, KeyPath> = BTreeMap::new();
        let stores = [&self.defaults, &self.file, &self.overrides];
        let leaves = stores.into_iter().flat_map(ValueStore::leaf_keys);
        let bound = self
            .env
            .bound_keys()
            .chain(self.flags.keys())
            .chain(self.aliases.iter().map(|(_, canonical)| canonical))
            .cloned();
        for key in leaves.chain(bound) {
            let key = self.scalar_ancestor(&key).unwrap_or(key);
            keys.entry(key.canonical()).or_insert(key);
        }

        let all: Vec<KeyPath> = keys.into_values().collect();
        all.iter()
            .filter(|key| {
                !all.iter().any(|other| {
                    other.segments().len() > key.segments().len()
                        && other.segments().starts_with(key.segments())
                })
            })
            .cloned()
            .collect()
    }

    /// Returns the shallowest proper ancestor of `key` that resolves to a
    /// value other than a mapping.
    fn scalar_ancestor(&self, key: &KeyPath) -> Option<KeyPath> {
        (1..key.segments().len())
            .map(|depth| KeyPath::from_segments(key.segments()[..depth].to_vec()))
            .find(|ancestor| {
                self.find_leaf(ancestor, true)
                    .is_some_and(|(_, value)| !matches!(value, Value::Map(_)))
            })
    }

    /// Returns every leaf key that currently resolves to a value, sorted.
    pub(crate) fn all_keys(&self) -> Vec<KeyPath> {
        self.candidate_keys()
            .into_iter()
            .filter(|key| self.find_leaf(key, true).is_some())
            .collect()
    }

    /// Builds the merged mapping below `prefix` from every leaf under it.
    ///
    /// Returns `None` when no resolvable key lies below `prefix`.
    pub(crate) fn subtree(&self, prefix: &KeyPath) -> Option<Map> {
        let depth = prefix.segments().len();
        let mut tree = ValueStore::new();
        let mut found = false;

        for key in self.candidate_keys() {
            if key.segments().len() <= depth || !key.segments().starts_with(prefix.segments()) {
                continue;
            }
            let Some((_, value)) = self.find_leaf(&key, true) else {
                continue;
            };
            let relative = KeyPath::from_segments(key.segments()[depth..].to_vec());
            if let Err(e) = tree.set(&relative, value) {
                log::warn!("skipping {key} in snapshot: {e}");
                continue;
            }
            found = true;
        }

        found.then(|| tree.into_map())
    }

    /// Returns the merged snapshot of every known key.
    pub(crate) fn all_settings(&self) -> Map {
        self.subtree(&KeyPath::new("")).unwrap_or_default()
    }
}
