//! Per-tier value trees and precedence ranks.
//!
//! Each configuration source tier owns one [`ValueStore`]: a tree whose
//! internal nodes are mappings keyed by one folded path segment. Writes
//! never change the shape of an existing path; deep merges used for
//! snapshots and incremental file loads let the incoming side win.

use std::fmt;

use crate::error::{Error, Result};
use crate::key::KeyPath;
use crate::value::{Map, Value};

/// A configuration source tier.
///
/// Tiers are ordered by precedence: comparing two tiers tells which one
/// wins (`Tier::Override > Tier::Default`).
///
/// # Examples
///
/// ```
/// use strata::Tier;
///
/// assert!(Tier::Override > Tier::Flag);
/// assert!(Tier::Flag > Tier::Env);
/// assert!(Tier::Env > Tier::File);
/// assert!(Tier::File > Tier::Default);
/// assert_eq!(Tier::LOOKUP_ORDER[0], Tier::Override);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tier {
    /// Values registered with `set_default`.
    Default,
    /// Values decoded from a configuration file.
    File,
    /// Values read from environment variables.
    Env,
    /// Values from explicitly passed command-line flags.
    Flag,
    /// Values registered with `set`.
    Override,
}

impl Tier {
    /// Tiers from highest to lowest precedence.
    pub const LOOKUP_ORDER: [Self; 5] = [
        Self::Override,
        Self::Flag,
        Self::Env,
        Self::File,
        Self::Default,
    ];
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => write!(f, "default"),
            Self::File => write!(f, "file"),
            Self::Env => write!(f, "env"),
            Self::Flag => write!(f, "flag"),
            Self::Override => write!(f, "override"),
        }
    }
}

/// A nested tree of values for one tier.
///
/// # Examples
///
/// ```
/// use strata::{KeyPath, Value, ValueStore};
///
/// let mut store = ValueStore::new();
/// store.set(&KeyPath::new("Mysql.Addr"), Value::from("h")).unwrap();
/// assert_eq!(store.get(&KeyPath::new("mysql.addr")), Some(&Value::from("h")));
///
/// // "mysql.addr" is a leaf, so it cannot become a parent
/// assert!(store.set(&KeyPath::new("mysql.addr.host"), Value::from("x")).is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueStore {
    root: Map,
}

impl ValueStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store from a decoded mapping, folding every key.
    #[must_use]
    pub fn from_map(map: Map) -> Self {
        Self {
            root: crate::value::fold_map(map),
        }
    }

    /// Returns the whole tree.
    #[must_use]
    pub const fn root(&self) -> &Map {
        &self.root
    }

    /// Consumes the store, returning its tree.
    #[must_use]
    pub fn into_map(self) -> Map {
        self.root
    }

    /// Returns `true` if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Removes everything.
    pub fn clear(&mut self) {
        self.root.clear();
    }

    /// Looks up the value at `path`. The root key holds no value.
    #[must_use]
    pub fn get(&self, path: &KeyPath) -> Option<&Value> {
        let (last, parents) = path.segments().split_last()?;
        let mut node = &self.root;
        for segment in parents {
            node = node.get(segment)?.as_map()?;
        }
        node.get(last)
    }

    /// Writes `value` at `path`, creating intermediate mappings.
    ///
    /// Writing a mapping over a mapping, or a non-mapping over a
    /// non-mapping, replaces the previous value. Writing the root replaces
    /// the whole tree and requires a mapping.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShapeConflict`] if the path passes through an
    /// existing non-mapping value, or if the write would replace a mapping
    /// with a non-mapping value (or the reverse).
    pub fn set(&mut self, path: &KeyPath, value: Value) -> Result<()> {
        let value = value.folded();
        let Some((last, parents)) = path.segments().split_last() else {
            return match value {
                Value::Map(map) => {
                    self.root = map;
                    Ok(())
                }
                other => Err(Error::ShapeConflict {
                    key: path.to_string(),
                    details: format!("the root can only hold a mapping, not a {}", other.type_name()),
                }),
            };
        };

        let mut node = &mut self.root;
        for (depth, segment) in parents.iter().enumerate() {
            let entry = node
                .entry(segment.clone())
                .or_insert_with(|| Value::Map(Map::new()));
            node = match entry {
                Value::Map(map) => map,
                other => {
                    return Err(Error::ShapeConflict {
                        key: path.to_string(),
                        details: format!(
                            "'{}' holds a {} and cannot contain nested keys",
                            path.segments()[..=depth].join("."),
                            other.type_name()
                        ),
                    });
                }
            };
        }

        if let Some(existing) = node.get(last) {
            if existing.is_map() != value.is_map() {
                return Err(Error::ShapeConflict {
                    key: path.to_string(),
                    details: format!(
                        "cannot replace a {} with a {}",
                        existing.type_name(),
                        value.type_name()
                    ),
                });
            }
        }

        node.insert(last.clone(), value);
        Ok(())
    }

    /// Removes and returns the value at `path`. Emptied parents are kept.
    pub fn remove(&mut self, path: &KeyPath) -> Option<Value> {
        let (last, parents) = path.segments().split_last()?;
        let mut node = &mut self.root;
        for segment in parents {
            node = match node.get_mut(segment)? {
                Value::Map(map) => map,
                _ => return None,
            };
        }
        node.remove(last)
    }

    /// Deep-merges `source` into this store; `source` wins on conflicts.
    pub fn merge(&mut self, source: Map) {
        merge_into(&mut self.root, crate::value::fold_map(source));
    }

    /// Returns the path of every leaf, in sorted order.
    ///
    /// Empty mappings count as leaves so that they survive a snapshot.
    #[must_use]
    pub fn leaf_keys(&self) -> Vec<KeyPath> {
        let mut keys = Vec::new();
        collect_leaves(&self.root, &mut Vec::new(), &mut keys);
        keys
    }
}

/// Deep-merge `source` into `target` (source overwrites target).
///
/// # Merging Rules
///
/// - Mapping into mapping: merged key by key
/// - Anything else: source replaces target
pub fn merge_into(target: &mut Map, source: Map) {
    for (key, value) in source {
        match (target.get_mut(&key), value) {
            (Some(Value::Map(existing)), Value::Map(incoming)) => {
                merge_into(existing, incoming);
            }
            (_, value) => {
                target.insert(key, value);
            }
        }
    }
}

fn collect_leaves(map: &Map, prefix: &mut Vec<String>, out: &mut Vec<KeyPath>) {
    for (key, value) in map {
        prefix.push(key.clone());
        match value {
            Value::Map(inner) if !inner.is_empty() => collect_leaves(inner, prefix, out),
            _ => out.push(KeyPath::from_segments(prefix.clone())),
        }
        prefix.pop();
    }
}
