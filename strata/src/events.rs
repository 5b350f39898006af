//! Change notifications.
//!
//! Observers registered on an [`Instance`](crate::Instance) are called
//! synchronously after every mutation, once the instance lock has been
//! released, so an observer may read from the instance that notified it.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::key::KeyPath;
use crate::store::Tier;

/// A change to an instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigEvent {
    /// A value was written to a tier (`Override` for `set`, `Default` for
    /// `set_default`).
    Set {
        /// The canonical key written.
        key: KeyPath,
        /// The tier holding the value.
        tier: Tier,
    },

    /// The file tier was replaced or merged.
    Reload {
        /// The file the content came from, if any.
        path: Option<PathBuf>,
        /// `true` for incremental merges.
        merged: bool,
    },

    /// An alias was registered.
    Alias {
        /// The alias key.
        alias: KeyPath,
        /// The key it resolves to.
        canonical: KeyPath,
    },

    /// The instance was reset to its initial state.
    Reset,
}

impl fmt::Display for ConfigEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Set { key, tier } => write!(f, "set {key} ({tier})"),
            Self::Reload { path: Some(path), merged } => {
                let verb = if *merged { "merged" } else { "loaded" };
                write!(f, "{verb} {}", path.display())
            }
            Self::Reload { path: None, merged } => {
                let verb = if *merged { "merged" } else { "loaded" };
                write!(f, "{verb} configuration")
            }
            Self::Alias { alias, canonical } => write!(f, "alias {alias} -> {canonical}"),
            Self::Reset => write!(f, "reset"),
        }
    }
}

/// Receives [`ConfigEvent`]s.
///
/// Implemented for every `Fn(&ConfigEvent) + Send + Sync` closure.
///
/// # Examples
///
/// ```
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
/// use strata::Instance;
///
/// let config = Instance::new();
/// let count = Arc::new(AtomicUsize::new(0));
/// let seen = Arc::clone(&count);
/// config.subscribe(move |_event: &strata::ConfigEvent| {
///     seen.fetch_add(1, Ordering::SeqCst);
/// });
///
/// config.set("name", "demo").unwrap();
/// assert_eq!(count.load(Ordering::SeqCst), 1);
/// ```
pub trait ConfigObserver: Send + Sync {
    /// Called once per event.
    fn on_event(&self, event: &ConfigEvent);
}

impl<F> ConfigObserver for F
where
    F: Fn(&ConfigEvent) + Send + Sync,
{
    fn on_event(&self, event: &ConfigEvent) {
        self(event);
    }
}

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// The observers registered on one instance.
#[derive(Clone, Default)]
pub(crate) struct Observers {
    next_id: u64,
    entries: Vec<(SubscriptionId, Arc<dyn ConfigObserver>)>,
}

impl Observers {
    pub(crate) fn register(&mut self, observer: Arc<dyn ConfigObserver>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, observer));
        id
    }

    pub(crate) fn remove(&mut self, id: SubscriptionId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry, _)| *entry != id);
        self.entries.len() != before
    }

    /// Returns the current observers, to be called once the lock is dropped.
    pub(crate) fn snapshot(&self) -> Vec<Arc<dyn ConfigObserver>> {
        self.entries.iter().map(|(_, o)| Arc::clone(o)).collect()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

impl fmt::Debug for Observers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observers")
            .field("count", &self.entries.len())
            .finish()
    }
}

/// Delivers `events` to each observer in registration order.
pub(crate) fn dispatch(observers: &[Arc<dyn ConfigObserver>], events: &[ConfigEvent]) {
    for event in events {
        log::debug!("event: {event}");
        for observer in observers {
            observer.on_event(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_register_and_remove() {
        let mut observers = Observers::default();
        let first = observers.register(Arc::new(|_: &ConfigEvent| {}));
        let second = observers.register(Arc::new(|_: &ConfigEvent| {}));
        assert_ne!(first, second);
        assert_eq!(observers.len(), 2);

        assert!(observers.remove(first));
        assert!(!observers.remove(first));
        assert_eq!(observers.len(), 1);
    }

    #[test]
    fn test_dispatch_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut observers = Observers::default();
        for tag in ["a", "b"] {
            let log = Arc::clone(&log);
            observers.register(Arc::new(move |event: &ConfigEvent| {
                log.lock().unwrap().push(format!("{tag}:{event}"));
            }));
        }

        dispatch(
            &observers.snapshot(),
            &[
                ConfigEvent::Set {
                    key: KeyPath::new("Name"),
                    tier: Tier::Override,
                },
                ConfigEvent::Reset,
            ],
        );

        assert_eq!(
            *log.lock().unwrap(),
            ["a:set Name (override)", "b:set Name (override)", "a:reset", "b:reset"]
        );
    }

    #[test]
    fn test_reload_display() {
        let event = ConfigEvent::Reload {
            path: Some(PathBuf::from("/etc/app/config.yaml")),
            merged: true,
        };
        assert_eq!(event.to_string(), "merged /etc/app/config.yaml");
    }
}
