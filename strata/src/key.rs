//! Case-insensitive hierarchical configuration keys.
//!
//! A raw key such as `"Mysql.Addr"` is split on the key delimiter and every
//! segment is lower-cased. Two raw keys that fold to the same segments are
//! indistinguishable to every other component; the original spelling is only
//! kept for display.

use std::fmt;
use std::hash::{Hash, Hasher};

/// The default delimiter between key segments.
pub const DEFAULT_DELIMITER: &str = ".";

/// A normalized, case-folded configuration key.
///
/// # Examples
///
/// ```
/// use strata::KeyPath;
///
/// let a = KeyPath::new("Mysql.Addr");
/// let b = KeyPath::new("mysql.ADDR");
/// assert_eq!(a, b);
/// assert_eq!(a.segments(), ["mysql", "addr"]);
/// assert_eq!(a.to_string(), "Mysql.Addr");
/// ```
#[derive(Debug, Clone)]
pub struct KeyPath {
    segments: Vec<String>,
    raw: String,
}

impl KeyPath {
    /// Normalizes a raw key using the default `.` delimiter.
    #[must_use]
    pub fn new(raw: &str) -> Self {
        Self::with_delimiter(raw, DEFAULT_DELIMITER)
    }

    /// Normalizes a raw key using a custom delimiter.
    ///
    /// The empty string yields the root key (no segments). An empty
    /// delimiter treats the whole key as one segment.
    ///
    /// # Examples
    ///
    /// ```
    /// use strata::KeyPath;
    ///
    /// let key = KeyPath::with_delimiter("Mysql::Port", "::");
    /// assert_eq!(key.segments(), ["mysql", "port"]);
    /// assert!(KeyPath::new("").is_root());
    /// ```
    #[must_use]
    pub fn with_delimiter(raw: &str, delimiter: &str) -> Self {
        let segments = if raw.is_empty() {
            Vec::new()
        } else if delimiter.is_empty() {
            vec![raw.to_lowercase()]
        } else {
            raw.split(delimiter).map(str::to_lowercase).collect()
        };

        Self {
            segments,
            raw: raw.to_string(),
        }
    }

    /// Builds a key directly from already-folded segments.
    pub(crate) fn from_segments(segments: Vec<String>) -> Self {
        let raw = segments.join(DEFAULT_DELIMITER);
        Self { segments, raw }
    }

    /// Returns the folded segments.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Returns the key as originally written.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Returns `true` for the empty key.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns the folded key joined with `.`, used as the canonical lookup
    /// form for bindings and aliases.
    #[must_use]
    pub fn canonical(&self) -> String {
        self.segments.join(DEFAULT_DELIMITER)
    }

    /// Returns a new key with `segment` appended.
    #[must_use]
    pub fn child(&self, segment: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.to_lowercase());
        Self::from_segments(segments)
    }
}

impl PartialEq for KeyPath {
    fn eq(&self, other: &Self) -> bool {
        self.segments == other.segments
    }
}

impl Eq for KeyPath {}

impl Hash for KeyPath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.segments.hash(state);
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl From<&str> for KeyPath {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}
