//! Error types for the strata library.
//!
//! This module provides the error hierarchy for configuration loading,
//! writing and strict value retrieval, using `thiserror` for ergonomic error
//! handling. Lookups that simply find nothing (missing key, unset environment
//! variable, unknown alias) are not errors; they surface as absence.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for operations that may fail with a strata error.
///
/// # Examples
///
/// ```
/// use strata::{Error, Result};
///
/// fn example_operation() -> Result<i64> {
///     Ok(3306)
/// }
/// ```
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for the strata library.
#[derive(Debug, Error)]
pub enum Error {
    /// No candidate configuration file exists in any search location.
    #[error("config file \"{name}\" not found in {}", format_locations(.locations))]
    ConfigFileNotFound {
        /// The configured base name (or explicit file) that was searched for.
        name: String,
        /// Every location that was searched, in order.
        locations: Vec<PathBuf>,
    },

    /// A configuration file was found but could not be parsed.
    #[error("failed to decode {format} configuration: {message}")]
    Decode {
        /// The format used to decode.
        format: String,
        /// The decoder's error message.
        message: String,
    },

    /// Configuration content could not be serialized.
    #[error("failed to encode {format} configuration: {message}")]
    Encode {
        /// The format used to encode.
        format: String,
        /// The encoder's error message.
        message: String,
    },

    /// No codec is registered for the requested format.
    #[error("unsupported config type \"{format}\"")]
    UnsupportedConfigType {
        /// The format name that was requested.
        format: String,
    },

    /// `write_config` was called before any config file path was resolved.
    #[error("no config file path is known; read a config file or set one explicitly first")]
    WriteWithoutKnownPath,

    /// A safe write found an existing file at the target path.
    #[error("config file already exists: {}", path.display())]
    ConfigFileAlreadyExists {
        /// The path that already exists.
        path: PathBuf,
    },

    /// A write would turn a leaf into an internal node or vice versa.
    #[error("shape conflict at '{key}': {details}")]
    ShapeConflict {
        /// The key being written.
        key: String,
        /// Which part of the path conflicted.
        details: String,
    },

    /// A strict accessor found a value that cannot be converted.
    #[error("value for '{key}' cannot be converted to {expected}")]
    Coercion {
        /// The key that was read.
        key: String,
        /// The requested target type.
        expected: &'static str,
    },

    /// Unmarshaling into a target type failed.
    #[error("unmarshal error: {0}")]
    Unmarshal(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn format_locations(locations: &[PathBuf]) -> String {
    let parts: Vec<String> = locations
        .iter()
        .map(|p| p.display().to_string())
        .collect();
    format!("[{}]", parts.join(", "))
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Decode {
            format: "yaml".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode {
            format: "json".to_string(),
            message: err.to_string(),
        }
    }
}

impl Error {
    /// Check if error indicates that no configuration file was found.
    ///
    /// Callers typically treat this as recoverable and fall back to defaults.
    ///
    /// # Examples
    ///
    /// ```
    /// use strata::Error;
    ///
    /// let err = Error::ConfigFileNotFound { name: "config".into(), locations: vec![] };
    /// assert!(err.is_not_found());
    /// ```
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ConfigFileNotFound { .. })
    }

    /// Check if error came from a malformed configuration file.
    #[must_use]
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode { .. })
    }
}
