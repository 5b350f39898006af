//! Configuration file discovery.
//!
//! This module keeps the search parameters (base name, declared format,
//! search directories or an explicit file) and turns them into the single
//! file that `read_in_config` loads.

use std::env;
use std::path::{Path, PathBuf};

use crate::codec::CodecRegistry;
use crate::error::{Error, Result};
use crate::fs::Filesystem;

/// The base name searched for when none is configured.
pub const DEFAULT_CONFIG_NAME: &str = "config";

/// A located configuration file and the format used to decode it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    /// Path to the configuration file.
    pub path: PathBuf,
    /// Lower-case format name.
    pub format: String,
}

/// Search parameters for configuration files.
///
/// # Examples
///
/// ```
/// use strata::ConfigLocator;
/// use std::path::PathBuf;
///
/// let mut locator = ConfigLocator::default();
/// locator.set_name("config");
/// locator.set_config_type("yaml");
/// locator.add_path("/etc/appname/");
/// assert_eq!(locator.paths(), [PathBuf::from("/etc/appname/")]);
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLocator {
    name: String,
    config_type: Option<String>,
    paths: Vec<PathBuf>,
    explicit: Option<PathBuf>,
}

impl Default for ConfigLocator {
    fn default() -> Self {
        Self {
            name: DEFAULT_CONFIG_NAME.to_string(),
            config_type: None,
            paths: Vec::new(),
            explicit: None,
        }
    }
}

impl ConfigLocator {
    /// Sets the base file name (without extension).
    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    /// Returns the base file name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declares the file format. An empty string clears it.
    pub fn set_config_type(&mut self, config_type: &str) {
        self.config_type = if config_type.is_empty() {
            None
        } else {
            Some(config_type.to_lowercase())
        };
    }

    /// Returns the declared file format.
    #[must_use]
    pub fn config_type(&self) -> Option<&str> {
        self.config_type.as_deref()
    }

    /// Appends a search directory. `~` and `$VAR` references are expanded.
    /// Duplicates are ignored.
    pub fn add_path(&mut self, dir: &str) {
        let path = expand_path(dir);
        if !self.paths.contains(&path) {
            log::debug!("adding {} to config search paths", path.display());
            self.paths.push(path);
        }
    }

    /// Returns the search directories in registration order.
    #[must_use]
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Uses `path` directly instead of searching.
    pub fn set_file(&mut self, path: &str) {
        self.explicit = Some(expand_path(path));
    }

    /// Returns the explicitly configured file.
    #[must_use]
    pub fn explicit_file(&self) -> Option<&Path> {
        self.explicit.as_deref()
    }

    /// Finds the configuration file to load.
    ///
    /// An explicit file is used as-is. Otherwise each search directory is
    /// tried in order: with a declared format, `name.format` and then the
    /// extension-less `name`; without one, `name.ext` for every supported
    /// format.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigFileNotFound`] listing every candidate when
    /// nothing exists, or [`Error::UnsupportedConfigType`] when the format of
    /// the file cannot be decoded.
    pub fn locate(&self, fs: &dyn Filesystem, codecs: &CodecRegistry) -> Result<ConfigFile> {
        if let Some(path) = &self.explicit {
            if !fs.exists(path) {
                return Err(Error::ConfigFileNotFound {
                    name: path.display().to_string(),
                    locations: vec![path.clone()],
                });
            }
            let format = self.format_for(path, codecs)?;
            return Ok(ConfigFile {
                path: path.clone(),
                format,
            });
        }

        let mut searched = Vec::new();
        for dir in &self.paths {
            for candidate in self.candidates(dir, codecs) {
                log::debug!("looking for config file at {}", candidate.display());
                if fs.exists(&candidate) {
                    let format = self.format_for(&candidate, codecs)?;
                    return Ok(ConfigFile {
                        path: candidate,
                        format,
                    });
                }
                searched.push(candidate);
            }
        }

        Err(Error::ConfigFileNotFound {
            name: self.name.clone(),
            locations: searched,
        })
    }

    fn candidates(&self, dir: &Path, codecs: &CodecRegistry) -> Vec<PathBuf> {
        match &self.config_type {
            Some(ext) => vec![
                dir.join(format!("{}.{ext}", self.name)),
                dir.join(&self.name),
            ],
            None => codecs
                .formats()
                .iter()
                .map(|ext| dir.join(format!("{}.{ext}", self.name)))
                .collect(),
        }
    }

    /// Picks the format for `path`: its extension when a codec supports it,
    /// else the declared type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedConfigType`] when neither is usable.
    pub fn format_for(&self, path: &Path, codecs: &CodecRegistry) -> Result<String> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);

        if let Some(ext) = &ext {
            if codecs.supports(ext) {
                return Ok(ext.clone());
            }
        }
        if let Some(declared) = &self.config_type {
            if codecs.supports(declared) {
                return Ok(declared.clone());
            }
            return Err(Error::UnsupportedConfigType {
                format: declared.clone(),
            });
        }
        Err(Error::UnsupportedConfigType {
            format: ext.unwrap_or_default(),
        })
    }
}

/// Expands `~`, `$VAR` and `${VAR}` in a path string.
///
/// Unset variables expand to the empty string. A path the home directory
/// cannot be found for is left unexpanded.
///
/// # Examples
///
/// ```
/// use strata::loader::expand_path;
/// use std::path::PathBuf;
///
/// assert_eq!(expand_path("/etc/appname"), PathBuf::from("/etc/appname"));
/// assert!(expand_path("~/.appname").is_absolute());
/// ```
#[must_use]
pub fn expand_path(raw: &str) -> PathBuf {
    let expanded = expand_vars(raw);
    if expanded == "~" {
        if let Some(home) = home::home_dir() {
            return home;
        }
    } else if let Some(rest) = expanded
        .strip_prefix("~/")
        .or_else(|| expanded.strip_prefix("~\\"))
    {
        if let Some(home) = home::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(expanded)
}

fn expand_vars(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }

        let rest = &raw[i + 1..];
        if let Some(braced) = rest.strip_prefix('{') {
            if let Some(end) = braced.find('}') {
                out.push_str(&env::var(&braced[..end]).unwrap_or_default());
                // Skip "{NAME}"
                for _ in 0..braced[..end].chars().count() + 2 {
                    chars.next();
                }
                continue;
            }
        }

        let len = rest
            .find(|ch: char| !(ch.is_ascii_alphanumeric() || ch == '_'))
            .unwrap_or(rest.len());
        if len == 0 {
            out.push('$');
            continue;
        }
        out.push_str(&env::var(&rest[..len]).unwrap_or_default());
        for _ in 0..len {
            chars.next();
        }
    }

    out
}
