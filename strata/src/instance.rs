//! The configuration instance.
//!
//! An [`Instance`] owns every tier, binding and search parameter of one
//! configuration tree behind a single `RwLock`. Reads share the lock and
//! writes take it exclusively; file I/O and decoding happen before the write
//! lock is taken, and observers run after it is released.
//!
//! Instances share nothing. [`global`] returns a lazily created process-wide
//! instance for programs that want a single configuration.

use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::cast::{self, FromValue};
use crate::codec::{Codec, CodecRegistry};
use crate::de;
use crate::error::{Error, Result};
use crate::events::{dispatch, ConfigEvent, ConfigObserver, Observers, SubscriptionId};
use crate::flags::{FlagBinding, FlagSet};
use crate::fs::{Filesystem, OsFilesystem};
use crate::key::{KeyPath, DEFAULT_DELIMITER};
use crate::loader::{expand_path, ConfigFile, ConfigLocator};
use crate::resolver::Layers;
use crate::store::{Tier, ValueStore};
use crate::value::{Map, Value};

static GLOBAL: OnceLock<Instance> = OnceLock::new();

/// Returns the process-wide instance, creating it on first use.
///
/// # Examples
///
/// ```
/// strata::global().set_default("ContentDir", "content").unwrap();
/// assert_eq!(strata::global().get_string("contentdir"), "content");
/// ```
pub fn global() -> &'static Instance {
    GLOBAL.get_or_init(Instance::new)
}

struct State {
    layers: Layers,
    delimiter: String,
    locator: ConfigLocator,
    codecs: CodecRegistry,
    fs: Arc<dyn Filesystem>,
    /// The file found by the last successful `read_in_config`.
    found: Option<PathBuf>,
    observers: Observers,
}

impl State {
    fn new(delimiter: &str, fs: Arc<dyn Filesystem>) -> Self {
        Self {
            layers: Layers::default(),
            delimiter: delimiter.to_string(),
            locator: ConfigLocator::default(),
            codecs: CodecRegistry::default(),
            fs,
            found: None,
            observers: Observers::default(),
        }
    }

    fn key(&self, raw: &str) -> KeyPath {
        KeyPath::with_delimiter(raw, &self.delimiter)
    }

    /// Parses `raw` and follows its alias, if any.
    fn canonical(&self, raw: &str) -> KeyPath {
        self.layers.aliases.resolve(&self.key(raw))
    }

    fn config_path(&self) -> Option<PathBuf> {
        self.locator
            .explicit_file()
            .map(Path::to_path_buf)
            .or_else(|| self.found.clone())
    }
}

/// A layered configuration tree.
///
/// Values are resolved from five tiers, highest precedence first:
/// `set` overrides, explicitly passed flags, environment variables, the
/// configuration file and `set_default` defaults. Keys are
/// case-insensitive.
///
/// # Examples
///
/// ```
/// use strata::Instance;
///
/// let config = Instance::new();
/// config.set_default("ContentDir", "content").unwrap();
/// config.read_config(b"contentdir: site\n").unwrap_err(); // no declared type yet
///
/// config.set_config_type("yaml");
/// config.read_config(b"contentdir: site\n").unwrap();
/// assert_eq!(config.get_string("CONTENTDIR"), "site");
///
/// config.set("contentDir", "override").unwrap();
/// assert_eq!(config.get_string("contentdir"), "override");
/// ```
pub struct Instance {
    state: RwLock<State>,
}

impl Default for Instance {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.read();
        f.debug_struct("Instance")
            .field("delimiter", &state.delimiter)
            .field("locator", &state.locator)
            .field("codecs", &state.codecs)
            .field("observers", &state.observers)
            .finish_non_exhaustive()
    }
}

impl Instance {
    /// Creates an empty instance using the real filesystem.
    #[must_use]
    pub fn new() -> Self {
        Self::with_delimiter(DEFAULT_DELIMITER)
    }

    /// Creates an empty instance whose keys are split on `delimiter`
    /// instead of `.`.
    ///
    /// # Examples
    ///
    /// ```
    /// use strata::Instance;
    ///
    /// let config = Instance::with_delimiter("::");
    /// config.set("mysql::addr", "h").unwrap();
    /// assert_eq!(config.get_string_map_string("MYSQL")["addr"], "h");
    /// ```
    #[must_use]
    pub fn with_delimiter(delimiter: &str) -> Self {
        Self {
            state: RwLock::new(State::new(delimiter, Arc::new(OsFilesystem))),
        }
    }

    /// Replaces the filesystem used to find, read and write config files.
    #[must_use]
    pub fn with_filesystem(self, fs: Arc<dyn Filesystem>) -> Self {
        self.write().fs = fs;
        self
    }

    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `f` under the write lock, then notifies observers of the events
    /// it returned once the lock is released.
    fn try_update(&self, f: impl FnOnce(&mut State) -> Result<Vec<ConfigEvent>>) -> Result<()> {
        let (events, observers) = {
            let mut state = self.write();
            let events = f(&mut state)?;
            (events, state.observers.snapshot())
        };
        dispatch(&observers, &events);
        Ok(())
    }

    fn update(&self, f: impl FnOnce(&mut State) -> Vec<ConfigEvent>) {
        let (events, observers) = {
            let mut state = self.write();
            let events = f(&mut state);
            (events, state.observers.snapshot())
        };
        dispatch(&observers, &events);
    }

    // ----- writes -----

    /// Sets `key` in the override tier, above every other source.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShapeConflict`] if the write would turn an existing
    /// leaf into a parent or the reverse.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> Result<()> {
        self.set_in(Tier::Override, key, value.into())
    }

    /// Sets the default value for `key`, below every other source.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShapeConflict`] like [`Instance::set`].
    pub fn set_default(&self, key: &str, value: impl Into<Value>) -> Result<()> {
        self.set_in(Tier::Default, key, value.into())
    }

    fn set_in(&self, tier: Tier, key: &str, value: Value) -> Result<()> {
        self.try_update(|state| {
            let key = state.canonical(key);
            let store = match tier {
                Tier::Default => &mut state.layers.defaults,
                _ => &mut state.layers.overrides,
            };
            store.set(&key, value)?;
            Ok(vec![ConfigEvent::Set { key, tier }])
        })
    }

    /// Makes `alias` another name for `key`.
    ///
    /// Values and bindings already registered under `alias` move to `key`
    /// unless `key` has its own, or unless another alias still resolves to
    /// `alias`. Registering an alias whose target already redirects back to
    /// it is ignored.
    pub fn register_alias(&self, alias: &str, key: &str) {
        self.update(|state| {
            let alias = state.key(alias);
            let canonical = state.key(key);
            if !state.layers.aliases.register(&alias, &canonical) {
                return Vec::new();
            }
            // Aliases are single hop: keys aliased to `alias` keep reading it
            if state.layers.aliases.is_target(&alias) {
                return vec![ConfigEvent::Alias { alias, canonical }];
            }

            let layers = &mut state.layers;
            for store in [&mut layers.overrides, &mut layers.file, &mut layers.defaults] {
                move_value(store, &alias, &canonical);
            }
            if !layers.flags.contains_key(&canonical) {
                if let Some(binding) = layers.flags.remove(&alias) {
                    layers.flags.insert(canonical.clone(), binding);
                }
            }
            layers.env.move_binding(&alias, &canonical);

            vec![ConfigEvent::Alias { alias, canonical }]
        });
    }

    // ----- environment -----

    /// Sets the prefix used when deriving environment variable names.
    pub fn set_env_prefix(&self, prefix: &str) {
        self.write().layers.env.set_prefix(prefix);
    }

    /// Sets substitutions applied to keys before deriving automatic
    /// environment variable names, e.g. `[(".", "_")]`.
    pub fn set_env_key_replacer(&self, pairs: &[(&str, &str)]) {
        self.write().layers.env.set_key_replacer(pairs);
    }

    /// Makes every key consult its derived environment variable.
    pub fn automatic_env(&self) {
        self.write().layers.env.enable_automatic();
    }

    /// Controls whether variables set to the empty string count as values.
    pub fn allow_empty_env(&self, allow: bool) {
        self.write().layers.env.set_allow_empty(allow);
    }

    /// Binds `key` to environment variables, tried in order. With no names,
    /// the name is derived from the prefix and the key.
    ///
    /// # Examples
    ///
    /// ```
    /// use strata::Instance;
    ///
    /// let config = Instance::new();
    /// config.set_env_prefix("wangjuan");
    /// config.bind_env("id", &[]);
    /// // reads WANGJUAN_ID on every lookup
    /// ```
    pub fn bind_env(&self, key: &str, names: &[&str]) {
        let mut state = self.write();
        let key = state.canonical(key);
        state.layers.env.bind(&key, names);
    }

    // ----- flags -----

    /// Binds `key` to the flag `name` of `flags`.
    pub fn bind_flag(&self, key: &str, flags: Arc<dyn FlagSet>, name: &str) {
        let mut state = self.write();
        let key = state.canonical(key);
        log::debug!("bound {key} to flag --{name}");
        state.layers.flags.insert(
            key,
            FlagBinding {
                set: flags,
                name: name.to_string(),
            },
        );
    }

    /// Binds every flag of `flags` to the key of the same name.
    pub fn bind_flags(&self, flags: &Arc<dyn FlagSet>) {
        for name in flags.names() {
            self.bind_flag(&name, Arc::clone(flags), &name);
        }
    }

    // ----- reads -----

    /// Returns the resolved value of `key`.
    ///
    /// A key holding a mapping returns the subtree merged across all tiers.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        let state = self.read();
        let key = state.key(key);
        state.layers.find(&key).map(|(_, value)| value)
    }

    /// Returns the tier that currently provides `key`.
    #[must_use]
    pub fn source_of(&self, key: &str) -> Option<Tier> {
        let state = self.read();
        let key = state.key(key);
        state.layers.find(&key).map(|(tier, _)| tier)
    }

    /// Returns `true` if any tier defines `key`. A flag left at its own
    /// default does not count.
    #[must_use]
    pub fn is_set(&self, key: &str) -> bool {
        let state = self.read();
        let key = state.key(key);
        state.layers.is_set(&key)
    }

    /// Reads `key` as `T`, reporting values that cannot be converted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Coercion`] if the key is set but its value does not
    /// convert to `T`.
    ///
    /// # Examples
    ///
    /// ```
    /// use strata::Instance;
    ///
    /// let config = Instance::new();
    /// config.set("port", "eighty").unwrap();
    /// assert_eq!(config.get_int("port"), 0);
    /// assert!(config.get_strict::<i64>("port").is_err());
    /// assert_eq!(config.get_strict::<String>("missing").unwrap(), None);
    /// ```
    pub fn get_strict<T: FromValue>(&self, key: &str) -> Result<Option<T>> {
        self.get(key)
            .map(|value| T::convert(key, &value))
            .transpose()
    }

    fn get_with<T: Default>(&self, key: &str, convert: impl FnOnce(&Value) -> Option<T>) -> T {
        self.get(key)
            .as_ref()
            .and_then(convert)
            .unwrap_or_default()
    }

    /// Returns `key` as a string, or `""`.
    #[must_use]
    pub fn get_string(&self, key: &str) -> String {
        self.get_with(key, cast::to_string)
    }

    /// Returns `key` as a boolean, or `false`.
    #[must_use]
    pub fn get_bool(&self, key: &str) -> bool {
        self.get_with(key, cast::to_bool)
    }

    /// Returns `key` as an integer, or `0`.
    #[must_use]
    pub fn get_int(&self, key: &str) -> i64 {
        self.get_with(key, cast::to_i64)
    }

    /// Returns `key` as an `i32`, or `0` (also when out of range).
    #[must_use]
    pub fn get_i32(&self, key: &str) -> i32 {
        self.get_with(key, |v| cast::to_i64(v).and_then(|i| i32::try_from(i).ok()))
    }

    /// Returns `key` as an unsigned integer, or `0` (also when negative).
    #[must_use]
    pub fn get_uint(&self, key: &str) -> u64 {
        self.get_with(key, |v| cast::to_i64(v).and_then(|i| u64::try_from(i).ok()))
    }

    /// Returns `key` as a float, or `0.0`.
    #[must_use]
    pub fn get_float(&self, key: &str) -> f64 {
        self.get_with(key, cast::to_f64)
    }

    /// Returns `key` as a duration, or zero. Bare numbers are seconds.
    #[must_use]
    pub fn get_duration(&self, key: &str) -> Duration {
        self.get_with(key, cast::to_duration)
    }

    /// Returns `key` as a list of strings, or an empty list.
    #[must_use]
    pub fn get_string_slice(&self, key: &str) -> Vec<String> {
        self.get_with(key, cast::to_string_vec)
    }

    /// Returns `key` as a list of integers, or an empty list.
    #[must_use]
    pub fn get_int_slice(&self, key: &str) -> Vec<i64> {
        self.get_with(key, cast::to_i64_vec)
    }

    /// Returns `key` as a mapping, or an empty mapping.
    #[must_use]
    pub fn get_string_map(&self, key: &str) -> Map {
        self.get_with(key, cast::to_map)
    }

    /// Returns `key` as a mapping of strings, or an empty mapping.
    #[must_use]
    pub fn get_string_map_string(&self, key: &str) -> BTreeMap<String, String> {
        self.get_with(key, cast::to_string_map)
    }

    /// Returns `key` as a mapping of string lists, or an empty mapping.
    #[must_use]
    pub fn get_string_map_string_slice(&self, key: &str) -> BTreeMap<String, Vec<String>> {
        self.get_with(key, cast::to_string_vec_map)
    }

    /// Returns every key that resolves to a value, sorted, in folded form.
    #[must_use]
    pub fn all_keys(&self) -> Vec<String> {
        let state = self.read();
        state
            .layers
            .all_keys()
            .iter()
            .map(|key| key.segments().join(&state.delimiter))
            .collect()
    }

    /// Returns the merged view of every key as one nested mapping.
    #[must_use]
    pub fn all_settings(&self) -> Map {
        self.read().layers.all_settings()
    }

    /// Returns a new, independent instance whose file tier is the mapping
    /// found at `key`, or `None` if `key` does not hold a mapping.
    ///
    /// # Examples
    ///
    /// ```
    /// use strata::Instance;
    ///
    /// let config = Instance::new();
    /// config.set("mysql.addr", "h").unwrap();
    /// let mysql = config.sub("Mysql").unwrap();
    /// assert_eq!(mysql.get_string("addr"), "h");
    /// assert!(config.sub("mysql.addr").is_none());
    /// ```
    #[must_use]
    pub fn sub(&self, key: &str) -> Option<Self> {
        let state = self.read();
        let (_, value) = state.layers.find(&state.key(key))?;
        let Value::Map(map) = value else {
            return None;
        };

        let mut child = State::new(&state.delimiter, Arc::clone(&state.fs));
        child.codecs = state.codecs.clone();
        child.layers.file = ValueStore::from_map(map);
        Some(Self {
            state: RwLock::new(child),
        })
    }

    /// Clears every tier, binding, alias and search parameter.
    ///
    /// Registered codecs, the filesystem and observers are kept.
    pub fn reset(&self) {
        self.update(|state| {
            state.layers = Layers::default();
            state.locator = ConfigLocator::default();
            state.found = None;
            vec![ConfigEvent::Reset]
        });
    }

    // ----- unmarshaling -----

    /// Deserializes the whole configuration into `T`.
    ///
    /// Field names match keys case-insensitively; fields without a value
    /// get their zero value and unknown keys are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unmarshal`] if a value cannot be converted to its
    /// field's type.
    pub fn unmarshal<T: DeserializeOwned>(&self) -> Result<T> {
        de::from_value(Value::Map(self.all_settings()))
    }

    /// Deserializes the value at `key` into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unmarshal`] like [`Instance::unmarshal`].
    pub fn unmarshal_key<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        de::from_key(key, self.get(key))
    }

    // ----- config files -----

    /// Sets the base name of the config file (without extension).
    pub fn set_config_name(&self, name: &str) {
        self.write().locator.set_name(name);
    }

    /// Declares the config file format (`yaml`, `json`, ...).
    pub fn set_config_type(&self, config_type: &str) {
        self.write().locator.set_config_type(config_type);
    }

    /// Adds a directory to search for the config file. `~` and `$VAR` are
    /// expanded.
    pub fn add_config_path(&self, dir: &str) {
        self.write().locator.add_path(dir);
    }

    /// Uses `path` as the config file instead of searching.
    pub fn set_config_file(&self, path: &str) {
        self.write().locator.set_file(path);
    }

    /// Returns the config file in use: the explicit one, or the one found
    /// by the last successful read.
    #[must_use]
    pub fn config_file_used(&self) -> Option<PathBuf> {
        self.read().config_path()
    }

    /// Registers a codec for `format`, replacing any existing one.
    pub fn register_codec(&self, format: &str, codec: Arc<dyn Codec>) {
        self.write().codecs.register(format, codec);
    }

    /// Finds, reads and decodes the config file, replacing the file tier.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigFileNotFound`] if no candidate file exists,
    /// [`Error::Decode`] if the file does not parse,
    /// [`Error::UnsupportedConfigType`] for an unknown format, or
    /// [`Error::Io`] if reading fails.
    pub fn read_in_config(&self) -> Result<()> {
        self.load_file(false)
    }

    /// Like [`Instance::read_in_config`], but deep-merges into the existing
    /// file tier.
    ///
    /// # Errors
    ///
    /// Same as [`Instance::read_in_config`].
    pub fn merge_in_config(&self) -> Result<()> {
        self.load_file(true)
    }

    fn load_file(&self, merge: bool) -> Result<()> {
        let (locator, codecs, fs) = {
            let state = self.read();
            (state.locator.clone(), state.codecs.clone(), Arc::clone(&state.fs))
        };

        let ConfigFile { path, format } = locator.locate(fs.as_ref(), &codecs)?;
        log::debug!("using config file {} ({format})", path.display());
        let bytes = fs.read(&path)?;
        let map = codecs.get(&format)?.decode(&bytes)?;

        self.update(|state| {
            replace_file_tier(state, map, merge);
            state.found = Some(path.clone());
            vec![ConfigEvent::Reload {
                path: Some(path),
                merged: merge,
            }]
        });
        Ok(())
    }

    /// Decodes `bytes` with the declared config type, replacing the file
    /// tier.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedConfigType`] if no type is declared or
    /// it has no codec, and [`Error::Decode`] if the content does not parse.
    pub fn read_config(&self, bytes: &[u8]) -> Result<()> {
        self.load_bytes(bytes, false)
    }

    /// Like [`Instance::read_config`], but deep-merges into the existing
    /// file tier.
    ///
    /// # Errors
    ///
    /// Same as [`Instance::read_config`].
    pub fn merge_config(&self, bytes: &[u8]) -> Result<()> {
        self.load_bytes(bytes, true)
    }

    fn load_bytes(&self, bytes: &[u8], merge: bool) -> Result<()> {
        let codec = {
            let state = self.read();
            let format = state.locator.config_type().unwrap_or_default();
            state.codecs.get(format)?
        };
        let map = codec.decode(bytes)?;

        self.update(|state| {
            replace_file_tier(state, map, merge);
            vec![ConfigEvent::Reload {
                path: None,
                merged: merge,
            }]
        });
        Ok(())
    }

    /// Writes the merged configuration to the config file in use,
    /// overwriting it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WriteWithoutKnownPath`] if no config file was set or
    /// read, plus the errors of [`Instance::write_config_as`].
    pub fn write_config(&self) -> Result<()> {
        let path = self.config_file_used().ok_or(Error::WriteWithoutKnownPath)?;
        self.write_to(&path, true)
    }

    /// Like [`Instance::write_config`], but fails if the file exists.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigFileAlreadyExists`] if the file exists, plus
    /// the errors of [`Instance::write_config`].
    pub fn safe_write_config(&self) -> Result<()> {
        let path = self.config_file_used().ok_or(Error::WriteWithoutKnownPath)?;
        self.write_to(&path, false)
    }

    /// Writes the merged configuration to `path`, creating or truncating
    /// it. The format comes from the extension, else the declared type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedConfigType`] if no format applies,
    /// [`Error::Encode`] if serialization fails, or [`Error::Io`].
    pub fn write_config_as(&self, path: &str) -> Result<()> {
        self.write_to(&expand_path(path), true)
    }

    /// Like [`Instance::write_config_as`], but fails if `path` exists.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigFileAlreadyExists`] if `path` exists, plus the
    /// errors of [`Instance::write_config_as`].
    pub fn safe_write_config_as(&self, path: &str) -> Result<()> {
        self.write_to(&expand_path(path), false)
    }

    fn write_to(&self, path: &Path, overwrite: bool) -> Result<()> {
        let (codec, settings, fs) = {
            let state = self.read();
            let format = state.locator.format_for(path, &state.codecs)?;
            let codec = state.codecs.get(&format)?;
            (codec, state.layers.all_settings(), Arc::clone(&state.fs))
        };

        if !overwrite && fs.exists(path) {
            return Err(Error::ConfigFileAlreadyExists {
                path: path.to_path_buf(),
            });
        }

        let bytes = codec.encode(&settings)?;
        log::debug!("writing config file {}", path.display());
        fs.write(path, &bytes, overwrite).map_err(|e| match e.kind() {
            io::ErrorKind::AlreadyExists => Error::ConfigFileAlreadyExists {
                path: path.to_path_buf(),
            },
            _ => Error::Io(e),
        })
    }

    // ----- observers -----

    /// Registers an observer called after every change.
    pub fn subscribe(&self, observer: impl ConfigObserver + 'static) -> SubscriptionId {
        self.write().observers.register(Arc::new(observer))
    }

    /// Removes an observer. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.write().observers.remove(id)
    }
}

fn replace_file_tier(state: &mut State, map: Map, merge: bool) {
    if merge {
        state.layers.file.merge(map);
    } else {
        state.layers.file = ValueStore::from_map(map);
    }
}

fn move_value(store: &mut ValueStore, from: &KeyPath, to: &KeyPath) {
    if store.get(to).is_some() {
        return;
    }
    if let Some(value) = store.remove(from) {
        if let Err(e) = store.set(to, value) {
            log::warn!("could not move {from} to {to}: {e}");
        }
    }
}
