//! Configuration file formats.
//!
//! Parsing is delegated to `serde_yaml` and `serde_json`; a [`Codec`] only
//! converts between bytes and a [`Map`]. The [`CodecRegistry`] maps format
//! names (file extensions) to codecs and can be extended by callers.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::value::{Map, Value};

/// Converts configuration content between bytes and a value tree.
pub trait Codec: Send + Sync {
    /// Parses `bytes` into a mapping.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] if the content is malformed or its top
    /// level is not a mapping.
    fn decode(&self, bytes: &[u8]) -> Result<Map>;

    /// Serializes a mapping.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Encode`] if the mapping cannot be represented.
    fn encode(&self, map: &Map) -> Result<Vec<u8>>;
}

/// YAML documents (`yaml`, `yml`).
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlCodec;

impl Codec for YamlCodec {
    fn decode(&self, bytes: &[u8]) -> Result<Map> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Map::new());
        }
        let value: Value = serde_yaml::from_slice(bytes)?;
        top_level_map(value, "yaml")
    }

    fn encode(&self, map: &Map) -> Result<Vec<u8>> {
        serde_yaml::to_string(map)
            .map(String::into_bytes)
            .map_err(|e| Error::Encode {
                format: "yaml".to_string(),
                message: e.to_string(),
            })
    }
}

/// JSON documents (`json`).
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn decode(&self, bytes: &[u8]) -> Result<Map> {
        let value: Value = serde_json::from_slice(bytes)?;
        top_level_map(value, "json")
    }

    fn encode(&self, map: &Map) -> Result<Vec<u8>> {
        let mut bytes = serde_json::to_vec_pretty(map).map_err(|e| Error::Encode {
            format: "json".to_string(),
            message: e.to_string(),
        })?;
        bytes.push(b'\n');
        Ok(bytes)
    }
}

fn top_level_map(value: Value, format: &str) -> Result<Map> {
    match value {
        Value::Map(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => Err(Error::Decode {
            format: format.to_string(),
            message: format!("expected a mapping at the top level, found a {}", other.type_name()),
        }),
    }
}

/// Registered codecs, keyed by lower-case format name.
///
/// # Examples
///
/// ```
/// use strata::CodecRegistry;
///
/// let registry = CodecRegistry::default();
/// assert!(registry.get("YML").is_ok());
/// assert!(registry.get("ini").is_err());
/// assert_eq!(registry.formats(), ["json", "yaml", "yml"]);
/// ```
#[derive(Clone)]
pub struct CodecRegistry {
    codecs: BTreeMap<String, Arc<dyn Codec>>,
}

impl CodecRegistry {
    /// Creates a registry without any codec.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            codecs: BTreeMap::new(),
        }
    }

    /// Registers `codec` for `format`, replacing any previous one.
    pub fn register(&mut self, format: &str, codec: Arc<dyn Codec>) {
        self.codecs.insert(format.to_lowercase(), codec);
    }

    /// Returns the codec for `format`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedConfigType`] if none is registered.
    pub fn get(&self, format: &str) -> Result<Arc<dyn Codec>> {
        self.codecs
            .get(&format.to_lowercase())
            .cloned()
            .ok_or_else(|| Error::UnsupportedConfigType {
                format: format.to_string(),
            })
    }

    /// Returns `true` if `format` has a codec.
    #[must_use]
    pub fn supports(&self, format: &str) -> bool {
        self.codecs.contains_key(&format.to_lowercase())
    }

    /// Returns every registered format name, sorted.
    #[must_use]
    pub fn formats(&self) -> Vec<String> {
        self.codecs.keys().cloned().collect()
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        let yaml: Arc<dyn Codec> = Arc::new(YamlCodec);
        registry.register("yaml", Arc::clone(&yaml));
        registry.register("yml", yaml);
        registry.register("json", Arc::new(JsonCodec));
        registry
    }
}

impl fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodecRegistry")
            .field("formats", &self.formats())
            .finish()
    }
}
