//! Unmarshaling resolved configuration into typed records.
//!
//! [`from_value`] drives any `serde::Deserialize` type from a [`Value`]
//! tree. Struct fields are matched case-insensitively using the field list
//! serde generates once per type, so `Mysql.Addr` in a record picks up the
//! `mysql.addr` key. Conversion is weak: integers fill string fields,
//! numeric strings fill integer fields, and so on, since environment
//! variables and flags only ever provide strings.
//!
//! Fields without a matching key receive their zero value (`""`, `0`,
//! `false`, empty collections, `None`) instead of failing, and keys that no
//! field asks for are ignored.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};
use std::time::Duration;

use serde::de::value::{StrDeserializer, StringDeserializer};
use serde::de::{
    self, DeserializeOwned, DeserializeSeed, EnumAccess, IntoDeserializer, MapAccess, SeqAccess,
    VariantAccess, Visitor,
};

use crate::cast;
use crate::error::Error;
use crate::value::{Map, Value};

/// Error raised while unmarshaling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeError(String);

impl fmt::Display for DeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for DeError {}

impl de::Error for DeError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Self(msg.to_string())
    }
}

impl From<DeError> for Error {
    fn from(err: DeError) -> Self {
        Self::Unmarshal(err.0)
    }
}

/// Deserializes `T` from a value tree.
///
/// # Errors
///
/// Returns [`Error::Unmarshal`] when a present value cannot be converted to
/// the field's type.
///
/// # Examples
///
/// ```
/// use serde::Deserialize;
/// use strata::{de::from_value, Map, Value};
///
/// #[derive(Deserialize)]
/// struct Mysql {
///     #[serde(rename = "Addr")]
///     addr: String,
///     port: String,
///     timeout: u64,
/// }
///
/// let mut map = Map::new();
/// map.insert("addr".into(), Value::from("h"));
/// map.insert("port".into(), Value::from(3306));
///
/// let mysql: Mysql = from_value(Value::Map(map)).unwrap();
/// assert_eq!(mysql.addr, "h");
/// assert_eq!(mysql.port, "3306");
/// assert_eq!(mysql.timeout, 0);
/// ```
pub fn from_value<T: DeserializeOwned>(value: Value) -> crate::Result<T> {
    T::deserialize(ValueDeserializer::new(Some(value), String::new())).map_err(Error::from)
}

/// Deserializes `T` from the value found at `key`; a missing value yields
/// the zero value of `T`. Errors name paths relative to `key`.
pub(crate) fn from_key<T: DeserializeOwned>(key: &str, value: Option<Value>) -> crate::Result<T> {
    T::deserialize(ValueDeserializer::new(value, key.to_string())).map_err(Error::from)
}

/// Deserializer over an optional value; `None` stands for a missing key and
/// produces zero values.
struct ValueDeserializer {
    value: Option<Value>,
    path: String,
}

impl ValueDeserializer {
    fn new(value: Option<Value>, path: String) -> Self {
        // An explicit null behaves like a missing key
        let value = value.filter(|v| !v.is_null());
        Self { value, path }
    }

    fn invalid(&self, expected: &str) -> DeError {
        let found = self.value.as_ref().map_or("nothing", Value::type_name);
        if self.path.is_empty() {
            DeError(format!("expected {expected}, found {found}"))
        } else {
            DeError(format!("'{}': expected {expected}, found {found}", self.path))
        }
    }

    fn integer(&self) -> Result<i64, DeError> {
        match &self.value {
            None => Ok(0),
            Some(v) => cast::to_i64(v).ok_or_else(|| self.invalid("an integer")),
        }
    }

    fn unsigned(&self) -> Result<u64, DeError> {
        match &self.value {
            None => Ok(0),
            Some(v) => {
                // Values above i64::MAX only survive as strings
                if let Value::String(s) = v {
                    if let Ok(u) = s.trim().parse::<u64>() {
                        return Ok(u);
                    }
                }
                cast::to_i64(v)
                    .and_then(|i| u64::try_from(i).ok())
                    .ok_or_else(|| self.invalid("an unsigned integer"))
            }
        }
    }

    fn float(&self) -> Result<f64, DeError> {
        match &self.value {
            None => Ok(0.0),
            Some(v) => cast::to_f64(v).ok_or_else(|| self.invalid("a float")),
        }
    }

    fn string(&self) -> Result<String, DeError> {
        match &self.value {
            None => Ok(String::new()),
            Some(v) => cast::to_string(v).ok_or_else(|| self.invalid("a string")),
        }
    }
}

macro_rules! deserialize_signed {
    ($($method:ident => $visit:ident: $t:ty),* $(,)?) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
                let i = self.integer()?;
                let narrowed = <$t>::try_from(i).map_err(|_| self.invalid(stringify!($t)))?;
                visitor.$visit(narrowed)
            }
        )*
    };
}

macro_rules! deserialize_unsigned {
    ($($method:ident => $visit:ident: $t:ty),* $(,)?) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
                let u = self.unsigned()?;
                let narrowed = <$t>::try_from(u).map_err(|_| self.invalid(stringify!($t)))?;
                visitor.$visit(narrowed)
            }
        )*
    };
}

impl<'de> de::Deserializer<'de> for ValueDeserializer {
    type Error = DeError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
        let path = self.path;
        match self.value {
            None | Some(Value::Null) => visitor.visit_unit(),
            Some(Value::String(s)) => visitor.visit_string(s),
            Some(Value::Int(i)) => visitor.visit_i64(i),
            Some(Value::Float(x)) => visitor.visit_f64(x),
            Some(Value::Bool(b)) => visitor.visit_bool(b),
            Some(Value::Duration(d)) => {
                visitor.visit_string(humantime::format_duration(d).to_string())
            }
            Some(Value::List(items)) => visitor.visit_seq(ListAccess::new(items, path)),
            Some(Value::Map(map)) => visitor.visit_map(EntryAccess::new(map, path)),
        }
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
        match &self.value {
            None => visitor.visit_bool(false),
            Some(v) => match cast::to_bool(v) {
                Some(b) => visitor.visit_bool(b),
                None => Err(self.invalid("a boolean")),
            },
        }
    }

    deserialize_signed! {
        deserialize_i8 => visit_i8: i8,
        deserialize_i16 => visit_i16: i16,
        deserialize_i32 => visit_i32: i32,
        deserialize_i64 => visit_i64: i64,
    }

    deserialize_unsigned! {
        deserialize_u8 => visit_u8: u8,
        deserialize_u16 => visit_u16: u16,
        deserialize_u32 => visit_u32: u32,
        deserialize_u64 => visit_u64: u64,
    }

    #[allow(clippy::cast_possible_truncation)]
    fn deserialize_f32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
        visitor.visit_f32(self.float()? as f32)
    }

    fn deserialize_f64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
        visitor.visit_f64(self.float()?)
    }

    fn deserialize_char<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
        let s = self.string()?;
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => visitor.visit_char(c),
            (None, _) => visitor.visit_char('\0'),
            _ => Err(self.invalid("a single character")),
        }
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
        visitor.visit_string(self.string()?)
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
        visitor.visit_string(self.string()?)
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
        visitor.visit_byte_buf(self.string()?.into_bytes())
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
        visitor.visit_byte_buf(self.string()?.into_bytes())
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
        if self.value.is_none() {
            visitor.visit_none()
        } else {
            visitor.visit_some(self)
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
        visitor.visit_unit()
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, DeError> {
        visitor.visit_unit()
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, DeError> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
        let items = match &self.value {
            None => Vec::new(),
            Some(Value::List(items)) => items.clone(),
            Some(v @ Value::String(_)) => cast::to_string_vec(v)
                .unwrap_or_default()
                .into_iter()
                .map(Value::String)
                .collect(),
            Some(_) => return Err(self.invalid("a list")),
        };
        visitor.visit_seq(ListAccess::new(items, self.path))
    }

    fn deserialize_tuple<V: Visitor<'de>>(
        self,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, DeError> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, DeError> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
        let map = match &self.value {
            None => Map::new(),
            Some(v) => cast::to_map(v).ok_or_else(|| self.invalid("a mapping"))?,
        };
        visitor.visit_map(EntryAccess::new(map, self.path))
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, DeError> {
        if name == "Duration" && fields == ["secs", "nanos"] {
            return self.deserialize_duration(visitor);
        }

        let map = match &self.value {
            None => Map::new(),
            Some(Value::Map(map)) => map.clone(),
            Some(_) => return Err(self.invalid("a mapping")),
        };
        visitor.visit_map(FieldAccess::new(map, fields, self.path))
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, DeError> {
        match self.value {
            Some(Value::String(s)) => {
                let variant = match_field(&s, variants).unwrap_or(s.as_str()).to_string();
                visitor.visit_enum(IntoDeserializer::<DeError>::into_deserializer(variant))
            }
            Some(Value::Map(map)) if map.len() == 1 => {
                let Some((key, value)) = map.into_iter().next() else {
                    return Err(DeError("empty enum mapping".to_string()));
                };
                let variant = match_field(&key, variants).unwrap_or(key.as_str()).to_string();
                let path = format!("{}.{key}", self.path);
                visitor.visit_enum(VariantDeserializer {
                    variant,
                    value: Some(value),
                    path,
                })
            }
            other => {
                let found = other.as_ref().map_or("nothing", Value::type_name);
                Err(DeError(format!(
                    "'{}': expected a variant name or single-entry mapping, found {found}",
                    self.path
                )))
            }
        }
    }

    fn deserialize_identifier<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
        self.deserialize_string(visitor)
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
        visitor.visit_unit()
    }
}

impl ValueDeserializer {
    /// Feeds `std::time::Duration`'s `{secs, nanos}` representation from a
    /// duration, a human-friendly string or a number of seconds.
    fn deserialize_duration<'de, V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
        let duration = match &self.value {
            None => Duration::ZERO,
            Some(Value::Map(map)) => {
                let secs = map.get("secs").and_then(cast::to_i64).unwrap_or(0);
                let nanos = map.get("nanos").and_then(cast::to_i64).unwrap_or(0);
                Duration::new(
                    u64::try_from(secs).map_err(|_| self.invalid("a duration"))?,
                    u32::try_from(nanos).map_err(|_| self.invalid("a duration"))?,
                )
            }
            Some(v) => cast::to_duration(v).ok_or_else(|| self.invalid("a duration"))?,
        };
        let mut map = Map::new();
        let secs = i64::try_from(duration.as_secs()).unwrap_or(i64::MAX);
        map.insert("secs".to_string(), Value::Int(secs));
        map.insert("nanos".to_string(), Value::Int(i64::from(duration.subsec_nanos())));
        visitor.visit_map(FieldAccess::new(map, &["secs", "nanos"], self.path))
    }
}

type FoldedFields = Arc<[String]>;

/// Lowercased field names, computed once per declared field list.
fn folded_fields(fields: &'static [&'static str]) -> FoldedFields {
    static CACHE: OnceLock<RwLock<HashMap<(usize, usize), FoldedFields>>> = OnceLock::new();
    let cache = CACHE.get_or_init(RwLock::default);
    let id = (fields.as_ptr() as usize, fields.len());

    if let Some(folded) = cache
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&id)
    {
        return Arc::clone(folded);
    }
    let mut cache = cache.write().unwrap_or_else(PoisonError::into_inner);
    let folded = cache
        .entry(id)
        .or_insert_with(|| fields.iter().map(|field| field.to_lowercase()).collect());
    Arc::clone(folded)
}

/// Finds the declared name matching `key` case-insensitively.
fn match_field(key: &str, fields: &'static [&'static str]) -> Option<&'static str> {
    let key = key.to_lowercase();
    let folded = folded_fields(fields);
    fields
        .iter()
        .zip(folded.iter())
        .find_map(|(field, lower)| (*lower == key).then_some(*field))
}

struct ListAccess {
    items: std::vec::IntoIter<Value>,
    index: usize,
    path: String,
}

impl ListAccess {
    fn new(items: Vec<Value>, path: String) -> Self {
        Self {
            items: items.into_iter(),
            index: 0,
            path,
        }
    }
}

impl<'de> SeqAccess<'de> for ListAccess {
    type Error = DeError;

    fn next_element_seed<T: DeserializeSeed<'de>>(
        &mut self,
        seed: T,
    ) -> Result<Option<T::Value>, DeError> {
        let Some(item) = self.items.next() else {
            return Ok(None);
        };
        let path = format!("{}[{}]", self.path, self.index);
        self.index += 1;
        seed.deserialize(ValueDeserializer::new(Some(item), path))
            .map(Some)
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.items.len())
    }
}

/// Map access over every entry of a mapping.
struct EntryAccess {
    entries: std::collections::btree_map::IntoIter<String, Value>,
    pending: Option<(String, Value)>,
    path: String,
}

impl EntryAccess {
    fn new(map: Map, path: String) -> Self {
        Self {
            entries: map.into_iter(),
            pending: None,
            path,
        }
    }
}

impl<'de> MapAccess<'de> for EntryAccess {
    type Error = DeError;

    fn next_key_seed<K: DeserializeSeed<'de>>(
        &mut self,
        seed: K,
    ) -> Result<Option<K::Value>, DeError> {
        let Some((key, value)) = self.entries.next() else {
            return Ok(None);
        };
        let deserializer: StringDeserializer<DeError> = key.clone().into_deserializer();
        self.pending = Some((key, value));
        seed.deserialize(deserializer).map(Some)
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> Result<V::Value, DeError> {
        let (key, value) = self
            .pending
            .take()
            .ok_or_else(|| DeError("value requested before key".to_string()))?;
        let path = if self.path.is_empty() {
            key
        } else {
            format!("{}.{key}", self.path)
        };
        seed.deserialize(ValueDeserializer::new(Some(value), path))
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.entries.len())
    }
}

/// Map access presenting exactly the declared fields of a struct, each
/// paired with the case-insensitively matching entry, if any.
struct FieldAccess {
    fields: std::vec::IntoIter<(&'static str, Option<Value>)>,
    pending: Option<(&'static str, Option<Value>)>,
    path: String,
}

impl FieldAccess {
    fn new(mut map: Map, fields: &'static [&'static str], path: String) -> Self {
        let folded = folded_fields(fields);
        let mut resolved = Vec::with_capacity(fields.len());
        for (field, lower) in fields.iter().zip(folded.iter()) {
            let value = map.remove(lower).or_else(|| {
                let key = map.keys().find(|k| k.to_lowercase() == *lower)?.clone();
                map.remove(&key)
            });
            resolved.push((*field, value));
        }
        Self {
            fields: resolved.into_iter(),
            pending: None,
            path,
        }
    }
}

impl<'de> MapAccess<'de> for FieldAccess {
    type Error = DeError;

    fn next_key_seed<K: DeserializeSeed<'de>>(
        &mut self,
        seed: K,
    ) -> Result<Option<K::Value>, DeError> {
        let Some((field, value)) = self.fields.next() else {
            return Ok(None);
        };
        self.pending = Some((field, value));
        let deserializer: StrDeserializer<'static, DeError> = field.into_deserializer();
        seed.deserialize(deserializer).map(Some)
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> Result<V::Value, DeError> {
        let (field, value) = self
            .pending
            .take()
            .ok_or_else(|| DeError("value requested before key".to_string()))?;
        let path = if self.path.is_empty() {
            field.to_string()
        } else {
            format!("{}.{field}", self.path)
        };
        seed.deserialize(ValueDeserializer::new(value, path))
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.fields.len())
    }
}

struct VariantDeserializer {
    variant: String,
    value: Option<Value>,
    path: String,
}

impl<'de> EnumAccess<'de> for VariantDeserializer {
    type Error = DeError;
    type Variant = Self;

    fn variant_seed<S: DeserializeSeed<'de>>(self, seed: S) -> Result<(S::Value, Self), DeError> {
        let deserializer: StringDeserializer<DeError> = self.variant.clone().into_deserializer();
        let variant = seed.deserialize(deserializer)?;
        Ok((variant, self))
    }
}

impl<'de> VariantAccess<'de> for VariantDeserializer {
    type Error = DeError;

    fn unit_variant(self) -> Result<(), DeError> {
        Ok(())
    }

    fn newtype_variant_seed<T: DeserializeSeed<'de>>(self, seed: T) -> Result<T::Value, DeError> {
        seed.deserialize(ValueDeserializer::new(self.value, self.path))
    }

    fn tuple_variant<V: Visitor<'de>>(self, len: usize, visitor: V) -> Result<V::Value, DeError> {
        let deserializer = ValueDeserializer::new(self.value, self.path);
        de::Deserializer::deserialize_tuple(deserializer, len, visitor)
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, DeError> {
        de::Deserializer::deserialize_struct(
            ValueDeserializer::new(self.value, self.path),
            "",
            fields,
            visitor,
        )
    }
}
