//! Conversions from dynamic [`Value`]s to concrete types.
//!
//! Environment variables and flags always arrive as strings, while decoded
//! files carry native YAML/JSON types, so every conversion accepts both
//! forms. Each `to_*` function returns `None` when the value cannot be
//! converted; the lenient accessors on [`crate::Instance`] turn that into
//! the type's zero value, the strict accessor into [`Error::Coercion`].

use std::collections::BTreeMap;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::value::{Map, Value};

/// Parse a boolean value from a string.
///
/// Accepts: true/t/1/yes/on for true, false/f/0/no/off for false
/// (case-insensitive, surrounding whitespace ignored).
///
/// # Examples
///
/// ```
/// use strata::cast::parse_bool;
///
/// assert_eq!(parse_bool("TRUE"), Some(true));
/// assert_eq!(parse_bool("off"), Some(false));
/// assert_eq!(parse_bool("maybe"), None);
/// ```
#[must_use]
pub fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "true" | "t" | "1" | "yes" | "on" => Some(true),
        "false" | "f" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Converts to a string. Scalars are formatted; lists and mappings are not
/// strings.
#[must_use]
pub fn to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Int(_) | Value::Float(_) | Value::Bool(_) | Value::Duration(_) => {
            Some(value.to_string())
        }
        Value::Null | Value::List(_) | Value::Map(_) => None,
    }
}

/// Converts to a signed integer. Floats are truncated.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn to_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Int(i) => Some(*i),
        Value::Float(x) if x.is_finite() => Some(x.trunc() as i64),
        Value::Bool(b) => Some(i64::from(*b)),
        Value::String(s) => parse_int(s.trim()),
        _ => None,
    }
}

fn parse_int(s: &str) -> Option<i64> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        return i64::from_str_radix(hex, 16).ok();
    }
    s.parse().ok()
}

/// Converts to a float.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Float(x) => Some(*x),
        Value::Int(i) => Some(*i as f64),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Converts to a boolean.
#[must_use]
pub fn to_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Int(i) => Some(*i != 0),
        Value::String(s) => parse_bool(s),
        _ => None,
    }
}

/// Converts to a duration.
///
/// Strings use human-friendly units (`30s`, `1h30m`, `500ms`); a bare number,
/// in a string or as an integer, counts seconds.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use strata::{cast, Value};
///
/// assert_eq!(cast::to_duration(&Value::from("2m")), Some(Duration::from_secs(120)));
/// assert_eq!(cast::to_duration(&Value::from(5)), Some(Duration::from_secs(5)));
/// ```
#[must_use]
pub fn to_duration(value: &Value) -> Option<Duration> {
    match value {
        Value::Duration(d) => Some(*d),
        Value::Int(i) => u64::try_from(*i).ok().map(Duration::from_secs),
        Value::Float(x) => Duration::try_from_secs_f64(*x).ok(),
        Value::String(s) => {
            let s = s.trim();
            match s.parse::<u64>() {
                Ok(secs) => Some(Duration::from_secs(secs)),
                Err(_) => humantime::parse_duration(s).ok(),
            }
        }
        _ => None,
    }
}

/// Converts to a list of strings.
///
/// A string is split on whitespace, matching how list flags and environment
/// variables are usually written.
#[must_use]
pub fn to_string_vec(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::List(items) => items.iter().map(to_string).collect(),
        Value::String(s) => Some(s.split_whitespace().map(str::to_string).collect()),
        _ => None,
    }
}

/// Converts to a list of integers.
#[must_use]
pub fn to_i64_vec(value: &Value) -> Option<Vec<i64>> {
    match value {
        Value::List(items) => items.iter().map(to_i64).collect(),
        Value::String(s) => s.split_whitespace().map(parse_int).collect(),
        _ => None,
    }
}

/// Converts to a mapping.
///
/// A JSON object encoded in a string is accepted so that mappings can be
/// supplied through the environment.
#[must_use]
pub fn to_map(value: &Value) -> Option<Map> {
    match value {
        Value::Map(map) => Some(map.clone()),
        Value::String(s) => match serde_json::from_str::<Value>(s) {
            Ok(Value::Map(map)) => Some(crate::value::fold_map(map)),
            _ => None,
        },
        _ => None,
    }
}

/// Converts to a mapping of strings.
#[must_use]
pub fn to_string_map(value: &Value) -> Option<BTreeMap<String, String>> {
    to_map(value)?
        .iter()
        .map(|(k, v)| to_string(v).map(|s| (k.clone(), s)))
        .collect()
}

/// Converts to a mapping of string lists.
#[must_use]
pub fn to_string_vec_map(value: &Value) -> Option<BTreeMap<String, Vec<String>>> {
    to_map(value)?
        .iter()
        .map(|(k, v)| to_string_vec(v).map(|s| (k.clone(), s)))
        .collect()
}

/// Types that can be read from a [`Value`] by the strict accessor
/// [`crate::Instance::get_strict`].
pub trait FromValue: Sized {
    /// Name of the target type, used in error messages.
    const EXPECTED: &'static str;

    /// Attempt the conversion.
    fn from_value(value: &Value) -> Option<Self>;

    /// Convert, reporting a coercion error for `key` on failure.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Coercion`] when the value has an incompatible type.
    fn convert(key: &str, value: &Value) -> Result<Self> {
        Self::from_value(value).ok_or_else(|| Error::Coercion {
            key: key.to_string(),
            expected: Self::EXPECTED,
        })
    }
}

impl FromValue for Value {
    const EXPECTED: &'static str = "value";

    fn from_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}

impl FromValue for String {
    const EXPECTED: &'static str = "string";

    fn from_value(value: &Value) -> Option<Self> {
        to_string(value)
    }
}

impl FromValue for bool {
    const EXPECTED: &'static str = "boolean";

    fn from_value(value: &Value) -> Option<Self> {
        to_bool(value)
    }
}

impl FromValue for f64 {
    const EXPECTED: &'static str = "float";

    fn from_value(value: &Value) -> Option<Self> {
        to_f64(value)
    }
}

impl FromValue for Duration {
    const EXPECTED: &'static str = "duration";

    fn from_value(value: &Value) -> Option<Self> {
        to_duration(value)
    }
}

impl FromValue for Vec<String> {
    const EXPECTED: &'static str = "string list";

    fn from_value(value: &Value) -> Option<Self> {
        to_string_vec(value)
    }
}

impl FromValue for Map {
    const EXPECTED: &'static str = "mapping";

    fn from_value(value: &Value) -> Option<Self> {
        to_map(value)
    }
}

impl FromValue for BTreeMap<String, String> {
    const EXPECTED: &'static str = "string mapping";

    fn from_value(value: &Value) -> Option<Self> {
        to_string_map(value)
    }
}

macro_rules! impl_from_value_int {
    ($($t:ty),*) => {
        $(
            impl FromValue for $t {
                const EXPECTED: &'static str = stringify!($t);

                fn from_value(value: &Value) -> Option<Self> {
                    to_i64(value).and_then(|i| <$t>::try_from(i).ok())
                }
            }
        )*
    };
}

impl_from_value_int!(i8, i16, i32, i64, u8, u16, u32, u64, usize);
