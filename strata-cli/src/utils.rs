//! Utility functions for CLI operations.
//!
//! This module builds the configuration instance every command reads from
//! and formats resolved values for output.

use crate::error::CliError;
use clap::ValueEnum;
use std::path::PathBuf;
use std::sync::Arc;
use strata::{FlagSet, Instance, Map, Value};

/// Base name of the config file searched for when `--config` is not given.
pub const CONFIG_NAME: &str = "strata";

/// Directories searched for the config file, in order.
pub const CONFIG_PATHS: &[&str] = &[".", "$HOME/.config/strata"];

/// Global CLI options shared across all commands.
#[derive(Debug, Clone, Default)]
#[allow(dead_code)] // Verbosity is applied by init_logger in main.rs
pub struct GlobalOptions {
    /// Enable verbose output.
    pub verbose: bool,

    /// Suppress non-essential output.
    pub quiet: bool,

    /// Explicit configuration file.
    pub config: Option<PathBuf>,

    /// Environment variable prefix; enables automatic env lookups.
    pub env_prefix: Option<String>,

    /// `--set` pairs, written to the override tier.
    pub overrides: Vec<(String, String)>,

    /// `--default` pairs, written to the default tier.
    pub defaults: Vec<(String, String)>,
}

/// Document formats supported by `dump`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// YAML document
    Yaml,
    /// Pretty-printed JSON
    Json,
}

/// Parse a `KEY=VALUE` pair.
pub fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{s}'"))?;
    if key.trim().is_empty() {
        return Err(format!("empty key in '{s}'"));
    }
    Ok((key.trim().to_string(), value.to_string()))
}

/// Interpret a command-line value.
///
/// Values are read as YAML scalars or flow collections so that `8080`,
/// `true` and `[a, b]` keep their types; anything that does not parse is
/// kept as a plain string.
pub fn parse_value(raw: &str) -> Value {
    match serde_yaml::from_str::<Value>(raw) {
        Ok(Value::Null) | Err(_) => Value::String(raw.to_string()),
        Ok(value) => value,
    }
}

/// Build the configuration instance described by the global options.
///
/// Sources, lowest precedence first: `--default` pairs, the config file,
/// prefixed environment variables, the bound command-line flags and
/// `--set` pairs.
///
/// # Errors
///
/// Fails if an explicit `--config` file cannot be read or decoded, if a
/// discovered config file cannot be decoded, or if a `KEY=VALUE` pair
/// conflicts with the shape of another key.
pub fn load_instance(
    global: &GlobalOptions,
    flags: Arc<dyn FlagSet>,
) -> Result<Instance, CliError> {
    let config = Instance::new();

    for (key, value) in &global.defaults {
        config.set_default(key, parse_value(value))?;
    }

    if let Some(ref path) = global.config {
        let path = path.to_str().ok_or_else(|| {
            CliError::InvalidArguments(format!("non UTF-8 path: {}", path.display()))
        })?;
        config.set_config_file(path);
        config.read_in_config()?;
    } else {
        config.set_config_name(CONFIG_NAME);
        for dir in CONFIG_PATHS {
            config.add_config_path(dir);
        }
        match config.read_in_config() {
            Ok(()) => {}
            Err(e) if e.is_not_found() => log::debug!("{e}"),
            Err(e) => return Err(e.into()),
        }
    }

    if let Some(ref prefix) = global.env_prefix {
        config.set_env_prefix(prefix);
        config.set_env_key_replacer(&[(".", "_"), ("-", "_")]);
        config.automatic_env();
    }

    config.bind_flag("log.verbose", Arc::clone(&flags), "verbose");
    config.bind_flag("log.quiet", flags, "quiet");

    for (key, value) in &global.overrides {
        config.set(key, parse_value(value))?;
    }

    if let Some(path) = config.config_file_used() {
        log::info!("loaded {}", path.display());
    }
    Ok(config)
}

/// Render a single value for `get`.
///
/// Scalars print bare; lists and mappings print as YAML.
pub fn render_value(value: &Value) -> Result<String, CliError> {
    match value {
        Value::List(_) | Value::Map(_) => serde_yaml::to_string(value)
            .map(|s| s.trim_end().to_string())
            .map_err(|e| CliError::Config(e.to_string())),
        scalar => Ok(scalar.to_string()),
    }
}

/// Render every setting as one document.
pub fn render_settings(settings: &Map, format: OutputFormat) -> Result<String, CliError> {
    let rendered = match format {
        OutputFormat::Yaml => serde_yaml::to_string(settings).map_err(|e| e.to_string()),
        OutputFormat::Json => serde_json::to_string_pretty(settings).map_err(|e| e.to_string()),
    };
    rendered
        .map(|s| s.trim_end().to_string())
        .map_err(CliError::Config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("mysql.port=3306").unwrap(),
            ("mysql.port".to_string(), "3306".to_string())
        );
        assert_eq!(
            parse_key_value("url=a=b").unwrap(),
            ("url".to_string(), "a=b".to_string())
        );
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=x").is_err());
    }

    #[test]
    fn test_parse_value_keeps_types() {
        assert_eq!(parse_value("8080"), Value::Int(8080));
        assert_eq!(parse_value("true"), Value::Bool(true));
        assert_eq!(
            parse_value("[a, b]"),
            Value::List(vec![Value::from("a"), Value::from("b")])
        );
        assert_eq!(parse_value("127.0.0.1"), Value::from("127.0.0.1"));
        assert_eq!(parse_value(""), Value::from(""));
    }

    #[test]
    fn test_render_value() {
        assert_eq!(render_value(&Value::from("h")).unwrap(), "h");
        assert_eq!(render_value(&Value::Int(3)).unwrap(), "3");
        let list = Value::List(vec![Value::from("a"), Value::from("b")]);
        assert_eq!(render_value(&list).unwrap(), "- a\n- b");
    }

    #[test]
    fn test_render_settings_json() {
        let mut settings = Map::new();
        settings.insert("port".to_string(), Value::Int(80));
        assert_eq!(
            render_settings(&settings, OutputFormat::Json).unwrap(),
            "{\n  \"port\": 80\n}"
        );
    }
}
