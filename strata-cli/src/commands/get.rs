//! Command to print the resolved value of one key.

use crate::error::CliError;
use crate::utils::render_value;
use clap::{Args, ValueEnum};
use std::time::Duration;
use strata::{FromValue, Instance, Map, Value};

/// Type a value is converted to before printing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ValueType {
    /// Print the value as stored
    Auto,
    /// Text
    String,
    /// true or false
    Bool,
    /// Signed integer
    Int,
    /// Floating point number
    Float,
    /// Time span such as `1m30s`
    Duration,
    /// List of strings
    List,
    /// Mapping
    Map,
}

/// Print the resolved value of a key.
#[derive(Args)]
pub struct GetCommand {
    /// Key to look up (dotted, case-insensitive)
    #[arg(value_name = "KEY")]
    pub key: String,

    /// Convert the value before printing; fails if it cannot be converted
    #[arg(long = "type", short = 't', value_enum, default_value_t = ValueType::Auto)]
    pub value_type: ValueType,

    /// Also print which source supplied the value
    #[arg(long)]
    pub show_source: bool,
}

impl GetCommand {
    pub fn execute(self, config: &Instance) -> Result<(), CliError> {
        let value = match self.value_type {
            ValueType::Auto => strict::<Value>(config, &self.key)?,
            ValueType::String => Value::String(strict(config, &self.key)?),
            ValueType::Bool => Value::Bool(strict(config, &self.key)?),
            ValueType::Int => Value::Int(strict(config, &self.key)?),
            ValueType::Float => Value::Float(strict(config, &self.key)?),
            ValueType::Duration => Value::Duration(strict::<Duration>(config, &self.key)?),
            ValueType::List => Value::from(strict::<Vec<String>>(config, &self.key)?),
            ValueType::Map => Value::Map(strict::<Map>(config, &self.key)?),
        };

        println!("{}", render_value(&value)?);
        if self.show_source {
            if let Some(tier) = config.source_of(&self.key) {
                eprintln!("source: {tier}");
            }
        }
        Ok(())
    }
}

fn strict<T: FromValue>(config: &Instance, key: &str) -> Result<T, CliError> {
    config
        .get_strict(key)?
        .ok_or_else(|| CliError::SemanticFailure(format!("Key not set: {key}")))
}
