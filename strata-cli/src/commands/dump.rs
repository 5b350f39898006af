//! Command to print every resolved setting.

use crate::error::CliError;
use crate::utils::{render_settings, OutputFormat};
use clap::Args;
use strata::{Instance, Value};

/// Print every resolved setting as one document.
#[derive(Args)]
pub struct DumpCommand {
    /// Output format
    #[arg(long, short = 'f', value_enum, default_value_t = OutputFormat::Yaml)]
    pub format: OutputFormat,

    /// Only print the subtree under this key
    #[arg(value_name = "KEY")]
    pub key: Option<String>,
}

impl DumpCommand {
    pub fn execute(self, config: &Instance) -> Result<(), CliError> {
        let settings = match self.key {
            Some(ref key) => match config.get(key) {
                Some(Value::Map(map)) => map,
                Some(_) => {
                    return Err(CliError::SemanticFailure(format!(
                        "Key is not a mapping: {key}"
                    )))
                }
                None => return Err(CliError::SemanticFailure(format!("Key not set: {key}"))),
            },
            None => config.all_settings(),
        };

        println!("{}", render_settings(&settings, self.format)?);
        Ok(())
    }
}
