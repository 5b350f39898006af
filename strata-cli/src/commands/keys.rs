//! Command to list every key that resolves to a value.

use crate::error::CliError;
use clap::Args;
use strata::Instance;

/// List every key that resolves to a value.
#[derive(Args)]
pub struct KeysCommand {
    /// Only list keys starting with this prefix (case-insensitive)
    #[arg(long, value_name = "PREFIX")]
    pub prefix: Option<String>,

    /// Print each key with its resolved value
    #[arg(long)]
    pub values: bool,
}

impl KeysCommand {
    pub fn execute(self, config: &Instance) -> Result<(), CliError> {
        let prefix = self.prefix.as_deref().map(str::to_lowercase);
        for key in config.all_keys() {
            if prefix.as_deref().is_some_and(|p| !key.starts_with(p)) {
                continue;
            }
            if self.values {
                println!("{key} = {}", config.get_string(&key));
            } else {
                println!("{key}");
            }
        }
        Ok(())
    }
}
