//! Command to write the resolved settings to a file.

use crate::error::CliError;
use clap::Args;
use std::path::PathBuf;
use strata::Instance;

/// Write the resolved settings to a file.
#[derive(Args)]
pub struct WriteCommand {
    /// Destination file; the format follows its extension
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Refuse to overwrite an existing file
    #[arg(long)]
    pub safe: bool,
}

impl WriteCommand {
    pub fn execute(self, config: &Instance) -> Result<(), CliError> {
        let path = self.path.to_str().ok_or_else(|| {
            CliError::InvalidArguments(format!("non UTF-8 path: {}", self.path.display()))
        })?;

        if self.safe {
            config.safe_write_config_as(path)?;
        } else {
            config.write_config_as(path)?;
        }

        log::info!("wrote {}", self.path.display());
        Ok(())
    }
}
