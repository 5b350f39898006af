//! Main entry point for the strata CLI.
//!
//! This is the command-line interface for the strata configuration engine.
//! It loads configuration from defaults, a config file, the environment,
//! flags and overrides, then provides commands to inspect the result:
//! - `get`: Print the resolved value of a key
//! - `dump`: Print every resolved setting
//! - `keys`: List every key that resolves
//! - `write`: Write the resolved settings to a file

mod cli;
mod commands;
mod error;
mod utils;

use std::sync::Arc;

use clap::{CommandFactory, FromArgMatches};
use cli::Cli;
use error::CliError;
use strata::{ClapFlags, FlagSet};
use utils::GlobalOptions;

fn main() {
    let matches = Cli::command().get_matches();
    let cli = match Cli::from_arg_matches(&matches) {
        Ok(cli) => cli,
        Err(e) => e.exit(),
    };

    // Initialize logging based on verbosity
    let _level = strata::init_logger(cli.verbose, cli.quiet);

    let global = GlobalOptions {
        verbose: cli.verbose,
        quiet: cli.quiet,
        config: cli.config,
        env_prefix: cli.env_prefix,
        overrides: cli.overrides,
        defaults: cli.defaults,
    };
    let flags: Arc<dyn FlagSet> = Arc::new(ClapFlags::new(matches));

    match run(cli.command, &global, flags) {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(e.exit_code());
        }
    }
}

fn run(
    command: cli::Command,
    global: &GlobalOptions,
    flags: Arc<dyn FlagSet>,
) -> Result<(), CliError> {
    if let cli::Command::Completions(cmd) = command {
        return cmd.execute();
    }

    let config = utils::load_instance(global, flags)?;
    match command {
        cli::Command::Get(cmd) => cmd.execute(&config),
        cli::Command::Dump(cmd) => cmd.execute(&config),
        cli::Command::Keys(cmd) => cmd.execute(&config),
        cli::Command::Write(cmd) => cmd.execute(&config),
        cli::Command::Completions(cmd) => cmd.execute(),
    }
}
