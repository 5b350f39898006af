//! CLI structure and command definitions.
//!
//! This module defines the main CLI structure using clap's derive macros,
//! including global options and subcommands.

use crate::commands::{
    CompletionsCommand, DumpCommand, GetCommand, KeysCommand, WriteCommand,
};
use crate::utils::parse_key_value;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Command-line tool for inspecting layered configuration.
#[derive(Parser)]
#[command(name = "strata")]
#[command(version, about = "Inspect layered configuration", long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Configuration file to load instead of searching for one
    #[arg(long, short = 'c', value_name = "PATH", global = true, env = "STRATA_CONFIG")]
    pub config: Option<PathBuf>,

    /// Prefix of environment variables consulted for every key
    #[arg(long, value_name = "PREFIX", global = true, env = "STRATA_ENV_PREFIX")]
    pub env_prefix: Option<String>,

    /// Override a key (highest precedence); may be repeated
    #[arg(
        long = "set",
        value_name = "KEY=VALUE",
        global = true,
        value_parser = parse_key_value
    )]
    pub overrides: Vec<(String, String)>,

    /// Provide a default for a key (lowest precedence); may be repeated
    #[arg(
        long = "default",
        value_name = "KEY=VALUE",
        global = true,
        value_parser = parse_key_value
    )]
    pub defaults: Vec<(String, String)>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand)]
pub enum Command {
    /// Print the resolved value of a key
    Get(GetCommand),

    /// Print every resolved setting as one document
    Dump(DumpCommand),

    /// List every key that resolves to a value
    Keys(KeysCommand),

    /// Write the resolved settings to a file
    Write(WriteCommand),

    /// Generate shell completion scripts
    Completions(CompletionsCommand),
}
