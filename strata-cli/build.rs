//! Build script for strata-cli.
//!
//! This script generates man pages at build time using clap_mangen.
//! The generated man page is placed in OUT_DIR for inclusion in release builds.
//!
//! Note: We build a minimal command structure here rather than importing from
//! the main crate, since build scripts cannot depend on the crate being built.

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::fs;
use std::path::PathBuf;

/// Build the CLI command structure for man page generation.
///
/// IMPORTANT: Keep this structure synchronized with src/cli.rs
/// When adding/removing/modifying commands, update both files.
fn build_cli() -> Command {
    Command::new("strata")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Inspect layered configuration")
        .long_about(
            "Resolve configuration from defaults, a config file, environment variables, \
             flags and overrides, and print or write the result",
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .help("Enable verbose output")
                .global(true)
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("quiet")
                .long("quiet")
                .help("Suppress non-essential output")
                .global(true)
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .help("Configuration file to load instead of searching for one")
                .value_name("PATH")
                .global(true)
                .env("STRATA_CONFIG"),
        )
        .arg(
            Arg::new("env-prefix")
                .long("env-prefix")
                .help("Prefix of environment variables consulted for every key")
                .value_name("PREFIX")
                .global(true)
                .env("STRATA_ENV_PREFIX"),
        )
        .arg(
            Arg::new("set")
                .long("set")
                .help("Override a key (highest precedence); may be repeated")
                .value_name("KEY=VALUE")
                .global(true)
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("default")
                .long("default")
                .help("Provide a default for a key (lowest precedence); may be repeated")
                .value_name("KEY=VALUE")
                .global(true)
                .action(ArgAction::Append),
        )
        .subcommands(vec![
            Command::new("get")
                .about("Print the resolved value of a key")
                .long_about("Resolve a key through every source and print its value"),
            Command::new("dump")
                .about("Print every resolved setting as one document")
                .long_about("Print the merged settings of every source as YAML or JSON"),
            Command::new("keys")
                .about("List every key that resolves to a value")
                .long_about("List the dotted keys known to any source, sorted"),
            Command::new("write")
                .about("Write the resolved settings to a file")
                .long_about("Write the merged settings to a file in the format of its extension"),
            Command::new("completions")
                .about("Generate shell completion scripts")
                .long_about("Generate shell completion scripts for bash, zsh, fish, or PowerShell"),
        ])
}

fn main() {
    // Generate man pages at build time
    let out_dir = PathBuf::from(std::env::var("OUT_DIR").unwrap());
    let man_dir = out_dir.join("man");
    fs::create_dir_all(&man_dir).unwrap();

    let app = build_cli();
    let man = Man::new(app);
    let mut buffer = Vec::new();
    man.render(&mut buffer).unwrap();

    fs::write(man_dir.join("strata.1"), buffer).unwrap();

    println!("cargo:rerun-if-changed=src/cli.rs");
    println!("cargo:rerun-if-changed=src/commands/");
}
