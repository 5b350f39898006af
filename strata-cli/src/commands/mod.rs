//! CLI command implementations.
//!
//! This module contains the implementations of all CLI commands:
//! - `get`: Print the resolved value of a key
//! - `dump`: Print every resolved setting
//! - `keys`: List every key that resolves
//! - `write`: Write the resolved settings to a file
//! - `completions`: Generate shell completion scripts

pub mod completions;
pub mod dump;
pub mod get;
pub mod keys;
pub mod write;

pub use completions::CompletionsCommand;
pub use dump::DumpCommand;
pub use get::GetCommand;
pub use keys::KeysCommand;
pub use write::WriteCommand;
