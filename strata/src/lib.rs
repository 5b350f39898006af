#![deny(missing_docs, unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! # strata
//!
//! Layered configuration resolution.
//!
//! A configuration [`Instance`] answers "what is the value of this key?"
//! from five sources, highest precedence first:
//!
//! 1. overrides set with [`Instance::set`]
//! 2. command-line flags the user passed explicitly ([`FlagSet`])
//! 3. environment variables ([`EnvBinder`])
//! 4. the configuration file (YAML or JSON, see [`CodecRegistry`])
//! 5. defaults set with [`Instance::set_default`]
//!
//! Keys are case-insensitive dotted paths ([`KeyPath`]). Aliases redirect
//! one key to another, environment variables are read live on every lookup,
//! and the merged result can be unmarshaled into any `serde` type.
//!
//! ## Core Types
//!
//! - [`Instance`] and [`global`]: the configuration tree
//! - [`Value`] and [`Map`]: dynamic values
//! - [`Tier`] and [`ValueStore`]: per-source storage
//! - [`Error`] and [`Result`]: error handling types
//! - [`Logger`] and [`LogLevel`]: logging infrastructure
//!
//! ## Examples
//!
//! ```
//! use serde::Deserialize;
//! use strata::Instance;
//!
//! #[derive(Deserialize)]
//! #[allow(non_snake_case)]
//! struct Mysql {
//!     Addr: String,
//!     Port: String,
//! }
//!
//! let config = Instance::new();
//! config.set_default("mysql.port", 3306).unwrap();
//! config.set_config_type("yaml");
//! config.read_config(b"mysql:\n  addr: 127.0.0.1\n").unwrap();
//!
//! let mysql: Mysql = config.unmarshal_key("mysql").unwrap();
//! assert_eq!(mysql.Addr, "127.0.0.1");
//! assert_eq!(mysql.Port, "3306");
//! ```

pub mod alias;
pub mod cast;
pub mod codec;
pub mod de;
pub mod env;
pub mod error;
pub mod events;
pub mod flags;
pub mod fs;
pub mod instance;
pub mod key;
pub mod loader;
pub mod logging;
mod resolver;
pub mod store;
pub mod value;

#[cfg(all(test, feature = "property-tests"))]
mod proptests;

// Re-export key types at crate root for convenience
pub use alias::AliasTable;
pub use cast::FromValue;
pub use codec::{Codec, CodecRegistry, JsonCodec, YamlCodec};
pub use env::EnvBinder;
pub use error::{Error, Result};
pub use events::{ConfigEvent, ConfigObserver, SubscriptionId};
pub use flags::{ClapFlags, FlagSet, FlagState};
pub use fs::{Filesystem, OsFilesystem};
pub use instance::{global, Instance};
pub use key::KeyPath;
pub use loader::{ConfigFile, ConfigLocator};
pub use logging::{init_logger, LogLevel, Logger};
pub use store::{Tier, ValueStore};
pub use value::{Map, Value};
