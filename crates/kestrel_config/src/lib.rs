//! Parsing and validation of `kestrel.toml` simulation configuration.
//!
//! This crate reads the optional configuration file a host places next to a
//! model and produces a strongly-typed [`SimConfig`] controlling the settle
//! iteration cap and debug write policy.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str, CONFIG_FILE_NAME};
pub use types::*;
