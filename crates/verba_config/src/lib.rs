//! Parsing and validation of `verba.toml` engine configuration files.
//!
//! This crate reads the configuration file and produces a strongly-typed
//! [`EngineConfig`] controlling the expansion depth guard, memo cache
//! behaviour, and traversal limits. Every field has a default, so an empty
//! file (or no file at all) yields a usable configuration.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str, CONFIG_FILE_NAME};
pub use types::*;
