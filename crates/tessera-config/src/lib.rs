//! Configuration for the Tessera sync server.
//!
//! Settings persist to disk as `config.ron`. Command-line arguments override
//! loaded values, and sections missing from an older file fall back to their
//! defaults.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{Config, DebugConfig, NetworkConfig, SyncConfig, default_config_dir};
pub use error::ConfigError;
