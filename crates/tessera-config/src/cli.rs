//! Command-line argument parsing for the sync server.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Tessera sync server command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "tessera-server", about = "Tessera world and overlay sync server")]
pub struct CliArgs {
    /// Listen port.
    #[arg(long)]
    pub port: Option<u16>,

    /// Ticks per second.
    #[arg(long)]
    pub tick_rate: Option<u32>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Stop after this many ticks instead of running until interrupted.
    #[arg(long)]
    pub ticks: Option<u64>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(port) = args.port {
            self.network.port = port;
        }
        if let Some(rate) = args.tick_rate {
            self.sync.tick_rate_hz = rate;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}
