//! Command-line argument parsing for the Atlas simulation server.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Atlas command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "atlas", about = "Atlas tile-world simulation")]
pub struct CliArgs {
    /// Number of regions along X.
    #[arg(long)]
    pub regions_x: Option<u32>,

    /// Number of regions along Y.
    #[arg(long)]
    pub regions_y: Option<u32>,

    /// Fixed tick rate in Hz.
    #[arg(long)]
    pub tick_rate: Option<u32>,

    /// Treat contract violations as errors.
    #[arg(long)]
    pub strict: Option<bool>,

    /// Number of ticks to run before exiting.
    #[arg(long, default_value_t = 300)]
    pub ticks: u32,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(rx) = args.regions_x {
            self.world.regions_x = rx;
        }
        if let Some(ry) = args.regions_y {
            self.world.regions_y = ry;
        }
        if let Some(rate) = args.tick_rate {
            self.simulation.tick_rate_hz = rate;
        }
        if let Some(strict) = args.strict {
            self.simulation.strict_contracts = Some(strict);
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
