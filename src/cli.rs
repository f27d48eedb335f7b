//! Command-line arguments.
//!
//! Flags override values from `config.toml`; see `main` for wiring.

use clap::Parser;
use std::path::PathBuf;

use crate::config::AppConfig;
use crate::types::Timeframe;

/// Parsed command-line arguments.
#[derive(Debug, Parser)]
#[command(version, about = "Scan symbols for EXP performance against a reference asset")]
pub struct Args {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "config.toml")]
    pub config: String,

    /// Comma-separated symbols, e.g. "ETH,SOL,DOGE".
    #[arg(long)]
    pub symbols: Option<String>,

    /// Timeframe to sort by (1d, 4h, 1h, 30m, 15m, 5m, 1m).
    #[arg(long)]
    pub sort: Option<Timeframe>,

    /// Auto-refresh interval in seconds (10–300).
    #[arg(long)]
    pub interval: Option<u64>,

    /// Run a single pass and exit instead of auto-refreshing.
    #[arg(long)]
    pub once: bool,

    /// Write the CSV export here after every pass.
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Do not start the web dashboard.
    #[arg(long)]
    pub no_dashboard: bool,

    /// Disable ANSI colors in the console table.
    #[arg(long)]
    pub no_color: bool,

    /// Emit logs as JSON lines.
    #[arg(long)]
    pub log_json: bool,
}

impl Args {
    /// Apply flag overrides on top of the file configuration.
    pub fn apply(&self, cfg: &mut AppConfig) {
        if let Some(symbols) = &self.symbols {
            cfg.scanner.symbols = symbols.clone();
        }
        if let Some(tf) = self.sort {
            cfg.scanner.sort_timeframe = tf;
        }
        if let Some(secs) = self.interval {
            cfg.scanner.refresh_interval_secs = secs;
        }
        if self.once {
            cfg.scanner.auto_refresh = false;
        }
        if self.no_dashboard {
            cfg.dashboard.enabled = false;
        }
    }
}
