//! Configuration loading from TOML.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs. Every
//! field has a default, so a missing file or section falls back to the
//! stock scanner setup (ten majors against BTC, quoted in USDT).

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::engine::scanner::{ScanSettings, DEFAULT_SYMBOL_SPACING};
use crate::types::{ScanError, Timeframe};

/// Bounds for the auto-refresh interval, in seconds.
pub const MIN_REFRESH_SECS: u64 = 10;
pub const MAX_REFRESH_SECS: u64 = 300;

pub const DEFAULT_SYMBOLS: &str = "COMP,ETH,SOL,MATIC,XRP,DOGE,OP,LINK,ADA,AVAX";

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub scanner: ScannerConfig,
    pub exchange: ExchangeConfig,
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ScannerConfig {
    /// Comma-separated symbol list, free text.
    pub symbols: String,
    pub reference_asset: String,
    pub quote_currency: String,
    pub refresh_interval_secs: u64,
    pub sort_timeframe: Timeframe,
    pub auto_refresh: bool,
    /// Pause between successive symbols within a pass.
    pub symbol_spacing_ms: u64,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            symbols: DEFAULT_SYMBOLS.to_string(),
            reference_asset: "BTC".to_string(),
            quote_currency: "USDT".to_string(),
            refresh_interval_secs: 60,
            sort_timeframe: Timeframe::OneDay,
            auto_refresh: true,
            symbol_spacing_ms: DEFAULT_SYMBOL_SPACING.as_millis() as u64,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ExchangeConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            base_url: crate::exchange::binance::DEFAULT_BASE_URL.to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DashboardConfig {
    pub enabled: bool,
    pub port: u16,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 8080,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::from_toml(&contents).with_context(|| format!("Failed to parse config file: {path}"))
    }

    /// Load `path` if it exists, otherwise use defaults.
    pub fn load_or_default(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            Self::load(path)
        } else {
            info!(path, "No config file found, using defaults");
            Ok(Self::default())
        }
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Check everything that must hold before any network activity.
    pub fn validate(&self) -> Result<(), ScanError> {
        let s = &self.scanner;

        let symbols = parse_symbols(&s.symbols);
        if symbols.is_empty() {
            return Err(ScanError::Config("symbol list is empty".into()));
        }
        if let Some(bad) = symbols.iter().find(|sym| !is_asset_code(sym)) {
            return Err(ScanError::Config(format!("invalid symbol {bad:?}")));
        }
        if !(MIN_REFRESH_SECS..=MAX_REFRESH_SECS).contains(&s.refresh_interval_secs) {
            return Err(ScanError::Config(format!(
                "refresh interval {}s outside {MIN_REFRESH_SECS}–{MAX_REFRESH_SECS}s",
                s.refresh_interval_secs
            )));
        }
        if s.reference_asset.trim().is_empty() || s.quote_currency.trim().is_empty() {
            return Err(ScanError::Config(
                "reference asset and quote currency must be set".into(),
            ));
        }
        for asset in [&s.reference_asset, &s.quote_currency] {
            if !is_asset_code(asset.trim()) {
                return Err(ScanError::Config(format!("invalid asset {asset:?}")));
            }
        }
        if self.exchange.timeout_secs == 0 {
            return Err(ScanError::Config("exchange timeout must be positive".into()));
        }
        Ok(())
    }

    /// Validated runtime settings for the scanner.
    pub fn scan_settings(&self) -> Result<ScanSettings, ScanError> {
        self.validate()?;
        Ok(ScanSettings {
            symbols: parse_symbols(&self.scanner.symbols),
            sort_timeframe: self.scanner.sort_timeframe,
            symbol_spacing: Duration::from_millis(self.scanner.symbol_spacing_ms),
            refresh_interval: Duration::from_secs(self.scanner.refresh_interval_secs),
        })
    }

    pub fn reference_asset(&self) -> String {
        self.scanner.reference_asset.trim().to_uppercase()
    }

    pub fn quote_currency(&self) -> String {
        self.scanner.quote_currency.trim().to_uppercase()
    }
}

/// Asset codes go into exchange query strings unencoded.
fn is_asset_code(code: &str) -> bool {
    !code.is_empty() && code.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Split a comma-separated list into trimmed, upper-cased symbols.
/// Empty entries are dropped; duplicates keep their first position.
pub fn parse_symbols(input: &str) -> Vec<String> {
    let mut symbols: Vec<String> = Vec::new();
    for raw in input.split(',') {
        let symbol = raw.trim().to_uppercase();
        if !symbol.is_empty() && !symbols.contains(&symbol) {
            symbols.push(symbol);
        }
    }
    symbols
}
