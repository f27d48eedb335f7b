//! Shared types for the EXP scanner.
//!
//! These types form the data model used across all modules: the fixed
//! timeframe set, price points, per-symbol EXP results and the scan
//! report handed to presentation sinks.

use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

// ---------------------------------------------------------------------------
// Timeframe
// ---------------------------------------------------------------------------

/// A lookback window over which EXP performance is measured.
///
/// The label doubles as the exchange candle interval, so one candle
/// starting at `now - lookback` covers exactly the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "4h")]
    FourHours,
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "30m")]
    ThirtyMinutes,
    #[serde(rename = "15m")]
    FifteenMinutes,
    #[serde(rename = "5m")]
    FiveMinutes,
    #[serde(rename = "1m")]
    OneMinute,
}

impl Timeframe {
    /// Number of timeframes in the fixed set.
    pub const COUNT: usize = 7;

    /// All timeframes in display order (longest first).
    pub const ALL: [Timeframe; Timeframe::COUNT] = [
        Timeframe::OneDay,
        Timeframe::FourHours,
        Timeframe::OneHour,
        Timeframe::ThirtyMinutes,
        Timeframe::FifteenMinutes,
        Timeframe::FiveMinutes,
        Timeframe::OneMinute,
    ];

    /// Short label, also the exchange kline interval.
    pub fn label(&self) -> &'static str {
        match self {
            Timeframe::OneDay => "1d",
            Timeframe::FourHours => "4h",
            Timeframe::OneHour => "1h",
            Timeframe::ThirtyMinutes => "30m",
            Timeframe::FifteenMinutes => "15m",
            Timeframe::FiveMinutes => "5m",
            Timeframe::OneMinute => "1m",
        }
    }

    /// How far back from "now" the window starts.
    pub fn lookback(&self) -> chrono::Duration {
        match self {
            Timeframe::OneDay => chrono::Duration::days(1),
            Timeframe::FourHours => chrono::Duration::hours(4),
            Timeframe::OneHour => chrono::Duration::hours(1),
            Timeframe::ThirtyMinutes => chrono::Duration::minutes(30),
            Timeframe::FifteenMinutes => chrono::Duration::minutes(15),
            Timeframe::FiveMinutes => chrono::Duration::minutes(5),
            Timeframe::OneMinute => chrono::Duration::minutes(1),
        }
    }

    /// Position of this timeframe within [`Timeframe::ALL`].
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Parse a timeframe label (`"1d"`, `"4h"`, ...). Case-insensitive.
impl std::str::FromStr for Timeframe {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Timeframe::ALL
            .into_iter()
            .find(|tf| tf.label() == wanted)
            .ok_or_else(|| ScanError::Config(format!("unknown timeframe: {s:?}")))
    }
}

// ---------------------------------------------------------------------------
// Prices
// ---------------------------------------------------------------------------

/// A single price observation: a current quote or a window's open price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint(f64);

impl PricePoint {
    pub fn new(value: f64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

/// Exchange instrument name for `asset` denominated in `quote` (e.g. `ETHUSDT`).
pub fn instrument(asset: &str, quote: &str) -> String {
    format!("{asset}{quote}")
}

// ---------------------------------------------------------------------------
// EXP results
// ---------------------------------------------------------------------------

/// EXP performance values for one symbol, one slot per timeframe.
///
/// The array shape guarantees every timeframe has a value; there is no
/// way to build a partial result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExpResult {
    values: [f64; Timeframe::COUNT],
}

impl ExpResult {
    /// Build from values ordered like [`Timeframe::ALL`].
    pub fn from_values(values: [f64; Timeframe::COUNT]) -> Self {
        Self { values }
    }

    pub fn get(&self, tf: Timeframe) -> f64 {
        self.values[tf.index()]
    }

    /// `(timeframe, value)` pairs in timeframe display order.
    pub fn iter(&self) -> impl Iterator<Item = (Timeframe, f64)> + '_ {
        Timeframe::ALL.into_iter().map(|tf| (tf, self.get(tf)))
    }
}

/// Serialized as an ordered `{ "1d": .., "4h": .., ... }` map.
impl Serialize for ExpResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Timeframe::COUNT))?;
        for (tf, value) in self.iter() {
            map.serialize_entry(tf.label(), &value)?;
        }
        map.end()
    }
}

/// A symbol that completed its EXP computation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymbolResult {
    pub symbol: String,
    pub exp: ExpResult,
}

/// A symbol whose computation failed during a pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymbolFailure {
    pub symbol: String,
    pub kind: FailureKind,
    pub message: String,
}

impl fmt::Display for SymbolFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]: {}", self.symbol, self.kind, self.message)
    }
}

// ---------------------------------------------------------------------------
// Scan report
// ---------------------------------------------------------------------------

/// Results of one completed scan pass.
///
/// Only [`ScanReportBuilder::finish`] produces a report, so a report
/// observed anywhere outside the orchestrator is always complete.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pass_number: u64,
    started_at: DateTime<Utc>,
    completed_at: DateTime<Utc>,
    sort_timeframe: Timeframe,
    results: Vec<SymbolResult>,
    failures: Vec<SymbolFailure>,
}

impl ScanReport {
    pub fn pass_number(&self) -> u64 {
        self.pass_number
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    pub fn sort_timeframe(&self) -> Timeframe {
        self.sort_timeframe
    }

    /// Successful symbols, sorted by the sort timeframe, descending.
    pub fn results(&self) -> &[SymbolResult] {
        &self.results
    }

    /// Failed symbols, in scan order.
    pub fn failures(&self) -> &[SymbolFailure] {
        &self.failures
    }

    pub fn get(&self, symbol: &str) -> Option<&ExpResult> {
        self.results
            .iter()
            .find(|r| r.symbol == symbol)
            .map(|r| &r.exp)
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

impl fmt::Display for ScanReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Pass #{}: ok={} failed={} sorted_by={} took={}ms",
            self.pass_number,
            self.results.len(),
            self.failures.len(),
            self.sort_timeframe,
            (self.completed_at - self.started_at).num_milliseconds(),
        )
    }
}

/// Incrementally assembles a [`ScanReport`] during one pass.
#[derive(Debug)]
pub struct ScanReportBuilder {
    pass_number: u64,
    started_at: DateTime<Utc>,
    results: Vec<SymbolResult>,
    failures: Vec<SymbolFailure>,
}

impl ScanReportBuilder {
    pub fn new(pass_number: u64) -> Self {
        Self {
            pass_number,
            started_at: Utc::now(),
            results: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn push_result(&mut self, symbol: &str, exp: ExpResult) {
        self.results.push(SymbolResult {
            symbol: symbol.to_string(),
            exp,
        });
    }

    pub fn push_failure(&mut self, symbol: &str, error: &ScanError) {
        self.failures.push(SymbolFailure {
            symbol: symbol.to_string(),
            kind: error.kind(),
            message: error.to_string(),
        });
    }

    /// Seal the report, sorting results by `sort_timeframe` descending.
    /// Ties keep scan order.
    pub fn finish(mut self, sort_timeframe: Timeframe) -> ScanReport {
        self.results
            .sort_by(|a, b| b.exp.get(sort_timeframe).total_cmp(&a.exp.get(sort_timeframe)));

        ScanReport {
            pass_number: self.pass_number,
            started_at: self.started_at,
            completed_at: Utc::now(),
            sort_timeframe,
            results: self.results,
            failures: self.failures,
        }
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Machine-readable failure category, recorded per failed symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    NoQuote,
    NoHistory,
    DegenerateRatio,
    RateLimit,
    Gateway,
    Config,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::NoQuote => "no_quote",
            FailureKind::NoHistory => "no_history",
            FailureKind::DegenerateRatio => "degenerate_ratio",
            FailureKind::RateLimit => "rate_limit",
            FailureKind::Gateway => "gateway",
            FailureKind::Config => "config",
        };
        f.write_str(s)
    }
}

/// Domain-specific error types for the scanner.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScanError {
    #[error("No quote available for {instrument}")]
    NoQuote { instrument: String },

    #[error("No {timeframe} history for {instrument}")]
    NoHistory {
        instrument: String,
        timeframe: Timeframe,
    },

    #[error("Degenerate ratio: {0}")]
    DegenerateRatio(String),

    #[error("Rate limited by exchange while fetching {instrument}")]
    RateLimit { instrument: String },

    #[error("Exchange error ({instrument}): {message}")]
    Gateway { instrument: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ScanError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ScanError::NoQuote { .. } => FailureKind::NoQuote,
            ScanError::NoHistory { .. } => FailureKind::NoHistory,
            ScanError::DegenerateRatio(_) => FailureKind::DegenerateRatio,
            ScanError::RateLimit { .. } => FailureKind::RateLimit,
            ScanError::Gateway { .. } => FailureKind::Gateway,
            ScanError::Config(_) => FailureKind::Config,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
