//! Presentation of completed scan reports.
//!
//! The orchestrator pushes every completed [`ScanReport`] into one or more
//! [`ReportSink`]s. This module provides the console sink plus the shared
//! rendering helpers used by both the console and the web dashboard:
//! cell classification, CSV export and per-symbol trend series.

pub mod chart;
pub mod export;
pub mod table;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

use crate::types::ScanReport;

/// Absolute EXP percentage beyond which a cell is highlighted.
pub const HIGHLIGHT_THRESHOLD: f64 = 5.0;

/// Receiver of completed scan reports.
#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn publish(&self, report: &ScanReport) -> Result<()>;

    /// Sink name for logging.
    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Cell classification
// ---------------------------------------------------------------------------

/// Visual class of a table cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CellStyle {
    StrongPositive,
    StrongNegative,
    Neutral,
}

impl CellStyle {
    /// `> 5` strong-positive, `< -5` strong-negative, otherwise neutral.
    pub fn classify(value: f64) -> Self {
        if value > HIGHLIGHT_THRESHOLD {
            CellStyle::StrongPositive
        } else if value < -HIGHLIGHT_THRESHOLD {
            CellStyle::StrongNegative
        } else {
            CellStyle::Neutral
        }
    }

    /// CSS color used by the dashboard.
    pub fn css_color(&self) -> &'static str {
        match self {
            CellStyle::StrongPositive => "lime",
            CellStyle::StrongNegative => "red",
            CellStyle::Neutral => "gray",
        }
    }

    /// ANSI SGR sequence used by the console table (bold + color).
    pub fn ansi_prefix(&self) -> &'static str {
        match self {
            CellStyle::StrongPositive => "\x1b[1;92m",
            CellStyle::StrongNegative => "\x1b[1;91m",
            CellStyle::Neutral => "\x1b[1;90m",
        }
    }
}

// ---------------------------------------------------------------------------
// Console sink
// ---------------------------------------------------------------------------

/// Prints each report as a colored table with warnings and sparklines,
/// optionally writing the CSV export after every pass.
pub struct ConsoleSink {
    color: bool,
    export_path: Option<PathBuf>,
}

impl ConsoleSink {
    pub fn new(color: bool, export_path: Option<PathBuf>) -> Self {
        Self { color, export_path }
    }

    /// Full console rendering of a report.
    pub fn render(&self, report: &ScanReport) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "EXP scan #{} at {} (sorted by {})\n",
            report.pass_number(),
            report.completed_at().format("%Y-%m-%d %H:%M:%S UTC"),
            report.sort_timeframe(),
        ));
        out.push_str(&table::render(report, self.color));
        out.push('\n');

        for failure in report.failures() {
            out.push_str(&format!("warning: error fetching {failure}\n"));
        }

        if !report.is_empty() {
            out.push_str("Mini charts (EXP across timeframes, 1d → 1m)\n");
            for series in chart::trend_series(report) {
                out.push_str(&format!(
                    "  {:<10} {}\n",
                    series.symbol,
                    chart::sparkline(&series)
                ));
            }
        }
        out
    }
}

#[async_trait]
impl ReportSink for ConsoleSink {
    async fn publish(&self, report: &ScanReport) -> Result<()> {
        println!("{}", self.render(report));

        if let Some(path) = &self.export_path {
            let csv = export::to_csv(report)?;
            tokio::fs::write(path, csv)
                .await
                .with_context(|| format!("Failed to write CSV export to {}", path.display()))?;
            info!(path = %path.display(), rows = report.results().len(), "CSV export written");
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "console"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
