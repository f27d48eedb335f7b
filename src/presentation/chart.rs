//! Per-symbol mini trend charts.
//!
//! A "trend" here is the symbol's EXP values plotted across the timeframe
//! labels in display order (1d → 1m). The labels are not evenly spaced in
//! time, so the line is a visual summary, not a price history.

use serde::Serialize;

use super::CellStyle;
use crate::types::ScanReport;

const SPARK_LEVELS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// One plotted point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub timeframe: &'static str,
    pub value: f64,
    pub style: CellStyle,
}

/// A symbol's EXP values in timeframe order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendSeries {
    pub symbol: String,
    pub title: String,
    pub points: Vec<TrendPoint>,
}

/// Build one series per successful symbol, in report order.
pub fn trend_series(report: &ScanReport) -> Vec<TrendSeries> {
    report
        .results()
        .iter()
        .map(|row| TrendSeries {
            symbol: row.symbol.clone(),
            title: format!("{} EXP Trend", row.symbol),
            points: row
                .exp
                .iter()
                .map(|(tf, value)| TrendPoint {
                    timeframe: tf.label(),
                    value,
                    style: CellStyle::classify(value),
                })
                .collect(),
        })
        .collect()
}

/// Render a series as a unicode sparkline, scaled to its own min/max.
pub fn sparkline(series: &TrendSeries) -> String {
    let (min, max) = series
        .points
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
            (lo.min(p.value), hi.max(p.value))
        });
    let span = max - min;
    let top = (SPARK_LEVELS.len() - 1) as f64;

    series
        .points
        .iter()
        .map(|p| {
            if span <= f64::EPSILON {
                SPARK_LEVELS[SPARK_LEVELS.len() / 2]
            } else {
                let level = ((p.value - min) / span * top).round() as usize;
                SPARK_LEVELS[level.min(SPARK_LEVELS.len() - 1)]
            }
        })
        .collect()
}
