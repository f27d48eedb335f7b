//! Dashboard API route handlers.
//!
//! All endpoints except the CSV download return JSON. State is shared via
//! `Arc<DashboardState>` and only ever holds completed scan reports.

use anyhow::Result;
use async_trait::async_trait;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{Notify, RwLock};
use tracing::{debug, error, info};

use crate::presentation::chart::{self, TrendSeries};
use crate::presentation::export::{self, EXPORT_FILE_NAME};
use crate::presentation::{CellStyle, ReportSink};
use crate::types::{ScanReport, SymbolFailure, Timeframe};

/// Passes kept in the in-memory pass log.
const MAX_PASS_LOG: usize = 100;

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Shared state accessible by all route handlers.
pub struct DashboardState {
    pub latest: RwLock<Option<ScanReport>>,
    pub pass_log: RwLock<Vec<PassLogEntry>>,
    pub started_at: DateTime<Utc>,
    pub refresh_interval_secs: u64,
    /// Wakes the auto-refresh wait for an immediate pass.
    pub trigger: Arc<Notify>,
}

impl DashboardState {
    pub fn new(refresh_interval_secs: u64, trigger: Arc<Notify>) -> Self {
        Self {
            latest: RwLock::new(None),
            pass_log: RwLock::new(Vec::new()),
            started_at: Utc::now(),
            refresh_interval_secs,
            trigger,
        }
    }
}

pub type AppState = Arc<DashboardState>;

/// Sink that publishes completed reports to the dashboard.
pub struct DashboardSink {
    state: AppState,
}

impl DashboardSink {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl ReportSink for DashboardSink {
    async fn publish(&self, report: &ScanReport) -> Result<()> {
        {
            let mut log = self.state.pass_log.write().await;
            log.push(PassLogEntry::from(report));
            let excess = log.len().saturating_sub(MAX_PASS_LOG);
            log.drain(..excess);
        }
        *self.state.latest.write().await = Some(report.clone());
        debug!(pass = report.pass_number(), "Dashboard updated");
        Ok(())
    }

    fn name(&self) -> &str {
        "dashboard"
    }
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub passes_completed: u64,
    pub last_pass_at: Option<String>,
    pub last_pass_symbols_ok: usize,
    pub last_pass_symbols_failed: usize,
    pub refresh_interval_secs: u64,
    pub uptime_secs: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PassLogEntry {
    pub pass_number: u64,
    pub timestamp: String,
    pub symbols_ok: usize,
    pub symbols_failed: usize,
    pub duration_ms: i64,
}

impl From<&ScanReport> for PassLogEntry {
    fn from(report: &ScanReport) -> Self {
        Self {
            pass_number: report.pass_number(),
            timestamp: report.completed_at().to_rfc3339(),
            symbols_ok: report.results().len(),
            symbols_failed: report.failures().len(),
            duration_ms: (report.completed_at() - report.started_at()).num_milliseconds(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CellView {
    pub value: f64,
    pub style: CellStyle,
    pub color: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct RowView {
    pub symbol: String,
    pub cells: Vec<CellView>,
}

/// Table-ready view of the latest report.
#[derive(Debug, Clone, Serialize)]
pub struct ScanView {
    pub pass_number: u64,
    pub completed_at: String,
    pub sort_timeframe: Timeframe,
    pub timeframes: Vec<&'static str>,
    pub rows: Vec<RowView>,
    pub failures: Vec<SymbolFailure>,
}

impl From<&ScanReport> for ScanView {
    fn from(report: &ScanReport) -> Self {
        Self {
            pass_number: report.pass_number(),
            completed_at: report.completed_at().to_rfc3339(),
            sort_timeframe: report.sort_timeframe(),
            timeframes: Timeframe::ALL.iter().map(|tf| tf.label()).collect(),
            rows: report
                .results()
                .iter()
                .map(|r| RowView {
                    symbol: r.symbol.clone(),
                    cells: r
                        .exp
                        .iter()
                        .map(|(_, value)| {
                            let style = CellStyle::classify(value);
                            CellView {
                                value,
                                style,
                                color: style.css_color(),
                            }
                        })
                        .collect(),
                })
                .collect(),
            failures: report.failures().to_vec(),
        }
    }
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// GET /api/status
pub async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let latest = state.latest.read().await;
    let uptime = (Utc::now() - state.started_at).num_seconds();

    Json(StatusResponse {
        passes_completed: latest.as_ref().map_or(0, |r| r.pass_number()),
        last_pass_at: latest.as_ref().map(|r| r.completed_at().to_rfc3339()),
        last_pass_symbols_ok: latest.as_ref().map_or(0, |r| r.results().len()),
        last_pass_symbols_failed: latest.as_ref().map_or(0, |r| r.failures().len()),
        refresh_interval_secs: state.refresh_interval_secs,
        uptime_secs: uptime,
    })
}

/// GET /api/scan: 204 until the first pass completes.
pub async fn get_scan(State(state): State<AppState>) -> Result<Json<ScanView>, StatusCode> {
    let latest = state.latest.read().await;
    latest
        .as_ref()
        .map(|r| Json(ScanView::from(r)))
        .ok_or(StatusCode::NO_CONTENT)
}

/// GET /api/scan.csv
pub async fn get_scan_csv(State(state): State<AppState>) -> Response {
    let latest = state.latest.read().await;
    let Some(report) = latest.as_ref() else {
        return StatusCode::NO_CONTENT.into_response();
    };

    match export::to_csv(report) {
        Ok(csv) => (
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{EXPORT_FILE_NAME}\""),
                ),
            ],
            csv,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "CSV export failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// GET /api/charts
pub async fn get_charts(State(state): State<AppState>) -> Json<Vec<TrendSeries>> {
    let latest = state.latest.read().await;
    Json(latest.as_ref().map(chart::trend_series).unwrap_or_default())
}

/// GET /api/passes
pub async fn get_passes(State(state): State<AppState>) -> Json<Vec<PassLogEntry>> {
    let log = state.pass_log.read().await;
    Json(log.clone())
}

/// POST /api/refresh: request an immediate pass.
pub async fn post_refresh(State(state): State<AppState>) -> StatusCode {
    info!("Manual refresh requested via dashboard");
    state.trigger.notify_one();
    StatusCode::ACCEPTED
}

/// GET /health
pub async fn health() -> StatusCode {
    StatusCode::OK
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
