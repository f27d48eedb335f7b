//! Scan orchestrator.
//!
//! Drives the metric engine over the configured symbol list, one symbol
//! at a time, isolating per-symbol failures so a single bad pair never
//! aborts a pass. Completed reports are pushed to every registered
//! [`ReportSink`].
//!
//! Two modes:
//! - single pass ([`Scanner::run_once`])
//! - auto-refresh ([`Scanner::run_auto`]): passes separated by the
//!   refresh interval, stoppable between passes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tracing::{debug, info, warn};

use crate::engine::metric::MetricEngine;
use crate::presentation::ReportSink;
use crate::types::{ScanError, ScanReport, ScanReportBuilder, Timeframe};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Default pause between successive symbols, to stay under exchange limits.
pub const DEFAULT_SYMBOL_SPACING: Duration = Duration::from_millis(200);

/// Runtime settings for the orchestrator.
#[derive(Debug, Clone)]
pub struct ScanSettings {
    pub symbols: Vec<String>,
    pub sort_timeframe: Timeframe,
    pub symbol_spacing: Duration,
    pub refresh_interval: Duration,
}

// ---------------------------------------------------------------------------
// Scanner
// ---------------------------------------------------------------------------

/// Sequential multi-symbol scanner.
pub struct Scanner {
    engine: MetricEngine,
    settings: ScanSettings,
    sinks: Vec<Arc<dyn ReportSink>>,
    passes: AtomicU64,
}

impl Scanner {
    /// Create a scanner. Fails before any network activity if the symbol
    /// list is empty.
    pub fn new(engine: MetricEngine, settings: ScanSettings) -> Result<Self, ScanError> {
        if settings.symbols.is_empty() {
            return Err(ScanError::Config("symbol list is empty".into()));
        }

        Ok(Self {
            engine,
            settings,
            sinks: Vec::new(),
            passes: AtomicU64::new(0),
        })
    }

    /// Register a sink that receives every completed report.
    pub fn with_sink(mut self, sink: Arc<dyn ReportSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Number of passes completed so far.
    pub fn passes_completed(&self) -> u64 {
        self.passes.load(Ordering::SeqCst)
    }

    /// Run one full pass over the symbol list and return the sealed report.
    ///
    /// Does not publish to sinks; see [`Scanner::run_once`].
    pub async fn scan(&self) -> ScanReport {
        let pass_number = self.passes.load(Ordering::SeqCst) + 1;
        let mut builder = ScanReportBuilder::new(pass_number);

        info!(
            pass = pass_number,
            symbols = self.settings.symbols.len(),
            reference = %self.engine.reference_asset(),
            quote = %self.engine.quote_currency(),
            "Starting scan pass"
        );

        for (i, symbol) in self.settings.symbols.iter().enumerate() {
            if i > 0 && !self.settings.symbol_spacing.is_zero() {
                tokio::time::sleep(self.settings.symbol_spacing).await;
            }

            debug!(symbol = %symbol, "Fetching symbol");
            match self.engine.compute_exp(symbol).await {
                Ok(exp) => builder.push_result(symbol, exp),
                Err(e) => {
                    warn!(
                        symbol = %symbol,
                        kind = %e.kind(),
                        error = %e,
                        "Symbol failed, continuing scan"
                    );
                    builder.push_failure(symbol, &e);
                }
            }
        }

        let report = builder.finish(self.settings.sort_timeframe);
        self.passes.store(pass_number, Ordering::SeqCst);
        info!(%report, "Scan complete");
        report
    }

    /// Single-pass mode: scan, publish, return the report.
    pub async fn run_once(&self) -> ScanReport {
        let report = self.scan().await;
        self.publish(&report).await;
        report
    }

    /// Auto-refresh mode.
    ///
    /// Runs passes until `shutdown` turns `true` (or its sender is dropped).
    /// The signal is honoured before a pass starts and while waiting between
    /// passes; a pass in flight always runs to completion. `trigger` cuts
    /// the current wait short for an immediate pass.
    ///
    /// Returns the last completed report, if any.
    pub async fn run_auto(
        &self,
        mut shutdown: watch::Receiver<bool>,
        trigger: Arc<Notify>,
    ) -> Option<ScanReport> {
        let mut last = None;

        info!(
            interval_secs = self.settings.refresh_interval.as_secs_f64(),
            "Entering auto-refresh loop"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let report = self.run_once().await;
            last = Some(report);

            if *shutdown.borrow() {
                break;
            }

            info!(
                wait_secs = self.settings.refresh_interval.as_secs_f64(),
                "Waiting for next auto-refresh"
            );
            if !self.wait_for_next_pass(&mut shutdown, &trigger).await {
                break;
            }
        }

        info!(passes = self.passes_completed(), "Auto-refresh stopped");
        last
    }

    // -- Internal helpers ------------------------------------------------

    /// Wait out the refresh interval. Returns `false` if the loop should stop.
    async fn wait_for_next_pass(
        &self,
        shutdown: &mut watch::Receiver<bool>,
        trigger: &Notify,
    ) -> bool {
        let sleep = tokio::time::sleep(self.settings.refresh_interval);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                _ = &mut sleep => return true,
                _ = trigger.notified() => {
                    info!("Manual refresh requested");
                    return true;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        return false;
                    }
                }
            }
        }
    }

    async fn publish(&self, report: &ScanReport) {
        for sink in &self.sinks {
            if let Err(e) = sink.publish(report).await {
                warn!(sink = sink.name(), error = %e, "Report sink failed");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
