//! End-to-end scan pipeline: mock exchange → engine → scanner → sinks.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{watch, Notify};

use exp_scanner::engine::metric::MetricEngine;
use exp_scanner::engine::scanner::{ScanSettings, Scanner};
use exp_scanner::presentation::{export, ReportSink};
use exp_scanner::types::{FailureKind, ScanError, ScanReport, Timeframe};

use crate::mock_exchange::{InstrumentPrices, MockExchange};

const SYMBOLS: [&str; 5] = ["COMP", "ETH", "DOGE", "SOL", "OP"];

/// BTC flat at 50k; each altcoin's move differs per timeframe so the sort
/// order depends on the chosen column.
fn seeded_exchange() -> Arc<MockExchange> {
    let ex = MockExchange::new();
    ex.set("BTCUSDT", InstrumentPrices::flat(50_000.0, 50_000.0));
    ex.set(
        "COMPUSDT",
        InstrumentPrices { now: 60.0, opens: [50.0, 55.0, 58.0, 59.0, 60.0, 60.0, 61.0] },
    );
    ex.set(
        "ETHUSDT",
        InstrumentPrices { now: 3000.0, opens: [3100.0, 2900.0, 2950.0, 3000.0, 3000.0, 2990.0, 3001.0] },
    );
    ex.set("DOGEUSDT", InstrumentPrices::flat(0.1, 0.1));
    ex.fail_history(
        "DOGEUSDT",
        ScanError::NoHistory { instrument: "DOGEUSDT".into(), timeframe: Timeframe::OneDay },
    );
    ex.set(
        "SOLUSDT",
        InstrumentPrices { now: 150.0, opens: [120.0, 160.0, 140.0, 149.0, 151.0, 150.0, 150.0] },
    );
    ex.set("OPUSDT", InstrumentPrices::flat(2.0, 2.0));
    ex
}

fn settings(sort: Timeframe) -> ScanSettings {
    ScanSettings {
        symbols: SYMBOLS.iter().map(|s| s.to_string()).collect(),
        sort_timeframe: sort,
        symbol_spacing: Duration::ZERO,
        refresh_interval: Duration::from_secs(3600),
    }
}

fn scanner(ex: Arc<MockExchange>, sort: Timeframe) -> Scanner {
    let engine = MetricEngine::new(ex, "BTC", "USDT");
    Scanner::new(engine, settings(sort)).unwrap()
}

/// Collects reports and stops auto-refresh after `stop_after` passes.
struct CollectingSink {
    reports: Mutex<Vec<ScanReport>>,
    stop_after: usize,
    shutdown: watch::Sender<bool>,
}

#[async_trait]
impl ReportSink for CollectingSink {
    async fn publish(&self, report: &ScanReport) -> Result<()> {
        let mut reports = self.reports.lock().unwrap();
        reports.push(report.clone());
        if reports.len() >= self.stop_after {
            let _ = self.shutdown.send(true);
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "collecting"
    }
}

#[tokio::test]
async fn test_single_pass_isolates_failure_and_sorts() {
    let report = scanner(seeded_exchange(), Timeframe::OneHour).scan().await;

    let symbols: Vec<&str> = report.results().iter().map(|r| r.symbol.as_str()).collect();
    assert_eq!(symbols.len(), 4);
    assert!(!symbols.contains(&"DOGE"));
    assert_eq!(report.failures().len(), 1);
    assert_eq!(report.failures()[0].symbol, "DOGE");
    assert_eq!(report.failures()[0].kind, FailureKind::NoHistory);

    for pair in report.results().windows(2) {
        assert!(pair[0].exp.get(Timeframe::OneHour) >= pair[1].exp.get(Timeframe::OneHour));
    }
}

#[tokio::test]
async fn test_values_match_formula() {
    let report = scanner(seeded_exchange(), Timeframe::OneDay).scan().await;

    // COMP 50 → 60 against a flat BTC: +20% over 1d.
    let comp = report.get("COMP").unwrap();
    assert!((comp.get(Timeframe::OneDay) - 20.0).abs() < 1e-9);
    // OP unchanged: 0% everywhere.
    let op = report.get("OP").unwrap();
    assert!(op.iter().all(|(_, v)| v.abs() < 1e-12));
    // Sorted by 1d: SOL (120 → 150, +25) ahead of COMP (+20).
    assert_eq!(report.results()[0].symbol, "SOL");
    assert_eq!(report.results()[1].symbol, "COMP");
}

#[tokio::test]
async fn test_request_budget_per_symbol() {
    let ex = MockExchange::new();
    ex.set("BTCUSDT", InstrumentPrices::flat(100.0, 100.0));
    ex.set("ETHUSDT", InstrumentPrices::flat(110.0, 100.0));

    let engine = MetricEngine::new(ex.clone(), "BTC", "USDT");
    let result = engine.compute_exp("ETH").await.unwrap();

    assert_eq!(ex.quote_calls(), 2);
    assert_eq!(ex.history_calls(), 2 * Timeframe::COUNT);
    assert!((result.get(Timeframe::OneMinute) - 10.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_zero_reference_open_is_degenerate() {
    let ex = MockExchange::new();
    ex.set("BTCUSDT", InstrumentPrices::flat(100.0, 0.0));
    ex.set("ETHUSDT", InstrumentPrices::flat(110.0, 100.0));

    let engine = MetricEngine::new(ex, "BTC", "USDT");
    let err = engine.compute_exp("ETH").await.unwrap_err();
    assert_eq!(err.kind(), FailureKind::DegenerateRatio);
}

#[tokio::test]
async fn test_csv_export_matches_report() {
    let report = scanner(seeded_exchange(), Timeframe::FourHours).scan().await;
    let parsed = export::from_csv(&export::to_csv(&report).unwrap()).unwrap();

    let mut parsed_symbols: Vec<&str> = parsed.iter().map(|r| r.symbol.as_str()).collect();
    let mut report_symbols: Vec<&str> = report.results().iter().map(|r| r.symbol.as_str()).collect();
    parsed_symbols.sort_unstable();
    report_symbols.sort_unstable();
    assert_eq!(parsed_symbols, report_symbols);

    for row in &parsed {
        let original = report.get(&row.symbol).unwrap();
        for (tf, value) in row.exp.iter() {
            assert!((value - original.get(tf)).abs() < 1e-9);
        }
    }
}

#[tokio::test]
async fn test_auto_refresh_keeps_last_complete_report() {
    let (tx, rx) = watch::channel(false);
    let sink = Arc::new(CollectingSink {
        reports: Mutex::new(Vec::new()),
        stop_after: 3,
        shutdown: tx,
    });
    let trigger = Arc::new(Notify::new());

    let s = Arc::new(scanner(seeded_exchange(), Timeframe::OneDay).with_sink(sink.clone()));

    // Keep waking the wait so passes follow each other without the interval.
    let waker = {
        let trigger = trigger.clone();
        tokio::spawn(async move {
            loop {
                trigger.notify_one();
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
    };

    let last = tokio::time::timeout(Duration::from_secs(10), s.run_auto(rx, trigger))
        .await
        .expect("auto-refresh did not stop")
        .expect("at least one pass completed");
    waker.abort();

    let reports = sink.reports.lock().unwrap();
    let passes: Vec<u64> = reports.iter().map(|r| r.pass_number()).collect();
    assert_eq!(passes, vec![1, 2, 3]);
    assert_eq!(last.pass_number(), 3);
    assert_eq!(last.results().len(), 4);
    assert_eq!(last.failures().len(), 1);
}
