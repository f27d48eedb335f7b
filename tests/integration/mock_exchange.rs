//! Mock exchange for integration testing.
//!
//! Provides a deterministic `PriceGateway` implementation backed by
//! in-memory prices, with per-instrument forced errors and call counters.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use exp_scanner::exchange::PriceGateway;
use exp_scanner::types::{PricePoint, ScanError, Timeframe};

/// Prices for one instrument: the current quote and one open per timeframe.
#[derive(Debug, Clone, Copy)]
pub struct InstrumentPrices {
    pub now: f64,
    pub opens: [f64; Timeframe::COUNT],
}

impl InstrumentPrices {
    /// Same open price for every timeframe.
    pub fn flat(now: f64, open: f64) -> Self {
        Self {
            now,
            opens: [open; Timeframe::COUNT],
        }
    }
}

/// A mock exchange for deterministic testing.
///
/// Unknown instruments behave like delisted pairs (`NoQuote` / `NoHistory`).
pub struct MockExchange {
    prices: Mutex<HashMap<String, InstrumentPrices>>,
    /// Instruments whose history requests fail with this error.
    history_errors: Mutex<HashMap<String, ScanError>>,
    quote_calls: AtomicUsize,
    history_calls: AtomicUsize,
}

impl MockExchange {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            prices: Mutex::new(HashMap::new()),
            history_errors: Mutex::new(HashMap::new()),
            quote_calls: AtomicUsize::new(0),
            history_calls: AtomicUsize::new(0),
        })
    }

    /// Set prices for an instrument (e.g. `"ETHUSDT"`).
    pub fn set(&self, instrument: &str, prices: InstrumentPrices) {
        self.prices
            .lock()
            .unwrap()
            .insert(instrument.to_string(), prices);
    }

    /// Make every history request for `instrument` fail with `error`.
    pub fn fail_history(&self, instrument: &str, error: ScanError) {
        self.history_errors
            .lock()
            .unwrap()
            .insert(instrument.to_string(), error);
    }

    pub fn quote_calls(&self) -> usize {
        self.quote_calls.load(Ordering::SeqCst)
    }

    pub fn history_calls(&self) -> usize {
        self.history_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PriceGateway for MockExchange {
    async fn current_price(&self, instrument: &str) -> Result<PricePoint, ScanError> {
        self.quote_calls.fetch_add(1, Ordering::SeqCst);
        self.prices
            .lock()
            .unwrap()
            .get(instrument)
            .map(|p| PricePoint::new(p.now))
            .ok_or_else(|| ScanError::NoQuote {
                instrument: instrument.to_string(),
            })
    }

    async fn open_price_at(
        &self,
        instrument: &str,
        timeframe: Timeframe,
    ) -> Result<PricePoint, ScanError> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.history_errors.lock().unwrap().get(instrument) {
            return Err(err.clone());
        }
        self.prices
            .lock()
            .unwrap()
            .get(instrument)
            .map(|p| PricePoint::new(p.opens[timeframe.index()]))
            .ok_or_else(|| ScanError::NoHistory {
                instrument: instrument.to_string(),
                timeframe,
            })
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_mock_unknown_instrument() {
    let ex = MockExchange::new();
    let err = ex.current_price("FOOUSDT").await.unwrap_err();
    assert!(matches!(err, ScanError::NoQuote { .. }));
    assert_eq!(ex.quote_calls(), 1);
}

#[tokio::test]
async fn test_mock_forced_history_error() {
    let ex = MockExchange::new();
    ex.set("DOGEUSDT", InstrumentPrices::flat(0.1, 0.1));
    ex.fail_history("DOGEUSDT", ScanError::RateLimit { instrument: "DOGEUSDT".into() });

    assert!(ex.current_price("DOGEUSDT").await.is_ok());
    let err = ex.open_price_at("DOGEUSDT", Timeframe::OneDay).await.unwrap_err();
    assert!(matches!(err, ScanError::RateLimit { .. }));
}
