//! Exchange price gateway.
//!
//! Defines the `PriceGateway` trait the metric engine depends on and
//! provides the Binance public REST implementation. The gateway is
//! read-only and performs exactly one request per call, with no retries.

pub mod binance;

use async_trait::async_trait;

use crate::types::{PricePoint, ScanError, Timeframe};

/// Read-only market data source.
///
/// Constructed once by the application and shared by the engine and
/// orchestrator, so tests can substitute an in-memory implementation.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PriceGateway: Send + Sync {
    /// Current price of `instrument` (e.g. `ETHUSDT`).
    ///
    /// Fails with [`ScanError::NoQuote`] if the exchange has no tradable
    /// quote for the instrument.
    async fn current_price(&self, instrument: &str) -> Result<PricePoint, ScanError>;

    /// Open price of the first sample in `[now - timeframe.lookback(), now]`.
    ///
    /// Fails with [`ScanError::NoHistory`] if the window is empty.
    async fn open_price_at(
        &self,
        instrument: &str,
        timeframe: Timeframe,
    ) -> Result<PricePoint, ScanError>;

    /// Gateway name for logging.
    fn name(&self) -> &'static str;
}
