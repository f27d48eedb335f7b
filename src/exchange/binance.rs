//! Binance public market-data integration.
//!
//! Uses two unauthenticated REST endpoints:
//! - `GET /api/v3/ticker/price?symbol=` for the current quote
//! - `GET /api/v3/klines?symbol=&interval=&startTime=&limit=1` for the
//!   first candle of a lookback window
//!
//! API docs: https://developers.binance.com/docs/binance-spot-api-docs/rest-api
//! Rate limit: request-weight based; HTTP 429 on excess, 418 once banned.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::de::IgnoredAny;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use super::PriceGateway;
use crate::types::{PricePoint, ScanError, Timeframe};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

pub const DEFAULT_BASE_URL: &str = "https://api.binance.com";
const GATEWAY_NAME: &str = "binance";

/// Binance error code for an unknown or delisted symbol.
const INVALID_SYMBOL_CODE: i64 = -1121;

/// Longest exchange-supplied message kept in a failure.
const MAX_ERROR_MESSAGE_CHARS: usize = 200;

// ---------------------------------------------------------------------------
// API response types (Binance JSON → Rust)
// ---------------------------------------------------------------------------

/// `/api/v3/ticker/price` response. Prices arrive as decimal strings.
#[derive(Debug, Deserialize)]
struct TickerPrice {
    #[allow(dead_code)]
    symbol: String,
    price: String,
}

/// Error body returned alongside 4xx statuses.
#[derive(Debug, Deserialize)]
struct ApiError {
    code: i64,
    msg: String,
}

/// One `/api/v3/klines` row: open time, OHLCV strings, then fields we skip.
#[derive(Debug, Deserialize)]
struct RawKline(
    i64,
    String,
    IgnoredAny,
    IgnoredAny,
    IgnoredAny,
    IgnoredAny,
    IgnoredAny,
    IgnoredAny,
    IgnoredAny,
    IgnoredAny,
    IgnoredAny,
    IgnoredAny,
);

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Binance spot market-data client.
pub struct BinanceClient {
    http: Client,
    base_url: String,
}

impl BinanceClient {
    /// Create a new client against `base_url` (defaults to the public API).
    ///
    /// `timeout` bounds every request, so a hung call cannot stall a scan
    /// pass indefinitely.
    pub fn new(base_url: Option<&str>, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent("exp-scanner/0.1.0")
            .build()
            .context("Failed to build HTTP client for Binance")?;

        let base_url = base_url
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
            .to_string();

        Ok(Self { http, base_url })
    }

    // -- URL builders ----------------------------------------------------

    fn ticker_url(&self, instrument: &str) -> String {
        format!("{}/api/v3/ticker/price?symbol={instrument}", self.base_url)
    }

    fn klines_url(&self, instrument: &str, timeframe: Timeframe, now: DateTime<Utc>) -> String {
        let start = (now - timeframe.lookback()).timestamp_millis();
        format!(
            "{}/api/v3/klines?symbol={instrument}&interval={}&startTime={start}&limit=1",
            self.base_url,
            timeframe.label(),
        )
    }

    // -- Internal helpers ------------------------------------------------

    /// Issue a GET and return the body of a successful response.
    ///
    /// `missing` builds the error used when Binance rejects the symbol.
    async fn get_body(
        &self,
        url: &str,
        instrument: &str,
        missing: impl FnOnce() -> ScanError,
    ) -> Result<String, ScanError> {
        debug!(url = %url, "Fetching Binance market data");

        let resp = self.http.get(url).send().await.map_err(|e| ScanError::Gateway {
            instrument: instrument.to_string(),
            message: format!("request failed: {e}"),
        })?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| ScanError::Gateway {
            instrument: instrument.to_string(),
            message: format!("failed to read response body: {e}"),
        })?;

        if status.is_success() {
            return Ok(body);
        }

        Err(classify_failure(status, &body, instrument, missing))
    }
}

/// Map a non-success HTTP response to a domain error.
fn classify_failure(
    status: StatusCode,
    body: &str,
    instrument: &str,
    missing: impl FnOnce() -> ScanError,
) -> ScanError {
    if status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::IM_A_TEAPOT {
        warn!(instrument, status = status.as_u16(), "Binance rate limit hit");
        return ScanError::RateLimit {
            instrument: instrument.to_string(),
        };
    }

    match serde_json::from_str::<ApiError>(body) {
        Ok(err) if err.code == INVALID_SYMBOL_CODE => missing(),
        Ok(err) => ScanError::Gateway {
            instrument: instrument.to_string(),
            message: format!(
                "Binance API error {status} ({}): {}",
                err.code,
                truncate_message(&err.msg)
            ),
        },
        // Proxy error pages and other non-JSON bodies are reported by status only.
        Err(_) => ScanError::Gateway {
            instrument: instrument.to_string(),
            message: format!("Binance API error {status}"),
        },
    }
}

/// Cap exchange-supplied text at `MAX_ERROR_MESSAGE_CHARS`.
fn truncate_message(msg: &str) -> String {
    match msg.char_indices().nth(MAX_ERROR_MESSAGE_CHARS) {
        Some((idx, _)) => format!("{}…", &msg[..idx]),
        None => msg.to_string(),
    }
}

fn parse_price(raw: &str, instrument: &str) -> Result<PricePoint, ScanError> {
    raw.parse::<f64>()
        .ok()
        .filter(|p| p.is_finite())
        .map(PricePoint::new)
        .ok_or_else(|| ScanError::Gateway {
            instrument: instrument.to_string(),
            message: format!("unparseable price {raw:?}"),
        })
}

fn parse_ticker(body: &str, instrument: &str) -> Result<PricePoint, ScanError> {
    let ticker: TickerPrice = serde_json::from_str(body).map_err(|e| ScanError::Gateway {
        instrument: instrument.to_string(),
        message: format!("failed to parse ticker response: {e}"),
    })?;
    parse_price(&ticker.price, instrument)
}

fn parse_first_open(
    body: &str,
    instrument: &str,
    timeframe: Timeframe,
) -> Result<PricePoint, ScanError> {
    let klines: Vec<RawKline> = serde_json::from_str(body).map_err(|e| ScanError::Gateway {
        instrument: instrument.to_string(),
        message: format!("failed to parse klines response: {e}"),
    })?;

    let first = klines.into_iter().next().ok_or_else(|| ScanError::NoHistory {
        instrument: instrument.to_string(),
        timeframe,
    })?;

    debug!(instrument, timeframe = %timeframe, open_time = first.0, "Window open located");
    parse_price(&first.1, instrument)
}

// ---------------------------------------------------------------------------
// PriceGateway trait implementation
// ---------------------------------------------------------------------------

#[async_trait]
impl PriceGateway for BinanceClient {
    async fn current_price(&self, instrument: &str) -> Result<PricePoint, ScanError> {
        let url = self.ticker_url(instrument);
        let body = self
            .get_body(&url, instrument, || ScanError::NoQuote {
                instrument: instrument.to_string(),
            })
            .await?;
        parse_ticker(&body, instrument)
    }

    async fn open_price_at(
        &self,
        instrument: &str,
        timeframe: Timeframe,
    ) -> Result<PricePoint, ScanError> {
        let url = self.klines_url(instrument, timeframe, Utc::now());
        let body = self
            .get_body(&url, instrument, || ScanError::NoHistory {
                instrument: instrument.to_string(),
                timeframe,
            })
            .await?;
        parse_first_open(&body, instrument, timeframe)
    }

    fn name(&self) -> &'static str {
        GATEWAY_NAME
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
