//! EXP metric engine.
//!
//! Computes, for each timeframe, how much a symbol's price ratio to the
//! reference asset has moved since the window opened:
//!
//! ```text
//! ratio_now  = price_now / reference_now
//! ratio_past = open_symbol / open_reference
//! exp        = (ratio_now / ratio_past - 1) * 100
//! ```
//!
//! Any gateway failure or zero denominator aborts the whole symbol.

use std::sync::Arc;
use tracing::debug;

use crate::exchange::PriceGateway;
use crate::types::{instrument, ExpResult, PricePoint, ScanError, Timeframe};

/// Computes EXP results against a fixed reference asset.
pub struct MetricEngine {
    gateway: Arc<dyn PriceGateway>,
    reference_asset: String,
    quote_currency: String,
}

impl MetricEngine {
    pub fn new(
        gateway: Arc<dyn PriceGateway>,
        reference_asset: impl Into<String>,
        quote_currency: impl Into<String>,
    ) -> Self {
        Self {
            gateway,
            reference_asset: reference_asset.into(),
            quote_currency: quote_currency.into(),
        }
    }

    pub fn reference_asset(&self) -> &str {
        &self.reference_asset
    }

    pub fn quote_currency(&self) -> &str {
        &self.quote_currency
    }

    /// Compute the EXP value of `symbol` for every timeframe.
    ///
    /// The two current prices are fetched once; each timeframe then costs
    /// two open-price requests.
    pub async fn compute_exp(&self, symbol: &str) -> Result<ExpResult, ScanError> {
        let symbol_pair = instrument(symbol, &self.quote_currency);
        let reference_pair = instrument(&self.reference_asset, &self.quote_currency);

        let price_now = self.gateway.current_price(&symbol_pair).await?;
        let reference_now = self.gateway.current_price(&reference_pair).await?;
        let ratio_now = checked_ratio(price_now, reference_now, &reference_pair, "current")?;

        let mut values = [0.0; Timeframe::COUNT];
        for tf in Timeframe::ALL {
            let open_symbol = self.gateway.open_price_at(&symbol_pair, tf).await?;
            let open_reference = self.gateway.open_price_at(&reference_pair, tf).await?;
            let ratio_past = checked_ratio(open_symbol, open_reference, &reference_pair, tf.label())?;

            let value = exp_value(ratio_now, ratio_past).ok_or_else(|| {
                ScanError::DegenerateRatio(format!(
                    "{symbol_pair} {tf}: past ratio {ratio_past} yields no finite EXP"
                ))
            })?;

            debug!(symbol, timeframe = %tf, ratio_now, ratio_past, exp = value, "EXP computed");
            values[tf.index()] = value;
        }

        Ok(ExpResult::from_values(values))
    }
}

/// `numerator / denominator`, rejecting zero or non-finite inputs and results.
fn checked_ratio(
    numerator: PricePoint,
    denominator: PricePoint,
    denominator_name: &str,
    at: &str,
) -> Result<f64, ScanError> {
    let (n, d) = (numerator.value(), denominator.value());
    if d == 0.0 || !d.is_finite() || !n.is_finite() {
        return Err(ScanError::DegenerateRatio(format!(
            "{denominator_name} {at} price is {d}"
        )));
    }
    let ratio = n / d;
    if !ratio.is_finite() {
        return Err(ScanError::DegenerateRatio(format!(
            "{at} ratio {n}/{d} is not finite"
        )));
    }
    Ok(ratio)
}

/// Percentage change from `ratio_past` to `ratio_now`, or `None` when the
/// past ratio is zero or the result is not finite.
fn exp_value(ratio_now: f64, ratio_past: f64) -> Option<f64> {
    if ratio_past == 0.0 {
        return None;
    }
    let value = (ratio_now / ratio_past - 1.0) * 100.0;
    value.is_finite().then_some(value)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
