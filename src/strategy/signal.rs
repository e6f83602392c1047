//! Moving-average deviation signal.
//!
//! Classifies a price against its trend reference using symmetric
//! percentage bands: well below the average is a buy, well above is a
//! sell, anything inside the band (boundaries included) is a hold.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::types::Quote;

// ---------------------------------------------------------------------------
// Configuration (defaults, overridden by config.toml at runtime)
// ---------------------------------------------------------------------------

pub struct SignalConfig {
    /// Fraction below the average that triggers a buy.
    pub lower_band_pct: Decimal,
    /// Fraction above the average that triggers a sell.
    pub upper_band_pct: Decimal,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            lower_band_pct: dec!(0.05),
            upper_band_pct: dec!(0.05),
        }
    }
}

// ---------------------------------------------------------------------------
// Signal types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Buy,
    Sell,
    Hold,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Buy => write!(f, "BUY"),
            Action::Sell => write!(f, "SELL"),
            Action::Hold => write!(f, "HOLD"),
        }
    }
}

/// Per-cycle evaluation of one ticker.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeSignal {
    pub ticker: String,
    pub current_price: Decimal,
    pub reference_average: Decimal,
    pub action: Action,
}

impl TradeSignal {
    /// Signed deviation of price from the reference, as a fraction.
    pub fn deviation(&self) -> Decimal {
        if self.reference_average.is_zero() {
            Decimal::ZERO
        } else {
            (self.current_price - self.reference_average) / self.reference_average
        }
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// Classify `current` against `reference` with the given bands.
///
/// Both comparisons are strict, so a price exactly on a band edge holds.
pub fn evaluate(
    current: Decimal,
    reference: Decimal,
    lower_band_pct: Decimal,
    upper_band_pct: Decimal,
) -> Action {
    if current < reference * (Decimal::ONE - lower_band_pct) {
        Action::Buy
    } else if current > reference * (Decimal::ONE + upper_band_pct) {
        Action::Sell
    } else {
        Action::Hold
    }
}

/// Stateless evaluator carrying the configured bands.
pub struct SignalEvaluator {
    config: SignalConfig,
}

impl SignalEvaluator {
    pub fn new(config: SignalConfig) -> Self {
        Self { config }
    }

    pub fn evaluate(&self, current: Decimal, reference: Decimal) -> Action {
        evaluate(
            current,
            reference,
            self.config.lower_band_pct,
            self.config.upper_band_pct,
        )
    }

    /// Evaluate a fetched quote.
    pub fn signal(&self, quote: &Quote) -> TradeSignal {
        let action = self.evaluate(quote.price, quote.moving_average);
        debug!(
            ticker = %quote.ticker,
            price = %quote.price,
            average = %quote.moving_average,
            action = %action,
            "Signal evaluated"
        );
        TradeSignal {
            ticker: quote.ticker.clone(),
            current_price: quote.price,
            reference_average: quote.moving_average,
            action,
        }
    }
}

impl Default for SignalEvaluator {
    fn default() -> Self {
        Self::new(SignalConfig::default())
    }
}

/// Simple moving average of the last `period` closes.
///
/// Returns `None` when fewer than `period` closes are available or
/// `period` is zero.
pub fn simple_moving_average(closes: &[Decimal], period: usize) -> Option<Decimal> {
    if period == 0 || closes.len() < period {
        return None;
    }
    let window = &closes[closes.len() - period..];
    let sum: Decimal = window.iter().copied().sum();
    Some(sum / Decimal::from(period as u64))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
