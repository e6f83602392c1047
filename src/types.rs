//! Shared types for the PAPERWATCH monitor.
//!
//! These types form the data model used across all modules.
//! Market data, strategy and engine modules depend on them without
//! depending on each other.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Market data snapshots
// ---------------------------------------------------------------------------

/// Latest price for a ticker together with its trend reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub ticker: String,
    /// Regular-market price.
    pub price: Decimal,
    /// Simple moving average over the configured period of daily closes.
    pub moving_average: Decimal,
}

impl fmt::Display for Quote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: Price ${:.2}, Avg: ${:.2}",
            self.ticker, self.price, self.moving_average,
        )
    }
}

/// Option contract kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptionType {
    Call,
    Put,
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionType::Call => write!(f, "Call"),
            OptionType::Put => write!(f, "Put"),
        }
    }
}

/// A single contract row as delivered by the market data provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawContract {
    pub contract_symbol: String,
    pub option_type: OptionType,
    pub strike: Decimal,
    pub last_price: Decimal,
    /// Missing volume is reported by providers as zero.
    pub volume: u64,
    pub open_interest: u64,
}

/// Snapshot of a ticker's listed call contracts, grouped by expiration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptionChain {
    /// Expirations in provider order (nearest first).
    pub expirations: Vec<NaiveDate>,
    pub calls_by_expiration: HashMap<NaiveDate, Vec<RawContract>>,
}

impl OptionChain {
    /// The nearest listed expiration, if any.
    pub fn nearest_expiration(&self) -> Option<NaiveDate> {
        self.expirations.first().copied()
    }

    /// Calls listed for an expiration (empty if the date has no chain).
    pub fn calls_for(&self, expiration: NaiveDate) -> &[RawContract] {
        self.calls_by_expiration
            .get(&expiration)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

// ---------------------------------------------------------------------------
// Trades
// ---------------------------------------------------------------------------

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// Receipt for a committed paper trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub id: String,
    pub ticker: String,
    pub side: Side,
    pub shares: u64,
    pub price: Decimal,
    pub fee: Decimal,
    /// Ledger cash immediately after this fill.
    pub cash_after: Decimal,
    pub timestamp: DateTime<Utc>,
}

impl fmt::Display for Fill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} x{} @ ${:.2} (fee: ${:.2}, cash: ${:.2}) [{}]",
            self.side, self.ticker, self.shares, self.price, self.fee, self.cash_after, self.id,
        )
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Failures outside the ledger. None of these abort a polling cycle.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("Market data unavailable for {ticker}: {message}")]
    DataUnavailable { ticker: String, message: String },

    #[error("Notification delivery failed: {0}")]
    Delivery(String),

    #[error("Narrative generation failed: {0}")]
    Narrative(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl MonitorError {
    /// Wrap a provider failure for a specific ticker.
    pub fn data_unavailable(ticker: &str, err: &anyhow::Error) -> Self {
        MonitorError::DataUnavailable {
            ticker: ticker.to_string(),
            message: format!("{err:#}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn fill(side: Side) -> Fill {
        Fill {
            id: "paper-1".to_string(),
            ticker: "MSFT".to_string(),
            side,
            shares: 10,
            price: dec!(90),
            fee: dec!(7.95),
            cash_after: dec!(0),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_side_display() {
        assert_eq!(format!("{}", Side::Buy), "BUY");
        assert_eq!(format!("{}", Side::Sell), "SELL");
    }

    #[test]
    fn test_option_type_display() {
        assert_eq!(OptionType::Call.to_string(), "Call");
        assert_eq!(OptionType::Put.to_string(), "Put");
    }

    #[test]
    fn test_quote_display() {
        let q = Quote {
            ticker: "AAPL".to_string(),
            price: dec!(187.45),
            moving_average: dec!(180),
        };
        assert_eq!(q.to_string(), "AAPL: Price $187.45, Avg: $180.00");
    }

    #[test]
    fn test_nearest_expiration_is_first_listed() {
        let chain = OptionChain {
            expirations: vec![date(2026, 1, 16), date(2026, 1, 23)],
            calls_by_expiration: HashMap::new(),
        };
        assert_eq!(chain.nearest_expiration(), Some(date(2026, 1, 16)));
        assert!(OptionChain::default().nearest_expiration().is_none());
    }

    #[test]
    fn test_calls_for_missing_expiration_is_empty() {
        let chain = OptionChain::default();
        assert!(chain.calls_for(date(2026, 1, 16)).is_empty());
    }

    #[test]
    fn test_fill_display() {
        let text = fill(Side::Buy).to_string();
        assert_eq!(text, "BUY MSFT x10 @ $90.00 (fee: $7.95, cash: $0.00) [paper-1]");
    }

    #[test]
    fn test_data_unavailable_message() {
        let err = MonitorError::data_unavailable("GOOGL", &anyhow::anyhow!("HTTP 404"));
        assert_eq!(err.to_string(), "Market data unavailable for GOOGL: HTTP 404");
    }
}
