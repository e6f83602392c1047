//! Bullish call screening.
//!
//! Selects slightly out-of-the-money calls (strike strictly between the
//! reference price and a percentage ceiling above it) and applies a
//! separate liquidity gate that decides which candidates are worth an
//! alert. Screening and alerting are kept apart so each can be checked
//! on its own.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::types::{OptionChain, OptionType, RawContract};

// ---------------------------------------------------------------------------
// Configuration (defaults, overridden by config.toml at runtime)
// ---------------------------------------------------------------------------

pub struct ScreenerConfig {
    /// Upper strike bound as a fraction above the reference price.
    pub strike_ceiling_pct: Decimal,
    /// Volume must be strictly greater than this to alert.
    pub min_volume: u64,
    /// Open interest must be strictly greater than this to alert.
    pub min_open_interest: u64,
    /// Screen only the nearest expiration (otherwise all, in chain order).
    pub nearest_expiration_only: bool,
}

impl Default for ScreenerConfig {
    fn default() -> Self {
        Self {
            strike_ceiling_pct: dec!(0.05),
            min_volume: 10,
            min_open_interest: 20,
            nearest_expiration_only: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Candidate
// ---------------------------------------------------------------------------

/// A near-the-money call that passed the strike filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionCandidate {
    pub ticker: String,
    pub option_type: OptionType,
    pub strike: Decimal,
    pub expiration: NaiveDate,
    pub last_price: Decimal,
    pub volume: u64,
    pub open_interest: u64,
}

impl fmt::Display for OptionCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} ${:.2} exp {} (last ${:.2}, vol {}, OI {})",
            self.ticker,
            self.option_type,
            self.strike,
            self.expiration,
            self.last_price,
            self.volume,
            self.open_interest,
        )
    }
}

// ---------------------------------------------------------------------------
// Screener
// ---------------------------------------------------------------------------

pub struct OptionsScreener {
    config: ScreenerConfig,
}

impl OptionsScreener {
    pub fn new(config: ScreenerConfig) -> Self {
        Self { config }
    }

    /// Filter one expiration's contracts against `reference_price`.
    ///
    /// Keeps calls with `reference < strike < reference * (1 + ceiling)`,
    /// in input order.
    pub fn screen(
        &self,
        ticker: &str,
        expiration: NaiveDate,
        contracts: &[RawContract],
        reference_price: Decimal,
    ) -> Vec<OptionCandidate> {
        let ceiling = reference_price * (Decimal::ONE + self.config.strike_ceiling_pct);

        contracts
            .iter()
            .filter(|c| c.option_type == OptionType::Call)
            .filter(|c| reference_price < c.strike && c.strike < ceiling)
            .map(|c| OptionCandidate {
                ticker: ticker.to_string(),
                option_type: c.option_type,
                strike: c.strike,
                expiration,
                last_price: c.last_price,
                volume: c.volume,
                open_interest: c.open_interest,
            })
            .collect()
    }

    /// Screen a full chain according to the expiration policy.
    ///
    /// A chain with no expirations yields no candidates.
    pub fn screen_chain(
        &self,
        ticker: &str,
        chain: &OptionChain,
        reference_price: Decimal,
    ) -> Vec<OptionCandidate> {
        let expirations: Vec<NaiveDate> = if self.config.nearest_expiration_only {
            chain.nearest_expiration().into_iter().collect()
        } else {
            chain.expirations.clone()
        };

        let candidates: Vec<OptionCandidate> = expirations
            .into_iter()
            .flat_map(|exp| self.screen(ticker, exp, chain.calls_for(exp), reference_price))
            .collect();

        debug!(
            ticker,
            reference = %reference_price,
            expirations = chain.expirations.len(),
            candidates = candidates.len(),
            "Option chain screened"
        );

        candidates
    }

    /// Liquidity gate: both volume and open interest strictly above their floors.
    pub fn is_alertable(&self, candidate: &OptionCandidate) -> bool {
        candidate.volume > self.config.min_volume
            && candidate.open_interest > self.config.min_open_interest
    }
}

impl Default for OptionsScreener {
    fn default() -> Self {
        Self::new(ScreenerConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
