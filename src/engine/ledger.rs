//! Ledger: cash and holdings bookkeeping for simulated trades.
//!
//! Applies paper buys and sells with a flat per-trade fee and
//! volume-weighted average cost. Every operation validates first and
//! mutates second, so a rejected trade leaves cash and holdings untouched.

use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::types::{Fill, Side};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Expected business-rule rejections. The ledger is unchanged when one is returned.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LedgerError {
    #[error("Insufficient cash: need ${needed:.2}, have ${available:.2}")]
    InsufficientCash { needed: Decimal, available: Decimal },

    #[error("Insufficient shares of {ticker}: requested {requested}, held {held}")]
    InsufficientShares {
        ticker: String,
        requested: u64,
        held: u64,
    },

    #[error("Invalid order: {0}")]
    InvalidOrder(String),
}

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// An open holding. Always has `shares > 0` while stored in the ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub shares: u64,
    pub avg_price: Decimal,
}

impl Position {
    /// Total cost basis (shares × average price).
    pub fn cost_basis(&self) -> Decimal {
        Decimal::from(self.shares) * self.avg_price
    }
}

// ---------------------------------------------------------------------------
// Valuation
// ---------------------------------------------------------------------------

/// Mark-to-market result. Tickers without a price contribute zero.
#[derive(Debug, Clone, PartialEq)]
pub struct Valuation {
    pub cash: Decimal,
    pub holdings_value: Decimal,
    pub total_value: Decimal,
    /// Held tickers the price lookup could not resolve.
    pub unpriced: Vec<String>,
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// The paper portfolio: cash, holdings and the fee schedule.
#[derive(Debug, Clone)]
pub struct Ledger {
    cash: Decimal,
    holdings: BTreeMap<String, Position>,
    transaction_fee: Decimal,
    fills: Vec<Fill>,
}

impl Ledger {
    pub fn new(starting_cash: Decimal, transaction_fee: Decimal) -> Self {
        Self {
            cash: starting_cash,
            holdings: BTreeMap::new(),
            transaction_fee,
            fills: Vec::new(),
        }
    }

    pub fn cash(&self) -> Decimal {
        self.cash
    }

    /// Open positions keyed by ticker.
    pub fn holdings(&self) -> &BTreeMap<String, Position> {
        &self.holdings
    }

    pub fn position(&self, ticker: &str) -> Option<&Position> {
        self.holdings.get(ticker)
    }

    /// Shares currently held (zero when flat).
    pub fn shares_held(&self, ticker: &str) -> u64 {
        self.holdings.get(ticker).map_or(0, |p| p.shares)
    }

    /// Every committed fill, oldest first.
    pub fn fills(&self) -> &[Fill] {
        &self.fills
    }

    /// Simulate a purchase of `shares` at `price` plus the flat fee.
    pub fn buy(&mut self, ticker: &str, shares: u64, price: Decimal) -> Result<Fill, LedgerError> {
        validate_order(shares, price)?;

        let notional = checked(Decimal::from(shares).checked_mul(price), "trade value")?;
        let cost = checked(notional.checked_add(self.transaction_fee), "trade cost")?;
        if self.cash < cost {
            debug!(ticker, shares, needed = %cost, available = %self.cash, "Not enough cash to buy");
            return Err(LedgerError::InsufficientCash {
                needed: cost,
                available: self.cash,
            });
        }

        let position = match self.holdings.get(ticker) {
            Some(pos) => {
                let total_shares = checked(pos.shares.checked_add(shares), "share total")?;
                let avg_price = Decimal::from(pos.shares)
                    .checked_mul(pos.avg_price)
                    .and_then(|basis| basis.checked_add(notional))
                    .and_then(|basis| basis.checked_div(Decimal::from(total_shares)));
                Position {
                    shares: total_shares,
                    avg_price: checked(avg_price, "average price")?,
                }
            }
            None => Position {
                shares,
                avg_price: price,
            },
        };

        self.cash -= cost;
        self.holdings.insert(ticker.to_string(), position);

        info!(ticker, shares, price = %price, cash = %self.cash, "Bought shares");
        Ok(self.record(ticker, Side::Buy, shares, price))
    }

    /// Simulate a sale of `shares` at `price` less the flat fee.
    ///
    /// This is the single authoritative holdings check: callers do not
    /// need to inspect holdings before selling.
    pub fn sell(&mut self, ticker: &str, shares: u64, price: Decimal) -> Result<Fill, LedgerError> {
        validate_order(shares, price)?;

        let held = self.shares_held(ticker);
        if held < shares {
            return Err(LedgerError::InsufficientShares {
                ticker: ticker.to_string(),
                requested: shares,
                held,
            });
        }

        let proceeds = Decimal::from(shares)
            .checked_mul(price)
            .and_then(|gross| gross.checked_sub(self.transaction_fee));
        let proceeds = checked(proceeds, "trade value")?;
        let new_cash = checked(self.cash.checked_add(proceeds), "cash balance")?;
        if new_cash < Decimal::ZERO {
            return Err(LedgerError::InsufficientCash {
                needed: -proceeds,
                available: self.cash,
            });
        }

        self.cash = new_cash;
        let remaining = held - shares;
        if remaining == 0 {
            self.holdings.remove(ticker);
        } else if let Some(pos) = self.holdings.get_mut(ticker) {
            pos.shares = remaining;
        }

        info!(ticker, shares, price = %price, cash = %self.cash, "Sold shares");
        Ok(self.record(ticker, Side::Sell, shares, price))
    }

    /// Mark holdings to market using `price_of`. Unresolved tickers are
    /// logged and listed, never fatal.
    pub fn valuation<F>(&self, price_of: F) -> Valuation
    where
        F: Fn(&str) -> Option<Decimal>,
    {
        let mut holdings_value = Decimal::ZERO;
        let mut unpriced = Vec::new();

        for (ticker, pos) in &self.holdings {
            let Some(price) = price_of(ticker) else {
                warn!(ticker = %ticker, "Could not resolve current price; valued at zero");
                unpriced.push(ticker.clone());
                continue;
            };
            let marked = Decimal::from(pos.shares)
                .checked_mul(price)
                .and_then(|v| v.checked_add(holdings_value));
            match marked {
                Some(total) => holdings_value = total,
                None => {
                    warn!(ticker = %ticker, price = %price, "Position value out of range; valued at zero");
                    unpriced.push(ticker.clone());
                }
            }
        }

        Valuation {
            cash: self.cash,
            holdings_value,
            total_value: self.cash.saturating_add(holdings_value),
            unpriced,
        }
    }

    pub fn holdings_value<F>(&self, price_of: F) -> Decimal
    where
        F: Fn(&str) -> Option<Decimal>,
    {
        self.valuation(price_of).holdings_value
    }

    /// Cash plus marked holdings.
    pub fn total_value<F>(&self, price_of: F) -> Decimal
    where
        F: Fn(&str) -> Option<Decimal>,
    {
        self.valuation(price_of).total_value
    }

    fn record(&mut self, ticker: &str, side: Side, shares: u64, price: Decimal) -> Fill {
        let fill = Fill {
            id: format!("paper-{}", Uuid::new_v4()),
            ticker: ticker.to_string(),
            side,
            shares,
            price,
            fee: self.transaction_fee,
            cash_after: self.cash,
            timestamp: Utc::now(),
        };
        self.fills.push(fill.clone());
        fill
    }
}

/// Map an overflowed computation to a rejected order.
fn checked<T>(value: Option<T>, what: &str) -> Result<T, LedgerError> {
    value.ok_or_else(|| LedgerError::InvalidOrder(format!("{what} out of range")))
}

fn validate_order(shares: u64, price: Decimal) -> Result<(), LedgerError> {
    if shares == 0 {
        return Err(LedgerError::InvalidOrder("share quantity must be positive".into()));
    }
    if price <= Decimal::ZERO {
        return Err(LedgerError::InvalidOrder(format!("price must be positive, got {price}")));
    }
    Ok(())
}

impl fmt::Display for Ledger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Cash: ${:.2}", self.cash)?;
        write!(f, "{}", self.holdings_block())
    }
}

impl Ledger {
    /// Multi-line portfolio summary for an already computed valuation.
    pub fn summary(&self, valuation: &Valuation) -> String {
        format!(
            "--- Portfolio ---\nCash: ${:.2}\nHoldings Value: ${:.2}\nTotal Value: ${:.2}\n\n{}\n-----------------",
            valuation.cash,
            valuation.holdings_value,
            valuation.total_value,
            self.holdings_block(),
        )
    }

    fn holdings_block(&self) -> String {
        if self.holdings.is_empty() {
            return "Holdings: none".to_string();
        }
        let mut out = String::from("Holdings:");
        for (ticker, pos) in &self.holdings {
            out.push_str(&format!("\n  - {ticker}: {} shares @ avg ${:.2}", pos.shares, pos.avg_price));
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
