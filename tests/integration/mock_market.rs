//! Deterministic collaborators for integration testing.
//!
//! `ScriptedMarket` serves quotes and option chains from in-memory
//! tables that test code can change between cycles, and
//! `RecordingNotifier` keeps every delivered message. Both hand out
//! cloned handles sharing the same state, so a test can keep one handle
//! after boxing the other into the monitor.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use paperwatch::data::MarketData;
use paperwatch::notify::Notifier;
use paperwatch::types::{OptionChain, OptionType, Quote, RawContract};

// ---------------------------------------------------------------------------
// Market data
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct ScriptedMarket {
    quotes: Arc<Mutex<HashMap<String, Quote>>>,
    chains: Arc<Mutex<HashMap<String, OptionChain>>>,
    failing: Arc<Mutex<HashSet<String>>>,
    quote_calls: Arc<Mutex<Vec<String>>>,
}

impl ScriptedMarket {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the price and moving average served for `ticker`.
    pub fn set_quote(&self, ticker: &str, price: Decimal, moving_average: Decimal) {
        self.quotes.lock().unwrap().insert(
            ticker.to_string(),
            Quote {
                ticker: ticker.to_string(),
                price,
                moving_average,
            },
        );
    }

    pub fn set_chain(&self, ticker: &str, chain: OptionChain) {
        self.chains.lock().unwrap().insert(ticker.to_string(), chain);
    }

    /// Make every request for `ticker` fail until `recover` is called.
    pub fn fail(&self, ticker: &str) {
        self.failing.lock().unwrap().insert(ticker.to_string());
    }

    pub fn recover(&self, ticker: &str) {
        self.failing.lock().unwrap().remove(ticker);
    }

    /// Tickers quoted so far, in request order.
    pub fn quote_calls(&self) -> Vec<String> {
        self.quote_calls.lock().unwrap().clone()
    }

    fn check(&self, ticker: &str) -> Result<()> {
        if self.failing.lock().unwrap().contains(ticker) {
            return Err(anyhow!("simulated outage for {ticker}"));
        }
        Ok(())
    }
}

#[async_trait]
impl MarketData for ScriptedMarket {
    async fn quote(&self, ticker: &str) -> Result<Quote> {
        self.quote_calls.lock().unwrap().push(ticker.to_string());
        self.check(ticker)?;
        self.quotes
            .lock()
            .unwrap()
            .get(ticker)
            .cloned()
            .ok_or_else(|| anyhow!("No data found, symbol may be delisted: {ticker}"))
    }

    async fn option_chain(&self, ticker: &str) -> Result<OptionChain> {
        self.check(ticker)?;
        Ok(self
            .chains
            .lock()
            .unwrap()
            .get(ticker)
            .cloned()
            .unwrap_or_default())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Single-expiration chain of calls given as (strike, volume, open interest).
pub fn call_chain(expiration: NaiveDate, calls: &[(Decimal, u64, u64)]) -> OptionChain {
    let contracts = calls
        .iter()
        .map(|&(strike, volume, open_interest)| RawContract {
            contract_symbol: format!("T{}C{strike}", expiration.format("%y%m%d")),
            option_type: OptionType::Call,
            strike,
            last_price: Decimal::ONE,
            volume,
            open_interest,
        })
        .collect();

    OptionChain {
        expirations: vec![expiration],
        calls_by_expiration: [(expiration, contracts)].into_iter().collect(),
    }
}

// ---------------------------------------------------------------------------
// Notifier
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<String>>>,
    attempts: Arc<Mutex<usize>>,
    down: Arc<Mutex<bool>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every delivery while `down` is true.
    pub fn set_down(&self, down: bool) {
        *self.down.lock().unwrap() = down;
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> usize {
        *self.attempts.lock().unwrap()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, message: &str) -> Result<()> {
        *self.attempts.lock().unwrap() += 1;
        if *self.down.lock().unwrap() {
            return Err(anyhow!("simulated delivery outage"));
        }
        self.sent.lock().unwrap().push(message.to_string());
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}
