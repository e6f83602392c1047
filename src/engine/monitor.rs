//! Watchlist monitor.
//!
//! Runs one polling cycle over the watchlist: fetch a quote, evaluate
//! the moving-average signal, apply the paper trade to the ledger,
//! screen the option chain and dispatch alerts. Tickers are processed
//! strictly in watchlist order and a failure on one never stops the
//! others.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info, warn};

use crate::data::MarketData;
use crate::engine::alerts::{AlertDispatcher, AlertEvent};
use crate::engine::ledger::{Ledger, LedgerError};
use crate::strategy::{Action, OptionsScreener, SignalEvaluator};
use crate::types::{MonitorError, Quote};

// ---------------------------------------------------------------------------
// Cycle report
// ---------------------------------------------------------------------------

/// Summary of one pass over the watchlist.
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub cycle_number: u64,
    pub tickers_processed: usize,
    pub tickers_failed: usize,
    pub buys: usize,
    pub sells: usize,
    pub option_candidates: usize,
    pub alerts_sent: usize,
    pub alerts_failed: usize,
    pub cash: Decimal,
    pub holdings_value: Decimal,
    pub total_value: Decimal,
    /// Held tickers with no price observed this cycle.
    pub unpriced: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cycle {}: {} ok / {} failed, {} buys, {} sells, {} option candidates, \
             alerts {} sent / {} failed, total ${:.2}",
            self.cycle_number,
            self.tickers_processed,
            self.tickers_failed,
            self.buys,
            self.sells,
            self.option_candidates,
            self.alerts_sent,
            self.alerts_failed,
            self.total_value,
        )
    }
}

// ---------------------------------------------------------------------------
// Monitor
// ---------------------------------------------------------------------------

pub struct Monitor {
    market: Box<dyn MarketData>,
    dispatcher: AlertDispatcher,
    evaluator: SignalEvaluator,
    screener: OptionsScreener,
    watchlist: Vec<String>,
    trade_shares: u64,
    options_enabled: bool,
}

impl Monitor {
    pub fn new(
        market: Box<dyn MarketData>,
        dispatcher: AlertDispatcher,
        evaluator: SignalEvaluator,
        screener: OptionsScreener,
        watchlist: Vec<String>,
        trade_shares: u64,
    ) -> Self {
        Self {
            market,
            dispatcher,
            evaluator,
            screener,
            watchlist,
            trade_shares,
            options_enabled: true,
        }
    }

    /// Turn option screening on or off.
    pub fn with_options(mut self, enabled: bool) -> Self {
        self.options_enabled = enabled;
        self
    }

    /// Process every watchlist ticker once, then value the ledger at the
    /// prices observed during the cycle.
    pub async fn run_cycle(&self, ledger: &mut Ledger, cycle_number: u64) -> CycleReport {
        let mut report = CycleReport {
            cycle_number,
            timestamp: Utc::now(),
            ..Default::default()
        };
        let mut observed: HashMap<String, Decimal> = HashMap::new();

        info!(cycle = cycle_number, tickers = self.watchlist.len(), "Cycle started");

        for ticker in &self.watchlist {
            match self.process_ticker(ticker, ledger, &mut report).await {
                Ok(quote) => {
                    observed.insert(quote.ticker, quote.price);
                    report.tickers_processed += 1;
                }
                Err(e) => {
                    warn!(ticker = %ticker, error = %e, "Skipping ticker this cycle");
                    report.tickers_failed += 1;
                }
            }
        }

        let valuation = ledger.valuation(|t| observed.get(t).copied());
        info!("\n{}", ledger.summary(&valuation));

        report.cash = valuation.cash;
        report.holdings_value = valuation.holdings_value;
        report.total_value = valuation.total_value;
        report.unpriced = valuation.unpriced;

        info!(
            cycle = cycle_number,
            processed = report.tickers_processed,
            failed = report.tickers_failed,
            buys = report.buys,
            sells = report.sells,
            candidates = report.option_candidates,
            alerts_sent = report.alerts_sent,
            alerts_failed = report.alerts_failed,
            cash = %report.cash,
            total_value = %report.total_value,
            "Cycle complete"
        );

        report
    }

    /// Quote, decide, trade and screen one ticker.
    ///
    /// Only a quote failure is an error; everything after the quote is
    /// logged and counted in `report`.
    async fn process_ticker(
        &self,
        ticker: &str,
        ledger: &mut Ledger,
        report: &mut CycleReport,
    ) -> Result<Quote, MonitorError> {
        let quote = self
            .market
            .quote(ticker)
            .await
            .map_err(|e| MonitorError::data_unavailable(ticker, &e))?;

        info!(ticker, price = %quote.price, average = %quote.moving_average, "{quote}");

        let signal = self.evaluator.signal(&quote);
        match signal.action {
            Action::Buy => self.buy(ledger, &quote, report).await,
            Action::Sell => self.sell(ledger, &quote, report).await,
            Action::Hold => debug!(ticker, deviation = %signal.deviation().round_dp(4), "Holding"),
        }

        if self.options_enabled {
            self.screen_options(&quote, report).await;
        }

        Ok(quote)
    }

    async fn buy(&self, ledger: &mut Ledger, quote: &Quote, report: &mut CycleReport) {
        match ledger.buy(&quote.ticker, self.trade_shares, quote.price) {
            Ok(fill) => {
                info!(fill = %fill, "Paper trade committed");
                report.buys += 1;
                self.alert(AlertEvent::Trade(fill), report).await;
            }
            Err(LedgerError::InsufficientCash { needed, available }) => {
                info!(
                    ticker = %quote.ticker,
                    needed = %needed,
                    available = %available,
                    "Buy signal skipped: insufficient cash"
                );
            }
            Err(e) => warn!(ticker = %quote.ticker, error = %e, "Buy rejected"),
        }
    }

    async fn sell(&self, ledger: &mut Ledger, quote: &Quote, report: &mut CycleReport) {
        match ledger.sell(&quote.ticker, self.trade_shares, quote.price) {
            Ok(fill) => {
                info!(fill = %fill, "Paper trade committed");
                report.sells += 1;
                self.alert(AlertEvent::Trade(fill), report).await;
            }
            Err(LedgerError::InsufficientShares { requested, held, .. }) => {
                debug!(ticker = %quote.ticker, requested, held, "Sell signal: nothing to sell");
            }
            Err(e) => warn!(ticker = %quote.ticker, error = %e, "Sell rejected"),
        }
    }

    async fn screen_options(&self, quote: &Quote, report: &mut CycleReport) {
        let chain = match self.market.option_chain(&quote.ticker).await {
            Ok(chain) => chain,
            Err(e) => {
                warn!(ticker = %quote.ticker, error = %format!("{e:#}"), "Option chain unavailable");
                return;
            }
        };

        let candidates = self.screener.screen_chain(&quote.ticker, &chain, quote.price);
        report.option_candidates += candidates.len();

        for candidate in candidates {
            if !self.screener.is_alertable(&candidate) {
                debug!(candidate = %candidate, "Below liquidity floor");
                continue;
            }
            info!(candidate = %candidate, "Bullish call candidate");
            self.alert(AlertEvent::Option(candidate), report).await;
        }
    }

    async fn alert(&self, event: AlertEvent, report: &mut CycleReport) {
        match self.dispatcher.dispatch(&event).await {
            Ok(()) => report.alerts_sent += 1,
            Err(_) => report.alerts_failed += 1,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::MockMarketData;
    use crate::engine::alerts::PromptContext;
    use crate::notify::MockNotifier;
    use crate::types::{OptionChain, OptionType, RawContract};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn quote(ticker: &str, price: Decimal, average: Decimal) -> Quote {
        Quote {
            ticker: ticker.to_string(),
            price,
            moving_average: average,
        }
    }

    fn dispatcher(notifier: MockNotifier) -> AlertDispatcher {
        AlertDispatcher::new(Box::new(notifier), None, PromptContext::default())
    }

    fn ok_notifier(times: usize) -> MockNotifier {
        let mut n = MockNotifier::new();
        n.expect_send().times(times).returning(|_| Ok(()));
        n
    }

    fn monitor(market: MockMarketData, notifier: MockNotifier, watchlist: &[&str]) -> Monitor {
        Monitor::new(
            Box::new(market),
            dispatcher(notifier),
            SignalEvaluator::default(),
            OptionsScreener::default(),
            watchlist.iter().map(|s| s.to_string()).collect(),
            10,
        )
    }

    fn chain(contracts: Vec<RawContract>) -> OptionChain {
        let exp = NaiveDate::from_ymd_opt(2026, 1, 16).unwrap();
        OptionChain {
            expirations: vec![exp],
            calls_by_expiration: [(exp, contracts)].into_iter().collect(),
        }
    }

    fn call(strike: Decimal, volume: u64, open_interest: u64) -> RawContract {
        RawContract {
            contract_symbol: format!("X260116C{strike}"),
            option_type: OptionType::Call,
            strike,
            last_price: dec!(1.25),
            volume,
            open_interest,
        }
    }

    #[tokio::test]
    async fn test_buy_signal_commits_and_alerts() {
        let mut market = MockMarketData::new();
        market
            .expect_quote()
            .returning(|t| Ok(quote(t, dec!(90), dec!(100))));

        let m = monitor(market, ok_notifier(1), &["AAPL"]).with_options(false);
        let mut ledger = Ledger::new(dec!(100000), dec!(7.95));

        let report = m.run_cycle(&mut ledger, 1).await;

        assert_eq!(report.buys, 1);
        assert_eq!(report.alerts_sent, 1);
        assert_eq!(ledger.cash(), dec!(99092.05));
        assert_eq!(ledger.shares_held("AAPL"), 10);
        assert_eq!(report.holdings_value, dec!(900));
        assert_eq!(report.total_value, dec!(99992.05));
    }

    #[tokio::test]
    async fn test_sell_signal_without_holdings_is_quiet() {
        let mut market = MockMarketData::new();
        market
            .expect_quote()
            .returning(|t| Ok(quote(t, dec!(110), dec!(100))));

        let m = monitor(market, ok_notifier(0), &["MSFT"]).with_options(false);
        let mut ledger = Ledger::new(dec!(100000), dec!(7.95));

        let report = m.run_cycle(&mut ledger, 1).await;

        assert_eq!(report.sells, 0);
        assert_eq!(report.tickers_failed, 0);
        assert_eq!(ledger.cash(), dec!(100000));
        assert!(ledger.fills().is_empty());
    }

    #[tokio::test]
    async fn test_quote_failure_isolated_to_ticker() {
        let mut market = MockMarketData::new();
        market.expect_quote().returning(|t| {
            if t == "BAD" {
                Err(anyhow::anyhow!("HTTP 404"))
            } else {
                Ok(quote(t, dec!(100), dec!(100)))
            }
        });

        let m = monitor(market, ok_notifier(0), &["GOOGL", "BAD", "AMZN"]).with_options(false);
        let mut ledger = Ledger::new(dec!(1000), dec!(1));

        let report = m.run_cycle(&mut ledger, 3).await;

        assert_eq!(report.cycle_number, 3);
        assert_eq!(report.tickers_processed, 2);
        assert_eq!(report.tickers_failed, 1);
        assert_eq!(report.total_value, dec!(1000));
    }

    #[tokio::test]
    async fn test_insufficient_cash_skips_buy() {
        let mut market = MockMarketData::new();
        market
            .expect_quote()
            .returning(|t| Ok(quote(t, dec!(90), dec!(100))));

        let m = monitor(market, ok_notifier(0), &["AAPL"]).with_options(false);
        let mut ledger = Ledger::new(dec!(500), dec!(7.95));

        let report = m.run_cycle(&mut ledger, 1).await;

        assert_eq!(report.buys, 0);
        assert_eq!(ledger.cash(), dec!(500));
        assert!(ledger.holdings().is_empty());
    }

    #[tokio::test]
    async fn test_options_screened_on_hold() {
        let mut market = MockMarketData::new();
        market
            .expect_quote()
            .returning(|t| Ok(quote(t, dec!(100), dec!(100))));
        market.expect_option_chain().times(1).returning(|_| {
            Ok(chain(vec![
                call(dec!(100), 500, 500),   // at the money, excluded
                call(dec!(102.5), 11, 21),   // alertable
                call(dec!(103), 10, 500),    // thin volume
                call(dec!(105), 500, 500),   // at the ceiling, excluded
            ]))
        });

        let m = monitor(market, ok_notifier(1), &["NVDA"]);
        let mut ledger = Ledger::new(dec!(100000), dec!(7.95));

        let report = m.run_cycle(&mut ledger, 1).await;

        assert_eq!(report.option_candidates, 2);
        assert_eq!(report.alerts_sent, 1);
        assert_eq!(report.buys + report.sells, 0);
    }

    #[tokio::test]
    async fn test_option_chain_failure_is_soft() {
        let mut market = MockMarketData::new();
        market
            .expect_quote()
            .returning(|t| Ok(quote(t, dec!(100), dec!(100))));
        market
            .expect_option_chain()
            .returning(|_| Err(anyhow::anyhow!("crumb rejected")));

        let m = monitor(market, ok_notifier(0), &["TSLA"]);
        let mut ledger = Ledger::new(dec!(100000), dec!(7.95));

        let report = m.run_cycle(&mut ledger, 1).await;

        assert_eq!(report.tickers_processed, 1);
        assert_eq!(report.tickers_failed, 0);
        assert_eq!(report.option_candidates, 0);
    }

    #[tokio::test]
    async fn test_delivery_failure_keeps_trade() {
        let mut market = MockMarketData::new();
        market
            .expect_quote()
            .returning(|t| Ok(quote(t, dec!(90), dec!(100))));
        let mut notifier = MockNotifier::new();
        notifier
            .expect_send()
            .times(1)
            .returning(|_| Err(anyhow::anyhow!("timeout")));

        let m = monitor(market, notifier, &["AAPL"]).with_options(false);
        let mut ledger = Ledger::new(dec!(100000), dec!(7.95));

        let report = m.run_cycle(&mut ledger, 1).await;

        assert_eq!(report.buys, 1);
        assert_eq!(report.alerts_failed, 1);
        assert_eq!(ledger.shares_held("AAPL"), 10);
    }

    #[tokio::test]
    async fn test_held_ticker_unpriced_when_quote_fails() {
        let mut market = MockMarketData::new();
        market
            .expect_quote()
            .returning(|_| Err(anyhow::anyhow!("rate limited")));

        let m = monitor(market, ok_notifier(0), &["AAPL"]).with_options(false);
        let mut ledger = Ledger::new(dec!(100000), dec!(7.95));
        ledger.buy("AAPL", 10, dec!(90)).unwrap();

        let report = m.run_cycle(&mut ledger, 2).await;

        assert_eq!(report.unpriced, vec!["AAPL".to_string()]);
        assert_eq!(report.holdings_value, Decimal::ZERO);
        assert_eq!(report.total_value, dec!(99092.05));
    }
}
