//! Multi-cycle scenarios through the full monitor with deterministic
//! market data and an in-memory notifier.

use chrono::NaiveDate;
use rust_decimal_macros::dec;

use paperwatch::engine::{AlertDispatcher, Ledger, Monitor, PromptContext};
use paperwatch::strategy::{OptionsScreener, ScreenerConfig, SignalEvaluator};
use paperwatch::types::Side;

use crate::mock_market::{call_chain, RecordingNotifier, ScriptedMarket};

fn build(market: &ScriptedMarket, notifier: &RecordingNotifier, watchlist: &[&str]) -> Monitor {
    Monitor::new(
        Box::new(market.clone()),
        AlertDispatcher::new(Box::new(notifier.clone()), None, PromptContext::default()),
        SignalEvaluator::default(),
        OptionsScreener::new(ScreenerConfig::default()),
        watchlist.iter().map(|t| t.to_string()).collect(),
        10,
    )
}

fn expiry() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, 16).unwrap()
}

#[tokio::test]
async fn test_buy_then_sell_round_trip() {
    let market = ScriptedMarket::new();
    let notifier = RecordingNotifier::new();
    let monitor = build(&market, &notifier, &["X"]);
    let mut ledger = Ledger::new(dec!(100000), dec!(7.95));

    market.set_quote("X", dec!(90), dec!(100));
    let first = monitor.run_cycle(&mut ledger, 1).await;
    assert_eq!(first.buys, 1);
    assert_eq!(ledger.cash(), dec!(99092.05));

    market.set_quote("X", dec!(110), dec!(100));
    let second = monitor.run_cycle(&mut ledger, 2).await;
    assert_eq!(second.sells, 1);
    assert_eq!(ledger.cash(), dec!(100184.10));
    assert!(ledger.holdings().is_empty());
    assert_eq!(second.total_value, dec!(100184.10));

    let sides: Vec<Side> = ledger.fills().iter().map(|f| f.side).collect();
    assert_eq!(sides, vec![Side::Buy, Side::Sell]);

    let sent = notifier.sent();
    assert_eq!(sent.len(), 2);
    assert!(sent[0].starts_with("PAPER TRADE: Bought 10 X @ $90.00"));
    assert!(sent[1].starts_with("PAPER TRADE: Sold 10 X @ $110.00"));
}

#[tokio::test]
async fn test_repeated_buy_signals_average_cost() {
    let market = ScriptedMarket::new();
    let notifier = RecordingNotifier::new();
    let monitor = build(&market, &notifier, &["AMZN"]);
    let mut ledger = Ledger::new(dec!(100000), dec!(0));

    market.set_quote("AMZN", dec!(100), dec!(200));
    monitor.run_cycle(&mut ledger, 1).await;
    market.set_quote("AMZN", dec!(120), dec!(200));
    monitor.run_cycle(&mut ledger, 2).await;

    let pos = ledger.position("AMZN").unwrap();
    assert_eq!(pos.shares, 20);
    assert_eq!(pos.avg_price, dec!(110));
    assert_eq!(ledger.cash(), dec!(97800));
}

#[tokio::test]
async fn test_outage_on_one_ticker_does_not_stop_cycle() {
    let market = ScriptedMarket::new();
    let notifier = RecordingNotifier::new();
    let monitor = build(&market, &notifier, &["GOOGL", "MSFT", "AAPL"]);
    let mut ledger = Ledger::new(dec!(100000), dec!(7.95));

    market.set_quote("GOOGL", dec!(90), dec!(100));
    market.set_quote("AAPL", dec!(90), dec!(100));
    market.fail("MSFT");

    let report = monitor.run_cycle(&mut ledger, 1).await;

    assert_eq!(market.quote_calls(), vec!["GOOGL", "MSFT", "AAPL"]);
    assert_eq!(report.tickers_processed, 2);
    assert_eq!(report.tickers_failed, 1);
    assert_eq!(report.buys, 2);
    assert_eq!(ledger.shares_held("GOOGL"), 10);
    assert_eq!(ledger.shares_held("AAPL"), 10);
}

#[tokio::test]
async fn test_unpriced_holding_recovers_next_cycle() {
    let market = ScriptedMarket::new();
    let notifier = RecordingNotifier::new();
    let monitor = build(&market, &notifier, &["MSFT"]);
    let mut ledger = Ledger::new(dec!(100000), dec!(7.95));

    market.set_quote("MSFT", dec!(90), dec!(100));
    monitor.run_cycle(&mut ledger, 1).await;

    market.fail("MSFT");
    let dark = monitor.run_cycle(&mut ledger, 2).await;
    assert_eq!(dark.unpriced, vec!["MSFT".to_string()]);
    assert_eq!(dark.total_value, dark.cash);

    market.recover("MSFT");
    market.set_quote("MSFT", dec!(98), dec!(100));
    let back = monitor.run_cycle(&mut ledger, 3).await;
    assert!(back.unpriced.is_empty());
    assert_eq!(back.holdings_value, dec!(980));
    assert_eq!(ledger.shares_held("MSFT"), 10);
}

#[tokio::test]
async fn test_delivery_outage_never_rolls_back() {
    let market = ScriptedMarket::new();
    let notifier = RecordingNotifier::new();
    notifier.set_down(true);
    let monitor = build(&market, &notifier, &["AAPL"]);
    let mut ledger = Ledger::new(dec!(100000), dec!(7.95));

    market.set_quote("AAPL", dec!(90), dec!(100));
    let report = monitor.run_cycle(&mut ledger, 1).await;

    assert_eq!(report.buys, 1);
    assert_eq!(report.alerts_failed, 1);
    assert_eq!(notifier.attempts(), 1);
    assert!(notifier.sent().is_empty());
    assert_eq!(ledger.cash(), dec!(99092.05));
}

#[tokio::test]
async fn test_options_alerts_follow_liquidity_gate() {
    let market = ScriptedMarket::new();
    let notifier = RecordingNotifier::new();
    let monitor = build(&market, &notifier, &["GOOGL"]);
    let mut ledger = Ledger::new(dec!(100000), dec!(7.95));

    market.set_quote("GOOGL", dec!(100), dec!(100));
    market.set_chain(
        "GOOGL",
        call_chain(
            expiry(),
            &[
                (dec!(100), 900, 900),
                (dec!(101), 11, 21),
                (dec!(102.5), 10, 21),
                (dec!(104), 300, 20),
                (dec!(105), 900, 900),
            ],
        ),
    );

    let report = monitor.run_cycle(&mut ledger, 1).await;

    assert_eq!(report.option_candidates, 3);
    assert_eq!(report.alerts_sent, 1);
    let sent = notifier.sent();
    assert!(sent[0].starts_with("OPTIONS ALERT: Bullish opportunity for GOOGL!"));
    assert!(sent[0].contains("Strike: $101.00, Exp: 2026-01-16"));
    assert!(sent[0].contains("Vol: 11, OI: 21"));
    assert!(ledger.fills().is_empty());
}

#[tokio::test]
async fn test_options_disabled_skips_chain() {
    let market = ScriptedMarket::new();
    let notifier = RecordingNotifier::new();
    let monitor = build(&market, &notifier, &["GOOGL"]).with_options(false);
    let mut ledger = Ledger::new(dec!(100000), dec!(7.95));

    market.set_quote("GOOGL", dec!(100), dec!(100));
    market.set_chain("GOOGL", call_chain(expiry(), &[(dec!(101), 500, 500)]));

    let report = monitor.run_cycle(&mut ledger, 1).await;

    assert_eq!(report.option_candidates, 0);
    assert!(notifier.sent().is_empty());
}
