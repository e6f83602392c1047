//! PAPERWATCH: Autonomous paper-trading watchlist monitor
//!
//! Entry point. Loads configuration, initialises structured logging,
//! wires the market data, commentary and alert clients, and runs the
//! polling loop until Ctrl+C.

use anyhow::Result;
use std::time::Duration;
use tracing::{info, warn};

use paperwatch::config::AppConfig;
use paperwatch::data::yahoo::YahooClient;
use paperwatch::data::MarketData;
use paperwatch::engine::{AlertDispatcher, Ledger, Monitor, PromptContext};
use paperwatch::llm::anthropic::AnthropicClient;
use paperwatch::llm::gemini::GeminiClient;
use paperwatch::llm::openai::OpenAiClient;
use paperwatch::llm::Narrator;
use paperwatch::notify::telegram::TelegramNotifier;
use paperwatch::notify::{LogNotifier, Notifier};
use paperwatch::strategy::{OptionsScreener, SignalEvaluator};
use paperwatch::types::MonitorError;

const BANNER: &str = r#"
 ____   _    ____  _____ ______        ___  _____ ____ _   _
|  _ \ / \  |  _ \| ____|  _ \ \      / / \|_   _/ ___| | | |
| |_) / _ \ | |_) |  _| | |_) \ \ /\ / / _ \ | || |   | |_| |
|  __/ ___ \|  __/| |___|  _ < \ V  V / ___ \| || |___|  _  |
|_| /_/   \_\_|   |_____|_| \_\ \_/\_/_/   \_\_| \____|_| |_|

  Paper-trading watchlist monitor
  v0.1.0 (simulated fills only)
"#;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let config_path = AppConfig::default_path();
    let cfg = AppConfig::load(&config_path)?;

    init_logging();

    println!("{BANNER}");
    info!(
        agent_name = %cfg.agent.name,
        config = %config_path,
        watchlist = ?cfg.agent.watchlist,
        poll_interval_secs = cfg.agent.poll_interval_secs,
        starting_cash = %cfg.agent.starting_cash,
        fee = %cfg.agent.transaction_fee,
        "PAPERWATCH starting up"
    );

    // -- Initialise components -------------------------------------------

    let market = YahooClient::new(
        Some(cfg.signal.history_range.clone()),
        Some(cfg.signal.moving_average_period),
    )?
    .with_all_expirations(!cfg.options.nearest_expiration_only);
    info!(provider = market.name(), "Market data source ready");

    let dispatcher = AlertDispatcher::new(
        build_notifier(&cfg)?,
        build_narrator(&cfg)?,
        PromptContext::new(&cfg.signal_config(), cfg.signal.moving_average_period),
    );

    let monitor = Monitor::new(
        Box::new(market),
        dispatcher,
        SignalEvaluator::new(cfg.signal_config()),
        OptionsScreener::new(cfg.screener_config()),
        cfg.agent.watchlist.clone(),
        cfg.agent.trade_shares,
    )
    .with_options(cfg.options.enabled);

    let mut ledger = Ledger::new(cfg.agent.starting_cash, cfg.agent.transaction_fee);

    // -- Main loop -------------------------------------------------------

    let mut interval = tokio::time::interval(Duration::from_secs(cfg.agent.poll_interval_secs));
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!(
        interval_secs = cfg.agent.poll_interval_secs,
        "Entering main loop. Press Ctrl+C to stop."
    );

    let mut cycle: u64 = 0;
    loop {
        tokio::select! {
            _ = interval.tick() => {
                cycle += 1;
                let report = monitor.run_cycle(&mut ledger, cycle).await;
                info!("{report}");
            }
            _ = &mut shutdown => {
                info!("Shutdown signal received.");
                break;
            }
        }
    }

    info!(
        cycles = cycle,
        fills = ledger.fills().len(),
        cash = format!("${:.2}", ledger.cash()),
        "PAPERWATCH shut down cleanly."
    );

    Ok(())
}

/// Telegram when both credentials resolve, otherwise log-only.
fn build_notifier(cfg: &AppConfig) -> Result<Box<dyn Notifier>> {
    let token = AppConfig::resolve_secret(cfg.alerts.telegram_bot_token_env.as_deref());
    let chat_id = cfg
        .alerts
        .telegram_chat_id_env
        .as_deref()
        .and_then(|env| AppConfig::resolve_env(env).ok())
        .filter(|v| !v.trim().is_empty());

    let notifier: Box<dyn Notifier> = match (token, chat_id) {
        (Some(token), Some(chat_id)) => {
            info!(chat_id = %chat_id, "Telegram chat configured");
            Box::new(TelegramNotifier::new(token, chat_id)?)
        }
        _ => {
            warn!("Telegram credentials not set; alerts will only be logged");
            Box::new(LogNotifier)
        }
    };

    info!(channel = notifier.name(), "Alert channel ready");
    Ok(notifier)
}

/// Commentary provider from `[llm]`, or none when no key is available.
fn build_narrator(cfg: &AppConfig) -> Result<Option<Box<dyn Narrator>>> {
    let Some(api_key) = AppConfig::resolve_secret(Some(&cfg.llm.api_key_env)) else {
        warn!(env = %cfg.llm.api_key_env, "No LLM API key configured; alerts carry no commentary");
        return Ok(None);
    };

    let narrator: Box<dyn Narrator> = match cfg.llm.provider.as_str() {
        "openai" => Box::new(OpenAiClient::new(
            api_key,
            cfg.llm.model.clone(),
            Some(cfg.llm.max_tokens),
        )?),
        "anthropic" => Box::new(AnthropicClient::new(
            api_key,
            cfg.llm.model.clone(),
            Some(cfg.llm.max_tokens),
        )?),
        "gemini" => Box::new(GeminiClient::new(
            api_key,
            cfg.llm.model.clone(),
            Some(cfg.llm.max_tokens),
        )?),
        other => {
            return Err(MonitorError::Config(format!("unknown llm.provider: {other}")).into());
        }
    };

    info!(provider = %cfg.llm.provider, model = narrator.model_name(), "Commentary enabled");
    Ok(Some(narrator))
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("paperwatch=info"));

    let json_logging = std::env::var("PAPERWATCH_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
