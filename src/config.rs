//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Every section has documented defaults, so a file only needs the
//! values it changes. Secrets (API keys, bot tokens) are referenced by
//! env-var name in the config and resolved at runtime.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use secrecy::SecretString;
use serde::Deserialize;
use std::fs;

use crate::strategy::{ScreenerConfig, SignalConfig};
use crate::types::MonitorError;

/// Environment variable overriding the config file path.
pub const CONFIG_PATH_ENV: &str = "PAPERWATCH_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Commentary providers the binary can build.
pub const SUPPORTED_PROVIDERS: [&str; 3] = ["anthropic", "openai", "gemini"];

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub agent: AgentConfig,
    pub signal: SignalSection,
    pub options: OptionsSection,
    pub llm: LlmConfig,
    pub alerts: AlertsConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AgentConfig {
    pub name: String,
    /// Tickers processed in order every cycle.
    pub watchlist: Vec<String>,
    pub poll_interval_secs: u64,
    pub starting_cash: Decimal,
    pub transaction_fee: Decimal,
    /// Shares bought or sold per signal.
    pub trade_shares: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: "PAPERWATCH-001".to_string(),
            watchlist: ["GOOGL", "MSFT", "AAPL", "AMZN"].map(String::from).to_vec(),
            poll_interval_secs: 300,
            starting_cash: dec!(100000),
            transaction_fee: dec!(7.95),
            trade_shares: 10,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SignalSection {
    pub lower_band_pct: Decimal,
    pub upper_band_pct: Decimal,
    /// Number of daily closes in the moving average.
    pub moving_average_period: usize,
    /// History window requested from the provider (e.g. "3mo").
    pub history_range: String,
}

impl Default for SignalSection {
    fn default() -> Self {
        Self {
            lower_band_pct: dec!(0.05),
            upper_band_pct: dec!(0.05),
            moving_average_period: 50,
            history_range: "3mo".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OptionsSection {
    pub enabled: bool,
    pub strike_ceiling_pct: Decimal,
    pub min_volume: u64,
    pub min_open_interest: u64,
    pub nearest_expiration_only: bool,
}

impl Default for OptionsSection {
    fn default() -> Self {
        let s = ScreenerConfig::default();
        Self {
            enabled: true,
            strike_ceiling_pct: s.strike_ceiling_pct,
            min_volume: s.min_volume,
            min_open_interest: s.min_open_interest,
            nearest_expiration_only: s.nearest_expiration_only,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LlmConfig {
    /// "anthropic" | "openai" | "gemini"
    pub provider: String,
    /// Provider default when absent.
    pub model: Option<String>,
    pub api_key_env: String,
    pub max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "anthropic".to_string(),
            model: None,
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
            max_tokens: 512,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AlertsConfig {
    pub telegram_bot_token_env: Option<String>,
    pub telegram_chat_id_env: Option<String>,
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            telegram_bot_token_env: Some("TELEGRAM_BOT_TOKEN".to_string()),
            telegram_chat_id_env: Some("TELEGRAM_CHAT_ID".to_string()),
        }
    }
}

impl AppConfig {
    /// Load and validate configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config = Self::from_toml(&contents)
            .with_context(|| format!("Invalid config file: {path}"))?;
        Ok(config)
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents).context("Failed to parse config")?;
        config.validate()?;
        Ok(config)
    }

    /// Config path from `PAPERWATCH_CONFIG`, else `config.toml`.
    pub fn default_path() -> String {
        std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string())
    }

    /// Reject settings the monitor cannot run with.
    pub fn validate(&self) -> Result<(), MonitorError> {
        let fail = |msg: String| Err(MonitorError::Config(msg));
        let a = &self.agent;
        let s = &self.signal;

        if a.watchlist.is_empty() {
            return fail("agent.watchlist must contain at least one ticker".into());
        }
        if let Some(t) = a.watchlist.iter().find(|t| t.trim().is_empty()) {
            return fail(format!("agent.watchlist contains a blank ticker: {t:?}"));
        }
        if a.poll_interval_secs == 0 {
            return fail("agent.poll_interval_secs must be positive".into());
        }
        if a.starting_cash < Decimal::ZERO {
            return fail(format!("agent.starting_cash must be non-negative, got {}", a.starting_cash));
        }
        if a.transaction_fee < Decimal::ZERO {
            return fail(format!("agent.transaction_fee must be non-negative, got {}", a.transaction_fee));
        }
        if a.trade_shares == 0 {
            return fail("agent.trade_shares must be positive".into());
        }
        for (name, pct) in [("lower_band_pct", s.lower_band_pct), ("upper_band_pct", s.upper_band_pct)] {
            if pct < Decimal::ZERO || pct >= Decimal::ONE {
                return fail(format!("signal.{name} must be in [0, 1), got {pct}"));
            }
        }
        if s.moving_average_period == 0 {
            return fail("signal.moving_average_period must be positive".into());
        }
        if !SUPPORTED_PROVIDERS.contains(&self.llm.provider.as_str()) {
            return fail(format!(
                "llm.provider must be one of {SUPPORTED_PROVIDERS:?}, got {:?}",
                self.llm.provider
            ));
        }
        if self.options.strike_ceiling_pct <= Decimal::ZERO {
            return fail(format!(
                "options.strike_ceiling_pct must be positive, got {}",
                self.options.strike_ceiling_pct
            ));
        }
        Ok(())
    }

    pub fn signal_config(&self) -> SignalConfig {
        SignalConfig {
            lower_band_pct: self.signal.lower_band_pct,
            upper_band_pct: self.signal.upper_band_pct,
        }
    }

    pub fn screener_config(&self) -> ScreenerConfig {
        ScreenerConfig {
            strike_ceiling_pct: self.options.strike_ceiling_pct,
            min_volume: self.options.min_volume,
            min_open_interest: self.options.min_open_interest,
            nearest_expiration_only: self.options.nearest_expiration_only,
        }
    }

    /// Resolve an environment variable name to its value.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }

    /// Resolve a secret by env-var name; `None` when unset or empty.
    pub fn resolve_secret(env_name: Option<&str>) -> Option<SecretString> {
        env_name
            .and_then(|name| Self::resolve_env(name).ok())
            .filter(|v| !v.trim().is_empty())
            .map(SecretString::new)
    }
}
