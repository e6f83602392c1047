//! Alert dispatcher.
//!
//! Turns committed fills and alertable option candidates into chat
//! messages: builds the commentary prompt, asks the narrator (if any),
//! formats the alert and hands it to the notifier. Neither a narrator
//! nor a notifier failure propagates past this module as anything but a
//! logged, counted outcome.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{debug, info, warn};

use crate::llm::Narrator;
use crate::notify::Notifier;
use crate::strategy::{OptionCandidate, SignalConfig};
use crate::types::{Fill, MonitorError, Side};

/// Commentary text used when the narrator fails.
pub const NARRATIVE_UNAVAILABLE: &str = "(analysis unavailable)";

/// Commentary text used when no narrator is configured.
pub const NARRATIVE_DISABLED: &str = "(analysis disabled)";

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Something worth telling the operator about.
#[derive(Debug, Clone)]
pub enum AlertEvent {
    Trade(Fill),
    Option(OptionCandidate),
}

impl AlertEvent {
    pub fn ticker(&self) -> &str {
        match self {
            AlertEvent::Trade(fill) => &fill.ticker,
            AlertEvent::Option(candidate) => &candidate.ticker,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            AlertEvent::Trade(_) => "trade",
            AlertEvent::Option(_) => "option",
        }
    }
}

// ---------------------------------------------------------------------------
// Prompt context
// ---------------------------------------------------------------------------

/// Strategy parameters rendered into commentary prompts.
#[derive(Debug, Clone)]
pub struct PromptContext {
    pub lower_band_pct: Decimal,
    pub upper_band_pct: Decimal,
    pub moving_average_period: usize,
}

impl PromptContext {
    pub fn new(signal: &SignalConfig, moving_average_period: usize) -> Self {
        Self {
            lower_band_pct: signal.lower_band_pct,
            upper_band_pct: signal.upper_band_pct,
            moving_average_period,
        }
    }
}

impl Default for PromptContext {
    fn default() -> Self {
        Self::new(&SignalConfig::default(), 50)
    }
}

/// Two-decimal money rendering.
fn money(value: Decimal) -> String {
    format!("{:.2}", value.round_dp(2))
}

/// Fraction as a whole-looking percentage: 0.05 -> "5", 0.025 -> "2.5".
fn percent(fraction: Decimal) -> String {
    (fraction * dec!(100)).normalize().to_string()
}

pub fn trade_prompt(fill: &Fill, ctx: &PromptContext) -> String {
    match fill.side {
        Side::Buy => format!(
            "I just bought {} shares of {} at ${} because it was {}% below its {}-day moving average. \
             What is the outlook for this stock?",
            fill.shares,
            fill.ticker,
            money(fill.price),
            percent(ctx.lower_band_pct),
            ctx.moving_average_period,
        ),
        Side::Sell => format!(
            "I just sold {} shares of {} at ${} because it was {}% above its {}-day moving average. \
             Was this a good move?",
            fill.shares,
            fill.ticker,
            money(fill.price),
            percent(ctx.upper_band_pct),
            ctx.moving_average_period,
        ),
    }
}

pub fn option_prompt(candidate: &OptionCandidate) -> String {
    format!(
        "I've identified a potential bullish call option for {}. The strike price is ${} \
         with an expiration of {}. The current volume is {} and open interest is {}. \
         Should I consider this trade?",
        candidate.ticker,
        money(candidate.strike),
        candidate.expiration,
        candidate.volume,
        candidate.open_interest,
    )
}

pub fn trade_message(fill: &Fill, analysis: &str) -> String {
    let verb = match fill.side {
        Side::Buy => "Bought",
        Side::Sell => "Sold",
    };
    format!(
        "PAPER TRADE: {verb} {} {} @ ${}\n\n{analysis}",
        fill.shares,
        fill.ticker,
        money(fill.price),
    )
}

pub fn option_message(candidate: &OptionCandidate, analysis: &str) -> String {
    format!(
        "OPTIONS ALERT: Bullish opportunity for {}!\n\
         Type: {}, Strike: ${}, Exp: {}\n\
         Last Price: ${}, Vol: {}, OI: {}\n\n\
         Analysis:\n{analysis}",
        candidate.ticker,
        candidate.option_type,
        money(candidate.strike),
        candidate.expiration,
        money(candidate.last_price),
        candidate.volume,
        candidate.open_interest,
    )
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

pub struct AlertDispatcher {
    notifier: Box<dyn Notifier>,
    narrator: Option<Box<dyn Narrator>>,
    prompts: PromptContext,
}

impl AlertDispatcher {
    pub fn new(
        notifier: Box<dyn Notifier>,
        narrator: Option<Box<dyn Narrator>>,
        prompts: PromptContext,
    ) -> Self {
        Self {
            notifier,
            narrator,
            prompts,
        }
    }

    pub fn prompt_for(&self, event: &AlertEvent) -> String {
        match event {
            AlertEvent::Trade(fill) => trade_prompt(fill, &self.prompts),
            AlertEvent::Option(candidate) => option_prompt(candidate),
        }
    }

    /// Commentary for an event. Never fails; falls back to a placeholder.
    pub async fn narrate(&self, event: &AlertEvent) -> String {
        let Some(narrator) = self.narrator.as_ref() else {
            return NARRATIVE_DISABLED.to_string();
        };

        let prompt = self.prompt_for(event);
        match narrator.generate(&prompt).await {
            Ok(text) => text,
            Err(e) => {
                let err = MonitorError::Narrative(format!("{e:#}"));
                warn!(ticker = %event.ticker(), error = %err, "Using placeholder commentary");
                NARRATIVE_UNAVAILABLE.to_string()
            }
        }
    }

    /// Narrate, format and deliver one event.
    ///
    /// Delivery is attempted once. The returned error is informational;
    /// the caller has already committed whatever the alert describes.
    pub async fn dispatch(&self, event: &AlertEvent) -> Result<(), MonitorError> {
        let analysis = self.narrate(event).await;
        let message = match event {
            AlertEvent::Trade(fill) => trade_message(fill, &analysis),
            AlertEvent::Option(candidate) => option_message(candidate, &analysis),
        };

        debug!(ticker = %event.ticker(), kind = event.kind(), chars = message.len(), "Dispatching alert");

        match self.notifier.send(&message).await {
            Ok(()) => {
                info!(ticker = %event.ticker(), kind = event.kind(), "Alert sent");
                Ok(())
            }
            Err(e) => {
                let err = MonitorError::Delivery(format!("{e:#}"));
                warn!(ticker = %event.ticker(), kind = event.kind(), error = %err, "Alert not delivered");
                Err(err)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
