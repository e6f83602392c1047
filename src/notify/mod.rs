//! Alert delivery.
//!
//! Defines the `Notifier` trait with a Telegram implementation and a
//! log-only fallback used when no chat credentials are configured.

pub mod telegram;

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

/// Abstraction over message delivery channels.
///
/// Delivery is fire-and-forget from the monitor's perspective: a failure
/// is logged by the caller and never retried.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a plain-text message.
    async fn send(&self, message: &str) -> Result<()>;

    /// Channel name for logging.
    fn name(&self) -> &str;
}

/// Writes alerts to the log instead of delivering them.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, message: &str) -> Result<()> {
        info!(channel = "log", "[ALERT]\n{message}");
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}
