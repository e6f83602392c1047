//! Market data providers.
//!
//! Defines the `MarketData` trait consumed by the monitor and the Yahoo
//! Finance implementation used by the binary.

pub mod yahoo;

use anyhow::Result;
use async_trait::async_trait;

use crate::types::{OptionChain, Quote};

/// Abstraction over quote and option-chain sources.
///
/// Every call may fail independently; the monitor contains failures to
/// the ticker being processed.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketData: Send + Sync {
    /// Current price plus the moving-average trend reference.
    async fn quote(&self, ticker: &str) -> Result<Quote>;

    /// Listed call contracts grouped by expiration, nearest first.
    async fn option_chain(&self, ticker: &str) -> Result<OptionChain>;

    /// Provider name for logging.
    fn name(&self) -> &str;
}
