//! Yahoo Finance market data.
//!
//! Quotes come from the chart endpoint: the latest regular-market price
//! plus daily closes over the configured history range, from which the
//! moving average is computed locally. Option chains come from the
//! options endpoint, which returns the nearest expiration by default and
//! any other listed expiration via `?date=`.
//!
//! API: `https://query1.finance.yahoo.com/v8/finance/chart/{symbol}`
//!      `https://query2.finance.yahoo.com/v7/finance/options/{symbol}`
//! Auth: none (a browser-like User-Agent is required).

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use reqwest::Client;
use rust_decimal::prelude::*;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, warn};

use super::MarketData;
use crate::strategy::signal::simple_moving_average;
use crate::types::{OptionChain, OptionType, Quote, RawContract};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

const CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
const OPTIONS_URL: &str = "https://query2.finance.yahoo.com/v7/finance/options";
const PROVIDER_NAME: &str = "yahoo";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

const DEFAULT_RANGE: &str = "3mo";
const DEFAULT_MA_PERIOD: usize = 50;

// ---------------------------------------------------------------------------
// API response types (Yahoo JSON → Rust)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
    #[serde(default)]
    indicators: Option<Indicators>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    #[serde(default)]
    regular_market_price: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteSeries>,
}

#[derive(Debug, Deserialize)]
struct QuoteSeries {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OptionsResponse {
    option_chain: OptionsBody,
}

#[derive(Debug, Deserialize)]
struct OptionsBody {
    #[serde(default)]
    result: Vec<OptionsResult>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OptionsResult {
    #[serde(default)]
    expiration_dates: Vec<i64>,
    #[serde(default)]
    options: Vec<OptionsBlock>,
}

#[derive(Debug, Deserialize)]
struct OptionsBlock {
    #[serde(rename = "expirationDate")]
    expiration_date: i64,
    #[serde(default)]
    calls: Vec<YahooContract>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct YahooContract {
    contract_symbol: String,
    strike: f64,
    #[serde(default)]
    last_price: Option<f64>,
    #[serde(default)]
    volume: Option<u64>,
    #[serde(default)]
    open_interest: Option<u64>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Yahoo Finance client.
pub struct YahooClient {
    http: Client,
    history_range: String,
    ma_period: usize,
    /// Fetch every listed expiration instead of just the nearest.
    all_expirations: bool,
}

impl YahooClient {
    pub fn new(history_range: Option<String>, ma_period: Option<usize>) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build HTTP client for Yahoo Finance")?;

        Ok(Self {
            http,
            history_range: history_range.unwrap_or_else(|| DEFAULT_RANGE.to_string()),
            ma_period: ma_period.unwrap_or(DEFAULT_MA_PERIOD),
            all_expirations: false,
        })
    }

    pub fn with_all_expirations(mut self, all: bool) -> Self {
        self.all_expirations = all;
        self
    }

    // -- Internal helpers ------------------------------------------------

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        debug!(url = %url, "Fetching Yahoo Finance data");

        let resp = self
            .http
            .get(url)
            .send()
            .await
            .context("Yahoo Finance request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Yahoo Finance error {status}: {body}");
        }

        resp.json().await.context("Failed to parse Yahoo Finance response")
    }

    async fn fetch_options(&self, ticker: &str, date: Option<i64>) -> Result<OptionsResult> {
        let mut url = format!("{OPTIONS_URL}/{}", urlencoding::encode(ticker));
        if let Some(ts) = date {
            url.push_str(&format!("?date={ts}"));
        }
        let body: OptionsResponse = self.get_json(&url).await?;
        first_options_result(body)
    }
}

/// Build a quote from a chart response: latest price and SMA of closes.
fn quote_from_chart(ticker: &str, body: ChartResponse, period: usize) -> Result<Quote> {
    if let Some(err) = body.chart.error {
        anyhow::bail!("Yahoo chart error [{}]: {}", err.code, err.description);
    }

    let result = body
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .context("Yahoo chart response had no result")?;

    let closes: Vec<Decimal> = result
        .indicators
        .as_ref()
        .and_then(|i| i.quote.first())
        .map(|q| q.close.iter().flatten().filter_map(|c| Decimal::from_f64(*c)).collect())
        .unwrap_or_default();

    let price = match result.meta.regular_market_price.and_then(Decimal::from_f64) {
        Some(p) => p,
        None => *closes.last().context("No market price or closes returned")?,
    };

    let moving_average = simple_moving_average(&closes, period).with_context(|| {
        format!(
            "Need {period} closes for the moving average, got {}",
            closes.len()
        )
    })?;

    Ok(Quote {
        ticker: ticker.to_string(),
        price,
        moving_average,
    })
}

fn first_options_result(body: OptionsResponse) -> Result<OptionsResult> {
    if let Some(err) = body.option_chain.error {
        anyhow::bail!("Yahoo options error [{}]: {}", err.code, err.description);
    }
    body.option_chain
        .result
        .into_iter()
        .next()
        .context("Yahoo options response had no result")
}

fn unix_to_date(ts: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp(ts, 0).map(|dt| dt.date_naive())
}

fn convert_contract(c: YahooContract) -> Option<RawContract> {
    Some(RawContract {
        contract_symbol: c.contract_symbol,
        option_type: OptionType::Call,
        strike: Decimal::from_f64(c.strike)?,
        last_price: c.last_price.and_then(Decimal::from_f64).unwrap_or_default(),
        volume: c.volume.unwrap_or(0),
        open_interest: c.open_interest.unwrap_or(0),
    })
}

/// Merge option blocks into a chain keyed by expiration date.
fn merge_blocks(chain: &mut OptionChain, blocks: Vec<OptionsBlock>) {
    for block in blocks {
        let Some(exp) = unix_to_date(block.expiration_date) else {
            warn!(ts = block.expiration_date, "Skipping block with invalid expiration");
            continue;
        };
        let calls: Vec<RawContract> = block.calls.into_iter().filter_map(convert_contract).collect();
        chain.calls_by_expiration.entry(exp).or_default().extend(calls);
    }
}

// ---------------------------------------------------------------------------
// MarketData implementation
// ---------------------------------------------------------------------------

#[async_trait]
impl MarketData for YahooClient {
    async fn quote(&self, ticker: &str) -> Result<Quote> {
        let url = format!(
            "{CHART_URL}/{}?range={}&interval=1d",
            urlencoding::encode(ticker),
            self.history_range,
        );
        let body: ChartResponse = self.get_json(&url).await?;
        quote_from_chart(ticker, body, self.ma_period)
            .with_context(|| format!("Failed to build quote for {ticker}"))
    }

    async fn option_chain(&self, ticker: &str) -> Result<OptionChain> {
        let first = self.fetch_options(ticker, None).await?;

        let mut chain = OptionChain {
            expirations: first.expiration_dates.iter().filter_map(|ts| unix_to_date(*ts)).collect(),
            calls_by_expiration: HashMap::new(),
        };
        let fetched: Vec<i64> = first.options.iter().map(|b| b.expiration_date).collect();
        merge_blocks(&mut chain, first.options);

        if self.all_expirations {
            for ts in first.expiration_dates.iter().filter(|ts| !fetched.contains(*ts)) {
                match self.fetch_options(ticker, Some(*ts)).await {
                    Ok(result) => merge_blocks(&mut chain, result.options),
                    Err(e) => warn!(ticker, expiration = ts, error = %e, "Expiration fetch failed"),
                }
            }
        }

        Ok(chain)
    }

    fn name(&self) -> &str {
        PROVIDER_NAME
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
