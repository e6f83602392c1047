//! Anthropic Claude LLM integration.
//!
//! Implements the `Narrator` trait using the Anthropic Messages API.
//! Handles prompt framing, response extraction, and rate limiting with
//! exponential backoff.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::Narrator;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
const DEFAULT_MAX_TOKENS: u32 = 512;

/// Maximum retries on rate limit / server errors.
const MAX_RETRIES: u32 = 3;

/// Base delay for exponential backoff (ms).
const BASE_BACKOFF_MS: u64 = 1000;

/// Commentary longer than this is cut before it reaches a chat message.
pub(crate) const MAX_NARRATIVE_CHARS: usize = 3000;

// ---------------------------------------------------------------------------
// API types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct AnthropicClient {
    http: Client,
    api_key: SecretString,
    model: String,
    max_tokens: u32,
}

impl AnthropicClient {
    pub fn new(api_key: SecretString, model: Option<String>, max_tokens: Option<u32>) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .context("Failed to build Anthropic HTTP client")?;

        Ok(Self {
            http,
            api_key,
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            max_tokens: max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        })
    }

    /// System prompt framing every commentary request.
    pub fn system_prompt() -> &'static str {
        "You are a concise equity and options market commentator. \
         You are given a paper trade or option opportunity that a simple \
         rules-based monitor just flagged. Give a short, balanced outlook: \
         the key drivers, the main risks, and what would change the view. \
         Keep it under 200 words. This is simulated trading, not advice."
    }

    /// Send a messages request with retry + backoff. Returns text and total tokens.
    async fn call_api(&self, system: &str, user_message: &str) -> Result<(String, u32)> {
        let request = MessagesRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            messages: vec![Message {
                role: "user".to_string(),
                content: user_message.to_string(),
            }],
            system: Some(system.to_string()),
        };

        let mut last_error = None;

        for attempt in 0..=MAX_RETRIES {
            if attempt > 0 {
                let delay = BASE_BACKOFF_MS * 2u64.pow(attempt - 1);
                debug!(attempt, delay_ms = delay, "Retrying Anthropic API call");
                tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
            }

            let resp = self
                .http
                .post(ANTHROPIC_API_URL)
                .header("x-api-key", self.api_key.expose_secret())
                .header("anthropic-version", ANTHROPIC_VERSION)
                .header("content-type", "application/json")
                .json(&request)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let body: MessagesResponse = response
                            .json()
                            .await
                            .context("Failed to parse Anthropic response")?;
                        let tokens = body
                            .usage
                            .as_ref()
                            .map_or(0, |u| u.input_tokens + u.output_tokens);
                        return Ok((extract_text(&body), tokens));
                    }

                    // Retryable errors: 429 (rate limit), 500+, 529 (overloaded)
                    if status.as_u16() == 429 || status.as_u16() >= 500 {
                        let error_text = response.text().await.unwrap_or_default();
                        warn!(status = %status, attempt, error = %error_text, "Retryable Anthropic API error");
                        last_error = Some(format!("HTTP {status}: {error_text}"));
                        continue;
                    }

                    let error_text = response.text().await.unwrap_or_default();
                    anyhow::bail!("Anthropic API error {status}: {error_text}");
                }
                Err(e) => {
                    warn!(attempt, error = %e, "Anthropic request failed");
                    last_error = Some(format!("Request error: {e}"));
                    continue;
                }
            }
        }

        anyhow::bail!(
            "Anthropic API failed after {} retries: {}",
            MAX_RETRIES,
            last_error.unwrap_or_default()
        )
    }
}

/// Concatenate the text blocks of a response.
fn extract_text(body: &MessagesResponse) -> String {
    body.content
        .iter()
        .filter_map(|b| b.text.as_deref())
        .collect::<Vec<_>>()
        .join("")
}

/// Trim commentary and cap its length on a char boundary.
pub(crate) fn tidy_narrative(text: &str) -> String {
    let text = text.trim();
    if text.chars().count() <= MAX_NARRATIVE_CHARS {
        return text.to_string();
    }
    let cut: String = text.chars().take(MAX_NARRATIVE_CHARS).collect();
    format!("{cut}...[truncated]")
}

// ---------------------------------------------------------------------------
// Narrator implementation
// ---------------------------------------------------------------------------

#[async_trait]
impl Narrator for AnthropicClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        debug!(model = %self.model, "Requesting commentary");

        let (text, tokens) = self
            .call_api(Self::system_prompt(), prompt)
            .await
            .context("Anthropic API call failed")?;

        if text.trim().is_empty() {
            anyhow::bail!("Anthropic returned an empty response");
        }

        info!(model = %self.model, tokens, "Commentary generated");
        Ok(tidy_narrative(&text))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
