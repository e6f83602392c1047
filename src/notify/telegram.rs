//! Telegram Bot API notifier.
//!
//! Sends plain-text alerts to a single chat via `sendMessage`.
//!
//! API: `https://api.telegram.org/bot{token}/sendMessage`
//! Limit: 4096 characters per message.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::Notifier;

const API_BASE: &str = "https://api.telegram.org";
const MAX_MESSAGE_CHARS: usize = 4096;
const TRUNCATION_MARKER: &str = "\n…";

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: String,
    disable_web_page_preview: bool,
}

#[derive(Debug, Deserialize)]
struct SendMessageResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

pub struct TelegramNotifier {
    http: Client,
    bot_token: SecretString,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(bot_token: SecretString, chat_id: String) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .build()
            .context("Failed to build Telegram HTTP client")?;

        Ok(Self {
            http,
            bot_token,
            chat_id,
        })
    }

    fn endpoint(&self) -> String {
        format!("{API_BASE}/bot{}/sendMessage", self.bot_token.expose_secret())
    }
}

/// Length as Telegram counts it: characters, not bytes.
fn message_chars(text: &str) -> usize {
    text.chars().count()
}

/// Fit a message into Telegram's per-message limit.
fn fit_message(message: &str) -> String {
    if message_chars(message) <= MAX_MESSAGE_CHARS {
        return message.to_string();
    }
    let keep = MAX_MESSAGE_CHARS - message_chars(TRUNCATION_MARKER);
    let mut out: String = message.chars().take(keep).collect();
    out.push_str(TRUNCATION_MARKER);
    out
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, message: &str) -> Result<()> {
        let request = SendMessageRequest {
            chat_id: &self.chat_id,
            text: fit_message(message),
            disable_web_page_preview: true,
        };

        let resp = self
            .http
            .post(self.endpoint())
            .json(&request)
            .send()
            .await
            // reqwest errors embed the URL, which carries the token.
            .map_err(|e| anyhow::anyhow!("Telegram request failed: {}", e.without_url()))?;

        let status = resp.status();
        let body: SendMessageResponse = resp
            .json()
            .await
            .with_context(|| format!("Failed to parse Telegram response (HTTP {status})"))?;

        if !body.ok {
            anyhow::bail!(
                "Telegram rejected message (HTTP {status}): {}",
                body.description.unwrap_or_default()
            );
        }

        debug!(chat_id = %self.chat_id, chars = message_chars(&request.text), "Telegram message sent");
        Ok(())
    }

    fn name(&self) -> &str {
        "telegram"
    }
}
