//! LLM integration for trade commentary.
//!
//! Defines the `Narrator` trait and provides implementations for
//! Claude (Anthropic), GPT-4o (OpenAI) and Gemini (Google).

pub mod anthropic;
pub mod gemini;
pub mod openai;

use anyhow::Result;
use async_trait::async_trait;

/// Abstraction over narrative generators.
///
/// Implementors turn a prompt describing a paper trade or an options
/// opportunity into free-text commentary for the alert.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Narrator: Send + Sync {
    /// Generate commentary for a single prompt.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Model identifier string.
    fn model_name(&self) -> &str;
}
