//! Language-model access: prompt, client and retry policy.

pub mod client;
pub mod prompt;
pub mod retry;

pub use client::{OpenRouterClient, parse_completion};
pub use prompt::{SCHEMA_DESCRIPTION, build_prompt};
pub use retry::{RetryPolicy, Retryable};

use crate::error::LlmResult;
use async_trait::async_trait;

/// Turns a natural-language question into raw model output.
///
/// The returned text is untrusted: it may contain prose, markdown fences or
/// no SQL at all, and must go through [`crate::security::guard`] before use.
#[async_trait]
pub trait SqlGenerator: Send + Sync {
    async fn generate(&self, question: &str) -> LlmResult<String>;
}
