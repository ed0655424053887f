//! OpenRouter chat-completions client.

use crate::config::Settings;
use crate::error::{LlmError, LlmResult, preview};
use crate::llm::SqlGenerator;
use crate::llm::prompt::{SYSTEM_MESSAGE, build_prompt};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument};

/// Characters of an error response body kept in [`LlmError::Status`].
const ERROR_BODY_CHARS: usize = 200;

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

/// Language-model client for the OpenRouter API.
pub struct OpenRouterClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    timeout: Duration,
}

impl OpenRouterClient {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> LlmResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::Request(e.to_string()))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            base_url: base_url.into(),
            timeout,
        })
    }

    pub fn from_settings(settings: &Settings) -> LlmResult<Self> {
        Self::new(
            settings.openrouter_api_key.clone(),
            settings.openrouter_model.clone(),
            settings.openrouter_base_url.clone(),
            settings.llm_timeout,
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    /// One request. Retries belong to the caller.
    async fn complete(&self, prompt: &str) -> LlmResult<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_MESSAGE,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: 0.0,
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                status: status.as_u16(),
                body: preview(&body, ERROR_BODY_CHARS),
            });
        }

        let data: Value = response
            .json()
            .await
            .map_err(|e| self.map_transport_error(e))?;
        parse_completion(&data)
    }

    fn map_transport_error(&self, e: reqwest::Error) -> LlmError {
        if e.is_timeout() {
            LlmError::Timeout(self.timeout.as_millis() as u64)
        } else if e.is_decode() {
            LlmError::InvalidResponse(e.to_string().into())
        } else {
            LlmError::Request(e.to_string())
        }
    }
}

#[async_trait]
impl SqlGenerator for OpenRouterClient {
    #[instrument(skip(self, question), fields(model = %self.model))]
    async fn generate(&self, question: &str) -> LlmResult<String> {
        let prompt = build_prompt(question);
        let raw = self.complete(&prompt).await?;
        debug!("LLM returned {} characters", raw.len());
        Ok(raw)
    }
}

/// Pull `choices[0].message.content` out of a chat-completions response.
pub fn parse_completion(data: &Value) -> LlmResult<String> {
    let content = data
        .pointer("/choices/0/message/content")
        .ok_or(LlmError::InvalidResponse(
            "missing choices[0].message.content".into(),
        ))?
        .as_str()
        .ok_or(LlmError::InvalidResponse("content is not a string".into()))?;

    if content.trim().is_empty() {
        return Err(LlmError::EmptyCompletion);
    }
    Ok(content.to_string())
}
