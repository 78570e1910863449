use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use anyhow::Context;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::core::config::{LlmSettings, ProviderSettings};
use crate::core::metrics;

const MAX_RETRIES: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct ChatMessage {
    pub(crate) role: Role,
    pub(crate) content: String,
}

impl ChatMessage {
    pub(crate) fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub(crate) fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub(crate) fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

#[derive(Debug, Error)]
pub(crate) enum LlmError {
    #[error("{0} provider has no API key configured")]
    NotConfigured(&'static str),
    #[error("request to {provider} failed: {source}")]
    Transport {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{provider} returned {status}: {body}")]
    Api { provider: &'static str, status: StatusCode, body: String },
    #[error("{0} response had no message content")]
    MissingContent(&'static str),
    #[error("speech request cancelled")]
    Cancelled,
}

/// Client for one OpenAI-compatible provider.
#[derive(Debug, Clone)]
pub(crate) struct LlmClient {
    client: Client,
    provider: &'static str,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f64,
    max_tokens: u32,
}

impl LlmClient {
    pub(crate) fn new(provider: &ProviderSettings, llm: &LlmSettings) -> anyhow::Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .timeout(Duration::from_secs(llm.request_timeout_seconds))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            provider: provider.name,
            api_key: provider.api_key.clone(),
            base_url: provider.base_url.trim_end_matches('/').to_string(),
            model: provider.model.clone(),
            temperature: llm.temperature,
            max_tokens: llm.max_tokens,
        })
    }

    pub(crate) fn provider(&self) -> &'static str {
        self.provider
    }

    pub(crate) fn model(&self) -> &str {
        &self.model
    }

    fn ensure_configured(&self) -> Result<(), LlmError> {
        if self.api_key.is_empty() {
            return Err(LlmError::NotConfigured(self.provider));
        }
        Ok(())
    }

    /// One chat completion. Retries transport errors, 429 and 5xx with exponential backoff.
    pub(crate) async fn complete(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
        self.ensure_configured()?;

        let timer = Instant::now();
        let payload = chat_payload(&self.model, messages, self.temperature, self.max_tokens);
        let url = format!("{}/chat/completions", self.base_url);

        tracing::debug!(
            provider = self.provider,
            model = %self.model,
            messages = messages.len(),
            "Sending chat completion request"
        );

        let result = self.post_with_retries(&url, &payload).await.and_then(|body| {
            extract_content(&body).ok_or(LlmError::MissingContent(self.provider))
        });

        let outcome = if result.is_ok() { "ok" } else { "error" };
        metrics::record_llm_request(self.provider, outcome, timer.elapsed());

        match &result {
            Ok(_) => tracing::info!(
                provider = self.provider,
                duration_ms = timer.elapsed().as_millis() as u64,
                "Chat completion finished"
            ),
            Err(err) => tracing::warn!(provider = self.provider, error = %err, "Chat completion failed"),
        }

        result
    }

    async fn post_with_retries(&self, url: &str, payload: &Value) -> Result<Value, LlmError> {
        let mut attempt = 0;
        loop {
            let error = match self.client.post(url).bearer_auth(&self.api_key).json(payload).send().await
            {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        return resp.json::<Value>().await.map_err(|source| LlmError::Transport {
                            provider: self.provider,
                            source,
                        });
                    }
                    let body = resp.text().await.unwrap_or_default();
                    LlmError::Api { provider: self.provider, status, body }
                }
                Err(source) => LlmError::Transport { provider: self.provider, source },
            };

            if attempt >= MAX_RETRIES || !is_retryable(&error) {
                return Err(error);
            }

            tracing::debug!(provider = self.provider, attempt, error = %error, "Retrying LLM request");
            tokio::time::sleep(Duration::from_secs(2_u64.pow(attempt))).await;
            attempt += 1;
        }
    }

    /// Synthesizes `input` to audio. Checks `cancel` between response chunks.
    pub(crate) async fn speech(
        &self,
        model: &str,
        voice: &str,
        input: &str,
        cancel: &AtomicBool,
    ) -> Result<Vec<u8>, LlmError> {
        self.ensure_configured()?;
        if cancel.load(Ordering::Relaxed) {
            return Err(LlmError::Cancelled);
        }

        let url = format!("{}/audio/speech", self.base_url);
        let payload = json!({
            "model": model,
            "voice": voice,
            "input": input,
            "response_format": "mp3",
        });

        let mut response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|source| LlmError::Transport { provider: self.provider, source })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api { provider: self.provider, status, body });
        }
        if cancel.load(Ordering::Relaxed) {
            return Err(LlmError::Cancelled);
        }

        let mut audio = Vec::new();
        loop {
            if cancel.load(Ordering::Relaxed) {
                return Err(LlmError::Cancelled);
            }
            match response.chunk().await {
                Ok(Some(chunk)) => audio.extend_from_slice(&chunk),
                Ok(None) => break,
                Err(source) => return Err(LlmError::Transport { provider: self.provider, source }),
            }
        }

        Ok(audio)
    }
}

fn chat_payload(model: &str, messages: &[ChatMessage], temperature: f64, max_tokens: u32) -> Value {
    json!({
        "model": model,
        "messages": messages,
        "temperature": temperature,
        "max_tokens": max_tokens,
    })
}

fn extract_content(body: &Value) -> Option<String> {
    body.get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(|value| value.as_str())
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty())
}

fn is_retryable(error: &LlmError) -> bool {
    match error {
        LlmError::Transport { .. } => true,
        LlmError::Api { status, .. } => {
            *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
        }
        _ => false,
    }
}
