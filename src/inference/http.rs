//! HTTP inference client for OpenAI-style chat-completions providers.
//!
//! One [`attempt`](super::InferenceClient::attempt) is one POST to the
//! configured endpoint with the configured per-attempt timeout. Non-success
//! statuses become [`PipelineError::Http`] so the retry loop can classify
//! them; the credential only ever travels in the `Authorization` header and
//! never appears in errors.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::{Inference, InferenceClient};
use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::types::UsageStats;

const SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// Client for OpenAI-style `/v1/chat/completions` endpoints.
pub struct HttpInferenceClient {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl HttpInferenceClient {
    /// Build a client from the pipeline configuration.
    ///
    /// The per-attempt timeout is baked into the underlying HTTP client.
    /// Fails with `InvalidConfig` when no credential is configured —
    /// credential-less operation belongs to
    /// [`MockInferenceClient`](super::MockInferenceClient).
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            PipelineError::InvalidConfig(
                "HttpInferenceClient requires an API credential".to_string(),
            )
        })?;

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(PipelineError::Request)?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key,
        })
    }

    /// Parse a Retry-After header value as seconds.
    fn parse_retry_after(value: &str) -> Option<Duration> {
        value.trim().parse::<u64>().ok().map(Duration::from_secs)
    }

    /// Extract the generated text and usage from a chat-completions response.
    fn parse_response(body: &Value) -> Result<Inference> {
        let text = body
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|choice| choice.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                PipelineError::Other("provider response has no choices[0].message.content".into())
            })?
            .to_string();

        let usage: UsageStats = body
            .get("usage")
            .cloned()
            .map(serde_json::from_value)
            .transpose()?
            .unwrap_or_default();

        Ok(Inference { text, usage })
    }
}

#[async_trait]
impl InferenceClient for HttpInferenceClient {
    async fn attempt(&self, prompt: &str) -> Result<Inference> {
        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": prompt},
            ],
        });

        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let retry_after = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(Self::parse_retry_after);
            let text = resp.text().await.unwrap_or_default();
            return Err(PipelineError::Http {
                status: status.as_u16(),
                body: text,
                retry_after,
            });
        }

        let json_resp: Value = resp.json().await?;
        Self::parse_response(&json_resp)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

impl std::fmt::Debug for HttpInferenceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // api_key deliberately omitted
        f.debug_struct("HttpInferenceClient")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .finish()
    }
}
