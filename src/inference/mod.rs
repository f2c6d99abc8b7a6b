//! Inference clients and the retry loop around them.
//!
//! The [`InferenceClient`] trait abstracts one provider call; the retry
//! policy lives outside the clients, in [`infer_with_backoff`]. Two
//! implementations ship with the crate:
//!
//! ```text
//! Pipeline ──► infer_with_backoff() ──► InferenceClient::attempt()
//!                     │                          │
//!              classify + backoff      ┌─────────┴─────────┐
//!                                HttpInferenceClient  MockInferenceClient
//!                                chat completions     deterministic text
//! ```
//!
//! The mock client is selected at pipeline construction when no credential
//! is configured, so the surrounding stages can be exercised without a
//! provider.

pub mod backoff;
pub mod http;
pub mod mock;

pub use backoff::{BackoffConfig, JitterStrategy};
pub use http::HttpInferenceClient;
pub use mock::MockInferenceClient;

use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::warn;

use crate::error::{FailureClass, PipelineError, Result};
use crate::types::UsageStats;

/// Callback invoked after every provider attempt, successful or not.
///
/// Arguments: `(attempt_number, attempt_duration)`, attempt numbers
/// 1-indexed. The orchestrator uses this to feed the inference-latency
/// histogram and the per-invocation attempt count.
pub type AttemptCallback<'a> = Option<&'a mut (dyn FnMut(u32, Duration) + Send)>;

/// One model response: generated text plus provider token accounting.
#[derive(Debug, Clone)]
pub struct Inference {
    /// The generated text content.
    pub text: String,

    /// Token usage reported by the provider (all-zero in mock mode).
    pub usage: UsageStats,
}

/// Abstraction over inference providers.
///
/// An implementation performs exactly one provider call per
/// [`attempt`](InferenceClient::attempt); retry and backoff live in
/// [`infer_with_backoff`]. Object-safe, used as `Arc<dyn InferenceClient>`.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Execute one inference call. No retry inside.
    async fn attempt(&self, prompt: &str) -> Result<Inference>;

    /// Human-readable name for logging and diagnostics.
    fn name(&self) -> &'static str;
}

/// Execute an inference call with bounded retry and exponential backoff.
///
/// Failures are classified per attempt: temporary failures (timeouts,
/// connection errors, 429, 5xx) are retried up to `config.max_retries`
/// times with [`BackoffConfig::delay_for_attempt`] delays; permanent
/// failures (other 4xx) short-circuit immediately without consuming retry
/// budget. An exhausted budget surfaces the last temporary failure as
/// [`PipelineError::InferenceFailed`].
///
/// Returns the response and the number of attempts made (1 on first-try
/// success). `on_attempt` fires once per attempt with its duration.
pub async fn infer_with_backoff(
    client: &dyn InferenceClient,
    prompt: &str,
    config: &BackoffConfig,
    mut on_attempt: AttemptCallback<'_>,
) -> Result<(Inference, u32)> {
    let mut last_error: Option<PipelineError> = None;

    for attempt in 0..=config.max_retries {
        // Wait before each retry (not before the first attempt).
        if attempt > 0 {
            let delay = match &last_error {
                Some(PipelineError::Http {
                    retry_after: Some(ra),
                    ..
                }) if config.respect_retry_after => *ra,
                _ => config.delay_for_attempt(attempt - 1),
            };
            tokio::time::sleep(delay).await;
        }

        let started = Instant::now();
        let outcome = client.attempt(prompt).await;
        let elapsed = started.elapsed();

        if let Some(ref mut cb) = on_attempt {
            cb(attempt + 1, elapsed);
        }

        match outcome {
            Ok(inference) => return Ok((inference, attempt + 1)),
            Err(e) => match e.classify() {
                FailureClass::Temporary => {
                    warn!(
                        attempt = attempt + 1,
                        client = client.name(),
                        error = %e,
                        "temporary inference failure"
                    );
                    last_error = Some(e);
                }
                FailureClass::Permanent | FailureClass::Terminal => return Err(e),
            },
        }
    }

    let attempts = config.max_retries + 1;
    let message = last_error
        .map(|e| e.to_string())
        .unwrap_or_else(|| "retry loop exited without an error".to_string());
    Err(PipelineError::InferenceFailed { attempts, message })
}
