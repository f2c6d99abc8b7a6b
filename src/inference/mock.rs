//! Mock inference client for credential-less operation and tests.
//!
//! Selected automatically at pipeline construction when no API credential
//! is configured, so every other stage can be exercised without a provider.
//! The default mode synthesizes a deterministic response from the prompt;
//! canned-response mode returns pre-configured texts in order, for
//! downstream tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::{Inference, InferenceClient};
use crate::error::Result;
use crate::types::UsageStats;

/// Longest prompt prefix echoed back in synthesized responses.
const ECHO_LIMIT: usize = 50;

/// An inference client that never touches the network.
///
/// Usage stats are always zero. In deterministic mode the same prompt
/// always produces the same text; canned mode cycles through the
/// configured responses.
///
/// # Example
///
/// ```
/// use llm_middleware::inference::MockInferenceClient;
///
/// let mock = MockInferenceClient::fixed("Hello, world!");
/// ```
#[derive(Debug)]
pub struct MockInferenceClient {
    /// Canned responses; empty means deterministic synthesis from the prompt.
    responses: Vec<String>,
    index: AtomicUsize,
}

impl MockInferenceClient {
    /// Deterministic mode: synthesize the response from the prompt.
    pub fn deterministic() -> Self {
        Self {
            responses: Vec::new(),
            index: AtomicUsize::new(0),
        }
    }

    /// Canned mode: return the given responses in order, cycling when
    /// exhausted.
    pub fn new(responses: Vec<String>) -> Self {
        assert!(
            !responses.is_empty(),
            "canned MockInferenceClient requires at least one response"
        );
        Self {
            responses,
            index: AtomicUsize::new(0),
        }
    }

    /// Canned mode with a single response.
    pub fn fixed(response: impl Into<String>) -> Self {
        Self::new(vec![response.into()])
    }

    fn synthesize(prompt: &str) -> String {
        let prefix: String = prompt.chars().take(ECHO_LIMIT).collect();
        if prompt.chars().count() > ECHO_LIMIT {
            format!("[mock] response to: {}...", prefix)
        } else {
            format!("[mock] response to: {}", prefix)
        }
    }

    fn next_canned(&self) -> String {
        let idx = self.index.fetch_add(1, Ordering::Relaxed) % self.responses.len();
        self.responses[idx].clone()
    }
}

#[async_trait]
impl InferenceClient for MockInferenceClient {
    async fn attempt(&self, prompt: &str) -> Result<Inference> {
        let text = if self.responses.is_empty() {
            Self::synthesize(prompt)
        } else {
            self.next_canned()
        };

        Ok(Inference {
            text,
            usage: UsageStats::default(),
        })
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_deterministic_same_prompt_same_output() {
        let mock = MockInferenceClient::deterministic();
        let a = mock.attempt("Please respond to: hi").await.unwrap();
        let b = mock.attempt("Please respond to: hi").await.unwrap();
        assert_eq!(a.text, b.text);
        assert!(!a.text.is_empty());
    }

    #[tokio::test]
    async fn test_deterministic_zero_usage() {
        let mock = MockInferenceClient::deterministic();
        let inference = mock.attempt("anything").await.unwrap();
        assert_eq!(inference.usage, UsageStats::default());
    }

    #[tokio::test]
    async fn test_long_prompt_truncated_in_echo() {
        let mock = MockInferenceClient::deterministic();
        let prompt = "x".repeat(400);
        let inference = mock.attempt(&prompt).await.unwrap();
        assert!(inference.text.ends_with("..."));
        assert!(inference.text.len() < 100);
    }

    #[tokio::test]
    async fn test_canned_responses_cycle() {
        let mock = MockInferenceClient::new(vec!["first".into(), "second".into()]);
        assert_eq!(mock.attempt("p").await.unwrap().text, "first");
        assert_eq!(mock.attempt("p").await.unwrap().text, "second");
        assert_eq!(mock.attempt("p").await.unwrap().text, "first");
    }

    #[tokio::test]
    async fn test_fixed_response() {
        let mock = MockInferenceClient::fixed("Hello!");
        assert_eq!(mock.attempt("p").await.unwrap().text, "Hello!");
    }
}
