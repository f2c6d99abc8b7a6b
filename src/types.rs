use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ErrorKind, PipelineError};

/// Per-invocation request state.
///
/// Created by [`Pipeline::process`](crate::Pipeline::process), transformed by
/// pre-hooks, and discarded when the call returns. The `context` map is
/// free-form: string keys, arbitrary JSON values, available to templates as
/// `{key}` placeholders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestContext {
    /// The raw input text, exactly as the caller supplied it.
    pub input_text: String,

    /// Free-form context values for template interpolation.
    pub context: HashMap<String, Value>,

    /// Template requested for this invocation, if any.
    pub template_name: Option<String>,
}

impl RequestContext {
    pub fn new(input_text: impl Into<String>) -> Self {
        Self {
            input_text: input_text.into(),
            context: HashMap::new(),
            template_name: None,
        }
    }

    /// Replace the whole context map.
    pub fn with_context(mut self, context: HashMap<String, Value>) -> Self {
        self.context = context;
        self
    }

    /// Insert a single context value.
    pub fn insert(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Select a template by name.
    pub fn with_template(mut self, name: impl Into<String>) -> Self {
        self.template_name = Some(name.into());
        self
    }
}

/// Token accounting returned by the inference provider.
///
/// All-zero in mock mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageStats {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

/// One step of the fixed pipeline sequence.
///
/// Used both as the key space for [`StageTiming`] and as the
/// stage-at-failure marker on [`PipelineFailure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    PreHooks,
    Preprocess,
    ComposePrompt,
    Infer,
    Postprocess,
    PostHooks,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::PreHooks => "pre_hooks",
            PipelineStage::Preprocess => "preprocess",
            PipelineStage::ComposePrompt => "compose_prompt",
            PipelineStage::Infer => "infer",
            PipelineStage::Postprocess => "postprocess",
            PipelineStage::PostHooks => "post_hooks",
        }
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-stage elapsed time for a single invocation.
///
/// Never reused across requests. The inference stage additionally records
/// how many provider attempts the retry loop made.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StageTiming {
    durations: HashMap<String, Duration>,

    /// Provider attempts made by the retry loop (1 on first-try success).
    pub inference_attempts: u32,
}

impl StageTiming {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the elapsed time for a stage.
    pub fn record(&mut self, stage: PipelineStage, elapsed: Duration) {
        self.durations.insert(stage.as_str().to_string(), elapsed);
    }

    /// Elapsed time for a stage, if it ran.
    pub fn get(&self, stage: PipelineStage) -> Option<Duration> {
        self.durations.get(stage.as_str()).copied()
    }

    /// Sum of all recorded stage durations.
    pub fn total(&self) -> Duration {
        self.durations.values().sum()
    }

    /// Number of stages that recorded a duration.
    pub fn len(&self) -> usize {
        self.durations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.durations.is_empty()
    }
}

/// The terminal value of a successful `process` call.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    /// Postprocessed model output.
    pub final_output: String,

    /// The input exactly as the caller supplied it, before normalization.
    pub original_input: String,

    /// The context map after pre-hooks ran.
    pub context: HashMap<String, Value>,

    /// Token accounting from the provider (all-zero in mock mode).
    pub usage: UsageStats,

    /// Per-stage elapsed time for this invocation.
    pub timings: StageTiming,

    /// Wall-clock time the result was assembled.
    pub generated_at: DateTime<Utc>,
}

/// Structured failure payload for a `process` call.
///
/// Every stage-level error is converted into this shape so the transport
/// layer never sees an unstructured fault. Carries an error kind, a
/// human-readable message, and the stage at which the pipeline stopped;
/// never credentials or backtraces.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineFailure {
    /// Always `"failed"`; mirrors the wire shape the transport layer emits.
    pub status: &'static str,

    /// Machine-readable error kind.
    pub kind: ErrorKind,

    /// Human-readable description.
    pub message: String,

    /// The stage that was executing when the error occurred.
    pub stage: PipelineStage,
}

impl PipelineFailure {
    pub(crate) fn new(stage: PipelineStage, error: &PipelineError) -> Self {
        Self {
            status: "failed",
            kind: error.kind(),
            message: error.to_string(),
            stage,
        }
    }
}

impl std::fmt::Display for PipelineFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "pipeline failed at {}: {}", self.stage, self.message)
    }
}

impl std::error::Error for PipelineFailure {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_context_builder() {
        let ctx = RequestContext::new("hello")
            .insert("tone", "polite")
            .insert("attempts", json!(3))
            .with_template("greet");

        assert_eq!(ctx.input_text, "hello");
        assert_eq!(ctx.context["tone"], json!("polite"));
        assert_eq!(ctx.context["attempts"], json!(3));
        assert_eq!(ctx.template_name.as_deref(), Some("greet"));
    }

    #[test]
    fn test_stage_timing_record_and_total() {
        let mut timing = StageTiming::new();
        timing.record(PipelineStage::Preprocess, Duration::from_millis(2));
        timing.record(PipelineStage::Infer, Duration::from_millis(40));

        assert_eq!(
            timing.get(PipelineStage::Preprocess),
            Some(Duration::from_millis(2))
        );
        assert_eq!(timing.get(PipelineStage::Postprocess), None);
        assert_eq!(timing.total(), Duration::from_millis(42));
        assert_eq!(timing.len(), 2);
    }

    #[test]
    fn test_usage_stats_default_is_zero() {
        let usage = UsageStats::default();
        assert_eq!(usage.prompt_tokens, 0);
        assert_eq!(usage.completion_tokens, 0);
        assert_eq!(usage.total_tokens, 0);
    }

    #[test]
    fn test_usage_stats_deserializes_partial_payload() {
        let usage: UsageStats = serde_json::from_value(json!({"prompt_tokens": 12})).unwrap();
        assert_eq!(usage.prompt_tokens, 12);
        assert_eq!(usage.completion_tokens, 0);
    }

    #[test]
    fn test_failure_payload_shape() {
        let err = PipelineError::Validation("input is empty".into());
        let failure = PipelineFailure::new(PipelineStage::Preprocess, &err);

        assert_eq!(failure.status, "failed");
        assert_eq!(failure.kind, ErrorKind::Validation);
        assert_eq!(failure.stage, PipelineStage::Preprocess);

        let wire = serde_json::to_value(&failure).unwrap();
        assert_eq!(wire["status"], "failed");
        assert_eq!(wire["kind"], "validation");
        assert_eq!(wire["stage"], "preprocess");
    }
}
