//! The pipeline orchestrator.
//!
//! [`Pipeline`] owns the fixed stage sequence and is the only component
//! aware of it:
//!
//! ```text
//! START → PRE_HOOKS → PREPROCESS → COMPOSE_PROMPT → INFER (retry loop)
//!       → POSTPROCESS → POST_HOOKS → DONE
//! ```
//!
//! Every stage transition is timed into [`StageTiming`]; `requests_total`
//! is incremented on entry and exactly one of `success_total` /
//! `failure_total` on exit. Stage errors never escape raw: they are
//! converted into a [`PipelineFailure`] carrying the stage at failure.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::hooks::{HookChain, PostHook, PreHook};
use crate::inference::{
    infer_with_backoff, HttpInferenceClient, InferenceClient, MockInferenceClient,
};
use crate::metrics::PipelineMetrics;
use crate::template::{self, TemplateRegistry};
use crate::types::{PipelineFailure, PipelineResult, PipelineStage, RequestContext, StageTiming};

/// Orchestrates one `process` call through the fixed stage sequence.
///
/// Re-entrant: concurrent calls share only the read-only configuration,
/// the template registry, the hook chain (immutable after construction)
/// and the thread-safe metrics recorder.
///
/// # Example
///
/// ```no_run
/// use llm_middleware::{Pipeline, PipelineConfig, TemplateRegistry};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut templates = TemplateRegistry::new("default");
///     templates.register("default", "Please respond to: {user_input}");
///
///     // No credential configured: the pipeline runs in mock mode.
///     let pipeline = Pipeline::builder(PipelineConfig::default())
///         .templates(templates)
///         .build()?;
///
///     let result = pipeline.process("hi", None, None).await?;
///     println!("{}", result.final_output);
///     Ok(())
/// }
/// ```
pub struct Pipeline {
    config: Arc<PipelineConfig>,
    templates: TemplateRegistry,
    hooks: HookChain,
    inference: Arc<dyn InferenceClient>,
    metrics: Arc<PipelineMetrics>,
}

impl Pipeline {
    /// Create a new pipeline builder.
    pub fn builder(config: PipelineConfig) -> PipelineBuilder {
        PipelineBuilder::new(config)
    }

    /// Build a pipeline with defaults derived from the configuration.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        Self::builder(config).build()
    }

    /// The shared configuration snapshot.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The injected metrics recorder (for export and tests).
    pub fn metrics(&self) -> &Arc<PipelineMetrics> {
        &self.metrics
    }

    /// Run the complete pipeline for one input.
    ///
    /// Returns the assembled [`PipelineResult`], or a structured
    /// [`PipelineFailure`] naming the stage that failed. Never panics on
    /// stage errors and never leaks credentials into failure payloads.
    pub async fn process(
        &self,
        input_text: impl Into<String>,
        context: Option<HashMap<String, Value>>,
        template_name: Option<&str>,
    ) -> std::result::Result<PipelineResult, PipelineFailure> {
        let pipeline_start = Instant::now();
        self.metrics.record_request();

        let original_input = input_text.into();
        info!(input = %preview(&original_input), "processing request");

        let outcome = self
            .run_stages(&original_input, context, template_name)
            .await;
        self.metrics
            .observe_pipeline_latency(pipeline_start.elapsed());

        match outcome {
            Ok(result) => {
                self.metrics.record_success();
                info!(
                    elapsed_ms = pipeline_start.elapsed().as_millis() as u64,
                    "processing completed"
                );
                Ok(result)
            }
            Err((stage, err)) => {
                self.metrics.record_failure();
                error!(stage = %stage, error = %err, "pipeline failed");
                Err(PipelineFailure::new(stage, &err))
            }
        }
    }

    /// The linear stage sequence; the first error exits with its stage.
    async fn run_stages(
        &self,
        original_input: &str,
        context: Option<HashMap<String, Value>>,
        template_name: Option<&str>,
    ) -> std::result::Result<PipelineResult, (PipelineStage, PipelineError)> {
        let mut timings = StageTiming::new();

        // PRE_HOOKS
        let started = Instant::now();
        let mut ctx = RequestContext::new(original_input)
            .with_context(context.unwrap_or_default());
        if let Some(name) = template_name {
            ctx = ctx.with_template(name);
        }
        let ctx = self
            .hooks
            .run_pre(ctx)
            .map_err(|e| (PipelineStage::PreHooks, e))?;
        timings.record(PipelineStage::PreHooks, started.elapsed());

        // PREPROCESS
        let started = Instant::now();
        let normalized = self
            .preprocess(&ctx.input_text)
            .map_err(|e| (PipelineStage::Preprocess, e))?;
        timings.record(PipelineStage::Preprocess, started.elapsed());
        debug!(input = %preview(&normalized), "preprocessed input");

        // COMPOSE_PROMPT
        let started = Instant::now();
        let prompt = self
            .compose(&normalized, &ctx)
            .map_err(|e| (PipelineStage::ComposePrompt, e))?;
        timings.record(PipelineStage::ComposePrompt, started.elapsed());
        debug!(prompt = %preview(&prompt), "composed prompt");

        // INFER
        let started = Instant::now();
        let metrics = Arc::clone(&self.metrics);
        let mut attempts = 0u32;
        let mut on_attempt = |attempt: u32, elapsed: Duration| {
            attempts = attempt;
            metrics.observe_inference_latency(elapsed);
        };
        let outcome = infer_with_backoff(
            self.inference.as_ref(),
            &prompt,
            &self.config.backoff,
            Some(&mut on_attempt),
        )
        .await;
        timings.inference_attempts = attempts;
        timings.record(PipelineStage::Infer, started.elapsed());
        let (inference, _) = outcome.map_err(|e| (PipelineStage::Infer, e))?;

        // POSTPROCESS
        let started = Instant::now();
        let mut final_output = inference.text;
        if self.config.uppercase_output {
            final_output = final_output.to_uppercase();
        }
        self.metrics.record_token_usage(&inference.usage);
        if inference.usage.total_tokens > 0 {
            info!(
                prompt_tokens = inference.usage.prompt_tokens,
                completion_tokens = inference.usage.completion_tokens,
                total_tokens = inference.usage.total_tokens,
                "token usage"
            );
        }
        timings.record(PipelineStage::Postprocess, started.elapsed());

        // POST_HOOKS
        let started = Instant::now();
        let result = PipelineResult {
            final_output,
            original_input: original_input.to_string(),
            context: ctx.context,
            usage: inference.usage,
            timings,
            generated_at: Utc::now(),
        };
        let mut result = self
            .hooks
            .run_post(result)
            .map_err(|e| (PipelineStage::PostHooks, e))?;
        result
            .timings
            .record(PipelineStage::PostHooks, started.elapsed());

        Ok(result)
    }

    /// Normalize the input per configuration; empty results are rejected
    /// before any network activity.
    fn preprocess(&self, input: &str) -> Result<String> {
        let mut processed = if self.config.strip_input {
            input.trim().to_string()
        } else {
            input.to_string()
        };

        if self.config.lowercase_input {
            processed = processed.to_lowercase();
        }

        if processed.trim().is_empty() {
            return Err(PipelineError::Validation(
                "input is empty after normalization".to_string(),
            ));
        }

        Ok(processed)
    }

    /// Resolve the template and substitute the input and context values.
    fn compose(&self, input: &str, ctx: &RequestContext) -> Result<String> {
        let template = self.templates.resolve(ctx.template_name.as_deref())?;
        template::render(template, input, &ctx.context, self.config.placeholders)
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("model", &self.config.model)
            .field("inference", &self.inference.name())
            .field("templates", &self.templates.len())
            .field("pre_hooks", &self.hooks.pre_len())
            .field("post_hooks", &self.hooks.post_len())
            .finish()
    }
}

/// Builder for [`Pipeline`].
///
/// Defaults: templates loaded from the configured directory, the inference
/// client selected by credential presence (mock without one), and a fresh
/// metrics recorder. Tests typically inject all three.
pub struct PipelineBuilder {
    config: PipelineConfig,
    templates: Option<TemplateRegistry>,
    hooks: HookChain,
    inference: Option<Arc<dyn InferenceClient>>,
    metrics: Option<Arc<PipelineMetrics>>,
}

impl PipelineBuilder {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            templates: None,
            hooks: HookChain::new(),
            inference: None,
            metrics: None,
        }
    }

    /// Use a pre-built template registry instead of scanning the
    /// configured directory.
    pub fn templates(mut self, templates: TemplateRegistry) -> Self {
        self.templates = Some(templates);
        self
    }

    /// Append a pre-hook. Registration order is execution order.
    pub fn add_pre_hook(mut self, hook: Box<dyn PreHook>) -> Self {
        self.hooks.add_pre(hook);
        self
    }

    /// Append a post-hook. Registration order is execution order.
    pub fn add_post_hook(mut self, hook: Box<dyn PostHook>) -> Self {
        self.hooks.add_post(hook);
        self
    }

    /// Override the inference client (tests, custom providers).
    pub fn inference_client(mut self, client: Arc<dyn InferenceClient>) -> Self {
        self.inference = Some(client);
        self
    }

    /// Inject a shared metrics recorder.
    pub fn metrics(mut self, metrics: Arc<PipelineMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Build the pipeline, selecting the inference client by credential
    /// presence unless one was injected.
    pub fn build(self) -> Result<Pipeline> {
        let templates = self.templates.unwrap_or_else(|| {
            TemplateRegistry::from_dir(&self.config.template_dir, &self.config.default_template)
        });

        let inference: Arc<dyn InferenceClient> = match self.inference {
            Some(client) => client,
            None if self.config.is_mock_mode() => {
                warn!("no API credential configured, inference runs in mock mode");
                Arc::new(MockInferenceClient::deterministic())
            }
            None => Arc::new(HttpInferenceClient::new(&self.config)?),
        };

        info!(
            model = %self.config.model,
            inference = inference.name(),
            templates = templates.len(),
            "pipeline initialized"
        );

        Ok(Pipeline {
            config: Arc::new(self.config),
            templates,
            hooks: self.hooks,
            inference,
            metrics: self.metrics.unwrap_or_default(),
        })
    }
}

/// First 50 characters, for log lines.
fn preview(text: &str) -> String {
    if text.chars().count() > 50 {
        let prefix: String = text.chars().take(50).collect();
        format!("{}...", prefix)
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::hooks::{FnPostHook, FnPreHook};
    use crate::inference::{BackoffConfig, Inference};
    use crate::types::UsageStats;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Records every prompt it receives and answers with a fixed text.
    struct CapturingClient {
        prompts: Mutex<Vec<String>>,
        reply: String,
        usage: UsageStats,
    }

    impl CapturingClient {
        fn new(reply: impl Into<String>) -> Self {
            Self {
                prompts: Mutex::new(Vec::new()),
                reply: reply.into(),
                usage: UsageStats::default(),
            }
        }

        fn with_usage(mut self, usage: UsageStats) -> Self {
            self.usage = usage;
            self
        }

        fn last_prompt(&self) -> Option<String> {
            self.prompts.lock().unwrap().last().cloned()
        }
    }

    #[async_trait]
    impl InferenceClient for CapturingClient {
        async fn attempt(&self, prompt: &str) -> Result<Inference> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(Inference {
                text: self.reply.clone(),
                usage: self.usage,
            })
        }

        fn name(&self) -> &'static str {
            "capturing"
        }
    }

    /// Fails the first `failures` attempts with `status`, then succeeds.
    struct FlakyClient {
        failures: u32,
        status: u16,
        calls: AtomicU32,
    }

    impl FlakyClient {
        fn new(failures: u32, status: u16) -> Self {
            Self {
                failures,
                status,
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl InferenceClient for FlakyClient {
        async fn attempt(&self, _prompt: &str) -> Result<Inference> {
            if self.calls.fetch_add(1, Ordering::Relaxed) < self.failures {
                Err(PipelineError::Http {
                    status: self.status,
                    body: "flaky".into(),
                    retry_after: None,
                })
            } else {
                Ok(Inference {
                    text: "recovered".into(),
                    usage: UsageStats::default(),
                })
            }
        }

        fn name(&self) -> &'static str {
            "flaky"
        }
    }

    fn test_templates() -> TemplateRegistry {
        let mut templates = TemplateRegistry::new("default");
        templates.register("default", "Please respond to: {user_input}");
        templates.register("toned", "{user_input} in a {tone} tone");
        templates
    }

    fn fast_config() -> PipelineConfig {
        let backoff = BackoffConfig::standard().with_base_delay(Duration::from_millis(1));
        PipelineConfig::default().with_backoff(backoff)
    }

    fn mock_pipeline() -> Pipeline {
        Pipeline::builder(fast_config())
            .templates(test_templates())
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_mock_mode_end_to_end() {
        let pipeline = mock_pipeline();
        let result = pipeline.process("hi", None, None).await.unwrap();

        assert_eq!(result.original_input, "hi");
        assert!(!result.final_output.is_empty());
        assert_eq!(result.usage, UsageStats::default());
        assert_eq!(result.timings.inference_attempts, 1);
        for stage in [
            PipelineStage::PreHooks,
            PipelineStage::Preprocess,
            PipelineStage::ComposePrompt,
            PipelineStage::Infer,
            PipelineStage::Postprocess,
            PipelineStage::PostHooks,
        ] {
            assert!(result.timings.get(stage).is_some(), "missing {}", stage);
        }
    }

    #[tokio::test]
    async fn test_mock_mode_is_deterministic() {
        let pipeline = mock_pipeline();
        let a = pipeline.process("hi", None, None).await.unwrap();
        let b = pipeline.process("hi", None, None).await.unwrap();
        assert_eq!(a.final_output, b.final_output);
    }

    #[tokio::test]
    async fn test_empty_input_fails_validation_without_network() {
        let pipeline = mock_pipeline();

        for input in ["", "   ", "\n\t "] {
            let failure = pipeline.process(input, None, None).await.unwrap_err();
            assert_eq!(failure.kind, ErrorKind::Validation);
            assert_eq!(failure.stage, PipelineStage::Preprocess);
        }

        // Zero inference attempts were made.
        assert_eq!(pipeline.metrics().inference_latency_count(), 0);
        assert_eq!(pipeline.metrics().failure_total(), 3);
    }

    #[tokio::test]
    async fn test_prompt_composition_with_normalization() {
        let client = Arc::new(CapturingClient::new("reply"));
        let pipeline = Pipeline::builder(fast_config())
            .templates(test_templates())
            .inference_client(client.clone())
            .build()
            .unwrap();

        pipeline.process("  HELLO There  ", None, None).await.unwrap();
        assert_eq!(
            client.last_prompt().unwrap(),
            "Please respond to: hello there"
        );
    }

    #[tokio::test]
    async fn test_normalization_flags_can_be_disabled() {
        let client = Arc::new(CapturingClient::new("reply"));
        let config = fast_config()
            .with_strip_input(false)
            .with_lowercase_input(false);
        let pipeline = Pipeline::builder(config)
            .templates(test_templates())
            .inference_client(client.clone())
            .build()
            .unwrap();

        pipeline.process(" KEEP Me ", None, None).await.unwrap();
        assert_eq!(client.last_prompt().unwrap(), "Please respond to:  KEEP Me ");
    }

    #[tokio::test]
    async fn test_context_interpolation() {
        let client = Arc::new(CapturingClient::new("reply"));
        let pipeline = Pipeline::builder(fast_config())
            .templates(test_templates())
            .inference_client(client.clone())
            .build()
            .unwrap();

        let mut context = HashMap::new();
        context.insert("tone".to_string(), json!("polite"));

        let result = pipeline
            .process("hello", Some(context), Some("toned"))
            .await
            .unwrap();

        assert_eq!(client.last_prompt().unwrap(), "hello in a polite tone");
        assert_eq!(result.context["tone"], json!("polite"));
    }

    #[tokio::test]
    async fn test_unknown_template_falls_back_to_default() {
        let client = Arc::new(CapturingClient::new("reply"));
        let pipeline = Pipeline::builder(fast_config())
            .templates(test_templates())
            .inference_client(client.clone())
            .build()
            .unwrap();

        pipeline.process("hi", None, Some("missing")).await.unwrap();
        assert_eq!(client.last_prompt().unwrap(), "Please respond to: hi");
    }

    #[tokio::test]
    async fn test_missing_default_template_fails() {
        let pipeline = Pipeline::builder(fast_config())
            .templates(TemplateRegistry::new("default"))
            .build()
            .unwrap();

        let failure = pipeline.process("hi", None, None).await.unwrap_err();
        assert_eq!(failure.kind, ErrorKind::TemplateNotFound);
        assert_eq!(failure.stage, PipelineStage::ComposePrompt);
    }

    #[tokio::test]
    async fn test_uppercase_output() {
        let pipeline = Pipeline::builder(fast_config().with_uppercase_output(true))
            .templates(test_templates())
            .inference_client(Arc::new(CapturingClient::new("quiet reply")))
            .build()
            .unwrap();

        let result = pipeline.process("hi", None, None).await.unwrap();
        assert_eq!(result.final_output, "QUIET REPLY");
    }

    #[tokio::test]
    async fn test_usage_stats_propagate_to_result_and_metrics() {
        let usage = UsageStats {
            prompt_tokens: 10,
            completion_tokens: 7,
            total_tokens: 17,
        };
        let pipeline = Pipeline::builder(fast_config())
            .templates(test_templates())
            .inference_client(Arc::new(CapturingClient::new("r").with_usage(usage)))
            .build()
            .unwrap();

        let result = pipeline.process("hi", None, None).await.unwrap();
        assert_eq!(result.usage, usage);
        assert_eq!(pipeline.metrics().prompt_tokens_total(), 10);
        assert_eq!(pipeline.metrics().total_tokens(), 17);
    }

    #[tokio::test]
    async fn test_pre_hooks_run_in_order_before_preprocess() {
        let client = Arc::new(CapturingClient::new("reply"));
        let pipeline = Pipeline::builder(fast_config())
            .templates(test_templates())
            .inference_client(client.clone())
            .add_pre_hook(Box::new(FnPreHook::new("a", |mut ctx| {
                ctx.input_text.push_str(" first");
                Ok(ctx)
            })))
            .add_pre_hook(Box::new(FnPreHook::new("b", |mut ctx| {
                ctx.input_text.push_str(" second");
                Ok(ctx)
            })))
            .build()
            .unwrap();

        pipeline.process("start", None, None).await.unwrap();
        assert_eq!(
            client.last_prompt().unwrap(),
            "Please respond to: start first second"
        );
    }

    #[tokio::test]
    async fn test_failing_pre_hook_skips_everything_downstream() {
        let client = Arc::new(CapturingClient::new("reply"));
        let post_ran = Arc::new(AtomicU32::new(0));
        let post_ran_hook = Arc::clone(&post_ran);

        let pipeline = Pipeline::builder(fast_config())
            .templates(test_templates())
            .inference_client(client.clone())
            .add_pre_hook(Box::new(FnPreHook::new("a", |mut ctx| {
                ctx.input_text.push_str(" a");
                Ok(ctx)
            })))
            .add_pre_hook(Box::new(FnPreHook::new("b", |_ctx| {
                Err(PipelineError::Other("b says no".into()))
            })))
            .add_pre_hook(Box::new(FnPreHook::new("c", |mut ctx| {
                ctx.input_text.push_str(" c");
                Ok(ctx)
            })))
            .add_post_hook(Box::new(FnPostHook::new("observer", move |result| {
                post_ran_hook.fetch_add(1, Ordering::Relaxed);
                Ok(result)
            })))
            .build()
            .unwrap();

        let failure = pipeline.process("start", None, None).await.unwrap_err();
        assert_eq!(failure.kind, ErrorKind::Hook);
        assert_eq!(failure.stage, PipelineStage::PreHooks);
        assert!(failure.message.contains("'b'"));

        // Neither hook C, nor inference, nor any post-hook ran.
        assert!(client.last_prompt().is_none());
        assert_eq!(post_ran.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_post_hooks_transform_final_result() {
        let pipeline = Pipeline::builder(fast_config())
            .templates(test_templates())
            .inference_client(Arc::new(CapturingClient::new("reply")))
            .add_post_hook(Box::new(FnPostHook::new("suffix", |mut result| {
                result.final_output.push_str(" [reviewed]");
                Ok(result)
            })))
            .build()
            .unwrap();

        let result = pipeline.process("hi", None, None).await.unwrap();
        assert_eq!(result.final_output, "reply [reviewed]");
    }

    #[tokio::test]
    async fn test_retry_recovers_and_counts_attempts() {
        let pipeline = Pipeline::builder(fast_config())
            .templates(test_templates())
            .inference_client(Arc::new(FlakyClient::new(2, 503)))
            .build()
            .unwrap();

        let result = pipeline.process("hi", None, None).await.unwrap();
        assert_eq!(result.final_output, "recovered");
        assert_eq!(result.timings.inference_attempts, 3);
        assert_eq!(pipeline.metrics().inference_latency_count(), 3);
    }

    #[tokio::test]
    async fn test_retry_exhaustion_surfaces_inference_failed() {
        let pipeline = Pipeline::builder(fast_config())
            .templates(test_templates())
            .inference_client(Arc::new(FlakyClient::new(100, 500)))
            .build()
            .unwrap();

        let failure = pipeline.process("hi", None, None).await.unwrap_err();
        assert_eq!(failure.kind, ErrorKind::InferenceFailed);
        assert_eq!(failure.stage, PipelineStage::Infer);
        // max_retries = 3 → 4 attempts
        assert_eq!(pipeline.metrics().inference_latency_count(), 4);
    }

    #[tokio::test]
    async fn test_permanent_failure_uses_single_attempt() {
        let pipeline = Pipeline::builder(fast_config())
            .templates(test_templates())
            .inference_client(Arc::new(FlakyClient::new(100, 401)))
            .build()
            .unwrap();

        let failure = pipeline.process("hi", None, None).await.unwrap_err();
        assert_eq!(failure.kind, ErrorKind::PermanentInference);
        assert_eq!(failure.stage, PipelineStage::Infer);
        assert_eq!(pipeline.metrics().inference_latency_count(), 1);
    }

    #[tokio::test]
    async fn test_metrics_accounting_across_invocations() {
        let metrics = Arc::new(PipelineMetrics::new());
        let pipeline = Pipeline::builder(fast_config())
            .templates(test_templates())
            .metrics(Arc::clone(&metrics))
            .build()
            .unwrap();

        for _ in 0..3 {
            pipeline.process("hi", None, None).await.unwrap();
        }
        for _ in 0..2 {
            pipeline.process("   ", None, None).await.unwrap_err();
        }

        assert_eq!(metrics.requests_total(), 5);
        assert_eq!(metrics.success_total(), 3);
        assert_eq!(metrics.failure_total(), 2);
        assert_eq!(metrics.pipeline_latency_count(), 5);
    }

    #[tokio::test]
    async fn test_concurrent_invocations_share_only_metrics() {
        let pipeline = Arc::new(mock_pipeline());

        let mut handles = Vec::new();
        for i in 0..8 {
            let p = Arc::clone(&pipeline);
            handles.push(tokio::spawn(async move {
                p.process(format!("input {}", i), None, None).await
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }

        assert_eq!(pipeline.metrics().requests_total(), 8);
        assert_eq!(pipeline.metrics().success_total(), 8);
    }

    #[tokio::test]
    async fn test_builder_selects_mock_without_credential() {
        let pipeline = mock_pipeline();
        assert_eq!(pipeline.inference.name(), "mock");
    }

    #[tokio::test]
    async fn test_builder_selects_http_with_credential() {
        let pipeline = Pipeline::builder(fast_config().with_api_key("sk-test"))
            .templates(test_templates())
            .build()
            .unwrap();
        assert_eq!(pipeline.inference.name(), "http");
    }

    #[test]
    fn test_preview_truncates() {
        let long = "y".repeat(80);
        let p = preview(&long);
        assert!(p.ends_with("..."));
        assert_eq!(p.chars().count(), 53);
        assert_eq!(preview("short"), "short");
    }
}
