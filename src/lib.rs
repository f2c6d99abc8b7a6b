//! # LLM Middleware
//!
//! Request-processing middleware that turns free-text input into a
//! model-generated response through a fixed four-stage pipeline, with
//! user-supplied hooks and operational instrumentation.
//!
//! The pipeline runs `preprocess → compose prompt → infer → postprocess`,
//! with pre-hooks before the first stage and post-hooks after the last.
//! The inference call is wrapped in a bounded retry/backoff policy, and
//! every stage feeds timing and counter metrics into an injected recorder.
//!
//! ## Core Concepts
//!
//! - **[`Pipeline`]** — the orchestrator and sole entry point. Owns the
//!   stage sequence; [`Pipeline::process`] returns a [`PipelineResult`]
//!   or a structured [`PipelineFailure`], never an unstructured fault.
//! - **[`TemplateRegistry`]** — resolves template names to template text,
//!   falling back to the configured default.
//! - **[`InferenceClient`](inference::InferenceClient)** — one provider
//!   call per attempt; retry lives outside in
//!   [`infer_with_backoff`](inference::infer_with_backoff). Without a
//!   credential the pipeline runs on the deterministic
//!   [`MockInferenceClient`](inference::MockInferenceClient).
//! - **[`PreHook`](hooks::PreHook)/[`PostHook`](hooks::PostHook)** —
//!   user-supplied transforms applied in registration order.
//! - **[`PipelineMetrics`]** — process-wide atomic counters and latency
//!   histograms with a Prometheus text [`snapshot`](PipelineMetrics::snapshot).
//!
//! ## Quick Start
//!
//! ```no_run
//! use llm_middleware::{Pipeline, PipelineConfig, TemplateRegistry};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut templates = TemplateRegistry::new("default");
//!     templates.register("default", "Please respond to: {user_input}");
//!
//!     // Configuration comes from the environment in deployments;
//!     // a missing LLM_API_KEY selects mock mode.
//!     let pipeline = Pipeline::builder(PipelineConfig::from_env()?)
//!         .templates(templates)
//!         .build()?;
//!
//!     let result = pipeline.process("hi", None, None).await?;
//!     println!("{}", result.final_output);
//!     println!("{}", pipeline.metrics().snapshot());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod hooks;
pub mod inference;
pub mod metrics;
pub mod pipeline;
pub mod template;
pub mod types;

pub use config::PipelineConfig;
pub use error::{ErrorKind, FailureClass, PipelineError, Result};
pub use hooks::{FnPostHook, FnPreHook, HookChain, PostHook, PreHook};
pub use inference::{
    BackoffConfig, HttpInferenceClient, Inference, InferenceClient, JitterStrategy,
    MockInferenceClient,
};
pub use metrics::PipelineMetrics;
pub use pipeline::{Pipeline, PipelineBuilder};
pub use template::{PlaceholderPolicy, TemplateRegistry};
pub use types::{
    PipelineFailure, PipelineResult, PipelineStage, RequestContext, StageTiming, UsageStats,
};
