//! Process-wide metrics recorder.
//!
//! [`PipelineMetrics`] holds six monotonic counters and two fixed-bucket
//! latency histograms, all backed by atomics so concurrent invocations can
//! record without locks. It is injected by handle (`Arc<PipelineMetrics>`)
//! into the orchestrator at construction, never held as ambient global
//! state — tests inject a fresh recorder.
//!
//! [`snapshot`](PipelineMetrics::snapshot) renders the Prometheus text
//! exposition format for the embedding server to serve.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::types::UsageStats;

/// Histogram bucket upper bounds, in seconds.
const LATENCY_BUCKETS: [f64; 7] = [0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0];
const LATENCY_BUCKET_LABELS: [&str; 7] = ["0.1", "0.5", "1", "2", "5", "10", "30"];

/// A fixed-bucket latency histogram with atomic counts.
#[derive(Debug)]
struct LatencyHistogram {
    /// Per-bucket counts, plus one overflow slot for +Inf.
    counts: [AtomicU64; 8],
    /// Sum of observations in microseconds (integer to stay atomic).
    sum_micros: AtomicU64,
    count: AtomicU64,
}

impl LatencyHistogram {
    fn new() -> Self {
        Self {
            counts: Default::default(),
            sum_micros: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    fn observe(&self, seconds: f64) {
        let idx = LATENCY_BUCKETS
            .iter()
            .position(|le| seconds <= *le)
            .unwrap_or(LATENCY_BUCKETS.len());
        self.counts[idx].fetch_add(1, Ordering::Relaxed);
        self.sum_micros
            .fetch_add((seconds * 1_000_000.0).round() as u64, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    fn sum_seconds(&self) -> f64 {
        self.sum_micros.load(Ordering::Relaxed) as f64 / 1_000_000.0
    }

    /// Append this histogram in exposition format under `name`.
    fn render(&self, out: &mut String, name: &str, help: &str) {
        out.push_str(&format!("# HELP {} {}\n", name, help));
        out.push_str(&format!("# TYPE {} histogram\n", name));

        let mut cumulative = 0u64;
        for (label, count) in LATENCY_BUCKET_LABELS.iter().zip(&self.counts) {
            cumulative += count.load(Ordering::Relaxed);
            out.push_str(&format!(
                "{}_bucket{{le=\"{}\"}} {}\n",
                name, label, cumulative
            ));
        }
        cumulative += self.counts[LATENCY_BUCKETS.len()].load(Ordering::Relaxed);
        out.push_str(&format!("{}_bucket{{le=\"+Inf\"}} {}\n", name, cumulative));
        out.push_str(&format!("{}_sum {}\n", name, self.sum_seconds()));
        out.push_str(&format!("{}_count {}\n", name, self.count()));
    }
}

/// Counters and histograms shared by every pipeline invocation.
///
/// All updates are atomic increments; `snapshot` never mutates. Individual
/// counters are read independently — cross-counter consistency is not
/// guaranteed and not required.
///
/// # Example
///
/// ```
/// use llm_middleware::PipelineMetrics;
/// use std::sync::Arc;
///
/// let metrics = Arc::new(PipelineMetrics::new());
/// metrics.record_request();
/// metrics.record_success();
/// let text = metrics.snapshot();
/// assert!(text.contains("llm_pipeline_requests_total 1"));
/// ```
#[derive(Debug)]
pub struct PipelineMetrics {
    requests_total: AtomicU64,
    success_total: AtomicU64,
    failure_total: AtomicU64,
    prompt_tokens_total: AtomicU64,
    completion_tokens_total: AtomicU64,
    total_tokens: AtomicU64,
    pipeline_latency: LatencyHistogram,
    inference_latency: LatencyHistogram,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self {
            requests_total: AtomicU64::new(0),
            success_total: AtomicU64::new(0),
            failure_total: AtomicU64::new(0),
            prompt_tokens_total: AtomicU64::new(0),
            completion_tokens_total: AtomicU64::new(0),
            total_tokens: AtomicU64::new(0),
            pipeline_latency: LatencyHistogram::new(),
            inference_latency: LatencyHistogram::new(),
        }
    }

    /// Count a request entering the pipeline.
    pub fn record_request(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a request that reached `DONE`.
    pub fn record_success(&self) {
        self.success_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a request that ended in the error state.
    pub fn record_failure(&self) {
        self.failure_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Accumulate provider token usage.
    pub fn record_token_usage(&self, usage: &UsageStats) {
        self.prompt_tokens_total
            .fetch_add(usage.prompt_tokens, Ordering::Relaxed);
        self.completion_tokens_total
            .fetch_add(usage.completion_tokens, Ordering::Relaxed);
        self.total_tokens
            .fetch_add(usage.total_tokens, Ordering::Relaxed);
    }

    /// Observe one complete `process` call.
    pub fn observe_pipeline_latency(&self, elapsed: Duration) {
        self.pipeline_latency.observe(elapsed.as_secs_f64());
    }

    /// Observe one provider attempt (each retry observes separately).
    pub fn observe_inference_latency(&self, elapsed: Duration) {
        self.inference_latency.observe(elapsed.as_secs_f64());
    }

    pub fn requests_total(&self) -> u64 {
        self.requests_total.load(Ordering::Relaxed)
    }

    pub fn success_total(&self) -> u64 {
        self.success_total.load(Ordering::Relaxed)
    }

    pub fn failure_total(&self) -> u64 {
        self.failure_total.load(Ordering::Relaxed)
    }

    pub fn prompt_tokens_total(&self) -> u64 {
        self.prompt_tokens_total.load(Ordering::Relaxed)
    }

    pub fn completion_tokens_total(&self) -> u64 {
        self.completion_tokens_total.load(Ordering::Relaxed)
    }

    pub fn total_tokens(&self) -> u64 {
        self.total_tokens.load(Ordering::Relaxed)
    }

    /// Number of observations in the pipeline-latency histogram.
    pub fn pipeline_latency_count(&self) -> u64 {
        self.pipeline_latency.count()
    }

    /// Number of observations in the inference-latency histogram
    /// (one per provider attempt, including retried ones).
    pub fn inference_latency_count(&self) -> u64 {
        self.inference_latency.count()
    }

    /// Render a point-in-time view in the Prometheus text exposition format.
    pub fn snapshot(&self) -> String {
        let mut out = String::new();

        let counters: [(&str, &str, u64); 6] = [
            (
                "llm_pipeline_requests_total",
                "Total number of requests processed",
                self.requests_total(),
            ),
            (
                "llm_pipeline_success_total",
                "Total number of successful requests",
                self.success_total(),
            ),
            (
                "llm_pipeline_failure_total",
                "Total number of failed requests",
                self.failure_total(),
            ),
            (
                "llm_pipeline_prompt_tokens_total",
                "Total number of prompt tokens used",
                self.prompt_tokens_total(),
            ),
            (
                "llm_pipeline_completion_tokens_total",
                "Total number of completion tokens used",
                self.completion_tokens_total(),
            ),
            (
                "llm_pipeline_total_tokens",
                "Total number of tokens used",
                self.total_tokens(),
            ),
        ];

        for (name, help, value) in counters {
            out.push_str(&format!("# HELP {} {}\n", name, help));
            out.push_str(&format!("# TYPE {} counter\n", name));
            out.push_str(&format!("{} {}\n", name, value));
        }

        self.pipeline_latency.render(
            &mut out,
            "llm_pipeline_latency_seconds",
            "Time taken for complete pipeline execution",
        );
        self.inference_latency.render(
            &mut out,
            "llm_inference_latency_seconds",
            "Time taken for LLM inference only",
        );

        out
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}
