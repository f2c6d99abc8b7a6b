//! Example: shared metrics across invocations and the Prometheus snapshot.
//!
//! Run with: `cargo run --example metrics_snapshot`

use llm_middleware::{Pipeline, PipelineConfig, PipelineMetrics, TemplateRegistry};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut templates = TemplateRegistry::new("default");
    templates.register("default", "Please respond to: {user_input}");

    let metrics = Arc::new(PipelineMetrics::new());
    let pipeline = Pipeline::builder(PipelineConfig::default())
        .templates(templates)
        .metrics(Arc::clone(&metrics))
        .build()?;

    for input in ["first request", "second request", "   "] {
        match pipeline.process(input, None, None).await {
            Ok(result) => println!("ok:     {}", result.final_output),
            Err(failure) => println!("failed: {} at {}", failure.message, failure.stage),
        }
    }

    // This is what the embedding server serves on its metrics port.
    println!("\n{}", metrics.snapshot());

    Ok(())
}
