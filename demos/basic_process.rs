//! Example: processing a request end to end in mock mode.
//!
//! Run with: `cargo run --example basic_process`

use llm_middleware::{Pipeline, PipelineConfig};
use serde_json::json;
use std::collections::HashMap;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // No LLM_API_KEY in the config: the pipeline runs in mock mode, so this
    // works without any provider. Templates load from ./templates.
    let pipeline = Pipeline::new(PipelineConfig::from_env()?)?;

    let mut context = HashMap::new();
    context.insert("tone".to_string(), json!("polite"));

    let result = pipeline
        .process("Hello there, how are you?", Some(context), Some("respond"))
        .await?;

    println!("Output:   {}", result.final_output);
    println!("Input:    {}", result.original_input);
    println!("Tokens:   {}", result.usage.total_tokens);
    println!("Attempts: {}", result.timings.inference_attempts);
    println!("At:       {}", result.generated_at);

    Ok(())
}
