//! Example: extending the pipeline with pre- and post-hooks.
//!
//! Run with: `cargo run --example hooks`

use llm_middleware::hooks::{FnPostHook, FnPreHook};
use llm_middleware::{Pipeline, PipelineConfig, TemplateRegistry};
use serde_json::json;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut templates = TemplateRegistry::new("default");
    templates.register("default", "Please respond to: {user_input}");

    let pipeline = Pipeline::builder(PipelineConfig::default())
        .templates(templates)
        // Pre-hooks transform the request before the core stages run.
        .add_pre_hook(Box::new(FnPreHook::new("tag-source", |mut ctx| {
            ctx.context.insert("source".into(), json!("demo"));
            Ok(ctx)
        })))
        // Post-hooks transform the assembled result.
        .add_post_hook(Box::new(FnPostHook::new("sign", |mut result| {
            result.final_output.push_str("\n-- processed by hooks demo");
            Ok(result)
        })))
        .build()?;

    let result = pipeline.process("what can hooks do?", None, None).await?;
    println!("{}", result.final_output);
    println!("context: {:?}", result.context);

    Ok(())
}
