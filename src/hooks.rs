//! Pre- and post-processing hook chains.
//!
//! Hooks are user-supplied transforms that run before the first core stage
//! and after the last one. A pre-hook consumes and returns a
//! [`RequestContext`]; a post-hook consumes and returns a
//! [`PipelineResult`]. Registration order is execution order; the output of
//! hook *i* becomes the input of hook *i+1*. The first failing hook aborts
//! the remaining chain and the whole invocation.

use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::types::{PipelineResult, RequestContext};

/// A transform applied to the request before the core stages run.
///
/// Hooks operate only on the value they are given; the returned value
/// replaces it. They run on the invoking task, so long blocking work
/// serializes that one invocation's pipeline.
pub trait PreHook: Send + Sync {
    /// Name used in logs and failure payloads.
    fn name(&self) -> &str;

    /// Transform the request context.
    fn apply(&self, ctx: RequestContext) -> Result<RequestContext>;
}

/// A transform applied to the result after the core stages run.
pub trait PostHook: Send + Sync {
    /// Name used in logs and failure payloads.
    fn name(&self) -> &str;

    /// Transform the pipeline result.
    fn apply(&self, result: PipelineResult) -> Result<PipelineResult>;
}

/// A [`PreHook`] backed by a closure.
///
/// # Example
///
/// ```
/// use llm_middleware::hooks::FnPreHook;
///
/// let tag = FnPreHook::new("tag-source", |mut ctx| {
///     ctx.context.insert("source".into(), "api".into());
///     Ok(ctx)
/// });
/// ```
pub struct FnPreHook<F>
where
    F: Fn(RequestContext) -> Result<RequestContext> + Send + Sync,
{
    name: String,
    f: F,
}

impl<F> FnPreHook<F>
where
    F: Fn(RequestContext) -> Result<RequestContext> + Send + Sync,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> PreHook for FnPreHook<F>
where
    F: Fn(RequestContext) -> Result<RequestContext> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, ctx: RequestContext) -> Result<RequestContext> {
        (self.f)(ctx)
    }
}

/// A [`PostHook`] backed by a closure.
pub struct FnPostHook<F>
where
    F: Fn(PipelineResult) -> Result<PipelineResult> + Send + Sync,
{
    name: String,
    f: F,
}

impl<F> FnPostHook<F>
where
    F: Fn(PipelineResult) -> Result<PipelineResult> + Send + Sync,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> PostHook for FnPostHook<F>
where
    F: Fn(PipelineResult) -> Result<PipelineResult> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, result: PipelineResult) -> Result<PipelineResult> {
        (self.f)(result)
    }
}

/// Ordered pre- and post-hook chains.
#[derive(Default)]
pub struct HookChain {
    pre: Vec<Box<dyn PreHook>>,
    post: Vec<Box<dyn PostHook>>,
}

impl HookChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a pre-hook. Registration order is execution order.
    pub fn add_pre(&mut self, hook: Box<dyn PreHook>) {
        debug!(hook = hook.name(), "registered pre-hook");
        self.pre.push(hook);
    }

    /// Append a post-hook. Registration order is execution order.
    pub fn add_post(&mut self, hook: Box<dyn PostHook>) {
        debug!(hook = hook.name(), "registered post-hook");
        self.post.push(hook);
    }

    /// Run every pre-hook in order, piping each output into the next.
    ///
    /// The first failure aborts the rest of the chain.
    pub fn run_pre(&self, mut ctx: RequestContext) -> Result<RequestContext> {
        for hook in &self.pre {
            ctx = hook.apply(ctx).map_err(|e| PipelineError::Hook {
                name: hook.name().to_string(),
                message: e.to_string(),
            })?;
        }
        Ok(ctx)
    }

    /// Run every post-hook in order, piping each output into the next.
    pub fn run_post(&self, mut result: PipelineResult) -> Result<PipelineResult> {
        for hook in &self.post {
            result = hook.apply(result).map_err(|e| PipelineError::Hook {
                name: hook.name().to_string(),
                message: e.to_string(),
            })?;
        }
        Ok(result)
    }

    /// Number of registered pre-hooks.
    pub fn pre_len(&self) -> usize {
        self.pre.len()
    }

    /// Number of registered post-hooks.
    pub fn post_len(&self) -> usize {
        self.post.len()
    }
}

impl std::fmt::Debug for HookChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookChain")
            .field("pre", &self.pre.iter().map(|h| h.name()).collect::<Vec<_>>())
            .field(
                "post",
                &self.post.iter().map(|h| h.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
