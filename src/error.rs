use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

/// Errors produced by the pipeline and its components.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Input rejected before any stage ran (empty after normalization, wrong shape).
    #[error("invalid input: {0}")]
    Validation(String),

    /// Neither the requested template nor the configured default could be resolved.
    #[error("template not found: {0}")]
    TemplateNotFound(String),

    /// The provider returned a non-success status code.
    ///
    /// The `retry_after` field is populated from the `Retry-After` response
    /// header when present. Whether the error is retried depends on the
    /// status: 429 and 5xx are temporary, other 4xx are permanent.
    #[error("HTTP {status}: {body}")]
    Http {
        /// HTTP status code (e.g. 429, 500, 503).
        status: u16,
        /// Response body text.
        body: String,
        /// Parsed `Retry-After` header value, if present.
        retry_after: Option<Duration>,
    },

    /// Low-level HTTP transport failure (connection refused, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// JSON parsing failed at the serde level.
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    /// The retry budget was exhausted; wraps the last temporary failure.
    #[error("inference failed after {attempts} attempts: {message}")]
    InferenceFailed { attempts: u32, message: String },

    /// A pre- or post-hook failed; the remaining chain was aborted.
    #[error("hook '{name}' failed: {message}")]
    Hook { name: String, message: String },

    /// Invalid configuration detected at startup.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Catch-all for other errors.
    #[error("{0}")]
    Other(String),
}

impl From<anyhow::Error> for PipelineError {
    fn from(err: anyhow::Error) -> Self {
        PipelineError::Other(err.to_string())
    }
}

/// How the retry loop should treat a failed inference attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Worth retrying: timeouts, connection errors, 429, 5xx.
    Temporary,
    /// Retrying cannot help: other 4xx responses (bad request, bad credential).
    Permanent,
    /// Not an inference-level failure at all; surfaced as-is.
    Terminal,
}

/// Machine-readable error kind, carried in structured failure payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    TemplateNotFound,
    TemporaryInference,
    PermanentInference,
    InferenceFailed,
    Hook,
    Internal,
}

impl PipelineError {
    /// Classify a failed inference attempt for the retry loop.
    pub fn classify(&self) -> FailureClass {
        match self {
            PipelineError::Http { status, .. } => {
                if *status == 429 || (500..600).contains(status) {
                    FailureClass::Temporary
                } else {
                    FailureClass::Permanent
                }
            }
            PipelineError::Request(_) => FailureClass::Temporary,
            _ => FailureClass::Terminal,
        }
    }

    /// The kind reported in a [`PipelineFailure`](crate::types::PipelineFailure).
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Validation(_) => ErrorKind::Validation,
            PipelineError::TemplateNotFound(_) => ErrorKind::TemplateNotFound,
            PipelineError::Http { .. } | PipelineError::Request(_) => match self.classify() {
                FailureClass::Permanent => ErrorKind::PermanentInference,
                _ => ErrorKind::TemporaryInference,
            },
            PipelineError::InferenceFailed { .. } => ErrorKind::InferenceFailed,
            PipelineError::Hook { .. } => ErrorKind::Hook,
            _ => ErrorKind::Internal,
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
