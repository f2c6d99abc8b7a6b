//! Pipeline configuration, loaded once at process start.
//!
//! [`PipelineConfig`] is an immutable snapshot shared by every request. It
//! can be built programmatically with the `with_*` methods or read from the
//! environment with [`PipelineConfig::from_env`]. A missing `LLM_API_KEY`
//! selects mock mode rather than failing.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{PipelineError, Result};
use crate::inference::BackoffConfig;
use crate::template::PlaceholderPolicy;

/// Configuration snapshot for the pipeline.
///
/// Constructed once at startup and shared read-only by all requests.
///
/// # Example
///
/// ```
/// use llm_middleware::PipelineConfig;
/// use std::time::Duration;
///
/// let config = PipelineConfig::default()
///     .with_model("gpt-4o-mini")
///     .with_timeout(Duration::from_secs(30))
///     .with_uppercase_output(true);
/// assert!(config.api_key.is_none()); // mock mode
/// ```
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Model identifier sent to the provider.
    pub model: String,

    /// Chat-completions endpoint URL.
    pub endpoint: String,

    /// Provider credential. `None` selects mock mode.
    pub api_key: Option<String>,

    /// Timeout applied to each network attempt (not the whole retry sequence).
    pub timeout: Duration,

    /// Retry/backoff policy for the inference call.
    pub backoff: BackoffConfig,

    /// Directory scanned for template files at startup.
    pub template_dir: PathBuf,

    /// Template name used when a request names none, or names a missing one.
    pub default_template: String,

    /// Trim surrounding whitespace during preprocessing.
    pub strip_input: bool,

    /// Lowercase the input during preprocessing.
    pub lowercase_input: bool,

    /// Uppercase the final output during postprocessing.
    pub uppercase_output: bool,

    /// What to do with template markers that match no known value.
    pub placeholders: PlaceholderPolicy,

    /// Whether the embedding server should expose the metrics snapshot.
    pub expose_metrics: bool,

    /// Port the embedding server should serve metrics on.
    pub metrics_port: u16,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            model: "gpt-3.5-turbo".to_string(),
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            api_key: None,
            timeout: Duration::from_secs(10),
            backoff: BackoffConfig::standard(),
            template_dir: PathBuf::from("templates"),
            default_template: "default".to_string(),
            strip_input: true,
            lowercase_input: true,
            uppercase_output: false,
            placeholders: PlaceholderPolicy::Passthrough,
            expose_metrics: false,
            metrics_port: 8000,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from the environment.
    ///
    /// Every variable is optional; unset variables keep their defaults.
    /// Unparseable numeric values fail with
    /// [`InvalidConfig`](PipelineError::InvalidConfig) rather than being
    /// silently replaced.
    ///
    /// Variables: `LLM_API_URL`, `LLM_API_KEY`, `MODEL_NAME`,
    /// `TIMEOUT_SECONDS`, `MAX_RETRIES`, `BACKOFF_BASE_MS`,
    /// `BACKOFF_MULTIPLIER`, `TEMPLATE_DIR`, `DEFAULT_TEMPLATE`,
    /// `UPPERCASE_OUTPUT`, `EXPOSE_METRICS`, `METRICS_PORT`.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(url) = env::var("LLM_API_URL") {
            config.endpoint = url;
        }
        if let Ok(key) = env::var("LLM_API_KEY") {
            if !key.is_empty() {
                config.api_key = Some(key);
            }
        }
        if let Ok(model) = env::var("MODEL_NAME") {
            config.model = model;
        }
        if let Some(secs) = parse_env::<u64>("TIMEOUT_SECONDS")? {
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(retries) = parse_env::<u32>("MAX_RETRIES")? {
            config.backoff.max_retries = retries;
        }
        if let Some(base_ms) = parse_env::<u64>("BACKOFF_BASE_MS")? {
            config.backoff.base_delay = Duration::from_millis(base_ms);
        }
        if let Some(multiplier) = parse_env::<f64>("BACKOFF_MULTIPLIER")? {
            config.backoff.multiplier = multiplier;
        }
        if let Ok(dir) = env::var("TEMPLATE_DIR") {
            config.template_dir = PathBuf::from(dir);
        }
        if let Ok(name) = env::var("DEFAULT_TEMPLATE") {
            config.default_template = name;
        }
        if let Some(upper) = parse_env_bool("UPPERCASE_OUTPUT") {
            config.uppercase_output = upper;
        }
        if let Some(expose) = parse_env_bool("EXPOSE_METRICS") {
            config.expose_metrics = expose;
        }
        if let Some(port) = parse_env::<u16>("METRICS_PORT")? {
            config.metrics_port = port;
        }

        Ok(config)
    }

    /// Whether the pipeline will run without a real provider.
    pub fn is_mock_mode(&self) -> bool {
        self.api_key.is_none()
    }

    /// Set the model identifier.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the provider endpoint URL.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Set the provider credential. Disables mock mode.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the per-attempt timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the retry/backoff policy.
    pub fn with_backoff(mut self, backoff: BackoffConfig) -> Self {
        self.backoff = backoff;
        self
    }

    /// Set the template directory.
    pub fn with_template_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.template_dir = dir.into();
        self
    }

    /// Set the default template name.
    pub fn with_default_template(mut self, name: impl Into<String>) -> Self {
        self.default_template = name.into();
        self
    }

    /// Enable or disable whitespace trimming during preprocessing.
    pub fn with_strip_input(mut self, enabled: bool) -> Self {
        self.strip_input = enabled;
        self
    }

    /// Enable or disable lowercasing during preprocessing.
    pub fn with_lowercase_input(mut self, enabled: bool) -> Self {
        self.lowercase_input = enabled;
        self
    }

    /// Enable or disable uppercasing of the final output.
    pub fn with_uppercase_output(mut self, enabled: bool) -> Self {
        self.uppercase_output = enabled;
        self
    }

    /// Set the unresolved-placeholder policy.
    pub fn with_placeholder_policy(mut self, policy: PlaceholderPolicy) -> Self {
        self.placeholders = policy;
        self
    }
}

/// Parse an optional environment variable, failing on malformed values.
fn parse_env<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|e| PipelineError::InvalidConfig(format!("{}={:?}: {}", key, raw, e))),
        Err(_) => Ok(None),
    }
}

/// Parse a boolean flag the way the original deployment did: `true`/`1`/`yes`.
fn parse_env_bool(key: &str) -> Option<bool> {
    env::var(key)
        .ok()
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
}
