//! Template registry and prompt rendering.
//!
//! [`TemplateRegistry`] maps template names to template text. Templates are
//! loaded once at startup from the configured directory (file stem = name)
//! or registered programmatically. Resolution falls back to the configured
//! default template; a missing default is
//! [`TemplateNotFound`](crate::PipelineError::TemplateNotFound).
//!
//! [`render`] substitutes `{user_input}` with the preprocessed input,
//! `{context}` with a JSON view of the whole context map, and `{key}` with
//! the stringified value of each context key. `{{` and `}}` escape to
//! literal braces.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde_json::Value;
use tracing::warn;

use crate::error::{PipelineError, Result};

/// Sentinel that should never appear in real templates.
const ESCAPE_SENTINEL: &str = "\x00LBRACE\x00";
/// Sentinel for escaped closing brace.
const ESCAPE_SENTINEL_CLOSE: &str = "\x00RBRACE\x00";

/// What to do with `{marker}`s that match neither the input nor any
/// context key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlaceholderPolicy {
    /// Leave unresolved markers literal in the rendered prompt.
    #[default]
    Passthrough,
    /// Fail composition when a marker stays unresolved.
    Error,
}

/// Resolves template names to template text.
///
/// Lookup is in-memory; file access happens once, at construction. Safe to
/// share behind `Arc` and call concurrently.
///
/// # Example
///
/// ```
/// use llm_middleware::TemplateRegistry;
///
/// let mut registry = TemplateRegistry::new("default");
/// registry.register("default", "Please respond to: {user_input}");
/// assert!(registry.resolve(Some("missing")).is_ok()); // falls back to default
/// ```
#[derive(Debug, Clone)]
pub struct TemplateRegistry {
    templates: HashMap<String, String>,
    default_name: String,
}

impl TemplateRegistry {
    /// Create an empty registry with the given default template name.
    pub fn new(default_name: impl Into<String>) -> Self {
        Self {
            templates: HashMap::new(),
            default_name: default_name.into(),
        }
    }

    /// Load every regular file in `dir` as a template (file stem = name).
    ///
    /// A missing or empty directory yields an empty registry; resolution
    /// then fails with `TemplateNotFound` at call time. Unreadable entries
    /// are skipped.
    pub fn from_dir(dir: impl AsRef<Path>, default_name: impl Into<String>) -> Self {
        let dir = dir.as_ref();
        let mut registry = Self::new(default_name);

        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "template directory not readable");
                return registry;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match fs::read_to_string(&path) {
                Ok(text) => {
                    registry.templates.insert(name.to_string(), text);
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable template");
                }
            }
        }

        registry
    }

    /// Register a template programmatically.
    pub fn register(&mut self, name: impl Into<String>, text: impl Into<String>) {
        self.templates.insert(name.into(), text.into());
    }

    /// Resolve a template name to its text.
    ///
    /// An omitted or unknown name falls back to the default template. If
    /// the default is missing too, fails with `TemplateNotFound`.
    pub fn resolve(&self, name: Option<&str>) -> Result<&str> {
        if let Some(name) = name {
            if let Some(text) = self.templates.get(name) {
                return Ok(text.as_str());
            }
            warn!(template = name, "template not found, falling back to default");
        }

        self.templates
            .get(&self.default_name)
            .map(String::as_str)
            .ok_or_else(|| {
                PipelineError::TemplateNotFound(format!(
                    "'{}' (default '{}' is not registered)",
                    name.unwrap_or(&self.default_name),
                    self.default_name
                ))
            })
    }

    /// Number of registered templates.
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

/// Render a template into a prompt.
///
/// Substitutes `{user_input}` with `input`, `{context}` with a JSON view of
/// the whole context map, and `{key}` with each context value (strings
/// verbatim, other JSON values in their JSON form). `{{`/`}}` escape to
/// literal braces. Markers that match nothing follow `policy`.
pub fn render(
    template: &str,
    input: &str,
    context: &HashMap<String, Value>,
    policy: PlaceholderPolicy,
) -> Result<String> {
    // Pass 1: protect escaped braces
    let mut rendered = template.replace("{{", ESCAPE_SENTINEL);
    rendered = rendered.replace("}}", ESCAPE_SENTINEL_CLOSE);

    // Pass 2: substitute placeholders
    rendered = rendered.replace("{user_input}", input);
    if rendered.contains("{context}") && !context.contains_key("context") {
        rendered = rendered.replace("{context}", &context_as_string(context));
    }
    for (key, value) in context {
        let placeholder = format!("{{{}}}", key);
        rendered = rendered.replace(&placeholder, &value_as_string(value));
    }

    if policy == PlaceholderPolicy::Error {
        if let Some(marker) = first_unresolved(&rendered) {
            return Err(PipelineError::Other(format!(
                "unresolved template placeholder: {{{}}}",
                marker
            )));
        }
    }

    // Pass 3: restore escaped braces
    rendered = rendered.replace(ESCAPE_SENTINEL, "{");
    rendered = rendered.replace(ESCAPE_SENTINEL_CLOSE, "}");
    Ok(rendered)
}

/// Stringify a context value for interpolation: strings verbatim,
/// everything else in JSON form.
fn value_as_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// JSON view of the whole context map, with stable key order.
fn context_as_string(context: &HashMap<String, Value>) -> String {
    let map: serde_json::Map<String, Value> = context
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    Value::Object(map).to_string()
}

/// Find the first `{identifier}` marker left in the rendered text.
fn first_unresolved(rendered: &str) -> Option<&str> {
    let bytes = rendered.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'{' {
            let start = i + 1;
            let mut end = start;
            while end < bytes.len()
                && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'_')
            {
                end += 1;
            }
            if end > start && end < bytes.len() && bytes[end] == b'}' {
                return Some(&rendered[start..end]);
            }
        }
        i += 1;
    }
    None
}
