use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::api::OpenAiEmbedder;
use crate::hashing::HashingEmbedder;
use crate::{Embedder, SemanticError};

/// Default OpenAI-compatible API root.
pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Runtime configuration describing which embedder to build.
///
/// # Example
/// ```no_run
/// use semantic::{Embedder, EmbedderConfig};
///
/// let cfg = EmbedderConfig {
///     mode: "api".into(),
///     api_key: Some("sk-xxx".into()),
///     ..Default::default()
/// };
///
/// let embedder = cfg.build().unwrap();
/// assert_eq!(embedder.dimensions(), 1536);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmbedderConfig {
    /// `"api"` (remote HTTP, OpenAI wire format) or `"hashing"` (offline, deterministic).
    pub mode: String,
    /// API root; `/embeddings` is appended.
    pub api_base: String,
    /// Bearer token. Required in api mode.
    pub api_key: Option<String>,
    /// Model name sent with every request.
    pub model: String,
    /// Expected vector length.
    pub dimensions: usize,
    /// Maximum inputs per upstream request; larger batches fan out concurrently.
    pub batch_size: usize,
    /// Overall request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        Self {
            mode: "api".into(),
            api_base: DEFAULT_API_BASE.into(),
            api_key: None,
            model: "text-embedding-3-small".into(),
            dimensions: 1536,
            batch_size: 256,
            timeout_secs: 30,
        }
    }
}

impl EmbedderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Check the config for values that can never work.
    pub fn validate(&self) -> Result<(), SemanticError> {
        if self.dimensions == 0 {
            return Err(SemanticError::InvalidConfig(
                "dimensions must be positive".into(),
            ));
        }
        if self.batch_size == 0 {
            return Err(SemanticError::InvalidConfig(
                "batch_size must be positive".into(),
            ));
        }
        match self.mode.as_str() {
            "api" => {
                if self.api_key.as_deref().is_none_or(str::is_empty) {
                    return Err(SemanticError::InvalidConfig(
                        "api_key is required for api mode".into(),
                    ));
                }
                Ok(())
            }
            "hashing" => Ok(()),
            other => Err(SemanticError::InvalidConfig(format!(
                "unknown embedder mode '{other}'"
            ))),
        }
    }

    /// Build the configured embedder behind a trait object.
    pub fn build(&self) -> Result<Arc<dyn Embedder>, SemanticError> {
        self.validate()?;
        match self.mode.as_str() {
            "hashing" => Ok(Arc::new(HashingEmbedder::new(self.dimensions))),
            _ => Ok(Arc::new(OpenAiEmbedder::new(self)?)),
        }
    }
}

/// Configuration for the streaming chat completion client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CompletionConfig {
    /// API root; `/chat/completions` is appended.
    pub api_base: String,
    /// Fallback key used when a request does not carry its own.
    pub api_key: Option<String>,
    /// Model used when a request does not name one.
    pub default_model: String,
    /// Connect timeout in seconds. Streams themselves are not time-limited.
    pub connect_timeout_secs: u64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.into(),
            api_key: None,
            default_model: "gpt-4.1-mini".into(),
            connect_timeout_secs: 10,
        }
    }
}
