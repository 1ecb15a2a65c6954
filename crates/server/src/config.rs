use index::IndexConfig;
use routerag::PipelineConfig;
use semantic::{CompletionConfig, EmbedderConfig};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Environment prefix for every setting, e.g. `ROUTERAG__INDEX__URL`.
pub const ENV_PREFIX: &str = "ROUTERAG";

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Server bind address
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds. Streamed chat bodies are not cut off.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum request body size in MB
    #[serde(default = "default_max_body_size_mb")]
    pub max_body_size_mb: usize,

    /// Enable permissive CORS
    #[serde(default = "default_true")]
    pub enable_cors: bool,

    /// Log filter, in `EnvFilter` syntax
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Where uploaded files are kept for download
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,

    #[serde(default)]
    pub index: IndexConfig,

    #[serde(default)]
    pub embedding: EmbedderConfig,

    #[serde(default)]
    pub completion: CompletionConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            port: default_port(),
            timeout_secs: default_timeout_secs(),
            max_body_size_mb: default_max_body_size_mb(),
            enable_cors: default_true(),
            log_level: default_log_level(),
            upload_dir: default_upload_dir(),
            index: IndexConfig::default(),
            embedding: EmbedderConfig::default(),
            completion: CompletionConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from `.env`, an optional `routerag.toml` and the
    /// environment, in increasing precedence.
    pub fn load() -> anyhow::Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                tracing::warn!(error = %e, "failed to read .env");
            }
        }

        let builder = config::Config::builder()
            // Load from file if exists
            .add_source(config::File::with_name("routerag").required(false))
            // Override with environment variables
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            );

        let mut config: ServerConfig = builder.build()?.try_deserialize()?;
        config.apply_legacy_env(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Honour the unprefixed variables older deployments set, unless the
    /// prefixed equivalent is present.
    pub fn apply_legacy_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let legacy = |legacy: &str, prefixed: &str| -> Option<String> {
            if lookup(&format!("{ENV_PREFIX}__{prefixed}")).is_some() {
                return None;
            }
            lookup(legacy).filter(|v| !v.is_empty())
        };

        if let Some(url) = legacy("QDRANT_URL", "INDEX__URL") {
            self.index.url = url;
        }
        if let Some(key) = legacy("QDRANT_API_KEY", "INDEX__API_KEY") {
            self.index.api_key = Some(key);
        }
        if let Some(key) = legacy("OPENAI_API_KEY", "EMBEDDING__API_KEY") {
            self.embedding.api_key = Some(key);
        }
        if let Some(key) = legacy("OPENAI_API_KEY", "COMPLETION__API_KEY") {
            self.completion.api_key = Some(key);
        }
        if let Some(dir) = legacy("UPLOAD_DIR", "UPLOAD_DIR") {
            self.upload_dir = PathBuf::from(dir);
        }
    }

    /// Settings that load fine but are probably not what the operator meant.
    ///
    /// Qdrant serves REST on 6333 and gRPC on 6334; the client here speaks
    /// gRPC, so a URL carried over from a REST client points at the wrong port.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        let url = self.index.url.trim_end_matches('/');
        if self.index.backend == "qdrant" && url.ends_with(":6333") {
            warnings.push(format!(
                "index.url {} uses the Qdrant REST port 6333; routerag connects over gRPC, usually on 6334",
                self.index.url
            ));
        }
        warnings
    }

    /// Reject settings the server cannot start with.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.index.validate()?;
        self.pipeline.validate()?;
        if self.embedding.dimensions != self.index.dimension {
            anyhow::bail!(
                "embedding.dimensions ({}) must equal index.dimension ({})",
                self.embedding.dimensions,
                self.index.dimension
            );
        }
        Ok(())
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr_str = format!("{}:{}", self.bind_addr, self.port);
        Ok(addr_str.parse()?)
    }

    /// Get request timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Get max body size in bytes
    pub fn max_body_size(&self) -> usize {
        self.max_body_size_mb * 1024 * 1024
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_max_body_size_mb() -> usize {
    50
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("uploaded_files")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.port, 8000);
        assert_eq!(cfg.max_body_size(), 50 * 1024 * 1024);
        assert_eq!(cfg.upload_dir, PathBuf::from("uploaded_files"));
        assert_eq!(cfg.index.dimension, 1536);
        assert_eq!(cfg.index.scan_limit, 1000);
        assert_eq!(cfg.completion.default_model, "gpt-4.1-mini");
        assert_eq!(cfg.pipeline.chunk_size, 1000);
        assert!(cfg.enable_cors);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_socket_addr() {
        let cfg = ServerConfig::default();
        let addr = cfg.socket_addr().unwrap();
        assert_eq!(addr.port(), 8000);
    }

    #[test]
    fn legacy_variables_fill_in() {
        let env: HashMap<&str, &str> = [
            ("QDRANT_URL", "http://qdrant:6334"),
            ("QDRANT_API_KEY", "q-key"),
            ("OPENAI_API_KEY", "sk-test"),
            ("UPLOAD_DIR", "/data/uploads"),
        ]
        .into_iter()
        .collect();

        let mut cfg = ServerConfig::default();
        cfg.apply_legacy_env(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(cfg.index.url, "http://qdrant:6334");
        assert_eq!(cfg.index.api_key.as_deref(), Some("q-key"));
        assert_eq!(cfg.embedding.api_key.as_deref(), Some("sk-test"));
        assert_eq!(cfg.completion.api_key.as_deref(), Some("sk-test"));
        assert_eq!(cfg.upload_dir, PathBuf::from("/data/uploads"));
    }

    #[test]
    fn rest_port_url_is_flagged() {
        let mut cfg = ServerConfig::default();
        let env = HashMap::from([("QDRANT_URL", "http://qdrant:6333/")]);
        cfg.apply_legacy_env(|k| env.get(k).map(|v| v.to_string()));

        let warnings = cfg.warnings();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("6334"));

        cfg.index.url = "http://qdrant:6334".into();
        assert!(cfg.warnings().is_empty());

        cfg.index.url = "http://qdrant:6333".into();
        cfg.index.backend = "in_memory".into();
        assert!(cfg.warnings().is_empty());
    }

    #[test]
    fn prefixed_variables_win_over_legacy() {
        let env: HashMap<&str, &str> = [
            ("QDRANT_URL", "http://legacy:6334"),
            ("ROUTERAG__INDEX__URL", "http://prefixed:6334"),
        ]
        .into_iter()
        .collect();

        let mut cfg = ServerConfig::default();
        cfg.index.url = "http://prefixed:6334".into();
        cfg.apply_legacy_env(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(cfg.index.url, "http://prefixed:6334");
    }

    #[test]
    fn mismatched_dimensions_are_rejected() {
        let mut cfg = ServerConfig::default();
        cfg.embedding.dimensions = 768;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn sections_deserialize_with_defaults() {
        let cfg: ServerConfig = serde_json::from_str(
            r#"{"port": 9000, "index": {"collection": "routes"}, "pipeline": {"chat_top_k": 3}}"#,
        )
        .unwrap();
        assert_eq!(cfg.port, 9000);
        assert_eq!(cfg.index.collection, "routes");
        assert_eq!(cfg.index.dimension, 1536);
        assert_eq!(cfg.pipeline.chat_top_k, 3);
        assert_eq!(cfg.bind_addr, "0.0.0.0");
    }
}
