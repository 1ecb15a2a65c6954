//! Pipeline settings shared by document ingestion and chat.
//!
//! ```toml
//! [pipeline]
//! chunk_size = 1000
//! chunk_overlap = 200
//! chat_top_k = 5
//! ```

use ingest::ChunkingConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("validation error: {0}")]
    Validation(String),
}

/// Chunk window and retrieval depth.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PipelineConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    /// Chunks retrieved per source tag when answering a chat request.
    pub chat_top_k: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let chunking = ChunkingConfig::default();
        Self {
            chunk_size: chunking.chunk_size,
            chunk_overlap: chunking.chunk_overlap,
            chat_top_k: 5,
        }
    }
}

impl PipelineConfig {
    pub fn chunking(&self) -> ChunkingConfig {
        ChunkingConfig {
            chunk_size: self.chunk_size,
            chunk_overlap: self.chunk_overlap,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.chunking()
            .validate()
            .map_err(|e| ConfigError::Validation(e.to_string()))?;
        if self.chat_top_k == 0 {
            return Err(ConfigError::Validation(
                "chat_top_k must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_upload_and_chat_behaviour() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.chunk_size, 1000);
        assert_eq!(cfg.chunk_overlap, 200);
        assert_eq!(cfg.chat_top_k, 5);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn rejects_non_positive_stride_and_zero_k() {
        let overlap = PipelineConfig {
            chunk_overlap: 1000,
            ..Default::default()
        };
        assert!(matches!(overlap.validate(), Err(ConfigError::Validation(_))));

        let zero_k = PipelineConfig {
            chat_top_k: 0,
            ..Default::default()
        };
        assert!(zero_k.validate().is_err());
    }

    #[test]
    fn partial_json_uses_defaults() {
        let cfg: PipelineConfig = serde_json::from_str(r#"{"chat_top_k": 8}"#).unwrap();
        assert_eq!(cfg.chat_top_k, 8);
        assert_eq!(cfg.chunk_size, 1000);
    }
}
