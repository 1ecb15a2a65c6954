//! Workspace umbrella crate for routerag.
//!
//! This crate stitches document parsing, chunking, embedding and vector
//! storage into a single upload pipeline, and pairs retrieval with a
//! streaming completion for grounded chat.
//!
//! ```no_run
//! use std::sync::Arc;
//! use routerag::{DocumentKind, DocumentPipeline, EmbedderConfig, IndexConfig, PipelineConfig, VectorStore};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let embedder = EmbedderConfig { mode: "hashing".into(), ..Default::default() }.build()?;
//! let store = Arc::new(VectorStore::new(&IndexConfig::default(), embedder)?);
//! let pipeline = DocumentPipeline::new(store, &PipelineConfig::default());
//!
//! let bytes = std::fs::read("alps.gpx")?;
//! let report = pipeline.ingest(DocumentKind::Gpx, "alps.gpx", bytes).await?;
//! println!("{} chunks uploaded", report.chunks_uploaded);
//! # Ok(())
//! # }
//! ```

pub mod chat;
pub mod config;

pub use crate::chat::{
    ChatError, ChatOrchestrator, ChatPhase, ChatRequest, RetrievedContext, Sources,
};
pub use crate::config::{ConfigError, PipelineConfig};
pub use index::{
    BackendConfig, ChunkPayload, IndexConfig, IndexError, InMemoryBackend, QdrantBackend,
    SearchHit, VectorBackend, VectorStore, cosine_similarity,
};
pub use ingest::{ChunkingConfig, DocumentKind, IngestError, split};
pub use semantic::{
    ChatCompletionRequest, ChatMessage, CompletionClient, CompletionConfig, CompletionStream,
    Embedder, EmbedderConfig, HashingEmbedder, OpenAiCompletionClient, OpenAiEmbedder,
    SemanticError,
};

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::info;

/// Errors that can occur while turning an uploaded document into stored chunks.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Ingest(#[from] IngestError),
    #[error("Failed to chunk {0} text.")]
    NoChunks(&'static str),
    #[error(transparent)]
    Index(#[from] IndexError),
    #[error("document parsing task failed: {0}")]
    Task(String),
}

/// Outcome of a successful upload.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct IngestReport {
    pub file_name: String,
    pub kind: DocumentKind,
    pub chunks_uploaded: usize,
}

/// Parse → chunk → embed → store.
pub struct DocumentPipeline {
    store: Arc<VectorStore>,
    chunking: ChunkingConfig,
}

impl DocumentPipeline {
    pub fn new(store: Arc<VectorStore>, config: &PipelineConfig) -> Self {
        Self {
            store,
            chunking: config.chunking(),
        }
    }

    pub fn store(&self) -> &Arc<VectorStore> {
        &self.store
    }

    /// Store the chunks of one document, tagged with `file_name`.
    ///
    /// Parsing runs on a blocking thread. Chunks become searchable once this
    /// returns; on error nothing has been written.
    pub async fn ingest(
        &self,
        kind: DocumentKind,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<IngestReport, PipelineError> {
        let size = bytes.len();
        let name = file_name.to_string();
        let text = tokio::task::spawn_blocking(move || kind.extract_text(&name, &bytes))
            .await
            .map_err(|e| PipelineError::Task(e.to_string()))??;

        let chunks = self.chunking.split(&text)?;
        if chunks.is_empty() {
            return Err(PipelineError::NoChunks(kind.label()));
        }

        self.store.insert_texts(&chunks, Some(file_name)).await?;
        info!(
            file_name,
            kind = kind.label(),
            bytes = size,
            chunks = chunks.len(),
            "document ingested"
        );

        Ok(IngestReport {
            file_name: file_name.to_string(),
            kind,
            chunks_uploaded: chunks.len(),
        })
    }
}
