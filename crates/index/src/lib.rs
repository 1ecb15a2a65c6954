//! # routerag Index
//!
//! Vector storage and retrieval for document chunks.
//!
//! [`VectorStore`] is the entry point. It owns one collection in a
//! [`VectorBackend`], generates ids, checks vector dimensions and turns text
//! into vectors through a [`semantic::Embedder`] when asked to.
//!
//! ## Backends
//!
//! - [`QdrantBackend`] - a remote Qdrant instance over gRPC.
//! - [`InMemoryBackend`] - a `RwLock<HashMap>` with brute-force cosine search,
//!   for tests and throwaway deployments.
//!
//! ## Source tags
//!
//! Every chunk can carry the file name it came from. Searches may be scoped to
//! one tag, and [`VectorStore::list_source_tags`] lists the distinct tags in the
//! collection.
//!
//! ## Example Usage
//!
//! ```
//! use std::sync::Arc;
//! use index::{IndexConfig, InMemoryBackend, VectorStore};
//! use semantic::HashingEmbedder;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), index::IndexError> {
//! let cfg = IndexConfig { dimension: 64, ..Default::default() };
//! let store = VectorStore::with_backend(
//!     &cfg,
//!     Arc::new(InMemoryBackend::new()),
//!     Arc::new(HashingEmbedder::new(64)),
//! )?;
//!
//! store
//!     .insert_texts(&["Summit at 2400 m".to_string()], Some("alps.gpx"))
//!     .await?;
//! let hits = store.search_by_text("summit", 3, Some("alps.gpx")).await?;
//! assert_eq!(hits.len(), 1);
//! # Ok(())
//! # }
//! ```

mod backend;
mod qdrant;

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use semantic::{Embedder, SemanticError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub use backend::{BackendConfig, InMemoryBackend, ScrollPage, StoredPoint, VectorBackend};
pub use qdrant::QdrantBackend;

/// Payload key holding the chunk text.
pub const TEXT_FIELD: &str = "text";
/// Payload key holding the source tag.
pub const SOURCE_TAG_FIELD: &str = "file_name";

const SCROLL_PAGE_SIZE: usize = 256;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Backend error: {0}")]
    Backend(String),
    #[error("Serialization encode error: {0}")]
    Encode(String),
    #[error("k must be at least 1")]
    InvalidK,
    #[error("vector has {got} dimensions, collection expects {expected}")]
    DimensionMismatch { expected: usize, got: usize },
    #[error("collection '{0}' does not exist")]
    CollectionNotFound(String),
    #[error("invalid index config: {0}")]
    InvalidConfig(String),
    #[error("embedding failed: {0}")]
    Embedding(#[from] SemanticError),
}

impl IndexError {
    pub fn backend<E: std::fmt::Display>(err: E) -> Self {
        IndexError::Backend(err.to_string())
    }
}

/// Stored metadata of one chunk.
///
/// The tag is serialized as `file_name`, matching [`SOURCE_TAG_FIELD`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkPayload {
    pub text: String,
    #[serde(
        rename = "file_name",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub source_tag: Option<String>,
}

/// A retrieved chunk and its cosine similarity to the query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    pub text: String,
    pub score: f32,
}

/// Runtime configuration for a [`VectorStore`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IndexConfig {
    /// `"qdrant"` or `"in_memory"`.
    pub backend: String,
    /// Qdrant gRPC endpoint.
    pub url: String,
    pub api_key: Option<String>,
    pub collection: String,
    pub dimension: usize,
    /// Upper bound on records read by [`VectorStore::list_source_tags`].
    pub scan_limit: usize,
    pub timeout_secs: u64,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            backend: "qdrant".into(),
            url: "http://localhost:6334".into(),
            api_key: None,
            collection: "default".into(),
            dimension: 1536,
            scan_limit: 1000,
            timeout_secs: 30,
        }
    }
}

impl IndexConfig {
    /// Translate the backend name into a buildable [`BackendConfig`].
    pub fn backend_config(&self) -> Result<BackendConfig, IndexError> {
        match self.backend.as_str() {
            "qdrant" => Ok(BackendConfig::Qdrant {
                url: self.url.clone(),
                api_key: self.api_key.clone(),
                timeout: Duration::from_secs(self.timeout_secs),
            }),
            "in_memory" | "memory" => Ok(BackendConfig::InMemory),
            other => Err(IndexError::InvalidConfig(format!(
                "unknown backend '{other}'"
            ))),
        }
    }

    pub fn validate(&self) -> Result<(), IndexError> {
        if self.dimension == 0 {
            return Err(IndexError::InvalidConfig(
                "dimension must be positive".into(),
            ));
        }
        if self.scan_limit == 0 {
            return Err(IndexError::InvalidConfig(
                "scan_limit must be positive".into(),
            ));
        }
        if self.collection.trim().is_empty() {
            return Err(IndexError::InvalidConfig(
                "collection name must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// Cosine similarity `a·b / (‖a‖‖b‖)`.
///
/// Returns 0.0 when either vector is all zeros or the lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let (mut dot, mut norm_a, mut norm_b) = (0.0f32, 0.0f32, 0.0f32);
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// A single collection of chunk vectors.
pub struct VectorStore {
    backend: Arc<dyn VectorBackend>,
    embedder: Arc<dyn Embedder>,
    collection: String,
    dimension: usize,
    scan_limit: usize,
    ready: AtomicBool,
}

impl VectorStore {
    /// Build the configured backend and wrap it.
    pub fn new(cfg: &IndexConfig, embedder: Arc<dyn Embedder>) -> Result<Self, IndexError> {
        let backend = cfg.backend_config()?.build()?;
        Self::with_backend(cfg, backend, embedder)
    }

    /// Wrap an existing backend. The embedder must produce vectors of the
    /// configured dimension.
    pub fn with_backend(
        cfg: &IndexConfig,
        backend: Arc<dyn VectorBackend>,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self, IndexError> {
        cfg.validate()?;
        if embedder.dimensions() != cfg.dimension {
            return Err(IndexError::InvalidConfig(format!(
                "embedder '{}' produces {} dimensions, collection expects {}",
                embedder.model_name(),
                embedder.dimensions(),
                cfg.dimension
            )));
        }

        Ok(Self {
            backend,
            embedder,
            collection: cfg.collection.clone(),
            dimension: cfg.dimension,
            scan_limit: cfg.scan_limit,
            ready: AtomicBool::new(false),
        })
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    /// Create the collection unless it already exists.
    ///
    /// Safe to call concurrently: when a create call fails because another
    /// caller won the race, existence is re-checked and the call succeeds.
    pub async fn ensure_collection(&self) -> Result<(), IndexError> {
        if self.backend.collection_exists(&self.collection).await? {
            self.ready.store(true, Ordering::Release);
            return Ok(());
        }

        match self
            .backend
            .create_collection(&self.collection, self.dimension)
            .await
        {
            Ok(()) => {
                info!(
                    collection = %self.collection,
                    dimension = self.dimension,
                    "created collection"
                );
            }
            Err(err) => {
                if !self.backend.collection_exists(&self.collection).await? {
                    return Err(err);
                }
                debug!(collection = %self.collection, "collection created concurrently");
            }
        }

        self.ready.store(true, Ordering::Release);
        Ok(())
    }

    async fn ensure_ready(&self) -> Result<(), IndexError> {
        if self.ready.load(Ordering::Acquire) {
            return Ok(());
        }
        self.ensure_collection().await
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<(), IndexError> {
        if vector.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                got: vector.len(),
            });
        }
        Ok(())
    }

    /// Store one chunk under a fresh id and return the id.
    pub async fn insert(
        &self,
        text: &str,
        vector: Vec<f32>,
        source_tag: Option<&str>,
    ) -> Result<String, IndexError> {
        self.check_dimension(&vector)?;
        self.ensure_ready().await?;

        let id = Uuid::new_v4().to_string();
        self.backend
            .upsert(
                &self.collection,
                vec![StoredPoint {
                    id: id.clone(),
                    vector,
                    payload: ChunkPayload {
                        text: text.to_string(),
                        source_tag: source_tag.map(str::to_string),
                    },
                }],
            )
            .await?;
        Ok(id)
    }

    /// Embed every text in one batch and store them, all under `source_tag`.
    ///
    /// Returns the new ids in input order. Nothing is written if embedding
    /// fails.
    pub async fn insert_texts(
        &self,
        texts: &[String],
        source_tag: Option<&str>,
    ) -> Result<Vec<String>, IndexError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let vectors = self.embedder.embed_batch(texts).await?;
        if vectors.len() != texts.len() {
            return Err(SemanticError::BatchMismatch {
                expected: texts.len(),
                got: vectors.len(),
            }
            .into());
        }
        for vector in &vectors {
            self.check_dimension(vector)?;
        }
        self.ensure_ready().await?;

        let points: Vec<StoredPoint> = texts
            .iter()
            .zip(vectors)
            .map(|(text, vector)| StoredPoint {
                id: Uuid::new_v4().to_string(),
                vector,
                payload: ChunkPayload {
                    text: text.clone(),
                    source_tag: source_tag.map(str::to_string),
                },
            })
            .collect();
        let ids = points.iter().map(|p| p.id.clone()).collect();

        self.backend.upsert(&self.collection, points).await?;
        info!(
            collection = %self.collection,
            count = texts.len(),
            source_tag = source_tag.unwrap_or("-"),
            "inserted chunks"
        );
        Ok(ids)
    }

    /// Up to `k` nearest chunks, best first, optionally restricted to one tag.
    pub async fn search(
        &self,
        query: &[f32],
        k: usize,
        source_tag: Option<&str>,
    ) -> Result<Vec<SearchHit>, IndexError> {
        if k == 0 {
            return Err(IndexError::InvalidK);
        }
        self.check_dimension(query)?;
        self.ensure_ready().await?;

        let mut hits = self
            .backend
            .search(&self.collection, query, k, source_tag)
            .await?;
        hits.truncate(k);
        Ok(hits)
    }

    /// Embed `query` and run [`VectorStore::search`].
    pub async fn search_by_text(
        &self,
        query: &str,
        k: usize,
        source_tag: Option<&str>,
    ) -> Result<Vec<SearchHit>, IndexError> {
        if k == 0 {
            return Err(IndexError::InvalidK);
        }
        let vector = self.embedder.embed(query).await?;
        self.search(&vector, k, source_tag).await
    }

    /// Distinct source tags, sorted.
    ///
    /// Reads at most `scan_limit` records; on larger collections the result
    /// may miss tags and a warning is logged.
    pub async fn list_source_tags(&self) -> Result<Vec<String>, IndexError> {
        self.ensure_ready().await?;

        let mut tags = BTreeSet::new();
        let mut scanned = 0usize;
        let mut offset = None;

        loop {
            let remaining = self.scan_limit.saturating_sub(scanned);
            let page = self
                .backend
                .scroll(&self.collection, offset, remaining.min(SCROLL_PAGE_SIZE))
                .await?;

            scanned += page.payloads.len();
            tags.extend(page.payloads.into_iter().filter_map(|p| p.source_tag));

            match page.next_offset {
                None => break,
                Some(_) if scanned >= self.scan_limit => {
                    warn!(
                        collection = %self.collection,
                        scan_limit = self.scan_limit,
                        "source tag scan truncated; listing may be incomplete"
                    );
                    break;
                }
                Some(next) => offset = Some(next),
            }
        }

        Ok(tags.into_iter().collect())
    }

    /// Round-trip to the backend without touching the collection.
    pub async fn health_check(&self) -> Result<(), IndexError> {
        self.backend.ping().await
    }
}
