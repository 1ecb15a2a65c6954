use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;

use crate::qdrant::QdrantBackend;
use crate::{cosine_similarity, ChunkPayload, IndexError, SearchHit};

/// A vector plus its payload, ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredPoint {
    pub id: String,
    pub vector: Vec<f32>,
    pub payload: ChunkPayload,
}

/// One page of a payload scan.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScrollPage {
    pub payloads: Vec<ChunkPayload>,
    /// Opaque cursor for the next page; `None` once the scan is exhausted.
    pub next_offset: Option<String>,
}

/// Storage engine behind a [`crate::VectorStore`].
///
/// Implementations only move data; dimension checks, id generation and
/// `k` validation happen in the store.
#[async_trait]
pub trait VectorBackend: Send + Sync {
    async fn collection_exists(&self, collection: &str) -> Result<bool, IndexError>;

    /// Create a collection using cosine distance.
    async fn create_collection(&self, collection: &str, dimension: usize)
        -> Result<(), IndexError>;

    /// Write points and return once they are visible to searches.
    async fn upsert(&self, collection: &str, points: Vec<StoredPoint>) -> Result<(), IndexError>;

    /// Nearest neighbours by cosine similarity, best first. With a tag, only
    /// points whose stored tag equals it exactly are considered.
    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        k: usize,
        source_tag: Option<&str>,
    ) -> Result<Vec<SearchHit>, IndexError>;

    /// Read up to `limit` payloads starting at `offset`.
    async fn scroll(
        &self,
        collection: &str,
        offset: Option<String>,
        limit: usize,
    ) -> Result<ScrollPage, IndexError>;

    /// Cheap round-trip proving the backend is reachable.
    async fn ping(&self) -> Result<(), IndexError>;
}

/// Configuration for selecting and building a backend.
///
/// # Example
/// ```
/// use index::BackendConfig;
///
/// // In-memory (for testing)
/// let config = BackendConfig::in_memory();
///
/// // Qdrant over gRPC
/// let config = BackendConfig::qdrant("http://localhost:6334", None);
/// ```
#[derive(Clone, Debug, Default)]
pub enum BackendConfig {
    /// A remote Qdrant instance.
    Qdrant {
        url: String,
        api_key: Option<String>,
        timeout: Duration,
    },
    /// A process-local map. Contents are lost on restart.
    #[default]
    InMemory,
}

impl BackendConfig {
    pub fn in_memory() -> Self {
        BackendConfig::InMemory
    }

    pub fn qdrant<U: Into<String>>(url: U, api_key: Option<String>) -> Self {
        BackendConfig::Qdrant {
            url: url.into(),
            api_key,
            timeout: Duration::from_secs(30),
        }
    }

    /// Build the backend. Qdrant connections are established lazily, so
    /// this succeeds even when the server is down.
    pub fn build(&self) -> Result<Arc<dyn VectorBackend>, IndexError> {
        match self {
            BackendConfig::InMemory => Ok(Arc::new(InMemoryBackend::new())),
            BackendConfig::Qdrant {
                url,
                api_key,
                timeout,
            } => Ok(Arc::new(QdrantBackend::connect(
                url,
                api_key.clone(),
                *timeout,
            )?)),
        }
    }
}

struct MemoryCollection {
    dimension: usize,
    points: Vec<StoredPoint>,
}

/// An in-memory backend using a `RwLock` around a `HashMap` of collections.
///
/// Search is brute-force cosine similarity over every stored point.
pub struct InMemoryBackend {
    collections: RwLock<HashMap<String, MemoryCollection>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn missing(collection: &str) -> IndexError {
    IndexError::CollectionNotFound(collection.to_string())
}

#[async_trait]
impl VectorBackend for InMemoryBackend {
    async fn collection_exists(&self, collection: &str) -> Result<bool, IndexError> {
        let guard = self
            .collections
            .read()
            .map_err(|_| IndexError::backend("poisoned lock"))?;
        Ok(guard.contains_key(collection))
    }

    async fn create_collection(
        &self,
        collection: &str,
        dimension: usize,
    ) -> Result<(), IndexError> {
        let mut guard = self
            .collections
            .write()
            .map_err(|_| IndexError::backend("poisoned lock"))?;
        if guard.contains_key(collection) {
            return Err(IndexError::backend(format!(
                "collection '{collection}' already exists"
            )));
        }
        guard.insert(
            collection.to_string(),
            MemoryCollection {
                dimension,
                points: Vec::new(),
            },
        );
        Ok(())
    }

    async fn upsert(&self, collection: &str, points: Vec<StoredPoint>) -> Result<(), IndexError> {
        let mut guard = self
            .collections
            .write()
            .map_err(|_| IndexError::backend("poisoned lock"))?;
        let target = guard.get_mut(collection).ok_or_else(|| missing(collection))?;

        if let Some(bad) = points.iter().find(|p| p.vector.len() != target.dimension) {
            return Err(IndexError::DimensionMismatch {
                expected: target.dimension,
                got: bad.vector.len(),
            });
        }

        for point in points {
            match target.points.iter_mut().find(|p| p.id == point.id) {
                Some(existing) => *existing = point,
                None => target.points.push(point),
            }
        }
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        k: usize,
        source_tag: Option<&str>,
    ) -> Result<Vec<SearchHit>, IndexError> {
        let guard = self
            .collections
            .read()
            .map_err(|_| IndexError::backend("poisoned lock"))?;
        let target = guard.get(collection).ok_or_else(|| missing(collection))?;

        let mut hits: Vec<SearchHit> = target
            .points
            .iter()
            .filter(|p| source_tag.is_none() || p.payload.source_tag.as_deref() == source_tag)
            .map(|p| SearchHit {
                text: p.payload.text.clone(),
                score: cosine_similarity(vector, &p.vector),
            })
            .collect();

        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(k);
        Ok(hits)
    }

    async fn scroll(
        &self,
        collection: &str,
        offset: Option<String>,
        limit: usize,
    ) -> Result<ScrollPage, IndexError> {
        let start = match offset {
            Some(raw) => raw
                .parse::<usize>()
                .map_err(|_| IndexError::backend(format!("invalid scroll offset '{raw}'")))?,
            None => 0,
        };

        let guard = self
            .collections
            .read()
            .map_err(|_| IndexError::backend("poisoned lock"))?;
        let target = guard.get(collection).ok_or_else(|| missing(collection))?;

        let end = start.saturating_add(limit).min(target.points.len());
        let payloads = target
            .points
            .get(start..end)
            .unwrap_or_default()
            .iter()
            .map(|p| p.payload.clone())
            .collect();
        let next_offset = (end < target.points.len()).then(|| end.to_string());

        Ok(ScrollPage {
            payloads,
            next_offset,
        })
    }

    async fn ping(&self) -> Result<(), IndexError> {
        self.collections
            .read()
            .map(|_| ())
            .map_err(|_| IndexError::backend("poisoned lock"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(id: &str, vector: Vec<f32>, text: &str, tag: Option<&str>) -> StoredPoint {
        StoredPoint {
            id: id.into(),
            vector,
            payload: ChunkPayload {
                text: text.into(),
                source_tag: tag.map(str::to_string),
            },
        }
    }

    #[tokio::test]
    async fn create_twice_fails() {
        let backend = InMemoryBackend::new();
        backend.create_collection("c", 2).await.unwrap();
        assert!(backend.collection_exists("c").await.unwrap());
        assert!(backend.create_collection("c", 2).await.is_err());
    }

    #[tokio::test]
    async fn upsert_into_missing_collection_fails() {
        let backend = InMemoryBackend::new();
        let err = backend
            .upsert("nope", vec![point("1", vec![1.0, 0.0], "a", None)])
            .await
            .unwrap_err();
        assert!(matches!(err, IndexError::CollectionNotFound(_)));
    }

    #[tokio::test]
    async fn upsert_replaces_same_id() {
        let backend = InMemoryBackend::new();
        backend.create_collection("c", 2).await.unwrap();
        backend
            .upsert("c", vec![point("1", vec![1.0, 0.0], "old", None)])
            .await
            .unwrap();
        backend
            .upsert("c", vec![point("1", vec![1.0, 0.0], "new", None)])
            .await
            .unwrap();

        let hits = backend.search("c", &[1.0, 0.0], 10, None).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].text, "new");
    }

    #[tokio::test]
    async fn search_sorts_and_truncates() {
        let backend = InMemoryBackend::new();
        backend.create_collection("c", 2).await.unwrap();
        backend
            .upsert(
                "c",
                vec![
                    point("1", vec![0.0, 1.0], "far", None),
                    point("2", vec![1.0, 0.0], "exact", None),
                    point("3", vec![1.0, 1.0], "near", None),
                ],
            )
            .await
            .unwrap();

        let hits = backend.search("c", &[1.0, 0.0], 2, None).await.unwrap();
        let texts: Vec<_> = hits.iter().map(|h| h.text.as_str()).collect();
        assert_eq!(texts, vec!["exact", "near"]);
        assert!(hits[0].score >= hits[1].score);
    }

    #[tokio::test]
    async fn scroll_pages_through_everything() {
        let backend = InMemoryBackend::new();
        backend.create_collection("c", 1).await.unwrap();
        let points = (0..5)
            .map(|i| point(&i.to_string(), vec![1.0], &format!("t{i}"), None))
            .collect();
        backend.upsert("c", points).await.unwrap();

        let first = backend.scroll("c", None, 2).await.unwrap();
        assert_eq!(first.payloads.len(), 2);
        assert_eq!(first.next_offset.as_deref(), Some("2"));

        let last = backend.scroll("c", Some("4".into()), 2).await.unwrap();
        assert_eq!(last.payloads.len(), 1);
        assert!(last.next_offset.is_none());

        let past_end = backend.scroll("c", Some("9".into()), 2).await.unwrap();
        assert!(past_end.payloads.is_empty());
        assert!(past_end.next_offset.is_none());
    }
}
