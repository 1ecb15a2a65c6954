//! Qdrant backend over gRPC.
//!
//! Payloads are flat objects `{ "text": ..., "file_name": ... }`, so
//! collections populated by other writers using the same layout stay
//! readable and filterable.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use qdrant_client::qdrant::point_id::PointIdOptions;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::{
    Condition, CreateCollectionBuilder, Distance, Filter, PointId, PointStruct,
    ScrollPointsBuilder, SearchPointsBuilder, UpsertPointsBuilder, Value as QdrantValue,
    VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant, QdrantError};
use tracing::debug;

use crate::backend::{ScrollPage, StoredPoint, VectorBackend};
use crate::{ChunkPayload, IndexError, SearchHit, SOURCE_TAG_FIELD, TEXT_FIELD};

/// A [`VectorBackend`] backed by [Qdrant](https://qdrant.tech/).
pub struct QdrantBackend {
    client: Qdrant,
}

impl QdrantBackend {
    /// Build a client for `url`. No connection is made until the first call.
    pub fn connect(
        url: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, IndexError> {
        let client = Qdrant::from_url(url)
            .api_key(api_key.filter(|k| !k.is_empty()))
            .timeout(timeout)
            .skip_compatibility_check()
            .build()
            .map_err(map_err)?;
        Ok(Self { client })
    }

    pub fn from_client(client: Qdrant) -> Self {
        Self { client }
    }
}

fn map_err(e: QdrantError) -> IndexError {
    IndexError::backend(format!("qdrant: {e}"))
}

fn extract_string(value: &QdrantValue) -> Option<String> {
    match &value.kind {
        Some(Kind::StringValue(s)) => Some(s.clone()),
        _ => None,
    }
}

fn payload_from_qdrant(payload: &HashMap<String, QdrantValue>) -> ChunkPayload {
    ChunkPayload {
        text: payload
            .get(TEXT_FIELD)
            .and_then(extract_string)
            .unwrap_or_default(),
        source_tag: payload.get(SOURCE_TAG_FIELD).and_then(extract_string),
    }
}

fn point_id_to_offset(id: PointId) -> Option<String> {
    match id.point_id_options? {
        PointIdOptions::Uuid(s) => Some(s),
        PointIdOptions::Num(n) => Some(n.to_string()),
    }
}

fn offset_to_point_id(offset: String) -> PointId {
    match offset.parse::<u64>() {
        Ok(n) => PointId::from(n),
        Err(_) => PointId::from(offset),
    }
}

#[async_trait]
impl VectorBackend for QdrantBackend {
    async fn collection_exists(&self, collection: &str) -> Result<bool, IndexError> {
        self.client
            .collection_exists(collection)
            .await
            .map_err(map_err)
    }

    async fn create_collection(
        &self,
        collection: &str,
        dimension: usize,
    ) -> Result<(), IndexError> {
        self.client
            .create_collection(
                CreateCollectionBuilder::new(collection).vectors_config(VectorParamsBuilder::new(
                    dimension as u64,
                    Distance::Cosine,
                )),
            )
            .await
            .map_err(map_err)?;
        debug!(collection, dimension, "created qdrant collection");
        Ok(())
    }

    async fn upsert(&self, collection: &str, points: Vec<StoredPoint>) -> Result<(), IndexError> {
        if points.is_empty() {
            return Ok(());
        }
        let count = points.len();

        let points = points
            .into_iter()
            .map(|point| {
                let json = serde_json::to_value(&point.payload)
                    .map_err(|e| IndexError::Encode(e.to_string()))?;
                let payload =
                    Payload::try_from(json).map_err(|e| IndexError::Encode(e.to_string()))?;
                Ok(PointStruct::new(point.id, point.vector, payload))
            })
            .collect::<Result<Vec<_>, IndexError>>()?;

        self.client
            .upsert_points(UpsertPointsBuilder::new(collection, points).wait(true))
            .await
            .map_err(map_err)?;

        debug!(collection, count, "upserted points to qdrant");
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        k: usize,
        source_tag: Option<&str>,
    ) -> Result<Vec<SearchHit>, IndexError> {
        let mut request =
            SearchPointsBuilder::new(collection, vector.to_vec(), k as u64).with_payload(true);
        if let Some(tag) = source_tag {
            request = request.filter(Filter::must([Condition::matches(
                SOURCE_TAG_FIELD,
                tag.to_string(),
            )]));
        }

        let response = self.client.search_points(request).await.map_err(map_err)?;
        debug!(collection, hits = response.result.len(), "qdrant search");

        Ok(response
            .result
            .into_iter()
            .map(|scored| SearchHit {
                text: payload_from_qdrant(&scored.payload).text,
                score: scored.score,
            })
            .collect())
    }

    async fn scroll(
        &self,
        collection: &str,
        offset: Option<String>,
        limit: usize,
    ) -> Result<ScrollPage, IndexError> {
        let mut request = ScrollPointsBuilder::new(collection)
            .limit(u32::try_from(limit).unwrap_or(u32::MAX))
            .with_payload(true)
            .with_vectors(false);
        if let Some(offset) = offset {
            request = request.offset(offset_to_point_id(offset));
        }

        let response = self.client.scroll(request).await.map_err(map_err)?;

        Ok(ScrollPage {
            payloads: response
                .result
                .iter()
                .map(|point| payload_from_qdrant(&point.payload))
                .collect(),
            next_offset: response.next_page_offset.and_then(point_id_to_offset),
        })
    }

    async fn ping(&self) -> Result<(), IndexError> {
        self.client.list_collections().await.map_err(map_err)?;
        Ok(())
    }
}
