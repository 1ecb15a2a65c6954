use async_trait::async_trait;
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::{Embedder, EmbedderConfig, SemanticError};

/// [`Embedder`] backed by an OpenAI-compatible `/embeddings` endpoint.
///
/// Large batches are split into `batch_size` sub-requests that run
/// concurrently; results are placed back into input order using the
/// `index` field of every returned item.
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
    dimensions: usize,
    batch_size: usize,
}

impl OpenAiEmbedder {
    pub fn new(cfg: &EmbedderConfig) -> Result<Self, SemanticError> {
        let api_key = cfg
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                SemanticError::InvalidConfig("api_key is required for api mode".into())
            })?;

        let client = reqwest::Client::builder()
            .timeout(cfg.timeout())
            .pool_max_idle_per_host(32)
            .build()
            .map_err(|e| SemanticError::InvalidConfig(format!("http client: {e}")))?;

        Ok(Self {
            client,
            url: format!("{}/embeddings", cfg.api_base.trim_end_matches('/')),
            api_key,
            model: cfg.model.clone(),
            dimensions: cfg.dimensions,
            batch_size: cfg.batch_size.max(1),
        })
    }

    async fn request_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, SemanticError> {
        let body = EmbeddingRequest {
            model: &self.model,
            input: texts,
        };

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "embedding request failed");
                SemanticError::from(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ApiErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            error!(%status, "embedding API error");
            return Err(SemanticError::Http {
                status: status.as_u16(),
                body: detail,
            });
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| SemanticError::Decode(format!("embedding response: {e}")))?;

        reorder_by_index(parsed.data, texts.len())
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, SemanticError> {
        let mut vectors = self.request_batch(&[text.to_string()]).await?;
        vectors.pop().ok_or(SemanticError::BatchMismatch {
            expected: 1,
            got: 0,
        })
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, SemanticError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            inputs = texts.len(),
            requests = texts.len().div_ceil(self.batch_size),
            model = %self.model,
            "embedding batch"
        );

        let parts = try_join_all(
            texts
                .chunks(self.batch_size)
                .map(|part| self.request_batch(part)),
        )
        .await?;

        Ok(parts.into_iter().flatten().collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    #[serde(default)]
    index: Option<usize>,
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Place every returned vector at the input position named by its `index`.
/// Items without an index fall back to their array position.
fn reorder_by_index(
    items: Vec<EmbeddingItem>,
    expected: usize,
) -> Result<Vec<Vec<f32>>, SemanticError> {
    if items.len() != expected {
        return Err(SemanticError::BatchMismatch {
            expected,
            got: items.len(),
        });
    }

    let mut slots: Vec<Option<Vec<f32>>> = vec![None; expected];
    for (position, item) in items.into_iter().enumerate() {
        let idx = item.index.unwrap_or(position);
        let slot = slots.get_mut(idx).ok_or_else(|| {
            SemanticError::Decode(format!("embedding index {idx} out of range"))
        })?;
        if slot.replace(item.embedding).is_some() {
            return Err(SemanticError::Decode(format!(
                "duplicate embedding index {idx}"
            )));
        }
    }

    // Every slot is filled: counts match and duplicates were rejected.
    Ok(slots.into_iter().flatten().collect())
}
