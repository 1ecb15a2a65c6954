use async_trait::async_trait;
use futures::future::try_join_all;

use crate::SemanticError;

/// Something that turns text into fixed-length vectors.
///
/// `embed_batch` must return one vector per input, in input order. The default
/// implementation fans every text out as its own concurrent `embed` call and
/// joins them; implementations with a native batch endpoint override it.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, SemanticError>;

    /// Embed many texts concurrently. Fails as a whole if any request fails.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, SemanticError> {
        try_join_all(texts.iter().map(|text| self.embed(text))).await
    }

    /// Length of every vector this embedder produces.
    fn dimensions(&self) -> usize;

    /// Model label, surfaced in logs.
    fn model_name(&self) -> &str;
}
