use async_trait::async_trait;
use fxhash::hash64;

use crate::normalize::l2_normalize_in_place;
use crate::{Embedder, SemanticError};

/// Offline embedder based on the hashing trick.
///
/// Every lowercase alphanumeric word is hashed into one of `dimensions`
/// buckets with a hash-derived sign, then the vector is L2-normalized. Texts
/// sharing words end up with high cosine similarity, which is enough for
/// local development and for exercising retrieval without a remote model.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimensions: usize,
}

impl HashingEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    /// Synchronous core shared by `embed` and `embed_batch`.
    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dimensions];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let h = hash64(word.to_lowercase().as_bytes());
            let idx = (h % self.dimensions as u64) as usize;
            let sign = if (h >> 63) == 0 { 1.0 } else { -1.0 };
            v[idx] += sign;
        }
        l2_normalize_in_place(&mut v);
        v
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, SemanticError> {
        Ok(self.embed_sync(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, SemanticError> {
        Ok(texts.iter().map(|t| self.embed_sync(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        "hashing"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dot(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[test]
    fn deterministic_for_same_text() {
        let embedder = HashingEmbedder::new(128);
        assert_eq!(
            embedder.embed_sync("The quick brown fox"),
            embedder.embed_sync("The quick brown fox")
        );
    }

    #[test]
    fn case_and_punctuation_insensitive() {
        let embedder = HashingEmbedder::new(128);
        assert_eq!(
            embedder.embed_sync("Quick, brown fox!"),
            embedder.embed_sync("quick brown fox")
        );
    }

    #[test]
    fn shared_words_score_higher() {
        let embedder = HashingEmbedder::new(256);
        let query = embedder.embed_sync("quick brown fox");
        let close = embedder.embed_sync("The quick brown fox jumps over the lazy dog.");
        let far = embedder.embed_sync("Elevation gain on the mountain pass");
        assert!(dot(&query, &close) > dot(&query, &far));
    }

    #[test]
    fn empty_text_is_zero_vector() {
        let embedder = HashingEmbedder::new(16);
        let v = embedder.embed_sync("   ");
        assert_eq!(v.len(), 16);
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[tokio::test]
    async fn batch_matches_single_calls() {
        let embedder = HashingEmbedder::new(32);
        let texts = vec!["alpha beta".to_string(), "gamma".to_string()];
        let batch = embedder.embed_batch(&texts).await.unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0], embedder.embed("alpha beta").await.unwrap());
        assert_eq!(batch[1], embedder.embed("gamma").await.unwrap());
    }
}
