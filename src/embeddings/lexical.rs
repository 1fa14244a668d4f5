//! Hashed lexical embedding fallback
//!
//! Deterministic character n-gram and word-token hashing into a fixed
//! number of dimensions. No model, no I/O, always available; retrieval
//! falls back to this whenever a semantic provider is absent or has
//! degraded.

use crate::embeddings::EmbeddingProvider;
use crate::error::{QuadraError, Result};
use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Method identifier reported by `model_name`
pub const LEXICAL_METHOD: &str = "lexical-ngram-v1";

/// Lexical embedding provider over hashed n-grams and word tokens
pub struct LexicalEmbedder {
    dimensions: usize,
}

impl LexicalEmbedder {
    /// Create an embedder producing vectors of the given size
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    /// Deterministic embedding: character n-grams (sizes 2-4) hashed into
    /// buckets, word tokens hashed at double weight, then L2 normalized.
    ///
    /// Same text always yields the same vector, so lexical indexes never
    /// need version-aware invalidation beyond the corpus version itself.
    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.dimensions];
        let text_lower = text.to_lowercase();
        let chars: Vec<char> = text_lower.chars().collect();

        for window_size in 2..=4 {
            for window in chars.windows(window_size) {
                let mut hasher = DefaultHasher::new();
                window.iter().collect::<String>().hash(&mut hasher);
                let dim = (hasher.finish() as usize) % self.dimensions;
                embedding[dim] += 1.0;
            }
        }

        // Whole words carry more signal than character fragments
        for word in text_lower.split_whitespace() {
            let mut hasher = DefaultHasher::new();
            word.hash(&mut hasher);
            let dim = (hasher.finish() as usize) % self.dimensions;
            embedding[dim] += 2.0;
        }

        let magnitude: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for value in &mut embedding {
                *value /= magnitude;
            }
        }

        embedding
    }
}

#[async_trait]
impl EmbeddingProvider for LexicalEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.is_empty() {
            return Err(QuadraError::Validation("Text cannot be empty".to_string()));
        }
        Ok(self.embed_sync(text))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        texts
            .iter()
            .map(|text| {
                if text.is_empty() {
                    Err(QuadraError::Validation("Text cannot be empty".to_string()))
                } else {
                    Ok(self.embed_sync(text))
                }
            })
            .collect()
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        LEXICAL_METHOD
    }
}
