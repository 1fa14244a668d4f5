//! Evidence re-ranking
//!
//! A pairwise (query, candidate) scorer refines the retrieval ordering.
//! Collaborator scores are unbounded; normalization into [0, 1] happens
//! here before blending with the original similarity.

use crate::error::Result;
use async_trait::async_trait;

/// Pairwise relevance scorer for (query, candidate) text pairs
#[async_trait]
pub trait Reranker: Send + Sync {
    /// Unbounded relevance score; higher means more relevant
    async fn score(&self, query: &str, candidate: &str) -> Result<f32>;
}

/// Squash an unbounded reranker score into [0, 1] via the logistic function
pub(crate) fn normalize_score(raw: f32) -> f32 {
    1.0 / (1.0 + (-raw).exp())
}
