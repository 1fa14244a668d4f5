//! Common test utilities and helpers

#![allow(dead_code)]

use async_trait::async_trait;
use quadra::{
    BaseClassifier, EmbeddingConfig, EmbeddingProvider, EngineHealth, Example, ExampleCorpus,
    FastEngineClient, FastInference, FastPathError, FixedPriorClassifier, Provenance, QuadraError,
    Quadrant, Reranker, Result, ScoringConfig, ScoringEngine,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Embedding provider returning pre-scripted vectors keyed by exact text
pub struct StubEmbedder {
    vectors: HashMap<String, Vec<f32>>,
    dimensions: usize,
}

impl StubEmbedder {
    pub fn new(pairs: &[(&str, Vec<f32>)]) -> Self {
        let dimensions = pairs.first().map(|(_, v)| v.len()).unwrap_or(2);
        Self {
            vectors: pairs
                .iter()
                .map(|(text, vector)| (text.to_string(), vector.clone()))
                .collect(),
            dimensions,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for StubEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.vectors
            .get(text)
            .cloned()
            .ok_or_else(|| QuadraError::Embedding(format!("no scripted vector for {:?}", text)))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        "scripted-stub"
    }
}

/// Fast engine that never comes up
pub struct UnavailableFastEngine;

#[async_trait]
impl FastEngineClient for UnavailableFastEngine {
    async fn health(&self) -> EngineHealth {
        EngineHealth::Unavailable
    }

    async fn infer(
        &self,
        _task: &str,
        _deadline: Duration,
    ) -> std::result::Result<FastInference, FastPathError> {
        Err(FastPathError::Transport("connection refused".to_string()))
    }
}

/// Healthy fast engine answering every request with a fixed quadrant
pub struct HealthyFastEngine {
    pub quadrant: Quadrant,
}

#[async_trait]
impl FastEngineClient for HealthyFastEngine {
    async fn health(&self) -> EngineHealth {
        EngineHealth::Ok
    }

    async fn infer(
        &self,
        _task: &str,
        _deadline: Duration,
    ) -> std::result::Result<FastInference, FastPathError> {
        Ok(FastInference {
            quadrant: self.quadrant,
            confidence: Some(0.9),
        })
    }
}

/// Healthy fast engine whose inference always fails
pub struct FailingFastEngine;

#[async_trait]
impl FastEngineClient for FailingFastEngine {
    async fn health(&self) -> EngineHealth {
        EngineHealth::Ok
    }

    async fn infer(
        &self,
        _task: &str,
        _deadline: Duration,
    ) -> std::result::Result<FastInference, FastPathError> {
        Err(FastPathError::Transport("boom".to_string()))
    }
}

/// Healthy fast engine that answers only after `delay`
pub struct SlowFastEngine {
    pub delay: Duration,
    pub quadrant: Quadrant,
}

#[async_trait]
impl FastEngineClient for SlowFastEngine {
    async fn health(&self) -> EngineHealth {
        EngineHealth::Ok
    }

    async fn infer(
        &self,
        _task: &str,
        _deadline: Duration,
    ) -> std::result::Result<FastInference, FastPathError> {
        tokio::time::sleep(self.delay).await;
        Ok(FastInference {
            quadrant: self.quadrant,
            confidence: Some(0.5),
        })
    }
}

/// Base classifier that always fails
pub struct FailingClassifier;

#[async_trait]
impl BaseClassifier for FailingClassifier {
    async fn predict(&self, _text: &str) -> Result<Quadrant> {
        Err(QuadraError::BaseClassifier("model unavailable".to_string()))
    }
}

/// Reranker returning pre-scripted raw scores keyed by candidate text
pub struct ScriptedReranker {
    scores: HashMap<String, f32>,
}

impl ScriptedReranker {
    pub fn new(pairs: &[(&str, f32)]) -> Self {
        Self {
            scores: pairs
                .iter()
                .map(|(text, score)| (text.to_string(), *score))
                .collect(),
        }
    }
}

#[async_trait]
impl Reranker for ScriptedReranker {
    async fn score(&self, _query: &str, candidate: &str) -> Result<f32> {
        self.scores
            .get(candidate)
            .copied()
            .ok_or_else(|| QuadraError::Other(format!("no scripted score for {:?}", candidate)))
    }
}

/// Reranker that always fails
pub struct FailingReranker;

#[async_trait]
impl Reranker for FailingReranker {
    async fn score(&self, _query: &str, _candidate: &str) -> Result<f32> {
        Err(QuadraError::Other("rerank backend down".to_string()))
    }
}

/// Empty corpus using only lexical retrieval
pub fn lexical_corpus() -> Arc<ExampleCorpus> {
    Arc::new(ExampleCorpus::new(&EmbeddingConfig::default()))
}

/// Empty corpus backed by a scripted semantic embedder
pub fn scripted_corpus(pairs: &[(&str, Vec<f32>)]) -> Arc<ExampleCorpus> {
    Arc::new(ExampleCorpus::with_semantic_provider(
        &EmbeddingConfig::default(),
        Some(Arc::new(StubEmbedder::new(pairs))),
    ))
}

/// Scoring engine over `corpus` with a fixed base prediction and default settings
pub fn engine_with(corpus: Arc<ExampleCorpus>, base: Quadrant) -> ScoringEngine {
    ScoringEngine::new(
        corpus,
        Arc::new(FixedPriorClassifier(base)),
        ScoringConfig::default(),
    )
}

/// Append a user-provenance example, panicking on failure
pub async fn push(corpus: &ExampleCorpus, text: &str, label: Quadrant) -> u64 {
    corpus
        .append(Example::new(text, label, Provenance::User))
        .await
        .expect("append failed")
}
