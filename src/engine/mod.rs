//! Retrieval-augmented scoring engine
//!
//! Blends a base classifier's prediction with labeled evidence retrieved
//! from the example corpus. Evidence is floor-filtered by retrieval
//! method, optionally re-ranked, then folded into a weighted vote across
//! the four quadrants. The result carries the winning quadrant, a
//! normalized confidence, a coarse confidence bucket, and how the
//! evidence related to the base prediction.

pub mod rerank;

pub use rerank::Reranker;

use crate::config::ScoringConfig;
use crate::corpus::ExampleCorpus;
use crate::error::{QuadraError, Result};
use crate::types::{
    ConfidenceBucket, DecisionShift, Evidence, Quadrant, RetrievalMethod, ScoringResult,
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

/// Capability contract for the underlying text classifier
#[async_trait]
pub trait BaseClassifier: Send + Sync {
    /// Predict a quadrant for the text. Failure here is fatal to the
    /// request; the engine never substitutes a guessed label.
    async fn predict(&self, text: &str) -> Result<Quadrant>;
}

/// Degenerate classifier that always predicts one quadrant
///
/// Stands in where no trained model is wired up, leaving the corpus
/// evidence to do all the work. Real models live outside this crate
/// behind [`BaseClassifier`].
pub struct FixedPriorClassifier(pub Quadrant);

#[async_trait]
impl BaseClassifier for FixedPriorClassifier {
    async fn predict(&self, _text: &str) -> Result<Quadrant> {
        Ok(self.0)
    }
}

/// The retrieval-augmented scoring engine
pub struct ScoringEngine {
    corpus: Arc<ExampleCorpus>,
    base: Arc<dyn BaseClassifier>,
    reranker: Option<Arc<dyn Reranker>>,
    config: ScoringConfig,
}

impl ScoringEngine {
    /// Create an engine without re-ranking
    pub fn new(
        corpus: Arc<ExampleCorpus>,
        base: Arc<dyn BaseClassifier>,
        config: ScoringConfig,
    ) -> Self {
        Self {
            corpus,
            base,
            reranker: None,
            config,
        }
    }

    /// Attach a pairwise reranker
    pub fn with_reranker(mut self, reranker: Arc<dyn Reranker>) -> Self {
        self.reranker = Some(reranker);
        self
    }

    /// Classify a task text.
    ///
    /// Deterministic for a fixed corpus version and base-classifier
    /// output. Base-classifier failure propagates; every retrieval-side
    /// degradation is absorbed into the lexical path.
    pub async fn classify(&self, task: &str) -> Result<ScoringResult> {
        if task.trim().is_empty() {
            return Err(QuadraError::Validation(
                "Task text cannot be empty".to_string(),
            ));
        }

        let base_prediction = self
            .base
            .predict(task)
            .await
            .map_err(|e| QuadraError::BaseClassifier(e.to_string()))?;

        let (candidates, retrieval_method) =
            self.corpus.retrieve(task, self.config.top_k).await?;

        let floor = match retrieval_method {
            RetrievalMethod::Semantic => self.config.semantic_floor,
            RetrievalMethod::Lexical => self.config.lexical_floor,
        };
        let mut evidence: Vec<Evidence> = candidates
            .into_iter()
            .filter(|item| item.similarity > floor)
            .collect();

        let reranked = self.apply_rerank(task, &mut evidence).await;
        evidence.truncate(self.config.max_evidence);

        let (predicted, confidence) = Self::vote(&self.config, base_prediction, &evidence);
        let max_similarity = evidence
            .iter()
            .map(|item| item.similarity)
            .fold(0.0f32, f32::max);
        let (confidence_bucket, needs_review) = Self::bucket(&self.config, &evidence, max_similarity);

        let decision_shift = if predicted != base_prediction {
            DecisionShift::Changed
        } else if !evidence.is_empty() && max_similarity > self.config.confirmation_floor {
            DecisionShift::Confirmed
        } else {
            DecisionShift::Kept
        };

        debug!(
            "Classified as {} (base {}, confidence {:.3}, {} evidence via {:?}, shift {:?})",
            predicted,
            base_prediction,
            confidence,
            evidence.len(),
            retrieval_method,
            decision_shift
        );

        Ok(ScoringResult {
            predicted,
            confidence,
            confidence_bucket,
            needs_review,
            base_prediction,
            evidence,
            decision_shift,
            retrieval_method,
            reranked,
        })
    }

    /// Blend pairwise rerank scores into the evidence similarities and
    /// re-sort. Returns whether re-ranking was actually applied; failure
    /// on any pair leaves the original ordering untouched.
    async fn apply_rerank(&self, task: &str, evidence: &mut Vec<Evidence>) -> bool {
        let Some(reranker) = self.reranker.as_ref() else {
            return false;
        };
        if evidence.is_empty() {
            return false;
        }

        let mut blended = Vec::with_capacity(evidence.len());
        for item in evidence.iter() {
            match reranker.score(task, &item.example.text).await {
                Ok(raw) => {
                    let normalized = rerank::normalize_score(raw);
                    blended.push(
                        self.config.rerank_similarity_weight * item.similarity
                            + self.config.rerank_score_weight * normalized,
                    );
                }
                Err(e) => {
                    warn!("Reranker failed, keeping retrieval ordering: {}", e);
                    return false;
                }
            }
        }

        for (item, combined) in evidence.iter_mut().zip(blended) {
            item.similarity = combined;
        }
        evidence.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        true
    }

    /// Weighted vote across the four quadrants. The base prediction casts
    /// a fixed weight of 1.0; each evidence item adds its similarity times
    /// `evidence_weight` to its own label. Scores are normalized by the
    /// total weight; ties break toward the lowest-numbered quadrant.
    fn vote(
        config: &ScoringConfig,
        base_prediction: Quadrant,
        evidence: &[Evidence],
    ) -> (Quadrant, f32) {
        let mut scores = [0.0f32; 4];
        scores[base_prediction.index()] += 1.0;
        let mut weight_sum = 1.0f32;

        for item in evidence {
            let weight = item.similarity * config.evidence_weight;
            scores[item.example.label.index()] += weight;
            weight_sum += weight;
        }

        let mut best = Quadrant::DoNow;
        let mut best_score = scores[best.index()] / weight_sum;
        for quadrant in Quadrant::ALL.into_iter().skip(1) {
            let normalized = scores[quadrant.index()] / weight_sum;
            if normalized > best_score {
                best = quadrant;
                best_score = normalized;
            }
        }

        (best, best_score)
    }

    /// Bucket the strongest evidence similarity into a coarse signal.
    /// No evidence at all, or weak evidence, flags the result for review.
    fn bucket(
        config: &ScoringConfig,
        evidence: &[Evidence],
        max_similarity: f32,
    ) -> (ConfidenceBucket, bool) {
        if evidence.is_empty() {
            (ConfidenceBucket::None, true)
        } else if max_similarity < config.low_confidence_ceiling {
            (ConfidenceBucket::Low, true)
        } else if max_similarity < config.medium_confidence_ceiling {
            (ConfidenceBucket::Medium, false)
        } else {
            (ConfidenceBucket::High, false)
        }
    }
}
