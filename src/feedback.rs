//! Online correction feedback
//!
//! Thin layer over the corpus: a confirmed prediction is a no-op, a
//! corrected one is appended as a feedback-provenance example. The append
//! bumps the corpus version, so the embedding index is rebuilt lazily on
//! the next retrieval. Retraining the base classifier is out of scope.

use crate::corpus::ExampleCorpus;
use crate::error::Result;
use crate::types::{CorrectionOutcome, Example, Provenance, Quadrant};
use std::sync::Arc;
use tracing::{debug, info};

/// Records user corrections back into the example corpus
pub struct FeedbackRecorder {
    corpus: Arc<ExampleCorpus>,
}

impl FeedbackRecorder {
    pub fn new(corpus: Arc<ExampleCorpus>) -> Self {
        Self { corpus }
    }

    /// Record the outcome of a user reviewing a prediction.
    ///
    /// Returns `Unchanged` when the user agreed with the prediction.
    /// Otherwise appends the task under the corrected label and returns
    /// the new corpus version. Duplicate or empty tasks surface as the
    /// corpus's own append errors.
    pub async fn record_correction(
        &self,
        task: &str,
        predicted: Quadrant,
        correct: Quadrant,
    ) -> Result<CorrectionOutcome> {
        if predicted == correct {
            debug!("Prediction for task confirmed as {}, nothing to record", correct);
            return Ok(CorrectionOutcome::Unchanged);
        }

        let version = self
            .corpus
            .append(Example::new(task, correct, Provenance::Feedback))
            .await?;

        info!(
            "Recorded correction {} -> {} (corpus version {})",
            predicted, correct, version
        );
        Ok(CorrectionOutcome::Recorded { version })
    }
}
