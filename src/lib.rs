//! Quadra - Retrieval-Augmented Eisenhower Quadrant Classifier
//!
//! A dual-engine text classifier that sorts short task descriptions into
//! the four Eisenhower quadrants (do-now, schedule, delegate, delete):
//! - Latency-aware routing between a fast external engine and a flexible
//!   in-process scoring path, with health probing and automatic fallback
//! - Retrieval-augmented scoring: a base classifier vote blended with
//!   similarity-weighted corpus evidence, optional re-ranking, and
//!   confidence bucketing
//! - A versioned, append-only example corpus seeded with bilingual
//!   defaults and grown online through user corrections
//!
//! # Architecture
//!
//! The system is organized into several layers:
//! - **Types**: Core data structures (Quadrant, Example, ScoringResult)
//! - **Corpus**: Versioned example store with a lazily rebuilt embedding index
//! - **Engine**: Retrieval-augmented scoring over the corpus
//! - **Router**: Fast/flexible dispatch, engine lifecycle, metrics
//!
//! # Example
//!
//! ```ignore
//! use quadra::{
//!     EngineMetrics, EngineRouter, ExampleCorpus, FixedPriorClassifier, QuadraConfig,
//!     Quadrant, ScoringEngine,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> quadra::Result<()> {
//!     let config = QuadraConfig::load(None)?;
//!
//!     let corpus = Arc::new(ExampleCorpus::new(&config.embedding));
//!     corpus.seed_defaults().await?;
//!
//!     let engine = Arc::new(ScoringEngine::new(
//!         Arc::clone(&corpus),
//!         Arc::new(FixedPriorClassifier(Quadrant::Schedule)),
//!         config.scoring.clone(),
//!     ));
//!
//!     let router = EngineRouter::with_http_engine(
//!         config.router.clone(),
//!         engine,
//!         Arc::new(EngineMetrics::new()),
//!     );
//!     router.start().await?;
//!
//!     let outcome = router.route("fix the build before the release", None).await?;
//!     println!("{} via {}", outcome.quadrant, outcome.decision.engine);
//!
//!     router.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod corpus;
pub mod embeddings;
pub mod engine;
pub mod error;
pub mod feedback;
pub mod router;
pub mod types;

// Re-export commonly used types
pub use config::{EmbeddingConfig, LaunchConfig, QuadraConfig, RouterConfig, ScoringConfig};
pub use corpus::ExampleCorpus;
pub use embeddings::{cosine_similarity, EmbeddingProvider, LexicalEmbedder};
#[cfg(feature = "local-embeddings")]
pub use embeddings::FastembedProvider;
pub use engine::{BaseClassifier, FixedPriorClassifier, Reranker, ScoringEngine};
pub use error::{QuadraError, Result};
pub use feedback::FeedbackRecorder;
pub use router::{
    EngineHealth, EngineMetrics, EngineRouter, FastEngineClient, FastInference, FastPathError,
    HttpFastEngine, LatencyOptimization, MetricsSnapshot, RouterState, RoutingAnalysis,
};
pub use types::{
    ConfidenceBucket, CorrectionOutcome, DecisionShift, EngineKind, EnginePreference, Evidence,
    Example, Provenance, Quadrant, RetrievalMethod, RouteDecision, RoutedOutcome, ScoringResult,
};

use tracing_subscriber::EnvFilter;

/// Initialize tracing for binaries and examples embedding this crate.
///
/// Honors `RUST_LOG` when set, defaulting to `quadra=info`. Safe to call
/// more than once; later calls return an error instead of panicking.
pub fn init_tracing() -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("quadra=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| QuadraError::Other(format!("Failed to initialize tracing: {}", e)))
}
