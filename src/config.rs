//! Configuration for the Quadra classification core
//!
//! Provides configuration parsing and validation for scoring, routing,
//! and embedding settings. Every knob has a tuned default; a config file
//! and environment overrides are both optional.
//!
//! # Configuration File Format
//!
//! TOML format, loadable via [`QuadraConfig::load`]:
//!
//! ```toml
//! [scoring]
//! top_k = 8
//! max_evidence = 5
//! evidence_weight = 0.6
//!
//! [router]
//! endpoint = "http://127.0.0.1:8080"
//! fast_deadline_ms = 100
//! max_fast_task_chars = 1000
//!
//! [router.launch]
//! command = "./fast-engine"
//! args = ["--port", "8080"]
//!
//! [embedding]
//! model = "all-MiniLM-L6-v2"
//! batch_size = 32
//! ```
//!
//! Environment overrides use the `QUADRA_` prefix with `__` as the
//! nesting separator, e.g. `QUADRA_ROUTER__FAST_DEADLINE_MS=150`.

use crate::error::{QuadraError, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Complete configuration for the classification core
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuadraConfig {
    /// Retrieval-augmented scoring settings
    #[serde(default)]
    pub scoring: ScoringConfig,

    /// Dual-engine router settings
    #[serde(default)]
    pub router: RouterConfig,

    /// Embedding provider settings
    #[serde(default)]
    pub embedding: EmbeddingConfig,
}

impl QuadraConfig {
    /// Load configuration from an optional TOML file plus `QUADRA_`-prefixed
    /// environment variables, then validate the merged result.
    ///
    /// Precedence: environment > file > defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }

        let settings = builder
            .add_source(
                Environment::with_prefix("QUADRA")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: QuadraConfig = settings.try_deserialize()?;
        config.validate()?;

        if let Some(path) = path {
            info!("Loaded configuration from {:?}", path);
        }
        Ok(config)
    }

    /// Validate all sections, rejecting contradictory or out-of-range values
    pub fn validate(&self) -> Result<()> {
        self.scoring.validate()?;
        self.router.validate()?;
        self.embedding.validate()?;
        Ok(())
    }
}

/// Settings for the retrieval-augmented scoring engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Number of nearest neighbors fetched from the corpus
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Maximum evidence items retained after filtering and re-ranking
    #[serde(default = "default_max_evidence")]
    pub max_evidence: usize,

    /// Per-item vote weight multiplier applied to evidence similarity
    #[serde(default = "default_evidence_weight")]
    pub evidence_weight: f32,

    /// Minimum similarity for semantic evidence (strictly greater retained)
    #[serde(default = "default_semantic_floor")]
    pub semantic_floor: f32,

    /// Minimum similarity for lexical evidence (strictly greater retained)
    #[serde(default = "default_lexical_floor")]
    pub lexical_floor: f32,

    /// Blend weight of the original similarity when re-ranking
    #[serde(default = "default_rerank_similarity_weight")]
    pub rerank_similarity_weight: f32,

    /// Blend weight of the normalized reranker score
    #[serde(default = "default_rerank_score_weight")]
    pub rerank_score_weight: f32,

    /// Best-evidence similarity below this is low confidence
    #[serde(default = "default_low_confidence_ceiling")]
    pub low_confidence_ceiling: f32,

    /// Best-evidence similarity below this (and at or above the low
    /// ceiling) is medium confidence
    #[serde(default = "default_medium_confidence_ceiling")]
    pub medium_confidence_ceiling: f32,

    /// Best-evidence similarity must exceed this for a `Confirmed` shift
    #[serde(default = "default_confirmation_floor")]
    pub confirmation_floor: f32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            max_evidence: default_max_evidence(),
            evidence_weight: default_evidence_weight(),
            semantic_floor: default_semantic_floor(),
            lexical_floor: default_lexical_floor(),
            rerank_similarity_weight: default_rerank_similarity_weight(),
            rerank_score_weight: default_rerank_score_weight(),
            low_confidence_ceiling: default_low_confidence_ceiling(),
            medium_confidence_ceiling: default_medium_confidence_ceiling(),
            confirmation_floor: default_confirmation_floor(),
        }
    }
}

impl ScoringConfig {
    /// Validate scoring thresholds and weights
    pub fn validate(&self) -> Result<()> {
        if self.top_k == 0 {
            return Err(QuadraError::Validation("top_k must be at least 1".to_string()));
        }
        if self.max_evidence == 0 {
            return Err(QuadraError::Validation(
                "max_evidence must be at least 1".to_string(),
            ));
        }
        if self.evidence_weight <= 0.0 || self.evidence_weight > 1.0 {
            return Err(QuadraError::Validation(format!(
                "evidence_weight must be in (0, 1], got {}",
                self.evidence_weight
            )));
        }
        for (name, floor) in [
            ("semantic_floor", self.semantic_floor),
            ("lexical_floor", self.lexical_floor),
        ] {
            if !(0.0..1.0).contains(&floor) {
                return Err(QuadraError::Validation(format!(
                    "{} must be in [0, 1), got {}",
                    name, floor
                )));
            }
        }
        if self.lexical_floor > self.semantic_floor {
            return Err(QuadraError::Validation(format!(
                "lexical_floor ({}) must not exceed semantic_floor ({})",
                self.lexical_floor, self.semantic_floor
            )));
        }
        if self.rerank_similarity_weight < 0.0 || self.rerank_score_weight < 0.0 {
            return Err(QuadraError::Validation(
                "rerank weights must be non-negative".to_string(),
            ));
        }
        let weight_sum = self.rerank_similarity_weight + self.rerank_score_weight;
        if (weight_sum - 1.0).abs() > 1e-6 {
            return Err(QuadraError::Validation(format!(
                "rerank weights must sum to 1.0, got {}",
                weight_sum
            )));
        }
        if self.low_confidence_ceiling >= self.medium_confidence_ceiling {
            return Err(QuadraError::Validation(format!(
                "low_confidence_ceiling ({}) must be below medium_confidence_ceiling ({})",
                self.low_confidence_ceiling, self.medium_confidence_ceiling
            )));
        }
        if !(0.0..=1.0).contains(&self.confirmation_floor) {
            return Err(QuadraError::Validation(format!(
                "confirmation_floor must be in [0, 1], got {}",
                self.confirmation_floor
            )));
        }
        Ok(())
    }
}

/// Settings for the dual-engine router
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Base URL of the fast engine's HTTP endpoint
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Hard deadline for a fast-path inference, in milliseconds
    #[serde(default = "default_fast_deadline_ms")]
    pub fast_deadline_ms: u64,

    /// Extra slack on top of the deadline before the router gives up on
    /// a client that ignores its own timeout, in milliseconds
    #[serde(default = "default_fallback_grace_ms")]
    pub fallback_grace_ms: u64,

    /// Timeout for a single health probe, in seconds
    #[serde(default = "default_health_probe_timeout_secs")]
    pub health_probe_timeout_secs: u64,

    /// Interval between health polls after launching the engine, in
    /// milliseconds
    #[serde(default = "default_health_poll_interval_ms")]
    pub health_poll_interval_ms: u64,

    /// Number of health polls before giving up on a launched engine
    #[serde(default = "default_health_poll_attempts")]
    pub health_poll_attempts: u32,

    /// Tasks at or above this many characters never take the fast path
    #[serde(default = "default_max_fast_task_chars")]
    pub max_fast_task_chars: usize,

    /// Optional command for launching the fast engine ourselves
    #[serde(default)]
    pub launch: Option<LaunchConfig>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            fast_deadline_ms: default_fast_deadline_ms(),
            fallback_grace_ms: default_fallback_grace_ms(),
            health_probe_timeout_secs: default_health_probe_timeout_secs(),
            health_poll_interval_ms: default_health_poll_interval_ms(),
            health_poll_attempts: default_health_poll_attempts(),
            max_fast_task_chars: default_max_fast_task_chars(),
            launch: None,
        }
    }
}

impl RouterConfig {
    /// Validate router timing and endpoint settings
    pub fn validate(&self) -> Result<()> {
        if self.endpoint.trim().is_empty() {
            return Err(QuadraError::Validation(
                "router endpoint cannot be empty".to_string(),
            ));
        }
        if self.fast_deadline_ms == 0 {
            return Err(QuadraError::Validation(
                "fast_deadline_ms must be at least 1".to_string(),
            ));
        }
        if self.health_poll_attempts == 0 {
            return Err(QuadraError::Validation(
                "health_poll_attempts must be at least 1".to_string(),
            ));
        }
        if self.max_fast_task_chars == 0 {
            return Err(QuadraError::Validation(
                "max_fast_task_chars must be at least 1".to_string(),
            ));
        }
        if let Some(launch) = &self.launch {
            if launch.command.trim().is_empty() {
                return Err(QuadraError::Validation(
                    "launch command cannot be empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Command line for launching the fast engine as a child process
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaunchConfig {
    /// Executable to spawn
    pub command: String,

    /// Arguments passed to the executable
    #[serde(default)]
    pub args: Vec<String>,

    /// Working directory for the child process
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
}

/// Settings for embedding providers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Semantic embedding model name
    #[serde(default = "default_model")]
    pub model: String,

    /// Directory for downloaded model files
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Texts embedded per batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Show a progress bar while downloading models
    #[serde(default)]
    pub show_download_progress: bool,

    /// Vector size of the hashed lexical fallback
    #[serde(default = "default_lexical_dimensions")]
    pub lexical_dimensions: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            cache_dir: default_cache_dir(),
            batch_size: default_batch_size(),
            show_download_progress: false,
            lexical_dimensions: default_lexical_dimensions(),
        }
    }
}

impl EmbeddingConfig {
    /// Output dimensionality of the configured semantic model
    pub fn dimensions(&self) -> Result<usize> {
        match self.model.as_str() {
            "all-MiniLM-L6-v2" | "all-MiniLM-L12-v2" | "bge-small-en-v1.5" => Ok(384),
            "bge-base-en-v1.5" | "nomic-embed-text-v1" | "nomic-embed-text-v1.5" => Ok(768),
            "bge-large-en-v1.5" => Ok(1024),
            other => Err(QuadraError::Validation(format!(
                "Unsupported embedding model: {}",
                other
            ))),
        }
    }

    /// Validate model name and sizes
    pub fn validate(&self) -> Result<()> {
        self.dimensions()?;
        if self.batch_size == 0 {
            return Err(QuadraError::Validation(
                "batch_size must be at least 1".to_string(),
            ));
        }
        if self.lexical_dimensions == 0 {
            return Err(QuadraError::Validation(
                "lexical_dimensions must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

// Default value helpers

fn default_top_k() -> usize {
    8
}

fn default_max_evidence() -> usize {
    5
}

fn default_evidence_weight() -> f32 {
    0.6
}

fn default_semantic_floor() -> f32 {
    0.3
}

fn default_lexical_floor() -> f32 {
    0.1
}

fn default_rerank_similarity_weight() -> f32 {
    0.7
}

fn default_rerank_score_weight() -> f32 {
    0.3
}

fn default_low_confidence_ceiling() -> f32 {
    0.4
}

fn default_medium_confidence_ceiling() -> f32 {
    0.6
}

fn default_confirmation_floor() -> f32 {
    0.7
}

fn default_endpoint() -> String {
    "http://127.0.0.1:8080".to_string()
}

fn default_fast_deadline_ms() -> u64 {
    100
}

fn default_fallback_grace_ms() -> u64 {
    25
}

fn default_health_probe_timeout_secs() -> u64 {
    2
}

fn default_health_poll_interval_ms() -> u64 {
    1000
}

fn default_health_poll_attempts() -> u32 {
    30
}

fn default_max_fast_task_chars() -> usize {
    1000
}

fn default_model() -> String {
    "all-MiniLM-L6-v2".to_string()
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from(".fastembed_cache")
}

fn default_batch_size() -> usize {
    32
}

fn default_lexical_dimensions() -> usize {
    384
}
