//! Core data types for the Quadra classification core
//!
//! This module defines the fundamental data structures used throughout quadra:
//! quadrants, labeled examples, retrieval evidence, scoring results, and the
//! routed outcome returned to callers. These types form the shared vocabulary
//! between the corpus, the scoring engine, and the router.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Eisenhower priority quadrant
///
/// The four combinations of urgency and importance, in fixed order. The
/// numeric discriminants are part of the fast-engine wire contract and
/// must not be reordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quadrant {
    /// Urgent and important
    DoNow = 0,

    /// Urgent but not important
    Schedule = 1,

    /// Important but not urgent
    Delegate = 2,

    /// Neither urgent nor important
    Delete = 3,
}

impl Quadrant {
    /// All quadrants in discriminant order
    pub const ALL: [Quadrant; 4] = [
        Quadrant::DoNow,
        Quadrant::Schedule,
        Quadrant::Delegate,
        Quadrant::Delete,
    ];

    /// Numeric index (0-3), matching the fast-engine wire format
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Recover a quadrant from its numeric index
    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Quadrant::DoNow),
            1 => Some(Quadrant::Schedule),
            2 => Some(Quadrant::Delegate),
            3 => Some(Quadrant::Delete),
            _ => None,
        }
    }

    /// Whether tasks in this quadrant are urgent
    pub fn urgent(&self) -> bool {
        matches!(self, Quadrant::DoNow | Quadrant::Schedule)
    }

    /// Whether tasks in this quadrant are important
    pub fn important(&self) -> bool {
        matches!(self, Quadrant::DoNow | Quadrant::Delegate)
    }

    /// Canonical display name
    pub fn name(&self) -> &'static str {
        match self {
            Quadrant::DoNow => "Do Now",
            Quadrant::Schedule => "Schedule",
            Quadrant::Delegate => "Delegate",
            Quadrant::Delete => "Delete",
        }
    }
}

impl std::fmt::Display for Quadrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Where a corpus example came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Shipped with the crate as seed data
    Default,

    /// Explicitly added by an operator or caller
    User,

    /// Captured from a human correction of a prediction
    Feedback,
}

/// A labeled training example in the corpus
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Example {
    /// Task text, unique within the corpus (case-insensitive)
    pub text: String,

    /// Ground-truth quadrant
    pub label: Quadrant,

    /// Origin of the example
    pub provenance: Provenance,

    /// When the example was added
    pub created_at: DateTime<Utc>,
}

impl Example {
    /// Create an example stamped with the current time
    pub fn new(text: impl Into<String>, label: Quadrant, provenance: Provenance) -> Self {
        Self {
            text: text.into(),
            label,
            provenance,
            created_at: Utc::now(),
        }
    }
}

/// How corpus neighbors were found for a given request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalMethod {
    /// Model-based sentence embeddings
    Semantic,

    /// Hashed character n-gram / word-token embeddings
    Lexical,
}

/// One retrieved corpus neighbor supporting a classification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evidence {
    /// The matched example
    pub example: Example,

    /// Similarity to the query in [0, 1]; after re-ranking this is the
    /// blended score rather than the raw cosine
    pub similarity: f32,
}

/// Coarse confidence signal derived from the strongest evidence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceBucket {
    /// No evidence survived filtering
    None,

    /// Best similarity below the low ceiling
    Low,

    /// Best similarity between the low and medium ceilings
    Medium,

    /// Best similarity at or above the medium ceiling
    High,
}

/// How corpus evidence related to the base classifier's prediction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionShift {
    /// Evidence overturned the base prediction
    Changed,

    /// Evidence strongly agreed with the base prediction
    Confirmed,

    /// Base prediction stood without strong corroboration
    Kept,
}

/// Full output of the retrieval-augmented scoring engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringResult {
    /// Final quadrant after weighted voting
    pub predicted: Quadrant,

    /// Normalized vote share of the winning quadrant (0.0 - 1.0)
    pub confidence: f32,

    /// Coarse confidence signal from the strongest evidence
    pub confidence_bucket: ConfidenceBucket,

    /// Whether a human should double-check this prediction
    pub needs_review: bool,

    /// What the base classifier said before voting
    pub base_prediction: Quadrant,

    /// Retained evidence, strongest first
    pub evidence: Vec<Evidence>,

    /// Relationship between evidence and the base prediction
    pub decision_shift: DecisionShift,

    /// Retrieval method actually used for this request
    pub retrieval_method: RetrievalMethod,

    /// Whether pairwise re-ranking was actually applied
    pub reranked: bool,
}

/// Which inference engine handled a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineKind {
    /// Low-latency engine behind the HTTP fast path
    Fast,

    /// In-process retrieval-augmented scoring engine
    Flexible,
}

impl std::fmt::Display for EngineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineKind::Fast => write!(f, "fast"),
            EngineKind::Flexible => write!(f, "flexible"),
        }
    }
}

/// Caller-requested engine override for a single request
///
/// `Flexible` always wins; `Fast` is honored only when the routing
/// predicate already permits the fast path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnginePreference {
    Fast,
    Flexible,
}

/// How the router dispatched a request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteDecision {
    /// Engine that produced the final answer
    pub engine: EngineKind,

    /// Wall-clock latency of the winning engine call
    pub latency_ms: f64,

    /// True when the fast path was attempted and failed over
    pub fell_back: bool,
}

/// Final classification returned by the router
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutedOutcome {
    /// Unique identifier for this request
    pub request_id: Uuid,

    /// The classified task text
    pub task: String,

    /// Final quadrant
    pub quadrant: Quadrant,

    /// Urgency flag derived from the quadrant
    pub urgent: bool,

    /// Importance flag derived from the quadrant
    pub important: bool,

    /// Confidence if the winning engine reported one
    pub confidence: Option<f32>,

    /// Full scoring detail; `None` when the fast path answered
    pub scoring: Option<ScoringResult>,

    /// Dispatch record
    pub decision: RouteDecision,

    /// When the outcome was produced
    pub timestamp: DateTime<Utc>,

    /// Always true: the answer came from the dual-engine system
    pub hybrid: bool,
}

/// Result of recording a human correction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum CorrectionOutcome {
    /// The prediction was already correct; nothing stored
    Unchanged,

    /// A feedback example was appended to the corpus
    Recorded {
        /// Corpus version after the append
        version: u64,
    },
}
