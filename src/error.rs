//! Error types for the Quadra classification core
//!
//! This module provides comprehensive error handling using thiserror for
//! structured error definitions and anyhow for error propagation.
//! Recoverable fast-path failures live in [`crate::router::FastPathError`]
//! and are consumed inside the router; everything here is caller-visible.

use thiserror::Error;

/// Main error type for Quadra operations
#[derive(Error, Debug)]
pub enum QuadraError {
    /// Append rejected because an example with the same text already exists
    #[error("Duplicate example: {0}")]
    DuplicateExample(String),

    /// The base classifier failed; fatal to the current request
    #[error("Base classifier failure: {0}")]
    BaseClassifier(String),

    /// Embedding generation failed
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Semantic retrieval capability is absent or degraded
    #[error("Retrieval unavailable: {0}")]
    RetrievalUnavailable(String),

    /// Invalid input or configuration value
    #[error("Validation error: {0}")]
    Validation(String),

    /// Router lifecycle violation (e.g. routing before `start()`)
    #[error("Router not ready: {0}")]
    RouterNotReady(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP request error outside the routed fast path
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

/// Result type alias for Quadra operations
pub type Result<T> = std::result::Result<T, QuadraError>;

/// Convert anyhow::Error to QuadraError
impl From<anyhow::Error> for QuadraError {
    fn from(err: anyhow::Error) -> Self {
        QuadraError::Other(err.to_string())
    }
}
