//! Fast-engine client
//!
//! HTTP contract against the low-latency inference engine: a `/health`
//! probe and a deadline-bounded `/classify` call. Failures map onto a
//! small recoverable taxonomy that the router absorbs; none of these
//! errors ever reach the caller directly.

use crate::config::RouterConfig;
use crate::types::Quadrant;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Health probe outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineHealth {
    Ok,
    Unavailable,
}

/// Recoverable fast-path failures, surfaced only through metrics and logs
#[derive(Debug, Clone, thiserror::Error)]
pub enum FastPathError {
    /// The engine did not answer within the deadline
    #[error("fast path timed out")]
    Timeout,

    /// Connection or protocol-level failure
    #[error("fast path transport error: {0}")]
    Transport(String),

    /// The engine answered with something we cannot use
    #[error("fast path returned a malformed response: {0}")]
    Malformed(String),
}

/// Successful fast-engine inference
#[derive(Debug, Clone)]
pub struct FastInference {
    /// Predicted quadrant
    pub quadrant: Quadrant,

    /// Engine-reported confidence, if any
    pub confidence: Option<f32>,
}

/// Capability contract for the fast inference engine
#[async_trait]
pub trait FastEngineClient: Send + Sync {
    /// Probe the engine's health endpoint
    async fn health(&self) -> EngineHealth;

    /// Run one inference bounded by `deadline`
    async fn infer(
        &self,
        task: &str,
        deadline: Duration,
    ) -> std::result::Result<FastInference, FastPathError>;
}

#[derive(Serialize)]
struct ClassifyRequest<'a> {
    task: &'a str,
}

#[derive(Deserialize)]
struct ClassifyResponse {
    quadrant: u8,
    #[serde(default)]
    confidence: Option<f32>,
}

/// HTTP implementation against `GET /health` and `POST /classify`
pub struct HttpFastEngine {
    client: reqwest::Client,
    endpoint: String,
    health_timeout: Duration,
}

impl HttpFastEngine {
    /// Create a client against the configured endpoint
    pub fn new(config: &RouterConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            health_timeout: Duration::from_secs(config.health_probe_timeout_secs),
        }
    }

    fn parse_response(body: ClassifyResponse) -> std::result::Result<FastInference, FastPathError> {
        let quadrant = Quadrant::from_index(body.quadrant as usize).ok_or_else(|| {
            FastPathError::Malformed(format!("quadrant index {} out of range", body.quadrant))
        })?;

        Ok(FastInference {
            quadrant,
            confidence: body.confidence,
        })
    }
}

#[async_trait]
impl FastEngineClient for HttpFastEngine {
    async fn health(&self) -> EngineHealth {
        let url = format!("{}/health", self.endpoint);
        match self.client.get(&url).timeout(self.health_timeout).send().await {
            Ok(response) if response.status().is_success() => EngineHealth::Ok,
            Ok(response) => {
                debug!("Fast engine health probe rejected: status {}", response.status());
                EngineHealth::Unavailable
            }
            Err(e) => {
                debug!("Fast engine health probe failed: {}", e);
                EngineHealth::Unavailable
            }
        }
    }

    async fn infer(
        &self,
        task: &str,
        deadline: Duration,
    ) -> std::result::Result<FastInference, FastPathError> {
        let url = format!("{}/classify", self.endpoint);
        let response = self
            .client
            .post(&url)
            .timeout(deadline)
            .json(&ClassifyRequest { task })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FastPathError::Timeout
                } else {
                    FastPathError::Transport(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(FastPathError::Transport(format!(
                "status {}",
                response.status()
            )));
        }

        let body: ClassifyResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                FastPathError::Timeout
            } else {
                FastPathError::Malformed(e.to_string())
            }
        })?;

        Self::parse_response(body)
    }
}
