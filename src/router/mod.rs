//! Dual-engine request router
//!
//! Owns the fast engine's lifecycle, the routing predicate, deadline-bounded
//! dispatch with automatic fallback onto the flexible scoring engine, and
//! the shared metrics aggregator.
//!
//! Lifecycle: `Uninitialized -> Starting -> Ready { fast_available } ->
//! ShuttingDown -> Stopped`. Startup probes the fast engine's health
//! endpoint, optionally launches the engine as a child process, and polls
//! until it comes up or attempts are exhausted. Exhaustion is not an
//! error: the router degrades to flexible-only mode.

pub mod client;
pub mod metrics;

pub use client::{EngineHealth, FastEngineClient, FastInference, FastPathError, HttpFastEngine};
pub use metrics::{EngineMetrics, LatencyOptimization, MetricsSnapshot, RoutingAnalysis};

use crate::config::{LaunchConfig, RouterConfig};
use crate::engine::ScoringEngine;
use crate::error::{QuadraError, Result};
use crate::types::{EngineKind, EnginePreference, RouteDecision, RoutedOutcome};
use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::process::{Child, Command};
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};
use uuid::Uuid;

/// Router lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouterState {
    Uninitialized,
    Starting,
    Ready { fast_available: bool },
    ShuttingDown,
    Stopped,
}

/// The dual-engine router
pub struct EngineRouter {
    state: RwLock<RouterState>,
    fast: Arc<dyn FastEngineClient>,
    engine: Arc<ScoringEngine>,
    metrics: Arc<EngineMetrics>,
    config: RouterConfig,
    /// Fast engine process if we launched it ourselves
    child: Mutex<Option<Child>>,
}

impl EngineRouter {
    /// Create a router over an explicit fast-engine client
    pub fn new(
        config: RouterConfig,
        engine: Arc<ScoringEngine>,
        fast: Arc<dyn FastEngineClient>,
        metrics: Arc<EngineMetrics>,
    ) -> Self {
        Self {
            state: RwLock::new(RouterState::Uninitialized),
            fast,
            engine,
            metrics,
            config,
            child: Mutex::new(None),
        }
    }

    /// Create a router with the HTTP client against `config.endpoint`
    pub fn with_http_engine(
        config: RouterConfig,
        engine: Arc<ScoringEngine>,
        metrics: Arc<EngineMetrics>,
    ) -> Self {
        let fast = Arc::new(HttpFastEngine::new(&config));
        Self::new(config, engine, fast, metrics)
    }

    /// Probe (and if configured, launch) the fast engine, then transition
    /// to `Ready`. Runs once; a second call is a lifecycle error. Never
    /// fails because of an unreachable fast engine - that just degrades
    /// to flexible-only mode.
    pub async fn start(&self) -> Result<()> {
        {
            let mut state = self.state.write().await;
            if *state != RouterState::Uninitialized {
                return Err(QuadraError::RouterNotReady(format!(
                    "start() called in {:?} state",
                    *state
                )));
            }
            *state = RouterState::Starting;
        }

        let fast_available = self.probe_or_launch().await;
        self.metrics.set_fast_available(fast_available);

        let mut state = self.state.write().await;
        *state = RouterState::Ready { fast_available };
        info!("Router ready (fast engine available: {})", fast_available);
        Ok(())
    }

    /// Route one classification request.
    ///
    /// Fast-path failures are absorbed by retrying on the flexible path;
    /// only flexible-path errors (base classifier, validation) surface.
    pub async fn route(
        &self,
        task: &str,
        force: Option<EnginePreference>,
    ) -> Result<RoutedOutcome> {
        let fast_available = match *self.state.read().await {
            RouterState::Ready { fast_available } => fast_available,
            state => {
                return Err(QuadraError::RouterNotReady(format!(
                    "route() called in {:?} state",
                    state
                )));
            }
        };

        self.metrics.record_request();

        if self.fast_eligible(task, force, fast_available) {
            let deadline = Duration::from_millis(self.config.fast_deadline_ms);
            let grace = Duration::from_millis(self.config.fallback_grace_ms);
            let started = Instant::now();

            // The outer timeout caps a client that ignores its own deadline
            let attempt =
                tokio::time::timeout(deadline + grace, self.fast.infer(task, deadline)).await;

            match attempt {
                Ok(Ok(inference)) => {
                    let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
                    self.metrics.record_engine(EngineKind::Fast, latency_ms);
                    return Ok(Self::fast_outcome(task, inference, latency_ms));
                }
                Ok(Err(error)) => {
                    self.metrics.record_error();
                    warn!("Fast path failed, falling back to flexible engine: {}", error);
                }
                Err(_) => {
                    self.metrics.record_error();
                    warn!(
                        "Fast path exceeded its {} ms deadline, falling back to flexible engine",
                        self.config.fast_deadline_ms
                    );
                }
            }

            return self.flexible(task, true).await;
        }

        self.flexible(task, false).await
    }

    /// Current lifecycle state
    pub async fn state(&self) -> RouterState {
        *self.state.read().await
    }

    /// Shared metrics aggregator
    pub fn metrics(&self) -> &EngineMetrics {
        &self.metrics
    }

    /// Point-in-time metrics snapshot
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Routing-tuning analysis over the current snapshot
    pub fn analyze_routing(&self) -> RoutingAnalysis {
        RoutingAnalysis::from_snapshot(&self.metrics.snapshot())
    }

    /// Release the fast engine if owned and stop the router. Idempotent.
    pub async fn shutdown(&self) {
        {
            let mut state = self.state.write().await;
            if *state == RouterState::Stopped {
                return;
            }
            *state = RouterState::ShuttingDown;
        }

        if let Some(mut child) = self.child.lock().await.take() {
            if let Err(e) = child.kill().await {
                warn!("Failed to kill fast engine process: {}", e);
            }
        }
        self.metrics.set_fast_available(false);

        let mut state = self.state.write().await;
        *state = RouterState::Stopped;
        info!("Router stopped");
    }

    /// Fast-path eligibility: engine available, no flexible override, and
    /// short single-field text. A `Fast` preference never widens this.
    fn fast_eligible(
        &self,
        task: &str,
        force: Option<EnginePreference>,
        fast_available: bool,
    ) -> bool {
        fast_available
            && force != Some(EnginePreference::Flexible)
            && task.chars().count() < self.config.max_fast_task_chars
            && !task.contains(['\n', '\t', '\r'])
    }

    async fn probe_or_launch(&self) -> bool {
        if self.fast.health().await == EngineHealth::Ok {
            info!("Fast engine already healthy at {}", self.config.endpoint);
            return true;
        }

        let Some(launch) = self.config.launch.as_ref() else {
            warn!("Fast engine unreachable and no launch command configured; flexible-only mode");
            return false;
        };

        match self.spawn_engine(launch) {
            Ok(child) => {
                *self.child.lock().await = Some(child);
            }
            Err(e) => {
                warn!("Failed to launch fast engine, flexible-only mode: {}", e);
                return false;
            }
        }

        for attempt in 1..=self.config.health_poll_attempts {
            tokio::time::sleep(Duration::from_millis(self.config.health_poll_interval_ms)).await;
            if self.fast.health().await == EngineHealth::Ok {
                info!("Fast engine became healthy after {} poll(s)", attempt);
                return true;
            }
        }

        warn!(
            "Fast engine still unhealthy after {} polls; flexible-only mode",
            self.config.health_poll_attempts
        );
        false
    }

    fn spawn_engine(&self, launch: &LaunchConfig) -> Result<Child> {
        info!("Launching fast engine: {} {:?}", launch.command, launch.args);

        let mut command = Command::new(&launch.command);
        command.args(&launch.args);
        if let Some(dir) = launch.working_dir.as_ref() {
            command.current_dir(dir);
        }
        command
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true);

        Ok(command.spawn()?)
    }

    async fn flexible(&self, task: &str, fell_back: bool) -> Result<RoutedOutcome> {
        let started = Instant::now();
        let scoring = self.engine.classify(task).await?;
        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
        self.metrics.record_engine(EngineKind::Flexible, latency_ms);

        let quadrant = scoring.predicted;
        Ok(RoutedOutcome {
            request_id: Uuid::new_v4(),
            task: task.to_string(),
            quadrant,
            urgent: quadrant.urgent(),
            important: quadrant.important(),
            confidence: Some(scoring.confidence),
            scoring: Some(scoring),
            decision: RouteDecision {
                engine: EngineKind::Flexible,
                latency_ms,
                fell_back,
            },
            timestamp: Utc::now(),
            hybrid: true,
        })
    }

    fn fast_outcome(task: &str, inference: FastInference, latency_ms: f64) -> RoutedOutcome {
        let quadrant = inference.quadrant;
        RoutedOutcome {
            request_id: Uuid::new_v4(),
            task: task.to_string(),
            quadrant,
            urgent: quadrant.urgent(),
            important: quadrant.important(),
            confidence: inference.confidence,
            scoring: None,
            decision: RouteDecision {
                engine: EngineKind::Fast,
                latency_ms,
                fell_back: false,
            },
            timestamp: Utc::now(),
            hybrid: true,
        }
    }
}
