//! Engine metrics shared by the router
//!
//! Atomic counters plus bounded latency histories, safe under concurrent
//! routing. Snapshots are assembled point-in-time and never block
//! in-flight requests; the tuning analysis is derived from a snapshot.

use crate::types::EngineKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

/// Latency samples retained per engine
const LATENCY_WINDOW: usize = 512;

/// Fast-path hit rate below this triggers a routing recommendation
const HIT_RATE_TARGET: f64 = 0.7;

/// Mean fast latency above this (ms) triggers a latency recommendation
const FAST_LATENCY_WARN_MS: f64 = 50.0;

/// Mean fast latency below this (ms) counts as actively optimized
const FAST_LATENCY_TARGET_MS: f64 = 10.0;

/// Bounded latency history with exact running totals
///
/// The window drops old samples for inspection purposes, but the mean is
/// computed from monotonic totals so it never drifts as samples age out.
#[derive(Debug, Default)]
struct LatencyTrack {
    samples: Mutex<VecDeque<f64>>,
    total_nanos: AtomicU64,
    count: AtomicU64,
}

impl LatencyTrack {
    fn record(&self, latency_ms: f64) {
        self.total_nanos
            .fetch_add((latency_ms * 1_000_000.0) as u64, Ordering::SeqCst);
        self.count.fetch_add(1, Ordering::SeqCst);

        let mut samples = self.samples.lock().unwrap_or_else(|e| e.into_inner());
        if samples.len() >= LATENCY_WINDOW {
            samples.pop_front();
        }
        samples.push_back(latency_ms);
    }

    fn mean_ms(&self) -> f64 {
        let count = self.count.load(Ordering::SeqCst);
        if count == 0 {
            return 0.0;
        }
        self.total_nanos.load(Ordering::SeqCst) as f64 / 1_000_000.0 / count as f64
    }

    fn recent(&self) -> Vec<f64> {
        let samples = self.samples.lock().unwrap_or_else(|e| e.into_inner());
        samples.iter().copied().collect()
    }
}

/// Shared counters for the dual-engine router
#[derive(Debug, Default)]
pub struct EngineMetrics {
    requests: AtomicU64,
    fast_requests: AtomicU64,
    flexible_requests: AtomicU64,
    errors: AtomicU64,
    fast_available: AtomicBool,
    fast_latency: LatencyTrack,
    flexible_latency: LatencyTrack,
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count an incoming request before dispatch
    pub fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::SeqCst);
    }

    /// Count a successful answer from an engine and record its latency
    pub fn record_engine(&self, engine: EngineKind, latency_ms: f64) {
        match engine {
            EngineKind::Fast => {
                self.fast_requests.fetch_add(1, Ordering::SeqCst);
                self.fast_latency.record(latency_ms);
            }
            EngineKind::Flexible => {
                self.flexible_requests.fetch_add(1, Ordering::SeqCst);
                self.flexible_latency.record(latency_ms);
            }
        }
    }

    /// Count an absorbed fast-path failure
    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::SeqCst);
    }

    /// Record the fast engine's availability as seen by the router
    pub fn set_fast_available(&self, available: bool) {
        self.fast_available.store(available, Ordering::SeqCst);
    }

    /// Whether the fast engine was last seen available
    pub fn fast_available(&self) -> bool {
        self.fast_available.load(Ordering::SeqCst)
    }

    /// Most recent latency samples for one engine, oldest first
    pub fn recent_latencies(&self, engine: EngineKind) -> Vec<f64> {
        match engine {
            EngineKind::Fast => self.fast_latency.recent(),
            EngineKind::Flexible => self.flexible_latency.recent(),
        }
    }

    /// Assemble a point-in-time snapshot. Safe to call concurrently with
    /// in-flight routing; the result is internally consistent enough for
    /// operational dashboards, not a transactional view.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let total_requests = self.requests.load(Ordering::SeqCst);
        let fast_requests = self.fast_requests.load(Ordering::SeqCst);
        let flexible_requests = self.flexible_requests.load(Ordering::SeqCst);

        MetricsSnapshot {
            timestamp: Utc::now(),
            total_requests,
            fast_requests,
            flexible_requests,
            fast_hit_rate: fast_requests as f64 / std::cmp::max(total_requests, 1) as f64,
            errors: self.errors.load(Ordering::SeqCst),
            avg_fast_latency_ms: self.fast_latency.mean_ms(),
            avg_flexible_latency_ms: self.flexible_latency.mean_ms(),
            fast_available: self.fast_available.load(Ordering::SeqCst),
        }
    }
}

/// Point-in-time view of the router's counters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub total_requests: u64,
    pub fast_requests: u64,
    pub flexible_requests: u64,
    /// Share of all requests answered by the fast engine; 0.0 when no
    /// requests have been routed yet
    pub fast_hit_rate: f64,
    pub errors: u64,
    pub avg_fast_latency_ms: f64,
    pub avg_flexible_latency_ms: f64,
    pub fast_available: bool,
}

/// Whether fast-path latency currently meets its target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LatencyOptimization {
    /// Mean fast latency is under the target
    Active,

    /// Mean fast latency has room to improve
    Needed,
}

/// Tuning observations derived from a metrics snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingAnalysis {
    /// Fast-path hit rate as a percentage
    pub fast_routing_percentage: f64,

    /// Latency posture against the fast-path target
    pub latency_optimization: LatencyOptimization,

    /// Human-readable tuning recommendations; empty when routing is healthy
    pub recommendations: Vec<String>,
}

impl RoutingAnalysis {
    /// Derive routing-tuning observations from a snapshot
    pub fn from_snapshot(snapshot: &MetricsSnapshot) -> Self {
        let mut recommendations = Vec::new();

        if snapshot.fast_hit_rate < HIT_RATE_TARGET {
            recommendations.push(
                "Consider optimizing the fast engine or task preprocessing".to_string(),
            );
        }
        if snapshot.avg_fast_latency_ms > FAST_LATENCY_WARN_MS {
            recommendations
                .push("Fast engine showing high latency - check optimizations".to_string());
        }

        let latency_optimization = if snapshot.avg_fast_latency_ms < FAST_LATENCY_TARGET_MS {
            LatencyOptimization::Active
        } else {
            LatencyOptimization::Needed
        };

        Self {
            fast_routing_percentage: snapshot.fast_hit_rate * 100.0,
            latency_optimization,
            recommendations,
        }
    }
}
