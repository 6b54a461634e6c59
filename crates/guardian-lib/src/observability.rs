//! Prometheus metrics for the guardian service
//!
//! Metrics are registered once into the default registry and exposed
//! through a lightweight cloneable handle; the `/metrics` endpoint
//! gathers from the default registry.

use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;

/// Histogram buckets for pipeline stage latencies (seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

static GLOBAL_METRICS: OnceLock<GuardianMetricsInner> = OnceLock::new();

struct GuardianMetricsInner {
    collection_latency_seconds: Histogram,
    scoring_latency_seconds: Histogram,
    telemetry_query_errors: IntCounter,
    entities_scored: IntGauge,
    actions_dispatched: IntCounterVec,
}

impl GuardianMetricsInner {
    fn new() -> Self {
        Self {
            collection_latency_seconds: register_histogram!(
                "guardian_collection_latency_seconds",
                "Time spent querying the telemetry backend",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register collection_latency_seconds"),

            scoring_latency_seconds: register_histogram!(
                "guardian_scoring_latency_seconds",
                "Time spent on feature extraction, scoring and correlation",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register scoring_latency_seconds"),

            telemetry_query_errors: register_int_counter!(
                "guardian_telemetry_query_errors_total",
                "Total telemetry queries that failed and degraded to empty"
            )
            .expect("Failed to register telemetry_query_errors"),

            entities_scored: register_int_gauge!(
                "guardian_entities_scored",
                "Number of entities scored in the most recent batch"
            )
            .expect("Failed to register entities_scored"),

            actions_dispatched: register_int_counter_vec!(
                "guardian_actions_dispatched_total",
                "Total remediation actions dispatched, by kind and mode",
                &["kind", "mode"]
            )
            .expect("Failed to register actions_dispatched"),
        }
    }
}

/// Cloneable handle to the global guardian metrics
#[derive(Clone)]
pub struct GuardianMetrics {
    _private: (),
}

impl Default for GuardianMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl GuardianMetrics {
    /// Create a handle, registering the global metrics on first use
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(GuardianMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &GuardianMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    pub fn observe_collection_latency(&self, duration_secs: f64) {
        self.inner()
            .collection_latency_seconds
            .observe(duration_secs);
    }

    pub fn observe_scoring_latency(&self, duration_secs: f64) {
        self.inner().scoring_latency_seconds.observe(duration_secs);
    }

    pub fn incr_query_errors(&self) {
        self.inner().telemetry_query_errors.inc();
    }

    pub fn set_entities_scored(&self, count: usize) {
        self.inner().entities_scored.set(count as i64);
    }

    pub fn incr_actions_dispatched(&self, kind: &str, dry_run: bool) {
        let mode = if dry_run { "dry-run" } else { "live" };
        self.inner()
            .actions_dispatched
            .with_label_values(&[kind, mode])
            .inc();
    }
}
