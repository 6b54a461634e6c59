//! The anomaly pipeline: collect, extract, score, correlate
//!
//! One synchronous pass per request; the only suspension points are
//! the telemetry queries and the model load-or-train guard.

use crate::collector::{demo_series, TelemetryCollector};
use crate::detector::{score_entities, ModelStore};
use crate::features::FeatureExtractor;
use crate::models::AnomalyRecord;
use crate::observability::GuardianMetrics;
use crate::rca::RootCauseCorrelator;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Wires the pipeline stages together for the request surface
pub struct Pipeline {
    collector: Arc<dyn TelemetryCollector>,
    store: Arc<ModelStore>,
    correlator: RootCauseCorrelator,
    metrics: GuardianMetrics,
    /// Substitute the synthetic scenario when telemetry is entirely empty
    demo_mode: bool,
}

impl Pipeline {
    pub fn new(
        collector: Arc<dyn TelemetryCollector>,
        store: Arc<ModelStore>,
        correlator: RootCauseCorrelator,
        metrics: GuardianMetrics,
        demo_mode: bool,
    ) -> Self {
        Self {
            collector,
            store,
            correlator,
            metrics,
            demo_mode,
        }
    }

    /// Produce the ranked, explained anomaly list. Absence of data is
    /// never an error: all-empty telemetry yields an empty list.
    pub async fn rank(&self, namespace: Option<&str>, top_k: usize) -> Vec<AnomalyRecord> {
        let started = Instant::now();
        let mut series = self.collector.collect_all(namespace).await;
        self.metrics
            .observe_collection_latency(started.elapsed().as_secs_f64());

        if series.values().all(|points| points.is_empty()) {
            if self.demo_mode {
                info!("Telemetry empty, substituting synthetic demo scenario");
                series = demo_series();
            } else {
                debug!("Telemetry empty, returning no anomalies");
                return Vec::new();
            }
        }

        let scoring_started = Instant::now();
        let features = FeatureExtractor::extract(&series);
        if features.is_empty() {
            return Vec::new();
        }

        let scores = score_entities(&self.store, &features).await;
        let mut records = self.correlator.annotate(&features, &scores);
        records.truncate(top_k);

        self.metrics.set_entities_scored(features.len());
        self.metrics
            .observe_scoring_latency(scoring_started.elapsed().as_secs_f64());
        debug!(
            entities = features.len(),
            returned = records.len(),
            "Pipeline pass complete"
        );
        records
    }
}
