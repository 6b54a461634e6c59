//! Root-cause correlation
//!
//! Evaluates a fixed, ordered set of independent diagnostic rules
//! against each scored entity. Rules are plain (predicate, reason,
//! action) tuples walked in a loop, so coverage is testable per rule
//! and new rules slot in without touching control flow.

use crate::features::FeatureTable;
use crate::models::{
    ActionKind, AnomalyRecord, AnomalyScore, EntityKey, RootCause, SuggestedAction,
};
use serde::Deserialize;

/// Thresholds consumed by the diagnostic rules
#[derive(Debug, Clone, Deserialize)]
pub struct RcaThresholds {
    /// Mean CPU-throttle ratio above which throttling is significant
    pub throttle_mean: f64,
    /// Mean CPU usage above which the workload counts as loaded
    pub cpu_mean: f64,
    /// Latency SLO target in milliseconds (p95)
    pub slo_p95_target_ms: f64,
}

impl Default for RcaThresholds {
    fn default() -> Self {
        Self {
            throttle_mean: 0.05,
            cpu_mean: 0.1,
            slo_p95_target_ms: 300.0,
        }
    }
}

/// Named feature access for one entity's row
struct RowView<'a> {
    features: &'a FeatureTable,
    entity: &'a EntityKey,
}

impl RowView<'_> {
    fn get(&self, column: &str) -> f64 {
        self.features.value(self.entity, column)
    }
}

struct Rule {
    reason: &'static str,
    action: ActionKind,
    rationale: &'static str,
    predicate: fn(&RowView<'_>, &RcaThresholds) -> bool,
}

fn crashloop(row: &RowView<'_>, _t: &RcaThresholds) -> bool {
    row.get("restarts_max") >= 1.0
}

fn throttled_under_load(row: &RowView<'_>, t: &RcaThresholds) -> bool {
    row.get("thr_mean") > t.throttle_mean && row.get("cpu_mean") > t.cpu_mean
}

fn memory_leak(row: &RowView<'_>, _t: &RcaThresholds) -> bool {
    row.get("mem_slope") > 0.0 && row.get("mem_p95") > 0.0
}

fn slo_drift(row: &RowView<'_>, t: &RcaThresholds) -> bool {
    // Latency features are in seconds, the SLO target in milliseconds
    row.get("lat_p95") * 1000.0 > t.slo_p95_target_ms
}

/// The ordered rule set. Rules are independent; several may fire for
/// one entity.
const RULES: [Rule; 4] = [
    Rule {
        reason: "restarted recently (possible crashloop)",
        action: ActionKind::PodRestart,
        rationale: "crash suspected",
        predicate: crashloop,
    },
    Rule {
        reason: "CPU throttling under load",
        action: ActionKind::ScaleReplicas,
        rationale: "relieve CPU pressure",
        predicate: throttled_under_load,
    },
    Rule {
        reason: "memory increasing over time (possible leak)",
        action: ActionKind::RollingRestart,
        rationale: "reset memory footprint",
        predicate: memory_leak,
    },
    Rule {
        reason: "latency above target (SLO drift)",
        action: ActionKind::ScaleReplicas,
        rationale: "handle load",
        predicate: slo_drift,
    },
];

/// Annotates scored entities with reasons and suggested actions
pub struct RootCauseCorrelator {
    thresholds: RcaThresholds,
}

impl RootCauseCorrelator {
    pub fn new(thresholds: RcaThresholds) -> Self {
        Self { thresholds }
    }

    /// Inner join of scores and features, in descending-score order.
    /// Entities missing from either side are silently dropped.
    pub fn annotate(&self, features: &FeatureTable, scores: &[AnomalyScore]) -> Vec<AnomalyRecord> {
        scores
            .iter()
            .filter(|s| features.row(&s.entity).is_some())
            .map(|s| {
                let rca = self.evaluate(features, &s.entity);
                AnomalyRecord {
                    namespace: s.entity.namespace.clone(),
                    pod: s.entity.pod.clone(),
                    container: s.entity.container.clone(),
                    anomaly_score: s.score,
                    reasons: rca.reasons,
                    suggested_actions: rca.suggested_actions,
                }
            })
            .collect()
    }

    /// Run every rule for one entity; falls back to a generic
    /// annotation so the result is never empty.
    pub fn evaluate(&self, features: &FeatureTable, entity: &EntityKey) -> RootCause {
        let view = RowView { features, entity };
        let mut reasons = Vec::new();
        let mut suggested_actions = Vec::new();

        for rule in RULES.iter() {
            if (rule.predicate)(&view, &self.thresholds) {
                reasons.push(rule.reason.to_string());
                suggested_actions.push(SuggestedAction {
                    action: rule.action,
                    rationale: rule.rationale.to_string(),
                });
            }
        }

        if reasons.is_empty() {
            reasons.push("generic anomaly".to_string());
            suggested_actions.push(SuggestedAction {
                action: ActionKind::MonitorOnly,
                rationale: "monitor only".to_string(),
            });
        }

        RootCause {
            reasons,
            suggested_actions,
        }
    }
}

impl Default for RootCauseCorrelator {
    fn default() -> Self {
        Self::new(RcaThresholds::default())
    }
}
