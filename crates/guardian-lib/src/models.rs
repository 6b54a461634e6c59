//! Core data models for the workload guardian

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Identifies one workload instance: (namespace, pod, container)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityKey {
    pub namespace: String,
    pub pod: String,
    pub container: String,
}

impl EntityKey {
    pub fn new(namespace: &str, pod: &str, container: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            pod: pod.to_string(),
            container: container.to_string(),
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.namespace, self.pod, self.container)
    }
}

/// One telemetry sample for one workload instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricPoint {
    pub entity: EntityKey,
    /// Unix timestamp in seconds
    pub timestamp: i64,
    pub value: f64,
}

/// Metric points grouped by family name ("cpu", "mem", "throttle",
/// "restarts", "latency"). Any family may be empty or absent.
pub type FamilySeries = BTreeMap<String, Vec<MetricPoint>>;

/// Normalized anomaly score for one entity.
///
/// Scores are batch-relative (min of the batch maps to 0, max to 1)
/// and are not comparable across independent scoring runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyScore {
    pub entity: EntityKey,
    pub score: f64,
}

/// Remediation suggested by a diagnostic rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestedAction {
    pub action: ActionKind,
    pub rationale: String,
}

/// Root-cause annotation: reasons plus suggested remediation.
/// Never empty; a generic fallback applies when no rule fires.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RootCause {
    pub reasons: Vec<String>,
    pub suggested_actions: Vec<SuggestedAction>,
}

/// One ranked, explained anomaly as returned to callers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyRecord {
    pub namespace: String,
    pub pod: String,
    pub container: String,
    pub anomaly_score: f64,
    pub reasons: Vec<String>,
    pub suggested_actions: Vec<SuggestedAction>,
}

/// Remediation action kinds.
///
/// `MonitorOnly` is suggestion-only and rejected by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionKind {
    RollingRestart,
    ScaleReplicas,
    PodRestart,
    ContainerRestart,
    MonitorOnly,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ActionKind::RollingRestart => "rolling-restart",
            ActionKind::ScaleReplicas => "scale-replicas",
            ActionKind::PodRestart => "pod-restart",
            ActionKind::ContainerRestart => "container-restart",
            ActionKind::MonitorOnly => "monitor-only",
        };
        f.write_str(s)
    }
}

/// A dispatch request; constructed per call, never persisted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRequest {
    pub kind: ActionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pod: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container: Option<String>,
    #[serde(default)]
    pub dry_run: Option<bool>,
}

/// Result of a dispatch call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub ok: bool,
    pub dry_run: bool,
    pub kind: ActionKind,
    pub message: String,
}

impl ActionOutcome {
    /// Deterministic acknowledgment for a dry-run that performed no
    /// mutating call.
    pub fn would_act(kind: ActionKind, target: &str) -> Self {
        Self {
            ok: true,
            dry_run: true,
            kind,
            message: format!("dry-run: would execute {} against {}", kind, target),
        }
    }

    pub fn executed(kind: ActionKind, target: &str) -> Self {
        Self {
            ok: true,
            dry_run: false,
            kind,
            message: format!("executed {} against {}", kind, target),
        }
    }
}
