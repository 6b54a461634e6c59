//! Unsupervised anomaly scoring
//!
//! Scores each entity's feature row with a persisted isolation
//! forest and normalizes the batch into [0, 1].

mod forest;
mod store;

pub use forest::{ForestConfig, IsolationForest, DEFAULT_NUM_TREES, DEFAULT_SAMPLE_SIZE};
pub use store::ModelStore;

use crate::features::FeatureTable;
use crate::models::AnomalyScore;

/// Guard against division by zero when every raw score is equal
const DEGENERATE_RANGE: f64 = 1e-12;

/// Score every entity in the feature table, sorted descending by
/// normalized score with a stable entity-key tie-break.
///
/// An empty table yields an empty result; so does a cold start with
/// nothing to train on.
pub async fn score_entities(store: &ModelStore, features: &FeatureTable) -> Vec<AnomalyScore> {
    if features.is_empty() {
        return Vec::new();
    }

    let (keys, rows) = features.matrix();
    let forest = match store.load_or_train(&rows).await {
        Some(forest) => forest,
        None => return Vec::new(),
    };

    let raw = forest.score_batch(&rows);
    let normalized = normalize_batch(&raw);

    let mut scores: Vec<AnomalyScore> = keys
        .into_iter()
        .zip(normalized)
        .map(|(entity, score)| AnomalyScore { entity, score })
        .collect();

    scores.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.entity.cmp(&b.entity))
    });
    scores
}

/// Min-max normalize into [0, 1]; an all-equal batch maps to all 0.0
fn normalize_batch(raw: &[f64]) -> Vec<f64> {
    if raw.is_empty() {
        return Vec::new();
    }
    let min = raw.iter().cloned().fold(f64::MAX, f64::min);
    let max = raw.iter().cloned().fold(f64::MIN, f64::max);
    let range = max - min;
    if range < DEGENERATE_RANGE {
        return vec![0.0; raw.len()];
    }
    raw.iter().map(|r| (r - min) / range).collect()
}
