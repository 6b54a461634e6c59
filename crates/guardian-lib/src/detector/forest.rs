//! Isolation forest outlier detector
//!
//! Unsupervised ensemble detector: each tree isolates rows through
//! random axis-aligned splits, and rows with short average path
//! lengths score as more anomalous. Training is seeded for
//! reproducibility and the fitted forest serializes with serde so it
//! can be persisted between scoring runs.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Default number of trees in the ensemble
pub const DEFAULT_NUM_TREES: usize = 200;

/// Default per-tree subsample ceiling
pub const DEFAULT_SAMPLE_SIZE: usize = 256;

/// Detector training configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestConfig {
    pub num_trees: usize,
    pub sample_size: usize,
    /// Expected proportion of outliers in the training batch
    pub contamination: f64,
    /// Random seed for reproducible training
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            num_trees: DEFAULT_NUM_TREES,
            sample_size: DEFAULT_SAMPLE_SIZE,
            contamination: 0.07,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum Node {
    Leaf {
        size: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

/// A fitted isolation forest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsolationForest {
    trees: Vec<Node>,
    /// Subsample size the trees were grown on, used to normalize paths
    subsample: usize,
    /// Score at the contamination quantile of the training batch
    pub threshold: f64,
    pub config: ForestConfig,
}

impl IsolationForest {
    /// Fit a forest on the given rows. Returns `None` for an empty
    /// batch; absence of data is not a fault.
    pub fn fit(rows: &[Vec<f64>], config: ForestConfig) -> Option<Self> {
        if rows.is_empty() {
            return None;
        }
        let subsample = config.sample_size.min(rows.len());
        let max_depth = (subsample as f64).log2().ceil().max(1.0) as usize;
        let mut rng = StdRng::seed_from_u64(config.seed);

        let trees: Vec<Node> = (0..config.num_trees)
            .map(|_| {
                let sample = sample_indices(rows.len(), subsample, &mut rng);
                build_tree(rows, &sample, 0, max_depth, &mut rng)
            })
            .collect();

        let mut forest = Self {
            trees,
            subsample,
            threshold: 0.0,
            config,
        };

        // Score threshold at the contamination quantile of training scores
        let mut train_scores: Vec<f64> = rows.iter().map(|r| forest.score(r)).collect();
        train_scores.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let rank = ((1.0 - forest.config.contamination) * (train_scores.len() - 1) as f64)
            .round() as usize;
        forest.threshold = train_scores[rank.min(train_scores.len() - 1)];

        Some(forest)
    }

    /// Anomaly score for one row; higher = more anomalous, in (0, 1)
    pub fn score(&self, row: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        let total: f64 = self.trees.iter().map(|t| path_length(t, row, 0)).sum();
        let avg_path = total / self.trees.len() as f64;
        let c = average_path_length(self.subsample);
        if c <= 0.0 {
            return 0.0;
        }
        2f64.powf(-avg_path / c)
    }

    /// Score every row in the batch, preserving input order
    pub fn score_batch(&self, rows: &[Vec<f64>]) -> Vec<f64> {
        rows.iter().map(|r| self.score(r)).collect()
    }
}

/// Sample `k` distinct row indices via partial Fisher-Yates
fn sample_indices(n: usize, k: usize, rng: &mut StdRng) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..n).collect();
    for i in 0..k.min(n) {
        let j = rng.gen_range(i..n);
        indices.swap(i, j);
    }
    indices.truncate(k);
    indices
}

fn build_tree(
    rows: &[Vec<f64>],
    sample: &[usize],
    depth: usize,
    max_depth: usize,
    rng: &mut StdRng,
) -> Node {
    if sample.len() <= 1 || depth >= max_depth {
        return Node::Leaf { size: sample.len() };
    }

    let n_features = rows[sample[0]].len();

    // Features that still vary within this partition
    let splittable: Vec<usize> = (0..n_features)
        .filter(|&f| {
            let (min, max) = feature_range(rows, sample, f);
            max > min
        })
        .collect();
    if splittable.is_empty() {
        return Node::Leaf { size: sample.len() };
    }

    let feature = splittable[rng.gen_range(0..splittable.len())];
    let (min, max) = feature_range(rows, sample, feature);
    let threshold = rng.gen_range(min..max);

    let (left, right): (Vec<usize>, Vec<usize>) = sample
        .iter()
        .copied()
        .partition(|&i| rows[i][feature] < threshold);

    Node::Split {
        feature,
        threshold,
        left: Box::new(build_tree(rows, &left, depth + 1, max_depth, rng)),
        right: Box::new(build_tree(rows, &right, depth + 1, max_depth, rng)),
    }
}

fn feature_range(rows: &[Vec<f64>], sample: &[usize], feature: usize) -> (f64, f64) {
    let mut min = f64::MAX;
    let mut max = f64::MIN;
    for &i in sample {
        let v = rows[i][feature];
        if v < min {
            min = v;
        }
        if v > max {
            max = v;
        }
    }
    (min, max)
}

fn path_length(node: &Node, row: &[f64], depth: usize) -> f64 {
    match node {
        Node::Leaf { size } => depth as f64 + average_path_length(*size),
        Node::Split {
            feature,
            threshold,
            left,
            right,
        } => {
            if row[*feature] < *threshold {
                path_length(left, row, depth + 1)
            } else {
                path_length(right, row, depth + 1)
            }
        }
    }
}

/// Euler-Mascheroni constant, for the harmonic number approximation
const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Expected path length of an unsuccessful BST search over n items,
/// the standard isolation-forest normalizer
fn average_path_length(n: usize) -> f64 {
    if n < 2 {
        return 0.0;
    }
    let n = n as f64;
    let harmonic = (n - 1.0).ln() + EULER_GAMMA;
    2.0 * harmonic - 2.0 * (n - 1.0) / n
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clustered_rows_with_outlier() -> Vec<Vec<f64>> {
        let mut rows: Vec<Vec<f64>> = (0..20)
            .map(|i| vec![1.0 + (i as f64) * 0.01, 2.0 - (i as f64) * 0.01, 0.5])
            .collect();
        rows.push(vec![50.0, -40.0, 30.0]);
        rows
    }

    #[test]
    fn test_empty_batch_yields_no_model() {
        assert!(IsolationForest::fit(&[], ForestConfig::default()).is_none());
    }

    #[test]
    fn test_outlier_scores_above_cluster() {
        let rows = clustered_rows_with_outlier();
        let forest = IsolationForest::fit(&rows, ForestConfig::default()).unwrap();
        let scores = forest.score_batch(&rows);
        let outlier = scores[rows.len() - 1];
        for (i, s) in scores.iter().enumerate().take(rows.len() - 1) {
            assert!(
                outlier > *s,
                "outlier score {} not above row {} score {}",
                outlier,
                i,
                s
            );
        }
    }

    #[test]
    fn test_seeded_training_is_reproducible() {
        let rows = clustered_rows_with_outlier();
        let a = IsolationForest::fit(&rows, ForestConfig::default()).unwrap();
        let b = IsolationForest::fit(&rows, ForestConfig::default()).unwrap();
        assert_eq!(a.score_batch(&rows), b.score_batch(&rows));
        assert_eq!(a.threshold, b.threshold);
    }

    #[test]
    fn test_scores_bounded() {
        let rows = clustered_rows_with_outlier();
        let forest = IsolationForest::fit(&rows, ForestConfig::default()).unwrap();
        for s in forest.score_batch(&rows) {
            assert!(s > 0.0 && s < 1.0, "score {} out of bounds", s);
        }
    }

    #[test]
    fn test_survives_serde_round_trip() {
        let rows = clustered_rows_with_outlier();
        let forest = IsolationForest::fit(&rows, ForestConfig::default()).unwrap();
        let json = serde_json::to_string(&forest).unwrap();
        let restored: IsolationForest = serde_json::from_str(&json).unwrap();
        assert_eq!(forest.score_batch(&rows), restored.score_batch(&rows));
    }

    #[test]
    fn test_constant_rows_build_leaves() {
        let rows = vec![vec![1.0, 1.0]; 8];
        let forest = IsolationForest::fit(&rows, ForestConfig::default()).unwrap();
        let scores = forest.score_batch(&rows);
        // All rows identical: every score equal
        assert!(scores.windows(2).all(|w| w[0] == w[1]));
    }
}
