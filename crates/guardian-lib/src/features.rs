//! Feature extraction over raw telemetry
//!
//! Aggregates each metric family's time series into one fixed-width
//! feature row per (namespace, pod, container). Families are joined
//! with an outer join over entities; missing data is filled with 0.0
//! so every declared column is present on every row.

use crate::models::{EntityKey, FamilySeries, MetricPoint};
use std::collections::BTreeMap;

/// Statistics computed for every family
const BASE_STATS: &[&str] = &["mean", "std", "p95", "max", "min"];

/// Declares how one metric family contributes feature columns
pub struct FamilySpec {
    pub name: &'static str,
    pub prefix: &'static str,
    pub stats: &'static [&'static str],
    /// Whether a least-squares trend slope is computed for this family
    pub slope: bool,
}

/// The fixed family layout. Drift-sensitive families (cpu, mem) carry
/// a slope column; counters and latency keep a reduced statistic set.
pub const FAMILIES: [FamilySpec; 5] = [
    FamilySpec { name: "cpu", prefix: "cpu_", stats: BASE_STATS, slope: true },
    FamilySpec { name: "mem", prefix: "mem_", stats: BASE_STATS, slope: true },
    FamilySpec { name: "throttle", prefix: "thr_", stats: &["mean", "p95", "max"], slope: false },
    FamilySpec { name: "restarts", prefix: "restarts_", stats: &["mean", "max"], slope: false },
    FamilySpec { name: "latency", prefix: "lat_", stats: &["mean", "p95", "max"], slope: false },
];

/// The declared feature columns, in model input order
pub const FEATURE_COLUMNS: [&str; 20] = [
    "cpu_mean", "cpu_std", "cpu_p95", "cpu_max", "cpu_min", "cpu_slope",
    "mem_mean", "mem_std", "mem_p95", "mem_max", "mem_min", "mem_slope",
    "thr_mean", "thr_p95", "thr_max",
    "restarts_mean", "restarts_max",
    "lat_mean", "lat_p95", "lat_max",
];

/// Index of a named feature column, if declared
pub fn column_index(name: &str) -> Option<usize> {
    FEATURE_COLUMNS.iter().position(|c| *c == name)
}

/// One fixed-width feature row per entity, ordered by entity key.
///
/// Invariant: every row has exactly `FEATURE_COLUMNS.len()` values;
/// entities missing from a source family hold 0.0 in its columns.
#[derive(Debug, Clone, Default)]
pub struct FeatureTable {
    rows: BTreeMap<EntityKey, Vec<f64>>,
}

impl FeatureTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn entities(&self) -> impl Iterator<Item = &EntityKey> {
        self.rows.keys()
    }

    pub fn row(&self, entity: &EntityKey) -> Option<&[f64]> {
        self.rows.get(entity).map(|r| r.as_slice())
    }

    /// Named column lookup; 0.0 for entities not in the table
    pub fn value(&self, entity: &EntityKey, column: &str) -> f64 {
        match (self.rows.get(entity), column_index(column)) {
            (Some(row), Some(idx)) => row[idx],
            _ => 0.0,
        }
    }

    /// Dense matrix in entity-key order, for model fit/score
    pub fn matrix(&self) -> (Vec<EntityKey>, Vec<Vec<f64>>) {
        let keys: Vec<EntityKey> = self.rows.keys().cloned().collect();
        let rows: Vec<Vec<f64>> = self.rows.values().cloned().collect();
        (keys, rows)
    }

    fn row_mut(&mut self, entity: &EntityKey) -> &mut Vec<f64> {
        self.rows
            .entry(entity.clone())
            .or_insert_with(|| vec![0.0; FEATURE_COLUMNS.len()])
    }
}

/// Turns per-family time series into one feature table
pub struct FeatureExtractor;

impl FeatureExtractor {
    pub fn extract(series: &FamilySeries) -> FeatureTable {
        let mut table = FeatureTable::default();

        for family in FAMILIES.iter() {
            let points = match series.get(family.name) {
                Some(points) if !points.is_empty() => points,
                _ => continue,
            };

            for (entity, samples) in group_by_entity(points) {
                let values: Vec<f64> = samples.iter().map(|(_, v)| *v).collect();
                let row = table.row_mut(&entity);
                for stat in family.stats {
                    let value = match *stat {
                        "mean" => mean(&values),
                        "std" => std_dev(&values),
                        "p95" => percentile(&values, 95.0),
                        "max" => values.iter().cloned().fold(f64::MIN, f64::max),
                        "min" => values.iter().cloned().fold(f64::MAX, f64::min),
                        _ => 0.0,
                    };
                    let idx = column_index(&format!("{}{}", family.prefix, stat))
                        .expect("family stat must be a declared column");
                    row[idx] = value;
                }
                if family.slope {
                    let idx = column_index(&format!("{}slope", family.prefix))
                        .expect("slope must be a declared column");
                    row[idx] = trend_slope(&samples);
                }
            }
        }

        table
    }
}

fn group_by_entity(points: &[MetricPoint]) -> BTreeMap<EntityKey, Vec<(i64, f64)>> {
    let mut groups: BTreeMap<EntityKey, Vec<(i64, f64)>> = BTreeMap::new();
    for p in points {
        groups
            .entry(p.entity.clone())
            .or_default()
            .push((p.timestamp, p.value));
    }
    for samples in groups.values_mut() {
        samples.sort_by_key(|(ts, _)| *ts);
    }
    groups
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation; 0.0 below two samples
fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let sum_sq: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    (sum_sq / (values.len() - 1) as f64).sqrt()
}

/// Nearest-rank percentile over an unsorted slice
fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let idx = ((p / 100.0) * (sorted.len() - 1) as f64).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

/// Least-squares slope of value against elapsed seconds.
///
/// Defined as 0.0 below three samples. Timestamps are normalized to
/// the first sample to avoid precision loss on large epochs.
fn trend_slope(samples: &[(i64, f64)]) -> f64 {
    if samples.len() < 3 {
        return 0.0;
    }
    let t0 = samples[0].0 as f64;
    let n = samples.len() as f64;

    let mut sum_x = 0.0;
    let mut sum_y = 0.0;
    let mut sum_xy = 0.0;
    let mut sum_xx = 0.0;
    for (ts, v) in samples {
        let x = *ts as f64 - t0;
        sum_x += x;
        sum_y += v;
        sum_xy += x * v;
        sum_xx += x * x;
    }

    let denominator = n * sum_xx - sum_x * sum_x;
    if denominator.abs() < f64::EPSILON {
        return 0.0;
    }
    (n * sum_xy - sum_x * sum_y) / denominator
}
