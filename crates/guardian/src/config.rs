//! Service configuration
//!
//! All configuration is environment-sourced (`GUARDIAN_*`) with
//! defaults, loaded once at startup and handed to each component;
//! no component reads ambient process state directly.

use anyhow::Result;
use guardian_lib::collector::CollectorConfig;
use guardian_lib::detector::ForestConfig;
use guardian_lib::rca::RcaThresholds;
use serde::Deserialize;

/// Guardian service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GuardianConfig {
    /// API server port
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Prometheus-compatible telemetry backend
    #[serde(default = "default_prom_url")]
    pub prom_url: String,

    /// Lookback window for range queries, in hours
    #[serde(default = "default_history_hours")]
    pub history_hours: i64,

    /// Range-query sampling step, in seconds
    #[serde(default = "default_step_secs")]
    pub step_secs: u64,

    /// Per-query timeout, in seconds
    #[serde(default = "default_query_timeout_secs")]
    pub query_timeout_secs: u64,

    /// Namespace filter; empty means all namespaces
    #[serde(default)]
    pub namespace: String,

    /// Default result-count limit for anomaly queries
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Persisted detector artifact location
    #[serde(default = "default_model_path")]
    pub model_path: String,

    /// Expected outlier proportion assumed during training
    #[serde(default = "default_contamination")]
    pub contamination: f64,

    /// Random seed for reproducible detector training
    #[serde(default = "default_detector_seed")]
    pub detector_seed: u64,

    /// Latency SLO target (p95, milliseconds)
    #[serde(default = "default_slo_p95_target_ms")]
    pub slo_p95_target_ms: f64,

    /// Mean throttle ratio above which throttling is significant
    #[serde(default = "default_throttle_mean_threshold")]
    pub throttle_mean_threshold: f64,

    /// Mean CPU usage above which the workload counts as loaded
    #[serde(default = "default_cpu_mean_threshold")]
    pub cpu_mean_threshold: f64,

    /// Dry-run default for Kubernetes actions
    #[serde(default = "default_dry_run")]
    pub k8s_dry_run: bool,

    /// Dry-run default for Podman actions
    #[serde(default = "default_dry_run")]
    pub podman_dry_run: bool,

    /// Podman REST service address
    #[serde(default = "default_podman_base_url")]
    pub podman_base_url: String,

    /// Substitute the synthetic scenario when telemetry is empty
    #[serde(default)]
    pub demo_mode: bool,
}

fn default_api_port() -> u16 {
    8080
}

fn default_prom_url() -> String {
    "http://prometheus.monitoring:9090".to_string()
}

fn default_history_hours() -> i64 {
    24
}

fn default_step_secs() -> u64 {
    60
}

fn default_query_timeout_secs() -> u64 {
    10
}

fn default_top_k() -> usize {
    10
}

fn default_model_path() -> String {
    "/tmp/guardian-detector.json".to_string()
}

fn default_contamination() -> f64 {
    0.07
}

fn default_detector_seed() -> u64 {
    42
}

fn default_slo_p95_target_ms() -> f64 {
    300.0
}

fn default_throttle_mean_threshold() -> f64 {
    0.05
}

fn default_cpu_mean_threshold() -> f64 {
    0.1
}

fn default_dry_run() -> bool {
    true
}

fn default_podman_base_url() -> String {
    "http://127.0.0.1:8888".to_string()
}

impl Default for GuardianConfig {
    fn default() -> Self {
        // Serde defaults double as the programmatic defaults
        serde_json::from_str("{}").expect("defaults must deserialize")
    }
}

impl GuardianConfig {
    /// Load configuration from `GUARDIAN_*` environment variables
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("GUARDIAN"))
            .build()?;

        Ok(config.try_deserialize().unwrap_or_default())
    }

    pub fn collector_config(&self) -> CollectorConfig {
        CollectorConfig {
            base_url: self.prom_url.clone(),
            history_hours: self.history_hours,
            step_secs: self.step_secs,
            timeout_secs: self.query_timeout_secs,
        }
    }

    pub fn forest_config(&self) -> ForestConfig {
        ForestConfig {
            contamination: self.contamination,
            seed: self.detector_seed,
            ..ForestConfig::default()
        }
    }

    pub fn rca_thresholds(&self) -> RcaThresholds {
        RcaThresholds {
            throttle_mean: self.throttle_mean_threshold,
            cpu_mean: self.cpu_mean_threshold,
            slo_p95_target_ms: self.slo_p95_target_ms,
        }
    }

    /// Namespace filter as an option; empty string means unfiltered
    pub fn namespace_filter(&self) -> Option<&str> {
        if self.namespace.is_empty() {
            None
        } else {
            Some(&self.namespace)
        }
    }
}
