//! Prometheus range-query collector
//!
//! Queries the Prometheus HTTP API (`/api/v1/query_range`) for each
//! metric family with a bounded timeout. A failed or malformed query
//! logs a warning and yields an empty family.

use super::TelemetryCollector;
use crate::models::{EntityKey, FamilySeries, MetricPoint};
use crate::observability::GuardianMetrics;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::warn;
use url::Url;

/// The default PromQL range queries, one per metric family
pub fn default_queries() -> Vec<(&'static str, &'static str)> {
    vec![
        (
            "cpu",
            r#"sum by (namespace,pod,container) (rate(container_cpu_usage_seconds_total{container!=""}[5m]))"#,
        ),
        (
            "mem",
            r#"sum by (namespace,pod,container) (container_memory_working_set_bytes{container!=""})"#,
        ),
        (
            "restarts",
            r#"max by (namespace,pod,container) (increase(kube_pod_container_status_restarts_total[30m]))"#,
        ),
        (
            "throttle",
            r#"sum by (namespace,pod,container) (rate(container_cpu_cfs_throttled_seconds_total{container!=""}[5m]))"#,
        ),
        (
            "latency",
            r#"histogram_quantile(0.95, sum by (le,namespace,pod) (rate(http_server_duration_seconds_bucket[5m])))"#,
        ),
    ]
}

/// Collector configuration, passed in by the caller
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    pub base_url: String,
    pub history_hours: i64,
    pub step_secs: u64,
    pub timeout_secs: u64,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            base_url: "http://prometheus.monitoring:9090".to_string(),
            history_hours: 24,
            step_secs: 60,
            timeout_secs: 10,
        }
    }
}

/// Telemetry collector backed by the Prometheus HTTP API
pub struct PromCollector {
    client: reqwest::Client,
    base_url: Url,
    config: CollectorConfig,
    metrics: GuardianMetrics,
}

impl PromCollector {
    pub fn new(config: CollectorConfig, metrics: GuardianMetrics) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;
        let base_url = Url::parse(&config.base_url).context("Invalid Prometheus URL")?;
        Ok(Self {
            client,
            base_url,
            config,
            metrics,
        })
    }

    async fn query_range(&self, query: &str) -> Result<Vec<MetricPoint>> {
        let end = Utc::now().timestamp();
        let start = end - self.config.history_hours * 3600;

        let url = self
            .base_url
            .join("/api/v1/query_range")
            .context("Invalid query path")?;

        let response = self
            .client
            .get(url)
            .query(&[
                ("query", query),
                ("start", &start.to_string()),
                ("end", &end.to_string()),
                ("step", &format!("{}s", self.config.step_secs)),
            ])
            .send()
            .await
            .context("Prometheus request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Prometheus error ({}): {}", status, body);
        }

        let body = response.text().await.context("Failed to read response body")?;
        parse_range_response(&body)
    }
}

#[async_trait]
impl TelemetryCollector for PromCollector {
    async fn collect_all(&self, namespace_filter: Option<&str>) -> FamilySeries {
        let mut series = FamilySeries::new();
        for (family, query) in default_queries() {
            let mut points = match self.query_range(query).await {
                Ok(points) => points,
                Err(e) => {
                    warn!(
                        family,
                        url = %self.base_url,
                        error = %e,
                        "Telemetry query failed, treating family as empty"
                    );
                    self.metrics.incr_query_errors();
                    Vec::new()
                }
            };
            if let Some(ns) = namespace_filter {
                points.retain(|p| p.entity.namespace == ns);
            }
            series.insert(family.to_string(), points);
        }
        series
    }
}

#[derive(Debug, Deserialize)]
struct RangeResponse {
    status: String,
    #[serde(default)]
    data: RangeData,
}

#[derive(Debug, Default, Deserialize)]
struct RangeData {
    #[serde(default)]
    result: Vec<RangeSeries>,
}

#[derive(Debug, Deserialize)]
struct RangeSeries {
    #[serde(default)]
    metric: HashMap<String, String>,
    #[serde(default)]
    values: Vec<(f64, String)>,
}

/// Decode one query_range response body into metric points. Samples
/// whose value does not parse as a float are skipped.
fn parse_range_response(body: &str) -> Result<Vec<MetricPoint>> {
    let response: RangeResponse =
        serde_json::from_str(body).context("Malformed Prometheus response")?;
    if response.status != "success" {
        anyhow::bail!("Prometheus query status: {}", response.status);
    }

    let mut points = Vec::new();
    for series in response.data.result {
        let label = |k: &str| series.metric.get(k).cloned().unwrap_or_default();
        let entity = EntityKey {
            namespace: label("namespace"),
            pod: label("pod"),
            container: label("container"),
        };
        for (ts, value) in &series.values {
            if let Ok(value) = value.parse::<f64>() {
                points.push(MetricPoint {
                    entity: entity.clone(),
                    timestamp: *ts as i64,
                    value,
                });
            }
        }
    }
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_BODY: &str = r#"{
        "status": "success",
        "data": {
            "resultType": "matrix",
            "result": [
                {
                    "metric": {"namespace": "prod", "pod": "svc-a", "container": "app"},
                    "values": [[1700000000, "0.25"], [1700000060, "0.30"], [1700000120, "bogus"]]
                },
                {
                    "metric": {"namespace": "prod", "pod": "svc-b"},
                    "values": [[1700000000, "0.10"]]
                }
            ]
        }
    }"#;

    #[test]
    fn test_parse_range_response() {
        let points = parse_range_response(SAMPLE_BODY).unwrap();
        // The unparsable sample is skipped
        assert_eq!(points.len(), 3);
        assert_eq!(points[0].entity, EntityKey::new("prod", "svc-a", "app"));
        assert_eq!(points[0].timestamp, 1_700_000_000);
        assert!((points[1].value - 0.30).abs() < 1e-9);
        // Missing container label becomes empty, not an error
        assert_eq!(points[2].entity.container, "");
    }

    #[test]
    fn test_parse_error_status() {
        let body = r#"{"status": "error", "data": {"result": []}}"#;
        assert!(parse_range_response(body).is_err());
    }

    #[test]
    fn test_parse_malformed_body() {
        assert!(parse_range_response("not json").is_err());
    }

    #[tokio::test]
    async fn test_unreachable_backend_degrades_to_empty() {
        // Nothing listens on this port; every family must come back empty
        let collector = PromCollector::new(
            CollectorConfig {
                base_url: "http://127.0.0.1:9".to_string(),
                timeout_secs: 1,
                ..CollectorConfig::default()
            },
            GuardianMetrics::new(),
        )
        .unwrap();

        let series = collector.collect_all(None).await;
        assert_eq!(series.len(), default_queries().len());
        assert!(series.values().all(|points| points.is_empty()));
    }
}
