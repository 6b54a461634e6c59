//! Telemetry collection from the metrics backend
//!
//! Collectors return per-family time series over a lookback window.
//! Backend failures never propagate: a family that cannot be queried
//! comes back empty, and the pipeline treats absence of data as
//! absence of anomalies.

mod prometheus;
mod synthetic;

pub use prometheus::{default_queries, CollectorConfig, PromCollector};
pub use synthetic::demo_series;

use crate::models::FamilySeries;

pub use async_trait::async_trait;

/// Trait for telemetry source implementations
#[async_trait]
pub trait TelemetryCollector: Send + Sync {
    /// Collect every configured metric family over the lookback
    /// window, optionally restricted to one namespace. Families that
    /// fail to query are returned empty.
    async fn collect_all(&self, namespace_filter: Option<&str>) -> FamilySeries;
}
