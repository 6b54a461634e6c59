//! Core library for the workload anomaly guardian
//!
//! This crate provides:
//! - Telemetry collection from a Prometheus-compatible backend
//! - Feature extraction over per-workload time series
//! - Unsupervised anomaly scoring with a persisted isolation forest
//! - Rule-based root-cause correlation
//! - Remediation action dispatch (Kubernetes, Podman)
//! - Health checks and Prometheus observability

pub mod actions;
pub mod collector;
pub mod detector;
pub mod features;
pub mod health;
pub mod models;
pub mod observability;
pub mod pipeline;
pub mod rca;

pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::GuardianMetrics;
