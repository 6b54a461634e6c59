//! Guardian service - workload anomaly detection and remediation
//!
//! Observes per-workload telemetry, ranks anomalous workloads with an
//! unsupervised detector, explains them through deterministic rules,
//! and dispatches remediation on operator request.

use anyhow::Result;
use guardian_lib::actions::{
    ActionDispatcher, ActionRouter, KubeDispatcher, PodmanDispatcher, UnavailableDispatcher,
};
use guardian_lib::collector::PromCollector;
use guardian_lib::detector::ModelStore;
use guardian_lib::health::{components, HealthRegistry};
use guardian_lib::observability::GuardianMetrics;
use guardian_lib::pipeline::Pipeline;
use guardian_lib::rca::RootCauseCorrelator;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting guardian service");

    let config = config::GuardianConfig::load()?;
    info!(
        prom_url = %config.prom_url,
        demo_mode = config.demo_mode,
        "Guardian configured"
    );

    let health_registry = HealthRegistry::new();
    health_registry.register(components::COLLECTOR).await;
    health_registry.register(components::DETECTOR).await;
    health_registry.register(components::DISPATCHER).await;

    let metrics = GuardianMetrics::new();

    let collector = Arc::new(PromCollector::new(
        config.collector_config(),
        metrics.clone(),
    )?);
    let store = Arc::new(ModelStore::new(
        config.model_path.clone(),
        config.forest_config(),
    ));
    let correlator = RootCauseCorrelator::new(config.rca_thresholds());
    let pipeline = Pipeline::new(
        collector,
        store,
        correlator,
        metrics.clone(),
        config.demo_mode,
    );

    let kubernetes: Arc<dyn ActionDispatcher> = match KubeDispatcher::new(config.k8s_dry_run).await
    {
        Ok(dispatcher) => Arc::new(dispatcher),
        Err(e) => {
            warn!(error = %e, "Kubernetes backend unavailable, dispatch will fail");
            health_registry
                .set_degraded(components::DISPATCHER, "Kubernetes backend unavailable")
                .await;
            Arc::new(UnavailableDispatcher::new(e.to_string(), config.k8s_dry_run))
        }
    };
    let podman: Arc<dyn ActionDispatcher> =
        Arc::new(PodmanDispatcher::new(&config.podman_base_url, config.podman_dry_run)?);
    let actions = ActionRouter::new(kubernetes, podman);

    let state = Arc::new(api::AppState {
        pipeline,
        actions,
        health_registry: health_registry.clone(),
        metrics,
        default_top_k: config.top_k,
        default_namespace: config.namespace_filter().map(str::to_string),
    });

    health_registry.set_ready(true).await;

    let api_handle = tokio::spawn(api::serve(config.api_port, state));

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    api_handle.abort();

    Ok(())
}
