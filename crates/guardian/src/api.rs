//! HTTP API for the guardian service
//!
//! Exposes the anomaly pipeline, action dispatch, health checks and
//! Prometheus metrics.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use guardian_lib::actions::{ActionRouter, DispatchError};
use guardian_lib::health::{ComponentStatus, HealthRegistry};
use guardian_lib::models::{ActionRequest, AnomalyRecord};
use guardian_lib::observability::GuardianMetrics;
use guardian_lib::pipeline::Pipeline;
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Shared application state
pub struct AppState {
    pub pipeline: Pipeline,
    pub actions: ActionRouter,
    pub health_registry: HealthRegistry,
    pub metrics: GuardianMetrics,
    /// Applied when an anomaly query has no explicit limit
    pub default_top_k: usize,
    /// Applied when an anomaly query has no explicit namespace
    pub default_namespace: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AnomalyQuery {
    pub namespace: Option<String>,
    pub top_k: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct AnomaliesResponse {
    pub anomalies: Vec<AnomalyRecord>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

async fn anomalies(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AnomalyQuery>,
) -> impl IntoResponse {
    let namespace = query
        .namespace
        .or_else(|| state.default_namespace.clone());
    let top_k = query.top_k.unwrap_or(state.default_top_k);

    let anomalies = state.pipeline.rank(namespace.as_deref(), top_k).await;
    Json(AnomaliesResponse { anomalies })
}

/// `POST /suggest` is an alias of the anomaly query with defaults
async fn suggest(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AnomalyQuery>,
) -> impl IntoResponse {
    let namespace = query
        .namespace
        .or_else(|| state.default_namespace.clone());
    let anomalies = state
        .pipeline
        .rank(namespace.as_deref(), state.default_top_k)
        .await;
    Json(AnomaliesResponse { anomalies })
}

async fn act(
    State(state): State<Arc<AppState>>,
    Json(body): Json<serde_json::Value>,
) -> impl IntoResponse {
    // Decode by hand so an unknown kind is a 400, not an extractor 422
    let request: ActionRequest = match serde_json::from_value(body) {
        Ok(request) => request,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorBody {
                    error: format!("invalid action request: {}", e),
                }),
            )
                .into_response()
        }
    };

    match state.actions.dispatch(&request).await {
        Ok(outcome) => {
            state
                .metrics
                .incr_actions_dispatched(&outcome.kind.to_string(), outcome.dry_run);
            (StatusCode::OK, Json(outcome)).into_response()
        }
        Err(DispatchError::InvalidRequest(message)) => (
            StatusCode::BAD_REQUEST,
            Json(ErrorBody { error: message }),
        )
            .into_response(),
        Err(DispatchError::Backend(e)) => (
            StatusCode::BAD_GATEWAY,
            Json(ErrorBody {
                error: e.to_string(),
            }),
        )
            .into_response(),
    }
}

/// Health check - 200 if healthy or degraded, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;
    let status_code = match health.status {
        ComponentStatus::Healthy | ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status_code, Json(health))
}

/// Readiness check - 200 if ready, 503 if not
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;
    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            e.to_string().into_bytes(),
        );
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/anomalies", get(anomalies))
        .route("/suggest", post(suggest))
        .route("/act", post(act))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
