//! Integration tests for the guardian API endpoints

use async_trait::async_trait;
use axum::{
    body::Body,
    extract::{Query, State},
    http::{Request, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use guardian_lib::actions::{ActionDispatcher, ActionRouter, DispatchError};
use guardian_lib::collector::TelemetryCollector;
use guardian_lib::detector::{ForestConfig, ModelStore};
use guardian_lib::health::{components, ComponentStatus, HealthRegistry};
use guardian_lib::models::{ActionOutcome, ActionRequest, AnomalyRecord, FamilySeries};
use guardian_lib::observability::GuardianMetrics;
use guardian_lib::pipeline::Pipeline;
use guardian_lib::rca::RootCauseCorrelator;
use prometheus::{Encoder, TextEncoder};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

struct AppState {
    pipeline: Pipeline,
    actions: ActionRouter,
    health_registry: HealthRegistry,
    default_top_k: usize,
}

#[derive(Deserialize)]
struct AnomalyQuery {
    namespace: Option<String>,
    top_k: Option<usize>,
}

async fn anomalies(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AnomalyQuery>,
) -> impl IntoResponse {
    let top_k = query.top_k.unwrap_or(state.default_top_k);
    let anomalies: Vec<AnomalyRecord> =
        state.pipeline.rank(query.namespace.as_deref(), top_k).await;
    Json(json!({ "anomalies": anomalies }))
}

async fn act(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let request: ActionRequest = match serde_json::from_value(body) {
        Ok(request) => request,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": format!("invalid action request: {}", e) })),
            )
                .into_response()
        }
    };

    match state.actions.dispatch(&request).await {
        Ok(outcome) => (StatusCode::OK, Json(json!(outcome))).into_response(),
        Err(DispatchError::InvalidRequest(message)) => {
            (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
        }
        Err(DispatchError::Backend(e)) => (
            StatusCode::BAD_GATEWAY,
            Json(json!({ "error": e.to_string() })),
        )
            .into_response(),
    }
}

async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;
    let status_code = match health.status {
        ComponentStatus::Healthy | ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status_code, Json(health))
}

async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;
    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status_code, Json(readiness))
}

async fn metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
}

fn create_test_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/anomalies", get(anomalies))
        .route("/act", post(act))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

struct EmptyCollector;

#[async_trait]
impl TelemetryCollector for EmptyCollector {
    async fn collect_all(&self, _namespace_filter: Option<&str>) -> FamilySeries {
        FamilySeries::new()
    }
}

/// Accepts everything; records nothing. Dry-run short-circuits in the
/// router before this is reached.
struct AcceptingDispatcher;

#[async_trait]
impl ActionDispatcher for AcceptingDispatcher {
    async fn execute(&self, request: &ActionRequest) -> Result<ActionOutcome, DispatchError> {
        Ok(ActionOutcome::executed(request.kind, "test"))
    }

    fn dry_run_default(&self) -> bool {
        true
    }
}

struct FailingDispatcher;

#[async_trait]
impl ActionDispatcher for FailingDispatcher {
    async fn execute(&self, _request: &ActionRequest) -> Result<ActionOutcome, DispatchError> {
        Err(DispatchError::Backend(anyhow::anyhow!("backend down")))
    }

    fn dry_run_default(&self) -> bool {
        false
    }
}

fn setup_app(
    demo_mode: bool,
    dir: &tempfile::TempDir,
    kubernetes: Arc<dyn ActionDispatcher>,
) -> (Router, Arc<AppState>) {
    let store = Arc::new(ModelStore::new(
        dir.path().join("detector.json"),
        ForestConfig::default(),
    ));
    let pipeline = Pipeline::new(
        Arc::new(EmptyCollector),
        store,
        RootCauseCorrelator::default(),
        GuardianMetrics::new(),
        demo_mode,
    );
    let actions = ActionRouter::new(kubernetes, Arc::new(AcceptingDispatcher));
    let health_registry = HealthRegistry::new();

    let state = Arc::new(AppState {
        pipeline,
        actions,
        health_registry,
        default_top_k: 10,
    });
    (create_test_router(state.clone()), state)
}

async fn body_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_anomalies_empty_telemetry_yields_empty_list() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = setup_app(false, &dir, Arc::new(AcceptingDispatcher));

    let response = app
        .oneshot(Request::builder().uri("/anomalies").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["anomalies"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_anomalies_demo_mode_returns_ranked_records() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = setup_app(true, &dir, Arc::new(AcceptingDispatcher));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/anomalies?top_k=3")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let anomalies = body["anomalies"].as_array().unwrap();
    assert_eq!(anomalies.len(), 3);
    let scores: Vec<f64> = anomalies
        .iter()
        .map(|a| a["anomaly_score"].as_f64().unwrap())
        .collect();
    assert!(scores.windows(2).all(|w| w[0] >= w[1]));
    assert!(anomalies
        .iter()
        .all(|a| !a["reasons"].as_array().unwrap().is_empty()));
}

#[tokio::test]
async fn test_act_dry_run_acknowledged() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = setup_app(false, &dir, Arc::new(FailingDispatcher));

    // Backend would fail; dry-run must never reach it
    let request = Request::builder()
        .method("POST")
        .uri("/act")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({
                "kind": "pod-restart",
                "namespace": "prod",
                "pod": "svc-a-123",
                "dry_run": true
            })
            .to_string(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["ok"], true);
    assert_eq!(body["dry_run"], true);
}

#[tokio::test]
async fn test_act_missing_parameters_is_client_error() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = setup_app(false, &dir, Arc::new(AcceptingDispatcher));

    let request = Request::builder()
        .method("POST")
        .uri("/act")
        .header("content-type", "application/json")
        .body(Body::from(json!({ "kind": "scale-replicas" }).to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("namespace"));
}

#[tokio::test]
async fn test_act_unknown_kind_is_client_error() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = setup_app(false, &dir, Arc::new(AcceptingDispatcher));

    let request = Request::builder()
        .method("POST")
        .uri("/act")
        .header("content-type", "application/json")
        .body(Body::from(json!({ "kind": "drain-node" }).to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_act_backend_failure_is_service_error() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = setup_app(false, &dir, Arc::new(FailingDispatcher));

    let request = Request::builder()
        .method("POST")
        .uri("/act")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({
                "kind": "pod-restart",
                "namespace": "prod",
                "pod": "svc-a-123",
                "dry_run": false
            })
            .to_string(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_healthz_reflects_component_status() {
    let dir = tempfile::tempdir().unwrap();
    let (app, state) = setup_app(false, &dir, Arc::new(AcceptingDispatcher));
    state.health_registry.register(components::COLLECTOR).await;

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    state
        .health_registry
        .set_unhealthy(components::COLLECTOR, "backend gone")
        .await;
    let response = app
        .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_readyz_transitions() {
    let dir = tempfile::tempdir().unwrap();
    let (app, state) = setup_app(false, &dir, Arc::new(AcceptingDispatcher));

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/readyz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    state.health_registry.set_ready(true).await;
    let response = app
        .oneshot(Request::builder().uri("/readyz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_metrics_endpoint_exposes_guardian_metrics() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = setup_app(false, &dir, Arc::new(AcceptingDispatcher));
    GuardianMetrics::new().set_entities_scored(4);

    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("guardian_entities_scored"));
}
