//! Remediation action dispatch
//!
//! The scoring pipeline only produces action descriptors; this module
//! is the front door that validates them, honors dry-run, and routes
//! real mutations to a platform backend. Every backend operation is
//! reversible or idempotent at the platform level (restart, scale,
//! rolling-update annotation).

mod kube;
mod podman;

pub use kube::KubeDispatcher;
pub use podman::PodmanDispatcher;

use crate::models::{ActionKind, ActionOutcome, ActionRequest};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Dispatch failure modes. `InvalidRequest` is a client-input error;
/// `Backend` is a service-side execution failure.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("invalid action request: {0}")]
    InvalidRequest(String),

    #[error("action backend failure: {0}")]
    Backend(#[from] anyhow::Error),
}

/// Trait for remediation backends
#[async_trait]
pub trait ActionDispatcher: Send + Sync {
    /// Execute a validated, non-dry-run action against the platform
    async fn execute(&self, request: &ActionRequest) -> Result<ActionOutcome, DispatchError>;

    /// Dry-run preference applied when the request leaves it unset
    fn dry_run_default(&self) -> bool;
}

/// Check required parameters for the requested kind; returns a short
/// target description used in acknowledgments.
pub fn validate(request: &ActionRequest) -> Result<String, DispatchError> {
    let require = |field: &Option<String>, name: &str| {
        field
            .as_deref()
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .ok_or_else(|| {
                DispatchError::InvalidRequest(format!(
                    "{} requires '{}'",
                    request.kind, name
                ))
            })
    };

    match request.kind {
        ActionKind::RollingRestart => {
            let ns = require(&request.namespace, "namespace")?;
            let deployment = require(&request.deployment, "deployment")?;
            Ok(format!("deployment {}/{}", ns, deployment))
        }
        ActionKind::ScaleReplicas => {
            let ns = require(&request.namespace, "namespace")?;
            let deployment = require(&request.deployment, "deployment")?;
            let replicas = request.replicas.ok_or_else(|| {
                DispatchError::InvalidRequest("scale-replicas requires 'replicas'".to_string())
            })?;
            if replicas < 0 {
                return Err(DispatchError::InvalidRequest(
                    "'replicas' must be non-negative".to_string(),
                ));
            }
            Ok(format!("deployment {}/{} (replicas={})", ns, deployment, replicas))
        }
        ActionKind::PodRestart => {
            let ns = require(&request.namespace, "namespace")?;
            let pod = require(&request.pod, "pod")?;
            Ok(format!("pod {}/{}", ns, pod))
        }
        ActionKind::ContainerRestart => {
            let container = require(&request.container, "container")?;
            Ok(format!("container {}", container))
        }
        ActionKind::MonitorOnly => Err(DispatchError::InvalidRequest(
            "monitor-only is a suggestion, not a dispatchable action".to_string(),
        )),
    }
}

/// Routes validated requests to the Kubernetes or Podman backend
pub struct ActionRouter {
    kubernetes: Arc<dyn ActionDispatcher>,
    podman: Arc<dyn ActionDispatcher>,
}

impl ActionRouter {
    pub fn new(kubernetes: Arc<dyn ActionDispatcher>, podman: Arc<dyn ActionDispatcher>) -> Self {
        Self { kubernetes, podman }
    }

    /// Validate, short-circuit dry-run with a deterministic would-act
    /// acknowledgment (the backend is never invoked), then execute.
    pub async fn dispatch(&self, request: &ActionRequest) -> Result<ActionOutcome, DispatchError> {
        let target = validate(request)?;

        let backend = match request.kind {
            ActionKind::ContainerRestart => &self.podman,
            _ => &self.kubernetes,
        };

        let dry_run = request.dry_run.unwrap_or_else(|| backend.dry_run_default());
        if dry_run {
            info!(kind = %request.kind, target = %target, "Dry-run dispatch, no mutation");
            return Ok(ActionOutcome::would_act(request.kind, &target));
        }

        info!(kind = %request.kind, target = %target, "Dispatching action");
        backend.execute(request).await
    }
}

/// Stand-in for a backend that could not be initialized (for example
/// no Kubernetes credentials). Dry-run still works through the router;
/// real dispatches fail as backend errors.
pub struct UnavailableDispatcher {
    reason: String,
    dry_run_default: bool,
}

impl UnavailableDispatcher {
    pub fn new(reason: impl Into<String>, dry_run_default: bool) -> Self {
        Self {
            reason: reason.into(),
            dry_run_default,
        }
    }
}

#[async_trait]
impl ActionDispatcher for UnavailableDispatcher {
    async fn execute(&self, request: &ActionRequest) -> Result<ActionOutcome, DispatchError> {
        Err(DispatchError::Backend(anyhow::anyhow!(
            "backend unavailable for {}: {}",
            request.kind,
            self.reason
        )))
    }

    fn dry_run_default(&self) -> bool {
        self.dry_run_default
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Records whether the mutating path was ever reached
    struct RecordingDispatcher {
        executions: AtomicUsize,
        dry_run_default: bool,
    }

    impl RecordingDispatcher {
        fn new(dry_run_default: bool) -> Arc<Self> {
            Arc::new(Self {
                executions: AtomicUsize::new(0),
                dry_run_default,
            })
        }
    }

    #[async_trait]
    impl ActionDispatcher for RecordingDispatcher {
        async fn execute(&self, request: &ActionRequest) -> Result<ActionOutcome, DispatchError> {
            self.executions.fetch_add(1, Ordering::SeqCst);
            Ok(ActionOutcome::executed(request.kind, "recorded"))
        }

        fn dry_run_default(&self) -> bool {
            self.dry_run_default
        }
    }

    fn request(kind: ActionKind) -> ActionRequest {
        ActionRequest {
            kind,
            namespace: Some("prod".to_string()),
            deployment: Some("svc-a".to_string()),
            pod: Some("svc-a-123".to_string()),
            replicas: Some(3),
            container: Some("app".to_string()),
            dry_run: None,
        }
    }

    #[test]
    fn test_validate_missing_parameters() {
        for kind in [
            ActionKind::RollingRestart,
            ActionKind::ScaleReplicas,
            ActionKind::PodRestart,
            ActionKind::ContainerRestart,
        ] {
            let empty = ActionRequest {
                kind,
                namespace: None,
                deployment: None,
                pod: None,
                replicas: None,
                container: None,
                dry_run: None,
            };
            let err = validate(&empty).unwrap_err();
            assert!(matches!(err, DispatchError::InvalidRequest(_)), "{}", kind);
        }
    }

    #[test]
    fn test_validate_complete_requests() {
        for kind in [
            ActionKind::RollingRestart,
            ActionKind::ScaleReplicas,
            ActionKind::PodRestart,
            ActionKind::ContainerRestart,
        ] {
            assert!(validate(&request(kind)).is_ok(), "{}", kind);
        }
    }

    #[test]
    fn test_monitor_only_not_dispatchable() {
        let err = validate(&request(ActionKind::MonitorOnly)).unwrap_err();
        assert!(matches!(err, DispatchError::InvalidRequest(_)));
    }

    #[test]
    fn test_negative_replicas_rejected() {
        let mut req = request(ActionKind::ScaleReplicas);
        req.replicas = Some(-1);
        assert!(matches!(
            validate(&req),
            Err(DispatchError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_dry_run_never_invokes_backend() {
        let kubernetes = RecordingDispatcher::new(false);
        let podman = RecordingDispatcher::new(false);
        let router = ActionRouter::new(kubernetes.clone(), podman.clone());

        for kind in [
            ActionKind::RollingRestart,
            ActionKind::ScaleReplicas,
            ActionKind::PodRestart,
            ActionKind::ContainerRestart,
        ] {
            let mut req = request(kind);
            req.dry_run = Some(true);
            let outcome = router.dispatch(&req).await.unwrap();
            assert!(outcome.ok);
            assert!(outcome.dry_run);
            assert!(outcome.message.starts_with("dry-run"));
        }

        assert_eq!(kubernetes.executions.load(Ordering::SeqCst), 0);
        assert_eq!(podman.executions.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_backend_dry_run_default_applies() {
        let kubernetes = RecordingDispatcher::new(true);
        let podman = RecordingDispatcher::new(true);
        let router = ActionRouter::new(kubernetes.clone(), podman);

        // Request leaves dry_run unset; backend default is dry-run
        let outcome = router.dispatch(&request(ActionKind::PodRestart)).await.unwrap();
        assert!(outcome.dry_run);
        assert_eq!(kubernetes.executions.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_routing_by_kind() {
        let kubernetes = RecordingDispatcher::new(false);
        let podman = RecordingDispatcher::new(false);
        let router = ActionRouter::new(kubernetes.clone(), podman.clone());

        router.dispatch(&request(ActionKind::ContainerRestart)).await.unwrap();
        assert_eq!(kubernetes.executions.load(Ordering::SeqCst), 0);
        assert_eq!(podman.executions.load(Ordering::SeqCst), 1);

        router.dispatch(&request(ActionKind::PodRestart)).await.unwrap();
        assert_eq!(kubernetes.executions.load(Ordering::SeqCst), 1);
        assert_eq!(podman.executions.load(Ordering::SeqCst), 1);
    }
}
