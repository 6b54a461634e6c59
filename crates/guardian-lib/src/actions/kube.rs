//! Kubernetes remediation backend
//!
//! Implements the mutating operations behind rolling-restart,
//! scale-replicas, and pod-restart. All three are standard, reversible
//! platform operations: an annotation patch that triggers a rolling
//! update, a scale patch, and a pod delete that the controller
//! replaces.

use super::{ActionDispatcher, DispatchError};
use crate::models::{ActionKind, ActionOutcome, ActionRequest};
use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, DeleteParams, Patch, PatchParams};
use kube::Client;
use serde_json::json;

/// Annotation stamped on a Deployment template to trigger a rollout
const RESTART_ANNOTATION: &str = "guardian.io/restarted-at";

/// Dispatcher backed by the Kubernetes API server
pub struct KubeDispatcher {
    client: Client,
    dry_run_default: bool,
}

impl KubeDispatcher {
    /// Connect using in-cluster config when available, falling back
    /// to the local kubeconfig.
    pub async fn new(dry_run_default: bool) -> anyhow::Result<Self> {
        let client = Client::try_default()
            .await
            .context("Failed to build Kubernetes client")?;
        Ok(Self {
            client,
            dry_run_default,
        })
    }

    fn required<'a>(
        field: &'a Option<String>,
        name: &str,
    ) -> Result<&'a str, DispatchError> {
        field
            .as_deref()
            .ok_or_else(|| DispatchError::InvalidRequest(format!("missing '{}'", name)))
    }

    async fn rolling_restart(&self, namespace: &str, deployment: &str) -> Result<(), DispatchError> {
        let api: Api<Deployment> = Api::namespaced(self.client.clone(), namespace);
        let patch = json!({
            "spec": {
                "template": {
                    "metadata": {
                        "annotations": {
                            RESTART_ANNOTATION: Utc::now().to_rfc3339()
                        }
                    }
                }
            }
        });
        api.patch(deployment, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .context("Deployment restart patch failed")?;
        Ok(())
    }

    async fn scale(&self, namespace: &str, deployment: &str, replicas: i32) -> Result<(), DispatchError> {
        let api: Api<Deployment> = Api::namespaced(self.client.clone(), namespace);
        let patch = json!({ "spec": { "replicas": replicas } });
        api.patch_scale(deployment, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .context("Deployment scale patch failed")?;
        Ok(())
    }

    async fn restart_pod(&self, namespace: &str, pod: &str) -> Result<(), DispatchError> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        api.delete(pod, &DeleteParams::default().grace_period(0))
            .await
            .context("Pod delete failed")?;
        Ok(())
    }
}

#[async_trait]
impl ActionDispatcher for KubeDispatcher {
    async fn execute(&self, request: &ActionRequest) -> Result<ActionOutcome, DispatchError> {
        match request.kind {
            ActionKind::RollingRestart => {
                let ns = Self::required(&request.namespace, "namespace")?;
                let deployment = Self::required(&request.deployment, "deployment")?;
                self.rolling_restart(ns, deployment).await?;
                Ok(ActionOutcome::executed(
                    request.kind,
                    &format!("deployment {}/{}", ns, deployment),
                ))
            }
            ActionKind::ScaleReplicas => {
                let ns = Self::required(&request.namespace, "namespace")?;
                let deployment = Self::required(&request.deployment, "deployment")?;
                let replicas = request.replicas.ok_or_else(|| {
                    DispatchError::InvalidRequest("missing 'replicas'".to_string())
                })?;
                self.scale(ns, deployment, replicas).await?;
                Ok(ActionOutcome::executed(
                    request.kind,
                    &format!("deployment {}/{} (replicas={})", ns, deployment, replicas),
                ))
            }
            ActionKind::PodRestart => {
                let ns = Self::required(&request.namespace, "namespace")?;
                let pod = Self::required(&request.pod, "pod")?;
                self.restart_pod(ns, pod).await?;
                Ok(ActionOutcome::executed(
                    request.kind,
                    &format!("pod {}/{}", ns, pod),
                ))
            }
            other => Err(DispatchError::InvalidRequest(format!(
                "{} is not a Kubernetes action",
                other
            ))),
        }
    }

    fn dry_run_default(&self) -> bool {
        self.dry_run_default
    }
}
