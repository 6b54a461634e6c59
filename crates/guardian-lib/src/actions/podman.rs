//! Podman remediation backend
//!
//! Restarts a named container through the libpod REST API. Restart is
//! idempotent at the platform level, so repeated dispatches are safe.

use super::{ActionDispatcher, DispatchError};
use crate::models::{ActionKind, ActionOutcome, ActionRequest};
use anyhow::Context;
use async_trait::async_trait;
use std::time::Duration;
use url::Url;

/// Dispatcher backed by the Podman REST service
pub struct PodmanDispatcher {
    client: reqwest::Client,
    base_url: Url,
    dry_run_default: bool,
}

impl PodmanDispatcher {
    pub fn new(base_url: &str, dry_run_default: bool) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;
        let base_url = Url::parse(base_url).context("Invalid Podman URL")?;
        Ok(Self {
            client,
            base_url,
            dry_run_default,
        })
    }

    async fn restart_container(&self, container: &str) -> Result<(), DispatchError> {
        let url = self
            .base_url
            .join(&format!("/v4.0.0/libpod/containers/{}/restart", container))
            .context("Invalid container path")?;

        let response = self
            .client
            .post(url)
            .send()
            .await
            .context("Podman request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DispatchError::Backend(anyhow::anyhow!(
                "Podman error ({}): {}",
                status,
                body
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl ActionDispatcher for PodmanDispatcher {
    async fn execute(&self, request: &ActionRequest) -> Result<ActionOutcome, DispatchError> {
        match request.kind {
            ActionKind::ContainerRestart => {
                let container = request.container.as_deref().ok_or_else(|| {
                    DispatchError::InvalidRequest("missing 'container'".to_string())
                })?;
                self.restart_container(container).await?;
                Ok(ActionOutcome::executed(
                    request.kind,
                    &format!("container {}", container),
                ))
            }
            other => Err(DispatchError::InvalidRequest(format!(
                "{} is not a Podman action",
                other
            ))),
        }
    }

    fn dry_run_default(&self) -> bool {
        self.dry_run_default
    }
}
