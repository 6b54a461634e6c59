//! Action dispatch commands

use anyhow::Result;
use colored::Colorize;

use crate::client::{ActionOutcome, ActionRequest, ApiClient};
use crate::output::{print_info, print_success, OutputFormat};

/// Dispatch a remediation action. Leaves `dry_run` unset unless the
/// caller decides, so the service-side default applies.
#[allow(clippy::too_many_arguments)]
pub async fn dispatch(
    client: &ApiClient,
    kind: &str,
    namespace: Option<String>,
    deployment: Option<String>,
    pod: Option<String>,
    replicas: Option<i32>,
    container: Option<String>,
    execute: bool,
    format: OutputFormat,
) -> Result<()> {
    let request = ActionRequest {
        kind: kind.to_string(),
        namespace,
        deployment,
        pod,
        replicas,
        container,
        dry_run: if execute { Some(false) } else { None },
    };

    let outcome: ActionOutcome = client.post("act", &request).await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        OutputFormat::Table => {
            if outcome.dry_run {
                print_info(&outcome.message);
                println!(
                    "{}",
                    "Re-run with --execute to perform the action".yellow()
                );
            } else {
                print_success(&outcome.message);
            }
        }
    }

    Ok(())
}
