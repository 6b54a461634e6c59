//! Workload Guardian CLI
//!
//! A command-line tool for querying ranked anomalies, dispatching
//! remediation actions, and checking guardian service health.

mod client;
mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{act, anomalies, health};

/// Workload Guardian CLI
#[derive(Parser)]
#[command(name = "guardianctl")]
#[command(author, version, about = "CLI for the Workload Guardian", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via GUARDIAN_API_URL env var)
    #[arg(long, env = "GUARDIAN_API_URL", default_value = "http://localhost:8080")]
    pub api_url: String,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    /// Enable verbose output
    #[arg(long, short)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List ranked anomalies
    Anomalies {
        /// Filter by namespace
        #[arg(long, short)]
        namespace: Option<String>,

        /// Maximum number of results
        #[arg(long, short)]
        top: Option<usize>,
    },

    /// Dispatch a remediation action
    #[command(subcommand)]
    Act(ActCommands),

    /// Show service health and readiness
    Health,
}

#[derive(Subcommand)]
pub enum ActCommands {
    /// Trigger a rolling restart of a deployment
    RollingRestart {
        /// Deployment namespace
        #[arg(long, short)]
        namespace: String,

        /// Deployment name
        #[arg(long, short)]
        deployment: String,

        /// Perform the action instead of the default dry-run
        #[arg(long)]
        execute: bool,
    },

    /// Scale a deployment to a replica count
    ScaleReplicas {
        /// Deployment namespace
        #[arg(long, short)]
        namespace: String,

        /// Deployment name
        #[arg(long, short)]
        deployment: String,

        /// Target replica count
        #[arg(long, short)]
        replicas: i32,

        /// Perform the action instead of the default dry-run
        #[arg(long)]
        execute: bool,
    },

    /// Delete a pod so its controller replaces it
    PodRestart {
        /// Pod namespace
        #[arg(long, short)]
        namespace: String,

        /// Pod name
        #[arg(long, short)]
        pod: String,

        /// Perform the action instead of the default dry-run
        #[arg(long)]
        execute: bool,
    },

    /// Restart a standalone container
    ContainerRestart {
        /// Container name
        #[arg(long, short)]
        container: String,

        /// Perform the action instead of the default dry-run
        #[arg(long)]
        execute: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize client
    let client = client::ApiClient::new(&cli.api_url)?;

    // Execute command
    match cli.command {
        Commands::Anomalies { namespace, top } => {
            anomalies::list_anomalies(&client, namespace, top, cli.format).await?;
        }
        Commands::Act(act_cmd) => match act_cmd {
            ActCommands::RollingRestart {
                namespace,
                deployment,
                execute,
            } => {
                act::dispatch(
                    &client,
                    "rolling-restart",
                    Some(namespace),
                    Some(deployment),
                    None,
                    None,
                    None,
                    execute,
                    cli.format,
                )
                .await?;
            }
            ActCommands::ScaleReplicas {
                namespace,
                deployment,
                replicas,
                execute,
            } => {
                act::dispatch(
                    &client,
                    "scale-replicas",
                    Some(namespace),
                    Some(deployment),
                    None,
                    Some(replicas),
                    None,
                    execute,
                    cli.format,
                )
                .await?;
            }
            ActCommands::PodRestart {
                namespace,
                pod,
                execute,
            } => {
                act::dispatch(
                    &client,
                    "pod-restart",
                    Some(namespace),
                    None,
                    Some(pod),
                    None,
                    None,
                    execute,
                    cli.format,
                )
                .await?;
            }
            ActCommands::ContainerRestart { container, execute } => {
                act::dispatch(
                    &client,
                    "container-restart",
                    None,
                    None,
                    None,
                    None,
                    Some(container),
                    execute,
                    cli.format,
                )
                .await?;
            }
        },
        Commands::Health => {
            health::show_health(&client, cli.format).await?;
        }
    }

    Ok(())
}
