//! Anomaly query commands

use anyhow::Result;
use tabled::Tabled;

use crate::client::{Anomaly, AnomalyList, ApiClient};
use crate::output::{color_score, print_warning, OutputFormat};

/// Row for the ranked anomaly table
#[derive(Tabled)]
struct AnomalyRow {
    #[tabled(rename = "Namespace")]
    namespace: String,
    #[tabled(rename = "Pod")]
    pod: String,
    #[tabled(rename = "Container")]
    container: String,
    #[tabled(rename = "Score")]
    score: String,
    #[tabled(rename = "Reasons")]
    reasons: String,
    #[tabled(rename = "Suggested")]
    suggested: String,
}

impl AnomalyRow {
    fn from_anomaly(anomaly: &Anomaly) -> Self {
        Self {
            namespace: anomaly.namespace.clone(),
            pod: anomaly.pod.clone(),
            container: anomaly.container.clone(),
            score: color_score(anomaly.anomaly_score),
            reasons: anomaly.reasons.join("; "),
            suggested: anomaly
                .suggested_actions
                .iter()
                .map(|a| a.action.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

/// List ranked anomalies with optional namespace and count filters
pub async fn list_anomalies(
    client: &ApiClient,
    namespace: Option<String>,
    top: Option<usize>,
    format: OutputFormat,
) -> Result<()> {
    let mut path = "anomalies".to_string();
    let mut params = Vec::new();
    if let Some(ns) = &namespace {
        params.push(format!("namespace={}", ns));
    }
    if let Some(top) = top {
        params.push(format!("top_k={}", top));
    }
    if !params.is_empty() {
        path = format!("{}?{}", path, params.join("&"));
    }

    let result: AnomalyList = client.get(&path).await?;

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&result.anomalies)?;
            println!("{}", json);
        }
        OutputFormat::Table => {
            if result.anomalies.is_empty() {
                print_warning("No anomalies found");
                return Ok(());
            }

            let rows: Vec<AnomalyRow> = result
                .anomalies
                .iter()
                .map(AnomalyRow::from_anomaly)
                .collect();
            let table = tabled::Table::new(&rows)
                .with(tabled::settings::Style::rounded())
                .to_string();
            println!("{}", table);
        }
    }

    Ok(())
}
