//! Alert log commands

use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;

use crate::client::{Alert, AlertCounts, AlertList, ApiClient};
use crate::output::{
    format_timestamp, print_json, print_success, print_table, severity_label, OutputFormat,
};

/// Row for the alert table
#[derive(Tabled)]
struct AlertRow {
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Severity")]
    severity: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Camera")]
    camera: String,
    #[tabled(rename = "Message")]
    message: String,
}

impl From<&Alert> for AlertRow {
    fn from(alert: &Alert) -> Self {
        Self {
            time: format_timestamp(&alert.timestamp),
            severity: severity_label(&alert.severity).to_string(),
            category: alert.category.clone(),
            camera: alert.camera_id.clone(),
            message: alert.message.clone(),
        }
    }
}

const ALERTS_PATH: &str = "api/v1/alerts";

fn alerts_query(category: Option<&str>, limit: Option<usize>) -> Vec<(&'static str, String)> {
    let mut query = Vec::new();
    if let Some(category) = category {
        query.push(("category", category.to_string()));
    }
    if let Some(limit) = limit {
        query.push(("limit", limit.to_string()));
    }
    query
}

fn counts_line(counts: &AlertCounts) -> String {
    format!(
        "All ({})  Intruders ({})  Feed ({})  Animals ({})",
        counts.all, counts.intruder, counts.feed, counts.animal
    )
}

/// List recent alerts, newest first
pub async fn list_alerts(
    client: &ApiClient,
    category: Option<String>,
    limit: Option<usize>,
    format: OutputFormat,
) -> Result<()> {
    let result: AlertList = client
        .get_with_query(ALERTS_PATH, &alerts_query(category.as_deref(), limit))
        .await?;

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => {
            println!("{}", counts_line(&result.counts).bold());
            let rows: Vec<AlertRow> = result.alerts.iter().map(AlertRow::from).collect();
            print_table(&rows, "No alerts");
        }
    }

    Ok(())
}

/// Clear the agent's alert log
pub async fn clear_alerts(client: &ApiClient) -> Result<()> {
    client.delete(ALERTS_PATH).await?;
    print_success("Alert log cleared");
    Ok(())
}
