//! Status panel and global toggles

use anyhow::Result;
use colored::Colorize;

use crate::client::{ApiClient, SettingsUpdate, SystemStatus};
use crate::output::{format_timestamp, on_off, print_info, print_json, print_success, OutputFormat};

pub async fn show_status(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let status: SystemStatus = client.get("api/v1/status").await?;
    print_status(&status, format)
}

/// Apply a settings change and print the resulting status
pub async fn update_settings(
    client: &ApiClient,
    update: SettingsUpdate,
    format: OutputFormat,
) -> Result<()> {
    let status: SystemStatus = client.put("api/v1/settings", &update).await?;

    if format == OutputFormat::Table {
        if let Some(enabled) = update.detection_enabled {
            print_success(&format!("Detection turned {}", on_off(enabled)));
        }
        if let Some(enabled) = update.sound_enabled {
            print_success(&format!("Sound alerts turned {}", on_off(enabled)));
        }
    }
    print_status(&status, format)
}

fn print_status(status: &SystemStatus, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(status)?,
        OutputFormat::Table => {
            println!("{}", "System Status".bold());
            println!("{}", "=".repeat(40));
            println!(
                "Cameras:         {}/{} active",
                status.active_cameras, status.total_cameras
            );
            println!("Detection loops: {}", status.running_loops);
            println!("Detection:       {}", on_off(status.detection_enabled));
            println!("Sound alerts:    {}", on_off(status.sound_enabled));
            match &status.last_alert_at {
                Some(ts) => println!("Last alert:      {}", format_timestamp(ts)),
                None => print_info("No alerts yet"),
            }
        }
    }
    Ok(())
}
