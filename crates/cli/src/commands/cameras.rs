//! Camera commands

use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;

use crate::client::{ApiClient, Camera, CameraSnapshot};
use crate::output::{
    category_label, fill_bar, format_timestamp, on_off, print_json, print_success, print_table,
    OutputFormat,
};

/// Row for the camera table
#[derive(Tabled)]
struct CameraRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Active")]
    active: String,
}

/// Row for the detection table of a snapshot
#[derive(Tabled)]
struct DetectionRow {
    #[tabled(rename = "Label")]
    label: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Score")]
    score: String,
    #[tabled(rename = "Box (x, y, w, h)")]
    bbox: String,
}

pub async fn list_cameras(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let cameras: Vec<Camera> = client.get("api/v1/cameras").await?;

    match format {
        OutputFormat::Json => print_json(&cameras)?,
        OutputFormat::Table => {
            let rows: Vec<CameraRow> = cameras
                .iter()
                .map(|c| CameraRow {
                    id: c.id.clone(),
                    name: c.name.clone(),
                    kind: c.kind.clone(),
                    active: on_off(c.active).to_string(),
                })
                .collect();
            print_table(&rows, "No cameras found");
        }
    }

    Ok(())
}

/// Flip a camera's active flag
pub async fn toggle_camera(client: &ApiClient, id: &str, format: OutputFormat) -> Result<()> {
    let camera: Camera = client
        .post(&format!("api/v1/cameras/{}/toggle", id))
        .await?;

    match format {
        OutputFormat::Json => print_json(&camera)?,
        OutputFormat::Table => print_success(&format!(
            "Camera {} is now {}",
            camera.name,
            if camera.active { "active" } else { "inactive" }
        )),
    }

    Ok(())
}

/// Show the latest detection summary of a camera
pub async fn show_snapshot(client: &ApiClient, id: &str, format: OutputFormat) -> Result<()> {
    let snapshot: CameraSnapshot = client
        .get(&format!("api/v1/cameras/{}/snapshot", id))
        .await?;

    match format {
        OutputFormat::Json => print_json(&snapshot)?,
        OutputFormat::Table => {
            println!("{}", snapshot.camera_name.bold());
            println!("{}", "=".repeat(50));
            println!("Updated:   {}", format_timestamp(&snapshot.updated_at).dimmed());
            println!("Intruders: {}", snapshot.summary.intruder_count.to_string().red());
            println!("Animals:   {}", snapshot.summary.animal_count.to_string().green());
            for container in &snapshot.summary.feed_containers {
                println!(
                    "Feed:      {} (simulated)",
                    fill_bar(container.fill_level).blue()
                );
            }
            println!();

            let rows: Vec<DetectionRow> = snapshot
                .detections
                .iter()
                .map(|d| DetectionRow {
                    label: d.class.clone(),
                    category: category_label(&d.category).to_string(),
                    score: format!("{:.0}%", d.score * 100.0),
                    bbox: format!(
                        "{:.0}, {:.0}, {:.0}, {:.0}",
                        d.bbox.x, d.bbox.y, d.bbox.width, d.bbox.height
                    ),
                })
                .collect();
            print_table(&rows, "No objects detected");
        }
    }

    Ok(())
}
