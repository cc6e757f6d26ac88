//! Core data models for the farm monitoring agent

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box in pixel units of the source frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// A validated object detection for a single frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub class: String,
    pub score: f32,
    pub bbox: BoundingBox,
}

/// Bounding box as reported by a detector, before validation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawBoundingBox {
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub width: Option<f32>,
    pub height: Option<f32>,
}

/// Detection as reported by a detector, before validation
///
/// Every field is optional so that a single malformed entry can be
/// rejected without discarding the rest of the frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawDetection {
    pub class: Option<String>,
    pub score: Option<f32>,
    pub bbox: Option<RawBoundingBox>,
}

impl RawDetection {
    /// Build a well-formed raw detection, mostly useful for detectors and tests
    pub fn new(class: impl Into<String>, score: f32, x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            class: Some(class.into()),
            score: Some(score),
            bbox: Some(RawBoundingBox {
                x: Some(x),
                y: Some(y),
                width: Some(width),
                height: Some(height),
            }),
        }
    }
}

/// A single captured frame handed to the detector
#[derive(Debug, Clone)]
pub struct Frame {
    pub camera_id: String,
    pub sequence: u64,
    pub width: u32,
    pub height: u32,
    pub captured_at: DateTime<Utc>,
    /// Opaque image payload, interpreted only by the detector
    pub data: Vec<u8>,
}

/// Kind of video source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraKind {
    #[default]
    Webcam,
    Ip,
    Rtsp,
}

/// Camera information for discovery and labeling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraInfo {
    pub id: String,
    pub name: String,
    pub active: bool,
    #[serde(default)]
    pub kind: CameraKind,
}

/// Simulated fill level of one feed container
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedContainerLevel {
    pub container_id: String,
    /// Percent in 0..=100, derived from box position rather than measured
    pub fill_level: u8,
}

/// Per-camera, per-cycle aggregate of classified detections
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub intruder_count: u32,
    pub animal_count: u32,
    pub feed_containers: Vec<FeedContainerLevel>,
}

impl Summary {
    /// Look up a container by id
    pub fn container(&self, container_id: &str) -> Option<&FeedContainerLevel> {
        self.feed_containers
            .iter()
            .find(|c| c.container_id == container_id)
    }
}

/// Alert severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Info,
    Warning,
    Danger,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSeverity::Info => "info",
            AlertSeverity::Warning => "warning",
            AlertSeverity::Danger => "danger",
        }
    }

    /// Whether the notification should be styled as destructive
    pub fn is_destructive(&self) -> bool {
        matches!(self, AlertSeverity::Danger)
    }
}

impl std::fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Alert category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertCategory {
    Intruder,
    Feed,
    Animal,
}

impl AlertCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertCategory::Intruder => "intruder",
            AlertCategory::Feed => "feed",
            AlertCategory::Animal => "animal",
        }
    }
}

impl std::fmt::Display for AlertCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AlertCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "intruder" => Ok(AlertCategory::Intruder),
            "feed" => Ok(AlertCategory::Feed),
            "animal" => Ok(AlertCategory::Animal),
            other => Err(format!("unknown alert category '{}'", other)),
        }
    }
}

/// An alert raised by the debouncer; immutable once created
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub severity: AlertSeverity,
    pub category: AlertCategory,
    pub title: String,
    pub message: String,
    pub camera_id: String,
}

/// Detection annotated with its category, as drawn on the dashboard overlay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedDetection {
    #[serde(flatten)]
    pub detection: Detection,
    pub category: crate::detection::ObjectCategory,
    pub color: String,
}

/// Latest per-camera view published after every completed cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraSnapshot {
    pub camera_id: String,
    pub camera_name: String,
    pub summary: Summary,
    pub detections: Vec<ClassifiedDetection>,
    pub updated_at: DateTime<Utc>,
}
