//! Object detection adapters and per-frame signal extraction
//!
//! This module provides:
//! - The detector and frame source seams around the pretrained model
//! - Label classification rules
//! - Validation of raw detections and Summary computation

mod classify;
mod replay;
mod summary;

pub use classify::{classify, ClassificationRules, ObjectCategory};
pub use replay::{ReplayDetector, SyntheticFrameSource};
pub use summary::{
    feed_container_id, validate, SimulatedFillLevel, SummaryBuilder, ValidatedFrame,
};

use crate::models::{CameraInfo, Frame, RawDetection};

pub use async_trait::async_trait;

/// Errors raised while capturing or analysing a frame
#[derive(Debug, thiserror::Error)]
pub enum DetectionError {
    #[error("detection model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("detector backend failed: {0}")]
    Backend(String),

    #[error("malformed detection: {0}")]
    Malformed(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse detections: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Wraps a pretrained object-detection model
#[async_trait]
pub trait ObjectDetector: Send + Sync {
    /// Backend identifier used in logs
    fn name(&self) -> &str;

    /// Run the model once over a frame
    async fn detect(&self, frame: &Frame) -> Result<Vec<RawDetection>, DetectionError>;
}

/// Supplies frames for a camera
#[async_trait]
pub trait FrameSource: Send + Sync {
    /// Capture the current frame, or `None` while the video is not ready yet
    async fn capture(&self, camera: &CameraInfo) -> Result<Option<Frame>, DetectionError>;
}
