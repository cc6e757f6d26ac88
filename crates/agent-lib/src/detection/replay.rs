//! Scripted detector and synthetic frame source
//!
//! Used by the agent when no model runtime is attached, and by tests. The
//! replay file maps camera ids to a list of frames; each frame is either a
//! list of raw detections or `null`, which replays as a detector failure.
//!
//! ```json
//! { "barn": [[{"class": "cow", "score": 0.9, "bbox": {"x": 1, "y": 2, "width": 3, "height": 4}}], null] }
//! ```

use super::{async_trait, DetectionError, FrameSource, ObjectDetector};
use crate::models::{CameraInfo, Frame, RawDetection};
use chrono::Utc;
use dashmap::DashMap;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

type Script = Vec<Option<Vec<RawDetection>>>;

/// Replays scripted detections per camera, cycling by frame sequence
#[derive(Debug, Default)]
pub struct ReplayDetector {
    scripts: HashMap<String, Script>,
}

impl ReplayDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a replay script from a JSON file
    pub fn from_file(path: &Path) -> Result<Self, DetectionError> {
        let content = std::fs::read_to_string(path)?;
        let detector = Self::from_json(&content)?;
        info!(
            path = %path.display(),
            cameras = detector.scripts.len(),
            "Loaded detection replay script"
        );
        Ok(detector)
    }

    pub fn from_json(content: &str) -> Result<Self, DetectionError> {
        let scripts: HashMap<String, Script> = serde_json::from_str(content)?;
        Ok(Self { scripts })
    }

    /// Add or replace the script of one camera
    pub fn with_script(mut self, camera_id: impl Into<String>, frames: Script) -> Self {
        self.scripts.insert(camera_id.into(), frames);
        self
    }
}

#[async_trait]
impl ObjectDetector for ReplayDetector {
    fn name(&self) -> &str {
        "replay"
    }

    async fn detect(&self, frame: &Frame) -> Result<Vec<RawDetection>, DetectionError> {
        let Some(script) = self.scripts.get(&frame.camera_id) else {
            return Ok(Vec::new());
        };
        if script.is_empty() {
            return Ok(Vec::new());
        }

        let idx = (frame.sequence % script.len() as u64) as usize;
        match &script[idx] {
            Some(detections) => Ok(detections.clone()),
            None => Err(DetectionError::Backend(format!(
                "scripted failure at frame {} of camera {}",
                frame.sequence, frame.camera_id
            ))),
        }
    }
}

/// Produces blank frames of a fixed size
#[derive(Debug)]
pub struct SyntheticFrameSource {
    width: u32,
    height: u32,
    /// Captures per camera that report "not ready" before frames flow
    warmup_frames: u64,
    captures: DashMap<String, u64>,
}

impl SyntheticFrameSource {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            warmup_frames: 0,
            captures: DashMap::new(),
        }
    }

    pub fn with_warmup(mut self, frames: u64) -> Self {
        self.warmup_frames = frames;
        self
    }
}

#[async_trait]
impl FrameSource for SyntheticFrameSource {
    async fn capture(&self, camera: &CameraInfo) -> Result<Option<Frame>, DetectionError> {
        let attempt = {
            let mut entry = self.captures.entry(camera.id.clone()).or_insert(0);
            let attempt = *entry;
            *entry += 1;
            attempt
        };

        if attempt < self.warmup_frames {
            return Ok(None);
        }

        Ok(Some(Frame {
            camera_id: camera.id.clone(),
            sequence: attempt - self.warmup_frames,
            width: self.width,
            height: self.height,
            captured_at: Utc::now(),
            data: Vec::new(),
        }))
    }
}
