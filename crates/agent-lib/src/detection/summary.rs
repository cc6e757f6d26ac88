//! Validation of raw detections and aggregation into a per-cycle Summary

use super::{ClassificationRules, DetectionError, ObjectCategory};
use crate::models::{
    BoundingBox, ClassifiedDetection, Detection, FeedContainerLevel, RawDetection, Summary,
};
use tracing::debug;

/// Container id for the single synthetic feed container of a camera
pub fn feed_container_id(camera_id: &str) -> String {
    format!("feed-{}", camera_id)
}

/// Fill level estimated from where a container sits vertically in the frame.
///
/// This is a placeholder heuristic, not a measurement: containers higher in
/// the frame read as emptier. Nothing inspects the pixels inside the box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulatedFillLevel(u8);

impl SimulatedFillLevel {
    /// `round((1 - y / frame_height) * 100)` clamped to 0..=100
    pub fn from_position(bbox: &BoundingBox, frame_height: u32) -> Self {
        if frame_height == 0 {
            return Self(0);
        }
        let vertical = bbox.y as f64 / frame_height as f64;
        let level = ((1.0 - vertical) * 100.0).round().clamp(0.0, 100.0);
        Self(level as u8)
    }

    pub fn percent(&self) -> u8 {
        self.0
    }
}

/// Validate one raw detection
pub fn validate(raw: &RawDetection) -> Result<Detection, DetectionError> {
    let class = raw
        .class
        .as_deref()
        .filter(|c| !c.is_empty())
        .ok_or_else(|| DetectionError::Malformed("missing class label".to_string()))?;

    let score = raw
        .score
        .ok_or_else(|| DetectionError::Malformed(format!("{}: missing score", class)))?;
    if !score.is_finite() || !(0.0..=1.0).contains(&score) {
        return Err(DetectionError::Malformed(format!(
            "{}: score {} outside [0, 1]",
            class, score
        )));
    }

    let bbox = raw
        .bbox
        .as_ref()
        .ok_or_else(|| DetectionError::Malformed(format!("{}: missing bounding box", class)))?;
    let field = |v: Option<f32>, name: &str| -> Result<f32, DetectionError> {
        match v {
            Some(v) if v.is_finite() => Ok(v),
            Some(v) => Err(DetectionError::Malformed(format!(
                "{}: bbox.{} is {}",
                class, name, v
            ))),
            None => Err(DetectionError::Malformed(format!(
                "{}: missing bbox.{}",
                class, name
            ))),
        }
    };
    let bbox = BoundingBox {
        x: field(bbox.x, "x")?,
        y: field(bbox.y, "y")?,
        width: field(bbox.width, "width")?,
        height: field(bbox.height, "height")?,
    };
    if bbox.width < 0.0 || bbox.height < 0.0 {
        return Err(DetectionError::Malformed(format!(
            "{}: negative bbox size",
            class
        )));
    }

    Ok(Detection {
        class: class.to_string(),
        score,
        bbox,
    })
}

/// Result of running one frame's detections through validation and classification
#[derive(Debug, Clone, Default)]
pub struct ValidatedFrame {
    pub summary: Summary,
    pub detections: Vec<ClassifiedDetection>,
    /// Raw detections rejected as malformed
    pub malformed: usize,
    /// Valid detections dropped for low confidence
    pub below_confidence: usize,
}

/// Builds a Summary from the raw output of one detection pass
#[derive(Debug, Clone, Default)]
pub struct SummaryBuilder {
    rules: ClassificationRules,
    min_confidence: f32,
}

impl SummaryBuilder {
    pub fn new(rules: ClassificationRules) -> Self {
        Self {
            rules,
            min_confidence: 0.0,
        }
    }

    /// Drop detections scoring below this value before classification
    pub fn with_min_confidence(mut self, min_confidence: f32) -> Self {
        self.min_confidence = min_confidence;
        self
    }

    pub fn rules(&self) -> &ClassificationRules {
        &self.rules
    }

    /// Aggregate a single shared detection pass into the cycle's signals
    pub fn build(&self, camera_id: &str, frame_height: u32, raw: &[RawDetection]) -> ValidatedFrame {
        let mut out = ValidatedFrame::default();
        let mut first_container: Option<BoundingBox> = None;

        for entry in raw {
            let detection = match validate(entry) {
                Ok(d) => d,
                Err(e) => {
                    debug!(camera_id = %camera_id, error = %e, "Skipping malformed detection");
                    out.malformed += 1;
                    continue;
                }
            };

            if detection.score < self.min_confidence {
                out.below_confidence += 1;
                continue;
            }

            let category = self.rules.classify(&detection.class);
            match category {
                ObjectCategory::Intruder => out.summary.intruder_count += 1,
                ObjectCategory::Animal => out.summary.animal_count += 1,
                ObjectCategory::FeedContainer => {
                    if first_container.is_none() {
                        first_container = Some(detection.bbox);
                    }
                }
                ObjectCategory::Ignored => {}
            }

            out.detections.push(ClassifiedDetection {
                detection,
                category,
                color: category.overlay_color().to_string(),
            });
        }

        // Only the first container per cycle is surfaced, keyed by camera
        if let Some(bbox) = first_container {
            out.summary.feed_containers.push(FeedContainerLevel {
                container_id: feed_container_id(camera_id),
                fill_level: SimulatedFillLevel::from_position(&bbox, frame_height).percent(),
            });
        }

        out
    }
}
