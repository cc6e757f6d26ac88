//! Per-camera change detection between consecutive Summaries
//!
//! Each rule compares the current Summary with the immediately preceding one
//! for the same camera. The three rules are independent and may all fire in
//! one cycle. The previous Summary is replaced after every evaluation.

use crate::models::{Alert, AlertCategory, AlertSeverity, Summary};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Default low-feed threshold in percent
const DEFAULT_FEED_LOW_PERCENT: u8 = 30;

/// Default minimum level change, in percent, before re-alerting on a known container
const DEFAULT_FEED_DELTA_PERCENT: u8 = 10;

static ALERT_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Thresholds for the feed rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebounceThresholds {
    /// Alert while the level is strictly below this
    pub feed_low_percent: u8,
    /// Re-alert on a known container only when the level moved strictly more than this
    pub feed_delta_percent: u8,
}

impl Default for DebounceThresholds {
    fn default() -> Self {
        Self {
            feed_low_percent: DEFAULT_FEED_LOW_PERCENT,
            feed_delta_percent: DEFAULT_FEED_DELTA_PERCENT,
        }
    }
}

/// Stateful alert debouncer, one per camera
#[derive(Debug, Clone)]
pub struct AlertDebouncer {
    camera_id: String,
    camera_name: String,
    thresholds: DebounceThresholds,
    previous: Summary,
}

impl AlertDebouncer {
    pub fn new(camera_id: impl Into<String>, camera_name: impl Into<String>) -> Self {
        Self {
            camera_id: camera_id.into(),
            camera_name: camera_name.into(),
            thresholds: DebounceThresholds::default(),
            previous: Summary::default(),
        }
    }

    pub fn with_thresholds(mut self, thresholds: DebounceThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Summary of the last evaluated cycle
    pub fn previous(&self) -> &Summary {
        &self.previous
    }

    /// Compare `current` against the previous cycle and return the alerts to emit.
    /// Ordering: intruder, feed containers in Summary order, animal.
    pub fn evaluate(&mut self, current: Summary) -> Vec<Alert> {
        let mut alerts = Vec::new();

        if let Some(alert) = self.intruder_rule(&current) {
            alerts.push(alert);
        }
        alerts.extend(self.feed_rule(&current));
        if let Some(alert) = self.animal_rule(&current) {
            alerts.push(alert);
        }

        self.previous = current;
        alerts
    }

    fn intruder_rule(&self, current: &Summary) -> Option<Alert> {
        let count = current.intruder_count;
        if count == 0 || count == self.previous.intruder_count {
            return None;
        }

        let noun = if count == 1 { "intruder" } else { "intruders" };
        Some(self.alert(
            AlertSeverity::Danger,
            AlertCategory::Intruder,
            "Intruder Detected",
            format!("{} {} detected on {}", count, noun, self.camera_name),
        ))
    }

    fn feed_rule(&self, current: &Summary) -> Vec<Alert> {
        current
            .feed_containers
            .iter()
            .filter(|container| {
                if container.fill_level >= self.thresholds.feed_low_percent {
                    return false;
                }
                match self.previous.container(&container.container_id) {
                    None => true,
                    Some(prev) => {
                        prev.fill_level.abs_diff(container.fill_level)
                            > self.thresholds.feed_delta_percent
                    }
                }
            })
            .map(|container| {
                self.alert(
                    AlertSeverity::Warning,
                    AlertCategory::Feed,
                    "Low Feed Level",
                    format!(
                        "Feed container at {}% capacity on {}",
                        container.fill_level, self.camera_name
                    ),
                )
            })
            .collect()
    }

    fn animal_rule(&self, current: &Summary) -> Option<Alert> {
        let old = self.previous.animal_count;
        let new = current.animal_count;
        // No alert on the first non-zero observation
        if old == 0 || new == old {
            return None;
        }

        let (severity, direction) = if new < old {
            (AlertSeverity::Danger, "decreased")
        } else {
            (AlertSeverity::Info, "increased")
        };
        Some(self.alert(
            severity,
            AlertCategory::Animal,
            "Animal Count Changed",
            format!(
                "Animal count {} from {} to {} on {}",
                direction, old, new, self.camera_name
            ),
        ))
    }

    fn alert(
        &self,
        severity: AlertSeverity,
        category: AlertCategory,
        title: &str,
        message: String,
    ) -> Alert {
        let timestamp = Utc::now();
        Alert {
            id: next_alert_id(timestamp.timestamp_millis()),
            timestamp,
            severity,
            category,
            title: title.to_string(),
            message,
            camera_id: self.camera_id.clone(),
        }
    }
}

/// Unique within the process even when several alerts share a millisecond
fn next_alert_id(millis: i64) -> String {
    let seq = ALERT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("{}-{}", millis, seq)
}
