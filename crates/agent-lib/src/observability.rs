//! Observability infrastructure for the monitoring agent
//!
//! Provides:
//! - Prometheus metrics (detection latency, alerts, detector errors, active cameras)
//! - Structured JSON logging with tracing

use crate::models::{Alert, AlertCategory, AlertSeverity};
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for detector latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<FarmMetricsInner> = OnceLock::new();

/// Inner metrics structure that holds the actual Prometheus metrics
struct FarmMetricsInner {
    detection_latency_seconds: Histogram,
    alerts_total: IntCounterVec,
    detection_errors: IntCounter,
    malformed_detections: IntCounter,
    skipped_cycles: IntCounter,
    cameras_active: IntGauge,
}

impl FarmMetricsInner {
    fn new() -> Self {
        Self {
            detection_latency_seconds: register_histogram!(
                "farmeye_detection_latency_seconds",
                "Time spent in one detector call",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register detection_latency_seconds"),

            alerts_total: register_int_counter_vec!(
                "farmeye_alerts_total",
                "Alerts published, by category and severity",
                &["category", "severity"]
            )
            .expect("Failed to register alerts_total"),

            detection_errors: register_int_counter!(
                "farmeye_detection_errors_total",
                "Detection cycles skipped because the detector or frame source failed"
            )
            .expect("Failed to register detection_errors"),

            malformed_detections: register_int_counter!(
                "farmeye_malformed_detections_total",
                "Raw detections rejected during validation"
            )
            .expect("Failed to register malformed_detections"),

            skipped_cycles: register_int_counter!(
                "farmeye_skipped_cycles_total",
                "Cycles skipped because the previous cycle of the camera was still running"
            )
            .expect("Failed to register skipped_cycles"),

            cameras_active: register_int_gauge!(
                "farmeye_cameras_active",
                "Number of cameras with a running detection loop"
            )
            .expect("Failed to register cameras_active"),
        }
    }
}

/// Agent metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct FarmMetrics {
    _private: (),
}

impl Default for FarmMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl FarmMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(FarmMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &FarmMetricsInner {
        GLOBAL_METRICS.get_or_init(FarmMetricsInner::new)
    }

    pub fn observe_detection_latency(&self, duration_secs: f64) {
        self.inner().detection_latency_seconds.observe(duration_secs);
    }

    pub fn inc_alert(&self, category: AlertCategory, severity: AlertSeverity) {
        self.inner()
            .alerts_total
            .with_label_values(&[category.as_str(), severity.as_str()])
            .inc();
    }

    pub fn inc_detection_errors(&self) {
        self.inner().detection_errors.inc();
    }

    pub fn inc_malformed_detections(&self, count: u64) {
        self.inner().malformed_detections.inc_by(count);
    }

    pub fn inc_skipped_cycles(&self, count: u64) {
        self.inner().skipped_cycles.inc_by(count);
    }

    #[cfg(test)]
    pub(crate) fn skipped_cycles(&self) -> u64 {
        self.inner().skipped_cycles.get()
    }

    pub fn set_cameras_active(&self, count: i64) {
        self.inner().cameras_active.set(count);
    }
}

/// Structured logger for agent events
///
/// Provides consistent JSON-formatted logging for alerts, detector
/// failures and operator actions.
#[derive(Clone)]
pub struct StructuredLogger {
    node_name: String,
}

impl StructuredLogger {
    pub fn new(node_name: impl Into<String>) -> Self {
        Self {
            node_name: node_name.into(),
        }
    }

    /// Log a published alert; this is the transient notification surface
    pub fn log_alert(&self, alert: &Alert) {
        if alert.severity.is_destructive() {
            warn!(
                event = "alert_published",
                node = %self.node_name,
                alert_id = %alert.id,
                camera_id = %alert.camera_id,
                category = %alert.category,
                severity = %alert.severity,
                title = %alert.title,
                "{}", alert.message
            );
        } else {
            info!(
                event = "alert_published",
                node = %self.node_name,
                alert_id = %alert.id,
                camera_id = %alert.camera_id,
                category = %alert.category,
                severity = %alert.severity,
                title = %alert.title,
                "{}", alert.message
            );
        }
    }

    /// Log a detection cycle skipped because of a detector or frame failure
    pub fn log_detection_failure(&self, camera_id: &str, detector: &str, error: &str) {
        warn!(
            event = "detection_failed",
            node = %self.node_name,
            camera_id = %camera_id,
            detector = %detector,
            error = %error,
            "Detection cycle failed, skipping"
        );
    }

    /// Log a camera being activated or deactivated
    pub fn log_camera_toggled(&self, camera_id: &str, active: bool) {
        info!(
            event = "camera_toggled",
            node = %self.node_name,
            camera_id = %camera_id,
            active = active,
            "Camera {}",
            if active { "activated" } else { "deactivated" }
        );
    }

    /// Log a change of the global toggles
    pub fn log_settings_changed(&self, detection_enabled: bool, sound_enabled: bool) {
        info!(
            event = "settings_changed",
            node = %self.node_name,
            detection_enabled = detection_enabled,
            sound_enabled = sound_enabled,
            "Dashboard settings changed"
        );
    }

    /// Log agent startup
    pub fn log_startup(&self, version: &str, detector: &str, cameras: usize) {
        info!(
            event = "agent_started",
            node = %self.node_name,
            agent_version = %version,
            detector = %detector,
            cameras = cameras,
            "FarmEye agent started"
        );
    }

    /// Log agent shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "agent_shutdown",
            node = %self.node_name,
            reason = %reason,
            "FarmEye agent shutting down"
        );
    }
}
