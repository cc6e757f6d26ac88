//! Coordinator owning the application state and the camera loop tasks
//!
//! Starts one detection loop per active camera while detection is enabled.
//! Stopping a loop signals it and awaits its task, so no timer is left
//! pending after a camera is deactivated or detection is switched off.

use super::r#loop::{CameraLoop, LoopContext, DEFAULT_DETECTION_INTERVAL};
use super::{discover_cameras, CameraRegistry, CameraSource};
use crate::alerting::{AlertHub, DebounceThresholds};
use crate::detection::{FrameSource, ObjectDetector, SummaryBuilder};
use crate::health::{components, HealthRegistry};
use crate::models::{CameraInfo, CameraSnapshot};
use crate::observability::{FarmMetrics, StructuredLogger};
use anyhow::Result;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Errors returned by supervisor operations
#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    #[error("unknown camera: {0}")]
    UnknownCamera(String),
}

/// Dashboard status panel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemStatus {
    pub active_cameras: usize,
    pub total_cameras: usize,
    pub running_loops: usize,
    pub detection_enabled: bool,
    pub sound_enabled: bool,
    pub last_alert_at: Option<DateTime<Utc>>,
}

struct LoopHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Single owner of cameras, toggles, loop tasks and the alert sink
pub struct Supervisor {
    registry: Arc<CameraRegistry>,
    alerts: Arc<AlertHub>,
    ctx: LoopContext,
    loops: Mutex<HashMap<String, LoopHandle>>,
}

impl Supervisor {
    pub fn builder() -> SupervisorBuilder {
        SupervisorBuilder::new()
    }

    pub fn registry(&self) -> &Arc<CameraRegistry> {
        &self.registry
    }

    pub fn alerts(&self) -> &Arc<AlertHub> {
        &self.alerts
    }

    pub fn health(&self) -> &HealthRegistry {
        &self.ctx.health
    }

    pub fn detection_enabled(&self) -> bool {
        self.ctx.detection_enabled.load(Ordering::SeqCst)
    }

    pub fn cameras(&self) -> Vec<CameraInfo> {
        self.registry.list()
    }

    /// Latest published view of a camera
    pub fn snapshot(&self, camera_id: &str) -> Option<CameraSnapshot> {
        self.ctx.snapshots.get(camera_id).map(|s| s.clone())
    }

    /// Ids of cameras with a running loop, sorted
    pub async fn running_cameras(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.loops.lock().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub async fn status(&self) -> SystemStatus {
        SystemStatus {
            active_cameras: self.registry.active().len(),
            total_cameras: self.registry.len(),
            running_loops: self.loops.lock().await.len(),
            detection_enabled: self.detection_enabled(),
            sound_enabled: self.alerts.sound_enabled(),
            last_alert_at: self.alerts.last_alert_at(),
        }
    }

    /// Enumerate cameras from `source` and start loops for new active ones
    pub async fn discover(&self, source: &dyn CameraSource) -> usize {
        let added = discover_cameras(source, &self.registry).await;
        self.start().await;
        added
    }

    /// Start loops for every active camera that is not running yet
    pub async fn start(&self) {
        if !self.detection_enabled() {
            return;
        }

        let mut loops = self.loops.lock().await;
        for camera in self.registry.active() {
            if !loops.contains_key(&camera.id) {
                let handle = self.spawn_loop(camera.clone());
                loops.insert(camera.id, handle);
            }
        }
        self.ctx.metrics.set_cameras_active(loops.len() as i64);
    }

    /// Stop every loop and wait for the tasks to finish
    pub async fn stop_all(&self) {
        let drained: Vec<(String, LoopHandle)> = self.loops.lock().await.drain().collect();
        for (camera_id, handle) in drained {
            self.finish(&camera_id, handle).await;
        }
        self.ctx.metrics.set_cameras_active(0);
    }

    pub async fn shutdown(&self) {
        info!("Stopping all camera loops");
        self.stop_all().await;
    }

    /// Globally enable or disable detection
    pub async fn set_detection_enabled(&self, enabled: bool) {
        let was = self.ctx.detection_enabled.swap(enabled, Ordering::SeqCst);
        if was != enabled {
            self.ctx
                .logger
                .log_settings_changed(enabled, self.alerts.sound_enabled());
        }

        if enabled {
            self.start().await;
        } else {
            self.stop_all().await;
        }
    }

    pub fn set_sound_enabled(&self, enabled: bool) {
        if self.alerts.sound_enabled() != enabled {
            self.alerts.set_sound_enabled(enabled);
            self.ctx
                .logger
                .log_settings_changed(self.detection_enabled(), enabled);
        }
    }

    /// Flip a camera's active flag and start or stop its loop accordingly
    pub async fn toggle_camera(&self, camera_id: &str) -> Result<CameraInfo, SupervisorError> {
        let camera = self
            .registry
            .toggle(camera_id)
            .ok_or_else(|| SupervisorError::UnknownCamera(camera_id.to_string()))?;
        self.apply_camera_state(&camera).await;
        Ok(camera)
    }

    pub async fn set_camera_active(
        &self,
        camera_id: &str,
        active: bool,
    ) -> Result<CameraInfo, SupervisorError> {
        let camera = self
            .registry
            .set_active(camera_id, active)
            .ok_or_else(|| SupervisorError::UnknownCamera(camera_id.to_string()))?;
        self.apply_camera_state(&camera).await;
        Ok(camera)
    }

    async fn apply_camera_state(&self, camera: &CameraInfo) {
        self.ctx.logger.log_camera_toggled(&camera.id, camera.active);

        let stopped = {
            let mut loops = self.loops.lock().await;
            let stopped = if camera.active && self.detection_enabled() {
                if !loops.contains_key(&camera.id) {
                    let handle = self.spawn_loop(camera.clone());
                    loops.insert(camera.id.clone(), handle);
                }
                None
            } else {
                loops.remove(&camera.id)
            };
            self.ctx.metrics.set_cameras_active(loops.len() as i64);
            stopped
        };

        // Awaited without the lock so status reads and other toggles proceed
        if let Some(handle) = stopped {
            self.finish(&camera.id, handle).await;
        }
    }

    fn spawn_loop(&self, camera: CameraInfo) -> LoopHandle {
        let (stop, stop_rx) = watch::channel(false);
        let camera_loop = CameraLoop::new(camera, self.ctx.clone());
        LoopHandle {
            stop,
            task: tokio::spawn(camera_loop.run(stop_rx)),
        }
    }

    async fn finish(&self, camera_id: &str, handle: LoopHandle) {
        let _ = handle.stop.send(true);
        if let Err(e) = handle.task.await {
            warn!(camera_id = %camera_id, error = %e, "Camera loop ended abnormally");
            self.ctx
                .health
                .set_degraded(
                    components::CAMERA_LOOPS,
                    format!("Loop for camera {} ended abnormally", camera_id),
                )
                .await;
        }
        self.ctx.snapshots.remove(camera_id);
        self.ctx.health.forget_camera(camera_id).await;
    }
}

/// Builder wiring the supervisor's collaborators
pub struct SupervisorBuilder {
    detector: Option<Arc<dyn ObjectDetector>>,
    frames: Option<Arc<dyn FrameSource>>,
    alerts: Option<Arc<AlertHub>>,
    builder: SummaryBuilder,
    thresholds: DebounceThresholds,
    interval: Duration,
    detection_enabled: bool,
    health: Option<HealthRegistry>,
    metrics: Option<FarmMetrics>,
    logger: Option<StructuredLogger>,
}

impl SupervisorBuilder {
    pub fn new() -> Self {
        Self {
            detector: None,
            frames: None,
            alerts: None,
            builder: SummaryBuilder::default(),
            thresholds: DebounceThresholds::default(),
            interval: DEFAULT_DETECTION_INTERVAL,
            detection_enabled: true,
            health: None,
            metrics: None,
            logger: None,
        }
    }

    /// Set the detector adapter
    pub fn detector(mut self, detector: Arc<dyn ObjectDetector>) -> Self {
        self.detector = Some(detector);
        self
    }

    /// Set the frame source
    pub fn frames(mut self, frames: Arc<dyn FrameSource>) -> Self {
        self.frames = Some(frames);
        self
    }

    /// Set the alert sink
    pub fn alerts(mut self, alerts: Arc<AlertHub>) -> Self {
        self.alerts = Some(alerts);
        self
    }

    pub fn summary_builder(mut self, builder: SummaryBuilder) -> Self {
        self.builder = builder;
        self
    }

    pub fn thresholds(mut self, thresholds: DebounceThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Set the detection interval
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn detection_enabled(mut self, enabled: bool) -> Self {
        self.detection_enabled = enabled;
        self
    }

    pub fn health(mut self, health: HealthRegistry) -> Self {
        self.health = Some(health);
        self
    }

    pub fn metrics(mut self, metrics: FarmMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Build the supervisor; no loop runs until `start` or `discover`
    pub fn build(self) -> Result<Supervisor> {
        let detector = self
            .detector
            .ok_or_else(|| anyhow::anyhow!("Detector is required"))?;
        let frames = self
            .frames
            .ok_or_else(|| anyhow::anyhow!("Frame source is required"))?;
        let alerts = self
            .alerts
            .ok_or_else(|| anyhow::anyhow!("Alert sink is required"))?;
        if self.interval.is_zero() {
            anyhow::bail!("Detection interval must be greater than zero");
        }

        let ctx = LoopContext {
            detector,
            frames,
            builder: Arc::new(self.builder),
            thresholds: self.thresholds,
            sink: alerts.clone(),
            snapshots: Arc::new(DashMap::new()),
            detection_enabled: Arc::new(AtomicBool::new(self.detection_enabled)),
            interval: self.interval,
            health: self.health.unwrap_or_default(),
            metrics: self.metrics.unwrap_or_default(),
            logger: self
                .logger
                .unwrap_or_else(|| StructuredLogger::new("farmeye")),
        };

        Ok(Supervisor {
            registry: Arc::new(CameraRegistry::new()),
            alerts,
            ctx,
            loops: Mutex::new(HashMap::new()),
        })
    }
}

impl Default for SupervisorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Register the health components the supervisor reports on
pub async fn register_health_components(health: &HealthRegistry) {
    health.register(components::CAMERA_LOOPS).await;
    health.register(components::DETECTOR).await;
}
