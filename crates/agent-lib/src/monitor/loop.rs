//! Per-camera detection loop
//!
//! Polls the detector at a fixed cadence, turns the detections of each cycle
//! into a Summary and feeds it through the camera's debouncer.

use crate::alerting::{AlertDebouncer, AlertSink, DebounceThresholds};
use crate::detection::{DetectionError, FrameSource, ObjectDetector, SummaryBuilder};
use crate::health::HealthRegistry;
use crate::models::{CameraInfo, CameraSnapshot, ClassifiedDetection, Summary};
use crate::observability::{FarmMetrics, StructuredLogger};
use chrono::Utc;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info};

/// Default detection cadence
pub const DEFAULT_DETECTION_INTERVAL: Duration = Duration::from_millis(500);

/// Outcome of a single detection cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Detection ran and the debouncer was evaluated
    Completed { alerts: usize },
    /// Detection is globally disabled
    Disabled,
    /// The video source has no frame yet
    NotReady,
    /// The frame source or detector failed; the debouncer saw an empty frame
    Failed { alerts: usize },
}

/// Collaborators shared by every camera loop
#[derive(Clone)]
pub struct LoopContext {
    pub detector: Arc<dyn ObjectDetector>,
    pub frames: Arc<dyn FrameSource>,
    pub builder: Arc<SummaryBuilder>,
    pub thresholds: DebounceThresholds,
    pub sink: Arc<dyn AlertSink>,
    pub snapshots: Arc<DashMap<String, CameraSnapshot>>,
    pub detection_enabled: Arc<AtomicBool>,
    pub interval: Duration,
    pub health: HealthRegistry,
    pub metrics: FarmMetrics,
    pub logger: StructuredLogger,
}

/// Detection loop owning the debouncer state of one camera
pub struct CameraLoop {
    camera: CameraInfo,
    ctx: LoopContext,
    debouncer: AlertDebouncer,
}

impl CameraLoop {
    pub fn new(camera: CameraInfo, ctx: LoopContext) -> Self {
        let debouncer =
            AlertDebouncer::new(camera.id.clone(), camera.name.clone()).with_thresholds(ctx.thresholds);
        Self {
            camera,
            ctx,
            debouncer,
        }
    }

    pub fn camera(&self) -> &CameraInfo {
        &self.camera
    }

    /// Run until `stop` flips to true or its sender is dropped.
    ///
    /// Cycles are awaited in turn, so two cycles of the same camera never
    /// overlap; ticks missed while a slow cycle runs are skipped, not queued.
    /// A stop request abandons the cycle in flight.
    pub async fn run(mut self, mut stop: watch::Receiver<bool>) {
        info!(
            camera_id = %self.camera.id,
            interval_ms = self.ctx.interval.as_millis() as u64,
            "Starting camera detection loop"
        );

        let mut ticker = interval(self.ctx.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = stop.wait_for(|stopped| *stopped) => break,
                _ = ticker.tick() => {}
            }

            let start = Instant::now();
            let stopped = tokio::select! {
                biased;
                _ = stop.wait_for(|stopped| *stopped) => true,
                _ = self.run_cycle() => false,
            };
            if stopped {
                break;
            }

            let missed = start.elapsed().as_millis() / self.ctx.interval.as_millis().max(1);
            if missed > 0 {
                self.ctx.metrics.inc_skipped_cycles(missed as u64);
                debug!(
                    camera_id = %self.camera.id,
                    missed = missed as u64,
                    "Detection cycle overran its interval, skipping ticks"
                );
            }
        }

        info!(camera_id = %self.camera.id, "Camera detection loop stopped");
    }

    /// Run one detection cycle
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        if !self.ctx.detection_enabled.load(Ordering::SeqCst) {
            return CycleOutcome::Disabled;
        }

        let frame = match self.ctx.frames.capture(&self.camera).await {
            Ok(Some(frame)) => frame,
            Ok(None) => return CycleOutcome::NotReady,
            Err(e) => return self.fail(&e).await,
        };

        let start = Instant::now();
        let raw = match self.ctx.detector.detect(&frame).await {
            Ok(raw) => raw,
            Err(e) => return self.fail(&e).await,
        };
        self.ctx
            .metrics
            .observe_detection_latency(start.elapsed().as_secs_f64());
        self.ctx.health.report_detection(&self.camera.id, true).await;

        let validated = self.ctx.builder.build(&self.camera.id, frame.height, &raw);
        if validated.malformed > 0 {
            self.ctx
                .metrics
                .inc_malformed_detections(validated.malformed as u64);
        }

        let alerts = self.record(validated.summary, validated.detections);
        CycleOutcome::Completed { alerts }
    }

    /// A failed cycle counts as a frame with no detections
    async fn fail(&mut self, error: &DetectionError) -> CycleOutcome {
        self.ctx.logger.log_detection_failure(
            &self.camera.id,
            self.ctx.detector.name(),
            &error.to_string(),
        );
        self.ctx.metrics.inc_detection_errors();
        self.ctx.health.report_detection(&self.camera.id, false).await;

        let alerts = self.record(Summary::default(), Vec::new());
        CycleOutcome::Failed { alerts }
    }

    /// Publish the snapshot, debounce against the previous cycle and hand
    /// the resulting alerts to the sink
    fn record(&mut self, summary: Summary, detections: Vec<ClassifiedDetection>) -> usize {
        self.ctx.snapshots.insert(
            self.camera.id.clone(),
            CameraSnapshot {
                camera_id: self.camera.id.clone(),
                camera_name: self.camera.name.clone(),
                summary: summary.clone(),
                detections,
                updated_at: Utc::now(),
            },
        );

        let alerts = self.debouncer.evaluate(summary);
        let count = alerts.len();
        for alert in alerts {
            self.ctx.sink.publish(alert);
        }
        count
    }
}
