//! Supervisor tests
//!
//! These drive whole camera loops on a paused tokio clock with scripted
//! detectors, covering start/stop, cancellation and failure isolation.

#[cfg(test)]
mod supervisor_tests {
    use crate::alerting::{AlertHub, AudibleCue, LogNotifier};
    use crate::detection::{async_trait, DetectionError, ObjectDetector, ReplayDetector, SyntheticFrameSource};
    use crate::health::{components, ComponentStatus, HealthRegistry};
    use crate::models::{AlertCategory, CameraInfo, CameraKind, Frame, RawDetection};
    use crate::monitor::{CameraSource, StaticCameraSource, Supervisor, SupervisorError};
    use crate::observability::StructuredLogger;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    fn camera(id: &str, active: bool) -> CameraInfo {
        CameraInfo {
            id: id.to_string(),
            name: format!("Camera {}", id),
            active,
            kind: CameraKind::Ip,
        }
    }

    #[derive(Default)]
    struct CountingCue(AtomicUsize);

    impl AudibleCue for CountingCue {
        fn play(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Records detector calls per camera; cameras in `failing` always error
    #[derive(Default)]
    struct RecordingDetector {
        calls: Mutex<HashMap<String, usize>>,
        failing: Vec<String>,
        detections: Vec<RawDetection>,
    }

    impl RecordingDetector {
        fn calls(&self, camera_id: &str) -> usize {
            self.calls.lock().unwrap().get(camera_id).copied().unwrap_or(0)
        }
    }

    #[async_trait]
    impl ObjectDetector for RecordingDetector {
        fn name(&self) -> &str {
            "recording"
        }

        async fn detect(&self, frame: &Frame) -> Result<Vec<RawDetection>, DetectionError> {
            *self
                .calls
                .lock()
                .unwrap()
                .entry(frame.camera_id.clone())
                .or_insert(0) += 1;
            if self.failing.contains(&frame.camera_id) {
                return Err(DetectionError::Backend("inference crashed".to_string()));
            }
            Ok(self.detections.clone())
        }
    }

    struct FailingSource;

    #[async_trait]
    impl CameraSource for FailingSource {
        async fn enumerate(&self) -> anyhow::Result<Vec<CameraInfo>> {
            anyhow::bail!("permission denied")
        }
    }

    fn supervisor(detector: Arc<dyn ObjectDetector>, cue: Arc<CountingCue>) -> Supervisor {
        let alerts = Arc::new(AlertHub::new(
            50,
            Arc::new(LogNotifier::new(StructuredLogger::new("test"))),
            cue,
        ));
        Supervisor::builder()
            .detector(detector)
            .frames(Arc::new(SyntheticFrameSource::new(640, 480)))
            .alerts(alerts)
            .interval(Duration::from_millis(500))
            .build()
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_discover_starts_active_cameras_only() {
        let detector = Arc::new(RecordingDetector::default());
        let sup = supervisor(detector.clone(), Arc::default());
        let source = StaticCameraSource::new(vec![camera("a", true), camera("b", false)]);

        assert_eq!(sup.discover(&source).await, 2);
        assert_eq!(sup.running_cameras().await, vec!["a".to_string()]);

        tokio::time::sleep(Duration::from_millis(1_100)).await;
        assert_eq!(detector.calls("a"), 3);
        assert_eq!(detector.calls("b"), 0);

        let status = sup.status().await;
        assert_eq!(status.active_cameras, 1);
        assert_eq!(status.total_cameras, 2);
        assert_eq!(status.running_loops, 1);
        assert!(status.detection_enabled);

        sup.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_rediscovery_keeps_toggled_state() {
        let sup = supervisor(Arc::new(RecordingDetector::default()), Arc::default());
        let source = StaticCameraSource::new(vec![camera("a", true)]);

        sup.discover(&source).await;
        sup.toggle_camera("a").await.unwrap();
        assert_eq!(sup.discover(&source).await, 0);
        assert!(!sup.registry().get("a").unwrap().active);
        assert!(sup.running_cameras().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_enumeration_failure_yields_empty_list() {
        let sup = supervisor(Arc::new(RecordingDetector::default()), Arc::default());
        assert_eq!(sup.discover(&FailingSource).await, 0);
        assert!(sup.cameras().is_empty());
        assert!(sup.running_cameras().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabling_detection_stops_all_loops() {
        let detector = Arc::new(RecordingDetector::default());
        let sup = supervisor(detector.clone(), Arc::default());
        sup.discover(&StaticCameraSource::new(vec![camera("a", true), camera("b", true)]))
            .await;

        tokio::time::sleep(Duration::from_millis(600)).await;
        sup.set_detection_enabled(false).await;
        assert!(sup.running_cameras().await.is_empty());

        let (a, b) = (detector.calls("a"), detector.calls("b"));
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(detector.calls("a"), a);
        assert_eq!(detector.calls("b"), b);

        // Toggling a camera while disabled does not start it
        sup.toggle_camera("a").await.unwrap();
        sup.toggle_camera("a").await.unwrap();
        assert!(sup.running_cameras().await.is_empty());

        sup.set_detection_enabled(true).await;
        assert_eq!(sup.running_cameras().await, vec!["a".to_string(), "b".to_string()]);
        sup.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_deactivating_camera_stops_only_its_loop() {
        let detector = Arc::new(RecordingDetector::default());
        let sup = supervisor(detector.clone(), Arc::default());
        sup.discover(&StaticCameraSource::new(vec![camera("a", true), camera("b", true)]))
            .await;
        tokio::time::sleep(Duration::from_millis(100)).await;

        let updated = sup.set_camera_active("a", false).await.unwrap();
        assert!(!updated.active);
        assert!(sup.snapshot("a").is_none());

        let a = detector.calls("a");
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(detector.calls("a"), a);
        assert!(detector.calls("b") > 3);

        sup.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_camera_toggle() {
        let sup = supervisor(Arc::new(RecordingDetector::default()), Arc::default());
        let err = sup.toggle_camera("nope").await.unwrap_err();
        assert!(matches!(err, SupervisorError::UnknownCamera(id) if id == "nope"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_camera_does_not_affect_others() {
        let detector = Arc::new(RecordingDetector {
            failing: vec!["bad".to_string()],
            detections: vec![RawDetection::new("person", 0.9, 0.0, 0.0, 10.0, 10.0)],
            ..Default::default()
        });
        let health = HealthRegistry::new();
        health.register(components::DETECTOR).await;
        let alerts = Arc::new(AlertHub::new(
            50,
            Arc::new(LogNotifier::new(StructuredLogger::new("test"))),
            Arc::new(CountingCue::default()),
        ));
        let sup = Supervisor::builder()
            .detector(detector.clone())
            .frames(Arc::new(SyntheticFrameSource::new(640, 480)))
            .alerts(alerts.clone())
            .health(health.clone())
            .build()
            .unwrap();

        sup.discover(&StaticCameraSource::new(vec![camera("bad", true), camera("good", true)]))
            .await;
        tokio::time::sleep(Duration::from_millis(1_600)).await;

        assert!(detector.calls("bad") >= 3);
        assert!(detector.calls("good") >= 3);
        // Intruder seen once on the healthy camera; the count never changes afterwards
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts.recent(1)[0].camera_id, "good");
        assert_eq!(health.health().await.status, ComponentStatus::Degraded);
        assert_eq!(sup.snapshot("good").unwrap().summary.intruder_count, 1);
        // Failed cycles publish an empty view
        assert_eq!(sup.snapshot("bad").unwrap().summary.intruder_count, 0);

        // Stopping the failing camera clears its degraded mark
        sup.toggle_camera("bad").await.unwrap();
        assert_eq!(health.health().await.status, ComponentStatus::Healthy);
        sup.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_restarted_camera_gets_fresh_debouncer() {
        let detector = Arc::new(ReplayDetector::new().with_script(
            "a",
            vec![Some(vec![RawDetection::new("person", 0.9, 0.0, 0.0, 10.0, 10.0)])],
        ));
        let sup = supervisor(detector, Arc::default());
        sup.discover(&StaticCameraSource::new(vec![camera("a", true)])).await;
        tokio::time::sleep(Duration::from_millis(1_100)).await;
        assert_eq!(sup.alerts().len(), 1);

        sup.toggle_camera("a").await.unwrap();
        sup.toggle_camera("a").await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        let intruder_alerts = sup.alerts().by_category(AlertCategory::Intruder);
        assert_eq!(intruder_alerts.len(), 2);
        sup.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_sound_toggle_controls_cue() {
        let cue = Arc::new(CountingCue::default());
        let detector = Arc::new(ReplayDetector::new().with_script(
            "a",
            vec![
                Some(vec![RawDetection::new("person", 0.9, 0.0, 0.0, 10.0, 10.0)]),
                Some(vec![]),
            ],
        ));
        let sup = supervisor(detector, cue.clone());
        sup.set_sound_enabled(false);
        sup.discover(&StaticCameraSource::new(vec![camera("a", true)])).await;

        // Alternating 1 / 0 intruders fires on every other cycle
        tokio::time::sleep(Duration::from_millis(2_100)).await;
        assert!(sup.alerts().len() >= 2);
        assert_eq!(cue.0.load(Ordering::SeqCst), 0);
        assert!(!sup.status().await.sound_enabled);

        sup.set_sound_enabled(true);
        tokio::time::sleep(Duration::from_millis(1_000)).await;
        assert!(cue.0.load(Ordering::SeqCst) >= 1);
        sup.shutdown().await;
    }

    /// Detector that hangs far longer than any test waits
    struct StuckDetector(AtomicUsize);

    #[async_trait]
    impl ObjectDetector for StuckDetector {
        fn name(&self) -> &str {
            "stuck"
        }

        async fn detect(&self, _frame: &Frame) -> Result<Vec<RawDetection>, DetectionError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(vec![])
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stopping_slow_camera_keeps_supervisor_responsive() {
        let detector = Arc::new(StuckDetector(AtomicUsize::new(0)));
        let sup = Arc::new(supervisor(detector.clone(), Arc::default()));
        sup.discover(&StaticCameraSource::new(vec![camera("a", true), camera("b", true)]))
            .await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(detector.0.load(Ordering::SeqCst), 2);

        let toggling = {
            let sup = sup.clone();
            tokio::spawn(async move { sup.toggle_camera("a").await })
        };
        tokio::task::yield_now().await;

        let status = tokio::time::timeout(Duration::from_secs(1), sup.status())
            .await
            .expect("status should not wait for the stopping camera");
        assert_eq!(status.total_cameras, 2);

        let toggled = tokio::time::timeout(Duration::from_secs(1), toggling)
            .await
            .expect("stopping a camera should not wait for its detector")
            .unwrap()
            .unwrap();
        assert!(!toggled.active);
        assert_eq!(sup.running_cameras().await, vec!["b".to_string()]);

        tokio::time::timeout(Duration::from_secs(1), sup.shutdown())
            .await
            .expect("shutdown should not wait for the detector");
    }

    #[test]
    fn test_builder_requires_collaborators() {
        assert!(Supervisor::builder().build().is_err());
        assert!(Supervisor::builder()
            .detector(Arc::new(ReplayDetector::new()))
            .frames(Arc::new(SyntheticFrameSource::new(1, 1)))
            .build()
            .is_err());
    }
}
