//! Alert sink: bounded alert log, notifications, audible cue and live fan-out
//!
//! Cameras publish concurrently; appends to the log are serialized by a mutex.

use crate::models::{Alert, AlertCategory};
use crate::observability::{FarmMetrics, StructuredLogger};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;
use tracing::debug;

/// Default number of alerts retained in the log
pub const DEFAULT_ALERT_LOG_CAPACITY: usize = 50;

/// Buffer of the live alert broadcast channel
const BROADCAST_CAPACITY: usize = 256;

/// Consumer of alerts produced by the camera loops
pub trait AlertSink: Send + Sync {
    fn publish(&self, alert: Alert);
}

/// Surfaces a transient, user-visible notification for an alert
pub trait Notifier: Send + Sync {
    fn notify(&self, alert: &Alert);
}

/// Plays an audible cue
pub trait AudibleCue: Send + Sync {
    fn play(&self);
}

/// Notifier that emits a structured log event per alert
pub struct LogNotifier {
    logger: StructuredLogger,
}

impl LogNotifier {
    pub fn new(logger: StructuredLogger) -> Self {
        Self { logger }
    }
}

impl Notifier for LogNotifier {
    fn notify(&self, alert: &Alert) {
        self.logger.log_alert(alert);
    }
}

/// Rings the terminal bell on stderr
#[derive(Debug, Default)]
pub struct TerminalBell;

impl AudibleCue for TerminalBell {
    fn play(&self) {
        let mut stderr = std::io::stderr();
        if let Err(e) = stderr.write_all(b"\x07").and_then(|_| stderr.flush()) {
            debug!(error = %e, "Failed to ring terminal bell");
        }
    }
}

/// Cue that does nothing, for headless deployments
#[derive(Debug, Default)]
pub struct SilentCue;

impl AudibleCue for SilentCue {
    fn play(&self) {}
}

/// Per-category alert counts, as shown on the alert tabs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertCounts {
    pub all: usize,
    pub intruder: usize,
    pub feed: usize,
    pub animal: usize,
}

/// Bounded alert log, newest first, evicting the oldest entry when full
#[derive(Debug, Clone)]
pub struct AlertLog {
    entries: VecDeque<Alert>,
    capacity: usize,
}

impl AlertLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Prepend an alert, returning the evicted oldest entry if the log was full
    pub fn push(&mut self, alert: Alert) -> Option<Alert> {
        self.entries.push_front(alert);
        if self.entries.len() > self.capacity {
            self.entries.pop_back()
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Up to `limit` newest alerts, newest first
    pub fn recent(&self, limit: usize) -> Vec<Alert> {
        self.entries.iter().take(limit).cloned().collect()
    }

    pub fn by_category(&self, category: AlertCategory) -> Vec<Alert> {
        self.entries
            .iter()
            .filter(|a| a.category == category)
            .cloned()
            .collect()
    }

    pub fn latest(&self) -> Option<&Alert> {
        self.entries.front()
    }

    pub fn counts(&self) -> AlertCounts {
        let mut counts = AlertCounts {
            all: self.entries.len(),
            ..Default::default()
        };
        for alert in &self.entries {
            match alert.category {
                AlertCategory::Intruder => counts.intruder += 1,
                AlertCategory::Feed => counts.feed += 1,
                AlertCategory::Animal => counts.animal += 1,
            }
        }
        counts
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Shared alert sink owned by the supervisor
pub struct AlertHub {
    log: Mutex<AlertLog>,
    sound_enabled: AtomicBool,
    notifier: Arc<dyn Notifier>,
    cue: Arc<dyn AudibleCue>,
    live: broadcast::Sender<Alert>,
    metrics: Option<FarmMetrics>,
}

impl AlertHub {
    pub fn new(capacity: usize, notifier: Arc<dyn Notifier>, cue: Arc<dyn AudibleCue>) -> Self {
        let (live, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            log: Mutex::new(AlertLog::new(capacity)),
            sound_enabled: AtomicBool::new(true),
            notifier,
            cue,
            live,
            metrics: None,
        }
    }

    /// Record published alerts in Prometheus
    pub fn with_metrics(mut self, metrics: FarmMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn with_sound(self, enabled: bool) -> Self {
        self.set_sound_enabled(enabled);
        self
    }

    pub fn set_sound_enabled(&self, enabled: bool) {
        self.sound_enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn sound_enabled(&self) -> bool {
        self.sound_enabled.load(Ordering::SeqCst)
    }

    /// Receive every alert published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<Alert> {
        self.live.subscribe()
    }

    pub fn recent(&self, limit: usize) -> Vec<Alert> {
        self.lock().recent(limit)
    }

    pub fn by_category(&self, category: AlertCategory) -> Vec<Alert> {
        self.lock().by_category(category)
    }

    pub fn counts(&self) -> AlertCounts {
        self.lock().counts()
    }

    pub fn last_alert_at(&self) -> Option<DateTime<Utc>> {
        self.lock().latest().map(|a| a.timestamp)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, AlertLog> {
        // A panic while holding the lock cannot leave the deque half-updated
        self.log.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl AlertSink for AlertHub {
    fn publish(&self, alert: Alert) {
        if let Some(evicted) = self.lock().push(alert.clone()) {
            debug!(alert_id = %evicted.id, "Evicted oldest alert from log");
        }

        if let Some(metrics) = &self.metrics {
            metrics.inc_alert(alert.category, alert.severity);
        }

        self.notifier.notify(&alert);

        if self.sound_enabled() {
            self.cue.play();
        }

        // No subscribers is fine
        let _ = self.live.send(alert);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AlertSeverity;
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct CountingCue(AtomicUsize);

    impl AudibleCue for CountingCue {
        fn play(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    struct RecordingNotifier(Mutex<Vec<String>>);

    impl Notifier for RecordingNotifier {
        fn notify(&self, alert: &Alert) {
            self.0.lock().unwrap().push(alert.id.clone());
        }
    }

    fn alert(id: usize, category: AlertCategory) -> Alert {
        Alert {
            id: format!("alert-{}", id),
            timestamp: Utc::now(),
            severity: AlertSeverity::Warning,
            category,
            title: "Test".to_string(),
            message: format!("message {}", id),
            camera_id: "cam1".to_string(),
        }
    }

    fn hub(capacity: usize) -> (AlertHub, Arc<CountingCue>, Arc<RecordingNotifier>) {
        let cue = Arc::new(CountingCue::default());
        let notifier = Arc::new(RecordingNotifier::default());
        (
            AlertHub::new(capacity, notifier.clone(), cue.clone()),
            cue,
            notifier,
        )
    }

    #[test]
    fn test_log_is_bounded_and_evicts_oldest() {
        let mut log = AlertLog::new(DEFAULT_ALERT_LOG_CAPACITY);
        for i in 0..50 {
            assert!(log.push(alert(i, AlertCategory::Feed)).is_none());
        }
        assert_eq!(log.len(), 50);

        let evicted = log.push(alert(50, AlertCategory::Feed)).unwrap();
        assert_eq!(evicted.id, "alert-0");
        assert_eq!(log.len(), 50);
        assert_eq!(log.latest().unwrap().id, "alert-50");
        assert_eq!(log.recent(usize::MAX).last().unwrap().id, "alert-1");
    }

    #[test]
    fn test_log_never_exceeds_capacity() {
        let mut log = AlertLog::new(DEFAULT_ALERT_LOG_CAPACITY);
        for i in 0..500 {
            log.push(alert(i, AlertCategory::Animal));
            assert!(log.len() <= 50);
        }
    }

    #[test]
    fn test_log_queries() {
        let mut log = AlertLog::new(10);
        log.push(alert(1, AlertCategory::Intruder));
        log.push(alert(2, AlertCategory::Feed));
        log.push(alert(3, AlertCategory::Intruder));

        let recent = log.recent(2);
        assert_eq!(recent[0].id, "alert-3");
        assert_eq!(recent[1].id, "alert-2");
        assert_eq!(log.by_category(AlertCategory::Intruder).len(), 2);
        assert_eq!(
            log.counts(),
            AlertCounts {
                all: 3,
                intruder: 2,
                feed: 1,
                animal: 0
            }
        );
        log.clear();
        assert!(log.is_empty());
    }

    #[test]
    fn test_zero_capacity_keeps_one() {
        let mut log = AlertLog::new(0);
        log.push(alert(1, AlertCategory::Feed));
        assert_eq!(log.capacity(), 1);
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_publish_notifies_and_plays_cue() {
        let (hub, cue, notifier) = hub(50);
        hub.publish(alert(1, AlertCategory::Intruder));

        assert_eq!(hub.len(), 1);
        assert_eq!(cue.0.load(Ordering::SeqCst), 1);
        assert_eq!(*notifier.0.lock().unwrap(), vec!["alert-1".to_string()]);
        assert!(hub.last_alert_at().is_some());
    }

    #[test]
    fn test_publish_respects_sound_flag() {
        let (hub, cue, _) = hub(50);
        hub.set_sound_enabled(false);
        hub.publish(alert(1, AlertCategory::Feed));
        assert_eq!(cue.0.load(Ordering::SeqCst), 0);

        hub.set_sound_enabled(true);
        hub.publish(alert(2, AlertCategory::Feed));
        assert_eq!(cue.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_subscribers_receive_alerts() {
        let (hub, _, _) = hub(50);
        let mut rx = hub.subscribe();
        hub.publish(alert(7, AlertCategory::Animal));

        let received = rx.recv().await.unwrap();
        assert_eq!(received.id, "alert-7");
    }

    #[test]
    fn test_concurrent_publish_is_serialized() {
        let (hub, _, _) = hub(50);
        let hub = Arc::new(hub);

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let hub = hub.clone();
                std::thread::spawn(move || {
                    for i in 0..25 {
                        hub.publish(alert(t * 100 + i, AlertCategory::Feed));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(hub.len(), 50);
        assert_eq!(hub.counts().all, 50);
    }
}
