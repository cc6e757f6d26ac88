//! Component health behind `/healthz` and `/readyz`
//!
//! Two components are tracked: the camera loop tasks and the detector. The
//! detector's state is derived from the set of cameras whose last cycle failed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Health of a component, ordered from best to worst
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    /// Still serving, but some cameras are not being analysed
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub checked_at: DateTime<Utc>,
}

impl ComponentHealth {
    fn new(status: ComponentStatus, message: Option<String>) -> Self {
        Self {
            status,
            message,
            checked_at: Utc::now(),
        }
    }
}

/// Body of `/healthz`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    /// Worst status over all components
    pub status: ComponentStatus,
    pub components: BTreeMap<String, ComponentHealth>,
    /// Cameras whose last detection cycle failed, sorted
    pub failing_cameras: Vec<String>,
}

/// Body of `/readyz`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Readiness {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Component names
pub mod components {
    pub const CAMERA_LOOPS: &str = "camera_loops";
    pub const DETECTOR: &str = "detector";
}

#[derive(Debug, Default)]
struct HealthState {
    components: BTreeMap<String, ComponentHealth>,
    failing_cameras: BTreeSet<String>,
    ready: bool,
}

impl HealthState {
    fn worst(&self) -> ComponentStatus {
        self.components
            .values()
            .map(|c| c.status)
            .max()
            .unwrap_or(ComponentStatus::Healthy)
    }

    fn refresh_detector(&mut self) {
        let health = if self.failing_cameras.is_empty() {
            ComponentHealth::new(ComponentStatus::Healthy, None)
        } else {
            let ids: Vec<&str> = self.failing_cameras.iter().map(String::as_str).collect();
            ComponentHealth::new(
                ComponentStatus::Degraded,
                Some(format!("Detection failing for cameras: {}", ids.join(", "))),
            )
        };
        self.components
            .insert(components::DETECTOR.to_string(), health);
    }
}

/// Shared health state; clones observe the same components
#[derive(Debug, Clone, Default)]
pub struct HealthRegistry {
    state: Arc<RwLock<HealthState>>,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a component as healthy
    pub async fn register(&self, name: &str) {
        self.set(name, ComponentStatus::Healthy, None).await;
    }

    pub async fn set_degraded(&self, name: &str, message: impl Into<String>) {
        self.set(name, ComponentStatus::Degraded, Some(message.into()))
            .await;
    }

    pub async fn set_unhealthy(&self, name: &str, message: impl Into<String>) {
        self.set(name, ComponentStatus::Unhealthy, Some(message.into()))
            .await;
    }

    async fn set(&self, name: &str, status: ComponentStatus, message: Option<String>) {
        self.state
            .write()
            .await
            .components
            .insert(name.to_string(), ComponentHealth::new(status, message));
    }

    /// Record the outcome of one camera's detection cycle.
    ///
    /// The detector is degraded while any camera's last cycle failed and
    /// healthy again once every camera recovers.
    pub async fn report_detection(&self, camera_id: &str, succeeded: bool) {
        let mut state = self.state.write().await;
        let changed = if succeeded {
            state.failing_cameras.remove(camera_id)
        } else {
            state.failing_cameras.insert(camera_id.to_string())
        };
        if changed {
            state.refresh_detector();
        }
    }

    /// Stop tracking a camera whose loop was stopped
    pub async fn forget_camera(&self, camera_id: &str) {
        self.report_detection(camera_id, true).await;
    }

    /// Mark the initial camera discovery as done
    pub async fn set_ready(&self, ready: bool) {
        self.state.write().await.ready = ready;
    }

    pub async fn health(&self) -> HealthReport {
        let state = self.state.read().await;
        HealthReport {
            status: state.worst(),
            components: state.components.clone(),
            failing_cameras: state.failing_cameras.iter().cloned().collect(),
        }
    }

    /// Ready once cameras were discovered and no component is unhealthy
    pub async fn readiness(&self) -> Readiness {
        let state = self.state.read().await;
        let reason = if !state.ready {
            Some("Cameras not discovered yet".to_string())
        } else if state.worst() == ComponentStatus::Unhealthy {
            let names: Vec<&str> = state
                .components
                .iter()
                .filter(|(_, c)| c.status == ComponentStatus::Unhealthy)
                .map(|(name, _)| name.as_str())
                .collect();
            Some(format!("Unhealthy components: {}", names.join(", ")))
        } else {
            None
        };

        Readiness {
            ready: reason.is_none(),
            reason,
        }
    }
}
