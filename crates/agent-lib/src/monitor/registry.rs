//! Camera discovery and the registry of known cameras

use crate::models::CameraInfo;
use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use tracing::{debug, info, warn};

/// Enumerates the video sources available to the agent
#[async_trait]
pub trait CameraSource: Send + Sync {
    async fn enumerate(&self) -> Result<Vec<CameraInfo>>;
}

/// Camera list fixed at startup, typically from configuration
#[derive(Debug, Clone, Default)]
pub struct StaticCameraSource {
    cameras: Vec<CameraInfo>,
}

impl StaticCameraSource {
    pub fn new(cameras: Vec<CameraInfo>) -> Self {
        Self { cameras }
    }
}

#[async_trait]
impl CameraSource for StaticCameraSource {
    async fn enumerate(&self) -> Result<Vec<CameraInfo>> {
        Ok(self.cameras.clone())
    }
}

/// Registry of cameras known to the agent
#[derive(Debug, Default)]
pub struct CameraRegistry {
    cameras: DashMap<String, CameraInfo>,
}

impl CameraRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add cameras not yet known; existing entries keep their state.
    /// Returns the number of newly added cameras.
    pub fn merge(&self, cameras: Vec<CameraInfo>) -> usize {
        let mut added = 0;
        for camera in cameras {
            if self.cameras.contains_key(&camera.id) {
                continue;
            }
            debug!(camera_id = %camera.id, name = %camera.name, "Registering camera");
            self.cameras.insert(camera.id.clone(), camera);
            added += 1;
        }
        added
    }

    pub fn get(&self, camera_id: &str) -> Option<CameraInfo> {
        self.cameras.get(camera_id).map(|r| r.clone())
    }

    /// All cameras ordered by id
    pub fn list(&self) -> Vec<CameraInfo> {
        let mut cameras: Vec<CameraInfo> = self.cameras.iter().map(|r| r.value().clone()).collect();
        cameras.sort_by(|a, b| a.id.cmp(&b.id));
        cameras
    }

    pub fn active(&self) -> Vec<CameraInfo> {
        self.list().into_iter().filter(|c| c.active).collect()
    }

    /// Set the active flag, returning the updated camera
    pub fn set_active(&self, camera_id: &str, active: bool) -> Option<CameraInfo> {
        let mut entry = self.cameras.get_mut(camera_id)?;
        entry.active = active;
        Some(entry.clone())
    }

    /// Flip the active flag, returning the updated camera
    pub fn toggle(&self, camera_id: &str) -> Option<CameraInfo> {
        let mut entry = self.cameras.get_mut(camera_id)?;
        entry.active = !entry.active;
        Some(entry.clone())
    }

    pub fn len(&self) -> usize {
        self.cameras.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cameras.is_empty()
    }
}

/// Enumerate cameras and merge them into the registry.
///
/// An enumeration failure is logged and treated as an empty camera list.
pub async fn discover_cameras(source: &dyn CameraSource, registry: &CameraRegistry) -> usize {
    let cameras = match source.enumerate().await {
        Ok(cameras) => cameras,
        Err(e) => {
            warn!(error = %e, "Failed to enumerate cameras");
            Vec::new()
        }
    };

    let found = cameras.len();
    let added = registry.merge(cameras);
    info!(found, added, total = registry.len(), "Camera discovery complete");
    added
}
