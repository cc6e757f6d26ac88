//! Camera monitoring: discovery, per-camera detection loops and their supervisor
//!
//! Each active camera gets its own detection loop task. The supervisor is the
//! single coordinator that owns the camera registry, the global toggles and
//! the loop handles.

mod registry;
mod r#loop;
mod supervisor;

#[cfg(test)]
mod tests;

pub use registry::{discover_cameras, CameraRegistry, CameraSource, StaticCameraSource};
pub use r#loop::{CameraLoop, CycleOutcome, LoopContext, DEFAULT_DETECTION_INTERVAL};
pub use supervisor::{
    register_health_components, Supervisor, SupervisorBuilder, SupervisorError, SystemStatus,
};
