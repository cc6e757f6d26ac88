//! Agent library for on-farm camera monitoring
//!
//! This crate provides the core functionality for:
//! - Classifying detector output into intruders, animals and feed containers
//! - Per-camera detection loops with debounced alerting
//! - A bounded alert log with notification and audible cue hooks
//! - Health checks and observability

pub mod alerting;
pub mod detection;
pub mod health;
pub mod models;
pub mod monitor;
pub mod observability;

pub use health::{ComponentHealth, ComponentStatus, HealthRegistry, HealthReport, Readiness};
pub use models::*;
pub use monitor::{Supervisor, SupervisorBuilder, SupervisorError, SystemStatus};
pub use observability::{FarmMetrics, StructuredLogger};
