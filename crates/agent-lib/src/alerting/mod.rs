//! Alert generation and delivery
//!
//! This module provides:
//! - The per-camera debouncer that turns Summary transitions into alerts
//! - The shared alert sink with a bounded log, notifications and sound cue

mod debouncer;
mod sink;

pub use debouncer::{AlertDebouncer, DebounceThresholds};
pub use sink::{
    AlertCounts, AlertHub, AlertLog, AlertSink, AudibleCue, LogNotifier, Notifier, SilentCue,
    TerminalBell, DEFAULT_ALERT_LOG_CAPACITY,
};
