//! Subcommand implementations

pub mod alerts;
pub mod cameras;
pub mod status;
