//! FarmEye agent: configuration and the HTTP API around the camera supervisor

pub mod api;
pub mod config;
