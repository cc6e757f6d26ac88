//! FarmEye Agent - on-farm camera monitoring
//!
//! Runs one detection loop per active camera, debounces the results into
//! alerts and serves them to the dashboard over HTTP.

use anyhow::{Context, Result};
use farmeye_agent::{api, config};
use farmeye_lib::{
    alerting::{AlertHub, LogNotifier},
    detection::{ObjectDetector, ReplayDetector, SummaryBuilder, SyntheticFrameSource},
    health::HealthRegistry,
    monitor::{register_health_components, StaticCameraSource},
    observability::{FarmMetrics, StructuredLogger},
    Supervisor,
};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const AGENT_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting farmeye-agent");

    let config = config::AgentConfig::load()?;
    info!(
        node_name = %config.node_name,
        cameras = config.cameras.len(),
        interval_ms = config.detection_interval_ms,
        "Agent configured"
    );

    let health_registry = HealthRegistry::new();
    register_health_components(&health_registry).await;

    let metrics = FarmMetrics::new();
    let logger = StructuredLogger::new(&config.node_name);

    let detector = match &config.replay_path {
        Some(path) => ReplayDetector::from_file(path)
            .with_context(|| format!("Failed to load replay script {}", path.display()))?,
        None => ReplayDetector::new(),
    };

    let alerts = Arc::new(
        AlertHub::new(
            config.alert_log_capacity,
            Arc::new(LogNotifier::new(logger.clone())),
            config.cue.build(),
        )
        .with_metrics(metrics.clone())
        .with_sound(config.sound_enabled),
    );

    let builder =
        SummaryBuilder::new(config.classification.clone()).with_min_confidence(config.min_confidence);

    let detector_name = detector.name().to_string();
    let supervisor = Arc::new(
        Supervisor::builder()
            .detector(Arc::new(detector))
            .frames(Arc::new(SyntheticFrameSource::new(
                config.frame_width,
                config.frame_height,
            )))
            .alerts(alerts)
            .summary_builder(builder)
            .thresholds(config.thresholds())
            .interval(config.detection_interval())
            .detection_enabled(config.detection_enabled)
            .health(health_registry.clone())
            .metrics(metrics.clone())
            .logger(logger.clone())
            .build()
            .context("Failed to build camera supervisor")?,
    );

    let cameras = StaticCameraSource::new(config.camera_infos());
    let discovered = supervisor.discover(&cameras).await;
    logger.log_startup(AGENT_VERSION, &detector_name, discovered);

    let app_state = Arc::new(api::AppState::new(supervisor.clone(), metrics));

    // Mark agent as ready after initialization
    health_registry.set_ready(true).await;

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let mut api_handle = tokio::spawn(api::serve(config.api_port, app_state, async {
        let _ = shutdown_rx.await;
    }));

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for shutdown signal")?;
            logger.log_shutdown("SIGINT received");
        }
        joined = &mut api_handle => {
            // The server only returns on its own when binding or serving failed
            let result = joined.context("API server task panicked").and_then(|r| r);
            if let Err(e) = &result {
                error!(error = %e, "API server stopped");
            }
            logger.log_shutdown("API server stopped");
            supervisor.shutdown().await;
            return result;
        }
    }

    health_registry.set_ready(false).await;
    let _ = shutdown_tx.send(());
    supervisor.shutdown().await;
    match api_handle.await {
        Ok(Err(e)) => error!(error = %e, "API server failed during shutdown"),
        Err(e) => error!(error = %e, "API server task panicked"),
        Ok(Ok(())) => {}
    }
    info!("Shutdown complete");

    Ok(())
}
