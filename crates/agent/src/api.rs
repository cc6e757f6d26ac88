//! HTTP API: dashboard endpoints, health checks and Prometheus metrics

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post, put},
    Json, Router,
};
use farmeye_lib::{
    alerting::AlertCounts,
    health::{ComponentStatus, HealthRegistry},
    models::{Alert, AlertCategory},
    observability::FarmMetrics,
    Supervisor, SupervisorError,
};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_stream::{wrappers::BroadcastStream, Stream, StreamExt};
use tracing::{info, warn};

/// Alerts returned when the request gives no limit
const DEFAULT_ALERT_LIMIT: usize = 50;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub supervisor: Arc<Supervisor>,
    pub health_registry: HealthRegistry,
    pub metrics: FarmMetrics,
}

impl AppState {
    pub fn new(supervisor: Arc<Supervisor>, metrics: FarmMetrics) -> Self {
        Self {
            health_registry: supervisor.health().clone(),
            supervisor,
            metrics,
        }
    }
}

/// Error body returned by every failing endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(ErrorBody { error })).into_response()
    }
}

impl From<SupervisorError> for ApiError {
    fn from(err: SupervisorError) -> Self {
        match err {
            SupervisorError::UnknownCamera(_) => ApiError::NotFound(err.to_string()),
        }
    }
}

/// Health check response - returns 200 if healthy, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK, // Still operational
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Result<impl IntoResponse, ApiError> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| ApiError::Internal(format!("Failed to encode metrics: {}", e)))?;

    Ok((
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    ))
}

#[derive(Debug, Deserialize)]
pub struct AlertQuery {
    pub category: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AlertsResponse {
    pub alerts: Vec<Alert>,
    pub counts: AlertCounts,
}

/// Alert log, newest first, optionally filtered to one category tab
async fn list_alerts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AlertQuery>,
) -> Result<Json<AlertsResponse>, ApiError> {
    let hub = state.supervisor.alerts();
    let limit = query.limit.unwrap_or(DEFAULT_ALERT_LIMIT);

    let alerts = match query.category.as_deref() {
        None | Some("all") => hub.recent(limit),
        Some(raw) => {
            let category: AlertCategory = raw.parse().map_err(ApiError::BadRequest)?;
            hub.by_category(category).into_iter().take(limit).collect()
        }
    };

    Ok(Json(AlertsResponse {
        alerts,
        counts: hub.counts(),
    }))
}

async fn clear_alerts(State(state): State<Arc<AppState>>) -> StatusCode {
    state.supervisor.alerts().clear();
    info!("Alert log cleared");
    StatusCode::NO_CONTENT
}

/// Live alerts as server-sent events
async fn stream_alerts(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let stream = BroadcastStream::new(state.supervisor.alerts().subscribe()).filter_map(|msg| {
        match msg {
            Ok(alert) => Some(Event::default().event("alert").json_data(alert)),
            Err(e) => {
                warn!(error = %e, "Alert stream subscriber lagged");
                None
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

async fn list_cameras(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.supervisor.cameras())
}

async fn toggle_camera(
    State(state): State<Arc<AppState>>,
    Path(camera_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let camera = state.supervisor.toggle_camera(&camera_id).await?;
    Ok(Json(camera))
}

async fn camera_snapshot(
    State(state): State<Arc<AppState>>,
    Path(camera_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if state.supervisor.registry().get(&camera_id).is_none() {
        return Err(SupervisorError::UnknownCamera(camera_id).into());
    }
    state
        .supervisor
        .snapshot(&camera_id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("no detections yet for camera {}", camera_id)))
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SettingsUpdate {
    pub detection_enabled: Option<bool>,
    pub sound_enabled: Option<bool>,
}

async fn update_settings(
    State(state): State<Arc<AppState>>,
    Json(update): Json<SettingsUpdate>,
) -> impl IntoResponse {
    if let Some(enabled) = update.sound_enabled {
        state.supervisor.set_sound_enabled(enabled);
    }
    if let Some(enabled) = update.detection_enabled {
        state.supervisor.set_detection_enabled(enabled).await;
    }
    Json(state.supervisor.status().await)
}

async fn status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.supervisor.status().await)
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/api/v1/alerts", get(list_alerts).delete(clear_alerts))
        .route("/api/v1/alerts/stream", get(stream_alerts))
        .route("/api/v1/cameras", get(list_cameras))
        .route("/api/v1/cameras/:id/toggle", post(toggle_camera))
        .route("/api/v1/cameras/:id/snapshot", get(camera_snapshot))
        .route("/api/v1/settings", put(update_settings))
        .route("/api/v1/status", get(status))
        .with_state(state)
}

/// Start the API server, returning once `shutdown` resolves
pub async fn serve(
    port: u16,
    state: Arc<AppState>,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
