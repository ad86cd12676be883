use crate::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde::Serialize;
use serde_json::json;
use std::time::Instant;
use utoipa::ToSchema;

/// Component health status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Up,
    Down,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ChannelStatus {
    pub line: bool,
    pub email: bool,
    pub sms: bool,
}

/// Full status response
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StatusResponse {
    pub status: ComponentStatus,
    pub service: String,
    pub version: String,
    pub environment: String,
    pub timestamp: String,
    pub uptime_secs: u64,
    pub database: ComponentHealth,
    pub notification_channels: ChannelStatus,
    pub maintenance_enabled: bool,
}

/// Tracks application start time for uptime calculation
static START_TIME: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Call once on startup.
pub fn init_start_time() {
    let _ = START_TIME.get_or_init(Instant::now);
}

fn get_uptime_secs() -> u64 {
    START_TIME.get().map(|t| t.elapsed().as_secs()).unwrap_or(0)
}

async fn check_database(state: &AppState) -> ComponentHealth {
    let started = Instant::now();
    let result = crate::db::check_connection(&state.db).await;
    let latency_ms = Some(started.elapsed().as_millis() as u64);

    match result {
        Ok(()) => ComponentHealth {
            status: ComponentStatus::Up,
            message: "Connection successful".to_string(),
            latency_ms,
        },
        Err(e) => ComponentHealth {
            status: ComponentStatus::Down,
            message: format!("Connection failed: {}", e),
            latency_ms,
        },
    }
}

/// `/health` at the root, outside the API prefix
pub fn root_routes() -> Router<AppState> {
    Router::new().route("/health", get(liveness_check))
}

/// `/health` and `/status` under `/api/v1`
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(readiness_check))
        .route("/status", get(status))
}

/// Liveness probe; answers as long as the process serves requests.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is running")),
    tag = "health"
)]
pub async fn liveness_check() -> impl IntoResponse {
    Json(json!({
        "status": "up",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Readiness probe; fails with 503 while the database is unreachable.
#[utoipa::path(
    get,
    path = "/api/v1/health",
    responses(
        (status = 200, description = "Database reachable", body = ComponentHealth),
        (status = 503, description = "Database unreachable", body = ComponentHealth)
    ),
    tag = "health"
)]
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    let database = check_database(&state).await;
    let code = match database.status {
        ComponentStatus::Up => StatusCode::OK,
        ComponentStatus::Down => StatusCode::SERVICE_UNAVAILABLE,
    };
    (code, Json(database))
}

#[utoipa::path(
    get,
    path = "/api/v1/status",
    responses(
        (status = 200, description = "Service status", body = StatusResponse),
        (status = 503, description = "Database unreachable", body = StatusResponse)
    ),
    tag = "health"
)]
pub async fn status(State(state): State<AppState>) -> impl IntoResponse {
    let database = check_database(&state).await;
    let notifications = &state.config.notifications;

    let response = StatusResponse {
        status: database.status,
        service: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        environment: state.config.environment.clone(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        uptime_secs: get_uptime_secs(),
        database,
        notification_channels: ChannelStatus {
            line: notifications.line_enabled,
            email: notifications.email_enabled,
            sms: notifications.sms_enabled,
        },
        maintenance_enabled: state.config.maintenance.enabled,
    };

    let code = match response.status {
        ComponentStatus::Up => StatusCode::OK,
        ComponentStatus::Down => StatusCode::SERVICE_UNAVAILABLE,
    };
    (code, Json(response))
}
