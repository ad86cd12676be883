use crate::{
    errors::ServiceError,
    notifications::line::{verify_line_signature, LineWebhookBody},
    services::notifications::{MulticastOutcome, NotificationLogSummary},
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::HeaderMap,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tracing::warn;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

const LINE_SIGNATURE_HEADER: &str = "x-line-signature";

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct NotificationLogQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
    pub reservation_id: Option<Uuid>,
}

fn default_page() -> u64 {
    1
}
fn default_limit() -> u64 {
    20
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct MulticastRequest {
    #[validate(length(min = 1, max = 5000, message = "メッセージを入力してください"))]
    pub message: String,
    /// Explicit LINE user ids; every linked customer when omitted
    pub user_ids: Option<Vec<String>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WebhookAck {
    pub linked_customers: usize,
}

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/notifications", get(list_notification_logs))
        .route("/notifications/line/multicast", post(line_multicast))
}

pub fn public_routes() -> Router<AppState> {
    Router::new().route("/line/webhook", post(line_webhook))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/notifications",
    params(NotificationLogQuery),
    responses(
        (status = 200, description = "Notification log, newest first", body = ApiResponse<PaginatedResponse<NotificationLogSummary>>)
    ),
    tag = "notifications"
)]
pub async fn list_notification_logs(
    State(state): State<AppState>,
    Query(query): Query<NotificationLogQuery>,
) -> ApiResult<PaginatedResponse<NotificationLogSummary>> {
    let (page, limit) = crate::page_bounds(query.page, query.limit, 100);
    let (items, total) = state
        .services
        .notifications
        .list_logs(query.reservation_id, page, limit)
        .await?;
    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        items, total, page, limit,
    ))))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/notifications/line/multicast",
    request_body = MulticastRequest,
    responses(
        (status = 200, description = "Broadcast sent", body = ApiResponse<MulticastOutcome>),
        (status = 400, description = "Empty message", body = crate::errors::ErrorResponse),
        (status = 502, description = "LINE rejected the request", body = crate::errors::ErrorResponse)
    ),
    tag = "notifications"
)]
pub async fn line_multicast(
    State(state): State<AppState>,
    Json(payload): Json<MulticastRequest>,
) -> ApiResult<MulticastOutcome> {
    payload.validate()?;
    let outcome = state
        .services
        .notifications
        .multicast(&payload.message, payload.user_ids)
        .await?;
    Ok(Json(ApiResponse::success(outcome)))
}

/// The signature covers the raw body, so it is checked before parsing.
#[utoipa::path(
    post,
    path = "/api/v1/line/webhook",
    request_body(content = String, content_type = "application/json"),
    responses(
        (status = 200, description = "Events processed", body = ApiResponse<WebhookAck>),
        (status = 401, description = "Missing or invalid signature", body = crate::errors::ErrorResponse)
    ),
    tag = "notifications"
)]
pub async fn line_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<WebhookAck> {
    let secret = state
        .config
        .notifications
        .line_channel_secret
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ServiceError::Unauthorized("LINE webhook is not configured".to_string()))?;

    let signature = headers
        .get(LINE_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ServiceError::Unauthorized("missing LINE signature".to_string()))?;

    if !verify_line_signature(secret, &body, signature) {
        warn!("Rejected LINE webhook with bad signature");
        return Err(ServiceError::Unauthorized(
            "invalid LINE signature".to_string(),
        ));
    }

    let parsed: LineWebhookBody = serde_json::from_slice(&body)
        .map_err(|e| ServiceError::BadRequest(format!("invalid webhook body: {}", e)))?;
    let linked_customers = state
        .services
        .notifications
        .handle_line_webhook(parsed)
        .await?;
    Ok(Json(ApiResponse::success(WebhookAck { linked_customers })))
}
