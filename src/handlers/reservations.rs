use crate::{
    entities::reservation::ReservationStatus,
    errors::ServiceError,
    services::{
        notifications::DispatchOutcome,
        reservations::{ReservationFilter, ReservationSummary, ReservationView},
    },
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};
use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::{get, post, put},
    Router,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ReservationListQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
    /// Status name, or `all`
    pub status: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    /// Matches reservation number, customer name or phone
    pub search: Option<String>,
}

fn default_page() -> u64 {
    1
}
fn default_limit() -> u64 {
    20
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AdminNotesRequest {
    pub admin_notes: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct DiscountRequest {
    pub discount_amount: Decimal,
}

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/reservations", get(list_reservations))
        .route(
            "/reservations/:id",
            get(get_reservation).delete(delete_reservation),
        )
        .route("/reservations/:id/status", put(update_status))
        .route("/reservations/:id/admin-notes", put(update_admin_notes))
        .route("/reservations/:id/discount", put(apply_discount))
        .route("/reservations/:id/reminder", post(send_reminder))
        .route(
            "/reservations/:id/resend-confirmation",
            post(resend_confirmation),
        )
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/reservations",
    params(ReservationListQuery),
    responses(
        (status = 200, description = "Reservations", body = ApiResponse<PaginatedResponse<ReservationSummary>>),
        (status = 400, description = "Unknown status", body = crate::errors::ErrorResponse)
    ),
    tag = "reservations"
)]
pub async fn list_reservations(
    State(state): State<AppState>,
    Query(query): Query<ReservationListQuery>,
) -> ApiResult<PaginatedResponse<ReservationSummary>> {
    let (page, limit) = crate::page_bounds(query.page, query.limit, 100);
    let filter = ReservationFilter {
        status: ReservationFilter::parse_status(query.status.as_deref())?,
        date_from: query.date_from,
        date_to: query.date_to,
        search: query.search,
    };

    let (items, total) = state.services.reservations.list(filter, page, limit).await?;
    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        items, total, page, limit,
    ))))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/reservations/{id}",
    params(("id" = Uuid, Path, description = "Reservation ID")),
    responses(
        (status = 200, description = "Reservation", body = ApiResponse<ReservationView>),
        (status = 404, description = "Reservation not found", body = crate::errors::ErrorResponse)
    ),
    tag = "reservations"
)]
pub async fn get_reservation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<ReservationView> {
    let reservation = state.services.reservations.get(id).await?;
    Ok(Json(ApiResponse::success(reservation)))
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/reservations/{id}/status",
    params(("id" = Uuid, Path, description = "Reservation ID")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = ApiResponse<ReservationView>),
        (status = 400, description = "Unknown status", body = crate::errors::ErrorResponse),
        (status = 404, description = "Reservation not found", body = crate::errors::ErrorResponse)
    ),
    tag = "reservations"
)]
pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> ApiResult<ReservationView> {
    let status: ReservationStatus = payload
        .status
        .trim()
        .parse()
        .map_err(|_| ServiceError::InvalidStatus(format!("unknown status '{}'", payload.status)))?;
    let reservation = state.services.reservations.update_status(id, status).await?;
    Ok(Json(ApiResponse::success(reservation)))
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/reservations/{id}/admin-notes",
    params(("id" = Uuid, Path, description = "Reservation ID")),
    request_body = AdminNotesRequest,
    responses(
        (status = 200, description = "Notes saved", body = ApiResponse<ReservationView>),
        (status = 404, description = "Reservation not found", body = crate::errors::ErrorResponse)
    ),
    tag = "reservations"
)]
pub async fn update_admin_notes(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AdminNotesRequest>,
) -> ApiResult<ReservationView> {
    let reservation = state
        .services
        .reservations
        .update_admin_notes(id, payload.admin_notes)
        .await?;
    Ok(Json(ApiResponse::success(reservation)))
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/reservations/{id}/discount",
    params(("id" = Uuid, Path, description = "Reservation ID")),
    request_body = DiscountRequest,
    responses(
        (status = 200, description = "Discount applied", body = ApiResponse<ReservationView>),
        (status = 400, description = "Discount out of range", body = crate::errors::ErrorResponse),
        (status = 404, description = "Reservation not found", body = crate::errors::ErrorResponse)
    ),
    tag = "reservations"
)]
pub async fn apply_discount(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<DiscountRequest>,
) -> ApiResult<ReservationView> {
    let reservation = state
        .services
        .reservations
        .apply_discount(id, payload.discount_amount)
        .await?;
    Ok(Json(ApiResponse::success(reservation)))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/reservations/{id}/reminder",
    params(("id" = Uuid, Path, description = "Reservation ID")),
    responses(
        (status = 200, description = "Per-channel delivery results", body = ApiResponse<DispatchOutcome>),
        (status = 404, description = "Reservation not found", body = crate::errors::ErrorResponse)
    ),
    tag = "reservations"
)]
pub async fn send_reminder(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<DispatchOutcome> {
    let outcome = state.services.reservations.send_reminder(id).await?;
    Ok(Json(ApiResponse::success(outcome)))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/reservations/{id}/resend-confirmation",
    params(("id" = Uuid, Path, description = "Reservation ID")),
    responses(
        (status = 200, description = "Per-channel delivery results", body = ApiResponse<DispatchOutcome>),
        (status = 404, description = "Reservation not found", body = crate::errors::ErrorResponse)
    ),
    tag = "reservations"
)]
pub async fn resend_confirmation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<DispatchOutcome> {
    let outcome = state.services.reservations.resend_confirmation(id).await?;
    Ok(Json(ApiResponse::success(outcome)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/admin/reservations/{id}",
    params(("id" = Uuid, Path, description = "Reservation ID")),
    responses(
        (status = 200, description = "Reservation deleted"),
        (status = 404, description = "Reservation not found", body = crate::errors::ErrorResponse)
    ),
    tag = "reservations"
)]
pub async fn delete_reservation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    state.services.reservations.delete(id).await?;
    Ok(Json(ApiResponse::success(())))
}
