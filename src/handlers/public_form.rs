//! Customer-facing endpoints. None of these require authentication.

use crate::{
    errors::ServiceError,
    services::{
        availability::AvailableDate,
        form_config::FormConfig,
        reservation_form::SubmitReservationRequest,
        reservations::{PublicReservationView, ReservationView},
    },
    ApiResponse, ApiResult, AppState,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AvailableDatesQuery {
    /// Comma-separated product ids currently selected
    pub product_ids: Option<String>,
}

impl AvailableDatesQuery {
    fn selected(&self) -> Result<Vec<Uuid>, ServiceError> {
        self.product_ids
            .as_deref()
            .unwrap_or("")
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                Uuid::parse_str(s)
                    .map_err(|_| ServiceError::BadRequest(format!("invalid product id '{}'", s)))
            })
            .collect()
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CustomerCancelRequest {
    pub reservation_number: String,
}

pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/forms/:preset_id", get(get_form_config))
        .route("/forms/:preset_id/available-dates", get(get_available_dates))
        .route("/reservations", post(submit_reservation))
        .route("/reservations/:id/public", get(get_public_reservation))
        .route("/reservations/:id/cancel", post(cancel_reservation))
}

#[utoipa::path(
    get,
    path = "/api/v1/forms/{preset_id}",
    params(("preset_id" = Uuid, Path, description = "Preset ID")),
    responses(
        (status = 200, description = "Form configuration", body = ApiResponse<FormConfig>),
        (status = 404, description = "Form not open", body = crate::errors::ErrorResponse)
    ),
    tag = "public"
)]
pub async fn get_form_config(
    State(state): State<AppState>,
    Path(preset_id): Path<Uuid>,
) -> ApiResult<FormConfig> {
    let config = state.services.form_config.get_form_config(preset_id).await?;
    Ok(Json(ApiResponse::success(config)))
}

#[utoipa::path(
    get,
    path = "/api/v1/forms/{preset_id}/available-dates",
    params(("preset_id" = Uuid, Path, description = "Preset ID"), AvailableDatesQuery),
    responses(
        (status = 200, description = "Pickup dates with their windows", body = ApiResponse<Vec<AvailableDate>>),
        (status = 404, description = "Form not open", body = crate::errors::ErrorResponse)
    ),
    tag = "public"
)]
pub async fn get_available_dates(
    State(state): State<AppState>,
    Path(preset_id): Path<Uuid>,
    Query(query): Query<AvailableDatesQuery>,
) -> ApiResult<Vec<AvailableDate>> {
    let selected = query.selected()?;
    let dates = state
        .services
        .form_config
        .available_dates(preset_id, &selected)
        .await?;
    Ok(Json(ApiResponse::success(dates)))
}

#[utoipa::path(
    post,
    path = "/api/v1/reservations",
    request_body = SubmitReservationRequest,
    responses(
        (status = 201, description = "Reservation received", body = ApiResponse<ReservationView>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Form not open", body = crate::errors::ErrorResponse)
    ),
    tag = "public"
)]
pub async fn submit_reservation(
    State(state): State<AppState>,
    Json(payload): Json<SubmitReservationRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ReservationView>>), ServiceError> {
    let reservation = state.services.reservations.submit(payload).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(reservation))))
}

#[utoipa::path(
    get,
    path = "/api/v1/reservations/{id}/public",
    params(("id" = Uuid, Path, description = "Reservation ID")),
    responses(
        (status = 200, description = "Reservation", body = ApiResponse<PublicReservationView>),
        (status = 404, description = "Reservation not found", body = crate::errors::ErrorResponse)
    ),
    tag = "public"
)]
pub async fn get_public_reservation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<PublicReservationView> {
    let reservation = state.services.reservations.get_public(id).await?;
    Ok(Json(ApiResponse::success(reservation)))
}

#[utoipa::path(
    post,
    path = "/api/v1/reservations/{id}/cancel",
    params(("id" = Uuid, Path, description = "Reservation ID")),
    request_body = CustomerCancelRequest,
    responses(
        (status = 200, description = "Reservation cancelled", body = ApiResponse<PublicReservationView>),
        (status = 400, description = "Already picked up", body = crate::errors::ErrorResponse),
        (status = 404, description = "Reservation not found", body = crate::errors::ErrorResponse)
    ),
    tag = "public"
)]
pub async fn cancel_reservation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CustomerCancelRequest>,
) -> ApiResult<PublicReservationView> {
    let reservation = state
        .services
        .reservations
        .cancel_by_customer(id, &payload.reservation_number)
        .await?;
    Ok(Json(ApiResponse::success(reservation)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn selected_products_parse_comma_list() {
        let id = Uuid::new_v4();
        let query = AvailableDatesQuery {
            product_ids: Some(format!(" {id}, ,")),
        };
        assert_eq!(query.selected().unwrap(), vec![id]);
        assert!(AvailableDatesQuery::default().selected().unwrap().is_empty());

        let bad = AvailableDatesQuery {
            product_ids: Some("not-a-uuid".into()),
        };
        assert_matches!(bad.selected(), Err(ServiceError::BadRequest(_)));
    }
}
