//! Printable reports. Order sheets and daily lists are served as HTML pages
//! meant for the browser's print dialog.

use crate::{
    errors::ServiceError,
    services::reports::DailySummary,
    ApiResponse, ApiResult, AppState,
};
use axum::{
    extract::{Path, Query, State},
    response::{Html, Json},
    routing::get,
    Router,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DailyReportQuery {
    /// Pickup date; defaults to today in shop time
    pub date: Option<NaiveDate>,
}

impl DailyReportQuery {
    fn resolve(&self, state: &AppState) -> NaiveDate {
        self.date.unwrap_or_else(|| {
            Utc::now()
                .with_timezone(&state.config.shop_offset())
                .date_naive()
        })
    }
}

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/reports/reservations/:id/order-sheet", get(order_sheet))
        .route("/reports/daily", get(daily_report))
        .route("/reports/daily/summary", get(daily_summary))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/reports/reservations/{id}/order-sheet",
    params(("id" = Uuid, Path, description = "Reservation ID")),
    responses(
        (status = 200, description = "Printable order sheet", content_type = "text/html", body = String),
        (status = 404, description = "Reservation not found", body = crate::errors::ErrorResponse)
    ),
    tag = "reports"
)]
pub async fn order_sheet(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Html<String>, ServiceError> {
    let html = state.services.reports.order_sheet_html(id).await?;
    Ok(Html(html))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/reports/daily",
    params(DailyReportQuery),
    responses(
        (status = 200, description = "Printable pickup list for one day", content_type = "text/html", body = String)
    ),
    tag = "reports"
)]
pub async fn daily_report(
    State(state): State<AppState>,
    Query(query): Query<DailyReportQuery>,
) -> Result<Html<String>, ServiceError> {
    let date = query.resolve(&state);
    let html = state.services.reports.daily_report_html(date).await?;
    Ok(Html(html))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/reports/daily/summary",
    params(DailyReportQuery),
    responses(
        (status = 200, description = "Counts and totals for one day", body = ApiResponse<DailySummary>)
    ),
    tag = "reports"
)]
pub async fn daily_summary(
    State(state): State<AppState>,
    Query(query): Query<DailyReportQuery>,
) -> ApiResult<DailySummary> {
    let date = query.resolve(&state);
    let report = state.services.reports.daily_report(date).await?;
    Ok(Json(ApiResponse::success(report.summary)))
}
