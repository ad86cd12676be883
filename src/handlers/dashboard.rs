use crate::{services::dashboard::DashboardStats, ApiResponse, ApiResult, AppState};
use axum::{extract::State, response::Json, routing::get, Router};

pub fn admin_routes() -> Router<AppState> {
    Router::new().route("/dashboard", get(dashboard_stats))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/dashboard",
    responses(
        (status = 200, description = "Reservation counts, revenue and best sellers", body = ApiResponse<DashboardStats>)
    ),
    tag = "dashboard"
)]
pub async fn dashboard_stats(State(state): State<AppState>) -> ApiResult<DashboardStats> {
    let stats = state.services.dashboard.stats().await?;
    Ok(Json(ApiResponse::success(stats)))
}
