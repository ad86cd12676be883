use crate::{
    services::history::{ArchiveOutcome, HistoryEntry, HistoryQuery, HistoryStats},
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};
use axum::{
    extract::{Query, State},
    response::Json,
    routing::{get, post},
    Router,
};

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/history", get(search_history))
        .route("/history/stats", get(history_stats))
        .route("/history/archive", post(archive_now))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/history",
    params(HistoryQuery),
    responses(
        (status = 200, description = "Archived reservations, newest first", body = ApiResponse<PaginatedResponse<HistoryEntry>>)
    ),
    tag = "history"
)]
pub async fn search_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<PaginatedResponse<HistoryEntry>> {
    let (page, limit) =
        crate::page_bounds(query.page.unwrap_or(1), query.limit.unwrap_or(50), 200);
    let (items, total) = state.services.history.search(query).await?;
    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        items, total, page, limit,
    ))))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/history/stats",
    responses(
        (status = 200, description = "Archive totals", body = ApiResponse<HistoryStats>)
    ),
    tag = "history"
)]
pub async fn history_stats(State(state): State<AppState>) -> ApiResult<HistoryStats> {
    let stats = state.services.history.stats().await?;
    Ok(Json(ApiResponse::success(stats)))
}

/// Runs the archiving pass immediately instead of waiting for the worker.
#[utoipa::path(
    post,
    path = "/api/v1/admin/history/archive",
    responses(
        (status = 200, description = "Rows moved to history", body = ApiResponse<ArchiveOutcome>)
    ),
    tag = "history"
)]
pub async fn archive_now(State(state): State<AppState>) -> ApiResult<ArchiveOutcome> {
    let outcome = state.services.history.archive().await?;
    Ok(Json(ApiResponse::success(outcome)))
}
