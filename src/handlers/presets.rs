use crate::{
    errors::ServiceError,
    services::{
        availability::PickupWindowSummary,
        presets::{
            CreatePickupWindowRequest, CreatePresetRequest, FormSettingsView, PresetDetail,
            PresetProductInput, PresetProductView, PresetSummary, UpdateFormSettingsRequest,
            UpdatePresetRequest,
        },
    },
    ApiResponse, ApiResult, AppState, ListQuery, PaginatedResponse,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{delete, get, post},
    Router,
};
use uuid::Uuid;

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/presets", get(list_presets).post(create_preset))
        .route(
            "/presets/:id",
            get(get_preset).put(update_preset).delete(delete_preset),
        )
        .route("/presets/:id/duplicate", post(duplicate_preset))
        .route(
            "/presets/:id/products",
            get(list_preset_products).put(set_preset_products),
        )
        .route(
            "/presets/:id/pickup-windows",
            get(list_pickup_windows).post(create_pickup_window),
        )
        .route(
            "/presets/:id/pickup-windows/:window_id",
            delete(delete_pickup_window),
        )
        .route(
            "/presets/:id/form-settings",
            get(get_form_settings).put(update_form_settings),
        )
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/presets",
    params(ListQuery),
    responses(
        (status = 200, description = "Presets", body = ApiResponse<PaginatedResponse<PresetSummary>>)
    ),
    tag = "presets"
)]
pub async fn list_presets(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<PaginatedResponse<PresetSummary>> {
    let (page, limit) = crate::page_bounds(query.page, query.limit, 100);
    let (items, total) = state.services.presets.list_presets(page, limit).await?;
    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        items, total, page, limit,
    ))))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/presets/{id}",
    params(("id" = Uuid, Path, description = "Preset ID")),
    responses(
        (status = 200, description = "Preset with products, windows and form settings", body = ApiResponse<PresetDetail>),
        (status = 404, description = "Preset not found", body = crate::errors::ErrorResponse)
    ),
    tag = "presets"
)]
pub async fn get_preset(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<PresetDetail> {
    let preset = state.services.presets.get_preset(id).await?;
    Ok(Json(ApiResponse::success(preset)))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/presets",
    request_body = CreatePresetRequest,
    responses(
        (status = 201, description = "Preset created", body = ApiResponse<PresetSummary>),
        (status = 400, description = "Invalid preset", body = crate::errors::ErrorResponse)
    ),
    tag = "presets"
)]
pub async fn create_preset(
    State(state): State<AppState>,
    Json(payload): Json<CreatePresetRequest>,
) -> Result<(StatusCode, Json<ApiResponse<PresetSummary>>), ServiceError> {
    let preset = state.services.presets.create_preset(payload).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(preset))))
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/presets/{id}",
    params(("id" = Uuid, Path, description = "Preset ID")),
    request_body = UpdatePresetRequest,
    responses(
        (status = 200, description = "Preset updated", body = ApiResponse<PresetSummary>),
        (status = 404, description = "Preset not found", body = crate::errors::ErrorResponse)
    ),
    tag = "presets"
)]
pub async fn update_preset(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePresetRequest>,
) -> ApiResult<PresetSummary> {
    let preset = state.services.presets.update_preset(id, payload).await?;
    Ok(Json(ApiResponse::success(preset)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/admin/presets/{id}",
    params(("id" = Uuid, Path, description = "Preset ID")),
    responses(
        (status = 200, description = "Preset deleted"),
        (status = 404, description = "Preset not found", body = crate::errors::ErrorResponse)
    ),
    tag = "presets"
)]
pub async fn delete_preset(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    state.services.presets.delete_preset(id).await?;
    Ok(Json(ApiResponse::success(())))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/presets/{id}/duplicate",
    params(("id" = Uuid, Path, description = "Preset ID")),
    responses(
        (status = 201, description = "Inactive copy created", body = ApiResponse<PresetSummary>),
        (status = 404, description = "Preset not found", body = crate::errors::ErrorResponse)
    ),
    tag = "presets"
)]
pub async fn duplicate_preset(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<ApiResponse<PresetSummary>>), ServiceError> {
    let copy = state.services.presets.duplicate_preset(id).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(copy))))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/presets/{id}/products",
    params(("id" = Uuid, Path, description = "Preset ID")),
    responses(
        (status = 200, description = "Products in display order", body = ApiResponse<Vec<PresetProductView>>)
    ),
    tag = "presets"
)]
pub async fn list_preset_products(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<PresetProductView>> {
    let products = state.services.presets.list_preset_products(id).await?;
    Ok(Json(ApiResponse::success(products)))
}

/// Replaces the whole product list; list order becomes display order.
#[utoipa::path(
    put,
    path = "/api/v1/admin/presets/{id}/products",
    params(("id" = Uuid, Path, description = "Preset ID")),
    request_body = Vec<PresetProductInput>,
    responses(
        (status = 200, description = "Products replaced", body = ApiResponse<Vec<PresetProductView>>),
        (status = 400, description = "Duplicate or unknown product", body = crate::errors::ErrorResponse),
        (status = 404, description = "Preset not found", body = crate::errors::ErrorResponse)
    ),
    tag = "presets"
)]
pub async fn set_preset_products(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<Vec<PresetProductInput>>,
) -> ApiResult<Vec<PresetProductView>> {
    let products = state.services.presets.set_preset_products(id, payload).await?;
    Ok(Json(ApiResponse::success(products)))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/presets/{id}/pickup-windows",
    params(("id" = Uuid, Path, description = "Preset ID")),
    responses(
        (status = 200, description = "Pickup windows", body = ApiResponse<Vec<PickupWindowSummary>>)
    ),
    tag = "presets"
)]
pub async fn list_pickup_windows(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<PickupWindowSummary>> {
    let windows = state.services.presets.list_pickup_windows(id).await?;
    Ok(Json(ApiResponse::success(windows)))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/presets/{id}/pickup-windows",
    params(("id" = Uuid, Path, description = "Preset ID")),
    request_body = CreatePickupWindowRequest,
    responses(
        (status = 201, description = "Pickup window created", body = ApiResponse<PickupWindowSummary>),
        (status = 400, description = "Window ends before it starts", body = crate::errors::ErrorResponse),
        (status = 404, description = "Preset not found", body = crate::errors::ErrorResponse)
    ),
    tag = "presets"
)]
pub async fn create_pickup_window(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CreatePickupWindowRequest>,
) -> Result<(StatusCode, Json<ApiResponse<PickupWindowSummary>>), ServiceError> {
    let window = state
        .services
        .presets
        .create_pickup_window(id, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(window))))
}

#[utoipa::path(
    delete,
    path = "/api/v1/admin/presets/{id}/pickup-windows/{window_id}",
    params(
        ("id" = Uuid, Path, description = "Preset ID"),
        ("window_id" = Uuid, Path, description = "Pickup window ID")
    ),
    responses(
        (status = 200, description = "Pickup window deleted"),
        (status = 404, description = "Pickup window not found", body = crate::errors::ErrorResponse)
    ),
    tag = "presets"
)]
pub async fn delete_pickup_window(
    State(state): State<AppState>,
    Path((id, window_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<()> {
    state
        .services
        .presets
        .delete_pickup_window(id, window_id)
        .await?;
    Ok(Json(ApiResponse::success(())))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/presets/{id}/form-settings",
    params(("id" = Uuid, Path, description = "Preset ID")),
    responses(
        (status = 200, description = "Form settings", body = ApiResponse<FormSettingsView>),
        (status = 404, description = "Preset not found", body = crate::errors::ErrorResponse)
    ),
    tag = "presets"
)]
pub async fn get_form_settings(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<FormSettingsView> {
    let settings = state.services.presets.get_form_settings(id).await?;
    Ok(Json(ApiResponse::success(settings)))
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/presets/{id}/form-settings",
    params(("id" = Uuid, Path, description = "Preset ID")),
    request_body = UpdateFormSettingsRequest,
    responses(
        (status = 200, description = "Form settings saved", body = ApiResponse<FormSettingsView>),
        (status = 404, description = "Preset not found", body = crate::errors::ErrorResponse)
    ),
    tag = "presets"
)]
pub async fn update_form_settings(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateFormSettingsRequest>,
) -> ApiResult<FormSettingsView> {
    let settings = state
        .services
        .presets
        .update_form_settings(id, payload)
        .await?;
    Ok(Json(ApiResponse::success(settings)))
}
