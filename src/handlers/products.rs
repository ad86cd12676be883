use crate::{
    services::{
        csv_import::{self, CsvFormat, ImportResult},
        products::{CreateProductRequest, ProductFilter, ProductSummary, UpdateProductRequest},
    },
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProductListQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
    pub search: Option<String>,
    pub category_id: Option<i32>,
    pub visible: Option<bool>,
}

fn default_page() -> u64 {
    1
}
fn default_limit() -> u64 {
    20
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CsvImportQuery {
    #[serde(default)]
    pub format: CsvFormat,
    /// Link imported products to this preset
    pub preset_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CsvTemplateQuery {
    #[serde(default)]
    pub format: CsvFormat,
}

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products).post(create_product))
        .route("/products/import", post(import_products))
        .route("/products/export", get(export_products))
        .route("/products/template", get(download_template))
        .route(
            "/products/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/products/:id/visibility", put(toggle_visibility))
}

fn csv_attachment(filename: &str, body: String) -> Response {
    // Leading BOM so spreadsheet software detects UTF-8
    let body = format!("\u{feff}{}", body);
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        body,
    )
        .into_response()
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/products",
    params(ProductListQuery),
    responses(
        (status = 200, description = "Products", body = ApiResponse<PaginatedResponse<ProductSummary>>)
    ),
    tag = "products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductListQuery>,
) -> ApiResult<PaginatedResponse<ProductSummary>> {
    let (page, limit) = crate::page_bounds(query.page, query.limit, 100);
    let filter = ProductFilter {
        search: query.search,
        category_id: query.category_id,
        visible: query.visible,
    };

    let (items, total) = state
        .services
        .products
        .list_products(filter, page, limit)
        .await?;
    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        items, total, page, limit,
    ))))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product", body = ApiResponse<ProductSummary>),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<ProductSummary> {
    let product = state.services.products.get_product(id).await?;
    Ok(Json(ApiResponse::success(product)))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/products",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created", body = ApiResponse<ProductSummary>),
        (status = 400, description = "Invalid product", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    Json(payload): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ProductSummary>>), crate::errors::ServiceError> {
    let product = state.services.products.create_product(payload).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(product))))
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Product updated", body = ApiResponse<ProductSummary>),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductRequest>,
) -> ApiResult<ProductSummary> {
    let product = state.services.products.update_product(id, payload).await?;
    Ok(Json(ApiResponse::success(product)))
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/products/{id}/visibility",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Visibility flipped", body = ApiResponse<ProductSummary>),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn toggle_visibility(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<ProductSummary> {
    let product = state.services.products.toggle_visibility(id).await?;
    Ok(Json(ApiResponse::success(product)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/admin/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product deleted"),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Product has reservations", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    state.services.products.delete_product(id).await?;
    Ok(Json(ApiResponse::success(())))
}

/// The request body is the raw CSV text.
#[utoipa::path(
    post,
    path = "/api/v1/admin/products/import",
    params(CsvImportQuery),
    request_body(content = String, content_type = "text/csv"),
    responses(
        (status = 200, description = "Import result, including row errors", body = ApiResponse<ImportResult>),
        (status = 404, description = "Preset not found", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn import_products(
    State(state): State<AppState>,
    Query(query): Query<CsvImportQuery>,
    body: String,
) -> ApiResult<ImportResult> {
    let result = state
        .services
        .csv_import
        .import(&body, query.format, query.preset_id)
        .await?;
    Ok(Json(ApiResponse::success(result)))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/products/export",
    responses(
        (status = 200, description = "All products as CSV", content_type = "text/csv", body = String)
    ),
    tag = "products"
)]
pub async fn export_products(
    State(state): State<AppState>,
) -> Result<Response, crate::errors::ServiceError> {
    let products = state.services.products.all_products().await?;
    Ok(csv_attachment(
        "products.csv",
        csv_import::export_standard(&products),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/products/template",
    params(CsvTemplateQuery),
    responses(
        (status = 200, description = "Import template", content_type = "text/csv", body = String)
    ),
    tag = "products"
)]
pub async fn download_template(Query(query): Query<CsvTemplateQuery>) -> Response {
    let filename = format!("product_template_{}.csv", query.format);
    csv_attachment(&filename, csv_import::template(query.format))
}
