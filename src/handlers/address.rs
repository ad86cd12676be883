use crate::{services::address::AddressLookup, ApiResponse, ApiResult, AppState};
use axum::{
    extract::{Path, State},
    response::Json,
    routing::get,
    Router,
};

pub fn public_routes() -> Router<AppState> {
    Router::new().route("/address/:postal_code", get(lookup_address))
}

#[utoipa::path(
    get,
    path = "/api/v1/address/{postal_code}",
    params(("postal_code" = String, Path, description = "Seven digits, hyphen optional")),
    responses(
        (status = 200, description = "Address for the postal code", body = ApiResponse<AddressLookup>),
        (status = 400, description = "Malformed postal code", body = crate::errors::ErrorResponse),
        (status = 404, description = "No address for the postal code", body = crate::errors::ErrorResponse),
        (status = 502, description = "Lookup service unavailable", body = crate::errors::ErrorResponse)
    ),
    tag = "address"
)]
pub async fn lookup_address(
    State(state): State<AppState>,
    Path(postal_code): Path<String>,
) -> ApiResult<AddressLookup> {
    let address = state.services.address.lookup(&postal_code).await?;
    Ok(Json(ApiResponse::success(address)))
}
