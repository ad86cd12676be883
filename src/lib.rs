//! Nursery reservation backend
//!
//! Customers reserve plants and garden supplies through a public form built
//! from an admin-managed preset; staff manage reservations, products and
//! notifications through the admin API.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod formatting;
pub mod handlers;
pub mod middleware_helpers;
pub mod notifications;
pub mod openapi;
pub mod services;
pub mod tracing;

use axum::{response::Json, Router};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

use crate::auth::{AuthRouterExt, AuthService, ADMIN_ROLE};

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub services: handlers::AppServices,
    pub auth: Arc<AuthService>,
}

impl AppState {
    pub fn new(db: Arc<DatabaseConnection>, config: config::AppConfig) -> Self {
        let services = handlers::AppServices::new(db.clone(), &config);
        let auth = Arc::new(AuthService::new(auth::AuthConfig::from_app_config(&config)));
        Self {
            db,
            config,
            services,
            auth,
        }
    }
}

// Paging parameters for list endpoints without filters
#[derive(Debug, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
}

/// Highest page a list endpoint serves; larger requests get this page.
pub const MAX_PAGE: u64 = 100_000;

/// Bounds `page` and `limit` so the row offset `(page - 1) * limit` never overflows.
pub fn page_bounds(page: u64, limit: u64, max_limit: u64) -> (u64, u64) {
    (page.clamp(1, MAX_PAGE), limit.clamp(1, max_limit.max(1)))
}

fn default_page() -> u64 {
    1
}
fn default_limit() -> u64 {
    20
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub errors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

impl<T> PaginatedResponse<T> {
    pub fn new(items: Vec<T>, total: u64, page: u64, limit: u64) -> Self {
        let total_pages = if limit == 0 {
            0
        } else {
            (total + limit - 1) / limit
        };
        Self {
            items,
            total,
            page,
            limit,
            total_pages,
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }
}


/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

/// Routes mounted under `/api/v1`. Everything below `/admin` requires an
/// admin token; the auth middleware reads the [`AuthService`] from request
/// extensions.
pub fn api_v1_routes() -> Router<AppState> {
    let public = Router::new()
        .merge(handlers::public_form::public_routes())
        .merge(handlers::address::public_routes())
        .merge(handlers::notifications::public_routes())
        .merge(handlers::health::api_routes());

    let admin = Router::new()
        .merge(handlers::reservations::admin_routes())
        .merge(handlers::products::admin_routes())
        .merge(handlers::presets::admin_routes())
        .merge(handlers::notifications::admin_routes())
        .merge(handlers::reports::admin_routes())
        .merge(handlers::dashboard::admin_routes())
        .merge(handlers::history::admin_routes())
        .with_role(ADMIN_ROLE);

    public.nest("/admin", admin)
}

pub mod prelude {
    pub use crate::config::AppConfig;
    pub use crate::db::DbPool;
    pub use crate::errors::ServiceError;
    pub use crate::services::*;
    pub use crate::{ApiResponse, ApiResult, AppState, PaginatedResponse};
}
