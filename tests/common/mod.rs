#![allow(dead_code)]

use std::str::FromStr;
use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request},
    response::Response,
    Extension, Router,
};
use chrono::{Duration, FixedOffset, NaiveDate, TimeZone, Utc};
use nursery_reserve::{
    auth::{self, ADMIN_ROLE},
    config::AppConfig,
    db, AppState,
};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

pub const ADMIN_PASSWORD: &str = "tulip-and-rose-2025";
pub const LINE_SECRET: &str = "line-channel-secret-for-tests";

/// Application state and router on a throwaway SQLite file.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    token: String,
    _db_dir: TempDir,
}

/// A preset accepting submissions, with two products and one pickup window tomorrow.
pub struct SeededForm {
    pub preset_id: Uuid,
    pub product_ids: Vec<Uuid>,
    pub window_id: Uuid,
    pub pickup_date: NaiveDate,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Builds the app after letting the caller adjust the configuration.
    pub async fn with_config(customize: impl FnOnce(&mut AppConfig)) -> Self {
        let db_dir = tempfile::tempdir().expect("create temp dir");
        let db_path = db_dir.path().join("nursery_test.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            "q8Zr2LmX5vT9wK3pN7dF1hJ6cB4sG0yA-q8Zr2LmX5vT9wK3pN7dF1hJ6cB4sG0yA".to_string(),
            3600,
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        cfg.admin_password_hash =
            Some(auth::hash_password(ADMIN_PASSWORD).expect("hash admin password"));
        cfg.notifications.dry_run = true;
        cfg.notifications.line_channel_access_token = Some("test-line-token".to_string());
        cfg.notifications.line_channel_secret = Some(LINE_SECRET.to_string());
        customize(&mut cfg);

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let state = AppState::new(Arc::new(pool), cfg);
        let token = state
            .auth
            .issue_token("admin", vec![ADMIN_ROLE.to_string()])
            .expect("issue admin token")
            .access_token;

        let router = Router::new()
            .merge(nursery_reserve::handlers::health::root_routes())
            .nest("/api/v1", nursery_reserve::api_v1_routes())
            .nest(
                "/auth",
                auth::auth_routes().with_state(state.auth.clone()),
            )
            .layer(Extension(state.auth.clone()))
            .with_state(state.clone());

        Self {
            router,
            state,
            token,
            _db_dir: db_dir,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn shop_offset(&self) -> FixedOffset {
        self.state.config.shop_offset()
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        self.send(builder.body(body).expect("failed to build request"))
            .await
    }

    /// Convenience helper for authenticated JSON requests.
    pub async fn request_authenticated(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> Response {
        self.request(method, uri, body, Some(self.token())).await
    }

    /// Request with a non-JSON body and extra headers.
    pub async fn request_raw(
        &self,
        method: Method,
        uri: &str,
        body: impl Into<Body>,
        headers: &[(&str, &str)],
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        self.send(builder.body(body.into()).expect("failed to build request"))
            .await
    }

    async fn send(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    pub async fn create_product(&self, name: &str, price: &str) -> Uuid {
        let request = serde_json::from_value(json!({ "name": name, "price": price }))
            .expect("product request");
        self.state
            .services
            .products
            .create_product(request)
            .await
            .expect("seed product")
            .id
    }

    /// Preset with two products (500 and 1200 yen) and a 10:00-12:00 window tomorrow.
    pub async fn seed_form(&self) -> SeededForm {
        let services = &self.state.services;
        let viola = self.create_product("ビオラ", "500").await;
        let soil = self.create_product("培養土 25L", "1200").await;

        let preset = services
            .presets
            .create_preset(
                serde_json::from_value(json!({ "preset_name": "春の苗フェア" }))
                    .expect("preset request"),
            )
            .await
            .expect("seed preset");
        services
            .presets
            .set_preset_products(
                preset.id,
                serde_json::from_value(json!([
                    { "product_id": viola },
                    { "product_id": soil }
                ]))
                .expect("preset products"),
            )
            .await
            .expect("seed preset products");

        let offset = self.shop_offset();
        let pickup_date = Utc::now().with_timezone(&offset).date_naive() + Duration::days(1);
        let start = offset
            .from_local_datetime(&pickup_date.and_hms_opt(10, 0, 0).expect("valid time"))
            .single()
            .expect("unambiguous local time")
            .with_timezone(&Utc);
        let window = services
            .presets
            .create_pickup_window(
                preset.id,
                serde_json::from_value(json!({
                    "pickup_start": start,
                    "pickup_end": start + Duration::hours(2),
                }))
                .expect("window request"),
            )
            .await
            .expect("seed pickup window");

        SeededForm {
            preset_id: preset.id,
            product_ids: vec![viola, soil],
            window_id: window.id,
            pickup_date,
        }
    }

    /// Submits a reservation through the public endpoint and returns its `data`.
    pub async fn submit_reservation(&self, form: &SeededForm) -> Value {
        let response = self
            .request(
                Method::POST,
                "/api/v1/reservations",
                Some(json!({
                    "preset_id": form.preset_id,
                    "customer": {
                        "full_name": "山田 花子",
                        "phone": "090-1234-5678",
                        "email": "hanako@example.com",
                        "line_user_id": "U1234567890abcdef"
                    },
                    "items": [
                        { "product_id": form.product_ids[0], "quantity": 2 },
                        { "product_id": form.product_ids[1], "quantity": 1 }
                    ],
                    "pickup_window_id": form.window_id,
                    "note": "午前中に伺います"
                })),
                None,
            )
            .await;
        assert_eq!(response.status(), 201, "reservation submit should succeed");
        response_json(response).await["data"].clone()
    }
}

pub async fn response_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    serde_json::from_slice(&bytes).expect("response body is JSON")
}

pub async fn response_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    String::from_utf8(bytes.to_vec()).expect("response body is UTF-8")
}

/// Reads a decimal that may be serialized as a string or a number.
pub fn decimal(value: &Value) -> Decimal {
    match value {
        Value::String(s) => Decimal::from_str(s).expect("decimal string"),
        Value::Number(n) => Decimal::from_str(&n.to_string()).expect("decimal number"),
        other => panic!("not a decimal: {other}"),
    }
}
