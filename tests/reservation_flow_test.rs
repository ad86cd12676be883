mod common;

use axum::http::{Method, StatusCode};
use common::{decimal, response_json, response_text, TestApp};
use rust_decimal_macros::dec;
use serde_json::json;

#[tokio::test]
async fn public_form_lists_products_and_pickup_dates() {
    let app = TestApp::new().await;
    let form = app.seed_form().await;

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/forms/{}", form.preset_id),
            None,
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    let data = &body["data"];
    assert_eq!(data["products"].as_array().unwrap().len(), 2);
    assert_eq!(data["products"][0]["name"], "ビオラ");
    assert_eq!(
        data["available_dates"][0]["date"],
        form.pickup_date.to_string()
    );

    let response = app
        .request(
            Method::GET,
            &format!(
                "/api/v1/forms/{}/available-dates?product_ids={}",
                form.preset_id, form.product_ids[0]
            ),
            None,
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn closed_form_is_not_found() {
    let app = TestApp::new().await;
    let form = app.seed_form().await;

    let response = app
        .request_authenticated(
            Method::PUT,
            &format!("/api/v1/admin/presets/{}", form.preset_id),
            Some(json!({ "is_active": false })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/forms/{}", form.preset_id),
            None,
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn submitted_reservation_is_priced_and_pending() {
    let app = TestApp::new().await;
    let form = app.seed_form().await;

    let reservation = app.submit_reservation(&form).await;
    assert_eq!(reservation["status"], "pending");
    assert!(reservation["reservation_number"]
        .as_str()
        .unwrap()
        .starts_with("RSV-"));
    assert_eq!(reservation["reservation_date"], form.pickup_date.to_string());
    assert_eq!(reservation["pickup_time_start"], "10:00:00");
    assert_eq!(decimal(&reservation["total_amount"]), dec!(2200));
    assert_eq!(decimal(&reservation["final_amount"]), dec!(2200));
    assert_eq!(reservation["items"].as_array().unwrap().len(), 2);

    // Received notice is logged for the new reservation
    let response = app
        .request_authenticated(
            Method::GET,
            &format!(
                "/api/v1/admin/notifications?reservation_id={}",
                reservation["id"].as_str().unwrap()
            ),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let logs = response_json(response).await;
    assert_eq!(logs["data"]["total"], 1);
    assert_eq!(logs["data"]["items"][0]["notification_type"], "received");
}

#[tokio::test]
async fn submit_rejects_products_outside_the_preset() {
    let app = TestApp::new().await;
    let form = app.seed_form().await;
    let stray = app.create_product("スコップ", "800").await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/reservations",
            Some(json!({
                "preset_id": form.preset_id,
                "customer": { "full_name": "佐藤 一郎", "phone": "0312345678" },
                "items": [{ "product_id": stray, "quantity": 1 }],
                "pickup_window_id": form.window_id
            })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn submit_requires_phone_when_form_demands_it() {
    let app = TestApp::new().await;
    let form = app.seed_form().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/reservations",
            Some(json!({
                "preset_id": form.preset_id,
                "customer": { "full_name": "佐藤 一郎" },
                "items": [{ "product_id": form.product_ids[0], "quantity": 1 }],
                "pickup_window_id": form.window_id
            })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn blank_optional_email_is_accepted() {
    let app = TestApp::new().await;
    let form = app.seed_form().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/reservations",
            Some(json!({
                "preset_id": form.preset_id,
                "customer": { "full_name": "佐藤 一郎", "phone": "03-1234-5678", "email": "" },
                "items": [{ "product_id": form.product_ids[0], "quantity": 1 }],
                "pickup_window_id": form.window_id
            })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn customer_cancellation_needs_matching_number() {
    let app = TestApp::new().await;
    let form = app.seed_form().await;
    let reservation = app.submit_reservation(&form).await;
    let id = reservation["id"].as_str().unwrap();
    let uri = format!("/api/v1/reservations/{}/cancel", id);

    let response = app
        .request(
            Method::POST,
            &uri,
            Some(json!({ "reservation_number": "RSV-00000000-XXXXXX" })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .request(
            Method::POST,
            &uri,
            Some(json!({ "reservation_number": reservation["reservation_number"] })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["status"], "cancelled");
    assert_eq!(body["data"]["status_label"], "キャンセル");

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/reservations/{}/public", id),
            None,
            None,
        )
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"]["status"], "cancelled");
}

#[tokio::test]
async fn completed_reservation_cannot_be_cancelled_by_customer() {
    let app = TestApp::new().await;
    let form = app.seed_form().await;
    let reservation = app.submit_reservation(&form).await;
    let id = reservation["id"].as_str().unwrap();

    let response = app
        .request_authenticated(
            Method::PUT,
            &format!("/api/v1/admin/reservations/{}/status", id),
            Some(json!({ "status": "completed" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/reservations/{}/cancel", id),
            Some(json!({ "reservation_number": reservation["reservation_number"] })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn admin_routes_require_a_token() {
    let app = TestApp::new().await;

    let response = app
        .request(Method::GET, "/api/v1/admin/reservations", None, None)
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .request(
            Method::GET,
            "/api/v1/admin/reservations",
            None,
            Some("not-a-jwt"),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_login_issues_a_working_token() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/auth/login",
            Some(json!({ "username": "admin", "password": "wrong" })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .request(
            Method::POST,
            "/auth/login",
            Some(json!({ "username": "admin", "password": common::ADMIN_PASSWORD })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let token = response_json(response).await["access_token"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app
        .request(Method::GET, "/api/v1/admin/dashboard", None, Some(&token))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

/// Notification log types for one reservation, sorted.
async fn notice_kinds(app: &TestApp, reservation_id: &str) -> Vec<String> {
    let response = app
        .request_authenticated(
            Method::GET,
            &format!("/api/v1/admin/notifications?reservation_id={}", reservation_id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let mut kinds: Vec<String> = response_json(response).await["data"]["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|log| log["notification_type"].as_str().unwrap().to_string())
        .collect();
    kinds.sort();
    kinds
}

#[tokio::test]
async fn admin_manages_reservation_lifecycle() {
    let app = TestApp::new().await;
    let form = app.seed_form().await;
    let reservation = app.submit_reservation(&form).await;
    let id = reservation["id"].as_str().unwrap();
    let base = format!("/api/v1/admin/reservations/{}", id);

    // Listing and search
    let response = app
        .request_authenticated(
            Method::GET,
            "/api/v1/admin/reservations?status=pending&search=%E5%B1%B1%E7%94%B0",
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["items"][0]["customer_name"], "山田 花子");

    let response = app
        .request_authenticated(Method::GET, "/api/v1/admin/reservations?status=bogus", None)
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Confirming sends and stamps the confirmation
    let response = app
        .request_authenticated(
            Method::PUT,
            &format!("{}/status", base),
            Some(json!({ "status": "confirmed" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["status"], "confirmed");
    assert!(!body["data"]["confirmation_sent_at"].is_null());
    assert_eq!(notice_kinds(&app, id).await, vec!["confirmation", "received"]);

    // Other statuses send nothing
    let response = app
        .request_authenticated(
            Method::PUT,
            &format!("{}/status", base),
            Some(json!({ "status": "ready" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_json(response).await["data"]["status"], "ready");
    assert_eq!(notice_kinds(&app, id).await, vec!["confirmation", "received"]);

    // Discounts stay within the total
    let response = app
        .request_authenticated(
            Method::PUT,
            &format!("{}/discount", base),
            Some(json!({ "discount_amount": "200" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(decimal(&body["data"]["final_amount"]), dec!(2000));

    let response = app
        .request_authenticated(
            Method::PUT,
            &format!("{}/discount", base),
            Some(json!({ "discount_amount": "5000" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .request_authenticated(
            Method::PUT,
            &format!("{}/admin-notes", base),
            Some(json!({ "admin_notes": "鉢を2つ追加" })),
        )
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"]["admin_notes"], "鉢を2つ追加");

    // Manual reminder reports per-channel results
    let response = app
        .request_authenticated(Method::POST, &format!("{}/reminder", base), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["success"], true);

    let response = app
        .request_authenticated(Method::DELETE, &base, None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let response = app.request_authenticated(Method::GET, &base, None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_endpoints_clamp_huge_page_numbers() {
    let app = TestApp::new().await;
    let form = app.seed_form().await;
    app.submit_reservation(&form).await;

    for path in [
        "/api/v1/admin/reservations",
        "/api/v1/admin/products",
        "/api/v1/admin/presets",
        "/api/v1/admin/notifications",
        "/api/v1/admin/history",
    ] {
        let response = app
            .request_authenticated(
                Method::GET,
                &format!("{}?page=18446744073709551615&limit=100", path),
                None,
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK, "{}", path);
        let page = response_json(response).await["data"].clone();
        assert!(page["items"].as_array().unwrap().is_empty(), "{}", path);
        assert_eq!(page["page"], nursery_reserve::MAX_PAGE, "{}", path);
    }
}

#[tokio::test]
async fn reports_render_reservation_details() {
    let app = TestApp::new().await;
    let form = app.seed_form().await;
    let reservation = app.submit_reservation(&form).await;
    let number = reservation["reservation_number"].as_str().unwrap();

    let response = app
        .request_authenticated(
            Method::GET,
            &format!(
                "/api/v1/admin/reports/reservations/{}/order-sheet",
                reservation["id"].as_str().unwrap()
            ),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()["content-type"].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/html"));
    let html = response_text(response).await;
    assert!(html.contains(number));
    assert!(html.contains("山田 花子"));
    assert!(html.contains("保留中"));
    assert!(!html.contains("割引"));

    let response = app
        .request_authenticated(
            Method::GET,
            &format!("/api/v1/admin/reports/daily?date={}", form.pickup_date),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response_text(response).await.contains(number));

    let response = app
        .request_authenticated(
            Method::GET,
            &format!("/api/v1/admin/reports/daily/summary?date={}", form.pickup_date),
            None,
        )
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"]["total_reservations"], 1);
    assert_eq!(body["data"]["by_status"]["pending"], 1);
}

#[tokio::test]
async fn dashboard_counts_live_reservations() {
    let app = TestApp::new().await;
    let form = app.seed_form().await;
    app.submit_reservation(&form).await;

    let response = app
        .request_authenticated(Method::GET, "/api/v1/admin/dashboard", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["total_reservations"], 1);
    assert_eq!(body["data"]["pending"], 1);
    assert_eq!(decimal(&body["data"]["revenue"]), dec!(2200));
    assert_eq!(body["data"]["top_products"][0]["name"], "ビオラ");
}

#[tokio::test]
async fn health_endpoints_report_database_state() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.request(Method::GET, "/api/v1/health", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.request(Method::GET, "/api/v1/status", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["status"], "up");
    assert_eq!(body["environment"], "test");
}
