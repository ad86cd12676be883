mod common;

use axum::http::{Method, StatusCode};
use common::{decimal, response_json, response_text, TestApp};
use rust_decimal_macros::dec;
use serde_json::json;

#[tokio::test]
async fn product_crud_and_visibility() {
    let app = TestApp::new().await;

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/admin/products",
            Some(json!({
                "name": "ペチュニア",
                "price": "350",
                "category_id": 2,
                "product_code": "FLW010"
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = response_json(response).await["data"].clone();
    let id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["tax_type"], "exclusive");
    assert_eq!(created["tax_rate"], 10);
    assert_eq!(created["visible"], true);

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/admin/products",
            Some(json!({ "name": "", "price": "100" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .request_authenticated(
            Method::PUT,
            &format!("/api/v1/admin/products/{}", id),
            Some(json!({ "price": "380", "memo": "夏向け" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let updated = response_json(response).await["data"].clone();
    assert_eq!(decimal(&updated["price"]), dec!(380));
    assert_eq!(updated["name"], "ペチュニア");

    let response = app
        .request_authenticated(
            Method::PUT,
            &format!("/api/v1/admin/products/{}/visibility", id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_json(response).await["data"]["visible"], false);

    let response = app
        .request_authenticated(Method::GET, "/api/v1/admin/products?visible=false", None)
        .await;
    let page = response_json(response).await["data"].clone();
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["id"], id.as_str());

    let response = app
        .request_authenticated(
            Method::DELETE,
            &format!("/api/v1/admin/products/{}", id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .request_authenticated(Method::GET, &format!("/api/v1/admin/products/{}", id), None)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn product_on_a_reservation_cannot_be_deleted() {
    let app = TestApp::new().await;
    let form = app.seed_form().await;
    app.submit_reservation(&form).await;

    let response = app
        .request_authenticated(
            Method::DELETE,
            &format!("/api/v1/admin/products/{}", form.product_ids[0]),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn csv_import_rejects_the_whole_file_on_any_bad_row() {
    let app = TestApp::new().await;
    let csv = "name,price,tax_type\nマリーゴールド,200,exclusive\n,300,exclusive\nパンジー,abc,sometimes\n";

    let response = app
        .request_raw(
            Method::POST,
            "/api/v1/admin/products/import",
            csv.to_string(),
            &[("content-type", "text/csv")],
            Some(app.token()),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let result = response_json(response).await["data"].clone();
    assert_eq!(result["total"], 3);
    assert_eq!(result["inserted"], 0);

    let errors = result["errors"].as_array().unwrap();
    let fields: Vec<(u64, &str)> = errors
        .iter()
        .map(|e| (e["row"].as_u64().unwrap(), e["field"].as_str().unwrap()))
        .collect();
    assert!(fields.contains(&(3, "name")));
    assert!(fields.contains(&(4, "price")));
    assert!(fields.contains(&(4, "tax_type")));

    let (_, total) = app
        .state
        .services
        .products
        .list_products(Default::default(), 1, 20)
        .await
        .unwrap();
    assert_eq!(total, 0);
}

#[tokio::test]
async fn csv_import_links_products_to_a_preset() {
    let app = TestApp::new().await;
    let form = app.seed_form().await;
    let csv = "\u{feff}name,price,base_name,variation,visible\r\n\
               ビオラ,198,ビオラ,紫,true\r\n\
               \"腐葉土, 20L\",\"1,080\",,,false\r\n";

    let response = app
        .request_raw(
            Method::POST,
            &format!(
                "/api/v1/admin/products/import?format=standard&preset_id={}",
                form.preset_id
            ),
            csv.to_string(),
            &[("content-type", "text/csv")],
            Some(app.token()),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let result = response_json(response).await["data"].clone();
    assert_eq!(result["inserted"], 2);
    assert!(result["errors"].as_array().unwrap().is_empty());
    assert_eq!(result["products"][0]["name"], "ビオラ（紫）");
    assert_eq!(result["products"][1]["name"], "腐葉土, 20L");
    assert_eq!(decimal(&result["products"][1]["price"]), dec!(1080));
    assert_eq!(result["products"][1]["visible"], false);

    let linked = app
        .state
        .services
        .presets
        .list_preset_products(form.preset_id)
        .await
        .unwrap();
    assert_eq!(linked.len(), 4);
}

#[tokio::test]
async fn csv_import_reads_pos_exports() {
    let app = TestApp::new().await;
    let csv = "カテゴリーID,商品名,価格,バリエーション（種別1）,税設定,適用税率,価格設定,商品コード,バーコード,ポイント付与対象,表示/非表示,備考\n\
               4,腐葉土,0,,内税,軽減税率,量り売り,#200,#200,対象外,非表示,量り売り\n";

    let response = app
        .request_raw(
            Method::POST,
            "/api/v1/admin/products/import?format=pos",
            csv.to_string(),
            &[],
            Some(app.token()),
        )
        .await;
    let result = response_json(response).await["data"].clone();
    assert_eq!(result["format"], "pos");
    assert_eq!(result["inserted"], 1);
    let product = &result["products"][0];
    assert_eq!(product["tax_type"], "inclusive");
    assert_eq!(product["tax_rate"], 8);
    assert_eq!(product["price_type"], "weight");
    assert_eq!(product["visible"], false);
    assert_eq!(product["point_eligible"], false);
}

#[tokio::test]
async fn csv_import_with_unknown_preset_is_not_found() {
    let app = TestApp::new().await;
    let response = app
        .request_raw(
            Method::POST,
            &format!(
                "/api/v1/admin/products/import?preset_id={}",
                uuid::Uuid::new_v4()
            ),
            "name,price\n鉢,500\n".to_string(),
            &[],
            Some(app.token()),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn csv_export_and_template_are_attachments() {
    let app = TestApp::new().await;
    app.create_product("寄せ植え, 大", "3000").await;

    let response = app
        .request_authenticated(Method::GET, "/api/v1/admin/products/export", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()["content-disposition"]
        .to_str()
        .unwrap()
        .contains("products.csv"));
    let body = response_text(response).await;
    assert!(body.starts_with('\u{feff}'));
    assert!(body.contains("\"寄せ植え, 大\""));

    let response = app
        .request_authenticated(Method::GET, "/api/v1/admin/products/template?format=pos", None)
        .await;
    assert!(response.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("text/csv"));
    let body = response_text(response).await;
    assert!(body.contains("カテゴリーID,商品名,価格"));
}

#[tokio::test]
async fn preset_duplicate_and_delete() {
    let app = TestApp::new().await;
    let form = app.seed_form().await;
    let reservation = app.submit_reservation(&form).await;

    let response = app
        .request_authenticated(
            Method::POST,
            &format!("/api/v1/admin/presets/{}/duplicate", form.preset_id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let copy = response_json(response).await["data"].clone();
    assert_eq!(copy["preset_name"], "春の苗フェア (コピー)");
    assert_eq!(copy["is_active"], false);

    let copy_id = copy["id"].as_str().unwrap();
    let response = app
        .request_authenticated(Method::GET, &format!("/api/v1/admin/presets/{}", copy_id), None)
        .await;
    let detail = response_json(response).await["data"].clone();
    assert_eq!(detail["products"].as_array().unwrap().len(), 2);
    assert_eq!(detail["pickup_windows"].as_array().unwrap().len(), 1);
    assert!(detail["form_settings"].is_object());

    let response = app
        .request_authenticated(
            Method::DELETE,
            &format!("/api/v1/admin/presets/{}", form.preset_id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .request_authenticated(
            Method::GET,
            &format!("/api/v1/admin/reservations/{}", reservation["id"].as_str().unwrap()),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn preset_product_list_and_windows_are_validated() {
    let app = TestApp::new().await;
    let form = app.seed_form().await;
    let viola = form.product_ids[0];

    let response = app
        .request_authenticated(
            Method::PUT,
            &format!("/api/v1/admin/presets/{}/products", form.preset_id),
            Some(json!([{ "product_id": viola }, { "product_id": viola }])),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .request_authenticated(
            Method::PUT,
            &format!("/api/v1/admin/presets/{}/products", form.preset_id),
            Some(json!([{ "product_id": viola }])),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_json(response).await["data"].as_array().unwrap().len(), 1);

    let response = app
        .request_authenticated(
            Method::POST,
            &format!("/api/v1/admin/presets/{}/pickup-windows", form.preset_id),
            Some(json!({
                "pickup_start": "2030-05-01T03:00:00Z",
                "pickup_end": "2030-05-01T01:00:00Z"
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .request_authenticated(
            Method::DELETE,
            &format!(
                "/api/v1/admin/presets/{}/pickup-windows/{}",
                form.preset_id, form.window_id
            ),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .request_authenticated(
            Method::PUT,
            &format!("/api/v1/admin/presets/{}/form-settings", form.preset_id),
            Some(json!({ "require_furigana": true, "custom_message": "雨天決行" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let settings = response_json(response).await["data"].clone();
    assert_eq!(settings["require_furigana"], true);
    assert_eq!(settings["custom_message"], "雨天決行");
}
