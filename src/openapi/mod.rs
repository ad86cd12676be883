use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

/// Registers the admin bearer token scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Nursery Reserve API",
        version = "1.0.0",
        description = r#"
# Nursery Reserve API

Reservation backend for a plant nursery and garden shop.

## Public endpoints

The reservation form, reservation submission, customer cancellation, postal
code lookup and the LINE webhook need no authentication.

## Admin endpoints

Everything under `/api/v1/admin` requires a token from `POST /auth/login`:

```
Authorization: Bearer <token>
```

## Pagination

List endpoints accept `page` (default 1) and `limit` (default 20, max 100).
"#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers((url = "http://localhost:8080", description = "Local development")),
    modifiers(&SecurityAddon),
    tags(
        (name = "public", description = "Customer reservation form"),
        (name = "reservations", description = "Reservation administration"),
        (name = "products", description = "Product catalogue and CSV import"),
        (name = "presets", description = "Form presets, pickup windows and form settings"),
        (name = "notifications", description = "Notification log and LINE integration"),
        (name = "reports", description = "Printable order sheets and daily reports"),
        (name = "dashboard", description = "Admin dashboard"),
        (name = "history", description = "Archived reservations"),
        (name = "address", description = "Postal code lookup"),
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Admin login")
    ),
    paths(
        crate::auth::login_handler,

        crate::handlers::public_form::get_form_config,
        crate::handlers::public_form::get_available_dates,
        crate::handlers::public_form::submit_reservation,
        crate::handlers::public_form::get_public_reservation,
        crate::handlers::public_form::cancel_reservation,

        crate::handlers::reservations::list_reservations,
        crate::handlers::reservations::get_reservation,
        crate::handlers::reservations::update_status,
        crate::handlers::reservations::update_admin_notes,
        crate::handlers::reservations::apply_discount,
        crate::handlers::reservations::send_reminder,
        crate::handlers::reservations::resend_confirmation,
        crate::handlers::reservations::delete_reservation,

        crate::handlers::products::list_products,
        crate::handlers::products::get_product,
        crate::handlers::products::create_product,
        crate::handlers::products::update_product,
        crate::handlers::products::toggle_visibility,
        crate::handlers::products::delete_product,
        crate::handlers::products::import_products,
        crate::handlers::products::export_products,
        crate::handlers::products::download_template,

        crate::handlers::presets::list_presets,
        crate::handlers::presets::get_preset,
        crate::handlers::presets::create_preset,
        crate::handlers::presets::update_preset,
        crate::handlers::presets::delete_preset,
        crate::handlers::presets::duplicate_preset,
        crate::handlers::presets::list_preset_products,
        crate::handlers::presets::set_preset_products,
        crate::handlers::presets::list_pickup_windows,
        crate::handlers::presets::create_pickup_window,
        crate::handlers::presets::delete_pickup_window,
        crate::handlers::presets::get_form_settings,
        crate::handlers::presets::update_form_settings,

        crate::handlers::notifications::list_notification_logs,
        crate::handlers::notifications::line_multicast,
        crate::handlers::notifications::line_webhook,

        crate::handlers::reports::order_sheet,
        crate::handlers::reports::daily_report,
        crate::handlers::reports::daily_summary,

        crate::handlers::dashboard::dashboard_stats,
        crate::handlers::history::search_history,
        crate::handlers::history::history_stats,
        crate::handlers::history::archive_now,
        crate::handlers::address::lookup_address,

        crate::handlers::health::liveness_check,
        crate::handlers::health::readiness_check,
        crate::handlers::health::status,
    ),
    components(
        schemas(
            crate::ListQuery,
            crate::auth::LoginCredentials,
            crate::auth::TokenResponse,
            crate::handlers::public_form::CustomerCancelRequest,
            crate::handlers::reservations::UpdateStatusRequest,
            crate::handlers::reservations::AdminNotesRequest,
            crate::handlers::reservations::DiscountRequest,
            crate::handlers::notifications::MulticastRequest,
            crate::handlers::notifications::WebhookAck,
            crate::services::reservation_form::SubmitReservationRequest,
            crate::services::products::CreateProductRequest,
            crate::services::products::UpdateProductRequest,
            crate::services::presets::CreatePresetRequest,
            crate::services::presets::UpdatePresetRequest,
            crate::services::presets::PresetProductInput,
            crate::services::presets::CreatePickupWindowRequest,
            crate::services::presets::UpdateFormSettingsRequest,
            crate::services::csv_import::CsvFormat,
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_public_and_admin_paths() {
        let openapi = ApiDocV1::openapi();
        let json = serde_json::to_string_pretty(&openapi).unwrap();
        assert!(json.contains("Nursery Reserve API"));
        assert!(json.contains("/api/v1/reservations"));
        assert!(json.contains("/api/v1/admin/products/import"));
        assert!(json.contains("bearer_auth"));
    }
}
