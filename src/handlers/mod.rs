pub mod address;
pub mod dashboard;
pub mod health;
pub mod history;
pub mod notifications;
pub mod presets;
pub mod products;
pub mod public_form;
pub mod reports;
pub mod reservations;

use crate::{
    config::AppConfig,
    db::DbPool,
    services::{
        address::AddressService, csv_import::CsvImportService, dashboard::DashboardService,
        form_config::FormConfigService, history::HistoryService, maintenance::MaintenanceWorker,
        notifications::NotificationService, presets::PresetService, products::ProductService,
        reports::ReportService, reservations::ReservationService,
    },
};
use std::sync::Arc;
use std::time::Duration;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub reservations: Arc<ReservationService>,
    pub notifications: Arc<NotificationService>,
    pub form_config: Arc<FormConfigService>,
    pub presets: Arc<PresetService>,
    pub products: Arc<ProductService>,
    pub csv_import: Arc<CsvImportService>,
    pub reports: Arc<ReportService>,
    pub address: Arc<AddressService>,
    pub dashboard: Arc<DashboardService>,
    pub history: Arc<HistoryService>,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>, config: &AppConfig) -> Self {
        let notifications = Arc::new(NotificationService::from_config(db_pool.clone(), config));
        Self::with_notifications(db_pool, config, notifications)
    }

    /// Builds the container around an existing notification dispatcher.
    pub fn with_notifications(
        db_pool: Arc<DbPool>,
        config: &AppConfig,
        notifications: Arc<NotificationService>,
    ) -> Self {
        let offset = config.shop_offset();

        Self {
            reservations: Arc::new(ReservationService::new(
                db_pool.clone(),
                notifications.clone(),
                offset,
            )),
            notifications,
            form_config: Arc::new(FormConfigService::new(db_pool.clone(), offset)),
            presets: Arc::new(PresetService::new(db_pool.clone())),
            products: Arc::new(ProductService::new(db_pool.clone())),
            csv_import: Arc::new(CsvImportService::new(db_pool.clone())),
            reports: Arc::new(ReportService::new(
                db_pool.clone(),
                config.shop_name.clone(),
                offset,
            )),
            address: Arc::new(AddressService::new(config.zipcloud_base_url.clone())),
            dashboard: Arc::new(DashboardService::new(db_pool.clone(), offset)),
            history: Arc::new(HistoryService::new(db_pool, &config.maintenance)),
        }
    }

    pub fn maintenance_worker(&self, interval: Duration) -> MaintenanceWorker {
        MaintenanceWorker::new(self.reservations.clone(), self.history.clone(), interval)
    }
}
