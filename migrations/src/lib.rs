pub use sea_orm_migration::prelude::*;

mod m20250301_000001_create_customers_table;
mod m20250301_000002_create_products_table;
mod m20250301_000003_create_preset_tables;
mod m20250301_000004_create_pickup_windows_table;
mod m20250301_000005_create_reservation_tables;
mod m20250301_000006_create_notification_logs_table;
mod m20250301_000007_create_reservation_history_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_customers_table::Migration),
            Box::new(m20250301_000002_create_products_table::Migration),
            Box::new(m20250301_000003_create_preset_tables::Migration),
            Box::new(m20250301_000004_create_pickup_windows_table::Migration),
            Box::new(m20250301_000005_create_reservation_tables::Migration),
            Box::new(m20250301_000006_create_notification_logs_table::Migration),
            Box::new(m20250301_000007_create_reservation_history_table::Migration),
        ]
    }
}
