// Public reservation form
pub mod availability;
pub mod form_config;
pub mod reservation_form;

// Reservations and their notifications
pub mod notifications;
pub mod reservations;

// Catalogue management
pub mod csv_import;
pub mod presets;
pub mod products;

// Reporting and back office
pub mod dashboard;
pub mod history;
pub mod maintenance;
pub mod reports;

// External services
pub mod address;
