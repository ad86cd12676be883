pub mod customer;
pub mod form_settings;
pub mod notification_log;
pub mod pickup_window;
pub mod preset_product;
pub mod product;
pub mod product_preset;
pub mod reservation;
pub mod reservation_history;
pub mod reservation_item;
