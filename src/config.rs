use chrono::{FixedOffset, Offset, Utc};
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError, ValidationErrors};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEFAULT_SHOP_UTC_OFFSET_HOURS: i32 = 9;
const DEFAULT_LINE_API_BASE: &str = "https://api.line.me";
const DEFAULT_ZIPCLOUD_BASE: &str = "https://zipcloud.ibsnet.co.jp";
const DEV_DEFAULT_JWT_SECRET: &str =
    "this_is_a_development_secret_key_that_is_at_least_64_characters_long_for_testing";

/// Notification channel settings.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct NotificationConfig {
    /// Push messages through the LINE Messaging API
    #[serde(default = "default_true_bool")]
    pub line_enabled: bool,

    /// Send email notices
    #[serde(default = "default_true_bool")]
    pub email_enabled: bool,

    /// Send SMS notices (no gateway wired; logged only)
    #[serde(default)]
    pub sms_enabled: bool,

    /// Log outgoing messages instead of calling external services
    #[serde(default)]
    pub dry_run: bool,

    /// LINE channel access token (bearer)
    #[serde(default)]
    pub line_channel_access_token: Option<String>,

    /// LINE channel secret used to verify webhook signatures
    #[serde(default)]
    pub line_channel_secret: Option<String>,

    /// Base URL of the LINE Messaging API
    #[serde(default = "default_line_api_base")]
    #[validate(custom = "validate_http_url")]
    pub line_api_base: String,

    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,

    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,

    #[serde(default = "default_from_email")]
    #[validate(email)]
    pub from_email: String,

    #[serde(default = "default_from_name")]
    pub from_name: String,

    /// HTTP relay that accepts `{to, from, subject, text}` and delivers mail.
    /// When unset, email notices are written to the log.
    #[serde(default)]
    pub email_relay_url: Option<String>,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            line_enabled: true,
            email_enabled: true,
            sms_enabled: false,
            dry_run: false,
            line_channel_access_token: None,
            line_channel_secret: None,
            line_api_base: default_line_api_base(),
            smtp_host: default_smtp_host(),
            smtp_port: default_smtp_port(),
            from_email: default_from_email(),
            from_name: default_from_name(),
            email_relay_url: None,
        }
    }
}

/// Background maintenance: pickup reminders and history archiving.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct MaintenanceConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Seconds between passes
    #[serde(default = "default_maintenance_interval")]
    #[validate(range(min = 10))]
    pub interval_secs: u64,

    /// Completed reservations older than this (by updated_at) are archived
    #[serde(default = "default_completed_retention_hours")]
    pub completed_retention_hours: i64,

    /// Cancelled reservations older than this (by updated_at) are archived
    #[serde(default = "default_cancelled_retention_days")]
    pub cancelled_retention_days: i64,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_secs: default_maintenance_interval(),
            completed_retention_hours: default_completed_retention_hours(),
            cancelled_retention_days: default_cancelled_retention_days(),
        }
    }
}

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Database connection URL
    pub database_url: String,

    /// JWT secret key (minimum 64 characters)
    #[validate(length(min = 64), custom = "validate_jwt_secret")]
    pub jwt_secret: String,

    /// Admin session lifetime in seconds
    #[validate(range(min = 300, max = 604800))]
    pub jwt_expiration: usize,

    /// Server host address
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Whether to run database migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,

    /// CORS: comma-separated list of allowed origins (production)
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    /// Allow permissive CORS fallback
    #[serde(default)]
    pub cors_allow_any_origin: bool,

    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,
    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,
    #[serde(default = "default_db_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,
    #[serde(default = "default_db_idle_timeout_secs")]
    pub db_idle_timeout_secs: u64,
    #[serde(default = "default_db_acquire_timeout_secs")]
    pub db_acquire_timeout_secs: u64,

    /// Login name of the shop administrator
    #[serde(default = "default_admin_username")]
    pub admin_username: String,

    /// Argon2 PHC string for the administrator password.
    /// Generate with `nursery-admin hash-password`.
    #[serde(default)]
    pub admin_password_hash: Option<String>,

    /// Shop display name used in notices and reports
    #[serde(default = "default_shop_name")]
    pub shop_name: String,

    /// Offset of the shop's local time from UTC, in hours
    #[serde(default = "default_shop_utc_offset_hours")]
    #[validate(custom = "validate_utc_offset")]
    pub shop_utc_offset_hours: i32,

    /// Public base URL of the reservation form, used in notice links
    #[serde(default)]
    pub public_base_url: Option<String>,

    /// Base URL of the zipcloud postal code API
    #[serde(default = "default_zipcloud_base_url")]
    #[validate(custom = "validate_http_url")]
    pub zipcloud_base_url: String,

    #[serde(default)]
    #[validate]
    pub notifications: NotificationConfig,

    #[serde(default)]
    #[validate]
    pub maintenance: MaintenanceConfig,
}

impl AppConfig {
    /// Gets database URL reference
    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    /// Creates a new configuration with defaults for everything not given
    pub fn new(
        database_url: String,
        jwt_secret: String,
        jwt_expiration: usize,
        host: String,
        port: u16,
        environment: String,
    ) -> Self {
        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            host,
            port,
            environment,
            log_level: default_log_level(),
            log_json: false,
            auto_migrate: false,
            cors_allowed_origins: None,
            cors_allow_any_origin: false,
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            db_connect_timeout_secs: default_db_connect_timeout_secs(),
            db_idle_timeout_secs: default_db_idle_timeout_secs(),
            db_acquire_timeout_secs: default_db_acquire_timeout_secs(),
            admin_username: default_admin_username(),
            admin_password_hash: None,
            shop_name: default_shop_name(),
            shop_utc_offset_hours: DEFAULT_SHOP_UTC_OFFSET_HOURS,
            public_base_url: None,
            zipcloud_base_url: default_zipcloud_base_url(),
            notifications: NotificationConfig::default(),
            maintenance: MaintenanceConfig::default(),
        }
    }

    /// Checks if running in production environment
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    /// Checks if running in development environment
    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    /// Returns true if explicit CORS origins are configured
    pub fn has_cors_allowed_origins(&self) -> bool {
        self.cors_allowed_origins
            .as_ref()
            .map(|raw| raw.split(',').any(|origin| !origin.trim().is_empty()))
            .unwrap_or(false)
    }

    /// Whether we should fall back to permissive CORS
    pub fn should_allow_permissive_cors(&self) -> bool {
        self.is_development() || self.cors_allow_any_origin
    }

    /// Shop-local offset used for date grouping and "tomorrow" reminders
    pub fn shop_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.shop_utc_offset_hours * 3600).unwrap_or_else(|| Utc.fix())
    }

    fn validate_additional_constraints(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if !self.should_allow_permissive_cors() && !self.has_cors_allowed_origins() {
            let mut err = ValidationError::new("cors_allowed_origins_required");
            err.message = Some(
                "Set APP__CORS_ALLOWED_ORIGINS for non-development environments or explicitly opt-in via APP__CORS_ALLOW_ANY_ORIGIN=true".into(),
            );
            errors.add("cors_allowed_origins", err);
        }

        if !self.is_development() && self.jwt_secret.trim() == DEV_DEFAULT_JWT_SECRET {
            let mut err = ValidationError::new("jwt_secret_default_dev");
            err.message = Some(
                "The bundled development JWT secret must not be used outside development. Set APP__JWT_SECRET to a unique, secure value."
                    .into(),
            );
            errors.add("jwt_secret", err);
        }

        if self.is_production() && self.notifications.dry_run {
            let mut err = ValidationError::new("notifications_dry_run");
            err.message = Some("Notification dry-run mode is not allowed in production".into());
            errors.add("notifications", err);
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Gets log level reference
    pub fn log_level(&self) -> &str {
        &self.log_level
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration error: {0}")]
    Load(#[from] ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_db_max_connections() -> u32 {
    10
}
fn default_db_min_connections() -> u32 {
    1
}
fn default_db_connect_timeout_secs() -> u64 {
    30
}
fn default_db_idle_timeout_secs() -> u64 {
    300
}
fn default_db_acquire_timeout_secs() -> u64 {
    30
}

fn default_true_bool() -> bool {
    true
}

fn default_admin_username() -> String {
    "admin".to_string()
}

fn default_shop_name() -> String {
    "園芸用品予約システム".to_string()
}

fn default_shop_utc_offset_hours() -> i32 {
    DEFAULT_SHOP_UTC_OFFSET_HOURS
}

fn default_zipcloud_base_url() -> String {
    DEFAULT_ZIPCLOUD_BASE.to_string()
}

fn default_line_api_base() -> String {
    DEFAULT_LINE_API_BASE.to_string()
}

fn default_smtp_host() -> String {
    "smtp.gmail.com".to_string()
}

fn default_smtp_port() -> u16 {
    587
}

fn default_from_email() -> String {
    "noreply@nursery.com".to_string()
}

fn default_from_name() -> String {
    "園芸用品予約システム".to_string()
}

fn default_maintenance_interval() -> u64 {
    3600
}

fn default_completed_retention_hours() -> i64 {
    24
}

fn default_cancelled_retention_days() -> i64 {
    7
}

/// Validates log level values
fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if valid_levels.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("log_level");
        err.message = Some("Must be one of: trace, debug, info, warn, error".into());
        Err(err)
    }
}

fn validate_utc_offset(hours: i32) -> Result<(), ValidationError> {
    if (-12..=14).contains(&hours) {
        Ok(())
    } else {
        let mut err = ValidationError::new("shop_utc_offset_hours");
        err.message = Some("Must be between -12 and 14".into());
        Err(err)
    }
}

fn validate_http_url(value: &str) -> Result<(), ValidationError> {
    match url::Url::parse(value) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(()),
        _ => {
            let mut err = ValidationError::new("url");
            err.message = Some("Must be an absolute http(s) URL".into());
            Err(err)
        }
    }
}

fn validate_jwt_secret(secret: &str) -> Result<(), ValidationError> {
    let trimmed = secret.trim();

    if trimmed.len() < 64 {
        let mut err = ValidationError::new("jwt_secret");
        err.message =
            Some("JWT secret must be at least 64 characters for adequate security".into());
        return Err(err);
    }

    if let Some(first) = trimmed.chars().next() {
        if trimmed.chars().all(|c| c == first) {
            let mut err = ValidationError::new("jwt_secret");
            err.message = Some("JWT secret cannot be a repeated character sequence".into());
            return Err(err);
        }
    }

    let lower = trimmed.to_ascii_lowercase();
    let weak_fragments = ["changeme", "password", "12345", "abcdef"];
    if weak_fragments.iter().any(|pattern| lower.contains(pattern)) {
        let mut err = ValidationError::new("jwt_secret");
        err.message = Some(
            "JWT secret appears to be weak; use a cryptographically strong random string".into(),
        );
        return Err(err);
    }

    let unique_chars: std::collections::HashSet<char> = trimmed.chars().collect();
    if unique_chars.len() < 10 {
        let mut err = ValidationError::new("jwt_secret");
        err.message =
            Some("JWT secret must have at least 10 unique characters for adequate entropy".into());
        return Err(err);
    }

    Ok(())
}

/// Installs the global tracing subscriber.
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("nursery_reserve={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    let filter = EnvFilter::new(filter_directive);
    if json {
        let _ = fmt().with_env_filter(filter).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter).try_init();
    }
}

/// Loads configuration from `config/default`, `config/{RUN_ENV}` and `APP__*` variables.
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !Path::new(CONFIG_DIR).exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            CONFIG_DIR
        );
    }

    let config = Config::builder()
        .set_default("database_url", "sqlite://nursery.db?mode=rwc")?
        .set_default("jwt_expiration", 86400)?
        .set_default("host", "0.0.0.0")?
        .set_default("port", i64::from(DEFAULT_PORT))?
        .set_default("environment", run_env.as_str())?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    build_app_config(config)
}

fn build_app_config(config: Config) -> Result<AppConfig, AppConfigError> {
    // jwt_secret has no default; it must come from a file or the environment.
    if config.get_string("jwt_secret").is_err() {
        error!("JWT secret is not configured. Set APP__JWT_SECRET to a random string of at least 64 characters.");
        return Err(AppConfigError::Load(ConfigError::NotFound(
            "jwt_secret is required but not configured. Set APP__JWT_SECRET environment variable."
                .into(),
        )));
    }

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    app_config.validate_additional_constraints().map_err(|e| {
        error!("Configuration security validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}


#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    fn from_toml(content: &str) -> Result<AppConfig, AppConfigError> {
        let config = Config::builder()
            .add_source(File::from_str(content, FileFormat::Toml))
            .build()?;
        build_app_config(config)
    }

    const VALID: &str = r#"
        database_url = "sqlite://nursery.db?mode=rwc"
        jwt_secret = "kX9vQ2mL7pR4tW8yB3nF6hJ1cZ5sD0gA-kX9vQ2mL7pR4tW8yB3nF6hJ1cZ5sD0gA"
        jwt_expiration = 86400
        host = "127.0.0.1"
        environment = "development"

        [notifications]
        dry_run = true
        line_channel_access_token = "token"
    "#;

    #[test]
    fn loads_nested_sections_with_defaults() {
        let cfg = from_toml(VALID).unwrap();
        assert_eq!(cfg.port, DEFAULT_PORT);
        assert_eq!(cfg.shop_utc_offset_hours, 9);
        assert!(cfg.notifications.dry_run);
        assert!(cfg.notifications.line_enabled);
        assert!(!cfg.notifications.sms_enabled);
        assert_eq!(cfg.notifications.smtp_port, 587);
        assert!(!cfg.maintenance.enabled);
        assert_eq!(cfg.maintenance.cancelled_retention_days, 7);
    }

    #[test]
    fn missing_jwt_secret_is_a_load_error() {
        let result = from_toml(
            r#"
            database_url = "sqlite://nursery.db"
            jwt_expiration = 86400
            host = "127.0.0.1"
            environment = "development"
        "#,
        );
        assert!(matches!(result, Err(AppConfigError::Load(_))));
    }

    #[test]
    fn invalid_values_fail_validation() {
        let content = VALID.replace(
            "environment = \"development\"",
            "environment = \"development\"\nlog_level = \"loud\"\nshop_utc_offset_hours = 30",
        );
        match from_toml(&content) {
            Err(AppConfigError::Validation(errors)) => {
                let fields = errors.field_errors();
                assert!(fields.contains_key("log_level"));
                assert!(fields.contains_key("shop_utc_offset_hours"));
            }
            other => panic!("expected validation error, got {:?}", other.map(|c| c.port)),
        }
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let content = format!(
            "{}\nmystery = 1",
            VALID.replace("[notifications]", "mystery_top = 2\n[notifications]")
        );
        assert!(from_toml(&content).is_err());
    }

    #[test]
    fn utc_offset_edges_are_inclusive() {
        for (hours, ok) in [(-12, true), (14, true), (-13, false), (15, false)] {
            let mut cfg = from_toml(VALID).unwrap();
            cfg.shop_utc_offset_hours = hours;
            assert_eq!(cfg.validate().is_ok(), ok, "offset {}", hours);
        }
    }

    #[test]
    fn shop_offset_follows_configured_hours() {
        let cfg = from_toml(VALID).unwrap();
        assert_eq!(cfg.shop_offset().local_minus_utc(), 9 * 3600);
    }
}
