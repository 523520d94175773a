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
const DEFAULT_PAYMENT_API_BASE: &str = "https://api.stripe.com";
const DEFAULT_EMAIL_TRANSPORT: &str = "api";
const DEFAULT_EMAIL_API_BASE: &str = "https://api.resend.com";
const DEFAULT_WEBHOOK_TOLERANCE_SECS: u64 = 300;
/// Development-only storefront origin; production deployments must override it.
const DEV_DEFAULT_FRONTEND_URL: &str = "http://localhost:5173";

/// Transactional email configuration
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct EmailConfig {
    /// Delivery transport: "api" (hosted HTTP API) or "smtp"
    #[serde(default = "default_email_transport")]
    #[validate(custom = "validate_email_transport")]
    pub transport: String,

    /// API key for the hosted email provider (required for the "api" transport)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Base URL of the hosted email provider
    #[serde(default = "default_email_api_base")]
    pub api_base: String,

    /// Sender mailbox for all outgoing mail
    #[serde(default = "default_email_from")]
    pub from_address: String,

    /// SMTP relay host (required for the "smtp" transport)
    #[serde(default)]
    pub smtp_host: Option<String>,

    /// SMTP relay port
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,

    /// SMTP credentials
    #[serde(default)]
    pub smtp_username: Option<String>,
    #[serde(default)]
    pub smtp_password: Option<String>,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            transport: default_email_transport(),
            api_key: None,
            api_base: default_email_api_base(),
            from_address: default_email_from(),
            smtp_host: None,
            smtp_port: default_smtp_port(),
            smtp_username: None,
            smtp_password: None,
        }
    }
}

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Database connection URL
    pub database_url: String,

    /// Server host address
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Payment provider secret key (server-side only, never shipped to a browser)
    #[validate(length(min = 12), custom = "validate_provider_secret")]
    pub payment_secret_key: String,

    /// Shared secret for verifying inbound payment webhook signatures
    #[validate(length(min = 8), custom = "validate_provider_secret")]
    pub payment_webhook_secret: String,

    /// Webhook timestamp tolerance (seconds)
    #[serde(default)]
    pub payment_webhook_tolerance_secs: Option<u64>,

    /// Payment provider API base URL (overridden in tests)
    #[serde(default = "default_payment_api_base")]
    pub payment_api_base: String,

    /// Storefront base URL used to derive checkout redirect targets
    #[serde(default = "default_frontend_base_url")]
    pub frontend_base_url: String,

    /// Default currency code for checkout sessions
    #[serde(default = "default_currency")]
    pub default_currency: String,

    /// Transactional email configuration
    #[serde(default)]
    #[validate]
    pub email: EmailConfig,

    /// Whether to run database migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,

    /// CORS: comma-separated list of allowed origins (production)
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    /// Allow permissive CORS fallback
    #[serde(default = "default_false_bool")]
    pub cors_allow_any_origin: bool,

    /// CORS: allow credentials
    #[serde(default)]
    pub cors_allow_credentials: bool,

    /// Request timeout budget (seconds)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// DB pool: max connections
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    /// DB pool: min connections
    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    /// DB timeouts (seconds)
    #[serde(default = "default_db_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,
    #[serde(default = "default_db_idle_timeout_secs")]
    pub db_idle_timeout_secs: u64,
    #[serde(default = "default_db_acquire_timeout_secs")]
    pub db_acquire_timeout_secs: u64,

    /// Event channel capacity for async event processing
    #[serde(default = "default_event_channel_capacity")]
    #[validate(custom = "validate_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl AppConfig {
    /// Gets database URL reference
    pub fn database_url(&self) -> &str {
        &self.database_url
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

    /// Webhook timestamp tolerance with the documented default applied
    pub fn webhook_tolerance_secs(&self) -> u64 {
        self.payment_webhook_tolerance_secs
            .unwrap_or(DEFAULT_WEBHOOK_TOLERANCE_SECS)
    }

    /// Checkout success redirect derived from the storefront base URL
    pub fn checkout_success_url(&self) -> String {
        format!(
            "{}/checkout/success?session_id={{CHECKOUT_SESSION_ID}}",
            self.frontend_base_url.trim_end_matches('/')
        )
    }

    /// Checkout cancel redirect derived from the storefront base URL
    pub fn checkout_cancel_url(&self) -> String {
        format!(
            "{}/checkout/cancelled",
            self.frontend_base_url.trim_end_matches('/')
        )
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

        if !self.is_development() && self.frontend_base_url.trim() == DEV_DEFAULT_FRONTEND_URL {
            let mut err = ValidationError::new("frontend_base_url_default_dev");
            err.message = Some(
                "The bundled development storefront URL must not be used outside development. Set APP__FRONTEND_BASE_URL to the deployed storefront origin."
                    .into(),
            );
            errors.add("frontend_base_url", err);
        }

        match self.email.transport.to_ascii_lowercase().as_str() {
            "api" => {
                if self
                    .email
                    .api_key
                    .as_deref()
                    .map(str::trim)
                    .filter(|k| !k.is_empty())
                    .is_none()
                {
                    let mut err = ValidationError::new("email_api_key_required");
                    err.message = Some(
                        "The hosted email transport requires APP__EMAIL__API_KEY to be set".into(),
                    );
                    errors.add("email", err);
                }
            }
            "smtp" => {
                let missing = self.email.smtp_host.is_none()
                    || self.email.smtp_username.is_none()
                    || self.email.smtp_password.is_none();
                if missing {
                    let mut err = ValidationError::new("smtp_credentials_required");
                    err.message = Some(
                        "The SMTP transport requires APP__EMAIL__SMTP_HOST, APP__EMAIL__SMTP_USERNAME and APP__EMAIL__SMTP_PASSWORD".into(),
                    );
                    errors.add("email", err);
                }
            }
            _ => {}
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
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Default value functions
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_payment_api_base() -> String {
    DEFAULT_PAYMENT_API_BASE.to_string()
}

fn default_frontend_base_url() -> String {
    DEV_DEFAULT_FRONTEND_URL.to_string()
}

fn default_currency() -> String {
    "eur".to_string()
}

fn default_email_transport() -> String {
    DEFAULT_EMAIL_TRANSPORT.to_string()
}

fn default_email_api_base() -> String {
    DEFAULT_EMAIL_API_BASE.to_string()
}

fn default_email_from() -> String {
    "Boxoffice <tickets@boxoffice.local>".to_string()
}

fn default_smtp_port() -> u16 {
    587
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_db_max_connections() -> u32 {
    16
}
fn default_db_min_connections() -> u32 {
    2
}
fn default_db_connect_timeout_secs() -> u64 {
    30
}
fn default_db_idle_timeout_secs() -> u64 {
    600
}
fn default_db_acquire_timeout_secs() -> u64 {
    8
}
fn default_false_bool() -> bool {
    false
}

fn default_event_channel_capacity() -> usize {
    1024
}

fn validate_email_transport(value: &str) -> Result<(), ValidationError> {
    match value.to_ascii_lowercase().as_str() {
        "api" | "smtp" => Ok(()),
        _ => {
            let mut err = ValidationError::new("email_transport");
            err.message = Some("Must be one of: api, smtp".into());
            Err(err)
        }
    }
}

fn validate_provider_secret(secret: &str) -> Result<(), ValidationError> {
    let trimmed = secret.trim();

    // Reject known insecure defaults and obvious placeholders
    const DISALLOWED: [&str; 4] = [
        "CHANGE_THIS_SECRET_IN_PRODUCTION",
        "INSECURE_DEFAULT_DO_NOT_USE_IN_PRODUCTION",
        "your-secret-key",
        "default-secret-key",
    ];
    if DISALLOWED
        .iter()
        .any(|&bad| trimmed.eq_ignore_ascii_case(bad))
    {
        let mut err = ValidationError::new("provider_secret");
        err.message = Some("Provider secret must be overridden with the real deployment value".into());
        return Err(err);
    }

    if let Some(first) = trimmed.chars().next() {
        if trimmed.chars().all(|c| c == first) {
            let mut err = ValidationError::new("provider_secret");
            err.message = Some("Provider secret cannot be a repeated character sequence".into());
            return Err(err);
        }
    }

    Ok(())
}

fn validate_event_channel_capacity(capacity: usize) -> Result<(), ValidationError> {
    if capacity == 0 {
        let mut err = ValidationError::new("event_channel_capacity");
        err.message = Some("event_channel_capacity must be greater than 0".into());
        return Err(err);
    }
    Ok(())
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("boxoffice_api={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt().with_env_filter(filter_directive).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter_directive).try_init();
    }
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Default config (config/default.toml)
/// 2. Environment-specific config (config/{env}.toml)
/// 3. Environment variables (APP__*)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    // Support both RUN_ENV and APP_ENV for selecting config profile
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

    // NOTE: the payment secrets have no defaults - they MUST be provided via
    // environment variables or a config file. This prevents a deployment from
    // silently accepting unsigned webhooks or shipping without a provider key.
    let builder = Config::builder()
        .set_default("database_url", "sqlite://boxoffice.db?mode=rwc")?
        .set_default("host", "0.0.0.0")?
        .set_default("port", DEFAULT_PORT as i64)?
        .set_default("environment", DEFAULT_ENV)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false));

    let config = builder
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    // Check for the payment secrets before deserialization to give clear errors
    for (key, env_name) in [
        ("payment_secret_key", "APP__PAYMENT_SECRET_KEY"),
        ("payment_webhook_secret", "APP__PAYMENT_WEBHOOK_SECRET"),
    ] {
        if config.get_string(key).is_err() {
            error!(
                "{} is not configured. Set the {} environment variable.",
                key, env_name
            );
            return Err(AppConfigError::Load(ConfigError::NotFound(format!(
                "{} is required but not configured. Set the {} environment variable.",
                key, env_name
            ))));
        }
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
mod validation_tests {
    use super::*;

    fn base_config() -> AppConfig {
        AppConfig {
            database_url: "sqlite::memory:".into(),
            host: "127.0.0.1".into(),
            port: 8080,
            environment: "production".into(),
            log_level: default_log_level(),
            log_json: false,
            payment_secret_key: "sk_test_4eC39HqLyjWDarjtT1zdp7dc".into(),
            payment_webhook_secret: "whsec_8f2a61c4d5e6".into(),
            payment_webhook_tolerance_secs: None,
            payment_api_base: default_payment_api_base(),
            frontend_base_url: "https://tickets.example.com".into(),
            default_currency: default_currency(),
            email: EmailConfig {
                api_key: Some("re_test_key".into()),
                ..Default::default()
            },
            auto_migrate: false,
            cors_allowed_origins: None,
            cors_allow_any_origin: false,
            cors_allow_credentials: false,
            request_timeout_secs: default_request_timeout_secs(),
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            db_connect_timeout_secs: default_db_connect_timeout_secs(),
            db_idle_timeout_secs: default_db_idle_timeout_secs(),
            db_acquire_timeout_secs: default_db_acquire_timeout_secs(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }

    #[test]
    fn non_dev_requires_cors_origins() {
        let cfg = base_config();
        assert!(cfg.validate_additional_constraints().is_err());
    }

    #[test]
    fn non_dev_allows_override_flag() {
        let mut cfg = base_config();
        cfg.cors_allow_any_origin = true;
        assert!(cfg.validate_additional_constraints().is_ok());
    }

    #[test]
    fn non_dev_with_origins_passes() {
        let mut cfg = base_config();
        cfg.cors_allowed_origins = Some("https://tickets.example.com".into());
        assert!(cfg.validate_additional_constraints().is_ok());
    }

    #[test]
    fn development_allows_permissive_by_default() {
        let mut cfg = base_config();
        cfg.environment = "development".into();
        assert!(cfg.validate_additional_constraints().is_ok());
    }

    #[test]
    fn non_dev_rejects_default_frontend_url() {
        let mut cfg = base_config();
        cfg.cors_allow_any_origin = true;
        cfg.frontend_base_url = DEV_DEFAULT_FRONTEND_URL.into();
        assert!(cfg.validate_additional_constraints().is_err());
    }

    #[test]
    fn api_transport_requires_api_key() {
        let mut cfg = base_config();
        cfg.cors_allow_any_origin = true;
        cfg.email.api_key = None;
        assert!(cfg.validate_additional_constraints().is_err());
    }

    #[test]
    fn smtp_transport_requires_credentials() {
        let mut cfg = base_config();
        cfg.cors_allow_any_origin = true;
        cfg.email.transport = "smtp".into();
        cfg.email.api_key = None;
        assert!(cfg.validate_additional_constraints().is_err());

        cfg.email.smtp_host = Some("smtp.example.com".into());
        cfg.email.smtp_username = Some("mailer".into());
        cfg.email.smtp_password = Some("hunter2hunter2".into());
        assert!(cfg.validate_additional_constraints().is_ok());
    }

    #[test]
    fn placeholder_secrets_are_rejected() {
        assert!(validate_provider_secret("your-secret-key").is_err());
        assert!(validate_provider_secret("aaaaaaaaaaaaaaaa").is_err());
        assert!(validate_provider_secret("whsec_8f2a61c4d5e6").is_ok());
    }

    #[test]
    fn redirect_targets_derive_from_frontend_url() {
        let cfg = base_config();
        assert_eq!(
            cfg.checkout_cancel_url(),
            "https://tickets.example.com/checkout/cancelled"
        );
        assert!(cfg
            .checkout_success_url()
            .starts_with("https://tickets.example.com/checkout/success"));
    }
}
