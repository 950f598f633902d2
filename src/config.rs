use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEFAULT_WALLET_BALANCE: &str = "0.88";
const DEFAULT_PAYSTACK_BASE_URL: &str = "https://api.paystack.co";
const DEFAULT_CURRENCY: &str = "GHS";
const DEFAULT_GATEWAY_TIMEOUT_MS: u64 = 30_000;

/// Legacy environment variable carrying the gateway secret.
pub const PAYSTACK_SECRET_ENV: &str = "PAYSTACK_SECRET_KEY";

/// Paystack gateway settings
#[derive(Clone, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct PaystackConfig {
    /// Secret API key. Absence is only reported when the gateway is first used.
    #[serde(default)]
    pub secret_key: Option<String>,

    /// Base URL of the Paystack API
    #[serde(default = "default_paystack_base_url")]
    #[validate(url)]
    pub base_url: String,

    /// ISO currency sent with every transaction
    #[serde(default = "default_currency")]
    #[validate(length(equal = 3))]
    pub currency: String,

    /// Request timeout for gateway calls (milliseconds)
    #[serde(default = "default_gateway_timeout_ms")]
    #[validate(custom = "validate_timeout")]
    pub timeout_ms: u64,
}

impl Default for PaystackConfig {
    fn default() -> Self {
        Self {
            secret_key: None,
            base_url: default_paystack_base_url(),
            currency: default_currency(),
            timeout_ms: default_gateway_timeout_ms(),
        }
    }
}

impl std::fmt::Debug for PaystackConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaystackConfig")
            .field("secret_key", &self.secret_key.as_ref().map(|_| "***"))
            .field("base_url", &self.base_url)
            .field("currency", &self.currency)
            .field("timeout_ms", &self.timeout_ms)
            .finish()
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

    /// Server port (1024-65535)
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
    #[serde(default = "default_true_bool")]
    pub auto_migrate: bool,

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

    /// Externally visible base URL, used to build the gateway callback URL.
    /// Falls back to the request's Host header when unset.
    #[serde(default)]
    #[validate(url)]
    pub public_base_url: Option<String>,

    /// Balance shown on the dashboard; display only
    #[serde(default = "default_wallet_balance")]
    pub wallet_balance: String,

    /// Payment gateway settings
    #[serde(default)]
    #[validate]
    pub paystack: PaystackConfig,
}

impl AppConfig {
    /// Creates a new configuration with defaults for everything but the essentials
    pub fn new(database_url: String, host: String, port: u16, environment: String) -> Self {
        Self {
            database_url,
            host,
            port,
            environment,
            log_level: default_log_level(),
            log_json: false,
            auto_migrate: true,
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            db_connect_timeout_secs: default_db_connect_timeout_secs(),
            db_idle_timeout_secs: default_db_idle_timeout_secs(),
            db_acquire_timeout_secs: default_db_acquire_timeout_secs(),
            public_base_url: None,
            wallet_balance: default_wallet_balance(),
            paystack: PaystackConfig::default(),
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

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_true_bool() -> bool {
    true
}

fn default_db_max_connections() -> u32 {
    8
}
fn default_db_min_connections() -> u32 {
    1
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

fn default_wallet_balance() -> String {
    DEFAULT_WALLET_BALANCE.to_string()
}

fn default_paystack_base_url() -> String {
    DEFAULT_PAYSTACK_BASE_URL.to_string()
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

fn default_gateway_timeout_ms() -> u64 {
    DEFAULT_GATEWAY_TIMEOUT_MS
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

fn validate_timeout(timeout_ms: u64) -> Result<(), ValidationError> {
    if timeout_ms == 0 {
        let mut err = ValidationError::new("timeout_ms");
        err.message = Some("Gateway timeout must be greater than 0".into());
        return Err(err);
    }
    Ok(())
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("cds_storefront={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt()
            .with_env_filter(EnvFilter::new(filter_directive))
            .json()
            .try_init();
    } else {
        let _ = fmt()
            .with_env_filter(EnvFilter::new(filter_directive))
            .try_init();
    }
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults
/// 2. Default config (config/default.toml)
/// 3. Environment-specific config (config/{env}.toml)
/// 4. Environment variables (APP__*), plus `PAYSTACK_SECRET_KEY`
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

    let legacy_secret = env::var(PAYSTACK_SECRET_ENV)
        .ok()
        .filter(|value| !value.trim().is_empty());

    let config = Config::builder()
        .set_default("database_url", "sqlite://cds_storefront.db?mode=rwc")?
        .set_default("host", "0.0.0.0")?
        .set_default("port", i64::from(DEFAULT_PORT))?
        .set_default("environment", DEFAULT_ENV)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .set_override_option("paystack.secret_key", legacy_secret)?
        .build()?;

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    if app_config.paystack.secret_key.is_none() {
        // Not fatal here; checkout and callback report it on first use.
        tracing::warn!("{} is not set; payment routes will fail", PAYSTACK_SECRET_ENV);
    }

    info!("Configuration loaded successfully");
    Ok(app_config)
}
