use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info, warn};
use validator::{Validate, ValidationError, ValidationErrors};

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEFAULT_TIMEZONE: &str = "America/Los_Angeles";
const DEFAULT_WEBHOOK_EVENT_TTL_SECS: u64 = 24 * 3600;
const DEV_DEFAULT_ADMIN_KEY: &str = "dev-admin-key-do-not-use-in-production";

/// Application configuration with validation.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
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

    /// Public base URL of the site (redirect targets, webhook URL
    /// reconstruction for signature checks)
    pub public_base_url: String,

    /// Stripe secret API key
    #[validate(length(min = 1))]
    pub stripe_secret_key: String,

    /// Stripe webhook signing secret. Always required: the payment webhook
    /// has no development bypass.
    #[validate(length(min = 1))]
    pub stripe_webhook_secret: String,

    /// Stripe webhook timestamp tolerance (seconds)
    #[serde(default)]
    pub stripe_webhook_tolerance_secs: Option<u64>,

    /// Cal.com webhook signing secret; verification is skipped with a
    /// warning when unset (development only).
    #[serde(default)]
    pub cal_webhook_secret: Option<String>,

    /// Twilio credentials; SMS sends degrade to a failed outcome when unset.
    #[serde(default)]
    pub twilio_account_sid: Option<String>,
    #[serde(default)]
    pub twilio_auth_token: Option<String>,
    #[serde(default)]
    pub twilio_phone_number: Option<String>,

    /// Static API key guarding the admin SMS endpoint
    #[validate(length(min = 1))]
    pub admin_api_key: String,

    /// IANA timezone used when a booking payload carries none
    #[serde(default = "default_timezone")]
    pub default_timezone: String,

    /// Retention window for the processed-webhook-event dedup store
    #[serde(default = "default_webhook_event_ttl_secs")]
    pub webhook_event_ttl_secs: u64,

    /// CORS: comma-separated list of allowed origins (production)
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    /// Allow permissive CORS fallback outside development
    #[serde(default)]
    pub cors_allow_any_origin: bool,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}
fn default_timezone() -> String {
    DEFAULT_TIMEZONE.to_string()
}
fn default_webhook_event_ttl_secs() -> u64 {
    DEFAULT_WEBHOOK_EVENT_TTL_SECS
}

impl AppConfig {
    /// Minimal constructor used by tests and tooling.
    pub fn new(
        host: String,
        port: u16,
        environment: String,
        public_base_url: String,
        stripe_secret_key: String,
        stripe_webhook_secret: String,
        admin_api_key: String,
    ) -> Self {
        Self {
            host,
            port,
            environment,
            log_level: default_log_level(),
            log_json: false,
            public_base_url,
            stripe_secret_key,
            stripe_webhook_secret,
            stripe_webhook_tolerance_secs: None,
            cal_webhook_secret: None,
            twilio_account_sid: None,
            twilio_auth_token: None,
            twilio_phone_number: None,
            admin_api_key,
            default_timezone: default_timezone(),
            webhook_event_ttl_secs: default_webhook_event_ttl_secs(),
            cors_allowed_origins: None,
            cors_allow_any_origin: false,
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    pub fn has_cors_allowed_origins(&self) -> bool {
        self.cors_allowed_origins
            .as_ref()
            .map(|raw| raw.split(',').any(|origin| !origin.trim().is_empty()))
            .unwrap_or(false)
    }

    pub fn should_allow_permissive_cors(&self) -> bool {
        self.is_development() || self.cors_allow_any_origin
    }

    pub fn has_twilio_credentials(&self) -> bool {
        matches!(
            (
                &self.twilio_account_sid,
                &self.twilio_auth_token,
                &self.twilio_phone_number,
            ),
            (Some(sid), Some(token), Some(from))
                if !sid.is_empty() && !token.is_empty() && !from.is_empty()
        )
    }

    /// The public URL Twilio signs inbound webhook requests against.
    pub fn twilio_webhook_url(&self) -> String {
        format!(
            "{}/api/webhooks/twilio",
            self.public_base_url.trim_end_matches('/')
        )
    }

    /// Constraints that cannot be expressed with field-level validators.
    pub fn validate_additional_constraints(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if !self.is_development() && self.admin_api_key.trim() == DEV_DEFAULT_ADMIN_KEY {
            let mut err = ValidationError::new("admin_api_key_default_dev");
            err.message = Some(
                "The bundled development admin key must not be used outside development. \
                 Set APP__ADMIN_API_KEY to a unique, secure value."
                    .into(),
            );
            errors.add("admin_api_key", err);
        }

        if self.default_timezone.parse::<chrono_tz::Tz>().is_err() {
            let mut err = ValidationError::new("default_timezone_invalid");
            err.message = Some("default_timezone must be a valid IANA timezone name".into());
            errors.add("default_timezone", err);
        }

        if self.is_production() && self.cal_webhook_secret.is_none() {
            // Unsigned scheduling webhooks are a hardening gap; surface it
            // loudly but allow startup (the receiver logs every skipped check).
            warn!("cal_webhook_secret is not set in production; scheduling webhooks will be accepted unsigned");
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }
}

#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ConfigError),
    #[error("configuration validation failed: {0}")]
    Validation(#[from] ValidationErrors),
}

/// Loads configuration from `config/{default,<env>}` files with `APP__`
/// environment-variable overrides layered on top.
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

    // NOTE: stripe keys and the admin key have no defaults - they MUST come
    // from the environment or a config file.
    let builder = Config::builder()
        .set_default("host", "0.0.0.0")?
        .set_default("port", i64::from(DEFAULT_PORT))?
        .set_default("environment", DEFAULT_ENV)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .set_default("public_base_url", "http://localhost:8080")?
        .set_default("default_timezone", DEFAULT_TIMEZONE)?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false));

    let config = builder
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    if config.get_string("stripe_secret_key").is_err() {
        error!("Stripe secret key is not configured. Set APP__STRIPE_SECRET_KEY.");
        return Err(AppConfigError::Load(ConfigError::NotFound(
            "stripe_secret_key is required but not configured".into(),
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

    Ok(app_config)
}

/// Initializes the global tracing subscriber.
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let default_directive = format!("lumiere_api={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    let filter = EnvFilter::try_new(filter_directive)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .init();
    }
}
