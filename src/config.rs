//! Application configuration.
//!
//! Sources are layered: built-in defaults, then `config/default.toml`,
//! then `config/{RUN_ENV}.toml`, then `APP__*` environment variables.
//! Outside development the JWT secret has no default and must be set.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info, warn};
use validator::{Validate, ValidationError, ValidationErrors};

const CONFIG_ROOT: &str = "config";
const FALLBACK_ENV: &str = "development";

/// Signing key used when development runs without `APP__JWT_SECRET`.
/// Validation refuses to let it leave the development environment.
const DEV_JWT_SECRET: &str =
    "dev_only_marketplace_jwt_signing_key_not_for_real_deployments_0k9f3q7w1x";

#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    // Server
    pub host: String,
    #[serde(default = "defaults::port")]
    pub port: u16,
    /// `development` or `production`; gates the CORS fallback.
    pub environment: String,

    // Database
    pub database_url: String,
    #[serde(default = "defaults::db_max_connections")]
    pub db_max_connections: u32,
    #[serde(default = "defaults::db_min_connections")]
    pub db_min_connections: u32,
    #[serde(default = "defaults::db_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,
    #[serde(default = "defaults::db_idle_timeout_secs")]
    pub db_idle_timeout_secs: u64,
    #[serde(default = "defaults::db_acquire_timeout_secs")]
    pub db_acquire_timeout_secs: u64,
    /// Run embedded migrations on startup.
    #[serde(default = "defaults::enabled")]
    pub auto_migrate: bool,

    // Auth
    #[validate(length(min = 64), custom = "jwt_secret_strength")]
    pub jwt_secret: String,
    /// Access token lifetime in seconds.
    pub jwt_expiration: usize,

    // CORS
    /// Comma-separated allowed origins. Required outside development
    /// unless `cors_allow_any_origin` is set.
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,
    #[serde(default)]
    pub cors_allow_any_origin: bool,

    // Storage
    /// Directory payment proofs are written under.
    #[serde(default = "defaults::uploads_dir")]
    pub uploads_dir: String,

    // Events
    #[serde(default = "defaults::event_channel_capacity")]
    #[validate(custom = "nonzero_capacity")]
    pub event_channel_capacity: usize,

    // Logging
    #[serde(default = "defaults::log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_json: bool,
}

mod defaults {
    pub fn port() -> u16 {
        8080
    }
    pub fn db_max_connections() -> u32 {
        16
    }
    pub fn db_min_connections() -> u32 {
        2
    }
    pub fn db_connect_timeout_secs() -> u64 {
        30
    }
    pub fn db_idle_timeout_secs() -> u64 {
        600
    }
    pub fn db_acquire_timeout_secs() -> u64 {
        8
    }
    pub fn enabled() -> bool {
        true
    }
    pub fn uploads_dir() -> String {
        "uploads".to_string()
    }
    pub fn event_channel_capacity() -> usize {
        1024
    }
    pub fn log_level() -> String {
        "info".to_string()
    }
}

impl AppConfig {
    /// Builds a config from the required values, everything else at
    /// its default. Used by tests and tools that skip `load_config`.
    pub fn new(
        database_url: String,
        jwt_secret: String,
        jwt_expiration: usize,
        host: String,
        port: u16,
        environment: String,
    ) -> Self {
        Self {
            host,
            port,
            environment,
            database_url,
            db_max_connections: defaults::db_max_connections(),
            db_min_connections: defaults::db_min_connections(),
            db_connect_timeout_secs: defaults::db_connect_timeout_secs(),
            db_idle_timeout_secs: defaults::db_idle_timeout_secs(),
            db_acquire_timeout_secs: defaults::db_acquire_timeout_secs(),
            auto_migrate: true,
            jwt_secret,
            jwt_expiration,
            cors_allowed_origins: None,
            cors_allow_any_origin: false,
            uploads_dir: defaults::uploads_dir(),
            event_channel_capacity: defaults::event_channel_capacity(),
            log_level: defaults::log_level(),
            log_json: false,
        }
    }

    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    /// Permissive CORS is the development default and an explicit
    /// opt-in everywhere else.
    pub fn allows_any_origin(&self) -> bool {
        self.is_development() || self.cors_allow_any_origin
    }

    fn has_explicit_cors_origins(&self) -> bool {
        match self.cors_allowed_origins.as_deref() {
            Some(raw) => raw.split(',').map(str::trim).any(|o| !o.is_empty()),
            None => false,
        }
    }

    /// Cross-field rules that `derive(Validate)` cannot express.
    fn check_cross_field_rules(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if !self.allows_any_origin() && !self.has_explicit_cors_origins() {
            errors.add(
                "cors_allowed_origins",
                rule_violation(
                    "cors_origins_required",
                    "Set APP__CORS_ALLOWED_ORIGINS outside development, or opt in to permissive CORS with APP__CORS_ALLOW_ANY_ORIGIN=true",
                ),
            );
        }

        if !self.is_development() && self.jwt_secret.trim() == DEV_JWT_SECRET {
            errors.add(
                "jwt_secret",
                rule_violation(
                    "jwt_secret_is_dev_default",
                    "The bundled development JWT secret must not leave development; set APP__JWT_SECRET to a strong random value",
                ),
            );
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn rule_violation(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

fn jwt_secret_strength(secret: &str) -> Result<(), ValidationError> {
    let trimmed = secret.trim();

    if trimmed.len() < 64 {
        return Err(rule_violation(
            "jwt_secret",
            "JWT secret must be at least 64 characters",
        ));
    }

    let distinct: std::collections::HashSet<char> = trimmed.chars().collect();
    if distinct.len() < 10 {
        return Err(rule_violation(
            "jwt_secret",
            "JWT secret needs at least 10 distinct characters",
        ));
    }

    let lowered = trimmed.to_ascii_lowercase();
    for fragment in ["changeme", "password", "default", "12345"] {
        if lowered.contains(fragment) {
            return Err(rule_violation(
                "jwt_secret",
                "JWT secret looks guessable; use a cryptographically random string",
            ));
        }
    }

    Ok(())
}

fn nonzero_capacity(capacity: usize) -> Result<(), ValidationError> {
    if capacity == 0 {
        return Err(rule_violation(
            "event_channel_capacity",
            "event_channel_capacity must be greater than 0",
        ));
    }
    Ok(())
}

#[derive(Debug, Error)]
pub enum ConfigInitError {
    #[error("configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise the configured level applies to
/// this crate and `tower_http` gets debug spans.
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("marketplace_api={},tower_http=debug", level))
    });

    let builder = fmt().with_env_filter(filter);
    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    // try_init fails when a subscriber is already installed (tests)
    let _ = result;
}

pub fn load_config() -> Result<AppConfig, ConfigInitError> {
    let run_env = ["RUN_ENV", "APP_ENV"]
        .iter()
        .find_map(|key| env::var(key).ok())
        .unwrap_or_else(|| FALLBACK_ENV.to_string());
    info!(environment = %run_env, "Loading configuration");

    if !Path::new(CONFIG_ROOT).exists() {
        info!(
            "No '{}' directory; using built-in defaults and environment variables",
            CONFIG_ROOT
        );
    }

    let mut builder = Config::builder()
        .set_default("host", "0.0.0.0")?
        .set_default("environment", FALLBACK_ENV)?
        .set_default("database_url", "sqlite://marketplace.db?mode=rwc")?
        .set_default("jwt_expiration", 3600)?;
    if run_env.eq_ignore_ascii_case("development") {
        builder = builder.set_default("jwt_secret", DEV_JWT_SECRET)?;
    }

    let raw = builder
        .add_source(File::with_name(&format!("{}/default", CONFIG_ROOT)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_ROOT, run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    match raw.get_string("jwt_secret") {
        Ok(secret) if secret == DEV_JWT_SECRET => {
            warn!("Using the built-in development JWT secret; tokens are forgeable");
        }
        Ok(_) => {}
        Err(_) => {
            error!(
                "JWT secret is not configured; set APP__JWT_SECRET (generate one with: openssl rand -base64 64)"
            );
            return Err(ConfigInitError::Load(ConfigError::NotFound(
                "jwt_secret is required; set APP__JWT_SECRET".into(),
            )));
        }
    }

    let app_config: AppConfig = raw.try_deserialize()?;

    let checked = app_config
        .validate()
        .and_then(|_| app_config.check_cross_field_rules());
    if let Err(e) = checked {
        error!("Rejecting invalid configuration: {:?}", e);
        return Err(e.into());
    }

    info!("Configuration loaded");
    Ok(app_config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn production_config() -> AppConfig {
        AppConfig::new(
            "sqlite://marketplace.db?mode=memory".into(),
            "fR7mQ2xZ9pL4vN8bK3wJ6tY1sD5gH0cE_secure_enough_for_unit_tests_here".into(),
            3600,
            "127.0.0.1".into(),
            8080,
            "production".into(),
        )
    }

    #[test]
    fn production_requires_cors_origins() {
        let cfg = production_config();
        assert!(cfg.check_cross_field_rules().is_err());
    }

    #[test]
    fn production_accepts_explicit_origins() {
        let mut cfg = production_config();
        cfg.cors_allowed_origins = Some("https://shop.example.com".into());
        assert!(cfg.check_cross_field_rules().is_ok());
    }

    #[test]
    fn production_accepts_permissive_override() {
        let mut cfg = production_config();
        cfg.cors_allow_any_origin = true;
        assert!(cfg.check_cross_field_rules().is_ok());
    }

    #[test]
    fn development_is_permissive_by_default() {
        let mut cfg = production_config();
        cfg.environment = "development".into();
        assert!(cfg.check_cross_field_rules().is_ok());
    }

    #[test]
    fn dev_secret_is_rejected_outside_development() {
        let mut cfg = production_config();
        cfg.cors_allow_any_origin = true;
        cfg.jwt_secret = DEV_JWT_SECRET.to_string();
        assert!(cfg.check_cross_field_rules().is_err());
    }

    #[test]
    fn jwt_secret_strength_rules() {
        assert!(jwt_secret_strength("short").is_err());
        assert!(jwt_secret_strength(&"ab".repeat(40)).is_err());
        let weak = format!("password{}", "abcdefghij".repeat(7));
        assert!(jwt_secret_strength(&weak).is_err());
        assert!(jwt_secret_strength(
            "fR7mQ2xZ9pL4vN8bK3wJ6tY1sD5gH0cE_secure_enough_for_unit_tests_here"
        )
        .is_ok());
    }
}
