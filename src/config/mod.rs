//! Configuration management for the forex request backend
//!
//! This module handles loading and validating configuration from environment variables,
//! with support for different environments (development, staging, production).
//! The resulting [`Config`] is built once at start-up and handed to every component.

use std::env;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_JWT_SECRET: &str = "development-secret-change-in-production";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid environment value: {0}")]
    InvalidValue(String),

    #[error("Invalid port number: {0}")]
    InvalidPort(String),
}

/// Application environment
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    /// Parse environment from string
    pub fn from_str(s: &str) -> Result<Self, ConfigError> {
        match s.to_lowercase().as_str() {
            "dev" | "development" => Ok(Environment::Development),
            "staging" => Ok(Environment::Staging),
            "prod" | "production" => Ok(Environment::Production),
            _ => Err(ConfigError::InvalidValue(format!(
                "Invalid environment: '{}'. Expected: dev, staging, or prod",
                s
            ))),
        }
    }

    /// Check if this is a production environment
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    /// Get the environment name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Current environment
    pub environment: Environment,

    /// Postgres URL. `None` selects the in-memory document store.
    pub database_url: Option<String>,

    /// Server port
    pub port: u16,

    /// Maximum database connections
    pub db_max_connections: u32,

    /// Rate limit: requests per second per client
    pub rate_limit_rps: u32,

    /// Key rate limiting on `X-Forwarded-For` / `X-Real-IP` instead of the peer
    pub trust_proxy_headers: bool,

    /// CORS allowed origins, comma separated
    pub cors_allowed_origins: Option<String>,

    /// Log level (RUST_LOG)
    pub log_level: String,

    /// JWT secret for token signing
    pub jwt_secret: String,

    /// Access token TTL in seconds (default: 86400 = 24 hours)
    pub jwt_ttl_seconds: i64,

    /// bcrypt work factor
    pub bcrypt_cost: u32,

    /// Directory attachments are written to
    pub upload_dir: PathBuf,

    /// URL prefix under which stored attachments are served
    pub public_file_base_url: String,

    /// Multipart body limit in bytes
    pub max_upload_bytes: usize,

    /// Deadline for every service-level operation
    pub usecase_timeout: Duration,

    /// HTTP mail relay endpoint. `None` logs emails instead of sending them.
    pub mail_api_url: Option<String>,

    /// Sender address for notifications
    pub mail_from: String,

    /// Administrator account created at start-up when missing
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            database_url: None,
            port: 3001,
            db_max_connections: 5,
            rate_limit_rps: 100,
            trust_proxy_headers: false,
            cors_allowed_origins: None,
            log_level: "info".to_string(),
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            jwt_ttl_seconds: 86_400,
            bcrypt_cost: bcrypt::DEFAULT_COST,
            upload_dir: PathBuf::from("./uploads"),
            public_file_base_url: "/files".to_string(),
            max_upload_bytes: 10 * 1024 * 1024,
            usecase_timeout: Duration::from_secs(10),
            mail_api_url: None,
            mail_from: "noreply@forex.local".to_string(),
            admin_username: None,
            admin_password: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors)
        dotenvy::dotenv().ok();

        let defaults = Config::default();

        let environment = env::var("ENVIRONMENT")
            .map(|s| Environment::from_str(&s))
            .unwrap_or(Ok(Environment::Development))?;

        let database_url = env::var("DATABASE_URL").ok().filter(|url| !url.is_empty());

        let port = env::var("PORT")
            .unwrap_or_else(|_| "3001".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort("PORT must be a valid number".to_string()))?;

        let db_max_connections = env::var("DB_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "5".to_string())
            .parse::<u32>()
            .unwrap_or(defaults.db_max_connections);

        let rate_limit_rps = env::var("RATE_LIMIT_RPS")
            .unwrap_or_else(|_| "100".to_string())
            .parse::<u32>()
            .unwrap_or(defaults.rate_limit_rps);

        let trust_proxy_headers = env::var("TRUST_PROXY_HEADERS")
            .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(defaults.trust_proxy_headers);

        let cors_allowed_origins = env::var("CORS_ALLOWED_ORIGINS").ok();

        let log_level = env::var("RUST_LOG").unwrap_or(defaults.log_level);

        let jwt_secret = env::var("JWT_SECRET").unwrap_or(defaults.jwt_secret);

        let jwt_ttl_seconds = env::var("JWT_TTL_SECONDS")
            .unwrap_or_else(|_| "86400".to_string())
            .parse::<i64>()
            .unwrap_or(defaults.jwt_ttl_seconds);

        let bcrypt_cost = match env::var("BCRYPT_COST") {
            Ok(raw) => raw
                .parse::<u32>()
                .ok()
                .filter(|cost| (4..=31).contains(cost))
                .ok_or_else(|| {
                    ConfigError::InvalidValue(format!("BCRYPT_COST must be 4..=31, got '{}'", raw))
                })?,
            Err(_) => defaults.bcrypt_cost,
        };

        let upload_dir = env::var("UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.upload_dir);

        let public_file_base_url = env::var("PUBLIC_FILE_BASE_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or(defaults.public_file_base_url);

        let max_upload_bytes = env::var("MAX_UPLOAD_BYTES")
            .ok()
            .and_then(|raw| raw.parse::<usize>().ok())
            .unwrap_or(defaults.max_upload_bytes);

        let usecase_timeout = env::var("USECASE_TIMEOUT_SECONDS")
            .ok()
            .and_then(|raw| raw.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(defaults.usecase_timeout);

        let mail_api_url = env::var("MAIL_API_URL").ok().filter(|url| !url.is_empty());

        let mail_from = env::var("MAIL_FROM").unwrap_or(defaults.mail_from);

        let admin_username = env::var("ADMIN_USERNAME").ok().filter(|v| !v.trim().is_empty());
        let admin_password = env::var("ADMIN_PASSWORD").ok().filter(|v| !v.is_empty());

        let config = Config {
            environment,
            database_url,
            port,
            db_max_connections,
            rate_limit_rps,
            trust_proxy_headers,
            cors_allowed_origins,
            log_level,
            jwt_secret,
            jwt_ttl_seconds,
            bcrypt_cost,
            upload_dir,
            public_file_base_url,
            max_upload_bytes,
            usecase_timeout,
            mail_api_url,
            mail_from,
            admin_username,
            admin_password,
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject settings that are only acceptable outside production
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.admin_username.is_some() != self.admin_password.is_some() {
            return Err(ConfigError::InvalidValue(
                "ADMIN_USERNAME and ADMIN_PASSWORD must be set together".to_string(),
            ));
        }

        if !self.environment.is_production() {
            return Ok(());
        }

        if self.database_url.is_none() {
            return Err(ConfigError::MissingEnvVar("DATABASE_URL".to_string()));
        }

        if self.jwt_secret == DEFAULT_JWT_SECRET {
            return Err(ConfigError::InvalidValue(
                "JWT_SECRET must be set in production".to_string(),
            ));
        }

        Ok(())
    }

    /// Bootstrap administrator credentials, when both are configured
    pub fn bootstrap_admin(&self) -> Option<(&str, &str)> {
        Some((self.admin_username.as_deref()?, self.admin_password.as_deref()?))
    }

    /// Database URL with the password masked, for logging
    pub fn database_url_masked(&self) -> String {
        let Some(url) = self.database_url.as_deref() else {
            return "<in-memory>".to_string();
        };

        if let Some(at_pos) = url.find('@') {
            if let Some(colon_pos) = url[..at_pos].rfind(':') {
                let prefix = &url[..colon_pos + 1];
                let suffix = &url[at_pos..];
                return format!("{}****{}", prefix, suffix);
            }
        }
        url.to_string()
    }
}
