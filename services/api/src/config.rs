//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::time::Duration;
use tracing::Level;

/// How long a call to the RAG service may take. The hosted service sleeps when idle
/// and can need most of a minute to wake up.
pub const AI_SERVICE_TIMEOUT: Duration = Duration::from_secs(60);

const DEFAULT_AI_SERVICE_URL: &str = "http://127.0.0.1:8000";
const DEV_JWT_SECRET: &str = "dev-only-secret-change-me";

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    /// Base URL of the RAG service, always carrying a scheme and no trailing slash.
    pub ai_service_url: String,
    pub jwt_secret: String,
    /// The single browser origin allowed by CORS. `None` allows any origin.
    pub frontend_origin: Option<String>,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Server and Database Settings ---
        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:5000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Load Upstream and Auth Settings ---
        let ai_service_url = normalize_base_url(
            &std::env::var("AI_SERVICE_URL").unwrap_or_else(|_| DEFAULT_AI_SERVICE_URL.to_string()),
        );

        let jwt_secret =
            non_empty_var("JWT_SECRET").unwrap_or_else(|| DEV_JWT_SECRET.to_string());

        let frontend_origin = non_empty_var("FRONTEND_URL");

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            ai_service_url,
            jwt_secret,
            frontend_origin,
        })
    }

    /// True when `JWT_SECRET` was unset and tokens are signed with the development secret.
    pub fn uses_dev_jwt_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Prepends `https://` when the value carries no scheme, and strips trailing slashes.
pub fn normalize_base_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    }
}
