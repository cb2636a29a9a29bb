//! Application configuration
//!
//! All configuration is read once from the environment at process start and
//! carried in an immutable [`AppConfig`] that is passed by reference into the
//! components that need it. Nothing reads environment variables after startup.

use std::path::PathBuf;

use crate::error::{Error, Result};

/// Environment variable for the database file path
pub const DB_PATH_ENV: &str = "CASHFLOW_DB";

/// Environment variable for the JWT signing secret
pub const JWT_SECRET_ENV: &str = "CASHFLOW_JWT_SECRET";

/// Environment variable for access-token lifetime in minutes
pub const TOKEN_EXPIRE_ENV: &str = "CASHFLOW_TOKEN_EXPIRE_MINUTES";

/// Default access-token lifetime
pub const DEFAULT_TOKEN_EXPIRE_MINUTES: i64 = 30;

/// OpenAI-compatible API settings for the AI assistant
#[derive(Debug, Clone)]
pub struct AiConfig {
    /// API key sent as a bearer token
    pub api_key: String,
    /// Model name, e.g. "gpt-4o-mini"
    pub model: String,
    /// Base URL of the chat-completions API
    pub base_url: String,
}

impl AiConfig {
    /// Build from `OPENAI_API_KEY` / `OPENAI_MODEL` / `OPENAI_BASE_URL`.
    ///
    /// Returns `None` when no API key is configured; the AI assistant is an
    /// optional feature and everything else works without it.
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").ok()?;
        if api_key.trim().is_empty() {
            return None;
        }
        Some(Self {
            api_key,
            model: std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            base_url: std::env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
        })
    }
}

/// Immutable application configuration, built once at startup
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Path to the SQLite database file
    pub database_path: String,
    /// HMAC secret for JWT signing (HS256)
    pub jwt_secret: String,
    /// Access-token lifetime in minutes
    pub token_expire_minutes: i64,
    /// AI assistant settings, when configured
    pub ai: Option<AiConfig>,
}

impl AppConfig {
    /// Build configuration from the environment.
    ///
    /// `db_override` (from a CLI flag) wins over `CASHFLOW_DB`, which wins
    /// over the platform default data directory.
    pub fn from_env(db_override: Option<&str>) -> Result<Self> {
        let database_path = match db_override {
            Some(path) => path.to_string(),
            None => match std::env::var(DB_PATH_ENV) {
                Ok(path) => path,
                Err(_) => default_db_path()?.to_string_lossy().into_owned(),
            },
        };

        let jwt_secret = std::env::var(JWT_SECRET_ENV).map_err(|_| {
            Error::Config(format!(
                "JWT secret required. Set {} to a long random string.",
                JWT_SECRET_ENV
            ))
        })?;

        let token_expire_minutes = match std::env::var(TOKEN_EXPIRE_ENV) {
            Ok(raw) => raw.parse::<i64>().map_err(|_| {
                Error::Config(format!("{} must be a positive integer", TOKEN_EXPIRE_ENV))
            })?,
            Err(_) => DEFAULT_TOKEN_EXPIRE_MINUTES,
        };
        if token_expire_minutes <= 0 {
            return Err(Error::Config(format!(
                "{} must be a positive integer",
                TOKEN_EXPIRE_ENV
            )));
        }

        Ok(Self {
            database_path,
            jwt_secret,
            token_expire_minutes,
            ai: AiConfig::from_env(),
        })
    }
}

/// Default database location: `<data dir>/cashflow/cashflow.db`
pub fn default_db_path() -> Result<PathBuf> {
    let base = dirs::data_dir()
        .ok_or_else(|| Error::Config("Could not determine platform data directory".to_string()))?;
    Ok(base.join("cashflow").join("cashflow.db"))
}
