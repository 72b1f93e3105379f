use std::time::Duration;

use anyhow::{bail, Context, Result};

pub const SUPPORTED_DB_DRIVER: &str = "postgres";

/// Upper bound for `ACCESS_TOKEN_DURATION_SECS`: one year.
pub const MAX_ACCESS_TOKEN_DURATION_SECS: u64 = 365 * 24 * 60 * 60;

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub db_driver: String,
    pub server_address: String,
    pub token_symmetric_key: String,
    pub access_token_duration: Duration,
    /// No URL means the in-process index is used.
    pub elasticsearch_url: Option<String>,
    pub elasticsearch_index: String,
    pub max_cv_bytes: usize,
    pub request_timeout: Duration,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let db_driver = optional_env("DB_DRIVER").unwrap_or_else(|| SUPPORTED_DB_DRIVER.into());
        if db_driver != SUPPORTED_DB_DRIVER {
            bail!("Unsupported DB_DRIVER '{db_driver}', only '{SUPPORTED_DB_DRIVER}' is available");
        }

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            db_driver,
            server_address: optional_env("SERVER_ADDRESS")
                .unwrap_or_else(|| "0.0.0.0:8080".to_string()),
            token_symmetric_key: require_env("TOKEN_SYMMETRIC_KEY")?,
            access_token_duration: token_duration(parse_env("ACCESS_TOKEN_DURATION_SECS", 900)?)?,
            elasticsearch_url: optional_env("ELASTICSEARCH_URL"),
            elasticsearch_index: optional_env("ELASTICSEARCH_INDEX")
                .unwrap_or_else(|| "jobs".to_string()),
            max_cv_bytes: parse_env("MAX_CV_BYTES", 5 * 1024 * 1024)?,
            request_timeout: Duration::from_secs(parse_env("REQUEST_TIMEOUT_SECS", 30)?),
            rust_log: optional_env("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn token_duration(secs: u64) -> Result<Duration> {
    if secs == 0 || secs > MAX_ACCESS_TOKEN_DURATION_SECS {
        bail!(
            "ACCESS_TOKEN_DURATION_SECS must be between 1 and {}, got {secs}",
            MAX_ACCESS_TOKEN_DURATION_SECS
        );
    }
    Ok(Duration::from_secs(secs))
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        None => Ok(default),
    }
}

#[cfg(test)]
impl Config {
    pub fn for_tests() -> Self {
        Config {
            database_url: "postgres://localhost/jobboard_test".to_string(),
            db_driver: SUPPORTED_DB_DRIVER.to_string(),
            server_address: "127.0.0.1:0".to_string(),
            token_symmetric_key: "0123456789abcdef0123456789abcdef".to_string(),
            access_token_duration: Duration::from_secs(900),
            elasticsearch_url: None,
            elasticsearch_index: "jobs".to_string(),
            max_cv_bytes: 1024,
            request_timeout: Duration::from_secs(30),
            rust_log: "info".to_string(),
        }
    }
}
