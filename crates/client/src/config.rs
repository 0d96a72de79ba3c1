//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All optional:
//! - `PAGERMART_API_BASE_URL` - Base URL of the shop API
//!   (default: `http://127.0.0.1:5001/api`)
//! - `PAGERMART_HTTP_TIMEOUT_SECS` - Per-request timeout (default: 30)
//! - `PAGERMART_CATALOG_TTL_SECS` - Catalog cache time-to-live (default: 300)
//!
//! No credentials live here; those are typed in at login and held by the
//! session for its lifetime.

use std::time::Duration;

use thiserror::Error;
use url::Url;

const BASE_URL_VAR: &str = "PAGERMART_API_BASE_URL";
const HTTP_TIMEOUT_VAR: &str = "PAGERMART_HTTP_TIMEOUT_SECS";
const CATALOG_TTL_VAR: &str = "PAGERMART_CATALOG_TTL_SECS";

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5001/api";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CATALOG_TTL_SECS: u64 = 300;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the shop API, including the `/api` prefix
    pub base_url: Url,
    /// Per-request HTTP timeout
    pub http_timeout: Duration,
    /// How long a fetched catalog stays fresh
    pub catalog_ttl: Duration,
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let base_url = parse_base_url(&get_env_or_default(BASE_URL_VAR, DEFAULT_BASE_URL))?;
        let http_timeout = parse_secs_env(HTTP_TIMEOUT_VAR, DEFAULT_HTTP_TIMEOUT_SECS)?;
        let catalog_ttl = parse_secs_env(CATALOG_TTL_VAR, DEFAULT_CATALOG_TTL_SECS)?;

        Ok(Self {
            base_url,
            http_timeout,
            catalog_ttl,
        })
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base URL is valid"),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            catalog_ttl: Duration::from_secs(DEFAULT_CATALOG_TTL_SECS),
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse and sanity-check the API base URL.
fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw)
        .map_err(|e| ConfigError::InvalidEnvVar(BASE_URL_VAR.to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            BASE_URL_VAR.to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    Ok(url)
}

/// Parse a whole-seconds duration variable, falling back to a default.
fn parse_secs_env(key: &str, default: u64) -> Result<Duration, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
        Err(_) => Ok(Duration::from_secs(default)),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_base_url_accepts_http_and_https() {
        assert!(parse_base_url("http://127.0.0.1:5001/api").is_ok());
        assert!(parse_base_url("https://shop.example.com/api").is_ok());
    }

    #[test]
    fn test_parse_base_url_rejects_other_schemes() {
        let err = parse_base_url("ftp://shop.example.com/api").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(_, _)));
    }

    #[test]
    fn test_parse_base_url_rejects_garbage() {
        assert!(parse_base_url("not a url").is_err());
    }

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url.as_str(), "http://127.0.0.1:5001/api");
        assert_eq!(config.http_timeout, Duration::from_secs(30));
        assert_eq!(config.catalog_ttl, Duration::from_secs(300));
    }
}
