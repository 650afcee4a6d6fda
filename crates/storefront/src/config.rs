//! Storefront client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `DUODUDE_API_BASE_URL` - Base URL of the storefront backend
//!
//! ## Optional
//! - `DUODUDE_DATA_DIR` - Directory for the guest cart and session (default: .duodude)
//! - `DUODUDE_HTTP_TIMEOUT_SECS` - Per-request HTTP timeout (default: 30)
//! - `DUODUDE_CATALOG_CACHE_TTL_SECS` - Catalog response cache TTL (default: 300)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEFAULT_DATA_DIR: &str = ".duodude";
const DEFAULT_HTTP_TIMEOUT_SECS: &str = "30";
const DEFAULT_CATALOG_CACHE_TTL_SECS: &str = "300";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront client configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Backend API configuration
    pub api: ApiConfig,
    /// Directory holding the guest cart and persisted session
    pub data_dir: PathBuf,
    /// How long catalog responses stay cached
    pub catalog_cache_ttl: Duration,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., production, staging)
    pub sentry_environment: Option<String>,
}

/// Backend API configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL every API path is resolved against
    pub base_url: Url,
    /// Per-request timeout
    pub timeout: Duration,
}

impl ApiConfig {
    /// Build an API configuration from a base URL string.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if the URL does not parse or is
    /// not an http(s) URL.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ConfigError> {
        let base_url = parse_base_url(base_url)?;
        Ok(Self { base_url, timeout })
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api = ApiConfig::new(
            &get_required_env("DUODUDE_API_BASE_URL")?,
            parse_secs(
                "DUODUDE_HTTP_TIMEOUT_SECS",
                &get_env_or_default("DUODUDE_HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS),
            )?,
        )?;
        let data_dir = PathBuf::from(get_env_or_default("DUODUDE_DATA_DIR", DEFAULT_DATA_DIR));
        let catalog_cache_ttl = parse_secs(
            "DUODUDE_CATALOG_CACHE_TTL_SECS",
            &get_env_or_default(
                "DUODUDE_CATALOG_CACHE_TTL_SECS",
                DEFAULT_CATALOG_CACHE_TTL_SECS,
            ),
        )?;

        Ok(Self {
            api,
            data_dir,
            catalog_cache_ttl,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable, treating empty values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse a whole number of seconds.
fn parse_secs(key: &str, value: &str) -> Result<Duration, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Parse the API base URL.
///
/// A trailing slash is added so relative paths resolve beneath any path
/// prefix (e.g., `https://shop.example/backend`).
fn parse_base_url(value: &str) -> Result<Url, ConfigError> {
    let invalid = |msg: String| ConfigError::InvalidEnvVar("DUODUDE_API_BASE_URL".to_string(), msg);

    let mut url = Url::parse(value.trim()).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_base_url_adds_trailing_slash() {
        let url = parse_base_url("https://shop.example/backend").unwrap();
        assert_eq!(url.as_str(), "https://shop.example/backend/");
        assert_eq!(
            url.join("api/cart").unwrap().as_str(),
            "https://shop.example/backend/api/cart"
        );
    }

    #[test]
    fn test_parse_base_url_rejects_other_schemes() {
        let err = parse_base_url("ftp://shop.example").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(_, _)));
        assert!(parse_base_url("not a url").is_err());
    }

    #[test]
    fn test_parse_secs() {
        assert_eq!(parse_secs("K", "45").unwrap(), Duration::from_secs(45));
        assert!(parse_secs("K", "-1").is_err());
        assert!(parse_secs("K", "soon").is_err());
    }

    #[test]
    fn test_api_config_new() {
        let config = ApiConfig::new("http://127.0.0.1:5000", Duration::from_secs(5)).unwrap();
        assert_eq!(config.base_url.as_str(), "http://127.0.0.1:5000/");
        assert_eq!(config.timeout, Duration::from_secs(5));
    }
}
