//! Storefront client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `MEDISTORE_API_URL` - Storefront API base URL (default: `http://localhost:5000/api`)
//! - `MEDISTORE_API_TOKEN` - Bearer token for authenticated routes
//! - `MEDISTORE_REQUEST_TIMEOUT_SECS` - Transport timeout (default: 30)
//! - `MEDISTORE_PAGE_SIZE` - Catalog page size (default: 12)
//! - `MEDISTORE_CATALOG_CACHE_TTL_SECS` - Catalog detail cache TTL, 0 disables (default: 300)
//! - `MEDISTORE_MUTATION_ORDERING` - `arrival` or `sequenced` (default: `arrival`)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const DEFAULT_API_URL: &str = "http://localhost:5000/api";
const MAX_PAGE_SIZE: u32 = 100;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// How the cart store treats mutation responses that overlap in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MutationOrdering {
    /// Apply responses in arrival order; the last response to land wins.
    #[default]
    Arrival,
    /// Tag each mutation with a sequence number and drop any response older
    /// than one already applied.
    Sequenced,
}

impl FromStr for MutationOrdering {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "arrival" => Ok(Self::Arrival),
            "sequenced" => Ok(Self::Sequenced),
            other => Err(format!(
                "expected 'arrival' or 'sequenced', got '{other}'"
            )),
        }
    }
}

/// Storefront client configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Remote API configuration
    pub api: ApiConfig,
    /// Catalog page size used when a query does not specify one
    pub page_size: u32,
    /// Cart mutation ordering policy
    pub mutation_ordering: MutationOrdering,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

/// Remote API configuration.
///
/// Implements `Debug` manually to redact the bearer token.
#[derive(Clone)]
pub struct ApiConfig {
    /// Base URL every endpoint path is appended to
    pub base_url: Url,
    /// Bearer token for authenticated routes, if already signed in
    pub token: Option<SecretString>,
    /// Transport timeout for a single request
    pub request_timeout: Duration,
    /// Time-to-live for cached catalog entries (zero disables the cache)
    pub catalog_cache_ttl: Duration,
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url.as_str())
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("request_timeout", &self.request_timeout)
            .field("catalog_cache_ttl", &self.catalog_cache_ttl)
            .finish()
    }
}

impl ApiConfig {
    /// Configuration for `base_url` with default timeouts and no token.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if the URL is not http(s).
    pub fn for_base_url(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: parse_base_url("MEDISTORE_API_URL", base_url)?,
            token: None,
            request_timeout: Duration::from_secs(30),
            catalog_cache_ttl: Duration::from_secs(300),
        })
    }

    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: parse_base_url(
                "MEDISTORE_API_URL",
                &get_env_or_default("MEDISTORE_API_URL", DEFAULT_API_URL),
            )?,
            token: get_optional_env("MEDISTORE_API_TOKEN")
                .filter(|t| !t.trim().is_empty())
                .map(SecretString::from),
            request_timeout: Duration::from_secs(get_parsed_or_default(
                "MEDISTORE_REQUEST_TIMEOUT_SECS",
                30,
            )?),
            catalog_cache_ttl: Duration::from_secs(get_parsed_or_default(
                "MEDISTORE_CATALOG_CACHE_TTL_SECS",
                300,
            )?),
        })
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api = ApiConfig::from_env()?;
        let page_size = get_parsed_or_default("MEDISTORE_PAGE_SIZE", 12_u32)?;
        validate_page_size(page_size)?;
        let mutation_ordering =
            get_parsed_or_default("MEDISTORE_MUTATION_ORDERING", MutationOrdering::Arrival)?;
        let sentry_dsn = get_optional_env("SENTRY_DSN");

        Ok(Self {
            api,
            page_size,
            mutation_ordering,
            sentry_dsn,
        })
    }

    /// Configuration with defaults for everything except the API base URL.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if the URL is not http(s).
    pub fn for_base_url(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            api: ApiConfig::for_base_url(base_url)?,
            page_size: 12,
            mutation_ordering: MutationOrdering::Arrival,
            sentry_dsn: None,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an optional environment variable, falling back to `default` when unset.
fn get_parsed_or_default<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_optional_env(key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

/// Parse and check the API base URL.
fn parse_base_url(var_name: &str, raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| ConfigError::InvalidEnvVar(var_name.to_string(), e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            var_name.to_string(),
            format!("scheme must be http or https (got {})", url.scheme()),
        ));
    }

    Ok(url)
}

/// Validate that a page size is usable.
fn validate_page_size(page_size: u32) -> Result<(), ConfigError> {
    if page_size == 0 || page_size > MAX_PAGE_SIZE {
        return Err(ConfigError::InvalidEnvVar(
            "MEDISTORE_PAGE_SIZE".to_string(),
            format!("must be between 1 and {MAX_PAGE_SIZE} (got {page_size})"),
        ));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    #[test]
    fn test_parse_base_url_accepts_http() {
        let url = parse_base_url("TEST_URL", "http://localhost:5000/api").unwrap();
        assert_eq!(url.path(), "/api");
    }

    #[test]
    fn test_parse_base_url_rejects_other_schemes() {
        let err = parse_base_url("TEST_URL", "ftp://example.com").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(_, _)));
    }

    #[test]
    fn test_parse_base_url_rejects_garbage() {
        assert!(parse_base_url("TEST_URL", "not a url").is_err());
    }

    #[test]
    fn test_mutation_ordering_from_str() {
        assert_eq!(
            "Sequenced".parse::<MutationOrdering>().unwrap(),
            MutationOrdering::Sequenced
        );
        assert_eq!(
            " arrival ".parse::<MutationOrdering>().unwrap(),
            MutationOrdering::Arrival
        );
        assert!("newest".parse::<MutationOrdering>().is_err());
    }

    #[test]
    fn test_validate_page_size_bounds() {
        assert!(validate_page_size(0).is_err());
        assert!(validate_page_size(101).is_err());
        assert!(validate_page_size(12).is_ok());
    }

    #[test]
    fn test_for_base_url_defaults() {
        let config = StorefrontConfig::for_base_url("https://api.example.com/api").unwrap();
        assert_eq!(config.page_size, 12);
        assert_eq!(config.mutation_ordering, MutationOrdering::Arrival);
        assert!(config.api.token.is_none());
        assert_eq!(config.api.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_api_config_debug_redacts_token() {
        let mut config = ApiConfig::for_base_url("https://api.example.com/api").unwrap();
        config.token = Some(SecretString::from("super_secret_bearer_token"));

        let debug_output = format!("{config:?}");

        assert!(debug_output.contains("api.example.com"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_bearer_token"));
        assert_eq!(
            config.token.unwrap().expose_secret(),
            "super_secret_bearer_token"
        );
    }
}
