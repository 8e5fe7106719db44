//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional; the defaults target a local backend.
//!
//! - `STOREFRONT_API_BASE_URL` - Backend REST API base (default: `http://localhost:8080/api`)
//! - `STOREFRONT_API_TIMEOUT_SECS` - HTTP timeout in seconds (default: 10)
//! - `STOREFRONT_API_TOKEN` - Bearer token attached to backend requests
//! - `STOREFRONT_DATA_DIR` - Directory for durable client storage (default: `.wearables`)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/api";
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_DATA_DIR: &str = ".wearables";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &["your-", "changeme", "placeholder", "xxx", "todo"];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Backend API configuration
    pub api: ApiConfig,
    /// Directory holding durable client storage (guest cart snapshot)
    pub data_dir: PathBuf,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., production, staging)
    pub sentry_environment: Option<String>,
}

/// Backend REST API configuration.
///
/// Implements `Debug` manually to redact the bearer token.
#[derive(Clone)]
pub struct ApiConfig {
    /// Base URL that endpoint paths are appended to
    pub base_url: Url,
    /// Per-request timeout
    pub timeout: Duration,
    /// Bearer token for authenticated requests
    pub token: Option<SecretString>,
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url.as_str())
            .field("timeout", &self.timeout)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            token: None,
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but invalid, or if the
    /// API token looks like a placeholder.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through a variable lookup function.
    ///
    /// # Errors
    ///
    /// Same as [`StorefrontConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api = ApiConfig::from_lookup(&lookup)?;
        let data_dir = lookup("STOREFRONT_DATA_DIR")
            .map_or_else(|| PathBuf::from(DEFAULT_DATA_DIR), PathBuf::from);

        Ok(Self {
            api,
            data_dir,
            sentry_dsn: lookup("SENTRY_DSN"),
            sentry_environment: lookup("SENTRY_ENVIRONMENT"),
        })
    }
}

impl ApiConfig {
    fn from_lookup<F>(lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = match lookup("STOREFRONT_API_BASE_URL") {
            Some(raw) => parse_base_url(&raw).map_err(|e| {
                ConfigError::InvalidEnvVar("STOREFRONT_API_BASE_URL".to_string(), e.to_string())
            })?,
            None => default_base_url(),
        };

        let timeout_secs = match lookup("STOREFRONT_API_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|e| {
                ConfigError::InvalidEnvVar("STOREFRONT_API_TIMEOUT_SECS".to_string(), e.to_string())
            })?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        let token = match lookup("STOREFRONT_API_TOKEN") {
            Some(raw) if !raw.trim().is_empty() => {
                validate_token(&raw, "STOREFRONT_API_TOKEN")?;
                Some(SecretString::from(raw))
            }
            _ => None,
        };

        Ok(Self {
            base_url,
            timeout: Duration::from_secs(timeout_secs),
            token,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse a base URL, ensuring a trailing slash so relative joins keep the path.
pub(crate) fn parse_base_url(raw: &str) -> Result<Url, url::ParseError> {
    let trimmed = raw.trim();
    if trimmed.ends_with('/') {
        Url::parse(trimmed)
    } else {
        Url::parse(&format!("{trimmed}/"))
    }
}

fn default_base_url() -> Url {
    parse_base_url(DEFAULT_API_BASE_URL).expect("default API base URL is valid")
}

/// Reject tokens that are obviously copied from an example file.
fn validate_token(token: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = token.to_lowercase();
    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(**p)) {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("appears to be a placeholder (contains '{pattern}')"),
        ));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = StorefrontConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.api.base_url.as_str(), "http://localhost:8080/api/");
        assert_eq!(config.api.timeout, Duration::from_secs(10));
        assert!(config.api.token.is_none());
        assert_eq!(config.data_dir, PathBuf::from(".wearables"));
        assert!(config.sentry_dsn.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = StorefrontConfig::from_lookup(lookup_from(&[
            ("STOREFRONT_API_BASE_URL", "https://api.example.test/v1"),
            ("STOREFRONT_API_TIMEOUT_SECS", "3"),
            ("STOREFRONT_API_TOKEN", "tk_9f8e7d6c5b4a"),
            ("STOREFRONT_DATA_DIR", "/tmp/cart"),
        ]))
        .unwrap();

        assert_eq!(config.api.base_url.as_str(), "https://api.example.test/v1/");
        assert_eq!(config.api.timeout, Duration::from_secs(3));
        assert_eq!(
            config.api.token.as_ref().unwrap().expose_secret(),
            "tk_9f8e7d6c5b4a"
        );
        assert_eq!(config.data_dir, PathBuf::from("/tmp/cart"));
    }

    #[test]
    fn test_invalid_timeout() {
        let err = StorefrontConfig::from_lookup(lookup_from(&[(
            "STOREFRONT_API_TIMEOUT_SECS",
            "soon",
        )]))
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidEnvVar(ref key, _) if key == "STOREFRONT_API_TIMEOUT_SECS"
        ));
    }

    #[test]
    fn test_invalid_base_url() {
        let err = StorefrontConfig::from_lookup(lookup_from(&[(
            "STOREFRONT_API_BASE_URL",
            "not a url",
        )]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(_, _)));
    }

    #[test]
    fn test_placeholder_token_rejected() {
        let err = StorefrontConfig::from_lookup(lookup_from(&[(
            "STOREFRONT_API_TOKEN",
            "your-token-here",
        )]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_blank_token_is_none() {
        let config =
            StorefrontConfig::from_lookup(lookup_from(&[("STOREFRONT_API_TOKEN", "  ")])).unwrap();
        assert!(config.api.token.is_none());
    }

    #[test]
    fn test_api_config_debug_redacts_token() {
        let config = ApiConfig {
            token: Some(SecretString::from("super_secret_bearer")),
            ..ApiConfig::default()
        };

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("localhost:8080"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_bearer"));
    }
}
