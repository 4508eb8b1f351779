//! Enrichment configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `KLAVIYO_API_KEY` - Klaviyo private API key
//! - `KLAVIYO_SEGMENT_ID` - Segment whose profiles are enriched
//! - `SHOPIFY_STORE` - Shopify store domain (e.g., your-store.myshopify.com)
//! - `SHOPIFY_ACCESS_TOKEN` - Shopify Admin API access token
//!
//! ## Optional
//! - `KLAVIYO_API_REVISION` - Klaviyo API revision header (default: 2024-10-15)
//! - `KLAVIYO_BASE_URL` - Klaviyo API base URL (default: <https://a.klaviyo.com/api>)
//! - `SHOPIFY_API_VERSION` - Admin API version (default: 2024-10)
//! - `SHOPIFY_BASE_URL` - Overrides `https://{SHOPIFY_STORE}` (proxies, testing)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use secrecy::SecretString;
use thiserror::Error;

/// Default Klaviyo API revision.
pub const DEFAULT_KLAVIYO_REVISION: &str = "2024-10-15";

/// Default Klaviyo API base URL.
pub const DEFAULT_KLAVIYO_BASE_URL: &str = "https://a.klaviyo.com/api";

/// Default Shopify Admin API version.
pub const DEFAULT_SHOPIFY_API_VERSION: &str = "2024-10";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Top-level configuration for a pipeline run.
#[derive(Debug, Clone)]
pub struct EnrichConfig {
    /// Klaviyo (segment source) configuration
    pub klaviyo: KlaviyoConfig,
    /// Shopify (customer and order lookup) configuration
    pub shopify: ShopifyConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "production")
    pub sentry_environment: Option<String>,
}

/// Klaviyo API configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct KlaviyoConfig {
    /// Klaviyo private API key
    pub api_key: SecretString,
    /// Segment to fetch profiles from
    pub segment_id: String,
    /// API revision sent in the `revision` header
    pub revision: String,
    /// API base URL
    pub base_url: String,
}

impl std::fmt::Debug for KlaviyoConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KlaviyoConfig")
            .field("api_key", &"[REDACTED]")
            .field("segment_id", &self.segment_id)
            .field("revision", &self.revision)
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Shopify Admin API configuration.
///
/// Implements `Debug` manually to redact the access token.
#[derive(Clone)]
pub struct ShopifyConfig {
    /// Shopify store domain (e.g., your-store.myshopify.com)
    pub store: String,
    /// Admin API version (e.g., 2024-10)
    pub api_version: String,
    /// Admin API access token
    pub access_token: SecretString,
    /// Base URL override; `https://{store}` when `None`
    pub base_url: Option<String>,
}

impl std::fmt::Debug for ShopifyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopifyConfig")
            .field("store", &self.store)
            .field("api_version", &self.api_version)
            .field("access_token", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl ShopifyConfig {
    /// Base URL of the Admin REST API, e.g.
    /// `https://store.myshopify.com/admin/api/2024-10`.
    #[must_use]
    pub fn api_base(&self) -> String {
        let origin = self
            .base_url
            .clone()
            .unwrap_or_else(|| format!("https://{}", self.store));
        format!(
            "{}/admin/api/{}",
            origin.trim_end_matches('/'),
            self.api_version
        )
    }

    fn from_env() -> Result<Self, ConfigError> {
        let store = get_required_env("SHOPIFY_STORE")?;
        if store.contains("://") || store.contains('/') {
            return Err(ConfigError::InvalidEnvVar(
                "SHOPIFY_STORE".to_string(),
                "must be a bare domain such as your-store.myshopify.com".to_string(),
            ));
        }

        Ok(Self {
            store,
            api_version: get_env_or_default("SHOPIFY_API_VERSION", DEFAULT_SHOPIFY_API_VERSION),
            access_token: get_validated_secret("SHOPIFY_ACCESS_TOKEN")?,
            base_url: get_optional_env("SHOPIFY_BASE_URL"),
        })
    }
}

impl KlaviyoConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            api_key: get_validated_secret("KLAVIYO_API_KEY")?,
            segment_id: get_required_env("KLAVIYO_SEGMENT_ID")?,
            revision: get_env_or_default("KLAVIYO_API_REVISION", DEFAULT_KLAVIYO_REVISION),
            base_url: get_env_or_default("KLAVIYO_BASE_URL", DEFAULT_KLAVIYO_BASE_URL),
        })
    }
}

impl EnrichConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or if secrets
    /// look like placeholders.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Ok(Self {
            klaviyo: KlaviyoConfig::from_env()?,
            shopify: ShopifyConfig::from_env()?,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required, non-empty environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(ConfigError::MissingEnvVar(key.to_string())),
    }
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Validate that a secret is not a placeholder.
fn validate_secret(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret(&value, key)?;
    Ok(SecretString::from(value))
}
