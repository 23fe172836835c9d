//! Gateway configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Server (optional)
//! - `GATEWAY_HOST` - Bind address (default: 127.0.0.1)
//! - `GATEWAY_PORT` - Listen port (default: 3002)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//!
//! ## Search tuning (optional)
//! - `SEARCH_REQUEST_TIMEOUT_SECS` - Per-upstream-call timeout (default: 15)
//! - `SEARCH_MAX_ATTEMPTS` - Attempts per source before degrading (default: 3)
//! - `SEARCH_RETRY_BASE_MS` - Base backoff delay between attempts (default: 1000)
//! - `SEARCH_DEFAULT_LIMIT` - Result limit when the caller passes none (default: 20)
//!
//! ## Sources
//!
//! Each source is enabled by setting its credentials; a source with no
//! credentials is skipped at search time rather than failing the gateway.
//!
//! - `ALIBABA_CLIENT_ID` / `ALIBABA_CLIENT_SECRET` (+ optional
//!   `ALIBABA_API_URL`, `ALIBABA_TOKEN_URL`)
//! - `MADE_IN_CHINA_CLIENT_ID` / `MADE_IN_CHINA_CLIENT_SECRET` (+ optional
//!   `MADE_IN_CHINA_API_URL`, `MADE_IN_CHINA_TOKEN_URL`)
//! - `CJ_CLIENT_ID` / `CJ_CLIENT_SECRET` (+ optional `CJ_API_URL`,
//!   `CJ_TOKEN_URL`)
//! - `SHOPIFY_MCP_ENDPOINT` - Shopify catalog discovery endpoint (no
//!   credential exchange; the endpoint itself is the grant)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

const DEFAULT_ALIBABA_API_URL: &str = "https://open-api.alibaba.com/rest";
const DEFAULT_ALIBABA_TOKEN_URL: &str = "https://open-api.alibaba.com/oauth/token";
const DEFAULT_MIC_API_URL: &str = "https://open.made-in-china.com/api";
const DEFAULT_MIC_TOKEN_URL: &str = "https://open.made-in-china.com/oauth/token";
const DEFAULT_CJ_API_URL: &str = "https://developers.cjdropshipping.com/api2.0/v1";
const DEFAULT_CJ_TOKEN_URL: &str =
    "https://developers.cjdropshipping.com/api2.0/v1/authentication/getAccessToken";

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

/// Gateway application configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Search fan-out tuning
    pub search: SearchConfig,
    /// Alibaba credentials; `None` disables the source
    pub alibaba: Option<AlibabaConfig>,
    /// Made-in-China credentials; `None` disables the source
    pub made_in_china: Option<MadeInChinaConfig>,
    /// CJ Dropshipping credentials; `None` disables the source
    pub cj_dropshipping: Option<CjDropshippingConfig>,
    /// Shopify catalog endpoint; `None` disables the source
    pub shopify_catalog: Option<ShopifyCatalogConfig>,
}

/// Search fan-out tuning.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Fixed timeout applied to every upstream call.
    pub request_timeout: Duration,
    /// Attempts per source before degrading to an empty contribution.
    pub max_attempts: u32,
    /// Base delay for exponential backoff between attempts.
    pub retry_base_delay: Duration,
    /// Result limit applied when the caller does not pass one.
    pub default_limit: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(15),
            max_attempts: 3,
            retry_base_delay: Duration::from_millis(1000),
            default_limit: 20,
        }
    }
}

/// Alibaba API configuration.
///
/// Implements `Debug` manually to redact the client secret.
#[derive(Clone)]
pub struct AlibabaConfig {
    /// Product search API base URL
    pub base_url: String,
    /// Token exchange endpoint
    pub token_url: String,
    /// OAuth client ID
    pub client_id: String,
    /// OAuth client secret
    pub client_secret: SecretString,
}

impl std::fmt::Debug for AlibabaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlibabaConfig")
            .field("base_url", &self.base_url)
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .finish()
    }
}

/// Made-in-China API configuration.
///
/// Implements `Debug` manually to redact the client secret.
#[derive(Clone)]
pub struct MadeInChinaConfig {
    /// Product search API base URL
    pub base_url: String,
    /// Token exchange endpoint
    pub token_url: String,
    /// API client ID
    pub client_id: String,
    /// API client secret
    pub client_secret: SecretString,
}

impl std::fmt::Debug for MadeInChinaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MadeInChinaConfig")
            .field("base_url", &self.base_url)
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .finish()
    }
}

/// CJ Dropshipping API configuration.
///
/// Implements `Debug` manually to redact the client secret.
#[derive(Clone)]
pub struct CjDropshippingConfig {
    /// Product search API base URL
    pub base_url: String,
    /// Token exchange endpoint
    pub token_url: String,
    /// API client ID
    pub client_id: String,
    /// API client secret
    pub client_secret: SecretString,
}

impl std::fmt::Debug for CjDropshippingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CjDropshippingConfig")
            .field("base_url", &self.base_url)
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .finish()
    }
}

/// Shopify catalog discovery configuration.
#[derive(Debug, Clone)]
pub struct ShopifyCatalogConfig {
    /// The shop's MCP-style discovery endpoint
    pub endpoint: String,
}

impl GatewayConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is malformed or a client secret
    /// fails validation (placeholder detection, entropy check). Absent
    /// source credentials are not an error - that source is disabled.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = get_env_or_default("GATEWAY_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("GATEWAY_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("GATEWAY_PORT", "3002")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("GATEWAY_PORT".to_string(), e.to_string()))?;
        let sentry_dsn = get_optional_env("SENTRY_DSN");

        Ok(Self {
            host,
            port,
            sentry_dsn,
            search: SearchConfig::from_env()?,
            alibaba: AlibabaConfig::from_env()?,
            made_in_china: MadeInChinaConfig::from_env()?,
            cj_dropshipping: CjDropshippingConfig::from_env()?,
            shopify_catalog: ShopifyCatalogConfig::from_env()?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl SearchConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            request_timeout: Duration::from_secs(get_parsed_or(
                "SEARCH_REQUEST_TIMEOUT_SECS",
                defaults.request_timeout.as_secs(),
            )?),
            max_attempts: get_parsed_or("SEARCH_MAX_ATTEMPTS", defaults.max_attempts)?,
            retry_base_delay: Duration::from_millis(get_parsed_or(
                "SEARCH_RETRY_BASE_MS",
                u64::try_from(defaults.retry_base_delay.as_millis()).unwrap_or(1000),
            )?),
            default_limit: get_parsed_or("SEARCH_DEFAULT_LIMIT", defaults.default_limit)?,
        })
    }
}

impl AlibabaConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(client_id) = get_optional_env("ALIBABA_CLIENT_ID") else {
            return Ok(None);
        };
        Ok(Some(Self {
            base_url: get_endpoint_or_default("ALIBABA_API_URL", DEFAULT_ALIBABA_API_URL)?,
            token_url: get_endpoint_or_default("ALIBABA_TOKEN_URL", DEFAULT_ALIBABA_TOKEN_URL)?,
            client_id,
            client_secret: get_validated_secret("ALIBABA_CLIENT_SECRET")?,
        }))
    }
}

impl MadeInChinaConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(client_id) = get_optional_env("MADE_IN_CHINA_CLIENT_ID") else {
            return Ok(None);
        };
        Ok(Some(Self {
            base_url: get_endpoint_or_default("MADE_IN_CHINA_API_URL", DEFAULT_MIC_API_URL)?,
            token_url: get_endpoint_or_default("MADE_IN_CHINA_TOKEN_URL", DEFAULT_MIC_TOKEN_URL)?,
            client_id,
            client_secret: get_validated_secret("MADE_IN_CHINA_CLIENT_SECRET")?,
        }))
    }
}

impl CjDropshippingConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(client_id) = get_optional_env("CJ_CLIENT_ID") else {
            return Ok(None);
        };
        Ok(Some(Self {
            base_url: get_endpoint_or_default("CJ_API_URL", DEFAULT_CJ_API_URL)?,
            token_url: get_endpoint_or_default("CJ_TOKEN_URL", DEFAULT_CJ_TOKEN_URL)?,
            client_id,
            client_secret: get_validated_secret("CJ_CLIENT_SECRET")?,
        }))
    }
}

impl ShopifyCatalogConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(endpoint) = get_optional_env("SHOPIFY_MCP_ENDPOINT") else {
            return Ok(None);
        };
        validate_endpoint("SHOPIFY_MCP_ENDPOINT", &endpoint)?;
        Ok(Some(Self { endpoint }))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable, falling back to a default when unset.
fn get_parsed_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(value) => value
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}

/// Get an endpoint override, validating that it parses as a URL.
fn get_endpoint_or_default(key: &str, default: &str) -> Result<String, ConfigError> {
    let value = get_env_or_default(key, default);
    validate_endpoint(key, &value)?;
    Ok(value)
}

fn validate_endpoint(key: &str, value: &str) -> Result<(), ConfigError> {
    Url::parse(value).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    // Check blocklist
    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    // Check entropy (real API secrets have high entropy)
    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use the secret issued by the provider."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}
