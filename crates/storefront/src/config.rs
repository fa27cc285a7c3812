//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required (when `STORE_BACKEND=supabase`, the default)
//! - `SUPABASE_URL` - Project URL (e.g., <https://abcd.supabase.co>)
//! - `SUPABASE_ANON_KEY` - Public anon key, sent as the `apikey` header
//! - `SUPABASE_SERVICE_KEY` - Service role key for server-side data access
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STOREFRONT_BASE_URL` - Public URL (default: `http://localhost:<port>`)
//! - `STORE_BACKEND` - `supabase` or `memory` (default: supabase)
//! - `STOREFRONT_CURRENCY` - ISO 4217 display currency (default: CNY)
//! - `STOREFRONT_CART_ADD_POLICY` - `reset` or `increment` (default: reset)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate, 0.0 to 1.0 (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Trace sample rate, 0.0 to 1.0 (default: 0.0)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

use online_store_core::CurrencyCode;

use crate::view_models::AddToCartPolicy;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
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

/// Which data/auth backend the storefront talks to.
#[derive(Debug, Clone)]
pub enum BackendConfig {
    /// Hosted Supabase project.
    Supabase(SupabaseConfig),
    /// In-process store and identity provider, for local development.
    Memory,
}

impl BackendConfig {
    /// Name as accepted by `STORE_BACKEND`.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Supabase(_) => "supabase",
            Self::Memory => "memory",
        }
    }
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    pub backend: BackendConfig,
    /// Currency prices are displayed in
    pub currency: CurrencyCode,
    /// What "add to cart" does when the product is already in the cart
    pub cart_add_policy: AddToCartPolicy,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    pub sentry_environment: Option<String>,
    pub sentry_sample_rate: f32,
    pub sentry_traces_sample_rate: f32,
}

/// Supabase project configuration.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct SupabaseConfig {
    /// Project URL, possibly behind a path prefix
    pub url: Url,
    /// Public anon key (safe to expose in browser)
    pub anon_key: String,
    /// Service role key (server-side only, bypasses row-level security)
    pub service_key: SecretString,
}

impl std::fmt::Debug for SupabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseConfig")
            .field("url", &self.url.as_str())
            .field("anon_key", &self.anon_key)
            .field("service_key", &"[REDACTED]")
            .finish()
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = parse_env("STOREFRONT_HOST", "127.0.0.1")?;
        let port = parse_env("STOREFRONT_PORT", "3000")?;
        let base_url = get_env_or_default("STOREFRONT_BASE_URL", &format!("http://localhost:{port}"));

        let backend = match get_env_or_default("STORE_BACKEND", "supabase")
            .to_ascii_lowercase()
            .as_str()
        {
            "supabase" => BackendConfig::Supabase(SupabaseConfig::from_env()?),
            "memory" => BackendConfig::Memory,
            other => {
                return Err(ConfigError::InvalidEnvVar(
                    "STORE_BACKEND".to_string(),
                    format!("expected 'supabase' or 'memory', got '{other}'"),
                ));
            }
        };

        Ok(Self {
            host,
            port,
            base_url,
            backend,
            currency: parse_env("STOREFRONT_CURRENCY", "CNY")?,
            cart_add_policy: parse_env("STOREFRONT_CART_ADD_POLICY", "reset")?,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: parse_sample_rate("SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: parse_sample_rate("SENTRY_TRACES_SAMPLE_RATE", "0.0")?,
        })
    }

    /// Configuration for tests and local runs: memory backend, defaults elsewhere.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            host: IpAddr::from([127, 0, 0, 1]),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            backend: BackendConfig::Memory,
            currency: CurrencyCode::default(),
            cart_add_policy: AddToCartPolicy::default(),
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        }
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies should carry the `Secure` attribute.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl SupabaseConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let raw_url = get_required_env("SUPABASE_URL")?;
        let url = Url::parse(raw_url.trim())
            .map_err(|e| ConfigError::InvalidEnvVar("SUPABASE_URL".to_string(), e.to_string()))?;

        Ok(Self {
            url,
            anon_key: get_required_env("SUPABASE_ANON_KEY")?,
            service_key: get_validated_secret("SUPABASE_SERVICE_KEY")?,
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

/// Get an optional environment variable. Empty values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable (or its default) with `FromStr`.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

fn parse_sample_rate(key: &str, default: &str) -> Result<f32, ConfigError> {
    let rate: f32 = parse_env(key, default)?;
    if (0.0..=1.0).contains(&rate) {
        Ok(rate)
    } else {
        Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("must be between 0.0 and 1.0 (got {rate})"),
        ))
    }
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
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("appears to be a placeholder (contains '{pattern}')"),
        ));
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Copy the key from the project's API settings."
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

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_service_key_placeholder_rejected() {
        let err = validate_secret_strength("your-service-role-key", "SUPABASE_SERVICE_KEY")
            .unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_service_key_low_entropy_rejected() {
        let result = validate_secret_strength(&"a".repeat(40), "SUPABASE_SERVICE_KEY");
        assert!(result.is_err());
    }

    #[test]
    fn test_service_key_jwt_shape_accepted() {
        let key = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9.eyJyb2xlIjoic2VydmljZV9yb2xlIn0.Qm9Lq3v7";
        assert!(validate_secret_strength(key, "SUPABASE_SERVICE_KEY").is_ok());
    }

    #[test]
    fn test_parse_sample_rate_bounds() {
        assert!(parse_sample_rate("ONLINE_STORE_TEST_UNSET_RATE", "0.25").is_ok());
        assert!(parse_sample_rate("ONLINE_STORE_TEST_UNSET_RATE", "1.5").is_err());
    }

    #[test]
    fn test_in_memory_defaults() {
        let config = StorefrontConfig::in_memory();
        assert_eq!(config.socket_addr().port(), 3000);
        assert_eq!(config.currency, CurrencyCode::CNY);
        assert_eq!(config.cart_add_policy, AddToCartPolicy::ResetToOne);
        assert!(!config.is_secure());
    }

    #[test]
    fn test_supabase_config_debug_redacts_secrets() {
        let config = SupabaseConfig {
            url: Url::parse("https://abcd.supabase.co").unwrap(),
            anon_key: "anon_key_value".to_string(),
            service_key: SecretString::from("super_secret_service_key"),
        };

        let debug_output = format!("{config:?}");

        assert!(debug_output.contains("abcd.supabase.co"));
        assert!(debug_output.contains("anon_key_value"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_service_key"));
    }
}
