//! API configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `API_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `API_BASE_URL` - Public URL of the API (decides secure cookies)
//!
//! ## Optional
//! - `API_HOST` - Bind address (default: 127.0.0.1)
//! - `API_PORT` - Listen port (default: 3000)
//! - `ACTIVATION_MIN_APPROVED_DRIVERS` - Approved drivers a moving partner needs
//!   before activation (default: 1)
//! - `STORAGE_LOW_STOCK_THRESHOLD` - Available units below which stock is low
//!   (default: 50)
//! - `SENTRY_DSN`, `SENTRY_ENVIRONMENT`, `SENTRY_SAMPLE_RATE`,
//!   `SENTRY_TRACES_SAMPLE_RATE` - Error tracking
//!
//! ## Optional groups (all variables of a group must be set together)
//! - SMS: `TWILIO_ACCOUNT_SID`, `TWILIO_AUTH_TOKEN`, `TWILIO_FROM_NUMBER`
//! - Email: `SMTP_HOST`, `SMTP_USERNAME`, `SMTP_PASSWORD`, `SMTP_FROM`
//!   (`SMTP_PORT` default 587)
//! - Reviews: `GOOGLE_PLACES_API_KEY`, `GOOGLE_PLACE_ID`
//! - Image host: `CLOUDINARY_CLOUD_NAME`, `CLOUDINARY_API_KEY`,
//!   `CLOUDINARY_API_SECRET`
//! - TLS: `API_TLS_CERT`, `API_TLS_KEY`

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use secrecy::SecretString;
use thiserror::Error;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_MIN_APPROVED_DRIVERS: u32 = 1;
const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 50;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "insert",
    "put-your",
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

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL of the API
    pub base_url: String,
    /// Business rules that operations may want to tune
    pub policy: PolicyConfig,
    /// Twilio SMS delivery (optional)
    pub twilio: Option<TwilioConfig>,
    /// SMTP email delivery (optional)
    pub email: Option<EmailConfig>,
    /// Google Places reviews source (optional)
    pub google_places: Option<GooglePlacesConfig>,
    /// Cloudinary image hosting (optional)
    pub cloudinary: Option<CloudinaryConfig>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "staging", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
    /// TLS configuration for HTTPS (optional)
    pub tls: Option<TlsConfig>,
}

/// Tunable business rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyConfig {
    /// Approved, active drivers a moving partner needs to become active.
    pub min_approved_drivers: u32,
    /// Available storage units below which availability reports low stock.
    pub low_stock_threshold: i64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            min_approved_drivers: DEFAULT_MIN_APPROVED_DRIVERS,
            low_stock_threshold: DEFAULT_LOW_STOCK_THRESHOLD,
        }
    }
}

/// Twilio SMS configuration.
///
/// Implements `Debug` manually to redact the auth token.
#[derive(Clone)]
pub struct TwilioConfig {
    /// Account SID (AC...)
    pub account_sid: String,
    /// Auth token
    pub auth_token: SecretString,
    /// Sending number in E.164 form
    pub from_number: String,
}

impl std::fmt::Debug for TwilioConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwilioConfig")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"[REDACTED]")
            .field("from_number", &self.from_number)
            .finish()
    }
}

/// Email (SMTP) configuration.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct EmailConfig {
    /// SMTP server hostname
    pub smtp_host: String,
    /// SMTP server port
    pub smtp_port: u16,
    /// SMTP authentication username
    pub smtp_username: String,
    /// SMTP authentication password
    pub smtp_password: SecretString,
    /// Email sender address (From header)
    pub from_address: String,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &"[REDACTED]")
            .field("from_address", &self.from_address)
            .finish()
    }
}

/// Google Places configuration for the reviews endpoint.
#[derive(Clone)]
pub struct GooglePlacesConfig {
    /// Places API key
    pub api_key: SecretString,
    /// Place ID of the business listing
    pub place_id: String,
}

impl std::fmt::Debug for GooglePlacesConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GooglePlacesConfig")
            .field("api_key", &"[REDACTED]")
            .field("place_id", &self.place_id)
            .finish()
    }
}

/// Cloudinary configuration for signed image uploads.
#[derive(Clone)]
pub struct CloudinaryConfig {
    /// Cloud name (first path segment of the upload URL)
    pub cloud_name: String,
    /// API key
    pub api_key: String,
    /// API secret used to sign upload parameters
    pub api_secret: SecretString,
}

impl std::fmt::Debug for CloudinaryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudinaryConfig")
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .field("api_secret", &"[REDACTED]")
            .finish()
    }
}

/// TLS configuration for HTTPS.
#[derive(Clone)]
pub struct TlsConfig {
    /// PEM-encoded certificate chain
    pub cert_pem: String,
    /// PEM-encoded private key
    pub key_pem: SecretString,
}

impl std::fmt::Debug for TlsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsConfig")
            .field("cert_pem", &"[CERTIFICATE]")
            .field("key_pem", &"[REDACTED]")
            .finish()
    }
}

impl ApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid, if
    /// an optional group is only partially set, or if a secret looks like a
    /// placeholder.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("API_DATABASE_URL")?;
        let host = parse_env("API_HOST", "127.0.0.1")?;
        let port = parse_env("API_PORT", "3000")?;
        let base_url = get_required_env("API_BASE_URL")?;

        let policy = PolicyConfig {
            min_approved_drivers: parse_env(
                "ACTIVATION_MIN_APPROVED_DRIVERS",
                &DEFAULT_MIN_APPROVED_DRIVERS.to_string(),
            )?,
            low_stock_threshold: parse_env(
                "STORAGE_LOW_STOCK_THRESHOLD",
                &DEFAULT_LOW_STOCK_THRESHOLD.to_string(),
            )?,
        };

        let twilio = TwilioConfig::from_env()?;
        let email = EmailConfig::from_env()?;
        let google_places = GooglePlacesConfig::from_env()?;
        let cloudinary = CloudinaryConfig::from_env()?;
        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.2);
        let tls = TlsConfig::from_env()?;

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            policy,
            twilio,
            email,
            google_places,
            cloudinary,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
            tls,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether the API is served over HTTPS (secure cookies).
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl TwilioConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some([account_sid, auth_token, from_number]) = get_env_group(
            "TWILIO_*",
            ["TWILIO_ACCOUNT_SID", "TWILIO_AUTH_TOKEN", "TWILIO_FROM_NUMBER"],
        )?
        else {
            return Ok(None);
        };

        validate_secret_strength(&auth_token, "TWILIO_AUTH_TOKEN")?;
        Ok(Some(Self {
            account_sid,
            auth_token: SecretString::from(auth_token),
            from_number,
        }))
    }
}

impl EmailConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some([smtp_host, smtp_username, smtp_password, from_address]) = get_env_group(
            "SMTP_*",
            ["SMTP_HOST", "SMTP_USERNAME", "SMTP_PASSWORD", "SMTP_FROM"],
        )?
        else {
            return Ok(None);
        };

        Ok(Some(Self {
            smtp_host,
            smtp_port: parse_env("SMTP_PORT", "587")?,
            smtp_username,
            smtp_password: SecretString::from(smtp_password),
            from_address,
        }))
    }
}

impl GooglePlacesConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some([api_key, place_id]) = get_env_group(
            "GOOGLE_PLACES_*",
            ["GOOGLE_PLACES_API_KEY", "GOOGLE_PLACE_ID"],
        )?
        else {
            return Ok(None);
        };

        if let Err(e) = validate_secret_strength(&api_key, "GOOGLE_PLACES_API_KEY") {
            tracing::warn!("GOOGLE_PLACES_API_KEY validation warning: {e}");
        }
        Ok(Some(Self {
            api_key: SecretString::from(api_key),
            place_id,
        }))
    }
}

impl CloudinaryConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some([cloud_name, api_key, api_secret]) = get_env_group(
            "CLOUDINARY_*",
            [
                "CLOUDINARY_CLOUD_NAME",
                "CLOUDINARY_API_KEY",
                "CLOUDINARY_API_SECRET",
            ],
        )?
        else {
            return Ok(None);
        };

        validate_secret_strength(&api_secret, "CLOUDINARY_API_SECRET")?;
        Ok(Some(Self {
            cloud_name,
            api_key,
            api_secret: SecretString::from(api_secret),
        }))
    }
}

impl TlsConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        Ok(
            get_env_group("API_TLS_*", ["API_TLS_CERT", "API_TLS_KEY"])?.map(|[cert, key]| Self {
                cert_pem: cert,
                key_pem: SecretString::from(key),
            }),
        )
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL` (used by Fly.io postgres attach).
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    std::env::var(primary_key)
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Parse an environment variable, falling back to `default` when unset.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw = std::env::var(key).unwrap_or_else(|_| default.to_string());
    raw.parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Read a group of variables that must be set together.
///
/// Returns `Ok(None)` when none of them is set.
fn get_env_group<const N: usize>(
    group: &str,
    keys: [&str; N],
) -> Result<Option<[String; N]>, ConfigError> {
    let values = keys.map(get_optional_env);
    let set = values.iter().filter(|v| v.is_some()).count();

    if set == 0 {
        return Ok(None);
    }
    if set < N {
        return Err(ConfigError::InvalidEnvVar(
            group.to_string(),
            format!("all of {} must be set together", keys.join(", ")),
        ));
    }
    Ok(Some(values.map(Option::unwrap_or_default)))
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
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1})"
            ),
        ));
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn test_config() -> ApiConfig {
        ApiConfig {
            database_url: SecretString::from("postgres://localhost/stowline"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            policy: PolicyConfig::default(),
            twilio: None,
            email: None,
            google_places: None,
            cloudinary: None,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.2,
            tls: None,
        }
    }

    #[test]
    fn test_shannon_entropy_bounds() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("ab") - 1.0).abs() < 0.01);
        assert!(shannon_entropy("aB3$xY9!mK2@nL5#") > 3.3);
    }

    #[test]
    fn test_validate_secret_strength_rejects_placeholders() {
        let err = validate_secret_strength("your-twilio-token", "TWILIO_AUTH_TOKEN").unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
        assert!(validate_secret_strength("changeme123", "X").is_err());
    }

    #[test]
    fn test_validate_secret_strength_rejects_low_entropy() {
        assert!(validate_secret_strength(&"a".repeat(33), "X").is_err());
    }

    #[test]
    fn test_validate_secret_strength_accepts_random() {
        assert!(validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "X").is_ok());
    }

    #[test]
    fn test_default_policy_matches_business_rules() {
        let policy = PolicyConfig::default();
        assert_eq!(policy.min_approved_drivers, 1);
        assert_eq!(policy.low_stock_threshold, 50);
    }

    #[test]
    fn test_socket_addr_and_secure() {
        let mut config = test_config();
        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
        assert!(!config.is_secure());

        config.base_url = "https://api.stowline.dev".to_string();
        assert!(config.is_secure());
    }

    #[test]
    fn test_twilio_config_debug_redacts_secrets() {
        let config = TwilioConfig {
            account_sid: "AC123".to_string(),
            auth_token: SecretString::from("super_secret_twilio_token"),
            from_number: "+14155550100".to_string(),
        };

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("AC123"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_twilio_token"));
    }

    #[test]
    fn test_cloudinary_config_debug_redacts_secrets() {
        let config = CloudinaryConfig {
            cloud_name: "stowline".to_string(),
            api_key: "123456".to_string(),
            api_secret: SecretString::from("cloudinary_api_secret_value"),
        };

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("stowline"));
        assert!(!debug_output.contains("cloudinary_api_secret_value"));
    }
}
