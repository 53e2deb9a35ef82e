//! API configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `API_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `JWT_SECRET` - Token signing secret (min 32 chars, high entropy)
//! - `SMTP_HOST`, `SMTP_USERNAME`, `SMTP_PASSWORD` - Outgoing mail relay
//! - `EMAIL_FROM` - Sender address for all mail
//! - `ADMIN_EMAIL` - Receives a copy of every order
//! - `FRONTEND_URL` - Customer site base URL (order links)
//! - `ADMIN_URL` - Admin panel base URL (order links)
//!
//! ## Optional
//! - `API_HOST` - Bind address (default: 127.0.0.1)
//! - `API_PORT` - Listen port (default: 5000)
//! - `CORS_ALLOWED_ORIGIN` - Browser origin allowed to call the API (default: <http://localhost:5173>)
//! - `JWT_EXPIRES_IN_SECS` - Session token lifetime (default: 604800, one week)
//! - `OTP_TTL_SECS` - Signup code validity (default: 300)
//! - `ORDER_TAX_RATE` - VAT rate applied to orders (default: 0.20)
//! - `SMTP_PORT` - Mail relay port (default: 587)
//! - `EMAIL_FROM_NAME` - Sender display name (default: Exprz Ecommerce)
//! - `SUPPORT_EMAIL` - Support address shown in emails
//! - `TWILIO_ACCOUNT_SID`, `TWILIO_AUTH_TOKEN`, `ADMIN_WHATSAPP_TO` - WhatsApp
//!   notifications, enabled only when all three are set
//! - `TWILIO_WHATSAPP_FROM` - Sender (default: whatsapp:+14155238886)
//! - `WHATSAPP_COUNTRY_CODE` - Prefix for customer numbers (default: +91)
//! - `NOTIFICATION_RETRY_INTERVAL_SECS` - Email retry sweep interval (default: 3600)
//! - `NOTIFICATION_RETRY_BATCH` - Orders per sweep (default: 10)
//! - `SENTRY_DSN`, `SENTRY_ENVIRONMENT`, `SENTRY_SAMPLE_RATE`, `SENTRY_TRACES_SAMPLE_RATE`

use std::collections::HashMap;
use std::fmt::Display;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

const MIN_JWT_SECRET_LENGTH: usize = 32;
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
    /// Browser origin allowed by CORS
    pub cors_allowed_origin: String,
    /// Session token settings
    pub jwt: JwtConfig,
    /// How long a signup code stays valid
    pub otp_ttl: Duration,
    /// VAT rate applied to order subtotals
    pub order_tax_rate: Decimal,
    /// Outgoing mail settings
    pub email: EmailConfig,
    /// Customer site base URL
    pub frontend_url: Url,
    /// Admin panel base URL
    pub admin_url: Url,
    /// Twilio WhatsApp settings, `None` when not configured
    pub whatsapp: Option<WhatsAppConfig>,
    /// Email retry sweep settings
    pub notifications: NotificationConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
    /// Fraction of errors sent to Sentry
    pub sentry_sample_rate: f32,
    /// Fraction of transactions traced
    pub sentry_traces_sample_rate: f32,
}

/// Session token signing configuration.
#[derive(Clone)]
pub struct JwtConfig {
    /// HMAC signing secret
    pub secret: SecretString,
    /// Token lifetime
    pub expires_in: Duration,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"[REDACTED]")
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// SMTP configuration.
#[derive(Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: SecretString,
    /// Bare sender address
    pub from_address: String,
    /// Sender display name
    pub from_name: String,
    /// Admin inbox for order notifications
    pub admin_email: String,
    pub support_email: Option<String>,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &"[REDACTED]")
            .field("from_address", &self.from_address)
            .field("from_name", &self.from_name)
            .field("admin_email", &self.admin_email)
            .field("support_email", &self.support_email)
            .finish()
    }
}

/// Twilio WhatsApp configuration.
#[derive(Clone)]
pub struct WhatsAppConfig {
    pub account_sid: String,
    pub auth_token: SecretString,
    /// Sender, including the `whatsapp:` prefix
    pub from: String,
    /// Admin recipient, including the `whatsapp:` prefix
    pub admin_to: String,
    /// Dialling prefix added to customer phone numbers
    pub country_code: String,
}

impl std::fmt::Debug for WhatsAppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhatsAppConfig")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"[REDACTED]")
            .field("from", &self.from)
            .field("admin_to", &self.admin_to)
            .field("country_code", &self.country_code)
            .finish()
    }
}

/// Notification retry sweep configuration.
#[derive(Debug, Clone, Copy)]
pub struct NotificationConfig {
    pub retry_interval: Duration,
    pub retry_batch: i64,
}

impl ApiConfig {
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

        let database_url = get_database_url("API_DATABASE_URL")?;
        let host: IpAddr = parse_env_or_default("API_HOST", "127.0.0.1")?;
        let port: u16 = parse_env_or_default("API_PORT", "5000")?;
        let cors_allowed_origin = get_env_or_default("CORS_ALLOWED_ORIGIN", "http://localhost:5173");

        let jwt = JwtConfig::from_env()?;
        let otp_ttl = Duration::from_secs(parse_env_or_default("OTP_TTL_SECS", "300")?);
        let order_tax_rate: Decimal = parse_env_or_default("ORDER_TAX_RATE", "0.20")?;
        if order_tax_rate.is_sign_negative() {
            return Err(ConfigError::InvalidEnvVar(
                "ORDER_TAX_RATE".to_string(),
                "must not be negative".to_string(),
            ));
        }

        let email = EmailConfig::from_env()?;
        let frontend_url = get_url("FRONTEND_URL")?;
        let admin_url = get_url("ADMIN_URL")?;
        let whatsapp = WhatsAppConfig::from_env();
        let notifications = NotificationConfig::from_env()?;

        Ok(Self {
            database_url,
            host,
            port,
            cors_allowed_origin,
            jwt,
            otp_ttl,
            order_tax_rate,
            email,
            frontend_url,
            admin_url,
            whatsapp,
            notifications,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: parse_env_or_default("SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: parse_env_or_default("SENTRY_TRACES_SAMPLE_RATE", "0.1")?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl JwtConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let secret = get_validated_secret("JWT_SECRET")?;
        validate_secret_length(&secret, "JWT_SECRET")?;

        Ok(Self {
            secret,
            expires_in: Duration::from_secs(parse_env_or_default(
                "JWT_EXPIRES_IN_SECS",
                "604800",
            )?),
        })
    }
}

impl EmailConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            smtp_host: get_required_env("SMTP_HOST")?,
            smtp_port: parse_env_or_default("SMTP_PORT", "587")?,
            smtp_username: get_required_env("SMTP_USERNAME")?,
            smtp_password: get_required_secret("SMTP_PASSWORD")?,
            from_address: get_required_env("EMAIL_FROM")?,
            from_name: get_env_or_default("EMAIL_FROM_NAME", "Exprz Ecommerce"),
            admin_email: get_required_env("ADMIN_EMAIL")?,
            support_email: get_optional_env("SUPPORT_EMAIL"),
        })
    }
}

impl WhatsAppConfig {
    fn from_env() -> Option<Self> {
        let account_sid = get_optional_env("TWILIO_ACCOUNT_SID")?;
        let auth_token = get_optional_env("TWILIO_AUTH_TOKEN")?;
        let admin_to = get_optional_env("ADMIN_WHATSAPP_TO")?;

        Some(Self {
            account_sid,
            auth_token: SecretString::from(auth_token),
            from: get_env_or_default("TWILIO_WHATSAPP_FROM", "whatsapp:+14155238886"),
            admin_to,
            country_code: get_env_or_default("WHATSAPP_COUNTRY_CODE", "+91"),
        })
    }
}

impl NotificationConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let interval_secs: u64 = parse_env_or_default("NOTIFICATION_RETRY_INTERVAL_SECS", "3600")?;
        if interval_secs == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "NOTIFICATION_RETRY_INTERVAL_SECS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            retry_interval: Duration::from_secs(interval_secs),
            retry_batch: parse_env_or_default("NOTIFICATION_RETRY_BATCH", "10")?,
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

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable. Empty values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
fn parse_env_or_default<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    get_env_or_default(key, default)
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Get a required absolute http(s) URL.
fn get_url(key: &str) -> Result<Url, ConfigError> {
    let raw = get_required_env(key)?;
    let url = Url::parse(&raw)
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    Ok(url)
}

/// Validate that a signing secret meets minimum length requirements.
fn validate_secret_length(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_JWT_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_JWT_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
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

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
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
