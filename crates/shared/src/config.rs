//! Configuration management using environment variables
//!
//! Configuration is loaded once at process startup and handed to the
//! components that need it. Nothing reads Stripe credentials from the
//! environment after [`Config::from_env`] returns.
//!
//! # Security
//!
//! - `STRIPE_API_KEY` must look like a Stripe secret or restricted key
//! - `STRIPE_SIGNING_SECRET` must look like a webhook signing secret
//! - `JWT_SECRET` must be at least 32 characters in release builds

use crate::error::{Error, Result};
use serde::Deserialize;
use std::env;

/// Default tolerance for webhook timestamps, matching Stripe's libraries
pub const DEFAULT_WEBHOOK_TOLERANCE_SECS: i64 = 300;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Database configuration
    pub database: DatabaseConfig,

    /// Server configuration
    pub server: ServerConfig,

    /// Stripe credentials
    pub stripe: StripeSettings,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database host
    pub host: String,

    /// Database port
    pub port: u16,

    /// Database name
    pub name: String,

    /// Database user
    pub user: String,

    /// Database password
    pub password: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Connection acquire timeout in seconds
    pub acquire_timeout_secs: u64,

    /// SSL mode for database connection
    /// Options: disable, allow, prefer, require, verify-ca, verify-full
    pub ssl_mode: String,
}

impl DatabaseConfig {
    /// Build a PostgreSQL connection URL with SSL mode
    pub fn connection_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}?sslmode={}",
            self.user, self.password, self.host, self.port, self.name, self.ssl_mode
        )
    }
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// JWT secret for the operator endpoints
    pub jwt_secret: String,

    /// Origins allowed by CORS (empty = none in release builds)
    pub allowed_origins: Vec<String>,
}

/// Stripe credentials
///
/// `Debug` is implemented by hand so secrets never reach the logs.
#[derive(Clone, Deserialize)]
pub struct StripeSettings {
    /// Secret API key used for outbound calls
    pub api_key: String,

    /// Signing secret used to verify inbound webhook payloads
    pub signing_secret: String,

    /// Maximum age (and clock skew) accepted for a webhook timestamp
    pub webhook_tolerance_secs: i64,
}

impl std::fmt::Debug for StripeSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeSettings")
            .field("api_key", &"[redacted]")
            .field("signing_secret", &"[redacted]")
            .field("webhook_tolerance_secs", &self.webhook_tolerance_secs)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        Ok(Self {
            database: DatabaseConfig {
                host: env::var("DB_HOST").unwrap_or_else(|_| "localhost".to_string()),
                port: parse_var("DB_PORT", "5432")?,
                name: env::var("DB_NAME").unwrap_or_else(|_| "subscriptions".to_string()),
                user: env::var("DB_USER").unwrap_or_else(|_| "postgres".to_string()),
                password: env::var("DB_PASSWORD")
                    .map_err(|_| Error::config("DB_PASSWORD must be set"))?,
                max_connections: parse_var("DB_MAX_CONNECTIONS", "20")?,
                acquire_timeout_secs: parse_var("DB_ACQUIRE_TIMEOUT", "5")?,
                ssl_mode: env::var("DB_SSL_MODE").unwrap_or_else(|_| {
                    if cfg!(debug_assertions) {
                        "prefer".to_string()
                    } else {
                        "verify-full".to_string()
                    }
                }),
            },
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_var("SERVER_PORT", "8080")?,
                jwt_secret: Self::load_jwt_secret()?,
                allowed_origins: parse_origins(
                    &env::var("ALLOWED_ORIGINS").unwrap_or_default(),
                ),
            },
            stripe: StripeSettings {
                api_key: validate_stripe_api_key(
                    env::var("STRIPE_API_KEY")
                        .map_err(|_| Error::config("STRIPE_API_KEY must be set"))?,
                )?,
                signing_secret: validate_signing_secret(
                    env::var("STRIPE_SIGNING_SECRET")
                        .map_err(|_| Error::config("STRIPE_SIGNING_SECRET must be set"))?,
                )?,
                webhook_tolerance_secs: parse_var(
                    "STRIPE_WEBHOOK_TOLERANCE_SECS",
                    &DEFAULT_WEBHOOK_TOLERANCE_SECS.to_string(),
                )?,
            },
        })
    }

    /// Load the JWT secret
    ///
    /// Debug builds fall back to a development secret with a warning.
    /// Release builds require `JWT_SECRET` with at least 32 characters.
    fn load_jwt_secret() -> Result<String> {
        match env::var("JWT_SECRET") {
            Ok(secret) => validate_jwt_secret(secret, cfg!(debug_assertions)),
            Err(_) if cfg!(debug_assertions) => {
                tracing::warn!(
                    "JWT_SECRET not set - using development default. \
                     DO NOT use in production!"
                );
                Ok("dev_secret_change_in_production_32chars".to_string())
            }
            Err(_) => Err(Error::config(
                "JWT_SECRET environment variable must be set in production",
            )),
        }
    }
}

fn parse_var<T>(name: &str, default: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .map_err(|e| Error::config(format!("Invalid {}: {}", name, e)))
}

/// Split a comma-separated origin list, dropping blanks
pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Check that the API key has the shape of a Stripe secret or restricted key
pub fn validate_stripe_api_key(key: String) -> Result<String> {
    if key.starts_with("sk_test_") || key.starts_with("sk_live_") || key.starts_with("rk_") {
        Ok(key)
    } else {
        Err(Error::config(
            "STRIPE_API_KEY must start with sk_test_, sk_live_ or rk_",
        ))
    }
}

/// Check that the signing secret has the shape of a webhook endpoint secret
pub fn validate_signing_secret(secret: String) -> Result<String> {
    if secret.starts_with("whsec_") && secret.len() > "whsec_".len() {
        Ok(secret)
    } else {
        Err(Error::config("STRIPE_SIGNING_SECRET must start with whsec_"))
    }
}

/// Enforce the minimum JWT secret length outside development
pub fn validate_jwt_secret(secret: String, development: bool) -> Result<String> {
    if secret.len() < 32 {
        if development {
            tracing::warn!(
                length = secret.len(),
                "JWT_SECRET is shorter than 32 characters"
            );
        } else {
            return Err(Error::config(format!(
                "JWT_SECRET must be at least 32 characters (256 bits of entropy). \
                 Current length: {} characters",
                secret.len()
            )));
        }
    }
    Ok(secret)
}
