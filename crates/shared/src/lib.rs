//! Shared library for the subscription sync backend
//!
//! This crate provides common functionality used by the billing gateway:
//! - Database connection pooling, migrations and health checks
//! - Data models matching the PostgreSQL schema
//! - Error handling types
//! - Configuration management
//! - Logging infrastructure

pub mod config;
pub mod db;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use config::{Config, DatabaseConfig, ServerConfig, StripeSettings};
pub use db::DbPool;
pub use error::{Error, Result};
pub use models::{RenewalDateUpdate, SubscriptionType, SubscriptionUpdate, UserSubscription};

/// Initialize tracing subscriber for structured logging
///
/// `RUST_LOG` overrides the default filter. Set `LOG_FORMAT=json` to emit
/// one JSON object per line (for log shippers).
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "shared=debug,billing_gateway=debug,info".into());

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
