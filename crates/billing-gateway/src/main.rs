//! Billing Gateway
//!
//! Receives Stripe subscription webhooks and exposes manual subscription
//! operations for operators.

use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use anyhow::Context;
use billing_gateway::{
    middleware,
    repositories::PostgresSubscriptionStore,
    routes,
    services::{StripeService, SubscriptionService, WebhookVerifier},
};
use shared::{db, Config};
use tracing_actix_web::TracingLogger;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    shared::init_tracing();

    tracing::info!("Starting Billing Gateway...");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;

    // Create database connection pool
    let db_pool = db::create_pool(&config.database)
        .await
        .context("Failed to create database pool")?;

    // Run database migrations
    db::run_migrations(&db_pool)
        .await
        .context("Failed to run database migrations")?;

    // Check database health
    db::check_health(&db_pool)
        .await
        .context("Database health check failed")?;

    // Build the subscription service once; handlers share it
    let subscription_service = web::Data::new(SubscriptionService::new(
        Arc::new(StripeService::new(&config.stripe)),
        Arc::new(PostgresSubscriptionStore::new(db_pool.clone())),
        WebhookVerifier::from_settings(&config.stripe),
    ));

    let server_addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!("Billing Gateway listening on {}", server_addr);

    let jwt_secret = config.server.jwt_secret.clone();
    let allowed_origins = config.server.allowed_origins.clone();

    // Start HTTP server
    HttpServer::new(move || {
        App::new()
            // Request spans and access logs
            .wrap(TracingLogger::default())
            .wrap(middleware::cors(&allowed_origins))
            // App state
            .app_data(web::Data::new(db_pool.clone()))
            .app_data(subscription_service.clone())
            // Configure routes
            .configure(|cfg| routes::configure(cfg, &jwt_secret))
    })
    .bind(&server_addr)
    .with_context(|| format!("Failed to bind to {}", server_addr))?
    .run()
    .await
    .context("Server error")?;

    Ok(())
}
