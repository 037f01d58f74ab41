//! Route configuration for the API

use actix_web::web;

use crate::{handlers, middleware};

/// Configure all routes
///
/// The webhook and the operator endpoint share a path; only the PATCH
/// route is behind JWT authentication, the webhook authenticates through
/// its signature.
pub fn configure(cfg: &mut web::ServiceConfig, jwt_secret: &str) {
    cfg.service(
        web::scope("/api/v1")
            // Health check endpoint (no auth required)
            .route("/health", web::get().to(handlers::health_check))
            // OpenAPI JSON endpoint (no auth required)
            .route("/openapi.json", web::get().to(handlers::openapi_json))
            .service(
                web::resource("/subscription")
                    // Stripe webhook (no auth - uses signature verification)
                    .route(web::post().to(handlers::handle_subscription_webhook))
                    // Manual operations (JWT auth)
                    .route(
                        web::patch()
                            .to(handlers::update_subscription)
                            .wrap(middleware::JwtAuth::new(jwt_secret.to_string())),
                    ),
            ),
    );
}
