//! Middleware for the billing gateway

pub mod jwt_auth;

pub use jwt_auth::{get_user_id, JwtAuth};

use actix_cors::Cors;
use actix_web::http;

/// Configure CORS middleware
///
/// Debug builds allow localhost origins. Release builds only allow the
/// configured whitelist and deny everything when it is empty.
pub fn cors(allowed_origins: &[String]) -> Cors {
    let origins = allowed_origins.to_vec();

    Cors::default()
        .allowed_origin_fn(move |origin, _req_head| {
            let origin_str = origin.to_str().unwrap_or("");

            if cfg!(debug_assertions) {
                origin_str.starts_with("http://localhost")
                    || origin_str.starts_with("http://127.0.0.1")
                    || origins.iter().any(|allowed| origin_str == allowed)
            } else if origins.is_empty() {
                tracing::warn!("ALLOWED_ORIGINS not set. Denying all CORS requests in production.");
                false
            } else {
                origins.iter().any(|allowed| origin_str == allowed)
            }
        })
        // Webhook deliveries are server-to-server
        .allowed_methods(vec!["GET", "PATCH"])
        .allowed_headers(vec![
            http::header::AUTHORIZATION,
            http::header::ACCEPT,
            http::header::CONTENT_TYPE,
        ])
        .max_age(3600)
}
