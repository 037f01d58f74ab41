//! Health check and discovery endpoints

use actix_web::{web, HttpResponse, Responder};
use serde::Serialize;
use shared::DbPool;
use utoipa::{OpenApi, ToSchema};

use crate::openapi::ApiDoc;

/// Health check response
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
    pub version: &'static str,
}

/// Health check endpoint
///
/// Reports whether the gateway can reach its database.
#[utoipa::path(
    get,
    path = "/api/v1/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Database unreachable", body = HealthResponse)
    )
)]
pub async fn health_check(pool: web::Data<DbPool>) -> impl Responder {
    let healthy = match shared::db::check_health(&pool).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Database health check failed");
            false
        }
    };

    let response = health_response(healthy);
    if healthy {
        HttpResponse::Ok().json(response)
    } else {
        HttpResponse::ServiceUnavailable().json(response)
    }
}

fn health_response(healthy: bool) -> HealthResponse {
    HealthResponse {
        status: if healthy { "healthy" } else { "unhealthy" },
        database: if healthy { "connected" } else { "disconnected" },
        version: env!("CARGO_PKG_VERSION"),
    }
}

/// OpenAPI JSON endpoint
#[utoipa::path(
    get,
    path = "/api/v1/openapi.json",
    tag = "Discovery",
    responses(
        (status = 200, description = "OpenAPI specification", content_type = "application/json")
    )
)]
pub async fn openapi_json() -> impl Responder {
    HttpResponse::Ok().content_type("application/json").body(
        ApiDoc::openapi()
            .to_json()
            .unwrap_or_else(|_| "{}".to_string()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, App};

    #[actix_web::test]
    async fn test_unhealthy_response() {
        let json = serde_json::to_value(health_response(false)).unwrap();
        assert_eq!(json["status"], "unhealthy");
        assert_eq!(json["database"], "disconnected");
    }

    #[actix_web::test]
    async fn test_openapi_lists_subscription_path() {
        let app = test::init_service(
            App::new().route("/api/v1/openapi.json", web::get().to(openapi_json)),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/v1/openapi.json").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert!(body["paths"]["/api/v1/subscription"]["post"].is_object());
        assert!(body["paths"]["/api/v1/subscription"]["patch"].is_object());
    }
}
