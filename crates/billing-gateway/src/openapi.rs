//! OpenAPI Documentation Configuration
//!
//! Generated with utoipa from the handler annotations and DTO schemas.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::handlers;
use crate::handlers::health::HealthResponse;
use crate::models;

/// OpenAPI documentation for the billing gateway
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Billing Gateway API",
        version = "1.0.0",
        description = "Keeps local user subscriptions in sync with Stripe.\n\n## Authentication\n\n- **Webhook**: `Stripe-Signature` header, verified with the endpoint signing secret\n- **Operator endpoints**: `Authorization: Bearer <JWT>`"
    ),
    servers(
        (url = "http://localhost:8080", description = "Development server")
    ),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Discovery", description = "API discovery and metadata"),
        (name = "Subscriptions", description = "Stripe webhooks and manual subscription operations")
    ),
    modifiers(&SecurityAddon),
    paths(
        // Health
        handlers::health_check,
        // Discovery
        handlers::openapi_json,
        // Subscriptions
        handlers::handle_subscription_webhook,
        handlers::update_subscription,
    ),
    components(
        schemas(
            // Common
            models::ErrorResponse,
            // Subscriptions
            models::WebhookResponse,
            models::SubscriptionOperationResponse,
            // Health
            HealthResponse,
        )
    )
)]
pub struct ApiDoc;

/// Security scheme modifier for the operator endpoints
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);

        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .description(Some("Operator JWT signed with the gateway's JWT_SECRET (HS256)."))
                    .build(),
            ),
        );
    }
}
