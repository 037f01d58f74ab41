//! Subscription handlers
//!
//! - `POST /api/v1/subscription`: Stripe webhook receiver (signature auth)
//! - `PATCH /api/v1/subscription`: manual cancel/resubscribe (JWT auth)

use actix_web::{web, HttpRequest, HttpResponse, Responder};
use tracing::info;

use super::helpers::{billing_error_response, extract_user_id_or_unauthorized, validate_request};
use crate::models::{
    ErrorResponse, SubscriptionOperationResponse, UpdateSubscriptionQuery, WebhookResponse,
};
use crate::services::{SubscriptionService, SIGNATURE_HEADER};

/// Handle Stripe subscription webhooks
///
/// POST /api/v1/subscription
///
/// Processes `invoice.paid`, `customer.subscription.updated` and
/// `customer.subscription.deleted`. Other event types are acknowledged
/// with `success: false`.
#[utoipa::path(
    post,
    path = "/api/v1/subscription",
    tag = "Subscriptions",
    request_body(content = String, description = "Raw webhook payload", content_type = "application/json"),
    params(
        ("Stripe-Signature" = String, Header, description = "Stripe webhook signature")
    ),
    responses(
        (status = 200, description = "Webhook processed", body = WebhookResponse),
        (status = 400, description = "Invalid signature or payload", body = ErrorResponse),
        (status = 500, description = "Stripe or database failure", body = ErrorResponse)
    )
)]
pub async fn handle_subscription_webhook(
    service: web::Data<SubscriptionService>,
    req_http: HttpRequest,
    payload: web::Bytes,
) -> impl Responder {
    let signature = req_http
        .headers()
        .get(SIGNATURE_HEADER)
        .and_then(|h| h.to_str().ok());

    match service.handle_webhook(&payload, signature).await {
        Ok(success) => HttpResponse::Ok().json(WebhookResponse { success }),
        Err(e) => billing_error_response(&e, "process webhook"),
    }
}

/// Cancel or resume a customer's subscriptions
///
/// PATCH /api/v1/subscription?email=...&operation=cancel|resubscribe
///
/// Changes are made on Stripe only; the local record follows through the
/// resulting `customer.subscription.updated` webhook.
#[utoipa::path(
    patch,
    path = "/api/v1/subscription",
    tag = "Subscriptions",
    params(UpdateSubscriptionQuery),
    responses(
        (status = 200, description = "Operation outcome", body = SubscriptionOperationResponse),
        (status = 400, description = "Missing or invalid query parameters", body = ErrorResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorResponse),
        (status = 500, description = "Stripe failure", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_subscription(
    service: web::Data<SubscriptionService>,
    req_http: HttpRequest,
    query: web::Query<UpdateSubscriptionQuery>,
) -> impl Responder {
    let user_id = match extract_user_id_or_unauthorized(&req_http) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    if let Err(resp) = validate_request(&*query) {
        return resp;
    }

    info!(
        operator = %user_id,
        email = %query.email,
        operation = %query.operation,
        "Manual subscription operation requested"
    );

    match service.apply_operation(&query.email, &query.operation).await {
        Ok(outcome) => HttpResponse::Ok().json(SubscriptionOperationResponse::from(outcome)),
        Err(e) => billing_error_response(&e, "update subscription"),
    }
}
