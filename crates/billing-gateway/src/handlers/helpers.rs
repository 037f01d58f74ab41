//! Common Handler Helpers
//!
//! Consistent error responses for the handlers:
//!
//! - [`extract_user_id_or_unauthorized`] - Extract user_id from JWT or return 401
//! - [`validate_request`] - Validate a request or return 400
//! - [`billing_error_response`] - Map a [`BillingError`] to 400 or 500 with logging

use actix_web::{HttpRequest, HttpResponse};
use validator::Validate;

use crate::middleware::get_user_id;
use crate::models::ErrorResponse;
use crate::services::BillingError;

/// Extract user_id from JWT claims or return 401 Unauthorized
///
/// # Example
///
/// ```ignore
/// let user_id = match extract_user_id_or_unauthorized(&req_http) {
///     Ok(id) => id,
///     Err(resp) => return resp,
/// };
/// ```
pub fn extract_user_id_or_unauthorized(req: &HttpRequest) -> Result<String, HttpResponse> {
    get_user_id(req).map_err(|_| {
        HttpResponse::Unauthorized().json(ErrorResponse::new(
            "unauthorized",
            "Authentication required",
        ))
    })
}

/// Validate a request struct or return 400 Bad Request
///
/// Field errors are returned in `details`.
pub fn validate_request<T: Validate>(req: &T) -> Result<(), HttpResponse> {
    req.validate().map_err(|e| {
        HttpResponse::BadRequest().json(ErrorResponse::with_details(
            "validation_error",
            "Validation failed",
            serde_json::to_value(&e).unwrap_or_default(),
        ))
    })
}

/// Convert a billing failure into an HTTP response
///
/// Authentication failures become 400 so Stripe stops retrying forged or
/// stale deliveries; everything else is logged and answered with a 500
/// without internal details.
pub fn billing_error_response(err: &BillingError, context: &str) -> HttpResponse {
    if err.is_authentication_failure() {
        tracing::warn!(error = %err, "Rejected request during {}", context);
        return HttpResponse::BadRequest().json(ErrorResponse::new(
            "invalid_webhook",
            "Webhook signature or payload verification failed",
        ));
    }

    tracing::error!(error = %err, "Error during {}", context);
    HttpResponse::InternalServerError().json(ErrorResponse::new(
        "internal_error",
        format!("Failed to {}", context),
    ))
}
