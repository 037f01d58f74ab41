//! Subscription DTOs

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::services::OperationOutcome;

/// Acknowledgement returned to Stripe for a verified webhook
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct WebhookResponse {
    /// Whether a local subscription record was updated
    pub success: bool,
}

/// Query parameters of the manual subscription endpoint
#[derive(Debug, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UpdateSubscriptionQuery {
    /// Email of the Stripe customer
    #[validate(length(min = 1, max = 320))]
    pub email: String,

    /// `cancel` or `resubscribe`
    #[validate(length(min = 1, max = 32))]
    pub operation: String,
}

/// Result of a manual subscription operation
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "success": false,
    "message": "No subscription found that is set to cancel"
}))]
pub struct SubscriptionOperationResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<OperationOutcome> for SubscriptionOperationResponse {
    fn from(outcome: OperationOutcome) -> Self {
        Self {
            success: outcome.is_success(),
            message: outcome.message().map(str::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_applied_outcome_has_no_message() {
        let response = SubscriptionOperationResponse::from(OperationOutcome::Applied);
        assert_eq!(serde_json::to_value(response).unwrap(), json!({"success": true}));
    }

    #[test]
    fn test_failed_outcome_carries_message() {
        let response = SubscriptionOperationResponse::from(OperationOutcome::CustomerNotFound);
        assert_eq!(
            serde_json::to_value(response).unwrap(),
            json!({"success": false, "message": "Customer not found"})
        );
    }

    #[test]
    fn test_query_validation() {
        let valid = UpdateSubscriptionQuery {
            email: "user@example.com".to_string(),
            operation: "cancel".to_string(),
        };
        assert!(valid.validate().is_ok());

        let empty = UpdateSubscriptionQuery {
            email: String::new(),
            operation: "cancel".to_string(),
        };
        assert!(empty.validate().is_err());
    }
}
