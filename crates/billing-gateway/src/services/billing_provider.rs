//! Billing provider seam
//!
//! The subscription workflows only talk to the payment provider through
//! [`BillingProvider`]. Production wires in [`super::StripeService`]; tests
//! substitute a mock so no network is involved.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors raised while processing billing events and operations
#[derive(Debug, Error)]
pub enum BillingError {
    /// Missing, malformed, stale or forged `Stripe-Signature` header
    #[error("Invalid webhook signature: {0}")]
    InvalidSignature(String),

    /// Signed body that is not a usable event
    #[error("Invalid webhook payload: {0}")]
    InvalidPayload(String),

    /// Remote call to the provider failed
    #[error("Stripe API error: {0}")]
    Provider(String),

    /// Local subscription store failed
    #[error("Storage error: {0}")]
    Storage(#[from] shared::Error),
}

impl BillingError {
    /// Whether the caller failed to prove the request came from the provider
    ///
    /// These are answered with 400 instead of 500.
    pub fn is_authentication_failure(&self) -> bool {
        matches!(self, Self::InvalidSignature(_) | Self::InvalidPayload(_))
    }
}

impl From<stripe::StripeError> for BillingError {
    fn from(err: stripe::StripeError) -> Self {
        Self::Provider(err.to_string())
    }
}

/// Customer record as seen by the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderCustomer {
    pub id: String,
    pub email: Option<String>,
}

/// Subscription record as seen by the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSubscription {
    pub id: String,
    pub customer_id: String,
    /// Auto-renew is off and the subscription ends with the current period
    pub cancel_at_period_end: bool,
    pub current_period_end: DateTime<Utc>,
}

/// Remote operations against the payment provider
#[async_trait]
pub trait BillingProvider: Send + Sync {
    /// Fetch a customer by provider id
    async fn retrieve_customer(&self, customer_id: &str) -> Result<ProviderCustomer, BillingError>;

    /// First customer registered with `email`, if any
    async fn find_customer_by_email(
        &self,
        email: &str,
    ) -> Result<Option<ProviderCustomer>, BillingError>;

    /// Every active subscription of a customer, in provider order
    async fn list_subscriptions(
        &self,
        customer_id: &str,
    ) -> Result<Vec<ProviderSubscription>, BillingError>;

    /// Toggle cancel-at-period-end on one subscription
    async fn set_cancel_at_period_end(
        &self,
        subscription_id: &str,
        cancel: bool,
    ) -> Result<(), BillingError>;
}
