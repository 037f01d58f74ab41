//! Subscription synchronization
//!
//! Keeps local subscription records in line with Stripe:
//!
//! - **Webhooks**: verified events update the local record of the customer's user
//! - **Manual operations**: cancel or resume auto-renew on Stripe for a customer
//!
//! Manual operations never touch the local store. Stripe follows up with a
//! `customer.subscription.updated` event which reconciles it.

use std::str::FromStr;
use std::sync::Arc;

use shared::SubscriptionUpdate;
use tracing::{debug, info, warn};

use super::billing_provider::{BillingError, BillingProvider};
use super::webhook::{ProviderEvent, WebhookVerifier};
use crate::repositories::SubscriptionStore;

/// Operation requested through the manual endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionOperation {
    /// Stop auto-renew at the end of the current period
    Cancel,
    /// Undo a pending cancellation
    Resubscribe,
}

impl FromStr for SubscriptionOperation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cancel" => Ok(Self::Cancel),
            "resubscribe" => Ok(Self::Resubscribe),
            other => Err(format!("Unknown operation: {}", other)),
        }
    }
}

/// Result of a manual operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationOutcome {
    Applied,
    CustomerNotFound,
    NothingToResubscribe,
    InvalidOperation,
}

impl OperationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Applied)
    }

    /// Message shown to the caller on failure
    pub fn message(&self) -> Option<&'static str> {
        match self {
            Self::Applied => None,
            Self::CustomerNotFound => Some("Customer not found"),
            Self::NothingToResubscribe => Some("No subscription found that is set to cancel"),
            Self::InvalidOperation => Some("Invalid operation"),
        }
    }
}

/// Applies Stripe subscription changes to the local store
pub struct SubscriptionService {
    provider: Arc<dyn BillingProvider>,
    store: Arc<dyn SubscriptionStore>,
    verifier: WebhookVerifier,
}

impl SubscriptionService {
    pub fn new(
        provider: Arc<dyn BillingProvider>,
        store: Arc<dyn SubscriptionStore>,
        verifier: WebhookVerifier,
    ) -> Self {
        Self {
            provider,
            store,
            verifier,
        }
    }

    /// Verify a webhook delivery and apply it
    ///
    /// Returns whether a local record was updated (`false` for ignored
    /// event types and soft failures).
    ///
    /// # Errors
    ///
    /// Signature and payload failures are returned before anything else
    /// happens. Stripe and store failures are returned as is so the
    /// delivery gets retried.
    pub async fn handle_webhook(
        &self,
        payload: &[u8],
        signature: Option<&str>,
    ) -> Result<bool, BillingError> {
        let event = self.verifier.construct_event(payload, signature)?;
        debug!(event_type = event.event_type(), "Verified Stripe webhook");

        let Some(customer_id) = event.customer_id() else {
            warn!(event_type = event.event_type(), "Unhandled Stripe event type");
            return Ok(false);
        };

        let email = self.customer_email(customer_id).await?;
        let success = match email.as_deref() {
            Some(email) => self.apply_event(&event, customer_id, email).await?,
            None => false,
        };

        info!(
            event_type = event.event_type(),
            customer_id,
            email = email.as_deref(),
            success,
            "Processed Stripe webhook"
        );
        Ok(success)
    }

    async fn apply_event(
        &self,
        event: &ProviderEvent,
        customer_id: &str,
        email: &str,
    ) -> Result<bool, BillingError> {
        match event {
            ProviderEvent::InvoicePaid { .. } => self.on_invoice_paid(customer_id, email).await,
            ProviderEvent::SubscriptionUpdated {
                cancel_at_period_end,
                ..
            } => {
                self.on_subscription_updated(email, *cancel_at_period_end)
                    .await
            }
            ProviderEvent::SubscriptionDeleted { .. } => self.on_subscription_deleted(email).await,
            ProviderEvent::Unknown(_) => Ok(false),
        }
    }

    async fn on_invoice_paid(&self, customer_id: &str, email: &str) -> Result<bool, BillingError> {
        let subscriptions = self.provider.list_subscriptions(customer_id).await?;
        let Some(subscription) = subscriptions.first() else {
            warn!(customer_id, "Invoice paid for a customer without subscriptions");
            return Ok(false);
        };

        let renewal_date = subscription.current_period_end;
        debug!(email, renewal_date = %renewal_date, "Marking subscription paid");

        let updated = self
            .store
            .set_subscription(email, SubscriptionUpdate::paid_until(renewal_date))
            .await?;
        Ok(updated.is_some())
    }

    async fn on_subscription_updated(
        &self,
        email: &str,
        cancel_at_period_end: bool,
    ) -> Result<bool, BillingError> {
        let existing = self.store.get_subscription(email).await?;
        // Records without a renewal date never went through a payment
        if !existing.is_some_and(|s| s.renewal_date.is_some()) {
            debug!(email, "No paid subscription to update");
            return Ok(true);
        }

        let updated = self
            .store
            .set_subscription(email, SubscriptionUpdate::recurring(!cancel_at_period_end))
            .await?;
        Ok(updated.is_some())
    }

    async fn on_subscription_deleted(&self, email: &str) -> Result<bool, BillingError> {
        let updated = self
            .store
            .set_subscription(email, SubscriptionUpdate::reset_to_trial())
            .await?;
        Ok(updated.is_some())
    }

    async fn customer_email(&self, customer_id: &str) -> Result<Option<String>, BillingError> {
        let customer = self.provider.retrieve_customer(customer_id).await?;
        if customer.email.is_none() {
            warn!(customer_id, "Stripe customer has no email");
        }
        Ok(customer.email)
    }

    /// Cancel or resume auto-renew on Stripe for the customer with `email`
    ///
    /// The customer is looked up before `operation` is validated.
    pub async fn apply_operation(
        &self,
        email: &str,
        operation: &str,
    ) -> Result<OperationOutcome, BillingError> {
        let Some(customer) = self.provider.find_customer_by_email(email).await? else {
            return Ok(OperationOutcome::CustomerNotFound);
        };

        let Ok(operation) = operation.parse::<SubscriptionOperation>() else {
            return Ok(OperationOutcome::InvalidOperation);
        };

        let subscriptions = self.provider.list_subscriptions(&customer.id).await?;

        match operation {
            SubscriptionOperation::Cancel => {
                for subscription in &subscriptions {
                    self.provider
                        .set_cancel_at_period_end(&subscription.id, true)
                        .await?;
                }
                info!(
                    email,
                    customer_id = %customer.id,
                    count = subscriptions.len(),
                    "Subscriptions set to cancel at period end"
                );
                Ok(OperationOutcome::Applied)
            }
            SubscriptionOperation::Resubscribe => {
                let Some(pending) = subscriptions.iter().find(|s| s.cancel_at_period_end) else {
                    return Ok(OperationOutcome::NothingToResubscribe);
                };
                self.provider
                    .set_cancel_at_period_end(&pending.id, false)
                    .await?;
                info!(
                    email,
                    customer_id = %customer.id,
                    subscription_id = %pending.id,
                    "Subscription resumed"
                );
                Ok(OperationOutcome::Applied)
            }
        }
    }
}
