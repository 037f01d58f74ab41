//! Stripe Billing Service
//!
//! [`BillingProvider`] implementation backed by the Stripe REST API.
//!
//! # Security
//!
//! - The API key comes from [`shared::StripeSettings`] and is never logged
//! - Customer and subscription ids are validated before any request is sent

use async_trait::async_trait;
use chrono::DateTime;
use stripe::{
    Client, Customer, CustomerId, ListCustomers, ListSubscriptions, Subscription,
    SubscriptionId, UpdateSubscription,
};

use super::billing_provider::{
    BillingError, BillingProvider, ProviderCustomer, ProviderSubscription,
};

/// Page size for subscription listings (Stripe maximum)
const SUBSCRIPTIONS_PAGE_SIZE: u64 = 100;

/// Service for Stripe subscription operations
#[derive(Clone)]
pub struct StripeService {
    client: Client,
}

impl StripeService {
    /// Create a new StripeService from the loaded Stripe settings
    pub fn new(settings: &shared::StripeSettings) -> Self {
        Self {
            client: Client::new(settings.api_key.clone()),
        }
    }
}

fn parse_customer_id(id: &str) -> Result<CustomerId, BillingError> {
    id.parse::<CustomerId>()
        .map_err(|e| BillingError::Provider(format!("Invalid customer id {}: {}", id, e)))
}

fn parse_subscription_id(id: &str) -> Result<SubscriptionId, BillingError> {
    id.parse::<SubscriptionId>()
        .map_err(|e| BillingError::Provider(format!("Invalid subscription id {}: {}", id, e)))
}

impl From<Customer> for ProviderCustomer {
    fn from(customer: Customer) -> Self {
        Self {
            id: customer.id.to_string(),
            email: customer.email,
        }
    }
}

impl TryFrom<&Subscription> for ProviderSubscription {
    type Error = BillingError;

    fn try_from(subscription: &Subscription) -> Result<Self, Self::Error> {
        let current_period_end = DateTime::from_timestamp(subscription.current_period_end, 0)
            .ok_or_else(|| {
                BillingError::Provider(format!(
                    "Invalid current_period_end on subscription {}",
                    subscription.id
                ))
            })?;

        Ok(Self {
            id: subscription.id.to_string(),
            customer_id: subscription.customer.id().to_string(),
            cancel_at_period_end: subscription.cancel_at_period_end,
            current_period_end,
        })
    }
}

#[async_trait]
impl BillingProvider for StripeService {
    async fn retrieve_customer(&self, customer_id: &str) -> Result<ProviderCustomer, BillingError> {
        let id = parse_customer_id(customer_id)?;
        let customer = Customer::retrieve(&self.client, &id, &[]).await?;
        Ok(customer.into())
    }

    async fn find_customer_by_email(
        &self,
        email: &str,
    ) -> Result<Option<ProviderCustomer>, BillingError> {
        let mut params = ListCustomers::new();
        params.email = Some(email);
        params.limit = Some(1);

        let customers = Customer::list(&self.client, &params).await?;
        Ok(customers.data.into_iter().next().map(ProviderCustomer::from))
    }

    async fn list_subscriptions(
        &self,
        customer_id: &str,
    ) -> Result<Vec<ProviderSubscription>, BillingError> {
        let customer = parse_customer_id(customer_id)?;
        let mut subscriptions = Vec::new();
        let mut starting_after: Option<SubscriptionId> = None;

        loop {
            let mut params = ListSubscriptions::new();
            params.customer = Some(customer.clone());
            params.limit = Some(SUBSCRIPTIONS_PAGE_SIZE);
            params.starting_after = starting_after.take();

            let page = Subscription::list(&self.client, &params).await?;
            for subscription in &page.data {
                subscriptions.push(ProviderSubscription::try_from(subscription)?);
            }

            match page.data.last() {
                Some(last) if page.has_more => starting_after = Some(last.id.clone()),
                _ => break,
            }
        }

        tracing::debug!(
            customer_id,
            count = subscriptions.len(),
            "Listed Stripe subscriptions"
        );

        Ok(subscriptions)
    }

    async fn set_cancel_at_period_end(
        &self,
        subscription_id: &str,
        cancel: bool,
    ) -> Result<(), BillingError> {
        let id = parse_subscription_id(subscription_id)?;

        let mut params = UpdateSubscription::new();
        params.cancel_at_period_end = Some(cancel);

        Subscription::update(&self.client, &id, params).await?;
        Ok(())
    }
}
