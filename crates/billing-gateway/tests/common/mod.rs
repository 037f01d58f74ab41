//! Common test utilities for integration tests
//!
//! JWT and webhook-signature helpers plus an in-process Stripe stand-in,
//! so the full route table can be exercised without network access.

#![allow(dead_code)]

use async_trait::async_trait;
use billing_gateway::models::Claims;
use billing_gateway::services::webhook::sign_payload;
use billing_gateway::services::{
    BillingError, BillingProvider, ProviderCustomer, ProviderSubscription,
};
use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use shared::DbPool;
use sqlx::PgPool;
use std::sync::Mutex;

// Test configuration constants
pub const TEST_JWT_SECRET: &str = "test_jwt_secret_for_integration_tests";
pub const TEST_SIGNING_SECRET: &str = "whsec_integration_tests";

/// Generate a JWT token valid for one hour
///
/// ```ignore
/// let token = create_test_jwt("user_123", "operator");
///
/// let req = test::TestRequest::patch()
///     .uri("/api/v1/subscription?email=a@b.c&operation=cancel")
///     .insert_header(("Authorization", format!("Bearer {}", token)))
///     .to_request();
/// ```
pub fn create_test_jwt(user_id: &str, username: &str) -> String {
    sign_claims(&Claims::new(user_id.to_string(), username.to_string(), 1))
}

/// Generate a JWT token that expired an hour ago
pub fn create_expired_jwt(user_id: &str, username: &str) -> String {
    sign_claims(&Claims::new(user_id.to_string(), username.to_string(), -1))
}

fn sign_claims(claims: &Claims) -> String {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
    )
    .expect("Failed to create test JWT")
}

/// Serialize `event` and sign it the way Stripe would, timestamped now
pub fn signed_webhook(event: serde_json::Value) -> (Vec<u8>, String) {
    let body = serde_json::to_vec(&event).expect("Failed to serialize event");
    let header = sign_payload(TEST_SIGNING_SECRET, Utc::now().timestamp(), &body);
    (body, header)
}

/// Wrap `object` in a Stripe event envelope of type `event_type`
pub fn stripe_event(event_type: &str, object: serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "id": "evt_test",
        "object": "event",
        "type": event_type,
        "data": { "object": object }
    })
}

pub fn period_end() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2030, 1, 31, 12, 0, 0).unwrap()
}

/// In-process Stripe account
#[derive(Default)]
pub struct FakeStripe {
    customers: Vec<ProviderCustomer>,
    subscriptions: Mutex<Vec<ProviderSubscription>>,
}

impl FakeStripe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_customer(mut self, id: &str, email: Option<&str>) -> Self {
        self.customers.push(ProviderCustomer {
            id: id.to_string(),
            email: email.map(str::to_string),
        });
        self
    }

    pub fn with_subscription(self, id: &str, customer_id: &str, cancel_at_period_end: bool) -> Self {
        self.subscriptions
            .lock()
            .unwrap()
            .push(ProviderSubscription {
                id: id.to_string(),
                customer_id: customer_id.to_string(),
                cancel_at_period_end,
                current_period_end: period_end(),
            });
        self
    }

    /// `cancel_at_period_end` of a subscription, if it exists
    pub fn cancel_flag(&self, subscription_id: &str) -> Option<bool> {
        self.subscriptions
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.id == subscription_id)
            .map(|s| s.cancel_at_period_end)
    }
}

#[async_trait]
impl BillingProvider for FakeStripe {
    async fn retrieve_customer(&self, customer_id: &str) -> Result<ProviderCustomer, BillingError> {
        self.customers
            .iter()
            .find(|c| c.id == customer_id)
            .cloned()
            .ok_or_else(|| BillingError::Provider(format!("No such customer: '{}'", customer_id)))
    }

    async fn find_customer_by_email(
        &self,
        email: &str,
    ) -> Result<Option<ProviderCustomer>, BillingError> {
        Ok(self
            .customers
            .iter()
            .find(|c| c.email.as_deref() == Some(email))
            .cloned())
    }

    async fn list_subscriptions(
        &self,
        customer_id: &str,
    ) -> Result<Vec<ProviderSubscription>, BillingError> {
        Ok(self
            .subscriptions
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.customer_id == customer_id)
            .cloned()
            .collect())
    }

    async fn set_cancel_at_period_end(
        &self,
        subscription_id: &str,
        cancel: bool,
    ) -> Result<(), BillingError> {
        let mut subscriptions = self.subscriptions.lock().unwrap();
        let subscription = subscriptions
            .iter_mut()
            .find(|s| s.id == subscription_id)
            .ok_or_else(|| {
                BillingError::Provider(format!("No such subscription: '{}'", subscription_id))
            })?;
        subscription.cancel_at_period_end = cancel;
        Ok(())
    }
}

/// Connect to the database named by `TEST_DATABASE_URL` and migrate it
///
/// Tests using this are `#[ignore]`d; run them with
/// `TEST_DATABASE_URL=postgres://... cargo test -- --ignored`.
pub async fn create_test_pool() -> DbPool {
    let database_url = std::env::var("TEST_DATABASE_URL").expect(
        "TEST_DATABASE_URL environment variable not set. \
         Please set it to run integration tests with a real database.",
    );
    let pool = PgPool::connect(&database_url)
        .await
        .expect("Failed to connect to test database");
    shared::db::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");
    pool
}
