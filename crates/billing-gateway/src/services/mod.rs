//! Business logic services for the billing gateway
//!
//! This module contains services that encapsulate business logic
//! separate from HTTP handlers and database access.

pub mod billing_provider;
pub mod stripe_service;
pub mod subscription_service;
pub mod webhook;

pub use billing_provider::{BillingError, BillingProvider, ProviderCustomer, ProviderSubscription};
pub use stripe_service::StripeService;
pub use subscription_service::{OperationOutcome, SubscriptionOperation, SubscriptionService};
pub use webhook::{ProviderEvent, WebhookVerifier, SIGNATURE_HEADER};
