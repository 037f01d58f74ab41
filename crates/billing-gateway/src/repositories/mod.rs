//! Repository layer for database access

pub mod subscriptions;

// Re-exports
pub use subscriptions::{InMemorySubscriptionStore, PostgresSubscriptionStore, SubscriptionStore};
