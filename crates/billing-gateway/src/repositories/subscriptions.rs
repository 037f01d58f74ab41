//! Local subscription store
//!
//! Subscriptions are keyed by the email of the owning user. A user must
//! already exist for a subscription to be written; writes for unknown
//! emails are dropped and reported as `None`.

use async_trait::async_trait;
use chrono::Utc;
use shared::{
    DbPool, Error, RenewalDateUpdate, Result, SubscriptionType, SubscriptionUpdate,
    UserSubscription,
};
use std::collections::HashMap;
use std::sync::Mutex;

/// Persistence of per-user subscription state
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Current subscription of the user with `email`
    async fn get_subscription(&self, email: &str) -> Result<Option<UserSubscription>>;

    /// Create or update the subscription of the user with `email`
    ///
    /// Returns `None` when no user is registered under `email`.
    async fn set_subscription(
        &self,
        email: &str,
        update: SubscriptionUpdate,
    ) -> Result<Option<UserSubscription>>;
}

/// PostgreSQL-backed store
pub struct PostgresSubscriptionStore {
    pool: DbPool,
}

impl PostgresSubscriptionStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubscriptionStore for PostgresSubscriptionStore {
    async fn get_subscription(&self, email: &str) -> Result<Option<UserSubscription>> {
        let subscription = sqlx::query_as::<_, UserSubscription>(
            r#"
            SELECT u.email, s.type, s.is_recurring, s.renewal_date, s.updated_at
            FROM user_subscriptions s
            JOIN users u ON u.id = s.user_id
            WHERE u.email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(subscription)
    }

    async fn set_subscription(
        &self,
        email: &str,
        update: SubscriptionUpdate,
    ) -> Result<Option<UserSubscription>> {
        let (touch_renewal, renewal_date) = match update.renewal_date {
            RenewalDateUpdate::Keep => (false, None),
            RenewalDateUpdate::Set(date) => (true, Some(date)),
            RenewalDateUpdate::Clear => (true, None),
        };

        // Single statement so concurrent deliveries for the same user
        // serialize on the row lock.
        let subscription = sqlx::query_as::<_, UserSubscription>(
            r#"
            WITH target AS (
                SELECT id, email FROM users WHERE email = $1
            ),
            upserted AS (
                INSERT INTO user_subscriptions
                    (user_id, type, is_recurring, renewal_date, created_at, updated_at)
                SELECT target.id, COALESCE($2, 'trial'), $3,
                       CASE WHEN $4 THEN $5 ELSE NULL END, NOW(), NOW()
                FROM target
                ON CONFLICT (user_id) DO UPDATE SET
                    type = COALESCE($2, user_subscriptions.type),
                    is_recurring = EXCLUDED.is_recurring,
                    renewal_date = CASE WHEN $4 THEN $5 ELSE user_subscriptions.renewal_date END,
                    updated_at = NOW()
                RETURNING user_id, type, is_recurring, renewal_date, updated_at
            )
            SELECT target.email, upserted.type, upserted.is_recurring,
                   upserted.renewal_date, upserted.updated_at
            FROM upserted
            JOIN target ON target.id = upserted.user_id
            "#,
        )
        .bind(email)
        .bind(update.subscription_type.map(|t| t.as_str()))
        .bind(update.is_recurring)
        .bind(touch_renewal)
        .bind(renewal_date)
        .fetch_optional(&self.pool)
        .await?;

        Ok(subscription)
    }
}

/// In-memory store for tests and local runs without a database
#[derive(Default)]
pub struct InMemorySubscriptionStore {
    users: Mutex<HashMap<String, Option<UserSubscription>>>,
}

impl InMemorySubscriptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user without a subscription
    pub fn with_user(self, email: &str) -> Self {
        if let Ok(mut users) = self.users.lock() {
            users.entry(email.to_string()).or_insert(None);
        }
        self
    }

    /// Register a user with an existing subscription
    pub fn with_subscription(self, subscription: UserSubscription) -> Self {
        if let Ok(mut users) = self.users.lock() {
            users.insert(subscription.email.clone(), Some(subscription));
        }
        self
    }

    /// Snapshot of the stored subscription, if any
    pub fn subscription(&self, email: &str) -> Option<UserSubscription> {
        self.users
            .lock()
            .ok()
            .and_then(|users| users.get(email).cloned().flatten())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Option<UserSubscription>>>> {
        self.users
            .lock()
            .map_err(|_| Error::internal("subscription store lock poisoned"))
    }
}

#[async_trait]
impl SubscriptionStore for InMemorySubscriptionStore {
    async fn get_subscription(&self, email: &str) -> Result<Option<UserSubscription>> {
        Ok(self.lock()?.get(email).cloned().flatten())
    }

    async fn set_subscription(
        &self,
        email: &str,
        update: SubscriptionUpdate,
    ) -> Result<Option<UserSubscription>> {
        let mut users = self.lock()?;
        let Some(slot) = users.get_mut(email) else {
            return Ok(None);
        };

        let (current_type, current_renewal) = match slot {
            Some(existing) => (existing.subscription_type, existing.renewal_date),
            None => (SubscriptionType::Trial, None),
        };

        let subscription = UserSubscription {
            email: email.to_string(),
            subscription_type: update.subscription_type.unwrap_or(current_type),
            is_recurring: update.is_recurring,
            renewal_date: update.renewal_date.apply(current_renewal),
            updated_at: Utc::now(),
        };
        *slot = Some(subscription.clone());

        Ok(Some(subscription))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn subscription(email: &str) -> UserSubscription {
        UserSubscription {
            email: email.to_string(),
            subscription_type: SubscriptionType::Paid,
            is_recurring: true,
            renewal_date: Some(Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap()),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_unknown_user_is_not_written() {
        let store = InMemorySubscriptionStore::new();

        let result = store
            .set_subscription("ghost@example.com", SubscriptionUpdate::recurring(true))
            .await
            .unwrap();

        assert!(result.is_none());
        assert!(store.get_subscription("ghost@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_first_write_starts_as_trial() {
        let store = InMemorySubscriptionStore::new().with_user("new@example.com");

        let written = store
            .set_subscription("new@example.com", SubscriptionUpdate::recurring(true))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(written.subscription_type, SubscriptionType::Trial);
        assert!(written.is_recurring);
        assert_eq!(written.renewal_date, None);
    }

    #[tokio::test]
    async fn test_keep_preserves_renewal_date_and_type() {
        let existing = subscription("paid@example.com");
        let store = InMemorySubscriptionStore::new().with_subscription(existing.clone());

        let written = store
            .set_subscription("paid@example.com", SubscriptionUpdate::recurring(false))
            .await
            .unwrap()
            .unwrap();

        assert!(!written.is_recurring);
        assert_eq!(written.renewal_date, existing.renewal_date);
        assert_eq!(written.subscription_type, SubscriptionType::Paid);
    }

    #[tokio::test]
    async fn test_reset_clears_renewal_date() {
        let store =
            InMemorySubscriptionStore::new().with_subscription(subscription("paid@example.com"));

        store
            .set_subscription("paid@example.com", SubscriptionUpdate::reset_to_trial())
            .await
            .unwrap();

        let stored = store.subscription("paid@example.com").unwrap();
        assert_eq!(stored.subscription_type, SubscriptionType::Trial);
        assert!(!stored.is_recurring);
        assert_eq!(stored.renewal_date, None);
    }
}
