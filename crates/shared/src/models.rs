//! Data models matching the PostgreSQL database schema

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::Error;

/// Subscription tier of a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionType {
    /// Free trial (also the state a canceled subscription falls back to)
    Trial,
    /// Paying subscriber
    Paid,
}

impl SubscriptionType {
    /// Database / wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trial => "trial",
            Self::Paid => "paid",
        }
    }
}

impl std::fmt::Display for SubscriptionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SubscriptionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "trial" => Ok(Self::Trial),
            "paid" => Ok(Self::Paid),
            other => Err(Error::validation(format!(
                "Unknown subscription type: {}",
                other
            ))),
        }
    }
}

impl TryFrom<String> for SubscriptionType {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Local subscription record of a user, keyed by the user's email
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct UserSubscription {
    pub email: String,
    #[sqlx(rename = "type", try_from = "String")]
    #[serde(rename = "type")]
    pub subscription_type: SubscriptionType,
    pub is_recurring: bool,
    pub renewal_date: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// What to do with the stored renewal date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenewalDateUpdate {
    /// Leave the stored value as is
    #[default]
    Keep,
    /// Replace it
    Set(DateTime<Utc>),
    /// Remove it
    Clear,
}

impl RenewalDateUpdate {
    /// Resolve against the currently stored value
    pub fn apply(self, current: Option<DateTime<Utc>>) -> Option<DateTime<Utc>> {
        match self {
            Self::Keep => current,
            Self::Set(date) => Some(date),
            Self::Clear => None,
        }
    }
}

/// Changes written by a single `set_subscription` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionUpdate {
    pub is_recurring: bool,
    pub renewal_date: RenewalDateUpdate,
    /// `None` keeps the stored type (new records start as trial)
    pub subscription_type: Option<SubscriptionType>,
}

impl SubscriptionUpdate {
    /// A payment went through: recurring until `renewal_date`
    pub fn paid_until(renewal_date: DateTime<Utc>) -> Self {
        Self {
            is_recurring: true,
            renewal_date: RenewalDateUpdate::Set(renewal_date),
            subscription_type: Some(SubscriptionType::Paid),
        }
    }

    /// Only the auto-renew flag changes
    pub fn recurring(is_recurring: bool) -> Self {
        Self {
            is_recurring,
            renewal_date: RenewalDateUpdate::Keep,
            subscription_type: None,
        }
    }

    /// Back to trial, nothing left to renew
    pub fn reset_to_trial() -> Self {
        Self {
            is_recurring: false,
            renewal_date: RenewalDateUpdate::Clear,
            subscription_type: Some(SubscriptionType::Trial),
        }
    }
}
