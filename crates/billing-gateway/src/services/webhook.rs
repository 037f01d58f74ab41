//! Stripe webhook verification and event decoding
//!
//! The `Stripe-Signature` header carries a timestamp and one or more `v1`
//! signatures:
//!
//! ```text
//! Stripe-Signature: t=1700000000,v1=5257a869...,v1=...
//! ```
//!
//! A `v1` value is the hex HMAC-SHA256 of `"{t}.{raw body}"` keyed with the
//! endpoint signing secret. Any matching `v1` entry authenticates the body,
//! which allows signing secrets to be rolled. Timestamps further than the
//! tolerance from the local clock are rejected to stop replays.
//!
//! Only the fields the subscription workflows need are decoded from the
//! event body.

use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::billing_provider::BillingError;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the webhook signature
pub const SIGNATURE_HEADER: &str = "Stripe-Signature";

pub const INVOICE_PAID: &str = "invoice.paid";
pub const SUBSCRIPTION_UPDATED: &str = "customer.subscription.updated";
pub const SUBSCRIPTION_DELETED: &str = "customer.subscription.deleted";

/// Verified webhook event, reduced to what the workflows act on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    /// A subscription invoice was paid
    InvoicePaid { customer_id: String },
    /// A subscription changed, possibly toggling auto-renew
    SubscriptionUpdated {
        customer_id: String,
        cancel_at_period_end: bool,
    },
    /// A subscription ended
    SubscriptionDeleted { customer_id: String },
    /// Any other event type (acknowledged, not acted on)
    Unknown(String),
}

impl ProviderEvent {
    /// Stripe event type string
    pub fn event_type(&self) -> &str {
        match self {
            Self::InvoicePaid { .. } => INVOICE_PAID,
            Self::SubscriptionUpdated { .. } => SUBSCRIPTION_UPDATED,
            Self::SubscriptionDeleted { .. } => SUBSCRIPTION_DELETED,
            Self::Unknown(event_type) => event_type,
        }
    }

    pub fn customer_id(&self) -> Option<&str> {
        match self {
            Self::InvoicePaid { customer_id }
            | Self::SubscriptionUpdated { customer_id, .. }
            | Self::SubscriptionDeleted { customer_id } => Some(customer_id),
            Self::Unknown(_) => None,
        }
    }
}

/// Verifies `Stripe-Signature` headers for one webhook endpoint
#[derive(Clone)]
pub struct WebhookVerifier {
    signing_secret: String,
    tolerance_secs: i64,
}

impl std::fmt::Debug for WebhookVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookVerifier")
            .field("signing_secret", &"[redacted]")
            .field("tolerance_secs", &self.tolerance_secs)
            .finish()
    }
}

impl WebhookVerifier {
    pub fn new(signing_secret: impl Into<String>, tolerance_secs: i64) -> Self {
        Self {
            signing_secret: signing_secret.into(),
            tolerance_secs,
        }
    }

    pub fn from_settings(settings: &shared::StripeSettings) -> Self {
        Self::new(
            settings.signing_secret.clone(),
            settings.webhook_tolerance_secs,
        )
    }

    /// Authenticate `payload` and decode it into a [`ProviderEvent`]
    ///
    /// # Errors
    ///
    /// `InvalidSignature` when the header is missing or does not match,
    /// `InvalidPayload` when an authentic body cannot be decoded.
    pub fn construct_event(
        &self,
        payload: &[u8],
        signature: Option<&str>,
    ) -> Result<ProviderEvent, BillingError> {
        let signature = signature.ok_or_else(|| {
            BillingError::InvalidSignature(format!("missing {} header", SIGNATURE_HEADER))
        })?;
        self.verify(payload, signature, Utc::now().timestamp())?;
        parse_event(payload)
    }

    /// Check `header` against `payload` as of `now` (unix seconds)
    pub fn verify(&self, payload: &[u8], header: &str, now: i64) -> Result<(), BillingError> {
        let parsed = SignatureHeader::parse(header)?;

        if now.abs_diff(parsed.timestamp) > self.tolerance_secs.unsigned_abs() {
            return Err(BillingError::InvalidSignature(
                "timestamp outside the tolerance zone".to_string(),
            ));
        }

        let expected = self.expected_signature(parsed.timestamp, payload)?;
        let matched = parsed
            .signatures
            .iter()
            .any(|candidate| bool::from(expected.as_slice().ct_eq(candidate.as_slice())));

        if matched {
            Ok(())
        } else {
            Err(BillingError::InvalidSignature(
                "no signature matches the payload".to_string(),
            ))
        }
    }

    fn expected_signature(&self, timestamp: i64, payload: &[u8]) -> Result<Vec<u8>, BillingError> {
        let mut mac = HmacSha256::new_from_slice(self.signing_secret.as_bytes())
            .map_err(|e| BillingError::InvalidSignature(format!("unusable signing secret: {}", e)))?;
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        Ok(mac.finalize().into_bytes().to_vec())
    }
}

/// Build a `Stripe-Signature` header value for `payload`
///
/// Used to sign test deliveries the same way Stripe does.
pub fn sign_payload(signing_secret: &str, timestamp: i64, payload: &[u8]) -> String {
    let verifier = WebhookVerifier::new(signing_secret, 0);
    let signature = verifier
        .expected_signature(timestamp, payload)
        .map(hex::encode)
        .unwrap_or_default();
    format!("t={},v1={}", timestamp, signature)
}

struct SignatureHeader {
    timestamp: i64,
    signatures: Vec<Vec<u8>>,
}

impl SignatureHeader {
    fn parse(header: &str) -> Result<Self, BillingError> {
        let mut timestamp = None;
        let mut signatures = Vec::new();

        for part in header.split(',') {
            let Some((key, value)) = part.trim().split_once('=') else {
                continue;
            };
            match key {
                "t" => {
                    timestamp = Some(value.parse::<i64>().map_err(|_| {
                        BillingError::InvalidSignature("malformed timestamp".to_string())
                    })?);
                }
                // Undecodable entries can never match; skip them
                "v1" => {
                    if let Ok(bytes) = hex::decode(value) {
                        signatures.push(bytes);
                    }
                }
                _ => {}
            }
        }

        let timestamp = timestamp
            .ok_or_else(|| BillingError::InvalidSignature("missing timestamp".to_string()))?;
        if signatures.is_empty() {
            return Err(BillingError::InvalidSignature(
                "no v1 signature in header".to_string(),
            ));
        }

        Ok(Self {
            timestamp,
            signatures,
        })
    }
}

#[derive(Deserialize)]
struct EventEnvelope {
    #[serde(rename = "type")]
    event_type: String,
    data: EventData,
}

#[derive(Deserialize)]
struct EventData {
    object: EventObject,
}

#[derive(Deserialize)]
struct EventObject {
    customer: Option<CustomerRef>,
    cancel_at_period_end: Option<bool>,
}

/// `customer` is an id unless the event was sent with it expanded
#[derive(Deserialize)]
#[serde(untagged)]
enum CustomerRef {
    Id(String),
    Expanded { id: String },
}

impl CustomerRef {
    fn into_id(self) -> String {
        match self {
            Self::Id(id) | Self::Expanded { id } => id,
        }
    }
}

/// Decode an authenticated event body
pub fn parse_event(payload: &[u8]) -> Result<ProviderEvent, BillingError> {
    let envelope: EventEnvelope = serde_json::from_slice(payload)
        .map_err(|e| BillingError::InvalidPayload(e.to_string()))?;

    let EventEnvelope { event_type, data } = envelope;
    let object = data.object;

    let customer_id = |customer: Option<CustomerRef>| {
        customer.map(CustomerRef::into_id).ok_or_else(|| {
            BillingError::InvalidPayload(format!("{} event without a customer", event_type))
        })
    };

    match event_type.as_str() {
        INVOICE_PAID => Ok(ProviderEvent::InvoicePaid {
            customer_id: customer_id(object.customer)?,
        }),
        SUBSCRIPTION_UPDATED => {
            let customer_id = customer_id(object.customer)?;
            let cancel_at_period_end = object.cancel_at_period_end.ok_or_else(|| {
                BillingError::InvalidPayload(
                    "subscription update without cancel_at_period_end".to_string(),
                )
            })?;
            Ok(ProviderEvent::SubscriptionUpdated {
                customer_id,
                cancel_at_period_end,
            })
        }
        SUBSCRIPTION_DELETED => Ok(ProviderEvent::SubscriptionDeleted {
            customer_id: customer_id(object.customer)?,
        }),
        _ => Ok(ProviderEvent::Unknown(event_type.clone())),
    }
}
