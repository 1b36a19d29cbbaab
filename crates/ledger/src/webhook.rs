//! Payment-provider webhook reconciliation
//!
//! The provider delivers events at least once and keys its retries off
//! the HTTP status alone, so the pipeline here is strictly: authenticate
//! the callback token, parse the envelope, resolve the account, dispatch
//! by event type. Every dispatched path acknowledges success; only the
//! structural failures (bad token, malformed body, missing email,
//! unknown account) surface as non-2xx. Unknown event types are
//! acknowledged without touching anything so the provider does not
//! retry-storm us over events we do not care about.

use serde::Deserialize;
use sqlx::PgPool;
use subtle::ConstantTimeEq;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::WebhookError;
use crate::ledger::TokenLedger;
use crate::packages::TokenPackage;
use crate::subscription::SubscriptionStore;

pub const EVENT_TESTING: &str = "testing";
pub const EVENT_PAYMENT_SUCCESS: &str = "payment.success";
pub const EVENT_PAYMENT_RECEIVED: &str = "payment.received";
pub const EVENT_SUBSCRIPTION_ACTIVATED: &str = "subscription.activated";

/// What a successfully acknowledged delivery did.
#[derive(Debug)]
pub enum Disposition {
    /// Provider connectivity check; nothing touched.
    Test,
    /// A payment event credited the account.
    Credited {
        package: TokenPackage,
        remaining: i64,
    },
    /// A subscription was recorded.
    SubscriptionActivated { subscription_id: Uuid },
    /// Event type we do not handle; acknowledged, nothing touched.
    Ignored { event: String },
}

/// The provider's webhook envelope: `{ "event": ..., "data": {...} }`.
#[derive(Debug, Deserialize)]
struct Envelope {
    event: String,
    #[serde(default)]
    data: EventData,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct EventData {
    /// Provider transaction id; idempotency key for credits.
    id: Option<String>,
    customer_email: Option<String>,
    customer: Option<CustomerRef>,
    membership_tier_name: Option<String>,
    license_code: Option<String>,
    expired_at: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CustomerRef {
    email: Option<String>,
}

impl EventData {
    /// Identifying email: primary field, then the nested customer
    /// object. Lowercased to match how registration stores emails, so
    /// a provider sending `User@X.com` still resolves the account.
    fn email(&self) -> Option<String> {
        self.customer_email
            .as_deref()
            .or_else(|| self.customer.as_ref().and_then(|c| c.email.as_deref()))
            .map(str::to_lowercase)
    }
}

/// Constant-time comparison of the supplied callback token against the
/// configured secret. Fails closed: a missing or empty secret rejects
/// every token, including an empty token against an empty secret.
pub fn verify_callback_token(secret: Option<&str>, supplied: &str) -> bool {
    match secret {
        Some(secret) if !secret.is_empty() => {
            supplied.as_bytes().ct_eq(secret.as_bytes()).into()
        }
        _ => false,
    }
}

fn parse_expiry(raw: &str) -> Result<OffsetDateTime, WebhookError> {
    OffsetDateTime::parse(raw, &Rfc3339)
        .map_err(|e| WebhookError::Malformed(format!("Invalid expiredAt timestamp: {}", e)))
}

#[derive(Clone)]
pub struct EventReconciler {
    pool: PgPool,
    ledger: TokenLedger,
    subscriptions: SubscriptionStore,
    callback_secret: Option<String>,
}

impl EventReconciler {
    pub fn new(pool: PgPool, callback_secret: Option<String>) -> Self {
        Self {
            ledger: TokenLedger::new(pool.clone()),
            subscriptions: SubscriptionStore::new(pool.clone()),
            pool,
            callback_secret,
        }
    }

    /// Process one delivery. Safe to invoke again with the same payload:
    /// credits are keyed by the provider transaction id and activations
    /// by license uniqueness.
    pub async fn handle_event(
        &self,
        raw_body: &str,
        supplied_token: &str,
    ) -> Result<Disposition, WebhookError> {
        if !verify_callback_token(self.callback_secret.as_deref(), supplied_token) {
            return Err(WebhookError::Unauthorized);
        }

        let envelope: Envelope = serde_json::from_str(raw_body)
            .map_err(|e| WebhookError::Malformed(e.to_string()))?;

        tracing::info!(event = %envelope.event, "Webhook event verified");

        if envelope.event == EVENT_TESTING {
            return Ok(Disposition::Test);
        }

        let email = envelope.data.email().ok_or(WebhookError::MissingEmail)?;

        let user: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE email = $1")
            .bind(&email)
            .fetch_optional(&self.pool)
            .await?;
        let (user_id,) = user.ok_or_else(|| {
            tracing::warn!(email = %email, "Webhook event for unknown account");
            WebhookError::UnknownAccount(email.clone())
        })?;

        match envelope.event.as_str() {
            EVENT_PAYMENT_SUCCESS | EVENT_PAYMENT_RECEIVED => {
                let tier = envelope.data.membership_tier_name.unwrap_or_default();
                let package = TokenPackage::from_tier_name(&tier);
                let remaining = self
                    .ledger
                    .credit(user_id, package, envelope.data.id.as_deref())
                    .await?;
                Ok(Disposition::Credited { package, remaining })
            }
            EVENT_SUBSCRIPTION_ACTIVATED => {
                let license_code = envelope
                    .data
                    .license_code
                    .ok_or_else(|| WebhookError::Malformed("Missing licenseCode".to_string()))?;
                let expired_at = envelope
                    .data
                    .expired_at
                    .ok_or_else(|| WebhookError::Malformed("Missing expiredAt".to_string()))?;
                let expires_at = parse_expiry(&expired_at)?;

                let subscription = self
                    .subscriptions
                    .activate(user_id, &license_code, expires_at)
                    .await?;
                Ok(Disposition::SubscriptionActivated {
                    subscription_id: subscription.id,
                })
            }
            other => {
                tracing::info!(event = %other, user_id = %user_id, "Unhandled event type");
                Ok(Disposition::Ignored {
                    event: other.to_string(),
                })
            }
        }
    }
}
