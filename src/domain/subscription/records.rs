//! Persisted subscription records.
//!
//! Two records describe one subscription:
//!
//! - [`SubscriptionRecord`] in the subscriptions table, keyed by `subscription_id`
//! - [`SubscriberRecord`], the legacy mirror in the subscribers table, keyed by
//!   `stripe_subscription_id`
//!
//! Checkout completion writes both in full. Later events only touch `status`
//! and one timestamp, and will create a sparse record if none exists yet, so
//! attributes populated by checkout are optional.

use crate::domain::foundation::Timestamp;

use super::status::SubscriptionStatus;
use super::status_change::{StatusChange, StatusChangeKind};

const DEFAULT_PLAN: &str = "premium";
const DEFAULT_CURRENCY: &str = "eur";
const DEFAULT_COUNTRY: &str = "unknown";
const DEFAULT_LEGACY_COUNTRY: &str = "DE";
const DEFAULT_SOURCE: &str = "marketing-site";
const PAYMENT_SOURCE: &str = "stripe";

/// Normalized subscription record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionRecord {
    pub subscription_id: String,
    pub status: SubscriptionStatus,
    pub customer_id: Option<String>,
    pub email: Option<String>,
    pub stripe_session_id: Option<String>,
    pub plan: Option<String>,
    pub currency: Option<String>,
    pub price_id: Option<String>,
    pub country: Option<String>,
    pub source: Option<String>,
    pub payment_source: Option<String>,
    pub created_at: Option<Timestamp>,
    pub updated_at: Option<Timestamp>,
    pub cancelled_at: Option<Timestamp>,
    pub payment_failed_at: Option<Timestamp>,
    pub last_event_at: Option<Timestamp>,
}

impl SubscriptionRecord {
    /// Record holding only the key and a status.
    pub fn sparse(subscription_id: impl Into<String>, status: SubscriptionStatus) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            status,
            customer_id: None,
            email: None,
            stripe_session_id: None,
            plan: None,
            currency: None,
            price_id: None,
            country: None,
            source: None,
            payment_source: None,
            created_at: None,
            updated_at: None,
            cancelled_at: None,
            payment_failed_at: None,
            last_event_at: None,
        }
    }

    /// Applies a partial status update in place.
    pub fn apply(&mut self, change: &StatusChange) {
        self.status = change.status;
        match change.kind {
            StatusChangeKind::Updated => self.updated_at = Some(change.occurred_at),
            StatusChangeKind::Cancelled => self.cancelled_at = Some(change.occurred_at),
            StatusChangeKind::PaymentFailed => self.payment_failed_at = Some(change.occurred_at),
        }
        if change.event_at.is_some() {
            self.last_event_at = change.event_at;
        }
    }
}

/// Legacy subscriber record kept for older consumers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriberRecord {
    pub stripe_subscription_id: String,
    pub status: SubscriptionStatus,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub name: Option<String>,
    pub subscription_source: Option<String>,
    pub stripe_customer_id: Option<String>,
    pub plan: Option<String>,
    pub country: Option<String>,
    pub whatsapp_notifications: Option<bool>,
    pub created_at: Option<Timestamp>,
    pub updated_at: Option<Timestamp>,
    pub cancelled_at: Option<Timestamp>,
    pub payment_failed_at: Option<Timestamp>,
    pub last_event_at: Option<Timestamp>,
}

impl SubscriberRecord {
    /// Record holding only the key and a status.
    pub fn sparse(stripe_subscription_id: impl Into<String>, status: SubscriptionStatus) -> Self {
        Self {
            stripe_subscription_id: stripe_subscription_id.into(),
            status,
            email: None,
            phone: None,
            name: None,
            subscription_source: None,
            stripe_customer_id: None,
            plan: None,
            country: None,
            whatsapp_notifications: None,
            created_at: None,
            updated_at: None,
            cancelled_at: None,
            payment_failed_at: None,
            last_event_at: None,
        }
    }

    /// Applies a partial status update in place.
    pub fn apply(&mut self, change: &StatusChange) {
        self.status = change.status;
        match change.kind {
            StatusChangeKind::Updated => self.updated_at = Some(change.occurred_at),
            StatusChangeKind::Cancelled => self.cancelled_at = Some(change.occurred_at),
            StatusChangeKind::PaymentFailed => self.payment_failed_at = Some(change.occurred_at),
        }
        if change.event_at.is_some() {
            self.last_event_at = change.event_at;
        }
    }
}

/// Values resolved from a completed checkout, before defaults are applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedCheckout {
    /// Record key: the subscription id, or the session id for one-off payments.
    pub subscription_id: String,
    pub customer_id: Option<String>,
    pub email: String,
    pub name: Option<String>,
    pub session_id: Option<String>,
    pub status: SubscriptionStatus,
    pub price_id: Option<String>,
    pub plan: Option<String>,
    pub currency: Option<String>,
    pub country: Option<String>,
    pub source: Option<String>,
    pub phone: Option<String>,
    pub created_at: Timestamp,
    pub event_at: Option<Timestamp>,
}

impl CompletedCheckout {
    /// Full subscription record with defaults for missing metadata.
    pub fn subscription_record(&self) -> SubscriptionRecord {
        SubscriptionRecord {
            subscription_id: self.subscription_id.clone(),
            status: self.status,
            customer_id: self.customer_id.clone(),
            email: Some(self.email.clone()),
            stripe_session_id: self.session_id.clone(),
            plan: Some(or_default(&self.plan, DEFAULT_PLAN)),
            currency: Some(or_default(&self.currency, DEFAULT_CURRENCY)),
            price_id: self.price_id.clone(),
            country: Some(or_default(&self.country, DEFAULT_COUNTRY)),
            source: Some(or_default(&self.source, DEFAULT_SOURCE)),
            payment_source: Some(PAYMENT_SOURCE.to_string()),
            created_at: Some(self.created_at),
            updated_at: None,
            cancelled_at: None,
            payment_failed_at: None,
            last_event_at: self.event_at,
        }
    }

    /// Legacy mirror of [`CompletedCheckout::subscription_record`].
    pub fn subscriber_record(&self) -> SubscriberRecord {
        SubscriberRecord {
            stripe_subscription_id: self.subscription_id.clone(),
            status: self.status,
            email: Some(self.email.clone()),
            phone: Some(self.phone.clone().unwrap_or_default()),
            name: Some(self.name.clone().unwrap_or_default()),
            subscription_source: Some(PAYMENT_SOURCE.to_string()),
            stripe_customer_id: self.customer_id.clone(),
            plan: Some(or_default(&self.plan, DEFAULT_PLAN)),
            country: Some(or_default(&self.country, DEFAULT_LEGACY_COUNTRY)),
            whatsapp_notifications: Some(true),
            created_at: Some(self.created_at),
            updated_at: None,
            cancelled_at: None,
            payment_failed_at: None,
            last_event_at: self.event_at,
        }
    }
}

fn or_default(value: &Option<String>, default: &str) -> String {
    value.clone().unwrap_or_else(|| default.to_string())
}
