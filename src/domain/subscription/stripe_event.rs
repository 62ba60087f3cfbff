//! Stripe webhook event types.
//!
//! Defines the structures for parsing Stripe webhook payloads.
//! Only fields relevant to reconciliation are captured; everything else in
//! Stripe's schema is ignored.

use std::collections::HashMap;

use serde::Deserialize;

use crate::domain::foundation::Timestamp;

/// Stripe webhook event envelope.
///
/// Only `type` is mandatory. Local test deliveries and hand-written payloads
/// often omit the rest.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeEvent {
    /// Unique identifier for the event (evt_xxx format).
    #[serde(default)]
    pub id: Option<String>,

    /// Type of event (e.g., "checkout.session.completed").
    #[serde(rename = "type")]
    pub event_type: String,

    /// Time at which the event was created (Unix timestamp).
    #[serde(default)]
    pub created: Option<i64>,

    /// Object containing event-specific data.
    #[serde(default)]
    pub data: StripeEventData,

    /// Whether this is a live mode event (vs test mode).
    #[serde(default)]
    pub livemode: bool,
}

/// Container for event-specific data.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeEventData {
    /// The object that triggered the event (polymorphic based on event type).
    #[serde(default = "empty_object")]
    pub object: serde_json::Value,
}

impl Default for StripeEventData {
    fn default() -> Self {
        Self {
            object: empty_object(),
        }
    }
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

impl StripeEvent {
    /// Parse the event type into a known enum variant.
    pub fn parsed_type(&self) -> StripeEventType {
        StripeEventType::from_type(&self.event_type)
    }

    /// Provider-side creation time, if the envelope carried a usable one.
    pub fn occurred_at(&self) -> Option<Timestamp> {
        self.created.and_then(Timestamp::from_unix_secs)
    }

    /// Attempts to deserialize the data object as the specified type.
    pub fn deserialize_object<T: serde::de::DeserializeOwned>(
        &self,
    ) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.data.object.clone())
    }
}

/// Stripe event types the reconciler acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StripeEventType {
    /// Checkout session completed successfully.
    CheckoutSessionCompleted,
    /// Customer subscription was updated.
    CustomerSubscriptionUpdated,
    /// Customer subscription was deleted.
    CustomerSubscriptionDeleted,
    /// Invoice payment failed.
    InvoicePaymentFailed,
    /// Any other event type. Acknowledged without processing.
    Unknown,
}

impl StripeEventType {
    /// Parse event type from the envelope's `type` string.
    pub fn from_type(s: &str) -> Self {
        match s {
            "checkout.session.completed" => Self::CheckoutSessionCompleted,
            "customer.subscription.updated" => Self::CustomerSubscriptionUpdated,
            "customer.subscription.deleted" => Self::CustomerSubscriptionDeleted,
            "invoice.payment_failed" => Self::InvoicePaymentFailed,
            _ => Self::Unknown,
        }
    }

    /// Convert to the Stripe event type string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CheckoutSessionCompleted => "checkout.session.completed",
            Self::CustomerSubscriptionUpdated => "customer.subscription.updated",
            Self::CustomerSubscriptionDeleted => "customer.subscription.deleted",
            Self::InvoicePaymentFailed => "invoice.payment_failed",
            Self::Unknown => "unknown",
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Event Objects
// ════════════════════════════════════════════════════════════════════════════════

/// `data.object` of a `checkout.session.completed` event.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckoutSessionObject {
    /// Checkout session identifier (cs_...).
    #[serde(default)]
    pub id: Option<String>,

    /// Customer created or attached during checkout (cus_...).
    #[serde(default)]
    pub customer: Option<String>,

    /// Subscription created by the checkout (sub_...), absent for one-off payments.
    #[serde(default)]
    pub subscription: Option<String>,

    /// Details the customer entered on the checkout page.
    #[serde(default)]
    pub customer_details: Option<CustomerDetails>,

    /// Metadata attached by the marketing site when creating the session.
    #[serde(default)]
    pub metadata: Option<HashMap<String, String>>,

    /// Session creation time (Unix timestamp).
    #[serde(default)]
    pub created: Option<i64>,
}

/// Customer details collected by Checkout.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomerDetails {
    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub name: Option<String>,
}

impl CheckoutSessionObject {
    /// Customer email, ignoring blank values.
    pub fn customer_email(&self) -> Option<&str> {
        self.customer_details
            .as_ref()
            .and_then(|details| details.email.as_deref())
            .map(str::trim)
            .filter(|email| !email.is_empty())
    }

    /// Customer name as entered at checkout.
    pub fn customer_name(&self) -> Option<&str> {
        self.customer_details
            .as_ref()
            .and_then(|details| details.name.as_deref())
    }

    /// Non-empty metadata value for `key`.
    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|metadata| metadata.get(key))
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }
}

/// `data.object` of `customer.subscription.*` events.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubscriptionObject {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub status: Option<String>,

    #[serde(default)]
    pub customer: Option<String>,
}

/// `data.object` of `invoice.*` events.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvoiceObject {
    #[serde(default)]
    pub id: Option<String>,

    /// Subscription the invoice belongs to, absent for one-off invoices.
    #[serde(default)]
    pub subscription: Option<String>,

    #[serde(default)]
    pub customer: Option<String>,
}

/// Builder for Stripe webhook payloads in tests.
#[cfg(test)]
pub struct StripeEventBuilder {
    event_type: String,
    created: Option<i64>,
    object: serde_json::Value,
}

#[cfg(test)]
impl StripeEventBuilder {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            created: None,
            object: serde_json::json!({}),
        }
    }

    pub fn created(mut self, created: i64) -> Self {
        self.created = Some(created);
        self
    }

    pub fn object(mut self, object: serde_json::Value) -> Self {
        self.object = object;
        self
    }

    /// Serialized request body.
    pub fn payload(&self) -> Vec<u8> {
        let mut event = serde_json::json!({
            "id": "evt_test_123",
            "type": self.event_type,
            "data": { "object": self.object },
            "livemode": false,
        });
        if let Some(created) = self.created {
            event["created"] = serde_json::json!(created);
        }
        serde_json::to_vec(&event).unwrap()
    }
}
