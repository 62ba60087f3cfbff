//! Subscription domain module.
//!
//! Stripe webhook payloads, signature verification, and the two persisted
//! records a subscription is reconciled into.
//!
//! # Module Structure
//!
//! - `status` - SubscriptionStatus values written to the store
//! - `records` - SubscriptionRecord and its legacy SubscriberRecord mirror
//! - `status_change` - Partial updates and event ordering
//! - `stripe_event` - Webhook envelope and event objects
//! - `webhook_verifier` - Stripe-Signature verification
//! - `webhook_errors` - Error taxonomy with HTTP mapping

mod records;
mod status;
mod status_change;
mod stripe_event;
mod webhook_errors;
mod webhook_verifier;

pub use records::{CompletedCheckout, SubscriberRecord, SubscriptionRecord};
pub use status::SubscriptionStatus;
pub use status_change::{is_stale, StatusChange, StatusChangeKind};
pub use stripe_event::{
    CheckoutSessionObject, CustomerDetails, InvoiceObject, StripeEvent, StripeEventData,
    StripeEventType, SubscriptionObject,
};
pub use webhook_errors::{ErrorKind, SignatureError, WebhookError};
pub use webhook_verifier::{SignatureHeader, StripeWebhookVerifier};

#[cfg(test)]
pub use stripe_event::StripeEventBuilder;
