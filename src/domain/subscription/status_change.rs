//! Partial status updates applied to both subscription records.

use crate::domain::foundation::Timestamp;

use super::status::SubscriptionStatus;

/// Which lifecycle event produced a status change.
///
/// Each kind stamps its own timestamp attribute next to `status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusChangeKind {
    /// `customer.subscription.updated`
    Updated,
    /// `customer.subscription.deleted`
    Cancelled,
    /// `invoice.payment_failed`
    PaymentFailed,
}

impl StatusChangeKind {
    /// Attribute that records when this kind of change happened.
    pub fn timestamp_attribute(&self) -> &'static str {
        match self {
            Self::Updated => "updated_at",
            Self::Cancelled => "cancelled_at",
            Self::PaymentFailed => "payment_failed_at",
        }
    }
}

/// A status update for one subscription, written to both records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub subscription_id: String,
    pub status: SubscriptionStatus,
    pub kind: StatusChangeKind,
    /// Value written to the kind's timestamp attribute.
    pub occurred_at: Timestamp,
    /// Provider event time. When present the write is guarded by it.
    pub event_at: Option<Timestamp>,
}

impl StatusChange {
    /// Status reported by `customer.subscription.updated`.
    pub fn updated(
        subscription_id: impl Into<String>,
        status: SubscriptionStatus,
        occurred_at: Timestamp,
        event_at: Option<Timestamp>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            status,
            kind: StatusChangeKind::Updated,
            occurred_at,
            event_at,
        }
    }

    /// Subscription deleted on the provider side.
    pub fn cancelled(
        subscription_id: impl Into<String>,
        occurred_at: Timestamp,
        event_at: Option<Timestamp>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            status: SubscriptionStatus::Cancelled,
            kind: StatusChangeKind::Cancelled,
            occurred_at,
            event_at,
        }
    }

    /// Invoice payment failed.
    pub fn payment_failed(
        subscription_id: impl Into<String>,
        occurred_at: Timestamp,
        event_at: Option<Timestamp>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            status: SubscriptionStatus::PastDue,
            kind: StatusChangeKind::PaymentFailed,
            occurred_at,
            event_at,
        }
    }
}

/// Returns true if an event at `event_at` must not overwrite a record that
/// already applied an event at `last_event_at`.
///
/// Equal times are not stale, so redelivering the same event converges.
/// Without an event time there is nothing to order by.
pub fn is_stale(event_at: Option<Timestamp>, last_event_at: Option<Timestamp>) -> bool {
    match (event_at, last_event_at) {
        (Some(event_at), Some(last_event_at)) => last_event_at.is_after(&event_at),
        _ => false,
    }
}
