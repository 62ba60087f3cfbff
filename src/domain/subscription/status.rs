//! Subscription status as stored in both subscription tables.
//!
//! The reconciler only drives `active`, `past_due` and `cancelled` itself.
//! `customer.subscription.updated` forwards whatever Stripe reports, so the
//! remaining Stripe statuses are representable too.

use serde::{Deserialize, Serialize};

/// Subscription status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Paid and in good standing.
    Active,

    /// Latest invoice payment failed; Stripe is retrying.
    PastDue,

    /// Subscription ended. Terminal for this service.
    Cancelled,

    /// In a free trial period.
    Trialing,

    /// First payment has not completed yet.
    Incomplete,

    /// First payment never completed within Stripe's window.
    IncompleteExpired,

    /// Retries exhausted without cancelling.
    Unpaid,

    /// Collection paused.
    Paused,
}

impl SubscriptionStatus {
    /// Maps a Stripe subscription status string.
    ///
    /// Stripe spells the cancelled state `canceled`; both spellings map to
    /// [`SubscriptionStatus::Cancelled`]. Returns `None` for anything else.
    pub fn from_provider(status: &str) -> Option<Self> {
        match status {
            "active" => Some(Self::Active),
            "past_due" => Some(Self::PastDue),
            "canceled" | "cancelled" => Some(Self::Cancelled),
            "trialing" => Some(Self::Trialing),
            "incomplete" => Some(Self::Incomplete),
            "incomplete_expired" => Some(Self::IncompleteExpired),
            "unpaid" => Some(Self::Unpaid),
            "paused" => Some(Self::Paused),
            _ => None,
        }
    }

    /// The string written to the `status` attribute.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::PastDue => "past_due",
            Self::Cancelled => "cancelled",
            Self::Trialing => "trialing",
            Self::Incomplete => "incomplete",
            Self::IncompleteExpired => "incomplete_expired",
            Self::Unpaid => "unpaid",
            Self::Paused => "paused",
        }
    }

    /// Returns true if no transition out of this status is handled.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
