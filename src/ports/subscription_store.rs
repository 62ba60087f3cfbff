//! SubscriptionStore port - Persistence for both subscription records.
//!
//! Every write touches the subscriptions table and the legacy subscribers
//! table together. Implementations must apply both or neither.
//!
//! ## Ordering
//!
//! Stripe does not deliver events in order. A write carrying an event time
//! is skipped when the stored `last_event_at` is newer, and reported as
//! [`WriteOutcome::Stale`]. Redelivering the same event converges to the
//! same state.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::subscription::{
    StatusChange, SubscriberRecord, SubscriptionRecord, WebhookError,
};

/// Result of a guarded write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Both records were written.
    Applied,
    /// A newer event was already applied. Nothing was written.
    Stale,
}

/// Errors from the subscription store.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The backing store could not be reached or rejected the request.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The request to the store could not be built.
    #[error("invalid store request: {0}")]
    InvalidRequest(String),

    /// A stored item could not be converted back into a record.
    #[error("corrupt item in {table}: {reason}")]
    CorruptItem { table: String, reason: String },
}

impl From<StoreError> for WebhookError {
    fn from(err: StoreError) -> Self {
        WebhookError::Store(err.to_string())
    }
}

/// Port for reading and writing subscription records.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Writes both records of a newly completed checkout, replacing any
    /// existing items with the same key.
    ///
    /// Guarded by `record.last_event_at` when set.
    async fn put_subscription(
        &self,
        record: &SubscriptionRecord,
        mirror: &SubscriberRecord,
    ) -> Result<WriteOutcome, StoreError>;

    /// Applies a status change to both records.
    ///
    /// Records that do not exist yet are created holding only the key,
    /// status, and the change's timestamp.
    async fn apply_status_change(&self, change: &StatusChange) -> Result<WriteOutcome, StoreError>;

    /// Reads the normalized record.
    async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Option<SubscriptionRecord>, StoreError>;

    /// Reads the legacy mirror record.
    async fn get_subscriber(
        &self,
        subscription_id: &str,
    ) -> Result<Option<SubscriberRecord>, StoreError>;
}
