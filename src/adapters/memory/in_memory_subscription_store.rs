//! In-Memory Subscription Store Adapter
//!
//! Holds both subscription tables behind one lock so a write applies to both
//! records or neither. Useful for testing and local development.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::subscription::{
    is_stale, StatusChange, SubscriberRecord, SubscriptionRecord,
};
use crate::ports::{StoreError, SubscriptionStore, WriteOutcome};

#[derive(Debug, Default)]
struct Tables {
    subscriptions: HashMap<String, SubscriptionRecord>,
    subscribers: HashMap<String, SubscriberRecord>,
    writes: usize,
    unavailable: bool,
}

/// In-memory storage for subscription records
#[derive(Debug, Clone, Default)]
pub struct InMemorySubscriptionStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemorySubscriptionStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful writes (each covering both records)
    pub async fn write_count(&self) -> usize {
        self.tables.read().await.writes
    }

    /// Make every subsequent call fail with `StoreError::Unavailable`
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.tables.write().await.unavailable = unavailable;
    }

    /// Insert records directly, bypassing the ordering guard
    pub async fn seed(&self, record: SubscriptionRecord, mirror: SubscriberRecord) {
        let mut tables = self.tables.write().await;
        tables
            .subscriptions
            .insert(record.subscription_id.clone(), record);
        tables
            .subscribers
            .insert(mirror.stripe_subscription_id.clone(), mirror);
    }
}

fn check_available(tables: &Tables) -> Result<(), StoreError> {
    if tables.unavailable {
        return Err(StoreError::Unavailable("in-memory store disabled".to_string()));
    }
    Ok(())
}

#[async_trait]
impl SubscriptionStore for InMemorySubscriptionStore {
    async fn put_subscription(
        &self,
        record: &SubscriptionRecord,
        mirror: &SubscriberRecord,
    ) -> Result<WriteOutcome, StoreError> {
        let mut tables = self.tables.write().await;
        check_available(&tables)?;

        let stored_primary = tables
            .subscriptions
            .get(&record.subscription_id)
            .and_then(|r| r.last_event_at);
        let stored_mirror = tables
            .subscribers
            .get(&mirror.stripe_subscription_id)
            .and_then(|r| r.last_event_at);
        if is_stale(record.last_event_at, stored_primary)
            || is_stale(mirror.last_event_at, stored_mirror)
        {
            return Ok(WriteOutcome::Stale);
        }

        // Without an event time the stored marker survives the overwrite
        let mut record = record.clone();
        record.last_event_at = record.last_event_at.or(stored_primary);
        let mut mirror = mirror.clone();
        mirror.last_event_at = mirror.last_event_at.or(stored_mirror);

        tables
            .subscriptions
            .insert(record.subscription_id.clone(), record);
        tables
            .subscribers
            .insert(mirror.stripe_subscription_id.clone(), mirror);
        tables.writes += 1;
        Ok(WriteOutcome::Applied)
    }

    async fn apply_status_change(&self, change: &StatusChange) -> Result<WriteOutcome, StoreError> {
        let mut tables = self.tables.write().await;
        check_available(&tables)?;

        let id = &change.subscription_id;
        let stored_primary = tables.subscriptions.get(id).and_then(|r| r.last_event_at);
        let stored_mirror = tables.subscribers.get(id).and_then(|r| r.last_event_at);
        if is_stale(change.event_at, stored_primary) || is_stale(change.event_at, stored_mirror) {
            return Ok(WriteOutcome::Stale);
        }

        tables
            .subscriptions
            .entry(id.clone())
            .or_insert_with(|| SubscriptionRecord::sparse(id.clone(), change.status))
            .apply(change);
        tables
            .subscribers
            .entry(id.clone())
            .or_insert_with(|| SubscriberRecord::sparse(id.clone(), change.status))
            .apply(change);
        tables.writes += 1;
        Ok(WriteOutcome::Applied)
    }

    async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Option<SubscriptionRecord>, StoreError> {
        let tables = self.tables.read().await;
        check_available(&tables)?;
        Ok(tables.subscriptions.get(subscription_id).cloned())
    }

    async fn get_subscriber(
        &self,
        subscription_id: &str,
    ) -> Result<Option<SubscriberRecord>, StoreError> {
        let tables = self.tables.read().await;
        check_available(&tables)?;
        Ok(tables.subscribers.get(subscription_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::Timestamp;
    use crate::domain::subscription::SubscriptionStatus;

    fn ts(secs: i64) -> Timestamp {
        Timestamp::from_unix_secs(secs).unwrap()
    }

    fn records(last_event_at: Option<Timestamp>) -> (SubscriptionRecord, SubscriberRecord) {
        let mut record = SubscriptionRecord::sparse("sub_1", SubscriptionStatus::Active);
        record.email = Some("a@example.com".to_string());
        record.last_event_at = last_event_at;
        let mut mirror = SubscriberRecord::sparse("sub_1", SubscriptionStatus::Active);
        mirror.email = Some("a@example.com".to_string());
        mirror.last_event_at = last_event_at;
        (record, mirror)
    }

    #[tokio::test]
    async fn put_writes_both_records() {
        let store = InMemorySubscriptionStore::new();
        let (record, mirror) = records(None);

        let outcome = store.put_subscription(&record, &mirror).await.unwrap();

        assert_eq!(outcome, WriteOutcome::Applied);
        assert_eq!(store.get_subscription("sub_1").await.unwrap(), Some(record));
        assert_eq!(store.get_subscriber("sub_1").await.unwrap(), Some(mirror));
        assert_eq!(store.write_count().await, 1);
    }

    #[tokio::test]
    async fn put_older_event_is_stale() {
        let store = InMemorySubscriptionStore::new();
        let (newer, newer_mirror) = records(Some(ts(200)));
        store.put_subscription(&newer, &newer_mirror).await.unwrap();

        let (mut older, older_mirror) = records(Some(ts(100)));
        older.email = Some("old@example.com".to_string());
        let outcome = store.put_subscription(&older, &older_mirror).await.unwrap();

        assert_eq!(outcome, WriteOutcome::Stale);
        let stored = store.get_subscription("sub_1").await.unwrap().unwrap();
        assert_eq!(stored.email.as_deref(), Some("a@example.com"));
        assert_eq!(store.write_count().await, 1);
    }

    #[tokio::test]
    async fn put_without_event_time_keeps_marker() {
        let store = InMemorySubscriptionStore::new();
        let (newer, newer_mirror) = records(Some(ts(200)));
        store.put_subscription(&newer, &newer_mirror).await.unwrap();

        let (mut undated, undated_mirror) = records(None);
        undated.email = Some("b@example.com".to_string());
        let outcome = store.put_subscription(&undated, &undated_mirror).await.unwrap();

        assert_eq!(outcome, WriteOutcome::Applied);
        let stored = store.get_subscription("sub_1").await.unwrap().unwrap();
        assert_eq!(stored.email.as_deref(), Some("b@example.com"));
        assert_eq!(stored.last_event_at, Some(ts(200)));
        let mirror = store.get_subscriber("sub_1").await.unwrap().unwrap();
        assert_eq!(mirror.last_event_at, Some(ts(200)));
    }

    #[tokio::test]
    async fn status_change_upserts_sparse_records() {
        let store = InMemorySubscriptionStore::new();
        let change = StatusChange::payment_failed("sub_2", ts(500), None);

        store.apply_status_change(&change).await.unwrap();

        let record = store.get_subscription("sub_2").await.unwrap().unwrap();
        assert_eq!(record.status, SubscriptionStatus::PastDue);
        assert_eq!(record.payment_failed_at, Some(ts(500)));
        assert!(record.email.is_none());
        let mirror = store.get_subscriber("sub_2").await.unwrap().unwrap();
        assert_eq!(mirror.status, SubscriptionStatus::PastDue);
    }

    #[tokio::test]
    async fn status_change_respects_ordering() {
        let store = InMemorySubscriptionStore::new();
        let (record, mirror) = records(Some(ts(300)));
        store.seed(record, mirror).await;

        let stale = StatusChange::cancelled("sub_1", ts(200), Some(ts(200)));
        assert_eq!(
            store.apply_status_change(&stale).await.unwrap(),
            WriteOutcome::Stale
        );

        let fresh = StatusChange::cancelled("sub_1", ts(400), Some(ts(400)));
        assert_eq!(
            store.apply_status_change(&fresh).await.unwrap(),
            WriteOutcome::Applied
        );
        let stored = store.get_subscriber("sub_1").await.unwrap().unwrap();
        assert_eq!(stored.status, SubscriptionStatus::Cancelled);
        assert_eq!(stored.last_event_at, Some(ts(400)));
    }

    #[tokio::test]
    async fn unavailable_store_fails_without_writing() {
        let store = InMemorySubscriptionStore::new();
        store.set_unavailable(true).await;
        let (record, mirror) = records(None);

        let result = store.put_subscription(&record, &mirror).await;

        assert!(matches!(result, Err(StoreError::Unavailable(_))));
        store.set_unavailable(false).await;
        assert_eq!(store.get_subscription("sub_1").await.unwrap(), None);
    }
}
