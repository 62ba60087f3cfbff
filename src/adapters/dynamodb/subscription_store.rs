//! DynamoDB implementation of SubscriptionStore.
//!
//! Both records of a subscription are written in one `TransactWriteItems`
//! call. When a write carries an event time, each item is conditioned on
//!
//! ```text
//! attribute_not_exists(last_event_at) OR last_event_at <= :event_at
//! ```
//!
//! and a failed condition cancels the whole transaction, which is reported
//! as [`WriteOutcome::Stale`]. Writes without an event time are unconditional
//! and never touch `last_event_at`.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_dynamodb::config::Region;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::operation::transact_write_items::TransactWriteItemsError;
use aws_sdk_dynamodb::types::{AttributeValue, Put, TransactWriteItem, Update};
use aws_sdk_dynamodb::Client;

use crate::config::StorageConfig;
use crate::domain::foundation::Timestamp;
use crate::domain::subscription::{StatusChange, SubscriberRecord, SubscriptionRecord};
use crate::ports::{StoreError, SubscriptionStore, WriteOutcome};

use super::item::{
    string_value, subscriber_from_item, subscriber_to_item, subscription_from_item,
    subscription_to_item, timestamp_value, unix_value, Item, LAST_EVENT_AT, SUBSCRIBER_KEY,
    SUBSCRIPTION_KEY,
};

const ORDERING_GUARD: &str =
    "attribute_not_exists(last_event_at) OR last_event_at <= :event_at";

/// Cancellation reason code for a failed condition expression.
const CONDITIONAL_CHECK_FAILED: &str = "ConditionalCheckFailed";

/// DynamoDB-backed subscription store.
#[derive(Clone)]
pub struct DynamoSubscriptionStore {
    client: Client,
    subscriptions_table: String,
    subscribers_table: String,
}

impl DynamoSubscriptionStore {
    pub fn new(
        client: Client,
        subscriptions_table: impl Into<String>,
        subscribers_table: impl Into<String>,
    ) -> Self {
        Self {
            client,
            subscriptions_table: subscriptions_table.into(),
            subscribers_table: subscribers_table.into(),
        }
    }

    /// Build a client from the ambient AWS configuration.
    ///
    /// Credentials come from the usual provider chain. `endpoint_url` points
    /// the client at DynamoDB Local.
    pub async fn connect(config: &StorageConfig) -> Self {
        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).region(Region::new(config.region.clone()));
        if let Some(endpoint_url) = &config.endpoint_url {
            loader = loader.endpoint_url(endpoint_url);
        }
        let shared_config = loader.load().await;

        Self::new(
            Client::new(&shared_config),
            &config.subscriptions_table,
            &config.subscribers_table,
        )
    }

    fn put_items(
        &self,
        record: &SubscriptionRecord,
        mirror: &SubscriberRecord,
    ) -> Result<Vec<TransactWriteItem>, StoreError> {
        let primary = checkout_write(
            &self.subscriptions_table,
            SUBSCRIPTION_KEY,
            subscription_to_item(record),
            record.last_event_at,
        )?;
        let legacy = checkout_write(
            &self.subscribers_table,
            SUBSCRIBER_KEY,
            subscriber_to_item(mirror),
            mirror.last_event_at,
        )?;
        Ok(vec![primary, legacy])
    }

    fn status_change_items(&self, change: &StatusChange) -> Result<Vec<TransactWriteItem>, StoreError> {
        Ok(vec![
            status_update(&self.subscriptions_table, SUBSCRIPTION_KEY, change)?,
            status_update(&self.subscribers_table, SUBSCRIBER_KEY, change)?,
        ])
    }

    async fn transact(&self, items: Vec<TransactWriteItem>) -> Result<WriteOutcome, StoreError> {
        match self
            .client
            .transact_write_items()
            .set_transact_items(Some(items))
            .send()
            .await
        {
            Ok(_) => Ok(WriteOutcome::Applied),
            Err(err) => {
                let service_error = err.into_service_error();
                if is_condition_failure(&service_error) {
                    return Ok(WriteOutcome::Stale);
                }
                tracing::error!(
                    error = %DisplayErrorContext(&service_error),
                    "DynamoDB transaction failed"
                );
                Err(StoreError::Unavailable(
                    DisplayErrorContext(&service_error).to_string(),
                ))
            }
        }
    }

    async fn get_item(&self, table: &str, key: &str, id: &str) -> Result<Option<Item>, StoreError> {
        let output = self
            .client
            .get_item()
            .table_name(table)
            .key(key, string_value(id))
            .consistent_read(true)
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(DisplayErrorContext(&e).to_string()))?;

        Ok(output.item().cloned())
    }
}

/// Dated writes replace the item under the ordering guard. Undated writes
/// only set the attributes they carry, so a stored `last_event_at` stays.
fn checkout_write(
    table: &str,
    key: &str,
    item: Item,
    event_at: Option<Timestamp>,
) -> Result<TransactWriteItem, StoreError> {
    match event_at {
        Some(event_at) => guarded_put(table, item, event_at),
        None => attribute_update(table, key, item),
    }
}

fn guarded_put(
    table: &str,
    item: Item,
    event_at: Timestamp,
) -> Result<TransactWriteItem, StoreError> {
    let put = Put::builder()
        .table_name(table)
        .set_item(Some(item))
        .condition_expression(ORDERING_GUARD)
        .expression_attribute_values(":event_at", unix_value(event_at))
        .build()
        .map_err(|e| StoreError::InvalidRequest(e.to_string()))?;
    Ok(TransactWriteItem::builder().put(put).build())
}

fn attribute_update(table: &str, key: &str, mut item: Item) -> Result<TransactWriteItem, StoreError> {
    let key_value = item
        .remove(key)
        .ok_or_else(|| StoreError::InvalidRequest(format!("item for {} has no {}", table, key)))?;
    item.remove(LAST_EVENT_AT);

    let mut attributes: Vec<(String, AttributeValue)> = item.into_iter().collect();
    attributes.sort_by(|a, b| a.0.cmp(&b.0));

    let mut update = Update::builder().table_name(table).key(key, key_value);
    let mut assignments = Vec::with_capacity(attributes.len());
    for (i, (name, value)) in attributes.into_iter().enumerate() {
        let name_ref = format!("#a{}", i);
        let value_ref = format!(":a{}", i);
        assignments.push(format!("{} = {}", name_ref, value_ref));
        update = update
            .expression_attribute_names(name_ref, name)
            .expression_attribute_values(value_ref, value);
    }

    let update = update
        .update_expression(format!("SET {}", assignments.join(", ")))
        .build()
        .map_err(|e| StoreError::InvalidRequest(e.to_string()))?;
    Ok(TransactWriteItem::builder().update(update).build())
}

fn status_update(
    table: &str,
    key: &str,
    change: &StatusChange,
) -> Result<TransactWriteItem, StoreError> {
    let mut expression = String::from("SET #status = :status, #changed_at = :changed_at");
    let mut update = Update::builder()
        .table_name(table)
        .key(key, string_value(&change.subscription_id))
        .expression_attribute_names("#status", "status")
        .expression_attribute_names("#changed_at", change.kind.timestamp_attribute())
        .expression_attribute_values(":status", string_value(change.status.as_str()))
        .expression_attribute_values(":changed_at", timestamp_value(change.occurred_at));

    if let Some(event_at) = change.event_at {
        expression.push_str(", #last_event_at = :event_at");
        update = update
            .expression_attribute_names("#last_event_at", LAST_EVENT_AT)
            .expression_attribute_values(":event_at", unix_value(event_at))
            .condition_expression(ORDERING_GUARD);
    }

    let update = update
        .update_expression(expression)
        .build()
        .map_err(|e| StoreError::InvalidRequest(e.to_string()))?;
    Ok(TransactWriteItem::builder().update(update).build())
}

fn is_condition_failure(error: &TransactWriteItemsError) -> bool {
    match error {
        TransactWriteItemsError::TransactionCanceledException(cancelled) => cancelled
            .cancellation_reasons()
            .iter()
            .any(|reason| reason.code() == Some(CONDITIONAL_CHECK_FAILED)),
        _ => false,
    }
}

#[async_trait]
impl SubscriptionStore for DynamoSubscriptionStore {
    async fn put_subscription(
        &self,
        record: &SubscriptionRecord,
        mirror: &SubscriberRecord,
    ) -> Result<WriteOutcome, StoreError> {
        let items = self.put_items(record, mirror)?;
        self.transact(items).await
    }

    async fn apply_status_change(&self, change: &StatusChange) -> Result<WriteOutcome, StoreError> {
        let items = self.status_change_items(change)?;
        self.transact(items).await
    }

    async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Option<SubscriptionRecord>, StoreError> {
        self.get_item(&self.subscriptions_table, SUBSCRIPTION_KEY, subscription_id)
            .await?
            .map(|item| subscription_from_item(&self.subscriptions_table, &item))
            .transpose()
    }

    async fn get_subscriber(
        &self,
        subscription_id: &str,
    ) -> Result<Option<SubscriberRecord>, StoreError> {
        self.get_item(&self.subscribers_table, SUBSCRIBER_KEY, subscription_id)
            .await?
            .map(|item| subscriber_from_item(&self.subscribers_table, &item))
            .transpose()
    }
}
