//! Conversion between subscription records and DynamoDB items.
//!
//! Strings are stored as `S`, RFC 3339 timestamps as `S` (offset-less
//! ISO 8601 values in older rows are read as UTC), the ordering marker
//! `last_event_at` as `N` (Unix seconds), and booleans as `BOOL`. Absent
//! optional attributes are not written.

use std::collections::HashMap;

use aws_sdk_dynamodb::types::AttributeValue;

use crate::domain::foundation::Timestamp;
use crate::domain::subscription::{SubscriberRecord, SubscriptionRecord, SubscriptionStatus};
use crate::ports::StoreError;

pub type Item = HashMap<String, AttributeValue>;

/// Key attribute of the subscriptions table.
pub const SUBSCRIPTION_KEY: &str = "subscription_id";
/// Key attribute of the legacy subscribers table.
pub const SUBSCRIBER_KEY: &str = "stripe_subscription_id";
/// Provider event time of the last applied event.
pub const LAST_EVENT_AT: &str = "last_event_at";

// ════════════════════════════════════════════════════════════════════════════════
// Encoding
// ════════════════════════════════════════════════════════════════════════════════

pub fn string_value(value: impl Into<String>) -> AttributeValue {
    AttributeValue::S(value.into())
}

pub fn timestamp_value(value: Timestamp) -> AttributeValue {
    AttributeValue::S(value.to_rfc3339())
}

pub fn unix_value(value: Timestamp) -> AttributeValue {
    AttributeValue::N(value.as_unix_secs().to_string())
}

#[derive(Default)]
struct ItemWriter {
    item: Item,
}

impl ItemWriter {
    fn string(mut self, key: &str, value: &str) -> Self {
        self.item.insert(key.to_string(), string_value(value));
        self
    }

    fn opt_string(self, key: &str, value: Option<&str>) -> Self {
        match value {
            Some(value) => self.string(key, value),
            None => self,
        }
    }

    fn opt_timestamp(mut self, key: &str, value: Option<Timestamp>) -> Self {
        if let Some(value) = value {
            self.item.insert(key.to_string(), timestamp_value(value));
        }
        self
    }

    fn opt_unix(mut self, key: &str, value: Option<Timestamp>) -> Self {
        if let Some(value) = value {
            self.item.insert(key.to_string(), unix_value(value));
        }
        self
    }

    fn opt_bool(mut self, key: &str, value: Option<bool>) -> Self {
        if let Some(value) = value {
            self.item.insert(key.to_string(), AttributeValue::Bool(value));
        }
        self
    }

    fn finish(self) -> Item {
        self.item
    }
}

pub fn subscription_to_item(record: &SubscriptionRecord) -> Item {
    ItemWriter::default()
        .string(SUBSCRIPTION_KEY, &record.subscription_id)
        .string("status", record.status.as_str())
        .opt_string("customer_id", record.customer_id.as_deref())
        .opt_string("email", record.email.as_deref())
        .opt_string("stripe_session_id", record.stripe_session_id.as_deref())
        .opt_string("plan", record.plan.as_deref())
        .opt_string("currency", record.currency.as_deref())
        .opt_string("price_id", record.price_id.as_deref())
        .opt_string("country", record.country.as_deref())
        .opt_string("source", record.source.as_deref())
        .opt_string("payment_source", record.payment_source.as_deref())
        .opt_timestamp("created_at", record.created_at)
        .opt_timestamp("updated_at", record.updated_at)
        .opt_timestamp("cancelled_at", record.cancelled_at)
        .opt_timestamp("payment_failed_at", record.payment_failed_at)
        .opt_unix(LAST_EVENT_AT, record.last_event_at)
        .finish()
}

pub fn subscriber_to_item(record: &SubscriberRecord) -> Item {
    ItemWriter::default()
        .string(SUBSCRIBER_KEY, &record.stripe_subscription_id)
        .string("status", record.status.as_str())
        .opt_string("email", record.email.as_deref())
        .opt_string("phone", record.phone.as_deref())
        .opt_string("name", record.name.as_deref())
        .opt_string("subscription_source", record.subscription_source.as_deref())
        .opt_string("stripe_customer_id", record.stripe_customer_id.as_deref())
        .opt_string("plan", record.plan.as_deref())
        .opt_string("country", record.country.as_deref())
        .opt_bool("whatsapp_notifications", record.whatsapp_notifications)
        .opt_timestamp("created_at", record.created_at)
        .opt_timestamp("updated_at", record.updated_at)
        .opt_timestamp("cancelled_at", record.cancelled_at)
        .opt_timestamp("payment_failed_at", record.payment_failed_at)
        .opt_unix(LAST_EVENT_AT, record.last_event_at)
        .finish()
}

// ════════════════════════════════════════════════════════════════════════════════
// Decoding
// ════════════════════════════════════════════════════════════════════════════════

struct ItemReader<'a> {
    table: &'a str,
    item: &'a Item,
}

impl<'a> ItemReader<'a> {
    fn corrupt(&self, reason: String) -> StoreError {
        StoreError::CorruptItem {
            table: self.table.to_string(),
            reason,
        }
    }

    fn string(&self, key: &str) -> Option<String> {
        self.item.get(key).and_then(|v| v.as_s().ok()).cloned()
    }

    fn required_string(&self, key: &str) -> Result<String, StoreError> {
        self.string(key)
            .ok_or_else(|| self.corrupt(format!("missing {}", key)))
    }

    fn status(&self) -> Result<SubscriptionStatus, StoreError> {
        let raw = self.required_string("status")?;
        SubscriptionStatus::from_provider(&raw)
            .ok_or_else(|| self.corrupt(format!("unknown status {}", raw)))
    }

    fn timestamp(&self, key: &str) -> Result<Option<Timestamp>, StoreError> {
        match self.string(key) {
            None => Ok(None),
            Some(raw) => Timestamp::parse_stored(&raw)
                .map(Some)
                .ok_or_else(|| self.corrupt(format!("invalid {}: {}", key, raw))),
        }
    }

    fn unix(&self, key: &str) -> Result<Option<Timestamp>, StoreError> {
        let Some(raw) = self.item.get(key).and_then(|v| v.as_n().ok()) else {
            return Ok(None);
        };
        raw.parse::<i64>()
            .ok()
            .and_then(Timestamp::from_unix_secs)
            .map(Some)
            .ok_or_else(|| self.corrupt(format!("invalid {}: {}", key, raw)))
    }

    fn bool(&self, key: &str) -> Option<bool> {
        self.item.get(key).and_then(|v| v.as_bool().ok()).copied()
    }
}

pub fn subscription_from_item(table: &str, item: &Item) -> Result<SubscriptionRecord, StoreError> {
    let r = ItemReader { table, item };
    Ok(SubscriptionRecord {
        subscription_id: r.required_string(SUBSCRIPTION_KEY)?,
        status: r.status()?,
        customer_id: r.string("customer_id"),
        email: r.string("email"),
        stripe_session_id: r.string("stripe_session_id"),
        plan: r.string("plan"),
        currency: r.string("currency"),
        price_id: r.string("price_id"),
        country: r.string("country"),
        source: r.string("source"),
        payment_source: r.string("payment_source"),
        created_at: r.timestamp("created_at")?,
        updated_at: r.timestamp("updated_at")?,
        cancelled_at: r.timestamp("cancelled_at")?,
        payment_failed_at: r.timestamp("payment_failed_at")?,
        last_event_at: r.unix(LAST_EVENT_AT)?,
    })
}

pub fn subscriber_from_item(table: &str, item: &Item) -> Result<SubscriberRecord, StoreError> {
    let r = ItemReader { table, item };
    Ok(SubscriberRecord {
        stripe_subscription_id: r.required_string(SUBSCRIBER_KEY)?,
        status: r.status()?,
        email: r.string("email"),
        phone: r.string("phone"),
        name: r.string("name"),
        subscription_source: r.string("subscription_source"),
        stripe_customer_id: r.string("stripe_customer_id"),
        plan: r.string("plan"),
        country: r.string("country"),
        whatsapp_notifications: r.bool("whatsapp_notifications"),
        created_at: r.timestamp("created_at")?,
        updated_at: r.timestamp("updated_at")?,
        cancelled_at: r.timestamp("cancelled_at")?,
        payment_failed_at: r.timestamp("payment_failed_at")?,
        last_event_at: r.unix(LAST_EVENT_AT)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(secs: i64) -> Timestamp {
        Timestamp::from_unix_secs(secs).unwrap()
    }

    fn full_subscription() -> SubscriptionRecord {
        let mut record = SubscriptionRecord::sparse("sub_1", SubscriptionStatus::PastDue);
        record.customer_id = Some("cus_1".to_string());
        record.email = Some("a@example.com".to_string());
        record.plan = Some("premium".to_string());
        record.created_at = Some(ts(1_704_067_200));
        record.payment_failed_at = Some(ts(1_704_153_600));
        record.last_event_at = Some(ts(1_704_153_600));
        record
    }

    #[test]
    fn subscription_item_uses_native_types() {
        let item = subscription_to_item(&full_subscription());

        assert_eq!(item[SUBSCRIPTION_KEY], AttributeValue::S("sub_1".to_string()));
        assert_eq!(item["status"], AttributeValue::S("past_due".to_string()));
        assert_eq!(
            item["created_at"],
            AttributeValue::S("2024-01-01T00:00:00.000000Z".to_string())
        );
        assert_eq!(item[LAST_EVENT_AT], AttributeValue::N("1704153600".to_string()));
        assert!(!item.contains_key("cancelled_at"));
        assert!(!item.contains_key("currency"));
    }

    #[test]
    fn subscription_item_reads_back() {
        let record = full_subscription();

        let decoded = subscription_from_item("stj_subscriptions", &subscription_to_item(&record));

        assert_eq!(decoded.unwrap(), record);
    }

    #[test]
    fn subscriber_item_keeps_notification_flag() {
        let mut mirror = SubscriberRecord::sparse("sub_1", SubscriptionStatus::Active);
        mirror.whatsapp_notifications = Some(true);
        mirror.phone = Some(String::new());

        let item = subscriber_to_item(&mirror);

        assert_eq!(item[SUBSCRIBER_KEY], AttributeValue::S("sub_1".to_string()));
        assert_eq!(item["whatsapp_notifications"], AttributeValue::Bool(true));
        assert_eq!(
            subscriber_from_item("stj_subscribers", &item).unwrap(),
            mirror
        );
    }

    #[test]
    fn legacy_cancelled_spelling_reads_back() {
        let mut item = subscriber_to_item(&SubscriberRecord::sparse(
            "sub_1",
            SubscriptionStatus::Active,
        ));
        item.insert("status".to_string(), string_value("canceled"));

        let decoded = subscriber_from_item("stj_subscribers", &item).unwrap();

        assert_eq!(decoded.status, SubscriptionStatus::Cancelled);
    }

    #[test]
    fn legacy_naive_timestamps_read_as_utc() {
        let mut item = subscriber_to_item(&SubscriberRecord::sparse(
            "sub_1",
            SubscriptionStatus::Active,
        ));
        item.insert(
            "created_at".to_string(),
            string_value("2025-01-01T12:00:00.123456"),
        );
        item.insert("updated_at".to_string(), string_value("2025-01-02T08:30:00"));

        let decoded = subscriber_from_item("stj_subscribers", &item).unwrap();

        assert_eq!(
            decoded.created_at.map(|t| t.to_rfc3339()).as_deref(),
            Some("2025-01-01T12:00:00.123456Z")
        );
        assert_eq!(
            decoded.updated_at.map(|t| t.to_rfc3339()).as_deref(),
            Some("2025-01-02T08:30:00.000000Z")
        );
    }

    #[test]
    fn missing_status_is_corrupt() {
        let mut item = subscription_to_item(&full_subscription());
        item.remove("status");

        let err = subscription_from_item("stj_subscriptions", &item).unwrap_err();

        assert!(matches!(err, StoreError::CorruptItem { .. }));
        assert!(err.to_string().contains("missing status"));
    }

    #[test]
    fn unparseable_timestamp_is_corrupt() {
        let mut item = subscription_to_item(&full_subscription());
        item.insert("created_at".to_string(), string_value("yesterday"));

        assert!(subscription_from_item("stj_subscriptions", &item).is_err());
    }
}
