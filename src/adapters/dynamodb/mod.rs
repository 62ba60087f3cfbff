//! DynamoDB adapters.
//!
//! - `subscription_store` - Transactional dual write to both subscription tables
//! - `item` - Record to item conversion

mod item;
mod subscription_store;

pub use subscription_store::DynamoSubscriptionStore;
