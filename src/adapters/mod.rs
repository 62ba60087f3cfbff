//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `http` - Axum router for the webhook endpoint
//! - `stripe` - Stripe API client and mock
//! - `dynamodb` - DynamoDB subscription store
//! - `memory` - In-memory subscription store

pub mod dynamodb;
pub mod http;
pub mod memory;
pub mod stripe;

pub use dynamodb::DynamoSubscriptionStore;
pub use http::{app_router, WebhookAppState};
pub use memory::InMemorySubscriptionStore;
pub use stripe::{MockPaymentProvider, StripeConfig, StripePaymentAdapter};
