//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! - `PaymentProvider` - Subscription lookups against Stripe
//! - `SubscriptionStore` - Atomic writes to both subscription tables

mod payment_provider;
mod subscription_store;

pub use payment_provider::{PaymentError, PaymentErrorCode, PaymentProvider, SubscriptionDetails};
pub use subscription_store::{StoreError, SubscriptionStore, WriteOutcome};
