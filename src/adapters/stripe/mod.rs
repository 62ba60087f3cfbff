//! Stripe payment provider adapter.
//!
//! Implements the `PaymentProvider` port for Stripe integration:
//! - Subscription lookup over the REST API
//! - A configurable mock for tests
//!
//! The secret API key is held in a `secrecy::SecretString`.

mod api_types;
mod mock_payment_provider;
mod stripe_adapter;

pub use api_types::{StripeErrorResponse, StripeSubscription};
pub use mock_payment_provider::{MethodCall, MockPaymentProvider};
pub use stripe_adapter::{StripeConfig, StripePaymentAdapter};
