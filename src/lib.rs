//! Screen Time Journey - Subscription Event Reconciler
//!
//! Receives Stripe webhook deliveries, verifies their signatures, and keeps
//! the subscription records in DynamoDB (plus their legacy subscriber mirror)
//! in step with the payment provider.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
