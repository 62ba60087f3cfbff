//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives
//! - `subscription` - Stripe events and the records they reconcile into

pub mod foundation;
pub mod subscription;
