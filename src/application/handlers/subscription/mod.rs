//! Subscription command handlers.

mod reconcile_webhook;

pub use reconcile_webhook::{
    ReconcileWebhookCommand, ReconcileWebhookHandler, ReconcileWebhookResult,
};
