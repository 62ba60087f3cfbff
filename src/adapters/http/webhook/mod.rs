//! HTTP adapter for the Stripe webhook endpoint.

mod dto;
mod handlers;
mod routes;

pub use dto::{ErrorResponse, HealthResponse, WebhookResponse};
pub use handlers::{
    handle_stripe_webhook, health, method_not_allowed, WebhookApiError, WebhookAppState,
    STRIPE_SIGNATURE_HEADER,
};
pub use routes::{webhook_routes, WEBHOOK_PATH};
