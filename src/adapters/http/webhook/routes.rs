//! Axum router configuration for the webhook endpoint.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{handle_stripe_webhook, health, method_not_allowed, WebhookAppState};

/// Path Stripe delivers events to.
pub const WEBHOOK_PATH: &str = "/api/stripe/webhook";

/// Create the webhook router.
///
/// # Routes
/// - `POST /api/stripe/webhook` - Handle Stripe webhooks (signature verified)
/// - `GET /health` - Health check
///
/// Every other method on the webhook path answers 405.
pub fn webhook_routes() -> Router<WebhookAppState> {
    Router::new()
        .route(
            WEBHOOK_PATH,
            post(handle_stripe_webhook).fallback(method_not_allowed),
        )
        .route("/health", get(health))
}
