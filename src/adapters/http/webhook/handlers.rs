//! HTTP handlers for the Stripe webhook endpoint.
//!
//! These handlers connect Axum routes to the reconcile command handler.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Json, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;

use crate::application::{ReconcileWebhookCommand, ReconcileWebhookHandler};
use crate::domain::subscription::{StripeWebhookVerifier, WebhookError};
use crate::ports::{PaymentProvider, SubscriptionStore};

use super::dto::{ErrorResponse, HealthResponse, WebhookResponse};

/// Header Stripe signs deliveries with.
pub const STRIPE_SIGNATURE_HEADER: &str = "Stripe-Signature";

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared application state containing all dependencies.
///
/// Cloned for each request; dependencies are Arc-wrapped.
#[derive(Clone)]
pub struct WebhookAppState {
    /// `None` runs the endpoint without signature checks.
    pub verifier: Option<Arc<StripeWebhookVerifier>>,
    pub payment_provider: Arc<dyn PaymentProvider>,
    pub store: Arc<dyn SubscriptionStore>,
}

impl WebhookAppState {
    pub fn new(
        verifier: Option<Arc<StripeWebhookVerifier>>,
        payment_provider: Arc<dyn PaymentProvider>,
        store: Arc<dyn SubscriptionStore>,
    ) -> Self {
        Self {
            verifier,
            payment_provider,
            store,
        }
    }

    pub fn reconcile_handler(&self) -> ReconcileWebhookHandler {
        ReconcileWebhookHandler::new(
            self.verifier.clone(),
            self.payment_provider.clone(),
            self.store.clone(),
        )
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Handlers
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/stripe/webhook - Reconcile a Stripe webhook event
pub async fn handle_stripe_webhook(
    State(state): State<WebhookAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, WebhookApiError> {
    let signature = headers
        .get(STRIPE_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let cmd = ReconcileWebhookCommand {
        payload: body.to_vec(),
        signature,
    };

    let result = state.reconcile_handler().handle(cmd).await?;

    Ok(Json(WebhookResponse::from(result)))
}

/// Any other method on the webhook path
pub async fn method_not_allowed() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(ErrorResponse::new("Method not allowed")),
    )
}

/// GET /health - Load balancer health check
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts webhook errors to HTTP responses.
pub struct WebhookApiError(WebhookError);

impl From<WebhookError> for WebhookApiError {
    fn from(err: WebhookError) -> Self {
        Self(err)
    }
}

impl IntoResponse for WebhookApiError {
    fn into_response(self) -> axum::response::Response {
        let body = ErrorResponse::new(self.0.public_message());
        (self.0.status_code(), Json(body)).into_response()
    }
}
