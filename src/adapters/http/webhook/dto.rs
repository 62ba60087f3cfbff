//! HTTP DTOs for the webhook endpoint.
//!
//! Stripe only looks at the status code; the body is for humans reading the
//! delivery log in the Stripe dashboard.

use serde::Serialize;

use crate::application::ReconcileWebhookResult;

/// Successful webhook response.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookResponse {
    /// Always true.
    pub success: bool,
    /// What the reconciler did.
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_email: Option<String>,
}

impl From<ReconcileWebhookResult> for WebhookResponse {
    fn from(result: ReconcileWebhookResult) -> Self {
        Self {
            success: true,
            message: result.message(),
            subscription_id: result.subscription_id().map(str::to_string),
            customer_email: result.customer_email().map(str::to_string),
        }
    }
}

/// Error response body.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Always false.
    pub success: bool,
    /// Caller-safe error message.
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}
