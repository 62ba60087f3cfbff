//! Webhook error types for Stripe webhook handling.
//!
//! Defines all error conditions that can occur during webhook processing,
//! with HTTP status code mapping and retryability semantics.

use axum::http::StatusCode;
use thiserror::Error;

/// Reasons a `Stripe-Signature` header fails verification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    /// Header missing, empty, or not in `t=...,v1=...` form.
    #[error("malformed signature header: {0}")]
    MalformedHeader(&'static str),

    /// No `v1` signature matches the payload.
    #[error("no matching v1 signature")]
    Mismatch,

    /// Signed timestamp is older than the tolerance window (5 minutes).
    #[error("signature timestamp out of range")]
    TimestampOutOfRange,

    /// Signed timestamp is in the future beyond clock skew tolerance.
    #[error("signature timestamp in the future")]
    TimestampInFuture,
}

/// Error categories, used for logging and status mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Request could not be authenticated. No state touched.
    Authentication,
    /// Request was malformed or incomplete. No state touched.
    Validation,
    /// A collaborator (Stripe API, store) failed.
    Upstream,
}

/// Errors that occur during webhook processing.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Request body was empty.
    #[error("Empty request body")]
    EmptyBody,

    /// Webhook signature verification failed.
    #[error("Invalid signature: {0}")]
    InvalidSignature(#[from] SignatureError),

    /// Body is not JSON, or the event object has the wrong shape.
    #[error("Invalid JSON payload: {0}")]
    InvalidPayload(String),

    /// Required field missing from webhook payload.
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// Stripe API lookup failed.
    #[error("Payment provider error: {0}")]
    Payment(String),

    /// Store operation failed.
    #[error("Store error: {0}")]
    Store(String),
}

impl WebhookError {
    /// Field path reported when a checkout session has no customer email.
    pub const CUSTOMER_EMAIL: &'static str = "customer_details.email";

    /// Returns the error category.
    pub fn kind(&self) -> ErrorKind {
        match self {
            WebhookError::InvalidSignature(_) => ErrorKind::Authentication,
            WebhookError::EmptyBody
            | WebhookError::InvalidPayload(_)
            | WebhookError::MissingField(_) => ErrorKind::Validation,
            WebhookError::Payment(_) | WebhookError::Store(_) => ErrorKind::Upstream,
        }
    }

    /// Returns true if Stripe should retry delivering this webhook.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Upstream
    }

    /// Maps the error to an HTTP status code.
    ///
    /// Stripe retries 5xx responses and gives up on 4xx.
    pub fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::Authentication | ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::Upstream => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to return to the caller.
    ///
    /// Upstream details stay in the server logs.
    pub fn public_message(&self) -> String {
        match self {
            WebhookError::EmptyBody => "Empty request body".to_string(),
            WebhookError::InvalidSignature(_) => "Invalid signature".to_string(),
            WebhookError::InvalidPayload(_) => "Invalid JSON payload".to_string(),
            WebhookError::MissingField(Self::CUSTOMER_EMAIL) => {
                "No customer email found".to_string()
            }
            WebhookError::MissingField(field) => format!("Missing required field: {}", field),
            WebhookError::Payment(_) | WebhookError::Store(_) => {
                "Internal server error".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ══════════════════════════════════════════════════════════════
    // Error Display Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn invalid_signature_displays_reason() {
        let err = WebhookError::from(SignatureError::Mismatch);
        assert_eq!(format!("{}", err), "Invalid signature: no matching v1 signature");
    }

    #[test]
    fn missing_field_displays_field_name() {
        let err = WebhookError::MissingField("id");
        assert_eq!(format!("{}", err), "Missing field: id");
    }

    #[test]
    fn store_error_displays_detail() {
        let err = WebhookError::Store("ProvisionedThroughputExceeded".to_string());
        assert_eq!(format!("{}", err), "Store error: ProvisionedThroughputExceeded");
    }

    // ══════════════════════════════════════════════════════════════
    // Public Message Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn empty_body_message() {
        assert_eq!(WebhookError::EmptyBody.public_message(), "Empty request body");
    }

    #[test]
    fn signature_message_hides_reason() {
        let err = WebhookError::from(SignatureError::TimestampOutOfRange);
        assert_eq!(err.public_message(), "Invalid signature");
    }

    #[test]
    fn missing_email_message() {
        let err = WebhookError::MissingField(WebhookError::CUSTOMER_EMAIL);
        assert_eq!(err.public_message(), "No customer email found");
    }

    #[test]
    fn upstream_message_hides_detail() {
        let err = WebhookError::Payment("sk_live_leaked in message".to_string());
        assert_eq!(err.public_message(), "Internal server error");
        let err = WebhookError::Store("table stj_subscriptions not found".to_string());
        assert_eq!(err.public_message(), "Internal server error");
    }

    // ══════════════════════════════════════════════════════════════
    // Kind, Retryability and Status Code Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn signature_errors_are_authentication() {
        let err = WebhookError::from(SignatureError::MalformedHeader("missing timestamp"));
        assert_eq!(err.kind(), ErrorKind::Authentication);
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(!err.is_retryable());
    }

    #[test]
    fn validation_errors_return_bad_request() {
        for err in [
            WebhookError::EmptyBody,
            WebhookError::InvalidPayload("expected value".to_string()),
            WebhookError::MissingField("id"),
        ] {
            assert_eq!(err.kind(), ErrorKind::Validation);
            assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
            assert!(!err.is_retryable());
        }
    }

    #[test]
    fn upstream_errors_return_internal_error_and_retry() {
        for err in [
            WebhookError::Payment("timeout".to_string()),
            WebhookError::Store("unavailable".to_string()),
        ] {
            assert_eq!(err.kind(), ErrorKind::Upstream);
            assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
            assert!(err.is_retryable());
        }
    }
}
