//! ReconcileWebhookHandler - Command handler for Stripe subscription webhooks.
//!
//! Turns one inbound delivery into at most one paired write of the
//! subscription record and its legacy mirror.

use std::sync::Arc;

use crate::domain::foundation::Timestamp;
use crate::domain::subscription::{
    CheckoutSessionObject, CompletedCheckout, InvoiceObject, StatusChange, StripeEvent,
    StripeEventType, StripeWebhookVerifier, SubscriptionObject, SubscriptionStatus, WebhookError,
};
use crate::ports::{PaymentProvider, SubscriptionStore, WriteOutcome};

/// Command to reconcile a Stripe webhook delivery.
#[derive(Debug, Clone)]
pub struct ReconcileWebhookCommand {
    /// Raw request body, exactly as received.
    pub payload: Vec<u8>,
    /// `Stripe-Signature` header, if sent.
    pub signature: Option<String>,
}

/// Result of webhook reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileWebhookResult {
    /// Checkout completed, both records written.
    SubscriptionCreated {
        subscription_id: String,
        customer_email: String,
    },
    /// Provider reported a new status.
    StatusUpdated {
        subscription_id: String,
        status: SubscriptionStatus,
    },
    /// Subscription deleted on the provider side.
    SubscriptionCancelled { subscription_id: String },
    /// Invoice payment failed. No subscription means nothing was written.
    PaymentFailureRecorded { subscription_id: Option<String> },
    /// A newer event was already applied.
    StaleEventIgnored { subscription_id: String },
    /// Event type the reconciler does not act on.
    Ignored { event_type: String },
}

impl ReconcileWebhookResult {
    /// Message returned to Stripe in the response body.
    pub fn message(&self) -> String {
        match self {
            Self::SubscriptionCreated { .. } => "Subscription record created".to_string(),
            Self::StatusUpdated { status, .. } => format!("Subscription updated to {}", status),
            Self::SubscriptionCancelled { .. } => "Subscription cancelled".to_string(),
            Self::PaymentFailureRecorded { .. } => "Payment failure recorded".to_string(),
            Self::StaleEventIgnored { .. } => "Stale event ignored".to_string(),
            Self::Ignored { event_type } => {
                format!("Webhook {} received but not processed", event_type)
            }
        }
    }

    /// Subscription the event applied to, if any.
    pub fn subscription_id(&self) -> Option<&str> {
        match self {
            Self::SubscriptionCreated {
                subscription_id, ..
            }
            | Self::StatusUpdated {
                subscription_id, ..
            }
            | Self::SubscriptionCancelled { subscription_id }
            | Self::StaleEventIgnored { subscription_id } => Some(subscription_id),
            Self::PaymentFailureRecorded { subscription_id } => subscription_id.as_deref(),
            Self::Ignored { .. } => None,
        }
    }

    /// Customer email, only known after checkout.
    pub fn customer_email(&self) -> Option<&str> {
        match self {
            Self::SubscriptionCreated { customer_email, .. } => Some(customer_email),
            _ => None,
        }
    }
}

/// Handler for reconciling Stripe webhooks into subscription records.
///
/// Without a verifier the handler runs in degraded mode: signatures are not
/// checked and every delivery logs a warning.
pub struct ReconcileWebhookHandler {
    verifier: Option<Arc<StripeWebhookVerifier>>,
    payment_provider: Arc<dyn PaymentProvider>,
    store: Arc<dyn SubscriptionStore>,
}

impl ReconcileWebhookHandler {
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

    pub async fn handle(
        &self,
        cmd: ReconcileWebhookCommand,
    ) -> Result<ReconcileWebhookResult, WebhookError> {
        // 1. Reject empty deliveries before anything else
        if cmd.payload.is_empty() {
            return Err(WebhookError::EmptyBody);
        }

        // 2. Verify signature
        match &self.verifier {
            Some(verifier) => {
                let header = cmd.signature.as_deref().unwrap_or_default();
                verifier.verify(&cmd.payload, header).map_err(|e| {
                    tracing::warn!(error = %e, "Rejected webhook with invalid signature");
                    WebhookError::from(e)
                })?;
            }
            None => {
                tracing::warn!("Webhook secret not configured, skipping signature verification");
            }
        }

        // 3. Parse envelope
        let event: StripeEvent = serde_json::from_slice(&cmd.payload)
            .map_err(|e| WebhookError::InvalidPayload(e.to_string()))?;

        tracing::info!(
            event_id = event.id.as_deref().unwrap_or("-"),
            event_type = %event.event_type,
            livemode = event.livemode,
            "Processing Stripe webhook"
        );

        // 4. Dispatch on event type
        let result = match event.parsed_type() {
            StripeEventType::CheckoutSessionCompleted => {
                self.handle_checkout_completed(&event).await
            }
            StripeEventType::CustomerSubscriptionUpdated => {
                self.handle_subscription_updated(&event).await
            }
            StripeEventType::CustomerSubscriptionDeleted => {
                self.handle_subscription_deleted(&event).await
            }
            StripeEventType::InvoicePaymentFailed => {
                self.handle_invoice_payment_failed(&event).await
            }
            StripeEventType::Unknown => {
                tracing::info!(event_type = %event.event_type, "Ignoring unhandled webhook type");
                Ok(ReconcileWebhookResult::Ignored {
                    event_type: event.event_type.clone(),
                })
            }
        };

        if let Err(e) = &result {
            if e.is_retryable() {
                tracing::error!(event_type = %event.event_type, error = %e, "Webhook processing failed");
            } else {
                tracing::warn!(event_type = %event.event_type, error = %e, "Rejected webhook payload");
            }
        }

        result
    }

    async fn handle_checkout_completed(
        &self,
        event: &StripeEvent,
    ) -> Result<ReconcileWebhookResult, WebhookError> {
        let session: CheckoutSessionObject = event
            .deserialize_object()
            .map_err(|e| WebhookError::InvalidPayload(e.to_string()))?;

        let email = session
            .customer_email()
            .ok_or(WebhookError::MissingField(WebhookError::CUSTOMER_EMAIL))?
            .to_string();

        // One-off payments have no subscription; key them by the session
        let provider_subscription = non_empty(session.subscription.clone());
        let subscription_id = provider_subscription
            .clone()
            .or_else(|| non_empty(session.id.clone()))
            .ok_or(WebhookError::MissingField("subscription"))?;

        let details = match provider_subscription.as_deref() {
            Some(id) => Some(self.payment_provider.get_subscription(id).await?.ok_or_else(
                || WebhookError::Payment(format!("Subscription {} not found at provider", id)),
            )?),
            None => None,
        };

        let event_at = event.occurred_at();
        let created_at = event_at
            .or_else(|| session.created.and_then(Timestamp::from_unix_secs))
            .unwrap_or_else(Timestamp::now);

        let metadata = |key: &str| session.metadata_value(key).map(str::to_string);
        let checkout = CompletedCheckout {
            subscription_id: subscription_id.clone(),
            customer_id: session
                .customer
                .clone()
                .or_else(|| details.as_ref().and_then(|d| d.customer_id.clone())),
            email: email.clone(),
            name: session.customer_name().map(str::to_string),
            session_id: session.id.clone(),
            status: details
                .as_ref()
                .map(|d| d.status)
                .unwrap_or(SubscriptionStatus::Active),
            price_id: details
                .as_ref()
                .and_then(|d| d.price_id.clone())
                .or_else(|| metadata("price_id")),
            plan: metadata("plan"),
            currency: metadata("currency"),
            country: metadata("country"),
            source: metadata("source"),
            phone: metadata("phone"),
            created_at,
            event_at,
        };

        let outcome = self
            .store
            .put_subscription(&checkout.subscription_record(), &checkout.subscriber_record())
            .await?;

        if outcome == WriteOutcome::Stale {
            return Ok(stale(subscription_id));
        }

        tracing::info!(
            subscription_id = %subscription_id,
            status = %checkout.status,
            "Subscription record created"
        );

        Ok(ReconcileWebhookResult::SubscriptionCreated {
            subscription_id,
            customer_email: email,
        })
    }

    async fn handle_subscription_updated(
        &self,
        event: &StripeEvent,
    ) -> Result<ReconcileWebhookResult, WebhookError> {
        let subscription: SubscriptionObject = event
            .deserialize_object()
            .map_err(|e| WebhookError::InvalidPayload(e.to_string()))?;

        let subscription_id = non_empty(subscription.id).ok_or(WebhookError::MissingField("id"))?;
        let raw_status =
            non_empty(subscription.status).ok_or(WebhookError::MissingField("status"))?;
        let status = SubscriptionStatus::from_provider(&raw_status).ok_or_else(|| {
            WebhookError::InvalidPayload(format!("unknown subscription status: {}", raw_status))
        })?;

        let change = StatusChange::updated(
            subscription_id.clone(),
            status,
            occurred_at(event),
            event.occurred_at(),
        );

        if self.store.apply_status_change(&change).await? == WriteOutcome::Stale {
            return Ok(stale(subscription_id));
        }

        tracing::info!(subscription_id = %subscription_id, status = %status, "Subscription status updated");

        Ok(ReconcileWebhookResult::StatusUpdated {
            subscription_id,
            status,
        })
    }

    async fn handle_subscription_deleted(
        &self,
        event: &StripeEvent,
    ) -> Result<ReconcileWebhookResult, WebhookError> {
        let subscription: SubscriptionObject = event
            .deserialize_object()
            .map_err(|e| WebhookError::InvalidPayload(e.to_string()))?;

        let subscription_id = non_empty(subscription.id).ok_or(WebhookError::MissingField("id"))?;

        let change =
            StatusChange::cancelled(subscription_id.clone(), occurred_at(event), event.occurred_at());

        if self.store.apply_status_change(&change).await? == WriteOutcome::Stale {
            return Ok(stale(subscription_id));
        }

        tracing::info!(subscription_id = %subscription_id, "Subscription cancelled");

        Ok(ReconcileWebhookResult::SubscriptionCancelled { subscription_id })
    }

    async fn handle_invoice_payment_failed(
        &self,
        event: &StripeEvent,
    ) -> Result<ReconcileWebhookResult, WebhookError> {
        let invoice: InvoiceObject = event
            .deserialize_object()
            .map_err(|e| WebhookError::InvalidPayload(e.to_string()))?;

        let Some(subscription_id) = non_empty(invoice.subscription) else {
            tracing::info!(
                invoice_id = invoice.id.as_deref().unwrap_or("-"),
                "Payment failure for invoice without subscription, nothing to update"
            );
            return Ok(ReconcileWebhookResult::PaymentFailureRecorded {
                subscription_id: None,
            });
        };

        let change = StatusChange::payment_failed(
            subscription_id.clone(),
            occurred_at(event),
            event.occurred_at(),
        );

        if self.store.apply_status_change(&change).await? == WriteOutcome::Stale {
            return Ok(stale(subscription_id));
        }

        tracing::info!(subscription_id = %subscription_id, "Payment failure recorded");

        Ok(ReconcileWebhookResult::PaymentFailureRecorded {
            subscription_id: Some(subscription_id),
        })
    }
}

/// Event time when the envelope carries one, otherwise the current time.
fn occurred_at(event: &StripeEvent) -> Timestamp {
    event.occurred_at().unwrap_or_else(Timestamp::now)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn stale(subscription_id: String) -> ReconcileWebhookResult {
    tracing::info!(subscription_id = %subscription_id, "Ignoring out-of-order webhook event");
    ReconcileWebhookResult::StaleEventIgnored { subscription_id }
}
