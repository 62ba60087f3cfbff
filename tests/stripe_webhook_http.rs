//! Integration tests for the Stripe webhook endpoint.
//!
//! These tests drive the fully layered router with signed deliveries:
//! 1. Rejections answer 4xx without touching the store
//! 2. Accepted events update both subscription records
//! 3. Every response carries the CORS headers

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use stj_subscriptions::adapters::{
    app_router, InMemorySubscriptionStore, MockPaymentProvider, WebhookAppState,
};
use stj_subscriptions::domain::foundation::Timestamp;
use stj_subscriptions::domain::subscription::{
    StripeWebhookVerifier, SubscriberRecord, SubscriptionRecord, SubscriptionStatus,
};
use stj_subscriptions::ports::{PaymentError, SubscriptionStore};

const SECRET: &str = "whsec_integration";
const WEBHOOK: &str = "/api/stripe/webhook";

// =============================================================================
// Test Infrastructure
// =============================================================================

struct TestApp {
    router: Router,
    store: InMemorySubscriptionStore,
    stripe: MockPaymentProvider,
    verifier: StripeWebhookVerifier,
}

impl TestApp {
    fn new() -> Self {
        let store = InMemorySubscriptionStore::new();
        let stripe = MockPaymentProvider::new();
        let state = WebhookAppState::new(
            Some(Arc::new(StripeWebhookVerifier::new(SECRET))),
            Arc::new(stripe.clone()),
            Arc::new(store.clone()),
        );

        Self {
            router: app_router(state),
            store,
            stripe,
            verifier: StripeWebhookVerifier::new(SECRET),
        }
    }

    async fn deliver(&self, event: Value) -> (StatusCode, Value) {
        let payload = serde_json::to_vec(&event).unwrap();
        let signature = self
            .verifier
            .sign(chrono::Utc::now().timestamp(), &payload);
        self.post(payload, Some(signature)).await
    }

    async fn post(&self, payload: Vec<u8>, signature: Option<String>) -> (StatusCode, Value) {
        let mut request = Request::builder()
            .method(Method::POST)
            .uri(WEBHOOK)
            .header("content-type", "application/json");
        if let Some(signature) = signature {
            request = request.header("Stripe-Signature", signature);
        }

        let response = self
            .router
            .clone()
            .oneshot(request.body(Body::from(payload)).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn seed_active(&self, subscription_id: &str, last_event_at: Option<i64>) {
        let mut record = SubscriptionRecord::sparse(subscription_id, SubscriptionStatus::Active);
        let mut mirror = SubscriberRecord::sparse(subscription_id, SubscriptionStatus::Active);
        let marker = last_event_at.and_then(Timestamp::from_unix_secs);
        record.last_event_at = marker;
        mirror.last_event_at = marker;
        self.store.seed(record, mirror).await;
    }

    async fn statuses(&self, subscription_id: &str) -> (SubscriptionStatus, SubscriptionStatus) {
        let record = self
            .store
            .get_subscription(subscription_id)
            .await
            .unwrap()
            .expect("subscription record");
        let mirror = self
            .store
            .get_subscriber(subscription_id)
            .await
            .unwrap()
            .expect("subscriber record");
        (record.status, mirror.status)
    }
}

fn event(event_type: &str, created: i64, object: Value) -> Value {
    json!({
        "id": format!("evt_{}", created),
        "type": event_type,
        "created": created,
        "livemode": false,
        "data": { "object": object }
    })
}

fn checkout(email: Option<&str>) -> Value {
    event(
        "checkout.session.completed",
        1_704_067_200,
        json!({
            "id": "cs_1",
            "customer": "cus_1",
            "subscription": "sub_1",
            "customer_details": { "email": email, "name": "Sam" },
            "metadata": { "plan": "premium", "country": "NL" }
        }),
    )
}

// =============================================================================
// Rejections
// =============================================================================

#[tokio::test]
async fn empty_body_is_bad_request() {
    let app = TestApp::new();

    let (status, body) = app.post(Vec::new(), None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Empty request body");
}

#[tokio::test]
async fn bad_signature_is_rejected_without_writes() {
    let app = TestApp::new();
    let payload = serde_json::to_vec(&checkout(Some("a@example.com"))).unwrap();
    let forged = StripeWebhookVerifier::new("whsec_other")
        .sign(chrono::Utc::now().timestamp(), &payload);

    let (status, body) = app.post(payload, Some(forged)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid signature");
    assert_eq!(app.store.write_count().await, 0);
    assert_eq!(app.stripe.call_count("get_subscription"), 0);
}

#[tokio::test]
async fn malformed_json_is_bad_request() {
    let app = TestApp::new();
    let payload = b"{not json".to_vec();
    let signature = app.verifier.sign(chrono::Utc::now().timestamp(), &payload);

    let (status, body) = app.post(payload, Some(signature)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid JSON payload");
}

#[tokio::test]
async fn checkout_without_email_is_bad_request() {
    let app = TestApp::new();
    app.stripe.add_active_subscription("sub_1", "cus_1", "price_monthly");

    let (status, body) = app.deliver(checkout(None)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No customer email found");
    assert_eq!(app.store.write_count().await, 0);
}

#[tokio::test]
async fn get_on_webhook_path_is_method_not_allowed() {
    let app = TestApp::new();

    let response = app
        .router
        .clone()
        .oneshot(Request::get(WEBHOOK).body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "*"
    );
}

// =============================================================================
// Reconciliation
// =============================================================================

#[tokio::test]
async fn checkout_creates_subscription_and_mirror() {
    let app = TestApp::new();
    app.stripe.add_active_subscription("sub_1", "cus_1", "price_monthly");

    let (status, body) = app.deliver(checkout(Some("a@example.com"))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["subscription_id"], "sub_1");
    assert_eq!(body["customer_email"], "a@example.com");

    let record = app.store.get_subscription("sub_1").await.unwrap().unwrap();
    assert_eq!(record.email.as_deref(), Some("a@example.com"));
    assert_eq!(record.price_id.as_deref(), Some("price_monthly"));
    assert_eq!(record.country.as_deref(), Some("NL"));

    let mirror = app.store.get_subscriber("sub_1").await.unwrap().unwrap();
    assert_eq!(mirror.name.as_deref(), Some("Sam"));
    assert_eq!(mirror.whatsapp_notifications, Some(true));
}

#[tokio::test]
async fn subscription_deleted_cancels_both_records() {
    let app = TestApp::new();
    app.seed_active("sub_1", None).await;

    let (status, body) = app
        .deliver(event(
            "customer.subscription.deleted",
            1_704_153_600,
            json!({ "id": "sub_1", "status": "canceled", "customer": "cus_1" }),
        ))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Subscription cancelled");
    assert_eq!(
        app.statuses("sub_1").await,
        (SubscriptionStatus::Cancelled, SubscriptionStatus::Cancelled)
    );
    let record = app.store.get_subscription("sub_1").await.unwrap().unwrap();
    assert!(record.cancelled_at.is_some());
}

#[tokio::test]
async fn invoice_payment_failed_marks_past_due() {
    let app = TestApp::new();
    app.seed_active("sub_2", None).await;

    let (status, _) = app
        .deliver(event(
            "invoice.payment_failed",
            1_704_153_600,
            json!({ "id": "in_1", "subscription": "sub_2", "customer": "cus_2" }),
        ))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        app.statuses("sub_2").await,
        (SubscriptionStatus::PastDue, SubscriptionStatus::PastDue)
    );
}

#[tokio::test]
async fn unknown_event_type_is_acknowledged() {
    let app = TestApp::new();

    let (status, body) = app
        .deliver(event("customer.created", 1_704_067_200, json!({ "id": "cus_1" })))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["message"],
        "Webhook customer.created received but not processed"
    );
    assert_eq!(app.store.write_count().await, 0);
}

#[tokio::test]
async fn older_event_does_not_overwrite_newer_state() {
    let app = TestApp::new();
    app.seed_active("sub_1", Some(1_704_153_600)).await;

    let (status, body) = app
        .deliver(event(
            "customer.subscription.updated",
            1_704_067_200,
            json!({ "id": "sub_1", "status": "past_due" }),
        ))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Stale event ignored");
    assert_eq!(
        app.statuses("sub_1").await,
        (SubscriptionStatus::Active, SubscriptionStatus::Active)
    );
}

// =============================================================================
// Upstream Failures
// =============================================================================

#[tokio::test]
async fn store_outage_is_server_error() {
    let app = TestApp::new();
    app.store.set_unavailable(true).await;

    let (status, body) = app
        .deliver(event(
            "customer.subscription.updated",
            1_704_067_200,
            json!({ "id": "sub_1", "status": "active" }),
        ))
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Internal server error");
}

#[tokio::test]
async fn provider_outage_is_server_error() {
    let app = TestApp::new();
    app.stripe.set_error(PaymentError::network("connection reset"));

    let (status, _) = app.deliver(checkout(Some("a@example.com"))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(app.store.write_count().await, 0);
}

// =============================================================================
// Ambient Routes
// =============================================================================

#[tokio::test]
async fn health_reports_ok_with_cors_headers() {
    let app = TestApp::new();

    let response = app
        .router
        .clone()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    for header in [
        "access-control-allow-origin",
        "access-control-allow-methods",
        "access-control-allow-headers",
    ] {
        assert_eq!(response.headers()[header], "*", "{}", header);
    }

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body, json!({ "status": "ok" }));
}
