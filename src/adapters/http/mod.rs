//! HTTP adapters - REST API implementations.
//!
//! [`app_router`] assembles the full service: routes, request tracing, and
//! the permissive CORS headers every response carries.

pub mod webhook;

use axum::http::{header, HeaderValue};
use axum::Router;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

pub use webhook::{webhook_routes, WebhookAppState, WEBHOOK_PATH};

/// Build the service router with its middleware stack.
pub fn app_router(state: WebhookAppState) -> Router {
    let any = HeaderValue::from_static("*");

    webhook_routes()
        .with_state(state)
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            any.clone(),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            any.clone(),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            any,
        ))
        .layer(TraceLayer::new_for_http())
}
