use std::sync::Arc;

use tokio::net::TcpListener;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use stj_subscriptions::adapters::{
    app_router, DynamoSubscriptionStore, InMemorySubscriptionStore, StripeConfig,
    StripePaymentAdapter, WebhookAppState,
};
use stj_subscriptions::config::{AppConfig, StorageBackend};
use stj_subscriptions::domain::subscription::StripeWebhookVerifier;
use stj_subscriptions::ports::SubscriptionStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    init_tracing(&config);

    tracing::info!(
        environment = ?config.server.environment,
        test_mode = config.payment.is_test_mode(),
        "Starting subscription reconciler"
    );

    let stripe = StripeConfig::new(config.payment.stripe_secret_key.clone())
        .with_base_url(config.payment.stripe_api_base_url.clone());
    let payment_provider = Arc::new(StripePaymentAdapter::new(stripe));

    let verifier = match config.payment.webhook_secret() {
        Some(secret) => Some(Arc::new(StripeWebhookVerifier::new(secret))),
        None => {
            tracing::warn!("Webhook secret not configured, signatures will not be verified");
            None
        }
    };

    let store: Arc<dyn SubscriptionStore> = match config.storage.backend {
        StorageBackend::Dynamodb => {
            tracing::info!(
                region = %config.storage.region,
                subscriptions_table = %config.storage.subscriptions_table,
                subscribers_table = %config.storage.subscribers_table,
                "Using DynamoDB subscription store"
            );
            Arc::new(DynamoSubscriptionStore::connect(&config.storage).await)
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory subscription store, records are lost on restart");
            Arc::new(InMemorySubscriptionStore::new())
        }
    };

    let app = app_router(WebhookAppState::new(verifier, payment_provider, store));

    let addr = config.server.socket_addr()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));

    if config.is_production() {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .init();
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
