//! CareFund API Server
//!
//! Main entry point for the campaign funding service.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use carefund_api::{AppState, create_router};
use carefund_core::FundingService;
use carefund_core::gateway::{PaymentGateway, SandboxGateway, TimeoutGateway};
use carefund_core::store::{FundingStore, InMemoryStore};
use carefund_db::{SeaFundingStore, connect};
use carefund_payments::StripeGateway;
use carefund_shared::AppConfig;
use carefund_shared::config::{GatewayConfig, GatewayProvider};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "carefund=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;

    let store: Arc<dyn FundingStore> = if config.database.url.is_some() {
        let db = connect(&config.database).await?;
        info!("Connected to database");
        Arc::new(SeaFundingStore::new(db))
    } else {
        warn!("database.url not set, using the in-memory store");
        Arc::new(InMemoryStore::new())
    };

    let gateway = build_gateway(&config.gateway)?;
    info!(
        provider = ?config.gateway.provider,
        currency = %config.gateway.currency,
        timeout_secs = config.gateway.timeout_secs,
        "Payment gateway configured"
    );

    let state = AppState {
        funding: FundingService::new(store, gateway, config.gateway.currency),
    };
    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

fn build_gateway(config: &GatewayConfig) -> anyhow::Result<Arc<dyn PaymentGateway>> {
    let inner: Arc<dyn PaymentGateway> = match config.provider {
        GatewayProvider::Stripe => {
            let secret = config
                .secret_key
                .as_deref()
                .context("gateway.secret_key is required for the stripe provider")?;
            Arc::new(StripeGateway::new(secret, &config.api_base)?)
        }
        GatewayProvider::Sandbox => {
            warn!("Using the sandbox gateway, intents must be settled manually");
            Arc::new(SandboxGateway::new())
        }
    };
    Ok(Arc::new(TimeoutGateway::new(
        inner,
        Duration::from_secs(config.timeout_secs),
    )))
}
