//! Boxoffice server binary: wires configuration, stores, services, and the
//! HTTP router.

use boxoffice::config::Config;
use boxoffice::server::{build_router, AppState};
use boxoffice::services::{BookingService, HoldService};
use boxoffice::stores::{PostgresInventoryStore, RedisHoldStore};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.server.log_level.clone())),
        )
        .init();

    tracing::info!(
        redis_url = %config.redis.url,
        hold_ttl_seconds = config.holds.ttl_seconds,
        "starting boxoffice"
    );

    let inventory =
        PostgresInventoryStore::connect(&config.postgres.url, config.postgres.max_connections)
            .await?;
    inventory.migrate().await?;

    let hold_store = RedisHoldStore::connect(&config.redis.url).await?;

    let holds = HoldService::new(
        hold_store,
        inventory.clone(),
        config.holds.ttl_seconds,
    );
    let bookings = BookingService::new(inventory);

    let state = AppState::new(holds, bookings);
    let router = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to install shutdown handler");
    }
    tracing::info!("shutdown signal received");
}
