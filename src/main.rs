//! Bidhall server binary.
//!
//! Loads configuration, connects to PostgreSQL, builds the auction
//! registry and serves the live auction routes.

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use bidhall::adapters::ledger::PostgresBidLedger;
use bidhall::adapters::websocket::{auction_router, AuctionRegistry, AuctionWsState};
use bidhall::config::AppConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.server.log_level))
        .init();

    tracing::info!(
        environment = ?config.server.environment,
        "starting bidhall"
    );

    let pool = PgPoolOptions::new()
        .min_connections(config.database.min_connections)
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.acquire_timeout())
        .connect(&config.database.url)
        .await?;
    tracing::info!("database pool established");

    let ledger = Arc::new(PostgresBidLedger::new(pool));
    let registry = AuctionRegistry::new(ledger, config.auction);

    let app = auction_router()
        .with_state(AuctionWsState {
            registry,
            config: config.auction,
        })
        .layer(TraceLayer::new_for_http());

    let addr = config.server.socket_addr();
    tracing::info!(%addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
