//! hemicycle-vd - Vote Data Service
//!
//! Mirrors French National Assembly roll-call votes: normalizes the
//! open-data ballot payloads into one canonical model, resolves legislator
//! identities through the three-tier cache, and keeps the local roster
//! mirror in sync on demand.

use anyhow::Result;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use hemicycle_vd::{build_router, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting hemicycle-vd (Vote Data) service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Step 1: Load configuration (file is optional, defaults apply)
    let config = hemicycle_common::config::HemicycleConfig::load()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    // Step 2: Resolve root folder and open or create the database
    let db_path = config.database_path();
    info!("Database: {}", db_path.display());

    let db_pool = hemicycle_common::db::init_database_pool(&db_path).await?;
    info!("Database connection established");

    // Step 3: Build the open-data client
    let client = Arc::new(hemicycle_vd::client::OpenDataClient::new(&config.opendata)?);
    info!("Open-data client ready: {}", config.opendata.base_url);

    // Create application state
    let listen = format!("{}:{}", config.listen.host, config.listen.port);
    let state = AppState::new(db_pool, client, config);

    // Build router
    let app = build_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&listen).await?;
    info!("Listening on http://{}", listen);
    info!("Health check: http://{}/health", listen);

    axum::serve(listener, app).await?;

    Ok(())
}
