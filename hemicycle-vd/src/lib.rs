//! hemicycle-vd library interface
//!
//! Exposes the vote-data core (normalization, identity cache, sync jobs)
//! and the HTTP surface for integration testing.

pub mod api;
pub mod cache;
pub mod client;
pub mod error;
pub mod normalize;
pub mod sync;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use hemicycle_common::config::HemicycleConfig;
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;

use crate::cache::IdentityCache;
use crate::client::OpenDataClient;

/// Application state shared across handlers
///
/// The identity cache lives here, owned by the composition root and
/// injected into whatever needs it; there is no module-level singleton.
#[derive(Clone)]
pub struct AppState {
    /// Legislator store connection pool
    pub db: SqlitePool,
    /// Open-data API client
    pub client: Arc<OpenDataClient>,
    /// Legislator identity cache
    pub cache: IdentityCache,
    pub config: Arc<HemicycleConfig>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last error for diagnostic purposes
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(db: SqlitePool, client: Arc<OpenDataClient>, config: HemicycleConfig) -> Self {
        let cache = IdentityCache::new(db.clone(), client.clone(), config.cache.clone());
        Self {
            db,
            client,
            cache,
            config: Arc::new(config),
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::scrutin_routes())
        .merge(api::legislateur_routes())
        .merge(api::sync_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
