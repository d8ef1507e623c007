//! Legislator identity handlers

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use hemicycle_common::model::LegislatorIdentity;
use serde::{Deserialize, Serialize};

use crate::cache::Priority;
use crate::AppState;

/// Query parameters for a single identity read
#[derive(Debug, Deserialize)]
pub struct ResolveParams {
    /// Identifier is currently on screen: resolve eagerly and arm the
    /// bounded retry
    #[serde(default)]
    pub visible: bool,
}

/// POST /api/legislateurs/:legislature/prefetch request
#[derive(Debug, Deserialize)]
pub struct PrefetchRequest {
    pub ids: Vec<String>,
}

/// POST /api/legislateurs/:legislature/prefetch response
#[derive(Debug, Serialize)]
pub struct PrefetchResponse {
    pub requested: usize,
}

/// GET /api/legislateurs/:legislature/:id
///
/// Always answers with something displayable; `is_complete` on the client
/// side distinguishes a resolved identity from a pending or placeholder
/// one.
pub async fn legislator_identity(
    State(state): State<AppState>,
    Path((legislature, id)): Path<(u32, String)>,
    Query(params): Query<ResolveParams>,
) -> Json<LegislatorIdentity> {
    let priority = if params.visible {
        Priority::Visible
    } else {
        Priority::Background
    };
    Json(state.cache.resolve(&id, legislature, priority).await)
}

/// POST /api/legislateurs/:legislature/prefetch
///
/// Warms the cache for a set of identifiers with one batched store query.
pub async fn prefetch(
    State(state): State<AppState>,
    Path(legislature): Path<u32>,
    Json(request): Json<PrefetchRequest>,
) -> Json<PrefetchResponse> {
    let requested = request.ids.len();
    state.cache.prefetch(&request.ids, legislature).await;
    Json(PrefetchResponse { requested })
}

/// Build legislator routes
pub fn legislateur_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/legislateurs/:legislature/prefetch",
            post(prefetch),
        )
        .route(
            "/api/legislateurs/:legislature/:id",
            get(legislator_identity),
        )
}
