//! Sync job trigger handlers

use axum::{
    extract::{Path, State},
    routing::post,
    Json, Router,
};
use hemicycle_common::model::SyncOutcome;
use serde::Deserialize;

use crate::error::ApiResult;
use crate::sync::{run_full_sync, run_incremental_sync};
use crate::AppState;

/// POST /api/sync/:legislature request
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SyncRequest {
    /// Delete the legislature's existing rows before upserting
    pub force: bool,
}

/// POST /api/sync/:legislature/missing request
#[derive(Debug, Deserialize)]
pub struct IncrementalSyncRequest {
    pub ids: Vec<String>,
}

/// POST /api/sync/:legislature
///
/// Runs the full roster sync. The identity cache is cleared on success so
/// entries that exhausted their retry budget pick up the repopulated store.
pub async fn full_sync(
    State(state): State<AppState>,
    Path(legislature): Path<u32>,
    Json(request): Json<SyncRequest>,
) -> ApiResult<Json<SyncOutcome>> {
    tracing::info!(legislature, force = request.force, "Full roster sync requested");

    let outcome = run_full_sync(
        &state.db,
        &state.client,
        legislature,
        request.force,
        &state.config.sync,
    )
    .await;

    if outcome.success {
        state.cache.clear().await;
    } else {
        *state.last_error.write().await = Some(outcome.message.clone());
    }

    Ok(Json(outcome))
}

/// POST /api/sync/:legislature/missing
///
/// Backfills specific identifiers with the smaller incremental batch size.
pub async fn incremental_sync(
    State(state): State<AppState>,
    Path(legislature): Path<u32>,
    Json(request): Json<IncrementalSyncRequest>,
) -> ApiResult<Json<SyncOutcome>> {
    tracing::info!(
        legislature,
        ids = request.ids.len(),
        "Incremental roster sync requested"
    );

    let outcome = run_incremental_sync(
        &state.db,
        &state.client,
        legislature,
        &request.ids,
        &state.config.sync,
    )
    .await;

    if outcome.success {
        state.cache.clear().await;
    }

    Ok(Json(outcome))
}

/// Build sync routes
pub fn sync_routes() -> Router<AppState> {
    Router::new()
        .route("/api/sync/:legislature", post(full_sync))
        .route("/api/sync/:legislature/missing", post(incremental_sync))
}
