//! Roster sync/reconciliation jobs
//!
//! Repopulates the legislator store from the remote open-data roster. The
//! full job mirrors a whole legislature; the incremental job backfills a
//! specific set of identifiers with a smaller batch size. Both are
//! idempotent: upserts are keyed on `(legislator_id, legislature)`, so
//! re-running with identical source data produces no net change.
//!
//! Failure handling is accumulation, not abortion: fetch problems land in
//! `fetch_errors`, store problems in `sync_errors`, and the job keeps going
//! with whatever remains. A failed batch is retried once, then falls back
//! to per-record upserts so a single bad record cannot sink the batch.

pub(crate) mod roster;

use hemicycle_common::config::SyncConfig;
use hemicycle_common::db::legislators::{self, LegislatorRow};
use hemicycle_common::model::{canonical_legislator_id, SyncOutcome};
use sqlx::SqlitePool;

use crate::client::OpenDataClient;

/// Mirror the full roster of one legislature into the store
///
/// `force` deletes the legislature's existing rows first; without it,
/// existing rows are simply overwritten in place.
pub async fn run_full_sync(
    db: &SqlitePool,
    client: &OpenDataClient,
    legislature: u32,
    force: bool,
    config: &SyncConfig,
) -> SyncOutcome {
    let mut fetch_errors = Vec::new();
    let mut sync_errors = Vec::new();

    // Organs first: group names come from cross-referencing. A failure here
    // degrades group labels, it does not stop the sync.
    let organe_index = match client.fetch_organes(legislature).await {
        Ok(payload) => roster::organe_index(&payload),
        Err(e) => {
            tracing::warn!(error = %e, legislature, "Organs listing fetch failed");
            fetch_errors.push(format!("organes: {}", e));
            Default::default()
        }
    };

    // Without the actors listing there is nothing to reconcile
    let acteurs_payload = match client.fetch_acteurs(legislature).await {
        Ok(payload) => payload,
        Err(e) => {
            tracing::error!(error = %e, legislature, "Actors listing fetch failed");
            fetch_errors.push(format!("acteurs: {}", e));
            return SyncOutcome {
                success: false,
                message: format!("Roster fetch failed for legislature {}", legislature),
                deputies_count: 0,
                fetch_errors,
                sync_errors,
            };
        }
    };

    let (rows, mut decode_errors) =
        roster::build_roster(&acteurs_payload, legislature, &organe_index);
    fetch_errors.append(&mut decode_errors);

    if force {
        match legislators::delete_legislature(db, legislature).await {
            Ok(deleted) => {
                tracing::info!(deleted, legislature, "Force resync: cleared existing rows")
            }
            Err(e) => sync_errors.push(format!("delete legislature {}: {}", legislature, e)),
        }
    }

    let (synced, mut upsert_errors) = upsert_rows(db, &rows, config.full_batch_size).await;
    sync_errors.append(&mut upsert_errors);

    tracing::info!(
        legislature,
        synced,
        fetch_errors = fetch_errors.len(),
        sync_errors = sync_errors.len(),
        "Full roster sync finished"
    );

    SyncOutcome {
        success: synced > 0,
        message: format!(
            "Synchronized {} deputies for legislature {}",
            synced, legislature
        ),
        deputies_count: synced,
        fetch_errors,
        sync_errors,
    }
}

/// Backfill a specific set of identifiers
///
/// Fetches each actor individually and upserts with the smaller incremental
/// batch size (throughput traded for resilience).
pub async fn run_incremental_sync(
    db: &SqlitePool,
    client: &OpenDataClient,
    legislature: u32,
    raw_ids: &[String],
    config: &SyncConfig,
) -> SyncOutcome {
    let mut fetch_errors = Vec::new();
    let mut rows: Vec<LegislatorRow> = Vec::new();

    let organe_index = match client.fetch_organes(legislature).await {
        Ok(payload) => roster::organe_index(&payload),
        Err(e) => {
            fetch_errors.push(format!("organes: {}", e));
            Default::default()
        }
    };

    for raw in raw_ids {
        let id = canonical_legislator_id(raw);
        if id.is_empty() {
            continue;
        }
        match client.fetch_acteur(&id).await {
            Ok(Some(payload)) => {
                match roster::acteur_row(&payload, legislature, &organe_index) {
                    Some(row) => rows.push(row),
                    None => fetch_errors.push(format!("{}: unusable actor record", id)),
                }
            }
            Ok(None) => fetch_errors.push(format!("{}: not found upstream", id)),
            Err(e) => fetch_errors.push(format!("{}: {}", id, e)),
        }
    }

    let (synced, sync_errors) = upsert_rows(db, &rows, config.incremental_batch_size).await;

    SyncOutcome {
        success: synced > 0,
        message: format!(
            "Backfilled {} of {} deputies for legislature {}",
            synced,
            raw_ids.len(),
            legislature
        ),
        deputies_count: synced,
        fetch_errors,
        sync_errors,
    }
}

/// Upsert rows in batches with batch-retry-then-per-record fallback
///
/// Returns the number of rows that landed and the per-record failures.
async fn upsert_rows(
    db: &SqlitePool,
    rows: &[LegislatorRow],
    batch_size: usize,
) -> (usize, Vec<String>) {
    let mut synced = 0;
    let mut errors = Vec::new();

    for chunk in rows.chunks(batch_size.max(1)) {
        match legislators::upsert_batch(db, chunk).await {
            Ok(()) => synced += chunk.len(),
            Err(first) => {
                tracing::warn!(error = %first, size = chunk.len(), "Batch upsert failed, retrying once");
                match legislators::upsert_batch(db, chunk).await {
                    Ok(()) => synced += chunk.len(),
                    Err(_) => {
                        for row in chunk {
                            match legislators::upsert_one(db, row).await {
                                Ok(()) => synced += 1,
                                Err(e) => {
                                    errors.push(format!("{}: {}", row.legislator_id, e))
                                }
                            }
                        }
                    }
                }
            }
        }
    }

    (synced, errors)
}
