//! Ballot detail and group drill-down handlers

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use hemicycle_common::model::{BallotSummary, GroupVoteDetail, LegislatorVote};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::ApiResult;
use crate::normalize::{build_group_rollup, decode_ballot_summary, extract_legislator_votes};
use crate::AppState;

/// GET /api/scrutins/:legislature/:ballot_id response
#[derive(Debug, Serialize)]
pub struct BallotDetailResponse {
    pub summary: BallotSummary,
    /// Roll-up keyed by group identifier
    pub groups: BTreeMap<String, GroupVoteDetail>,
}

/// GET /api/scrutins/:legislature/:ballot_id/groupes/:group_id response
#[derive(Debug, Serialize)]
pub struct GroupVotesResponse {
    pub ballot_id: String,
    pub group_id: String,
    pub votes: Vec<LegislatorVote>,
    /// Voter entries dropped for lack of a resolvable identifier
    /// (data-completeness audit figure)
    pub dropped_voters: u32,
}

/// GET /api/scrutins/:legislature/:ballot_id
///
/// Fetches the ballot detail from the open-data API and returns the
/// canonical summary plus the per-group roll-up.
pub async fn ballot_detail(
    State(state): State<AppState>,
    Path((legislature, ballot_id)): Path<(u32, String)>,
) -> ApiResult<Json<BallotDetailResponse>> {
    let payload = state.client.fetch_scrutin(legislature, &ballot_id).await?;

    let summary = decode_ballot_summary(&payload, legislature, &ballot_id);
    let groups = build_group_rollup(&payload);

    tracing::info!(
        legislature,
        ballot_id = %summary.id,
        groups = groups.len(),
        voters = summary.counts.voters,
        "Ballot detail served"
    );

    Ok(Json(BallotDetailResponse { summary, groups }))
}

/// GET /api/scrutins/:legislature/:ballot_id/groupes/:group_id
///
/// Group drill-down: extracts the per-legislator breakdown, prefetches the
/// identities in one batch, and fills in whatever the cache has settled.
/// Names still loading come back empty; the client re-reads them through
/// the legislator endpoint.
pub async fn group_votes(
    State(state): State<AppState>,
    Path((legislature, ballot_id, group_id)): Path<(u32, String, String)>,
) -> ApiResult<Json<GroupVotesResponse>> {
    let payload = state
        .client
        .fetch_group_detail(legislature, &ballot_id, &group_id)
        .await?;

    let extracted = extract_legislator_votes(&payload);
    let mut votes = extracted.votes;

    let ids: Vec<String> = votes.iter().map(|v| v.legislator_id.clone()).collect();
    state.cache.prefetch(&ids, legislature).await;

    for vote in &mut votes {
        if let Some(identity) = state.cache.peek(&vote.legislator_id, legislature).await {
            vote.first_name = identity.first_name;
            vote.last_name = identity.last_name;
        }
    }
    votes.sort_by_key(LegislatorVote::display_key);

    tracing::info!(
        legislature,
        ballot_id,
        group_id,
        votes = votes.len(),
        dropped = extracted.dropped,
        "Group drill-down served"
    );

    Ok(Json(GroupVotesResponse {
        ballot_id,
        group_id,
        votes,
        dropped_voters: extracted.dropped,
    }))
}

/// Build ballot routes
pub fn scrutin_routes() -> Router<AppState> {
    Router::new()
        .route("/api/scrutins/:legislature/:ballot_id", get(ballot_detail))
        .route(
            "/api/scrutins/:legislature/:ballot_id/groupes/:group_id",
            get(group_votes),
        )
}
