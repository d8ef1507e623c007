//! Canonical domain model shared across Hemicycle services
//!
//! The open-data API has shipped several incompatible payload shapes over the
//! years. The normalization layer in hemicycle-vd decodes whatever arrives on
//! the wire exactly once into the types below; everything downstream (cache,
//! sync, HTTP surface) handles only this canonical form.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Canonical vote position
///
/// Every wire representation (localized labels, short codes, case variants,
/// empty strings) normalizes into exactly one of these four values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VotePosition {
    For,
    Against,
    Abstain,
    Absent,
}

impl VotePosition {
    /// French display label as used by the Assembly's own publications
    pub fn label(&self) -> &'static str {
        match self {
            VotePosition::For => "Pour",
            VotePosition::Against => "Contre",
            VotePosition::Abstain => "Abstention",
            VotePosition::Absent => "Non-votant",
        }
    }
}

/// Aggregate counts for one ballot
///
/// In Assembly terminology "votants" includes abstentions but excludes
/// non-voters, so `in_favor + against + abstain <= voters` always holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteCounts {
    pub voters: u32,
    #[serde(rename = "for")]
    pub in_favor: u32,
    pub against: u32,
    pub abstain: u32,
}

impl VoteCounts {
    /// True when every field is zero (no usable data was extracted)
    pub fn is_zero(&self) -> bool {
        self.voters == 0 && self.in_favor == 0 && self.against == 0 && self.abstain == 0
    }

    /// Votes actually expressed (excludes non-voters)
    pub fn expressed(&self) -> u32 {
        self.in_favor + self.against + self.abstain
    }
}

/// Per-position tallies inside one political group
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionCounts {
    #[serde(rename = "for")]
    pub in_favor: u32,
    pub against: u32,
    pub abstain: u32,
    pub absent: u32,
}

impl PositionCounts {
    pub fn increment(&mut self, position: VotePosition) {
        match position {
            VotePosition::For => self.in_favor += 1,
            VotePosition::Against => self.against += 1,
            VotePosition::Abstain => self.abstain += 1,
            VotePosition::Absent => self.absent += 1,
        }
    }

    /// True when every tally is zero
    pub fn is_zero(&self) -> bool {
        self.in_favor == 0 && self.against == 0 && self.abstain == 0 && self.absent == 0
    }
}

/// One ballot ("scrutin"): identity, wording, and aggregate counts
///
/// Constructed once per ballot-detail fetch; immutable after construction.
/// All-zero counts are a legitimate value (absence of data), not an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BallotSummary {
    /// Ballot number as published (numeric-looking string)
    pub id: String,
    /// Legislature the ballot belongs to
    pub legislature: u32,
    /// Ballot date as published (ISO day string), when present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    pub title: String,
    pub description: String,
    pub counts: VoteCounts,
}

/// One political group's participation in one ballot
///
/// Keyed by group identifier in the roll-up map. Replaced wholesale on
/// re-fetch, never patched in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupVoteDetail {
    pub id: String,
    /// Display name; synthesized from the id when the payload has none
    pub name: String,
    pub majority_position: VotePosition,
    pub counts: PositionCounts,
    /// Per-legislator breakdown, present only after a drill-down fetch
    #[serde(skip_serializing_if = "Option::is_none")]
    pub votes: Option<Vec<LegislatorVote>>,
}

/// One legislator's position within one group within one ballot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegislatorVote {
    /// Canonical identifier, always `PA` + digits
    pub legislator_id: String,
    /// Empty until the identity cache resolves it
    pub first_name: String,
    pub last_name: String,
    pub position: VotePosition,
    /// Vote cast under formal proxy rules ("par délégation")
    pub par_delegation: bool,
    /// Code explaining an unexpected position (presiding officer, etc.)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
}

impl LegislatorVote {
    /// Sort key for deterministic rendering when no other ordering applies
    pub fn display_key(&self) -> (String, String, String) {
        (
            self.last_name.to_lowercase(),
            self.first_name.to_lowercase(),
            self.legislator_id.clone(),
        )
    }
}

/// Resolved legislator identity (cache entry payload)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegislatorIdentity {
    pub legislator_id: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profession: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub political_group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub political_group_id: Option<String>,
    /// Timestamp of the last successful resolution (freshness window anchor)
    pub fetched_at: DateTime<Utc>,
}

impl LegislatorIdentity {
    /// Identity still awaiting resolution (names empty)
    pub fn pending(legislator_id: &str) -> Self {
        Self {
            legislator_id: legislator_id.to_string(),
            first_name: String::new(),
            last_name: String::new(),
            profession: None,
            political_group: None,
            political_group_id: None,
            fetched_at: Utc::now(),
        }
    }

    /// Synthetic placeholder shown when every tier came back empty,
    /// e.g. "Député 1234" for PA1234. The UI never blocks on resolution.
    pub fn placeholder(legislator_id: &str) -> Self {
        let digits = legislator_id.trim_start_matches("PA");
        Self {
            last_name: format!("Député {}", digits),
            ..Self::pending(legislator_id)
        }
    }

    /// Both name parts are populated
    pub fn is_complete(&self) -> bool {
        !self.first_name.is_empty() && !self.last_name.is_empty()
    }

    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// Result of a sync/reconciliation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncOutcome {
    pub success: bool,
    pub message: String,
    pub deputies_count: usize,
    pub fetch_errors: Vec<String>,
    pub sync_errors: Vec<String>,
}

/// Reconcile a raw legislator identifier to the canonical `PA`-prefixed form
///
/// The wire sometimes carries bare digits ("1234"), sometimes the prefixed
/// form ("PA1234"). Map keys and database bindings only ever use the
/// canonical form. Empty input stays empty (the caller drops such voters).
pub fn canonical_legislator_id(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.starts_with("PA") {
        trimmed.to_string()
    } else {
        format!("PA{}", trimmed)
    }
}
