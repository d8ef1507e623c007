//! Per-legislator vote extraction
//!
//! Turns one political group's detail payload into the flat list of
//! legislator votes. The nominal breakdown has been observed nested under
//! `decompteNominatif` (directly or inside a `vote` block), under `decompte`,
//! under `votes`, or flat at the group root; the first shape holding any
//! data wins. Voter entries without a resolvable identifier cannot be
//! displayed and are dropped, but the loss is counted and logged so data
//! completeness stays auditable.

use hemicycle_common::model::{
    canonical_legislator_id, LegislatorVote, PositionCounts, VotePosition,
};
use serde::Deserialize;
use serde_json::Value;

use super::{as_list, field};

/// Position buckets of the nominal breakdown, with their wire spellings
const BUCKETS: [(VotePosition, &[&str]); 4] = [
    (VotePosition::For, &["pours", "pour"]),
    (VotePosition::Against, &["contres", "contre"]),
    (VotePosition::Abstain, &["abstentions", "abstention"]),
    (VotePosition::Absent, &["nonVotants", "nonVotant"]),
];

/// Extraction result: the votes plus the count of voter entries dropped for
/// lack of a resolvable identifier
#[derive(Debug, Default)]
pub struct ExtractedVotes {
    pub votes: Vec<LegislatorVote>,
    pub dropped: u32,
}

/// A string that may arrive bare or wrapped in a `{"#text": ...}` node
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TextOrString {
    Wrapped {
        #[serde(rename = "#text")]
        text: String,
    },
    Plain(String),
}

impl TextOrString {
    fn into_inner(self) -> String {
        match self {
            TextOrString::Wrapped { text } => text,
            TextOrString::Plain(text) => text,
        }
    }
}

/// Extract the ordered list of legislator votes from one group's detail
///
/// Output is sorted by display name, then identifier, for deterministic
/// rendering when no caller-driven ordering applies.
pub fn extract_legislator_votes(group_detail: &Value) -> ExtractedVotes {
    let Some(nominal) = locate_nominal(group_detail) else {
        tracing::debug!("Group detail payload has no nominal vote breakdown");
        return ExtractedVotes::default();
    };

    let mut extracted = ExtractedVotes::default();
    for (position, aliases) in BUCKETS {
        for voter in bucket_voters(nominal, aliases) {
            match decode_voter(voter, position) {
                Some(vote) => extracted.votes.push(vote),
                None => extracted.dropped += 1,
            }
        }
    }

    if extracted.dropped > 0 {
        tracing::warn!(
            dropped = extracted.dropped,
            "Dropped voter entries without a resolvable identifier"
        );
    }

    extracted.votes.sort_by_key(LegislatorVote::display_key);
    extracted
}

/// Per-position tallies computed from nominal list lengths
///
/// Used when a payload carries voter lists but no pre-aggregated numbers.
pub(crate) fn nominal_position_counts(group_detail: &Value) -> PositionCounts {
    let mut counts = PositionCounts::default();
    if let Some(nominal) = locate_nominal(group_detail) {
        for (position, aliases) in BUCKETS {
            for _ in bucket_voters(nominal, aliases) {
                counts.increment(position);
            }
        }
    }
    counts
}

/// Locate the nominal breakdown block, trying the known nestings in order
fn locate_nominal(group_detail: &Value) -> Option<&Value> {
    let candidates = [
        group_detail.get("decompteNominatif"),
        group_detail.pointer("/vote/decompteNominatif"),
        group_detail.get("decompte"),
        group_detail.get("votes"),
        Some(group_detail),
    ];

    candidates
        .into_iter()
        .flatten()
        .find(|candidate| has_bucket_data(candidate))
}

/// True when at least one position bucket holds a voter entry
fn has_bucket_data(nominal: &Value) -> bool {
    BUCKETS
        .iter()
        .any(|(_, aliases)| !bucket_voters(nominal, aliases).is_empty())
}

/// Voter entries of one position bucket
///
/// A bucket is usually `{"votant": [...]}`; a single voter arrives without
/// the array wrapper and still counts as one entry.
fn bucket_voters<'a>(nominal: &'a Value, aliases: &[&str]) -> Vec<&'a Value> {
    let Some(bucket) = field(nominal, aliases) else {
        return Vec::new();
    };

    match bucket {
        Value::Array(_) => as_list(bucket),
        Value::Object(map) => match map.get("votant") {
            Some(votant) => as_list(votant),
            // Flat shape: the bucket itself is a single voter entry
            None => vec![bucket],
        },
        _ => Vec::new(),
    }
}

/// Decode one voter entry; `None` means no resolvable identifier
fn decode_voter(voter: &Value, position: VotePosition) -> Option<LegislatorVote> {
    let raw_id = voter_identifier(voter)?;
    let legislator_id = canonical_legislator_id(&raw_id);
    if legislator_id.is_empty() {
        return None;
    }

    Some(LegislatorVote {
        legislator_id,
        first_name: String::new(),
        last_name: String::new(),
        position,
        par_delegation: is_true(voter.get("parDelegation")),
        cause: string_field(voter, &["causePositionVote", "cause"]),
    })
}

/// Identifier fallback chain: `acteurRef` (text-node or plain string),
/// then a generic `id` field. A bare-string entry is its own identifier.
fn voter_identifier(voter: &Value) -> Option<String> {
    if let Some(id) = voter.as_str() {
        let id = id.trim();
        return (!id.is_empty()).then(|| id.to_string());
    }

    ["acteurRef", "id"]
        .iter()
        .filter_map(|name| voter.get(*name))
        .filter_map(|value| serde_json::from_value::<TextOrString>(value.clone()).ok())
        .map(TextOrString::into_inner)
        .map(|id| id.trim().to_string())
        .find(|id| !id.is_empty())
}

/// The delegation flag is set only for boolean `true` or the string `"true"`
fn is_true(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s == "true",
        _ => false,
    }
}

fn string_field(voter: &Value, names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| voter.get(*name))
        .filter_map(|value| serde_json::from_value::<TextOrString>(value.clone()).ok())
        .map(TextOrString::into_inner)
        .map(|s| s.trim().to_string())
        .find(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extracts_all_four_buckets() {
        let detail = json!({
            "decompteNominatif": {
                "pours": {"votant": [{"acteurRef": "PA1"}, {"acteurRef": "PA2"}]},
                "contres": {"votant": {"acteurRef": "PA3"}},
                "abstentions": {"votant": [{"acteurRef": "PA4"}]},
                "nonVotants": {"votant": {"acteurRef": "PA5", "causePositionVote": "PAN"}}
            }
        });

        let extracted = extract_legislator_votes(&detail);
        assert_eq!(extracted.votes.len(), 5);
        assert_eq!(extracted.dropped, 0);

        let by_id = |id: &str| {
            extracted
                .votes
                .iter()
                .find(|v| v.legislator_id == id)
                .expect("vote missing")
        };
        assert_eq!(by_id("PA1").position, VotePosition::For);
        assert_eq!(by_id("PA3").position, VotePosition::Against);
        assert_eq!(by_id("PA4").position, VotePosition::Abstain);
        assert_eq!(by_id("PA5").position, VotePosition::Absent);
        assert_eq!(by_id("PA5").cause.as_deref(), Some("PAN"));
    }

    #[test]
    fn test_identifier_representations_reconcile() {
        // Same legislator referenced three ways across buckets
        let detail = json!({
            "decompteNominatif": {
                "pours": {"votant": {"acteurRef": {"#text": "PA1"}}},
                "contres": {"votant": {"acteurRef": "PA1"}},
                "abstentions": {"votant": {"id": "1"}}
            }
        });

        let extracted = extract_legislator_votes(&detail);
        assert_eq!(extracted.votes.len(), 3);
        assert_eq!(extracted.votes[0].legislator_id, "PA1");
        assert_eq!(extracted.votes[1].legislator_id, "PA1");
        assert_eq!(extracted.votes[2].legislator_id, "PA1");
    }

    #[test]
    fn test_bare_digits_are_canonicalized() {
        let detail = json!({
            "votes": {"pour": {"votant": {"acteurRef": "1234"}}}
        });
        let extracted = extract_legislator_votes(&detail);
        assert_eq!(extracted.votes[0].legislator_id, "PA1234");
    }

    #[test]
    fn test_unidentifiable_voters_dropped_and_counted() {
        let detail = json!({
            "decompteNominatif": {
                "pours": {"votant": [
                    {"acteurRef": "PA1"},
                    {"mandatRef": "PM77"},
                    {"acteurRef": ""}
                ]}
            }
        });

        let extracted = extract_legislator_votes(&detail);
        assert_eq!(extracted.votes.len(), 1);
        assert_eq!(extracted.dropped, 2);
    }

    #[test]
    fn test_delegation_flag_strictness() {
        let detail = json!({
            "decompteNominatif": {
                "pours": {"votant": [
                    {"acteurRef": "PA1", "parDelegation": true},
                    {"acteurRef": "PA2", "parDelegation": "true"},
                    {"acteurRef": "PA3", "parDelegation": "1"},
                    {"acteurRef": "PA4", "parDelegation": false},
                    {"acteurRef": "PA5"}
                ]}
            }
        });

        let extracted = extract_legislator_votes(&detail);
        let flag = |id: &str| {
            extracted
                .votes
                .iter()
                .find(|v| v.legislator_id == id)
                .unwrap()
                .par_delegation
        };
        assert!(flag("PA1"));
        assert!(flag("PA2"));
        assert!(!flag("PA3"));
        assert!(!flag("PA4"));
        assert!(!flag("PA5"));
    }

    #[test]
    fn test_shape_fallback_order() {
        // decompte shape
        let decompte = json!({
            "decompte": {"contre": {"votant": {"acteurRef": "PA1"}}}
        });
        assert_eq!(extract_legislator_votes(&decompte).votes.len(), 1);

        // flat at the group root
        let flat = json!({
            "pour": {"votant": [{"acteurRef": "PA1"}, {"acteurRef": "PA2"}]}
        });
        assert_eq!(extract_legislator_votes(&flat).votes.len(), 2);

        // nothing usable
        assert!(extract_legislator_votes(&json!({})).votes.is_empty());
        assert!(extract_legislator_votes(&json!({"decompteNominatif": {}}))
            .votes
            .is_empty());
    }

    #[test]
    fn test_nominal_position_counts_from_list_lengths() {
        let detail = json!({
            "decompteNominatif": {
                "pours": {"votant": [{"acteurRef": "PA1"}, {"acteurRef": "PA2"}]},
                "contres": {"votant": {"acteurRef": "PA3"}}
            }
        });

        let counts = nominal_position_counts(&detail);
        assert_eq!(counts.in_favor, 2);
        assert_eq!(counts.against, 1);
        assert_eq!(counts.abstain, 0);
        assert_eq!(counts.absent, 0);
    }

    #[test]
    fn test_output_sorted_by_identifier_when_names_empty() {
        let detail = json!({
            "decompteNominatif": {
                "pours": {"votant": [
                    {"acteurRef": "PA30"},
                    {"acteurRef": "PA10"},
                    {"acteurRef": "PA20"}
                ]}
            }
        });

        let extracted = extract_legislator_votes(&detail);
        let ids: Vec<&str> = extracted
            .votes
            .iter()
            .map(|v| v.legislator_id.as_str())
            .collect();
        assert_eq!(ids, vec!["PA10", "PA20", "PA30"]);
    }
}
