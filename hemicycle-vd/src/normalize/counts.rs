//! Aggregate vote-count extraction
//!
//! Computes the ballot-level `{voters, for, against, abstain}` from a payload
//! of unknown shape by trying the known extraction strategies in priority
//! order; the first non-all-zero result wins. A recognized-but-empty payload
//! yields all zeros, never an error.

use hemicycle_common::model::VoteCounts;
use serde_json::Value;

use super::voters::nominal_position_counts;
use super::{collect_groups, field, field_u32};

type Strategy = (&'static str, fn(&Value) -> VoteCounts);

/// Extraction strategies in fixed priority order
const STRATEGIES: [Strategy; 6] = [
    ("group-nominal-lists", from_group_lists),
    ("synthese-decompte", from_synthese),
    ("flat-fields", from_flat_fields),
    ("mise-au-point", from_mise_au_point),
    ("scrutin-decompte-voix", from_scrutin_decompte_voix),
    ("scrutin-decompte-nominatif", from_scrutin_nominatif),
];

/// Extract aggregate counts from a ballot payload of unknown shape
pub fn extract_vote_counts(payload: &Value) -> VoteCounts {
    for (name, strategy) in STRATEGIES {
        let counts = strategy(payload);
        if !counts.is_zero() {
            tracing::debug!(strategy = name, ?counts, "Vote counts extracted");
            return counts;
        }
    }

    tracing::debug!("No vote-count strategy matched, returning zeros");
    VoteCounts::default()
}

/// "Votants" excludes non-voters but a published figure below the expressed
/// total is inconsistent data; the expressed total is the floor.
fn build(voters: u32, in_favor: u32, against: u32, abstain: u32) -> VoteCounts {
    let expressed = in_favor + against + abstain;
    VoteCounts {
        voters: voters.max(expressed),
        in_favor,
        against,
        abstain,
    }
}

/// Strategy 1: sum the per-group nominal voter lists
fn from_group_lists(payload: &Value) -> VoteCounts {
    let mut in_favor = 0;
    let mut against = 0;
    let mut abstain = 0;

    for (_, group) in collect_groups(payload) {
        let counts = nominal_position_counts(group);
        in_favor += counts.in_favor;
        against += counts.against;
        abstain += counts.abstain;
    }

    build(0, in_favor, against, abstain)
}

/// Strategy 2: pre-aggregated `syntheseVote` block with a nested `decompte`
fn from_synthese(payload: &Value) -> VoteCounts {
    let synthese = field(payload, &["syntheseVote"])
        .or_else(|| payload.pointer("/scrutin/syntheseVote"));
    let Some(synthese) = synthese else {
        return VoteCounts::default();
    };
    let Some(decompte) = field(synthese, &["decompte"]) else {
        return VoteCounts::default();
    };

    build(
        field_u32(synthese, &["nombreVotants", "votants"]),
        field_u32(decompte, &["pour"]),
        field_u32(decompte, &["contre"]),
        field_u32(decompte, &["abstentions", "abstention"]),
    )
}

/// Strategy 3: flat top-level numeric-string fields
fn from_flat_fields(payload: &Value) -> VoteCounts {
    build(
        field_u32(payload, &["nombreVotants", "votants"]),
        field_u32(payload, &["pour"]),
        field_u32(payload, &["contre"]),
        field_u32(payload, &["abstentions", "abstention"]),
    )
}

/// Strategy 4: alternate `miseAuPoint` aggregate block
fn from_mise_au_point(payload: &Value) -> VoteCounts {
    let block = field(payload, &["miseAuPoint"])
        .or_else(|| payload.pointer("/scrutin/miseAuPoint"));
    let Some(block) = block else {
        return VoteCounts::default();
    };

    build(
        field_u32(block, &["nombreVotants", "votants"]),
        field_u32(block, &["pour"]),
        field_u32(block, &["contre"]),
        field_u32(block, &["abstentions", "abstention"]),
    )
}

/// Strategy 5: nested `scrutin.decompteVoix` block
fn from_scrutin_decompte_voix(payload: &Value) -> VoteCounts {
    let Some(scrutin) = payload.get("scrutin") else {
        return VoteCounts::default();
    };
    let Some(decompte) = field(scrutin, &["decompteVoix"]) else {
        return VoteCounts::default();
    };

    build(
        field_u32(scrutin, &["nombreVotants", "votants"]),
        field_u32(decompte, &["pour"]),
        field_u32(decompte, &["contre"]),
        field_u32(decompte, &["abstentions", "abstention"]),
    )
}

/// Strategy 6: nested `scrutin.decompteNominatif`. Counts come from voter
/// list lengths, not a pre-computed figure, so this is the most granular
/// source when present.
fn from_scrutin_nominatif(payload: &Value) -> VoteCounts {
    let root = payload.get("scrutin").unwrap_or(payload);
    let counts = nominal_position_counts(root);
    build(0, counts.in_favor, counts.against, counts.abstain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_object_yields_zeros() {
        let counts = extract_vote_counts(&json!({}));
        assert!(counts.is_zero());
    }

    #[test]
    fn test_group_nominal_lists_summed() {
        let payload = json!({
            "groupes": [
                {
                    "organeRef": "PO1",
                    "vote": {"decompteNominatif": {
                        "pours": {"votant": [{"acteurRef": "PA1"}, {"acteurRef": "PA2"}]},
                        "contres": {"votant": {"acteurRef": "PA3"}}
                    }}
                },
                {
                    "organeRef": "PO2",
                    "vote": {"decompteNominatif": {
                        "abstentions": {"votant": {"acteurRef": "PA4"}}
                    }}
                }
            ]
        });

        let counts = extract_vote_counts(&payload);
        assert_eq!(counts.in_favor, 2);
        assert_eq!(counts.against, 1);
        assert_eq!(counts.abstain, 1);
        assert_eq!(counts.voters, 4);
    }

    #[test]
    fn test_synthese_decompte_with_numeric_strings() {
        let payload = json!({
            "syntheseVote": {
                "nombreVotants": "543",
                "decompte": {"pour": "250", "contre": "200", "abstentions": "93"}
            }
        });

        let counts = extract_vote_counts(&payload);
        assert_eq!(
            counts,
            VoteCounts {
                voters: 543,
                in_favor: 250,
                against: 200,
                abstain: 93
            }
        );
        assert!(counts.expressed() <= counts.voters);
    }

    #[test]
    fn test_flat_fields() {
        let payload = json!({"nombreVotants": 80, "pour": 50, "contre": 25, "abstention": 5});
        let counts = extract_vote_counts(&payload);
        assert_eq!(counts.voters, 80);
        assert_eq!(counts.in_favor, 50);
    }

    #[test]
    fn test_mise_au_point_block() {
        let payload = json!({
            "miseAuPoint": {"pour": "3", "contre": "1", "abstentions": "0"}
        });
        let counts = extract_vote_counts(&payload);
        assert_eq!(counts.in_favor, 3);
        assert_eq!(counts.against, 1);
        assert_eq!(counts.voters, 4);
    }

    #[test]
    fn test_scrutin_decompte_voix() {
        let payload = json!({
            "scrutin": {
                "nombreVotants": "100",
                "decompteVoix": {"pour": "60", "contre": "30", "abstentions": "10"}
            }
        });
        let counts = extract_vote_counts(&payload);
        assert_eq!(
            counts,
            VoteCounts {
                voters: 100,
                in_favor: 60,
                against: 30,
                abstain: 10
            }
        );
    }

    #[test]
    fn test_scrutin_nominatif_counts_single_object_as_one() {
        let payload = json!({
            "scrutin": {
                "decompteNominatif": {
                    "pour": {"votant": [{"acteurRef": "PA1"}, {"acteurRef": "PA2"}]},
                    "contre": {"votant": {"acteurRef": "PA3"}}
                }
            }
        });

        let counts = extract_vote_counts(&payload);
        assert_eq!(
            counts,
            VoteCounts {
                voters: 3,
                in_favor: 2,
                against: 1,
                abstain: 0
            }
        );
    }

    #[test]
    fn test_strategy_priority_synthese_beats_flat() {
        let payload = json!({
            "syntheseVote": {
                "nombreVotants": "10",
                "decompte": {"pour": "6", "contre": "4", "abstentions": "0"}
            },
            "pour": "999", "contre": "999", "nombreVotants": "1998"
        });

        let counts = extract_vote_counts(&payload);
        assert_eq!(counts.in_favor, 6);
        assert_eq!(counts.voters, 10);
    }

    #[test]
    fn test_inconsistent_voters_figure_is_floored_by_expressed() {
        let payload = json!({"nombreVotants": 2, "pour": 5, "contre": 3, "abstention": 1});
        let counts = extract_vote_counts(&payload);
        assert_eq!(counts.voters, 9);
        assert!(counts.expressed() <= counts.voters);
    }

    #[test]
    fn test_unrecognized_shape_yields_zeros() {
        let payload = json!({"foo": {"bar": [1, 2, 3]}, "baz": "quux"});
        assert!(extract_vote_counts(&payload).is_zero());
    }
}
