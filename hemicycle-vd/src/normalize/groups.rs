//! Political-group roll-up construction
//!
//! Builds the map from group identifier to group record (name, majority
//! position, per-position tallies) out of a ballot payload. The group
//! collection arrives either as an array of group objects or as a map keyed
//! by group id; both shapes produce identical roll-ups.

use hemicycle_common::model::{GroupVoteDetail, PositionCounts};
use serde_json::Value;
use std::collections::BTreeMap;

use super::position::normalize_position;
use super::voters::nominal_position_counts;
use super::{collect_groups, field, field_str, field_u32};

/// Build the group roll-up map from a ballot payload
///
/// Absence of a usable group collection yields an empty map. Entries without
/// any identifier cannot be keyed and are skipped with a diagnostic.
pub fn build_group_rollup(payload: &Value) -> BTreeMap<String, GroupVoteDetail> {
    let mut rollup = BTreeMap::new();

    for (map_key, group) in collect_groups(payload) {
        let id = map_key.or_else(|| field_str(group, &["organeRef", "groupeRef", "id"]));
        let Some(id) = id else {
            tracing::debug!("Skipping group entry without an identifier");
            continue;
        };

        let vote_block = field(group, &["vote"]).unwrap_or(group);
        let majority = field_str(vote_block, &["positionMajoritaire", "position"])
            .unwrap_or_default();

        let mut counts = decompte_counts(vote_block);
        if counts.is_zero() {
            // No pre-aggregated numbers; fall back to nominal list lengths
            counts = nominal_position_counts(group);
        }

        rollup.insert(
            id.clone(),
            GroupVoteDetail {
                name: group_name(group, &id),
                id,
                majority_position: normalize_position(&majority),
                counts,
                votes: None,
            },
        );
    }

    rollup
}

/// Name resolution order: explicit label, full name, short name, then a
/// synthesized fallback. Never empty.
fn group_name(group: &Value, id: &str) -> String {
    field_str(group, &["libelle", "nomComplet", "libelleAbrege"])
        .unwrap_or_else(|| format!("Groupe {}", id))
}

/// Per-position tallies from a pre-aggregated `decompteVoix`/`decompte` block
fn decompte_counts(vote_block: &Value) -> PositionCounts {
    let Some(decompte) = field(vote_block, &["decompteVoix", "decompte"]) else {
        return PositionCounts::default();
    };

    PositionCounts {
        in_favor: field_u32(decompte, &["pour"]),
        against: field_u32(decompte, &["contre"]),
        abstain: field_u32(decompte, &["abstentions", "abstention"]),
        absent: field_u32(decompte, &["nonVotants", "nonVotant"]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hemicycle_common::model::VotePosition;
    use serde_json::json;

    fn array_payload() -> Value {
        json!({
            "groupes": [
                {
                    "organeRef": "PO800490",
                    "libelle": "Groupe Renaissance",
                    "vote": {
                        "positionMajoritaire": "pour",
                        "decompteVoix": {"pour": "150", "contre": "2", "abstentions": "3", "nonVotants": "10"}
                    }
                },
                {
                    "organeRef": "PO800538",
                    "libelle": "Groupe Démocrate",
                    "vote": {
                        "positionMajoritaire": "contre",
                        "decompteVoix": {"pour": "1", "contre": "40", "abstentions": "0", "nonVotants": "2"}
                    }
                }
            ]
        })
    }

    #[test]
    fn test_array_shaped_collection() {
        let rollup = build_group_rollup(&array_payload());
        assert_eq!(rollup.len(), 2);

        let renaissance = &rollup["PO800490"];
        assert_eq!(renaissance.name, "Groupe Renaissance");
        assert_eq!(renaissance.majority_position, VotePosition::For);
        assert_eq!(renaissance.counts.in_favor, 150);
        assert_eq!(renaissance.counts.absent, 10);

        let democrate = &rollup["PO800538"];
        assert_eq!(democrate.majority_position, VotePosition::Against);
        assert_eq!(democrate.counts.against, 40);
    }

    #[test]
    fn test_map_shape_equivalent_to_array_shape() {
        // Same data, map keyed by group id instead of an array
        let map_payload = json!({
            "groupes": {
                "PO800490": {
                    "libelle": "Groupe Renaissance",
                    "vote": {
                        "positionMajoritaire": "pour",
                        "decompteVoix": {"pour": "150", "contre": "2", "abstentions": "3", "nonVotants": "10"}
                    }
                },
                "PO800538": {
                    "libelle": "Groupe Démocrate",
                    "vote": {
                        "positionMajoritaire": "contre",
                        "decompteVoix": {"pour": "1", "contre": "40", "abstentions": "0", "nonVotants": "2"}
                    }
                }
            }
        });

        let from_array = build_group_rollup(&array_payload());
        let from_map = build_group_rollup(&map_payload);

        assert_eq!(from_array.len(), from_map.len());
        for (id, expected) in &from_array {
            let actual = &from_map[id];
            assert_eq!(actual.name, expected.name);
            assert_eq!(actual.majority_position, expected.majority_position);
            assert_eq!(actual.counts, expected.counts);
        }
    }

    #[test]
    fn test_groupe_wrapper_collection() {
        let payload = json!({
            "scrutin": {
                "ventilationVotes": {"organe": {"groupes": {"groupe": [
                    {
                        "organeRef": "PO1",
                        "vote": {
                            "positionMajoritaire": "abstention",
                            "decompteVoix": {"pour": "0", "contre": "0", "abstentions": "12"}
                        }
                    }
                ]}}}
            }
        });

        let rollup = build_group_rollup(&payload);
        assert_eq!(rollup.len(), 1);
        assert_eq!(rollup["PO1"].majority_position, VotePosition::Abstain);
        assert_eq!(rollup["PO1"].counts.abstain, 12);
    }

    #[test]
    fn test_name_fallback_chain() {
        let payload = json!({
            "groupes": [
                {"organeRef": "PO1", "nomComplet": "Groupe Socialistes et apparentés"},
                {"organeRef": "PO2", "libelleAbrege": "LFI-NFP"},
                {"organeRef": "PO3"}
            ]
        });

        let rollup = build_group_rollup(&payload);
        assert_eq!(rollup["PO1"].name, "Groupe Socialistes et apparentés");
        assert_eq!(rollup["PO2"].name, "LFI-NFP");
        assert_eq!(rollup["PO3"].name, "Groupe PO3");
    }

    #[test]
    fn test_nominal_lists_fallback_when_no_decompte() {
        let payload = json!({
            "groupes": [{
                "organeRef": "PO1",
                "vote": {
                    "positionMajoritaire": "pour",
                    "decompteNominatif": {
                        "pours": {"votant": [{"acteurRef": "PA1"}, {"acteurRef": "PA2"}]},
                        "nonVotants": {"votant": {"acteurRef": "PA3"}}
                    }
                }
            }]
        });

        let rollup = build_group_rollup(&payload);
        assert_eq!(rollup["PO1"].counts.in_favor, 2);
        assert_eq!(rollup["PO1"].counts.absent, 1);
    }

    #[test]
    fn test_no_collection_yields_empty_map() {
        assert!(build_group_rollup(&json!({})).is_empty());
        assert!(build_group_rollup(&json!({"scrutin": {"numero": "1"}})).is_empty());
    }

    #[test]
    fn test_group_without_identifier_skipped() {
        let payload = json!({
            "groupes": [
                {"libelle": "Sans identifiant"},
                {"organeRef": "PO1", "libelle": "Valide"}
            ]
        });

        let rollup = build_group_rollup(&payload);
        assert_eq!(rollup.len(), 1);
        assert!(rollup.contains_key("PO1"));
    }
}
