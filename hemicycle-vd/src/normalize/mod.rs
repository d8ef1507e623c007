//! Vote-data normalization layer
//!
//! The open-data API has shipped at least six incompatible ballot payload
//! shapes over time. Everything in this module is a pure function over
//! `serde_json::Value` that decodes whatever arrived into the canonical model
//! exactly once, at the API boundary. Downstream code (cache, sync, HTTP
//! handlers) never sniffs payload shapes itself.
//!
//! Shape mismatches are not errors here: every function degrades to a
//! documented zero/empty default and logs a diagnostic instead.

pub mod counts;
pub mod groups;
pub mod position;
pub mod voters;

pub use counts::extract_vote_counts;
pub use groups::build_group_rollup;
pub use position::normalize_position;
pub use voters::{extract_legislator_votes, ExtractedVotes};

use hemicycle_common::model::BallotSummary;
use serde_json::Value;

/// Build the canonical ballot summary from a raw ballot-detail payload
///
/// `ballot_id` and `legislature` come from the request path and win over
/// whatever the payload claims, so a summary always carries a usable key.
pub fn decode_ballot_summary(payload: &Value, legislature: u32, ballot_id: &str) -> BallotSummary {
    let root = payload.get("scrutin").unwrap_or(payload);

    let id = field_str(root, &["numero", "id"]).unwrap_or_else(|| ballot_id.to_string());
    let date = field_str(root, &["dateScrutin", "date"]);
    let title = field_str(root, &["titre", "title"]).unwrap_or_default();
    let description = root
        .get("objet")
        .and_then(|objet| {
            objet
                .as_str()
                .map(str::to_string)
                .or_else(|| field_str(objet, &["libelle"]))
        })
        .or_else(|| field_str(root, &["demandeur"]))
        .unwrap_or_default();

    BallotSummary {
        id,
        legislature,
        date,
        title,
        description,
        counts: extract_vote_counts(payload),
    }
}

/// Read a numeric field that may arrive as a JSON number or a numeric string
pub(crate) fn as_u32(value: &Value) -> u32 {
    match value {
        Value::Number(n) => n.as_u64().unwrap_or(0).min(u32::MAX as u64) as u32,
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

/// First present, non-null field among `names`
pub(crate) fn field<'a>(value: &'a Value, names: &[&str]) -> Option<&'a Value> {
    names
        .iter()
        .filter_map(|name| value.get(name))
        .find(|v| !v.is_null())
}

/// Numeric field lookup with the string/number tolerance of [`as_u32`]
pub(crate) fn field_u32(value: &Value, names: &[&str]) -> u32 {
    field(value, names).map(as_u32).unwrap_or(0)
}

/// String field lookup, unwrapping the `{"#text": ...}` node variant
pub(crate) fn field_str(value: &Value, names: &[&str]) -> Option<String> {
    let found = field(value, names)?;
    let text = found
        .as_str()
        .or_else(|| found.get("#text").and_then(Value::as_str))?;
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Treat a single object as a one-element list
///
/// The wire drops the array wrapper when a collection has exactly one entry;
/// a single entry still counts as 1 everywhere.
pub(crate) fn as_list(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().collect(),
        Value::Object(_) => vec![value],
        _ => Vec::new(),
    }
}

/// Locate the political-group collection and yield `(map_key, group)` pairs
///
/// Handles the three observed collection shapes: an array of group objects,
/// a `{"groupe": [...]}` wrapper, and a map keyed by group id. Absence of a
/// usable collection yields an empty list.
pub(crate) fn collect_groups(payload: &Value) -> Vec<(Option<String>, &Value)> {
    let collection = field(payload, &["groupes"])
        .or_else(|| payload.pointer("/scrutin/ventilationVotes/organe/groupes/groupe"))
        .or_else(|| payload.pointer("/ventilationVotes/organe/groupes/groupe"))
        .or_else(|| payload.pointer("/scrutin/ventilationVotes/organe/groupes"));

    let Some(collection) = collection else {
        return Vec::new();
    };

    match collection {
        Value::Array(items) => items.iter().map(|g| (None, g)).collect(),
        Value::Object(map) => {
            // A wrapper object carries the actual list under "groupe";
            // otherwise the object itself is the id-keyed map.
            if let Some(inner) = map.get("groupe") {
                as_list(inner).into_iter().map(|g| (None, g)).collect()
            } else {
                map.iter()
                    .map(|(id, g)| (Some(id.clone()), g))
                    .collect()
            }
        }
        _ => Vec::new(),
    }
}
