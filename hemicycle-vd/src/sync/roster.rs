//! Roster wire decoding
//!
//! The organs and actors listings arrive in export-style nestings
//! (`export.acteurs.acteur`, `{"organe": [...]}` wrappers) or as plain
//! arrays, with the usual text-node identifier variants. Everything here
//! decodes those shapes into `LegislatorRow`s for the sync job and into a
//! single identity for the cache's remote tier.

use hemicycle_common::db::legislators::LegislatorRow;
use hemicycle_common::model::{canonical_legislator_id, LegislatorIdentity};
use serde_json::Value;
use std::collections::HashMap;

use crate::normalize::{as_list, field, field_str};

/// Organ metadata kept from the organs listing
#[derive(Debug, Clone, Default)]
pub(crate) struct OrganeInfo {
    pub code_type: Option<String>,
    pub libelle: Option<String>,
}

/// Political-group organ type code in the upstream nomenclature
const GROUP_TYPE: &str = "GP";

/// Index the organs listing by organ identifier
pub(crate) fn organe_index(payload: &Value) -> HashMap<String, OrganeInfo> {
    let mut index = HashMap::new();
    for organe in collection(payload, &["organes"], "organe") {
        let Some(id) = field_str(organe, &["uid", "id"]) else {
            continue;
        };
        index.insert(
            id,
            OrganeInfo {
                code_type: field_str(organe, &["codeType"]),
                libelle: field_str(organe, &["libelle", "libelleAbrege"]),
            },
        );
    }
    index
}

/// Build roster rows from the actors listing, cross-referencing each
/// actor's group mandate against the organ index
///
/// Unusable actor records (no identifier, no name) are skipped and reported
/// so the caller can account for the loss.
pub(crate) fn build_roster(
    payload: &Value,
    legislature: u32,
    organes: &HashMap<String, OrganeInfo>,
) -> (Vec<LegislatorRow>, Vec<String>) {
    let mut rows = Vec::new();
    let mut errors = Vec::new();

    for (index, acteur) in collection(payload, &["acteurs"], "acteur").iter().enumerate() {
        match acteur_row(acteur, legislature, organes) {
            Some(row) => rows.push(row),
            None => errors.push(format!("Unusable actor record at index {}", index)),
        }
    }

    (rows, errors)
}

/// Decode one actor record into a roster row
pub(crate) fn acteur_row(
    acteur: &Value,
    legislature: u32,
    organes: &HashMap<String, OrganeInfo>,
) -> Option<LegislatorRow> {
    let acteur = container(acteur);
    let id = field_str(acteur, &["uid", "id", "acteurRef"]).map(|s| canonical_legislator_id(&s))?;
    if id.is_empty() {
        return None;
    }

    let (first_name, last_name) = names(acteur);
    if first_name.is_empty() && last_name.is_empty() {
        return None;
    }

    let group_id = group_ref(acteur, organes);
    let group_name = group_id
        .as_deref()
        .and_then(|gid| organes.get(gid))
        .and_then(|info| info.libelle.clone());

    Some(LegislatorRow {
        legislator_id: id,
        legislature,
        first_name,
        last_name,
        profession: profession(acteur),
        political_group: group_name,
        political_group_id: group_id,
    })
}

/// Decode a single-actor payload into a cache identity
///
/// Returns `None` unless both name parts are present; an actor record
/// without a usable name does not resolve the entry.
pub(crate) fn acteur_identity(payload: &Value, fallback_id: &str) -> Option<LegislatorIdentity> {
    let acteur = container(payload);
    let id = field_str(acteur, &["uid", "id", "acteurRef"])
        .map(|s| canonical_legislator_id(&s))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| fallback_id.to_string());

    let (first_name, last_name) = names(acteur);
    if first_name.is_empty() || last_name.is_empty() {
        return None;
    }

    let group_id = group_ref(acteur, &HashMap::new());
    Some(LegislatorIdentity {
        legislator_id: id,
        first_name,
        last_name,
        profession: profession(acteur),
        political_group: None,
        political_group_id: group_id,
        fetched_at: chrono::Utc::now(),
    })
}

/// Unwrap the `{"acteur": ...}` container of single-actor payloads
fn container(payload: &Value) -> &Value {
    payload.get("acteur").unwrap_or(payload)
}

fn names(acteur: &Value) -> (String, String) {
    let ident = acteur
        .pointer("/etatCivil/ident")
        .unwrap_or(acteur);
    (
        field_str(ident, &["prenom"]).unwrap_or_default(),
        field_str(ident, &["nom"]).unwrap_or_default(),
    )
}

fn profession(acteur: &Value) -> Option<String> {
    acteur
        .pointer("/profession/libelleCourant")
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| field_str(acteur, &["profession"]))
}

/// Current political-group membership from the actor's mandates
///
/// A mandate counts when its own organ type says `GP`, or when the
/// referenced organ is indexed as a group.
fn group_ref(acteur: &Value, organes: &HashMap<String, OrganeInfo>) -> Option<String> {
    let mandates = match field(acteur, &["mandats"]) {
        Some(block) => match block.get("mandat") {
            Some(inner) => as_list(inner),
            None => as_list(block),
        },
        None => Vec::new(),
    };

    for mandate in mandates {
        let organe_ref = mandate
            .pointer("/organes/organeRef")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| field_str(mandate, &["organeRef"]));
        let Some(organe_ref) = organe_ref else {
            continue;
        };

        let mandate_is_group = field_str(mandate, &["typeOrgane"]).as_deref() == Some(GROUP_TYPE);
        let organ_is_group = organes
            .get(&organe_ref)
            .and_then(|info| info.code_type.as_deref())
            == Some(GROUP_TYPE);

        if mandate_is_group || organ_is_group {
            return Some(organe_ref);
        }
    }

    None
}

/// Locate a listing that may be nested as `{key: [...]}`, `{key: {item:
/// [...]}}`, `export.{key}.{item}`, or a plain array
fn collection<'a>(payload: &'a Value, keys: &[&str], item: &str) -> Vec<&'a Value> {
    let block = field(payload, keys)
        .or_else(|| {
            keys.iter()
                .find_map(|key| payload.pointer(&format!("/export/{}", key)))
        });

    match block {
        Some(block) => match block.get(item) {
            Some(inner) => as_list(inner),
            None => match block {
                Value::Array(_) => as_list(block),
                _ => Vec::new(),
            },
        },
        None => match payload {
            Value::Array(_) => as_list(payload),
            _ => Vec::new(),
        },
    }
}
