//! Merge precedence and suggestion diffing.
//!
//! A lookup fans out to several providers; each succeeds or fails on
//! its own. Folding their field values into one suggestion map follows
//! a fixed precedence, and the APPLY_METADATA step shows the user the
//! diff between that map and what they already entered.

use serde_json::Value;
use shelfward_contract::Attributes;
use shelfward_protocol::LookupResponse;

/// One suggested change: the provider value for `key` differs from
/// (or is absent in) the accumulated attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct DiffEntry {
    pub key: String,
    pub current: Option<Value>,
    pub suggested: Value,
}

/// Fold a lookup response into one suggestion map.
///
/// Precedence: a server-computed merge is taken as-is when present.
/// Otherwise, if the response designates a "best" provider, its values
/// seed the map and the remaining providers only fill keys the best
/// one did not supply. With no designation, providers merge in
/// response order and later providers overwrite earlier ones.
/// Failed providers contribute nothing.
pub fn merge_results(response: &LookupResponse) -> Attributes {
    if let Some(merged) = &response.merged_attributes {
        return merged.clone();
    }

    let succeeded = response.results.iter().filter(|r| r.error.is_none());

    if let Some(best_key) = &response.best {
        let mut merged: Attributes = response
            .results
            .iter()
            .find(|r| &r.provider_key == best_key && r.error.is_none())
            .map(|r| r.field_values.clone())
            .unwrap_or_default();
        for result in succeeded {
            if &result.provider_key == best_key {
                continue;
            }
            for (key, value) in &result.field_values {
                merged.entry(key.clone()).or_insert_with(|| value.clone());
            }
        }
        return merged;
    }

    let mut merged = Attributes::new();
    for result in succeeded {
        for (key, value) in &result.field_values {
            merged.insert(key.clone(), value.clone());
        }
    }
    merged
}

/// Entries of `suggested` that differ from `current`, including keys
/// `current` lacks entirely.
///
/// Comparison is structural (`Value` equality). The system this engine
/// replaces compared objects and arrays by reference and so surfaced
/// structurally equal copies as diffs; owned values have no identity
/// to compare, so that quirk does not carry over.
pub fn diff(current: &Attributes, suggested: &Attributes) -> Vec<DiffEntry> {
    suggested
        .iter()
        .filter(|(key, value)| current.get(*key) != Some(value))
        .map(|(key, value)| DiffEntry {
            key: key.clone(),
            current: current.get(key).cloned(),
            suggested: value.clone(),
        })
        .collect()
}
