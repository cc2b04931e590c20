//! Keyed diff of two mappings

use std::collections::BTreeMap;

use crate::model::RawState;

use super::{diff_sequences, DiffEntry, NestedDiff};

/// Differences from `old` to `new`, ordered by key.
///
/// Changed entries whose values are both mappings or both sequences carry a
/// nested diff in addition to the flat values.
pub fn diff_maps(
    new: &BTreeMap<RawState, RawState>,
    old: &BTreeMap<RawState, RawState>,
) -> Vec<DiffEntry> {
    let mut entries = Vec::new();

    for (key, new_value) in new {
        match old.get(key) {
            None => entries.push(DiffEntry::added(key.clone(), new_value.clone())),
            Some(old_value) if old_value != new_value => {
                let nested = nested_diff(new_value, old_value);
                entries.push(DiffEntry::changed(key.clone(), new_value.clone(), old_value.clone()).with_nested(nested));
            }
            Some(_) => {}
        }
    }
    for (key, old_value) in old {
        if !new.contains_key(key) {
            entries.push(DiffEntry::removed(key.clone(), old_value.clone()));
        }
    }

    // Keys are unique across both passes.
    entries.sort_by(|a, b| a.key.cmp(&b.key));
    entries
}

fn nested_diff(new: &RawState, old: &RawState) -> Option<NestedDiff> {
    match (new, old) {
        (RawState::Mapping(new), RawState::Mapping(old)) => Some(NestedDiff::Mapping(diff_maps(new, old))),
        (RawState::Sequence(new), RawState::Sequence(old)) => {
            Some(NestedDiff::Sequence(diff_sequences(new, old)))
        }
        _ => None,
    }
}
