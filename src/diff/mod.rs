//! Structural diff
//!
//! Pure functions over decoded values:
//! - `diff_maps` - keyed Added/Removed/Changed entries, ordered by key
//! - `diff_sequences` - common prefix, removed/added middle, common suffix
//! - `diff_states` - diff of two interpreted revisions' flat maps
//!
//! Values compare structurally. References compare by object id and are
//! never followed.

mod map;
mod sequence;

pub use map::diff_maps;
pub use sequence::{diff_sequences, SequenceDiff};

use std::fmt;

use serde::Serialize;

use crate::decode::InterpretedState;
use crate::model::RawState;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffKind {
    Added,
    Removed,
    Changed,
}

impl fmt::Display for DiffKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiffKind::Added => write!(f, "added"),
            DiffKind::Removed => write!(f, "removed"),
            DiffKind::Changed => write!(f, "changed to"),
        }
    }
}

/// Structural refinement of a `Changed` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum NestedDiff {
    Mapping(Vec<DiffEntry>),
    Sequence(SequenceDiff),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffEntry {
    pub kind: DiffKind,
    pub key: RawState,
    pub new_value: Option<RawState>,
    pub old_value: Option<RawState>,
    pub nested: Option<NestedDiff>,
}

impl DiffEntry {
    pub fn added(key: RawState, new_value: RawState) -> Self {
        Self {
            kind: DiffKind::Added,
            key,
            new_value: Some(new_value),
            old_value: None,
            nested: None,
        }
    }

    pub fn removed(key: RawState, old_value: RawState) -> Self {
        Self {
            kind: DiffKind::Removed,
            key,
            new_value: None,
            old_value: Some(old_value),
            nested: None,
        }
    }

    pub fn changed(key: RawState, new_value: RawState, old_value: RawState) -> Self {
        Self {
            kind: DiffKind::Changed,
            key,
            new_value: Some(new_value),
            old_value: Some(old_value),
            nested: None,
        }
    }

    pub fn with_nested(mut self, nested: Option<NestedDiff>) -> Self {
        self.nested = nested;
        self
    }
}

/// Diff of two interpreted revisions, from `old` to `new`.
pub fn diff_states(new: &InterpretedState, old: &InterpretedState) -> Vec<DiffEntry> {
    diff_maps(new.as_flat_map(), old.as_flat_map())
}
