//! Prefix/suffix split of two sequences

use serde::Serialize;

use crate::model::RawState;

/// Three-way split of two sequences around their common prefix and suffix.
///
/// `prefix + removed + suffix` is the old sequence and
/// `prefix + added + suffix` is the new one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SequenceDiff {
    pub prefix: Vec<RawState>,
    pub removed: Vec<RawState>,
    pub added: Vec<RawState>,
    pub suffix: Vec<RawState>,
}

impl SequenceDiff {
    pub fn is_unchanged(&self) -> bool {
        self.removed.is_empty() && self.added.is_empty()
    }

    pub fn reconstruct_old(&self) -> Vec<RawState> {
        [&self.prefix[..], &self.removed[..], &self.suffix[..]].concat()
    }

    pub fn reconstruct_new(&self) -> Vec<RawState> {
        [&self.prefix[..], &self.added[..], &self.suffix[..]].concat()
    }
}

/// Splits `new` and `old` into common prefix, removed middle, added middle
/// and common suffix.
///
/// The suffix scan never reaches into the prefix, so repeated elements are
/// not counted twice.
pub fn diff_sequences(new: &[RawState], old: &[RawState]) -> SequenceDiff {
    let prefix_len = new
        .iter()
        .zip(old.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let new_rest = &new[prefix_len..];
    let old_rest = &old[prefix_len..];
    let suffix_len = new_rest
        .iter()
        .rev()
        .zip(old_rest.iter().rev())
        .take_while(|(a, b)| a == b)
        .count();

    SequenceDiff {
        prefix: new[..prefix_len].to_vec(),
        removed: old_rest[..old_rest.len() - suffix_len].to_vec(),
        added: new_rest[..new_rest.len() - suffix_len].to_vec(),
        suffix: new_rest[new_rest.len() - suffix_len..].to_vec(),
    }
}
