//! UnitOfWork - writes staged by one caller
//!
//! Each rollback owns its unit of work. Nothing in it is visible to other
//! callers until the store commits it, and committing validates that every
//! object is still at the head the write was based on.

use std::collections::BTreeMap;

use crate::errors::{HistoryError, HistoryResult};
use crate::model::{ObjectId, RawState, RevisionMarker};

/// One staged replacement of an object's state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteIntent {
    pub state: RawState,
    /// Newest revision of the object when the write was staged.
    pub expected_head: RevisionMarker,
    /// Only changed intents are persisted on commit.
    pub changed: bool,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UnitOfWork {
    writes: BTreeMap<ObjectId, WriteIntent>,
}

impl UnitOfWork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stages `state` for `oid`, replacing any earlier intent for it.
    pub fn stage(&mut self, oid: ObjectId, state: RawState, expected_head: RevisionMarker) {
        self.writes.insert(
            oid,
            WriteIntent {
                state,
                expected_head,
                changed: false,
            },
        );
    }

    /// Flags a staged object for persistence.
    pub fn mark_changed(&mut self, oid: ObjectId) -> HistoryResult<()> {
        match self.writes.get_mut(&oid) {
            Some(intent) => {
                intent.changed = true;
                Ok(())
            }
            None => Err(HistoryError::Internal(format!(
                "object {} was marked changed without a staged state",
                oid
            ))),
        }
    }

    pub fn intent(&self, oid: ObjectId) -> Option<&WriteIntent> {
        self.writes.get(&oid)
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    /// True when commit would write something.
    pub fn has_changes(&self) -> bool {
        self.writes.values().any(|w| w.changed)
    }

    /// Changed intents in object order; unmarked ones are dropped.
    pub fn into_changed(self) -> Vec<(ObjectId, WriteIntent)> {
        self.writes.into_iter().filter(|(_, w)| w.changed).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_changed_intents_are_kept() {
        let mut unit = UnitOfWork::new();
        unit.stage(ObjectId::new(2), RawState::int(2), RevisionMarker::new(5));
        unit.stage(ObjectId::new(1), RawState::int(1), RevisionMarker::new(5));
        assert!(!unit.has_changes());

        unit.mark_changed(ObjectId::new(2)).unwrap();
        assert!(unit.has_changes());

        let changed = unit.into_changed();
        assert_eq!(changed.len(), 1);
        assert_eq!(changed[0].0, ObjectId::new(2));
        assert_eq!(changed[0].1.expected_head, RevisionMarker::new(5));
    }

    #[test]
    fn test_mark_without_stage_is_error() {
        let mut unit = UnitOfWork::new();
        let err = unit.mark_changed(ObjectId::new(7)).unwrap_err();
        assert_eq!(err.code(), "OBJSCOPE_INTERNAL");
    }
}
