//! RollbackEngine - restores live state from history

use std::collections::HashSet;

use serde::Serialize;

use crate::decode::{chained, DecodeLimits};
use crate::errors::{HistoryError, HistoryResult};
use crate::history::RevisionHistory;
use crate::model::{ObjectId, ObjectKind, RawState, RevisionMarker};
use crate::observability::{log_event_with_fields, Event, ObservationScope};
use crate::store::{UnitOfWork, WritableStore};

/// Objects touched by one rollback.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RollbackOutcome {
    /// Objects whose live state was replaced, target first.
    pub restored: Vec<ObjectId>,
    /// Objects already matching the target revision.
    pub unchanged: Vec<ObjectId>,
}

impl RollbackOutcome {
    pub fn is_noop(&self) -> bool {
        self.restored.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RollbackEngine {
    limits: DecodeLimits,
}

impl RollbackEngine {
    pub fn new(limits: DecodeLimits) -> Self {
        Self { limits }
    }

    /// Replaces the live state of `oid`, and of every leaf of its chain when
    /// it is a chained map, with the state at or before `target`.
    ///
    /// Changes are only staged in `unit`, each with the head it was based
    /// on; the caller commits or aborts them. The first failure stops the
    /// walk and is returned.
    pub fn rollback<S: WritableStore>(
        &self,
        store: &S,
        unit: &mut UnitOfWork,
        oid: ObjectId,
        target: RevisionMarker,
    ) -> HistoryResult<RollbackOutcome> {
        let scope = ObservationScope::new(
            "ROLLBACK",
            vec![("oid", oid.to_string()), ("target", target.to_string())],
        );

        match self.run(store, unit, oid, target) {
            Ok(outcome) => {
                let restored = outcome.restored.len().to_string();
                scope.complete(&[("restored", restored.as_str())]);
                Ok(outcome)
            }
            Err(err) => {
                scope.fail(&err.to_string());
                Err(err)
            }
        }
    }

    fn run<S: WritableStore>(
        &self,
        store: &S,
        unit: &mut UnitOfWork,
        oid: ObjectId,
        target: RevisionMarker,
    ) -> HistoryResult<RollbackOutcome> {
        let mut outcome = RollbackOutcome::default();
        let old = self.restore_one(store, unit, oid, target, &mut outcome)?;

        if store.kind(oid)? != ObjectKind::CHAINED_MAP {
            return Ok(outcome);
        }

        // Walk the chain as it was at the target, from the snapshot read above.
        let mut cursor = chained::next_link(&old)?;
        let mut visited = HashSet::new();
        while let Some(leaf) = cursor {
            if !visited.insert(leaf) {
                return Err(HistoryError::decode(format!(
                    "chain of object {} loops back to leaf {}",
                    oid, leaf
                )));
            }
            if visited.len() > self.limits.max_chain_length {
                return Err(HistoryError::decode(format!(
                    "chain of object {} exceeds {} leaves",
                    oid, self.limits.max_chain_length
                )));
            }
            let leaf_old = self.restore_one(store, unit, leaf, target, &mut outcome)?;
            cursor = chained::next_link(&leaf_old)?;
        }

        Ok(outcome)
    }

    /// Restores one object and returns its state at `target`.
    fn restore_one<S: WritableStore>(
        &self,
        store: &S,
        unit: &mut UnitOfWork,
        oid: ObjectId,
        target: RevisionMarker,
        outcome: &mut RollbackOutcome,
    ) -> HistoryResult<RawState> {
        let history = RevisionHistory::new(store, oid, self.limits.history_size_cap);
        let old = history.rollback_candidate(Some(target))?;
        let head = history.resolve(None)?.marker;
        let current = history.rollback_candidate(None)?;

        let oid_field = oid.to_string();
        if old == current {
            log_event_with_fields(Event::RollbackNoop, &[("oid", oid_field.as_str())]);
            outcome.unchanged.push(oid);
            return Ok(old);
        }

        // Commit refuses the write if the object moves past `head`.
        store.apply_state(unit, oid, old.clone(), head)?;
        store.mark_changed(unit, oid)?;

        let target_field = target.to_string();
        log_event_with_fields(
            Event::RollbackApplied,
            &[("oid", oid_field.as_str()), ("target", target_field.as_str())],
        );
        outcome.restored.push(oid);
        Ok(old)
    }
}
