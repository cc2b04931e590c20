//! Storage interface consumed by the inspector
//!
//! The inspector never reimplements the storage engine. It only needs:
//! - per-object history and raw-state loading (`ObjectStore`)
//! - live-state replacement for rollback, staged in a caller-owned
//!   `UnitOfWork` (`WritableStore`)
//! - committing or discarding a unit of work (`TransactionalStore`)
//! - store-wide marker listing for paging (`IterableStore`)
//!
//! All methods may block on I/O. Implementations must be safe to share
//! between worker threads; concurrent units of work never see each other's
//! staged writes.

mod fixture;
mod memory;
mod unit_of_work;

pub use fixture::{FixtureObject, FixtureTransaction, StoreFixture};
pub use memory::MemoryStore;
pub use unit_of_work::{UnitOfWork, WriteIntent};

use crate::errors::HistoryResult;
use crate::model::{ObjectId, ObjectKind, RawState, Revision, RevisionMarker, TransactionMeta, TransactionRecord};

/// Read access to versioned objects.
pub trait ObjectStore: Send + Sync {
    /// Declared kind of an object.
    ///
    /// Unknown objects report `NotFoundAtRevision` with no marker.
    fn kind(&self, oid: ObjectId) -> HistoryResult<ObjectKind>;

    /// Up to `size` revisions of an object, in either marker order.
    fn history(&self, oid: ObjectId, size: u64) -> HistoryResult<Vec<Revision>>;

    /// Payload of the revision written by exactly `marker`.
    fn load_state(&self, oid: ObjectId, marker: RevisionMarker) -> HistoryResult<RawState>;
}

/// Live-state mutation, used only by rollback.
pub trait WritableStore: ObjectStore {
    /// Stages `state` as the new live state of an object in `unit`.
    ///
    /// `expected_head` is the newest revision the caller read; commit fails
    /// if the object moved past it.
    fn apply_state(
        &self,
        unit: &mut UnitOfWork,
        oid: ObjectId,
        state: RawState,
        expected_head: RevisionMarker,
    ) -> HistoryResult<()> {
        self.kind(oid)?;
        unit.stage(oid, state, expected_head);
        Ok(())
    }

    /// Flags an object so committing `unit` persists it.
    fn mark_changed(&self, unit: &mut UnitOfWork, oid: ObjectId) -> HistoryResult<()> {
        unit.mark_changed(oid)
    }
}

/// Commit and abort of units of work.
pub trait TransactionalStore: WritableStore {
    /// Persists every changed object of `unit` as one new revision.
    ///
    /// Fails with `RollbackConflict`, writing nothing, when any of those
    /// objects has a revision newer than its expected head. Returns None when
    /// nothing was marked changed.
    fn commit(&self, unit: UnitOfWork, meta: TransactionMeta) -> HistoryResult<Option<RevisionMarker>>;

    /// Discards every staged mutation of `unit`.
    fn abort(&self, unit: UnitOfWork) {
        drop(unit);
    }
}

/// Store-wide transaction iteration.
pub trait IterableStore: Send + Sync {
    /// Every transaction marker, ascending.
    fn all_revision_markers(&self) -> HistoryResult<Vec<RevisionMarker>>;

    /// Markers greater than or equal to `start`, ascending.
    fn markers_since(&self, start: RevisionMarker) -> HistoryResult<Vec<RevisionMarker>> {
        Ok(self
            .all_revision_markers()?
            .into_iter()
            .filter(|m| *m >= start)
            .collect())
    }

    /// Oldest marker in the store, if any.
    fn first_marker(&self) -> HistoryResult<Option<RevisionMarker>> {
        Ok(self.all_revision_markers()?.first().copied())
    }

    /// Transactions with `first <= marker <= last`, ascending.
    fn transactions(
        &self,
        first: RevisionMarker,
        last: RevisionMarker,
    ) -> HistoryResult<Vec<TransactionRecord>>;
}
