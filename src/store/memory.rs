//! In-memory reference store
//!
//! Keeps every revision of every object; an object's live state is its
//! newest revision. Rollback writes are staged in caller-owned units of work
//! and land in one locked step at commit. Each stored payload carries a CRC32
//! of its JSON encoding, verified on every load.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::errors::{HistoryError, HistoryResult};
use crate::model::{
    ObjectId, ObjectKind, RawState, Revision, RevisionMarker, TransactionMeta, TransactionRecord,
};

use super::{IterableStore, ObjectStore, TransactionalStore, UnitOfWork, WritableStore};

#[derive(Debug)]
struct StoredRevision {
    marker: RevisionMarker,
    state: RawState,
    checksum: u32,
    size: u64,
}

#[derive(Debug)]
struct StoredObject {
    kind: ObjectKind,
    /// Ascending by marker.
    revisions: Vec<StoredRevision>,
}

impl StoredObject {
    fn new(kind: ObjectKind) -> Self {
        Self {
            kind,
            revisions: Vec::new(),
        }
    }

    fn live_state(&self) -> RawState {
        self.revisions
            .last()
            .map(|r| r.state.clone())
            .unwrap_or(RawState::None)
    }

    fn head(&self) -> Option<RevisionMarker> {
        self.revisions.last().map(|r| r.marker)
    }
}

#[derive(Debug, Default)]
struct Inner {
    objects: BTreeMap<ObjectId, StoredObject>,
    transactions: BTreeMap<RevisionMarker, TransactionRecord>,
    next_oid: u64,
}

impl Inner {
    fn object(&self, oid: ObjectId) -> HistoryResult<&StoredObject> {
        self.objects
            .get(&oid)
            .ok_or_else(|| HistoryError::not_found(oid, None))
    }

    fn object_mut(&mut self, oid: ObjectId) -> HistoryResult<&mut StoredObject> {
        self.objects
            .get_mut(&oid)
            .ok_or_else(|| HistoryError::not_found(oid, None))
    }

    fn last_marker(&self) -> Option<RevisionMarker> {
        self.transactions.keys().next_back().copied()
    }

    fn next_marker(&self) -> HistoryResult<RevisionMarker> {
        match self.last_marker() {
            None => Ok(RevisionMarker::new(1)),
            Some(last) => last
                .value()
                .checked_add(1)
                .map(RevisionMarker::new)
                .ok_or_else(|| HistoryError::storage_io(format!("no marker left after {}", last))),
        }
    }

    /// Validates every write before touching anything, so a rejected
    /// transaction leaves the store as it was.

    fn record(
        &mut self,
        marker: RevisionMarker,
        meta: TransactionMeta,
        writes: Vec<(ObjectId, RawState)>,
    ) -> HistoryResult<()> {
        if let Some(last) = self.last_marker() {
            if marker <= last {
                return Err(HistoryError::storage_io(format!(
                    "transaction {} is not newer than {}",
                    marker, last
                )));
            }
        }
        let mut objects = BTreeSet::new();
        let mut prepared = Vec::with_capacity(writes.len());
        for (oid, state) in writes {
            self.object(oid)?;
            if !objects.insert(oid) {
                return Err(HistoryError::storage_io(format!(
                    "transaction {} writes object {} twice",
                    marker, oid
                )));
            }
            let (checksum, size) = fingerprint(&state)?;
            prepared.push((oid, state, checksum, size));
        }

        for (oid, state, checksum, size) in prepared {
            self.object_mut(oid)?.revisions.push(StoredRevision {
                marker,
                state,
                checksum,
                size,
            });
        }
        let objects = objects.into_iter().collect();

        self.transactions.insert(
            marker,
            TransactionRecord {
                marker,
                timestamp: meta.timestamp,
                author: meta.author,
                description: meta.description,
                objects,
            },
        );
        Ok(())
    }
}

fn fingerprint(state: &RawState) -> HistoryResult<(u32, u64)> {
    let bytes = serde_json::to_vec(state)
        .map_err(|e| HistoryError::storage_io(format!("failed to encode state: {}", e)))?;
    Ok((crc32fast::hash(&bytes), bytes.len() as u64))
}

/// Thread-safe in-memory versioned object store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> HistoryResult<RwLockReadGuard<'_, Inner>> {
        self.inner
            .read()
            .map_err(|_| HistoryError::Internal("Lock poisoned".into()))
    }

    fn write(&self) -> HistoryResult<RwLockWriteGuard<'_, Inner>> {
        self.inner
            .write()
            .map_err(|_| HistoryError::Internal("Lock poisoned".into()))
    }

    /// Creates an object with no revisions and returns its fresh id.
    pub fn add_object(&self, kind: ObjectKind) -> HistoryResult<ObjectId> {
        let mut inner = self.write()?;
        let mut next = inner.next_oid.max(1);
        while inner.objects.contains_key(&ObjectId::new(next)) {
            next += 1;
        }
        let oid = ObjectId::new(next);
        inner.next_oid = next.saturating_add(1);
        inner.objects.insert(oid, StoredObject::new(kind));
        Ok(oid)
    }

    /// Creates an object with a caller-chosen id.
    pub fn insert_object(&self, oid: ObjectId, kind: ObjectKind) -> HistoryResult<()> {
        let mut inner = self.write()?;
        if inner.objects.contains_key(&oid) {
            return Err(HistoryError::storage_io(format!("object {} already exists", oid)));
        }
        inner.objects.insert(oid, StoredObject::new(kind));
        Ok(())
    }

    /// Commits `writes` directly as transaction `marker`.
    ///
    /// `marker` must be newer than every existing transaction, and each
    /// object may appear in `writes` once.
    pub fn record(
        &self,
        marker: RevisionMarker,
        meta: TransactionMeta,
        writes: Vec<(ObjectId, RawState)>,
    ) -> HistoryResult<()> {
        self.write()?.record(marker, meta, writes)
    }

    /// Newest committed state; None for an object with no revisions.
    pub fn live_state(&self, oid: ObjectId) -> HistoryResult<RawState> {
        Ok(self.read()?.object(oid)?.live_state())
    }

    pub fn last_marker(&self) -> HistoryResult<Option<RevisionMarker>> {
        Ok(self.read()?.last_marker())
    }

    /// Number of revisions stored for an object.
    pub fn revision_count(&self, oid: ObjectId) -> HistoryResult<usize> {
        Ok(self.read()?.object(oid)?.revisions.len())
    }

    /// Drops every transaction older than `marker`, keeping each object's
    /// newest revision before it so current states stay loadable.
    pub fn pack(&self, marker: RevisionMarker) -> HistoryResult<()> {
        let mut inner = self.write()?;
        for object in inner.objects.values_mut() {
            let keep_from = object
                .revisions
                .iter()
                .rposition(|r| r.marker < marker)
                .unwrap_or(0);
            object.revisions.drain(..keep_from);
        }
        let referenced: BTreeSet<RevisionMarker> = inner
            .objects
            .values()
            .flat_map(|o| o.revisions.iter().map(|r| r.marker))
            .collect();
        inner
            .transactions
            .retain(|m, _| *m >= marker || referenced.contains(m));
        Ok(())
    }

    #[cfg(test)]
    fn corrupt(&self, oid: ObjectId, marker: RevisionMarker) {
        let mut inner = self.inner.write().unwrap();
        let object = inner.objects.get_mut(&oid).unwrap();
        let revision = object
            .revisions
            .iter_mut()
            .find(|r| r.marker == marker)
            .unwrap();
        revision.checksum ^= 0xffff_ffff;
    }
}

impl ObjectStore for MemoryStore {
    fn kind(&self, oid: ObjectId) -> HistoryResult<ObjectKind> {
        Ok(self.read()?.object(oid)?.kind.clone())
    }

    fn history(&self, oid: ObjectId, size: u64) -> HistoryResult<Vec<Revision>> {
        let inner = self.read()?;
        let object = match inner.objects.get(&oid) {
            Some(object) => object,
            None => return Ok(Vec::new()),
        };
        let limit = usize::try_from(size).unwrap_or(usize::MAX);

        let mut revisions = Vec::new();
        for stored in object.revisions.iter().rev().take(limit) {
            let txn = inner.transactions.get(&stored.marker).ok_or_else(|| {
                HistoryError::storage_io(format!(
                    "revision {} of object {} has no transaction record",
                    stored.marker, oid
                ))
            })?;
            revisions.push(Revision {
                marker: stored.marker,
                timestamp: txn.timestamp,
                author: txn.author.clone(),
                description: txn.description.clone(),
                size: Some(stored.size),
            });
        }
        Ok(revisions)
    }

    fn load_state(&self, oid: ObjectId, marker: RevisionMarker) -> HistoryResult<RawState> {
        let inner = self.read()?;
        let stored = inner
            .object(oid)?
            .revisions
            .iter()
            .find(|r| r.marker == marker)
            .ok_or_else(|| {
                HistoryError::storage_io(format!("object {} has no revision {}", oid, marker))
            })?;

        let (checksum, _) = fingerprint(&stored.state)?;
        if checksum != stored.checksum {
            return Err(HistoryError::storage_io(format!(
                "checksum mismatch for object {} at {}",
                oid, marker
            )));
        }
        Ok(stored.state.clone())
    }
}

impl WritableStore for MemoryStore {}

impl TransactionalStore for MemoryStore {
    fn commit(&self, unit: UnitOfWork, meta: TransactionMeta) -> HistoryResult<Option<RevisionMarker>> {
        let changed = unit.into_changed();
        if changed.is_empty() {
            return Ok(None);
        }

        // Head check and write happen under one lock.
        let mut inner = self.write()?;
        for (oid, intent) in &changed {
            let found = inner.object(*oid)?.head();
            if found != Some(intent.expected_head) {
                return Err(HistoryError::RollbackConflict {
                    oid: *oid,
                    expected: intent.expected_head,
                    found,
                });
            }
        }

        let marker = inner.next_marker()?;
        let writes = changed.into_iter().map(|(oid, intent)| (oid, intent.state)).collect();
        inner.record(marker, meta, writes)?;
        Ok(Some(marker))
    }
}

impl IterableStore for MemoryStore {
    fn all_revision_markers(&self) -> HistoryResult<Vec<RevisionMarker>> {
        Ok(self.read()?.transactions.keys().copied().collect())
    }

    fn markers_since(&self, start: RevisionMarker) -> HistoryResult<Vec<RevisionMarker>> {
        Ok(self.read()?.transactions.range(start..).map(|(m, _)| *m).collect())
    }

    fn first_marker(&self) -> HistoryResult<Option<RevisionMarker>> {
        Ok(self.read()?.transactions.keys().next().copied())
    }

    fn transactions(
        &self,
        first: RevisionMarker,
        last: RevisionMarker,
    ) -> HistoryResult<Vec<TransactionRecord>> {
        if first > last {
            return Ok(Vec::new());
        }
        Ok(self
            .read()?
            .transactions
            .range(first..=last)
            .map(|(_, t)| t.clone())
            .collect())
    }
}
