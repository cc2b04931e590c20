//! RevisionHistory - revision list of one object
//!
//! The revision list is fetched from the store once, normalized to
//! newest-first order and cached until `invalidate()`.
//!
//! Resolution rule for a bound `M`: the revision with the greatest marker
//! `<= M`, or the newest revision when no bound is given. An object with no
//! revision at or before `M` did not exist yet, which is reported as
//! `NotFoundAtRevision` and never as a storage failure.

use std::cell::OnceCell;
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::Arc;

use crate::decode::chained;
use crate::errors::{HistoryError, HistoryResult};
use crate::model::{ObjectId, RawState, Revision, RevisionMarker};
use crate::observability::{log_event_with_fields, Event, InspectorMetrics};
use crate::store::ObjectStore;

/// Which revisions make up the listed history of an object.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum HistoryScope {
    /// Only revisions written to the object itself.
    Own,
    /// Revisions of a chained-map spine plus every leaf that ever hung off it.
    Chain { max_chain_length: usize },
}

#[derive(Debug)]
struct LoadedHistory {
    /// Newest first.
    listed: Vec<Revision>,
    /// The object's own revisions when they differ from `listed`.
    own: Option<Vec<Revision>>,
}

impl LoadedHistory {
    fn own(&self) -> &[Revision] {
        self.own.as_deref().unwrap_or(&self.listed)
    }
}

/// Lazily loaded, cached revision list of one object.
pub struct RevisionHistory<'s> {
    store: &'s dyn ObjectStore,
    oid: ObjectId,
    size_cap: u64,
    scope: HistoryScope,
    loaded: OnceCell<LoadedHistory>,
    metrics: Option<Arc<InspectorMetrics>>,
}

impl<'s> RevisionHistory<'s> {
    /// History of the object's own revisions.
    pub fn new(store: &'s dyn ObjectStore, oid: ObjectId, size_cap: u64) -> Self {
        Self::with_scope(store, oid, size_cap, HistoryScope::Own)
    }

    pub fn with_scope(
        store: &'s dyn ObjectStore,
        oid: ObjectId,
        size_cap: u64,
        scope: HistoryScope,
    ) -> Self {
        Self {
            store,
            oid,
            size_cap,
            scope,
            loaded: OnceCell::new(),
            metrics: None,
        }
    }

    /// Counts each fetch from the store in `metrics`.
    pub fn with_metrics(mut self, metrics: Arc<InspectorMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    #[inline]
    pub fn oid(&self) -> ObjectId {
        self.oid
    }

    #[inline]
    pub fn scope(&self) -> HistoryScope {
        self.scope
    }

    /// Revisions, newest first.
    pub fn load(&self) -> HistoryResult<&[Revision]> {
        Ok(&self.loaded()?.listed)
    }

    pub fn len(&self) -> HistoryResult<usize> {
        Ok(self.loaded()?.listed.len())
    }

    pub fn is_empty(&self) -> HistoryResult<bool> {
        Ok(self.loaded()?.listed.is_empty())
    }

    /// Drops the cached list; the next call refetches it.
    pub fn invalidate(&mut self) {
        self.loaded.take();
    }

    /// The effective revision at or before `marker`.
    pub fn resolve(&self, marker: Option<RevisionMarker>) -> HistoryResult<&Revision> {
        at_or_before(&self.loaded()?.listed, marker)
            .ok_or_else(|| HistoryError::not_found(self.oid, marker))
    }

    /// Payload of the object as of `marker`.
    ///
    /// For a chained map this is the spine's own last change, even when a
    /// later leaf-only transaction is what `resolve` reports.
    pub fn raw_state_at(&self, marker: Option<RevisionMarker>) -> HistoryResult<RawState> {
        let revision = at_or_before(self.loaded()?.own(), marker)
            .ok_or_else(|| HistoryError::not_found(self.oid, marker))?;
        self.store.load_state(self.oid, revision.marker)
    }

    /// Same as `raw_state_at`; called by rollback with intent to mutate.
    pub fn rollback_candidate(&self, marker: Option<RevisionMarker>) -> HistoryResult<RawState> {
        self.raw_state_at(marker)
    }

    fn loaded(&self) -> HistoryResult<&LoadedHistory> {
        if let Some(loaded) = self.loaded.get() {
            return Ok(loaded);
        }
        let fetched = match self.scope {
            HistoryScope::Own => self.fetch_own()?,
            HistoryScope::Chain { max_chain_length } => self.fetch_chain(max_chain_length)?,
        };
        if let Some(metrics) = &self.metrics {
            metrics.increment_histories_loaded();
        }
        Ok(self.loaded.get_or_init(|| fetched))
    }

    fn fetch_own(&self) -> HistoryResult<LoadedHistory> {
        let listed = normalize(self.store.history(self.oid, self.size_cap)?);

        let oid = self.oid.to_string();
        let count = listed.len().to_string();
        log_event_with_fields(
            Event::HistoryLoaded,
            &[("oid", oid.as_str()), ("revisions", count.as_str())],
        );

        Ok(LoadedHistory { listed, own: None })
    }

    /// Breadth-first discovery of every node that ever took part in the
    /// chain, merging their revisions by marker.
    fn fetch_chain(&self, max_chain_length: usize) -> HistoryResult<LoadedHistory> {
        let own = normalize(self.store.history(self.oid, self.size_cap)?);

        let mut merged: BTreeMap<RevisionMarker, Revision> = BTreeMap::new();
        let mut queue = VecDeque::from([self.oid]);
        let mut seen = HashSet::from([self.oid]);

        while let Some(node) = queue.pop_front() {
            let revisions = if node == self.oid {
                own.clone()
            } else {
                normalize(self.store.history(node, self.size_cap)?)
            };

            for revision in revisions {
                let state = self.store.load_state(node, revision.marker)?;
                // Malformed links are reported by the decoder for that revision.
                if let Ok(Some(next)) = chained::next_link(&state) {
                    if seen.insert(next) {
                        if seen.len() > max_chain_length.saturating_add(1) {
                            return Err(HistoryError::decode(format!(
                                "chain of object {} exceeds {} leaves",
                                self.oid, max_chain_length
                            )));
                        }
                        queue.push_back(next);
                    }
                }
                merged.entry(revision.marker).or_insert(revision);
            }
        }

        let listed: Vec<Revision> = merged.into_values().rev().collect();

        let oid = self.oid.to_string();
        let nodes = seen.len().to_string();
        let count = listed.len().to_string();
        log_event_with_fields(
            Event::ChainHistoryLoaded,
            &[
                ("nodes", nodes.as_str()),
                ("oid", oid.as_str()),
                ("revisions", count.as_str()),
            ],
        );

        Ok(LoadedHistory {
            listed,
            own: Some(own),
        })
    }
}

/// Sorts newest first and drops duplicate markers.
fn normalize(mut revisions: Vec<Revision>) -> Vec<Revision> {
    revisions.sort_by(|a, b| b.marker.cmp(&a.marker));
    revisions.dedup_by_key(|r| r.marker);
    revisions
}

/// `revisions` must be newest first.
fn at_or_before(revisions: &[Revision], marker: Option<RevisionMarker>) -> Option<&Revision> {
    match marker {
        None => revisions.first(),
        Some(bound) => {
            let idx = revisions.partition_point(|r| r.marker > bound);
            revisions.get(idx)
        }
    }
}
