//! Inspector - query and rollback facade over one store
//!
//! Exposes:
//! - `get_history(oid)` - revision list, merged across the chain for chained maps
//! - `interpret(oid, marker)` - decoded view at or before a marker
//! - `diff(oid, a, b)` - structural diff between two markers
//! - `changelog(oid)` - every revision with its diff against the one before
//! - `path(oid, marker)` - parent chain, root first
//! - `database_history()` - store-wide transaction paging
//! - `rollback(oid, marker, meta)` - restore and commit as one unit of work

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;

use crate::config::InspectorConfig;
use crate::decode::{DecodeContext, DecodeLimits, DecoderRegistry, InterpretedState};
use crate::diff::{diff_states, DiffEntry};
use crate::errors::{HistoryError, HistoryResult};
use crate::history::{DatabaseHistory, HistoryScope, MarkerCache, RevisionHistory};
use crate::model::{ObjectId, ObjectKind, RawState, Revision, RevisionMarker, TransactionMeta};
use crate::observability::{log_event_with_fields, Event, InspectorMetrics, Logger, MetricsSnapshot};
use crate::rollback::{RollbackEngine, RollbackOutcome};
use crate::store::{IterableStore, ObjectStore, TransactionalStore, UnitOfWork};

/// One revision of an object with its changes against the previous one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangelogEntry {
    pub revision: Revision,
    pub diff: Vec<DiffEntry>,
    /// Set when this revision could not be decoded; `diff` is then empty.
    pub error: Option<String>,
}

/// One step of a parent path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathSegment {
    pub oid: ObjectId,
    pub name: Option<String>,
}

/// Result of a committed rollback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RollbackReport {
    pub outcome: RollbackOutcome,
    /// Transaction created by the rollback; None when nothing changed.
    pub committed: Option<RevisionMarker>,
}

pub struct Inspector<S> {
    store: Arc<S>,
    registry: Arc<DecoderRegistry>,
    config: InspectorConfig,
    markers: Arc<MarkerCache>,
    metrics: Arc<InspectorMetrics>,
}

impl<S: ObjectStore> Inspector<S> {
    /// Validates `config` and installs the built-in decoders.
    ///
    /// The log level is not applied here; see `apply_log_level`.
    pub fn new(store: Arc<S>, config: InspectorConfig) -> HistoryResult<Self> {
        config.validate()?;

        let metrics = Arc::new(InspectorMetrics::new());
        let markers = Arc::new(MarkerCache::with_metrics(
            config.marker_cache_ttl(),
            Arc::clone(&metrics),
        ));

        Ok(Self {
            store,
            registry: Arc::new(DecoderRegistry::with_defaults()),
            config,
            markers,
            metrics,
        })
    }

    /// Replaces the decoder registry.
    pub fn with_registry(mut self, registry: DecoderRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &InspectorConfig {
        &self.config
    }

    pub fn registry(&self) -> &DecoderRegistry {
        &self.registry
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Makes this inspector's `log_level` the minimum severity of the
    /// process-wide logger, affecting every inspector in the process.
    pub fn apply_log_level(&self) -> HistoryResult<()> {
        Logger::set_min_severity(self.config.log_severity()?);
        Ok(())
    }

    fn limits(&self) -> DecodeLimits {
        DecodeLimits::from(&self.config)
    }

    /// Revision history of an object; chained maps include their leaves.
    pub fn get_history(&self, oid: ObjectId) -> HistoryResult<RevisionHistory<'_>> {
        let scope = if self.store.kind(oid)? == ObjectKind::CHAINED_MAP {
            HistoryScope::Chain {
                max_chain_length: self.config.max_chain_length,
            }
        } else {
            HistoryScope::Own
        };
        Ok(RevisionHistory::with_scope(
            self.store.as_ref(),
            oid,
            self.config.history_size_cap,
            scope,
        )
        .with_metrics(Arc::clone(&self.metrics)))
    }

    /// Decoded state of an object at or before `marker` (None = newest).
    ///
    /// Fails with `NotFoundAtRevision` when the object did not exist yet.
    /// Decode problems are reported through `InterpretedState::error()`.
    pub fn interpret(
        &self,
        oid: ObjectId,
        marker: Option<RevisionMarker>,
    ) -> HistoryResult<InterpretedState> {
        let kind = self.store.kind(oid)?;
        let state = RevisionHistory::new(self.store.as_ref(), oid, self.config.history_size_cap)
            .raw_state_at(marker)?;
        self.decode_state(oid, &kind, marker, &state)
    }

    fn decode_state(
        &self,
        oid: ObjectId,
        kind: &ObjectKind,
        marker: Option<RevisionMarker>,
        state: &RawState,
    ) -> HistoryResult<InterpretedState> {
        let ctx = DecodeContext::new(
            self.store.as_ref(),
            &self.registry,
            oid,
            kind,
            marker,
            self.limits(),
        );
        let interpreted = self.registry.decode(&ctx, state)?;

        self.metrics.increment_states_decoded();
        if interpreted.is_error() {
            self.metrics.increment_decode_errors();
        }
        Ok(interpreted)
    }

    /// Changes from the state at `old` to the state at `new`.
    ///
    /// Unlike `interpret`, a revision that fails to decode is an error here.
    pub fn diff(
        &self,
        oid: ObjectId,
        new: RevisionMarker,
        old: RevisionMarker,
    ) -> HistoryResult<Vec<DiffEntry>> {
        let new_state = self.interpret(oid, Some(new))?;
        let old_state = self.interpret(oid, Some(old))?;

        for (marker, state) in [(new, &new_state), (old, &old_state)] {
            if let Some(err) = state.error() {
                return Err(HistoryError::decode(format!(
                    "object {} at {}: {}",
                    oid, marker, err
                )));
            }
        }

        self.metrics.increment_diffs_computed();
        Ok(diff_states(&new_state, &old_state))
    }

    /// Every revision, newest first, with its diff against the previous one.
    ///
    /// The oldest revision is diffed against an empty map. A revision that
    /// fails to decode carries the error and an empty diff; its neighbours
    /// are diffed against an empty map in its place.
    pub fn changelog(&self, oid: ObjectId) -> HistoryResult<Vec<ChangelogEntry>> {
        let history = self.get_history(oid)?;
        let revisions = history.load()?;

        let mut states = Vec::with_capacity(revisions.len());
        for revision in revisions {
            let state = match self.interpret(oid, Some(revision.marker)) {
                Ok(state) => state,
                Err(err) if err.is_recoverable_in_decode() => InterpretedState::failed(err.to_string()),
                Err(err) => return Err(err),
            };
            states.push(state);
        }

        let empty = InterpretedState::default();
        let entries = revisions
            .iter()
            .enumerate()
            .map(|(i, revision)| {
                let state = &states[i];
                match state.error() {
                    Some(err) => ChangelogEntry {
                        revision: revision.clone(),
                        diff: Vec::new(),
                        error: Some(err.to_string()),
                    },
                    None => {
                        let older = states.get(i + 1).unwrap_or(&empty);
                        self.metrics.increment_diffs_computed();
                        ChangelogEntry {
                            revision: revision.clone(),
                            diff: diff_states(state, older),
                            error: None,
                        }
                    }
                }
            })
            .collect();

        Ok(entries)
    }

    /// Parent chain of an object at `marker`, root first, ending with `oid`.
    pub fn path(
        &self,
        oid: ObjectId,
        marker: Option<RevisionMarker>,
    ) -> HistoryResult<Vec<PathSegment>> {
        let mut segments = Vec::new();
        let mut visited = HashSet::new();
        let mut cursor = Some(oid);

        while let Some(current) = cursor {
            if !visited.insert(current) {
                return Err(HistoryError::decode(format!(
                    "parent chain of object {} loops back to {}",
                    oid, current
                )));
            }
            if segments.len() >= self.config.max_parent_depth {
                return Err(HistoryError::decode(format!(
                    "parent chain of object {} is deeper than {}",
                    oid, self.config.max_parent_depth
                )));
            }

            let state = self.interpret(current, marker)?;
            segments.push(PathSegment {
                oid: current,
                name: state.name().map(str::to_string),
            });
            cursor = state.parent();
        }

        segments.reverse();
        Ok(segments)
    }
}

impl<S: ObjectStore + IterableStore> Inspector<S> {
    /// Store-wide transaction list, backed by the shared marker cache.
    pub fn database_history(&self) -> HistoryResult<DatabaseHistory<'_>> {
        DatabaseHistory::new(self.store.as_ref(), &self.markers)
    }

    /// Drops the cached marker list.
    pub fn refresh_markers(&self) -> HistoryResult<()> {
        self.markers.invalidate()
    }
}

impl<S: TransactionalStore> Inspector<S> {
    /// Rolls `oid` back to its state at `marker` and commits the change.
    ///
    /// The rollback stages into its own unit of work, so concurrent rollbacks
    /// never commit or discard each other's writes. Any failure, including a
    /// conflict found at commit, aborts every staged change of the rollback.
    pub fn rollback(
        &self,
        oid: ObjectId,
        marker: RevisionMarker,
        meta: TransactionMeta,
    ) -> HistoryResult<RollbackReport> {
        let engine = RollbackEngine::new(self.limits());
        let oid_field = oid.to_string();

        let mut unit = UnitOfWork::new();
        let result = match engine.rollback(self.store.as_ref(), &mut unit, oid, marker) {
            Ok(outcome) if outcome.is_noop() => Ok(RollbackReport {
                outcome,
                committed: None,
            }),
            Ok(outcome) => self
                .store
                .commit(unit, meta)
                .map(|committed| RollbackReport { outcome, committed }),
            Err(err) => {
                self.store.abort(unit);
                Err(err)
            }
        };

        match result {
            Ok(report) => {
                match report.committed {
                    Some(committed) => {
                        self.metrics.add_rollbacks_applied(report.outcome.restored.len() as u64);
                        let committed = committed.to_string();
                        log_event_with_fields(
                            Event::RollbackCommitted,
                            &[("marker", committed.as_str()), ("oid", oid_field.as_str())],
                        );
                    }
                    None => self.metrics.increment_rollback_noops(),
                }
                Ok(report)
            }
            Err(err) => {
                self.metrics.increment_rollback_failures();
                let code = err.code();
                log_event_with_fields(
                    Event::RollbackAborted,
                    &[("code", code), ("oid", oid_field.as_str())],
                );
                Err(err)
            }
        }
    }
}
