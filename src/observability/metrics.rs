//! Inspector counters
//!
//! - Counters only, monotonic
//! - Thread-safe, relaxed ordering

use std::sync::atomic::{AtomicU64, Ordering};

/// Operational counters of one inspector.
#[derive(Debug, Default)]
pub struct InspectorMetrics {
    histories_loaded: AtomicU64,
    states_decoded: AtomicU64,
    decode_errors: AtomicU64,
    diffs_computed: AtomicU64,
    rollbacks_applied: AtomicU64,
    rollback_noops: AtomicU64,
    rollback_failures: AtomicU64,
    marker_cache_refreshes: AtomicU64,
}

impl InspectorMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_histories_loaded(&self) {
        self.histories_loaded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_states_decoded(&self) {
        self.states_decoded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_decode_errors(&self) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_diffs_computed(&self) {
        self.diffs_computed.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts objects that received a historical state.
    pub fn add_rollbacks_applied(&self, objects: u64) {
        self.rollbacks_applied.fetch_add(objects, Ordering::Relaxed);
    }

    pub fn increment_rollback_noops(&self) {
        self.rollback_noops.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_rollback_failures(&self) {
        self.rollback_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_marker_cache_refreshes(&self) {
        self.marker_cache_refreshes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            histories_loaded: self.histories_loaded.load(Ordering::Relaxed),
            states_decoded: self.states_decoded.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            diffs_computed: self.diffs_computed.load(Ordering::Relaxed),
            rollbacks_applied: self.rollbacks_applied.load(Ordering::Relaxed),
            rollback_noops: self.rollback_noops.load(Ordering::Relaxed),
            rollback_failures: self.rollback_failures.load(Ordering::Relaxed),
            marker_cache_refreshes: self.marker_cache_refreshes.load(Ordering::Relaxed),
        }
    }

    pub fn to_json(&self) -> String {
        // Field order is fixed by the struct definition.
        serde_json::to_string(&self.snapshot()).unwrap_or_else(|_| "{}".to_string())
    }
}

/// A point-in-time copy of all counters
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    pub histories_loaded: u64,
    pub states_decoded: u64,
    pub decode_errors: u64,
    pub diffs_computed: u64,
    pub rollbacks_applied: u64,
    pub rollback_noops: u64,
    pub rollback_failures: u64,
    pub marker_cache_refreshes: u64,
}
