//! MarkerCache - store-wide list of transaction markers
//!
//! The one piece of state shared across concurrent calls. One cache belongs
//! to one store connection.
//!
//! - Readers may observe a list up to `ttl` old
//! - Readers never observe a half-built list: a refresh builds the new list
//!   completely, then swaps it in under the write lock
//! - A refresh appends only new markers when the store's first marker is
//!   unchanged, and rebuilds from scratch otherwise (the store was packed)

use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

use crate::errors::{HistoryError, HistoryResult};
use crate::model::RevisionMarker;
use crate::observability::{log_event_with_fields, Event, InspectorMetrics};
use crate::store::IterableStore;

#[derive(Debug)]
struct CachedMarkers {
    markers: Arc<Vec<RevisionMarker>>,
    refreshed_at: Instant,
}

/// How the last refresh was performed.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RefreshKind {
    Full,
    Incremental,
}

#[derive(Debug)]
pub struct MarkerCache {
    ttl: Duration,
    slot: RwLock<Option<CachedMarkers>>,
    /// Serializes refreshes so concurrent expiries rebuild once.
    refresh: Mutex<()>,
    metrics: Option<Arc<InspectorMetrics>>,
}

impl MarkerCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: RwLock::new(None),
            refresh: Mutex::new(()),
            metrics: None,
        }
    }

    pub fn with_metrics(ttl: Duration, metrics: Arc<InspectorMetrics>) -> Self {
        Self {
            metrics: Some(metrics),
            ..Self::new(ttl)
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// All transaction markers, ascending, refreshed if older than the TTL.
    pub fn markers(&self, store: &dyn IterableStore) -> HistoryResult<Arc<Vec<RevisionMarker>>> {
        if let Some(markers) = self.fresh()? {
            return Ok(markers);
        }

        let _refreshing = self
            .refresh
            .lock()
            .map_err(|_| HistoryError::Internal("Lock poisoned".into()))?;
        if let Some(markers) = self.fresh()? {
            return Ok(markers);
        }

        let previous = self.current()?;
        let (markers, kind) = rebuild(store, previous.as_deref().map(Vec::as_slice))?;
        let markers = Arc::new(markers);

        {
            let mut slot = self
                .slot
                .write()
                .map_err(|_| HistoryError::Internal("Lock poisoned".into()))?;
            *slot = Some(CachedMarkers {
                markers: Arc::clone(&markers),
                refreshed_at: Instant::now(),
            });
        }

        if let Some(metrics) = &self.metrics {
            metrics.increment_marker_cache_refreshes();
        }
        let count = markers.len().to_string();
        let event = match kind {
            RefreshKind::Full => Event::MarkerCacheRebuilt,
            RefreshKind::Incremental => Event::MarkerCacheExtended,
        };
        log_event_with_fields(event, &[("markers", count.as_str())]);

        Ok(markers)
    }

    /// Forgets the cached list; the next call rebuilds it.
    pub fn invalidate(&self) -> HistoryResult<()> {
        let mut slot = self
            .slot
            .write()
            .map_err(|_| HistoryError::Internal("Lock poisoned".into()))?;
        *slot = None;
        Ok(())
    }

    fn fresh(&self) -> HistoryResult<Option<Arc<Vec<RevisionMarker>>>> {
        let slot = self
            .slot
            .read()
            .map_err(|_| HistoryError::Internal("Lock poisoned".into()))?;
        Ok(slot
            .as_ref()
            .filter(|cached| cached.refreshed_at.elapsed() < self.ttl)
            .map(|cached| Arc::clone(&cached.markers)))
    }

    fn current(&self) -> HistoryResult<Option<Arc<Vec<RevisionMarker>>>> {
        let slot = self
            .slot
            .read()
            .map_err(|_| HistoryError::Internal("Lock poisoned".into()))?;
        Ok(slot.as_ref().map(|cached| Arc::clone(&cached.markers)))
    }
}

fn rebuild(
    store: &dyn IterableStore,
    previous: Option<&[RevisionMarker]>,
) -> HistoryResult<(Vec<RevisionMarker>, RefreshKind)> {
    if let Some(previous) = previous {
        if let (Some(first), Some(last)) = (previous.first(), previous.last()) {
            if store.first_marker()? == Some(*first) {
                let mut markers = previous.to_vec();
                markers.extend(store.markers_since(*last)?.into_iter().filter(|m| m > last));
                return Ok((markers, RefreshKind::Incremental));
            }
        }
    }
    Ok((store.all_revision_markers()?, RefreshKind::Full))
}
