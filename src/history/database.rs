//! DatabaseHistory - paging through every transaction of a store

use std::ops::Range;
use std::sync::Arc;

use crate::errors::HistoryResult;
use crate::model::{RevisionMarker, TransactionRecord};
use crate::store::IterableStore;

use super::MarkerCache;

/// Store-wide transaction list backed by a shared [`MarkerCache`].
///
/// The marker list is captured once at construction, so indexes stay stable
/// for the lifetime of this value even if the cache refreshes meanwhile.
pub struct DatabaseHistory<'a> {
    store: &'a dyn IterableStore,
    markers: Arc<Vec<RevisionMarker>>,
}

impl<'a> DatabaseHistory<'a> {
    pub fn new(store: &'a dyn IterableStore, cache: &MarkerCache) -> HistoryResult<Self> {
        Ok(Self {
            store,
            markers: cache.markers(store)?,
        })
    }

    /// Markers, oldest first.
    pub fn markers(&self) -> &[RevisionMarker] {
        &self.markers
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// Transaction at `index` (0 = oldest).
    pub fn get(&self, index: usize) -> HistoryResult<Option<TransactionRecord>> {
        let Some(marker) = self.markers.get(index) else {
            return Ok(None);
        };
        Ok(self.store.transactions(*marker, *marker)?.into_iter().next())
    }

    /// Transactions with indexes in `range`, clipped to the list, oldest first.
    pub fn page(&self, range: Range<usize>) -> HistoryResult<Vec<TransactionRecord>> {
        let end = range.end.min(self.markers.len());
        if range.start >= end {
            return Ok(Vec::new());
        }
        let window = &self.markers[range.start..end];
        match (window.first(), window.last()) {
            (Some(first), Some(last)) => self.store.transactions(*first, *last),
            _ => Ok(Vec::new()),
        }
    }

    /// The `count` newest transactions, newest first.
    pub fn latest(&self, count: usize) -> HistoryResult<Vec<TransactionRecord>> {
        let len = self.markers.len();
        let mut page = self.page(len.saturating_sub(count)..len)?;
        page.reverse();
        Ok(page)
    }
}
