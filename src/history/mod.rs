//! Revision history
//!
//! This module provides:
//! - `RevisionHistory` - Cached revision list of one object and
//!   "state at or before marker" resolution
//! - `MarkerCache` - Shared, TTL-bounded list of every transaction marker
//! - `DatabaseHistory` - Paging through all transactions of a store

mod database;
mod marker_cache;
mod object_history;

pub use database::DatabaseHistory;
pub use marker_cache::{MarkerCache, RefreshKind};
pub use object_history::{HistoryScope, RevisionHistory};
