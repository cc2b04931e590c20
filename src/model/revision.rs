//! Revision metadata
//!
//! Revisions and transaction records are created by the storage layer and
//! are immutable afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ObjectId, RevisionMarker};

/// One historical revision of a single object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revision {
    /// Transaction that produced this revision.
    pub marker: RevisionMarker,
    /// Commit time, seconds since the Unix epoch.
    pub timestamp: i64,
    /// User responsible for the change.
    pub author: String,
    /// Short description of the change.
    pub description: String,
    /// Size of the stored payload in bytes, if the store reports it.
    #[serde(default)]
    pub size: Option<u64>,
}

impl Revision {
    /// Commit time as a UTC datetime.
    ///
    /// Returns None when the timestamp is outside chrono's supported range.
    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.timestamp, 0)
    }

    /// One-line summary: `YYYY-MM-DD HH:MM:SS author description`.
    pub fn summary(&self) -> String {
        let when = match self.datetime() {
            Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => self.timestamp.to_string(),
        };
        format!("{} {} {}", when, self.author, self.description)
    }
}

/// Metadata supplied by the caller when committing a unit of work.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionMeta {
    pub timestamp: i64,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub description: String,
}

impl TransactionMeta {
    pub fn new(timestamp: i64, author: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            timestamp,
            author: author.into(),
            description: description.into(),
        }
    }
}

/// A store-wide transaction, as returned when paging through the database.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub marker: RevisionMarker,
    pub timestamp: i64,
    pub author: String,
    pub description: String,
    /// Objects written by this transaction, ascending by id.
    pub objects: Vec<ObjectId>,
}
