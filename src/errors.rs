//! # History Errors
//!
//! Error taxonomy:
//! - OBJSCOPE_STORAGE_IO: store unreachable or corrupted, always propagated
//! - OBJSCOPE_NOT_FOUND_AT_REVISION: object did not exist yet, an expected outcome
//! - OBJSCOPE_DECODE: payload recognized but inconsistent, normally captured
//!   into `InterpretedState::error()` instead of being returned
//! - OBJSCOPE_ROLLBACK_CONFLICT: a concurrent commit raced a rollback
//! - OBJSCOPE_CONFIG / OBJSCOPE_INTERNAL: configuration and lock failures

use thiserror::Error;

use crate::model::{ObjectId, RevisionMarker};

/// Result type for history operations
pub type HistoryResult<T> = Result<T, HistoryError>;

/// History errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryError {
    #[error("Storage I/O error: {0}")]
    StorageIo(String),

    #[error("Object {oid} did not exist in or before transaction {}", describe_marker(.marker))]
    NotFoundAtRevision {
        oid: ObjectId,
        /// Requested bound; None means "at any point".
        marker: Option<RevisionMarker>,
    },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Rollback conflict on object {oid}: expected head {expected}, found {}", describe_marker(.found))]
    RollbackConflict {
        oid: ObjectId,
        expected: RevisionMarker,
        found: Option<RevisionMarker>,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

fn describe_marker(marker: &Option<RevisionMarker>) -> String {
    match marker {
        Some(m) => m.to_string(),
        None => "<latest>".to_string(),
    }
}

impl HistoryError {
    pub fn storage_io(message: impl Into<String>) -> Self {
        HistoryError::StorageIo(message.into())
    }

    pub fn decode(message: impl Into<String>) -> Self {
        HistoryError::Decode(message.into())
    }

    pub fn not_found(oid: ObjectId, marker: Option<RevisionMarker>) -> Self {
        HistoryError::NotFoundAtRevision { oid, marker }
    }

    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            HistoryError::StorageIo(_) => "OBJSCOPE_STORAGE_IO",
            HistoryError::NotFoundAtRevision { .. } => "OBJSCOPE_NOT_FOUND_AT_REVISION",
            HistoryError::Decode(_) => "OBJSCOPE_DECODE",
            HistoryError::RollbackConflict { .. } => "OBJSCOPE_ROLLBACK_CONFLICT",
            HistoryError::Config(_) => "OBJSCOPE_CONFIG",
            HistoryError::Internal(_) => "OBJSCOPE_INTERNAL",
        }
    }

    /// True when the object (or a chain node) simply did not exist yet.
    pub fn is_not_found(&self) -> bool {
        matches!(self, HistoryError::NotFoundAtRevision { .. })
    }

    pub fn is_storage(&self) -> bool {
        matches!(self, HistoryError::StorageIo(_))
    }

    /// Errors that a decoder may fold into `InterpretedState::error()`.
    ///
    /// Storage, configuration and internal failures are never folded.
    pub fn is_recoverable_in_decode(&self) -> bool {
        matches!(
            self,
            HistoryError::Decode(_) | HistoryError::NotFoundAtRevision { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(HistoryError::storage_io("x").code(), "OBJSCOPE_STORAGE_IO");
        assert_eq!(
            HistoryError::not_found(ObjectId::new(1), None).code(),
            "OBJSCOPE_NOT_FOUND_AT_REVISION"
        );
        assert_eq!(HistoryError::decode("x").code(), "OBJSCOPE_DECODE");
    }

    #[test]
    fn test_not_found_is_distinct_from_storage() {
        let not_found = HistoryError::not_found(ObjectId::new(1), Some(RevisionMarker::new(5)));
        assert!(not_found.is_not_found());
        assert!(!not_found.is_storage());

        let io = HistoryError::storage_io("disk gone");
        assert!(io.is_storage());
        assert!(!io.is_not_found());
    }

    #[test]
    fn test_display_mentions_marker() {
        let err = HistoryError::not_found(ObjectId::new(9), Some(RevisionMarker::new(16)));
        let display = err.to_string();
        assert!(display.contains("Object 9"));
        assert!(display.contains("0x0000000000000010"));

        let latest = HistoryError::not_found(ObjectId::new(9), None);
        assert!(latest.to_string().contains("<latest>"));
    }

    #[test]
    fn test_only_decode_and_not_found_are_recoverable() {
        assert!(HistoryError::decode("bad link").is_recoverable_in_decode());
        assert!(HistoryError::not_found(ObjectId::new(1), None).is_recoverable_in_decode());
        assert!(!HistoryError::storage_io("x").is_recoverable_in_decode());
        assert!(!HistoryError::Internal("lock".into()).is_recoverable_in_decode());
    }
}
