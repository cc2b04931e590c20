//! Observable events
//!
//! Events are explicit and typed.

use std::fmt;

use super::logger::Severity;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Configuration
    /// Configuration file loaded and validated
    ConfigLoaded,

    // History
    /// Revision list of one object loaded from the store
    HistoryLoaded,
    /// Merged revision list of a chained map loaded
    ChainHistoryLoaded,

    // Decoding
    /// A revision decoded with an inline error
    DecodeFailed,

    // Rollback
    /// Rollback of one object found nothing to change
    RollbackNoop,
    /// Historical state applied to one object
    RollbackApplied,
    /// Rollback unit of work committed
    RollbackCommitted,
    /// Rollback unit of work aborted
    RollbackAborted,

    // Marker cache
    /// Marker cache rebuilt from scratch
    MarkerCacheRebuilt,
    /// Marker cache extended with new transactions
    MarkerCacheExtended,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::HistoryLoaded => "HISTORY_LOADED",
            Event::ChainHistoryLoaded => "CHAIN_HISTORY_LOADED",
            Event::DecodeFailed => "DECODE_FAILED",
            Event::RollbackNoop => "ROLLBACK_NOOP",
            Event::RollbackApplied => "ROLLBACK_APPLIED",
            Event::RollbackCommitted => "ROLLBACK_COMMITTED",
            Event::RollbackAborted => "ROLLBACK_ABORTED",
            Event::MarkerCacheRebuilt => "MARKER_CACHE_REBUILT",
            Event::MarkerCacheExtended => "MARKER_CACHE_EXTENDED",
        }
    }

    /// Severity an event is logged at.
    pub fn severity(&self) -> Severity {
        match self {
            Event::HistoryLoaded | Event::ChainHistoryLoaded => Severity::Trace,
            Event::DecodeFailed => Severity::Warn,
            Event::RollbackAborted => Severity::Error,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names() {
        assert_eq!(Event::RollbackApplied.as_str(), "ROLLBACK_APPLIED");
        assert_eq!(Event::MarkerCacheExtended.to_string(), "MARKER_CACHE_EXTENDED");
    }

    #[test]
    fn test_event_severity() {
        assert_eq!(Event::HistoryLoaded.severity(), Severity::Trace);
        assert_eq!(Event::DecodeFailed.severity(), Severity::Warn);
        assert_eq!(Event::RollbackAborted.severity(), Severity::Error);
        assert_eq!(Event::RollbackCommitted.severity(), Severity::Info);
    }
}
