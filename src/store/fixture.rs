//! JSON fixtures for the in-memory store
//!
//! ```json
//! {
//!   "objects": [{"oid": 1, "kind": "object"}],
//!   "transactions": [
//!     {"marker": 10, "timestamp": 0, "author": "a", "description": "",
//!      "writes": [[1, {"Mapping": [[{"Str": "a"}, {"Int": 1}]]}]]}
//!   ]
//! }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{HistoryError, HistoryResult};
use crate::model::{ObjectId, ObjectKind, RawState, RevisionMarker, TransactionMeta};

use super::MemoryStore;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureObject {
    pub oid: ObjectId,
    pub kind: ObjectKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureTransaction {
    pub marker: RevisionMarker,
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub description: String,
    pub writes: Vec<(ObjectId, RawState)>,
}

/// Serializable description of a store's full history.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreFixture {
    pub objects: Vec<FixtureObject>,
    /// Applied in marker order regardless of listing order.
    pub transactions: Vec<FixtureTransaction>,
}

impl StoreFixture {
    pub fn load(path: &Path) -> HistoryResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            HistoryError::storage_io(format!("Failed to read fixture {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&content)
            .map_err(|e| HistoryError::storage_io(format!("Invalid fixture JSON: {}", e)))
    }

    pub fn into_store(self) -> HistoryResult<MemoryStore> {
        let store = MemoryStore::new();
        for object in self.objects {
            store.insert_object(object.oid, object.kind)?;
        }

        let mut transactions = self.transactions;
        transactions.sort_by_key(|t| t.marker);
        for txn in transactions {
            store.record(
                txn.marker,
                TransactionMeta::new(txn.timestamp, txn.author, txn.description),
                txn.writes,
            )?;
        }
        Ok(store)
    }
}

impl MemoryStore {
    /// Builds a store from a fixture file.
    pub fn from_fixture_file(path: &Path) -> HistoryResult<Self> {
        StoreFixture::load(path)?.into_store()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ObjectStore;
    use std::io::Write;

    #[test]
    fn test_fixture_file_round_trip_into_store() {
        let json = r#"{
            "objects": [{"oid": 1, "kind": "object"}],
            "transactions": [
                {"marker": 20, "writes": [[1, {"Mapping": [[{"Str": "a"}, {"Int": 2}]]}]]},
                {"marker": 10, "author": "alice", "writes": [[1, {"Mapping": []}]]}
            ]
        }"#;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();

        let store = MemoryStore::from_fixture_file(file.path()).unwrap();
        let oid = ObjectId::new(1);

        let history = store.history(oid, 10).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].author, "alice");
        assert_eq!(
            store.load_state(oid, RevisionMarker::new(20)).unwrap(),
            RawState::mapping([(RawState::str("a"), RawState::int(2))])
        );
    }

    #[test]
    fn test_fixture_with_unknown_object_fails() {
        let fixture = StoreFixture {
            objects: vec![],
            transactions: vec![FixtureTransaction {
                marker: RevisionMarker::new(1),
                timestamp: 0,
                author: String::new(),
                description: String::new(),
                writes: vec![(ObjectId::new(5), RawState::None)],
            }],
        };

        assert!(fixture.into_store().unwrap_err().is_not_found());
    }
}
