//! Inspector Scenario Tests
//!
//! End-to-end use of the facade:
//! - Configuration loaded from a file
//! - Interpreting plain objects, containers and unknown payloads
//! - Custom decoders
//! - Parent paths and counters

use std::io::Write;
use std::sync::Arc;

use objscope::decode::{DecodeContext, DecoderRegistry, InterpretedState, RAW_STATE_KEY};
use objscope::errors::HistoryResult;
use objscope::model::{ObjectId, ObjectKind, RawState, RevisionMarker, Shape, TransactionMeta, NAME_KEY, PARENT_KEY};
use objscope::store::MemoryStore;
use objscope::{Inspector, InspectorConfig};

fn m(v: u64) -> RevisionMarker {
    RevisionMarker::new(v)
}

fn s(v: &str) -> RawState {
    RawState::str(v)
}

/// root folder -> "docs" folder -> chained item map.
struct Site {
    inspector: Inspector<MemoryStore>,
    root: ObjectId,
    docs: ObjectId,
    items: ObjectId,
}

fn site() -> Site {
    let store = MemoryStore::new();
    let root = store.add_object(ObjectKind::OBJECT).unwrap();
    let docs = store.add_object(ObjectKind::FOLDER).unwrap();
    let items = store.add_object(ObjectKind::CHAINED_MAP).unwrap();
    let page = store.add_object(ObjectKind::OBJECT).unwrap();

    store
        .record(
            m(10),
            TransactionMeta::new(1, "admin", "create site"),
            vec![
                (root, RawState::mapping([(s("title"), s("Site"))])),
                (items, RawState::None),
                (
                    docs,
                    RawState::mapping([
                        (s(NAME_KEY), s("docs")),
                        (s(PARENT_KEY), RawState::reference(root)),
                        (s("data"), RawState::reference(items)),
                    ]),
                ),
            ],
        )
        .unwrap();
    store
        .record(
            m(20),
            TransactionMeta::new(2, "editor", "add page"),
            vec![
                (
                    page,
                    RawState::mapping([
                        (s(NAME_KEY), s("index")),
                        (s(PARENT_KEY), RawState::reference(docs)),
                    ]),
                ),
                (
                    items,
                    RawState::sequence([RawState::sequence([s("index"), RawState::reference(page)])]),
                ),
            ],
        )
        .unwrap();

    Site {
        inspector: Inspector::new(Arc::new(store), InspectorConfig::default()).unwrap(),
        root,
        docs,
        items,
    }
}

// =============================================================================
// Configuration Tests
// =============================================================================

/// A partial config file falls back to defaults for missing fields.
#[test]
fn test_inspector_from_config_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{"max_parent_depth": 8, "log_level": "warn"}}"#).unwrap();

    let config = InspectorConfig::load(file.path()).unwrap();
    assert_eq!(config.max_parent_depth, 8);
    assert_eq!(config.max_chain_length, 100_000);

    let inspector = Inspector::new(Arc::new(MemoryStore::new()), config).unwrap();
    assert_eq!(inspector.config().max_parent_depth, 8);
}

/// A config with an unknown log level is rejected.
#[test]
fn test_bad_log_level_is_config_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{"log_level": "loud"}}"#).unwrap();

    let err = InspectorConfig::load(file.path()).unwrap_err();
    assert_eq!(err.code(), "OBJSCOPE_CONFIG");
}

// =============================================================================
// Interpretation Tests
// =============================================================================

/// A marker before the object existed is "not found", not a storage error.
#[test]
fn test_interpret_before_first_revision() {
    let site = site();

    let err = site.inspector.interpret(site.docs, Some(m(9))).unwrap_err();
    assert!(err.is_not_found());
    assert!(!err.is_storage());
}

/// Folders list the items of their chained map at the same marker.
#[test]
fn test_folder_items_follow_marker() {
    let site = site();

    let before = site.inspector.interpret(site.docs, Some(m(10))).unwrap();
    assert_eq!(before.name(), Some("docs"));
    assert_eq!(before.parent(), Some(site.root));
    assert!(before.items().unwrap().is_empty());

    let after = site.inspector.interpret(site.docs, Some(m(20))).unwrap();
    assert_eq!(after.items().unwrap().len(), 1);
    assert_eq!(after.items().unwrap()[0].0, s("index"));

    // The folder's own payload did not change between the two markers.
    assert_eq!(before.as_flat_map(), after.as_flat_map());
}

/// Payload shapes with no decoder fall back to a synthetic attribute.
#[test]
fn test_unknown_shape_falls_back() {
    let store = MemoryStore::new();
    let oid = store.add_object(ObjectKind::new("blob")).unwrap();
    store
        .record(m(1), TransactionMeta::default(), vec![(oid, RawState::Bytes(vec![1, 2, 3]))])
        .unwrap();
    let inspector = Inspector::new(Arc::new(store), InspectorConfig::default()).unwrap();

    let state = inspector.interpret(oid, None).unwrap();
    assert!(state.error().is_none());
    assert_eq!(
        state.as_flat_map().get(&s(RAW_STATE_KEY)),
        Some(&RawState::Bytes(vec![1, 2, 3]))
    );
}

/// A registered decoder takes over its (kind, shape) key.
#[test]
fn test_custom_decoder() {
    let store = MemoryStore::new();
    let oid = store.add_object(ObjectKind::new("counter")).unwrap();
    store
        .record(m(1), TransactionMeta::default(), vec![(oid, RawState::int(41))])
        .unwrap();

    let mut registry = DecoderRegistry::with_defaults();
    registry.register(
        Some(ObjectKind::new("counter")),
        Some(Shape::Scalar),
        |_: &DecodeContext<'_>, state: &RawState| -> HistoryResult<InterpretedState> {
            let value = match state {
                RawState::Int(v) => *v,
                _ => 0,
            };
            let attributes = [(s("value"), RawState::int(value))].into_iter().collect();
            Ok(InterpretedState::from_mapping(&attributes).with_name("counter"))
        },
    );
    let inspector = Inspector::new(Arc::new(store), InspectorConfig::default())
        .unwrap()
        .with_registry(registry);

    let state = inspector.interpret(oid, None).unwrap();
    assert_eq!(state.name(), Some("counter"));
    assert_eq!(state.as_flat_map().get(&s("value")), Some(&RawState::int(41)));
}

// =============================================================================
// Path and Counter Tests
// =============================================================================

/// Paths are root first and resolved at the requested marker.
#[test]
fn test_path() {
    let site = site();

    let path = site.inspector.path(site.docs, None).unwrap();
    let oids: Vec<_> = path.iter().map(|p| p.oid).collect();
    assert_eq!(oids, vec![site.root, site.docs]);
    assert_eq!(path[1].name.as_deref(), Some("docs"));
}

/// Counters reflect the work done.
#[test]
fn test_metrics_snapshot() {
    let site = site();

    site.inspector.get_history(site.items).unwrap().load().unwrap();
    site.inspector.interpret(site.items, None).unwrap();
    site.inspector.diff(site.items, m(20), m(10)).unwrap();

    let snapshot = site.inspector.metrics();
    assert_eq!(snapshot.histories_loaded, 1);
    assert_eq!(snapshot.states_decoded, 3);
    assert_eq!(snapshot.diffs_computed, 1);
    assert_eq!(snapshot.decode_errors, 0);

    let json = serde_json::to_value(&snapshot).unwrap();
    assert_eq!(json["states_decoded"], 3);
}
