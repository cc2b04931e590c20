//! Diff Engine Invariant Tests
//!
//! Tests for structural diffs:
//! - Identity yields no entries
//! - Key ordering groups by key type
//! - Sequence splits reconstruct both inputs
//! - Revision diffs and changelogs through the inspector

use std::collections::BTreeMap;
use std::sync::Arc;

use objscope::diff::{diff_maps, diff_sequences, DiffEntry, DiffKind, NestedDiff};
use objscope::model::{ObjectId, ObjectKind, RawState, RevisionMarker, TransactionMeta};
use objscope::store::MemoryStore;
use objscope::{Inspector, InspectorConfig};

fn m(v: u64) -> RevisionMarker {
    RevisionMarker::new(v)
}

fn s(v: &str) -> RawState {
    RawState::str(v)
}

fn i(v: i64) -> RawState {
    RawState::int(v)
}

fn map(pairs: Vec<(RawState, RawState)>) -> BTreeMap<RawState, RawState> {
    pairs.into_iter().collect()
}

/// Object O with payloads {}, {a:1}, {a:2, b:3} at markers 10, 20, 30.
fn three_revisions() -> (Inspector<MemoryStore>, ObjectId) {
    let store = MemoryStore::new();
    let oid = store.add_object(ObjectKind::OBJECT).unwrap();
    let payloads = [
        (10, RawState::empty_mapping()),
        (20, RawState::mapping([(s("a"), i(1))])),
        (30, RawState::mapping([(s("a"), i(2)), (s("b"), i(3))])),
    ];
    for (marker, payload) in payloads {
        store
            .record(m(marker), TransactionMeta::new(marker as i64, "u", ""), vec![(oid, payload)])
            .unwrap();
    }
    (Inspector::new(Arc::new(store), InspectorConfig::default()).unwrap(), oid)
}

// =============================================================================
// Map Diff Tests
// =============================================================================

/// diff_maps(X, X) is empty for any mapping.
#[test]
fn test_identity_diff_is_empty() {
    let samples = vec![
        map(vec![]),
        map(vec![(s("a"), i(1))]),
        map(vec![
            (i(3), s("three")),
            (s("nested"), RawState::mapping([(s("k"), RawState::sequence([i(1), i(2)]))])),
            (s("ref"), RawState::reference(ObjectId::new(4))),
            (RawState::Bytes(vec![0, 1]), RawState::Bool(true)),
        ]),
    ];

    for x in samples {
        assert!(diff_maps(&x, &x).is_empty());
    }
}

/// Output groups keys by type, then by natural order within the type.
#[test]
fn test_output_ordered_by_type_then_value() {
    let new = map(vec![(s("b"), i(1)), (i(2), i(1)), (s("a"), i(1)), (i(10), i(1))]);
    let old = map(vec![(RawState::Bool(false), i(0))]);

    let keys: Vec<_> = diff_maps(&new, &old).into_iter().map(|e| e.key).collect();
    assert_eq!(keys, vec![RawState::Bool(false), i(2), i(10), s("a"), s("b")]);
}

/// References compare by id and are never followed.
#[test]
fn test_references_compare_by_identity() {
    let same = map(vec![(s("r"), RawState::reference(ObjectId::new(1)))]);
    let other = map(vec![(s("r"), RawState::reference(ObjectId::new(2)))]);

    assert!(diff_maps(&same, &same.clone()).is_empty());
    assert_eq!(diff_maps(&other, &same)[0].kind, DiffKind::Changed);
}

/// Changed mappings carry a nested diff.
#[test]
fn test_nested_mapping_refinement() {
    let new = map(vec![(s("m"), RawState::mapping([(s("x"), i(1)), (s("y"), i(2))]))]);
    let old = map(vec![(s("m"), RawState::mapping([(s("x"), i(1))]))]);

    let diff = diff_maps(&new, &old);
    assert_eq!(diff.len(), 1);
    assert_eq!(
        diff[0].nested,
        Some(NestedDiff::Mapping(vec![DiffEntry::added(s("y"), i(2))]))
    );
}

// =============================================================================
// Sequence Diff Tests
// =============================================================================

/// prefix + removed + suffix is old; prefix + added + suffix is new.
#[test]
fn test_sequence_split_reconstructs_inputs() {
    let seq = |values: &[i64]| values.iter().map(|v| i(*v)).collect::<Vec<_>>();
    let pairs = vec![
        (seq(&[1, 2, 3]), seq(&[1, 2, 3])),
        (seq(&[1, 2, 3, 4]), seq(&[1, 4])),
        (seq(&[1, 4]), seq(&[1, 2, 3, 4])),
        (seq(&[9, 9, 9]), seq(&[9])),
        (seq(&[9]), seq(&[9, 9, 9])),
        (seq(&[1, 2, 1, 2]), seq(&[2, 1, 2, 1])),
        (seq(&[]), seq(&[5, 6])),
        (seq(&[7, 8]), seq(&[])),
    ];

    for (new, old) in pairs {
        let split = diff_sequences(&new, &old);
        assert_eq!(split.reconstruct_old(), old);
        assert_eq!(split.reconstruct_new(), new);
        assert!(split.prefix.len() + split.suffix.len() <= new.len().min(old.len()));
    }
}

/// A middle edit is reported as removed/added between prefix and suffix.
#[test]
fn test_sequence_middle_edit() {
    let new = vec![s("a"), s("x"), s("y"), s("z"), s("d")];
    let old = vec![s("a"), s("b"), s("c"), s("d")];

    let split = diff_sequences(&new, &old);
    assert_eq!(split.prefix, vec![s("a")]);
    assert_eq!(split.removed, vec![s("b"), s("c")]);
    assert_eq!(split.added, vec![s("x"), s("y"), s("z")]);
    assert_eq!(split.suffix, vec![s("d")]);
}

// =============================================================================
// Revision Diff Tests
// =============================================================================

/// diff(O, 30, 20) and diff(O, 20, 10).
#[test]
fn test_revision_diffs() {
    let (inspector, oid) = three_revisions();

    assert_eq!(
        inspector.diff(oid, m(30), m(20)).unwrap(),
        vec![
            DiffEntry::changed(s("a"), i(2), i(1)),
            DiffEntry::added(s("b"), i(3)),
        ]
    );
    assert_eq!(
        inspector.diff(oid, m(20), m(10)).unwrap(),
        vec![DiffEntry::added(s("a"), i(1))]
    );
    assert!(inspector.diff(oid, m(25), m(20)).unwrap().is_empty());
    assert_eq!(inspector.metrics().diffs_computed, 3);
}

/// The changelog diffs each revision against the one before it.
#[test]
fn test_changelog() {
    let (inspector, oid) = three_revisions();

    let changelog = inspector.changelog(oid).unwrap();
    let markers: Vec<_> = changelog.iter().map(|e| e.revision.marker).collect();
    assert_eq!(markers, vec![m(30), m(20), m(10)]);

    assert_eq!(changelog[0].diff.len(), 2);
    assert_eq!(changelog[1].diff, vec![DiffEntry::added(s("a"), i(1))]);
    assert!(changelog[2].diff.is_empty());
    assert!(changelog.iter().all(|e| e.error.is_none()));
}

/// One undecodable revision is reported inline; the rest still diff.
#[test]
fn test_changelog_reports_bad_revision_inline() {
    let store = MemoryStore::new();
    let oid = store.add_object(ObjectKind::CHAINED_MAP).unwrap();
    let inline = |kv: Vec<RawState>| RawState::sequence([RawState::sequence(kv)]);
    store
        .record(m(1), TransactionMeta::default(), vec![(oid, inline(vec![s("a"), i(1)]))])
        .unwrap();
    store
        .record(m(2), TransactionMeta::default(), vec![(oid, inline(vec![s("broken")]))])
        .unwrap();
    store
        .record(m(3), TransactionMeta::default(), vec![(oid, inline(vec![s("a"), i(1), s("b"), i(2)]))])
        .unwrap();
    let inspector = Inspector::new(Arc::new(store), InspectorConfig::default()).unwrap();

    let changelog = inspector.changelog(oid).unwrap();
    assert_eq!(changelog.len(), 3);
    assert!(changelog[1].error.as_deref().unwrap().contains("odd length"));
    assert!(changelog[1].diff.is_empty());
    assert!(changelog[0].error.is_none());
    assert!(changelog[2].error.is_none());
    assert_eq!(changelog[2].diff, vec![DiffEntry::added(s("a"), i(1))]);
}
