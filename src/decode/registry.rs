//! DecoderRegistry - (kind, shape) dispatch to state decoders
//!
//! Lookup order for a key `(kind, shape)`:
//! 1. exact `(kind, shape)`
//! 2. `(kind, any shape)`
//! 3. `(any kind, shape)`
//! 4. `(any kind, any shape)`
//! 5. built-in `MappingState` for mapping payloads, `FallbackState` otherwise
//!
//! Registration replaces any decoder previously registered for the same key.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::config::InspectorConfig;
use crate::errors::{HistoryError, HistoryResult};
use crate::history::RevisionHistory;
use crate::model::{ObjectId, ObjectKind, RawState, RevisionMarker, Shape};
use crate::observability::{log_event_with_fields, Event};
use crate::store::ObjectStore;

use super::chained::{ChainedLeafState, ChainedMapState};
use super::containers::{OrderedContainerState, PersistentListState, PersistentMappingState, SubMapContainerState};
use super::generic::{FallbackState, MappingState};
use super::InterpretedState;

/// Nested `decode_object` calls allowed below the top-level object.
const MAX_NESTING: usize = 32;

static MAPPING_STATE: MappingState = MappingState;
static FALLBACK_STATE: FallbackState = FallbackState;

/// Turns one raw payload into an [`InterpretedState`].
///
/// Structural problems are returned as `Decode` errors; the registry folds
/// them into `InterpretedState::error()`. Decoders only ever see the
/// read-only store interface.
pub trait StateDecoder: Send + Sync {
    fn decode(&self, ctx: &DecodeContext<'_>, state: &RawState) -> HistoryResult<InterpretedState>;
}

impl<F> StateDecoder for F
where
    F: Fn(&DecodeContext<'_>, &RawState) -> HistoryResult<InterpretedState> + Send + Sync,
{
    fn decode(&self, ctx: &DecodeContext<'_>, state: &RawState) -> HistoryResult<InterpretedState> {
        self(ctx, state)
    }
}

/// Bounds applied while decoding.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DecodeLimits {
    pub history_size_cap: u64,
    pub max_chain_length: usize,
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self::from(&InspectorConfig::default())
    }
}

impl From<&InspectorConfig> for DecodeLimits {
    fn from(config: &InspectorConfig) -> Self {
        Self {
            history_size_cap: config.history_size_cap,
            max_chain_length: config.max_chain_length,
        }
    }
}

/// Everything a decoder may consult besides the payload itself.
#[derive(Clone, Copy)]
pub struct DecodeContext<'a> {
    store: &'a dyn ObjectStore,
    registry: &'a DecoderRegistry,
    oid: ObjectId,
    kind: &'a ObjectKind,
    marker: Option<RevisionMarker>,
    limits: DecodeLimits,
    depth: usize,
}

impl<'a> DecodeContext<'a> {
    pub fn new(
        store: &'a dyn ObjectStore,
        registry: &'a DecoderRegistry,
        oid: ObjectId,
        kind: &'a ObjectKind,
        marker: Option<RevisionMarker>,
        limits: DecodeLimits,
    ) -> Self {
        Self {
            store,
            registry,
            oid,
            kind,
            marker,
            limits,
            depth: 0,
        }
    }

    pub fn store(&self) -> &'a dyn ObjectStore {
        self.store
    }

    pub fn oid(&self) -> ObjectId {
        self.oid
    }

    pub fn kind(&self) -> &ObjectKind {
        self.kind
    }

    /// Target marker; None means the newest revision.
    pub fn marker(&self) -> Option<RevisionMarker> {
        self.marker
    }

    pub fn limits(&self) -> DecodeLimits {
        self.limits
    }

    /// Own revision history of another object.
    pub fn history(&self, oid: ObjectId) -> RevisionHistory<'a> {
        RevisionHistory::new(self.store, oid, self.limits.history_size_cap)
    }

    /// Payload of another object at the same target marker.
    pub fn load_raw(&self, oid: ObjectId) -> HistoryResult<RawState> {
        self.history(oid).raw_state_at(self.marker)
    }

    /// Decodes another object at the same target marker.
    ///
    /// Errors that the registry would fold are returned as errors here, so
    /// the caller decides whether a broken sub-object fails its parent.
    pub fn decode_object(&self, oid: ObjectId) -> HistoryResult<InterpretedState> {
        if self.depth >= MAX_NESTING {
            return Err(HistoryError::decode(format!(
                "object {} nests more than {} levels below object {}",
                oid, MAX_NESTING, self.oid
            )));
        }
        let kind = self.store.kind(oid)?;
        let state = self.load_raw(oid)?;
        let child = DecodeContext {
            store: self.store,
            registry: self.registry,
            oid,
            kind: &kind,
            marker: self.marker,
            limits: self.limits,
            depth: self.depth + 1,
        };
        self.registry.lookup(&kind, state.shape()).decode(&child, &state)
    }
}

type DecoderKey = (Option<ObjectKind>, Option<Shape>);

/// Decoder table keyed on (declared kind, payload shape).
#[derive(Clone, Default)]
pub struct DecoderRegistry {
    decoders: HashMap<DecoderKey, Arc<dyn StateDecoder>>,
}

impl DecoderRegistry {
    /// Empty registry. The built-in mapping and fallback decoders still apply.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with decoders for every built-in kind.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();

        registry.register(Some(ObjectKind::CHAINED_MAP), Some(Shape::Sequence), ChainedMapState);
        registry.register(Some(ObjectKind::CHAINED_MAP), Some(Shape::None), ChainedMapState);
        registry.register(Some(ObjectKind::CHAINED_LEAF), Some(Shape::Sequence), ChainedLeafState);
        registry.register(Some(ObjectKind::CHAINED_LEAF), Some(Shape::None), ChainedLeafState);

        registry.register(
            Some(ObjectKind::PERSISTENT_MAPPING),
            Some(Shape::Mapping),
            PersistentMappingState,
        );
        registry.register(
            Some(ObjectKind::PERSISTENT_DICT),
            Some(Shape::Mapping),
            PersistentMappingState,
        );
        registry.register(
            Some(ObjectKind::PERSISTENT_LIST),
            Some(Shape::Mapping),
            PersistentListState,
        );
        registry.register(
            Some(ObjectKind::FOLDER),
            Some(Shape::Mapping),
            SubMapContainerState::new("data"),
        );
        registry.register(
            Some(ObjectKind::BTREE_CONTAINER),
            Some(Shape::Mapping),
            SubMapContainerState::new("_SampleContainer__data"),
        );
        registry.register(
            Some(ObjectKind::SAMPLE_CONTAINER),
            Some(Shape::Mapping),
            SubMapContainerState::new("_SampleContainer__data"),
        );
        registry.register(
            Some(ObjectKind::ORDERED_CONTAINER),
            Some(Shape::Mapping),
            OrderedContainerState,
        );

        registry
    }

    /// Registers `decoder` for a key. `None` on either side matches anything.
    pub fn register<D>(&mut self, kind: Option<ObjectKind>, shape: Option<Shape>, decoder: D)
    where
        D: StateDecoder + 'static,
    {
        self.decoders.insert((kind, shape), Arc::new(decoder));
    }

    pub fn len(&self) -> usize {
        self.decoders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decoders.is_empty()
    }

    /// The decoder that handles `(kind, shape)`. Never fails.
    pub fn lookup(&self, kind: &ObjectKind, shape: Shape) -> &dyn StateDecoder {
        let kind = Some(kind.clone());
        let candidates = [
            (kind.clone(), Some(shape)),
            (kind, None),
            (None, Some(shape)),
            (None, None),
        ];
        for key in &candidates {
            if let Some(decoder) = self.decoders.get(key) {
                return decoder.as_ref();
            }
        }
        match shape {
            Shape::Mapping => &MAPPING_STATE,
            _ => &FALLBACK_STATE,
        }
    }

    /// Decodes one payload.
    ///
    /// `Decode` and `NotFoundAtRevision` failures are captured in the
    /// returned state; storage failures propagate.
    pub fn decode(&self, ctx: &DecodeContext<'_>, state: &RawState) -> HistoryResult<InterpretedState> {
        match self.lookup(ctx.kind(), state.shape()).decode(ctx, state) {
            Ok(interpreted) => Ok(interpreted),
            Err(err) if err.is_recoverable_in_decode() => {
                let oid = ctx.oid().to_string();
                let code = err.code();
                let reason = err.to_string();
                log_event_with_fields(
                    Event::DecodeFailed,
                    &[("code", code), ("oid", oid.as_str()), ("reason", reason.as_str())],
                );
                Ok(InterpretedState::failed(reason))
            }
            Err(err) => Err(err),
        }
    }
}

impl fmt::Debug for DecoderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<String> = self
            .decoders
            .keys()
            .map(|(kind, shape)| {
                format!(
                    "{}/{}",
                    kind.as_ref().map(ObjectKind::as_str).unwrap_or("*"),
                    shape.map(|s| format!("{:?}", s)).unwrap_or_else(|| "*".to_string())
                )
            })
            .collect();
        keys.sort();
        f.debug_struct("DecoderRegistry").field("decoders", &keys).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TransactionMeta;
    use crate::store::MemoryStore;

    fn tagged(tag: &'static str) -> impl StateDecoder {
        move |_: &DecodeContext<'_>, _: &RawState| {
            Ok(InterpretedState::from_items(Vec::new()).with_name(tag))
        }
    }

    fn decode_with(registry: &DecoderRegistry, kind: ObjectKind, state: RawState) -> InterpretedState {
        let store = MemoryStore::new();
        let ctx = DecodeContext::new(
            &store,
            registry,
            ObjectId::new(1),
            &kind,
            None,
            DecodeLimits::default(),
        );
        registry.decode(&ctx, &state).unwrap()
    }

    #[test]
    fn test_unregistered_mapping_uses_mapping_state() {
        let registry = DecoderRegistry::new();
        let state = RawState::mapping([(RawState::str("__name__"), RawState::str("x"))]);

        let decoded = decode_with(&registry, ObjectKind::new("custom"), state);
        assert_eq!(decoded.name(), Some("x"));
        assert!(decoded.error().is_none());
    }

    #[test]
    fn test_unregistered_scalar_uses_fallback() {
        let registry = DecoderRegistry::new();

        let decoded = decode_with(&registry, ObjectKind::OBJECT, RawState::int(7));
        assert!(decoded.error().is_none());
        assert_eq!(decoded.attributes().unwrap().len(), 1);
    }

    #[test]
    fn test_lookup_precedence() {
        let mut registry = DecoderRegistry::new();
        registry.register(None, None, tagged("any"));
        registry.register(None, Some(Shape::Scalar), tagged("any-scalar"));
        registry.register(Some(ObjectKind::new("k")), None, tagged("k-any"));
        registry.register(Some(ObjectKind::new("k")), Some(Shape::Scalar), tagged("k-scalar"));

        let k = ObjectKind::new("k");
        let other = ObjectKind::new("other");
        assert_eq!(decode_with(&registry, k.clone(), RawState::int(1)).name(), Some("k-scalar"));
        assert_eq!(decode_with(&registry, k, RawState::None).name(), Some("k-any"));
        assert_eq!(decode_with(&registry, other.clone(), RawState::int(1)).name(), Some("any-scalar"));
        assert_eq!(decode_with(&registry, other, RawState::None).name(), Some("any"));
    }

    #[test]
    fn test_last_registration_wins() {
        let mut registry = DecoderRegistry::new();
        registry.register(None, None, tagged("first"));
        registry.register(None, None, tagged("second"));

        assert_eq!(registry.len(), 1);
        assert_eq!(
            decode_with(&registry, ObjectKind::OBJECT, RawState::None).name(),
            Some("second")
        );
    }

    #[test]
    fn test_decode_errors_are_folded() {
        let mut registry = DecoderRegistry::new();
        registry.register(None, None, |_: &DecodeContext<'_>, _: &RawState| {
            Err(HistoryError::decode("broken link"))
        });

        let decoded = decode_with(&registry, ObjectKind::OBJECT, RawState::None);
        assert!(decoded.error().unwrap().contains("broken link"));
    }

    #[test]
    fn test_storage_errors_propagate() {
        let mut registry = DecoderRegistry::new();
        registry.register(None, None, |_: &DecodeContext<'_>, _: &RawState| {
            Err(HistoryError::storage_io("disk gone"))
        });
        let store = MemoryStore::new();
        let kind = ObjectKind::OBJECT;
        let ctx = DecodeContext::new(&store, &registry, ObjectId::new(1), &kind, None, DecodeLimits::default());

        let err = registry.decode(&ctx, &RawState::None).unwrap_err();
        assert!(err.is_storage());
    }

    #[test]
    fn test_self_referencing_container_hits_nesting_bound() {
        let store = MemoryStore::new();
        let folder = store.add_object(ObjectKind::FOLDER).unwrap();
        store
            .record(
                RevisionMarker::new(1),
                TransactionMeta::default(),
                vec![(folder, RawState::mapping([(RawState::str("data"), RawState::reference(folder))]))],
            )
            .unwrap();

        let registry = DecoderRegistry::with_defaults();
        let kind = ObjectKind::FOLDER;
        let ctx = DecodeContext::new(&store, &registry, folder, &kind, None, DecodeLimits::default());
        let state = ctx.load_raw(folder).unwrap();

        let decoded = registry.decode(&ctx, &state).unwrap();
        assert!(decoded.is_error());
    }

    #[test]
    fn test_debug_lists_keys() {
        let registry = DecoderRegistry::with_defaults();
        let rendered = format!("{:?}", registry);
        assert!(rendered.contains("chained_map/Sequence"));
    }
}
