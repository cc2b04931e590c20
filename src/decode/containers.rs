//! Decoders for container kinds
//!
//! Every container keeps its mapping payload as attributes (and therefore as
//! its flat map for diffing) and adds an item list:
//!
//! - `PersistentMappingState`: sorted contents of the `data` mapping, for
//!   persistent mappings and dicts alike
//! - `PersistentListState`: `(index, value)` pairs of the `data` sequence
//! - `SubMapContainerState`: items of the object referenced by one attribute
//!   (a chained map or a persistent dict), decoded at the same marker
//! - `OrderedContainerState`: `_data` entries in the order listed by `_order`

use std::collections::BTreeMap;

use crate::errors::{HistoryError, HistoryResult};
use crate::model::RawState;

use super::{DecodeContext, InterpretedState, StateDecoder};

type Entries = Vec<(RawState, RawState)>;

fn attribute_bag<'s>(
    ctx: &DecodeContext<'_>,
    state: &'s RawState,
) -> HistoryResult<&'s BTreeMap<RawState, RawState>> {
    state.as_mapping().ok_or_else(|| {
        HistoryError::decode(format!(
            "object {} of kind {} holds a {}, expected mapping",
            ctx.oid(),
            ctx.kind(),
            state.type_name()
        ))
    })
}

fn unexpected(ctx: &DecodeContext<'_>, attribute: &str, found: &RawState, expected: &str) -> HistoryError {
    HistoryError::decode(format!(
        "'{}' of object {} is a {}, expected {}",
        attribute,
        ctx.oid(),
        found.type_name(),
        expected
    ))
}

/// Items of the object referenced by `attribute`, decoded at the same marker.
///
/// A missing or `None` attribute yields no items.
fn referenced_items(ctx: &DecodeContext<'_>, state: &RawState, attribute: &str) -> HistoryResult<Entries> {
    match state.get(attribute) {
        None | Some(RawState::None) => Ok(Vec::new()),
        Some(RawState::Reference(oid)) => {
            let decoded = ctx.decode_object(*oid)?;
            match decoded.error() {
                Some(err) => Err(HistoryError::decode(format!(
                    "'{}' of object {}: {}",
                    attribute,
                    ctx.oid(),
                    err
                ))),
                None => Ok(decoded.items().map(<[_]>::to_vec).unwrap_or_default()),
            }
        }
        Some(other) => Err(unexpected(ctx, attribute, other, "reference")),
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PersistentMappingState;

impl StateDecoder for PersistentMappingState {
    fn decode(&self, ctx: &DecodeContext<'_>, state: &RawState) -> HistoryResult<InterpretedState> {
        let attributes = attribute_bag(ctx, state)?;
        let items = match state.get("data") {
            None => Vec::new(),
            Some(RawState::Mapping(data)) => data.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            Some(other) => return Err(unexpected(ctx, "data", other, "mapping")),
        };
        Ok(InterpretedState::from_mapping(attributes).with_items(items))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PersistentListState;

impl StateDecoder for PersistentListState {
    fn decode(&self, ctx: &DecodeContext<'_>, state: &RawState) -> HistoryResult<InterpretedState> {
        let attributes = attribute_bag(ctx, state)?;
        let items = match state.get("data") {
            None => Vec::new(),
            Some(RawState::Sequence(values)) => values
                .iter()
                .enumerate()
                .map(|(i, v)| (RawState::int(i as i64), v.clone()))
                .collect(),
            Some(other) => return Err(unexpected(ctx, "data", other, "sequence")),
        };
        Ok(InterpretedState::from_mapping(attributes).with_items(items))
    }
}

/// Container whose entries live in a separate object.
#[derive(Debug, Clone, Copy)]
pub struct SubMapContainerState {
    attribute: &'static str,
}

impl SubMapContainerState {
    pub const fn new(attribute: &'static str) -> Self {
        Self { attribute }
    }

    pub fn attribute(&self) -> &'static str {
        self.attribute
    }
}

impl StateDecoder for SubMapContainerState {
    fn decode(&self, ctx: &DecodeContext<'_>, state: &RawState) -> HistoryResult<InterpretedState> {
        let attributes = attribute_bag(ctx, state)?;
        let items = referenced_items(ctx, state, self.attribute)?;
        Ok(InterpretedState::from_mapping(attributes).with_items(items))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct OrderedContainerState;

impl StateDecoder for OrderedContainerState {
    fn decode(&self, ctx: &DecodeContext<'_>, state: &RawState) -> HistoryResult<InterpretedState> {
        let attributes = attribute_bag(ctx, state)?;
        let data: BTreeMap<RawState, RawState> = referenced_items(ctx, state, "_data")?.into_iter().collect();
        let order = referenced_items(ctx, state, "_order")?;

        let items = order
            .into_iter()
            .map(|(_, key)| match data.get(&key) {
                Some(value) => Ok((key, value.clone())),
                None => Err(HistoryError::decode(format!(
                    "key {:?} of object {} is ordered but has no value",
                    key,
                    ctx.oid()
                ))),
            })
            .collect::<HistoryResult<Entries>>()?;

        Ok(InterpretedState::from_mapping(attributes).with_items(items))
    }
}
