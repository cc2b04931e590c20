//! Chained ordered maps
//!
//! A chained map is one spine node plus zero or more leaf nodes, each
//! versioned on its own. Payload layouts:
//!
//! - spine, empty: `None` or `[]`
//! - spine, inline: `[[k1, v1, k2, v2, ...]]`
//! - spine, chained: `[index, Ref(first_leaf)]` (the index is ignored)
//! - leaf: `[[k1, v1, ...]]` or `[[k1, v1, ...], Ref(next_leaf)]`
//!
//! Reconstruction at a marker reads each leaf's own revision at or before
//! that marker and builds fresh values from it. Live leaf state is never read
//! or written, so a read cannot leave a live node altered.

use std::collections::HashSet;

use crate::errors::{HistoryError, HistoryResult};
use crate::model::{ObjectId, RawState};

use super::{DecodeContext, InterpretedState, StateDecoder};

type Entries = Vec<(RawState, RawState)>;

/// Parsed payload of one spine or leaf node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChainNode {
    pub entries: Entries,
    pub next: Option<ObjectId>,
}

/// Reference to the next node, from either a spine or a leaf payload.
pub(crate) fn next_link(state: &RawState) -> HistoryResult<Option<ObjectId>> {
    match state {
        RawState::None => Ok(None),
        RawState::Sequence(parts) => match parts.as_slice() {
            [] | [_] => Ok(None),
            [_, RawState::Reference(next)] => Ok(Some(*next)),
            [_, other] => Err(HistoryError::decode(format!(
                "chain link is a {}, expected reference",
                other.type_name()
            ))),
            _ => Err(HistoryError::decode(format!(
                "chain node has {} parts, expected at most 2",
                parts.len()
            ))),
        },
        other => Err(HistoryError::decode(format!(
            "chain node is a {}, expected sequence",
            other.type_name()
        ))),
    }
}

/// Parses a spine payload. Chained spines carry no entries of their own.
pub fn parse_spine(state: &RawState) -> HistoryResult<ChainNode> {
    let next = next_link(state)?;
    if next.is_some() {
        return Ok(ChainNode { entries: Vec::new(), next });
    }
    match state.as_sequence() {
        Some([inline]) => Ok(ChainNode {
            entries: pairs(inline)?,
            next: None,
        }),
        _ => Ok(ChainNode::default()),
    }
}

/// Parses a leaf payload.
pub fn parse_leaf(state: &RawState) -> HistoryResult<ChainNode> {
    let next = next_link(state)?;
    let entries = match state.as_sequence().and_then(<[RawState]>::first) {
        Some(inline) => pairs(inline)?,
        None => Vec::new(),
    };
    Ok(ChainNode { entries, next })
}

/// Splits a flat `[k1, v1, k2, v2, ...]` list into pairs.
fn pairs(inline: &RawState) -> HistoryResult<Entries> {
    let flat = inline.as_sequence().ok_or_else(|| {
        HistoryError::decode(format!(
            "chain entries are a {}, expected sequence",
            inline.type_name()
        ))
    })?;
    if flat.len() % 2 != 0 {
        return Err(HistoryError::decode(format!(
            "chain entries have odd length {}",
            flat.len()
        )));
    }
    Ok(flat
        .chunks_exact(2)
        .map(|pair| (pair[0].clone(), pair[1].clone()))
        .collect())
}

/// Flattened entries of a chained map at the context's target marker, in
/// chain order.
///
/// Any leaf that is missing at the marker or malformed fails the whole map.
pub fn reconstruct(ctx: &DecodeContext<'_>, spine: &RawState) -> HistoryResult<Entries> {
    let spine = parse_spine(spine)?;
    let mut entries = spine.entries;
    let mut cursor = spine.next;
    let mut visited = HashSet::new();
    let max_leaves = ctx.limits().max_chain_length;

    while let Some(leaf) = cursor {
        if !visited.insert(leaf) {
            return Err(HistoryError::decode(format!(
                "chain of object {} loops back to leaf {}",
                ctx.oid(),
                leaf
            )));
        }
        if visited.len() > max_leaves {
            return Err(HistoryError::decode(format!(
                "chain of object {} exceeds {} leaves",
                ctx.oid(),
                max_leaves
            )));
        }

        let state = ctx.load_raw(leaf)?;
        let node = parse_leaf(&state)
            .map_err(|e| HistoryError::decode(format!("leaf {}: {}", leaf, e)))?;
        entries.extend(node.entries);
        cursor = node.next;
    }

    Ok(entries)
}

/// Spine decoder: items are the flattened entries of the whole chain.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChainedMapState;

impl StateDecoder for ChainedMapState {
    fn decode(&self, ctx: &DecodeContext<'_>, state: &RawState) -> HistoryResult<InterpretedState> {
        Ok(InterpretedState::from_items(reconstruct(ctx, state)?))
    }
}

/// Leaf decoder: items are the leaf's own entries only.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChainedLeafState;

impl StateDecoder for ChainedLeafState {
    fn decode(&self, _ctx: &DecodeContext<'_>, state: &RawState) -> HistoryResult<InterpretedState> {
        Ok(InterpretedState::from_items(parse_leaf(state)?.entries))
    }
}
