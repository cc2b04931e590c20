//! Kind-agnostic decoders used when nothing more specific is registered

use std::collections::BTreeMap;

use crate::errors::{HistoryError, HistoryResult};
use crate::model::RawState;

use super::{DecodeContext, InterpretedState, StateDecoder};

/// Synthetic attribute name under which `FallbackState` exposes a payload.
pub const RAW_STATE_KEY: &str = "raw state";

/// Treats a mapping payload as an attribute bag.
#[derive(Debug, Default, Clone, Copy)]
pub struct MappingState;

impl StateDecoder for MappingState {
    fn decode(&self, ctx: &DecodeContext<'_>, state: &RawState) -> HistoryResult<InterpretedState> {
        let map = state.as_mapping().ok_or_else(|| {
            HistoryError::decode(format!(
                "object {} of kind {} holds a {}, expected mapping",
                ctx.oid(),
                ctx.kind(),
                state.type_name()
            ))
        })?;
        Ok(InterpretedState::from_mapping(map))
    }
}

/// Exposes any payload as a single synthetic attribute. Never fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct FallbackState;

impl StateDecoder for FallbackState {
    fn decode(&self, _ctx: &DecodeContext<'_>, state: &RawState) -> HistoryResult<InterpretedState> {
        let attributes = BTreeMap::from([(RawState::str(RAW_STATE_KEY), state.clone())]);
        Ok(InterpretedState::from_mapping(&attributes))
    }
}
