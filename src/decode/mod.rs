//! State decoding
//!
//! This module provides:
//! - `InterpretedState` - Uniform attribute/item view of one revision
//! - `DecoderRegistry` - Dispatch on (declared kind, payload shape)
//! - Generic decoders (`MappingState`, `FallbackState`)
//! - Container decoders (persistent mapping/list, folders, ordered containers)
//! - `chained` - Point-in-time reconstruction of chained ordered maps
//!
//! # Principles
//!
//! 1. Decoding never mutates the store; decoders only see `ObjectStore`
//! 2. Unknown shapes are not errors; they fall back to `FallbackState`
//! 3. Structural inconsistencies end up in `InterpretedState::error()`

pub mod chained;
mod containers;
mod generic;
mod registry;
mod state;

pub use chained::{ChainNode, ChainedLeafState, ChainedMapState};
pub use containers::{OrderedContainerState, PersistentListState, PersistentMappingState, SubMapContainerState};
pub use generic::{FallbackState, MappingState, RAW_STATE_KEY};
pub use registry::{DecodeContext, DecodeLimits, DecoderRegistry, StateDecoder};
pub use state::InterpretedState;
