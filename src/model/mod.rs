//! Data model shared by every subsystem
//!
//! This module provides:
//! - `RevisionMarker` - Totally ordered transaction marker
//! - `ObjectId` - Stable object identity
//! - `ObjectKind` - Declared type tag used for decoder dispatch
//! - `Revision` - Immutable per-object revision metadata
//! - `RawState` - Dynamically typed payload of one revision
//! - `TransactionRecord` / `TransactionMeta` - Store-wide transactions

mod kind;
mod marker;
mod revision;
mod state;

pub use kind::ObjectKind;
pub use marker::{ObjectId, RevisionMarker};
pub use revision::{Revision, TransactionMeta, TransactionRecord};
pub use state::{RawState, Shape, NAME_KEY, PARENT_KEY};
