//! objscope - History inspector for versioned object stores
//!
//! Lists the revisions of an object, decodes any revision into a uniform
//! attribute/item view, diffs revisions and rolls live state back to a
//! historical revision. Reading history never alters live objects.

pub mod config;
pub mod decode;
pub mod diff;
pub mod errors;
pub mod history;
pub mod inspector;
pub mod model;
pub mod observability;
pub mod rollback;
pub mod store;

pub use config::InspectorConfig;
pub use decode::{DecoderRegistry, InterpretedState};
pub use diff::{diff_maps, diff_sequences, DiffEntry, DiffKind};
pub use errors::{HistoryError, HistoryResult};
pub use inspector::{ChangelogEntry, Inspector, PathSegment, RollbackReport};
pub use model::{ObjectId, ObjectKind, RawState, Revision, RevisionMarker};
