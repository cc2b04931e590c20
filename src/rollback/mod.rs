//! Rollback
//!
//! Restores an object's live state to a historical revision.
//!
//! # Guarantees
//!
//! 1. Rolling back to the state the object already has changes nothing
//! 2. A chained map's leaves are restored by walking the chain as it was at
//!    the target revision, not the chain that is live now
//! 3. The engine stages changes only, into a unit of work owned by the
//!    caller, which commits them or discards them all on failure
//! 4. Each staged write carries the head it was based on; a revision written
//!    by someone else before commit is a `RollbackConflict`

mod engine;

pub use engine::{RollbackEngine, RollbackOutcome};
