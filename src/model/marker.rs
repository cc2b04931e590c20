//! RevisionMarker and ObjectId - opaque identities
//!
//! A revision marker totally orders the transactions of a store. Markers are
//! assigned by the storage layer, never by this crate, so every caller
//! observes the same ordering for the same object.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A totally ordered, opaque transaction marker.
///
/// Used both as the key of a revision and as a "point in time" query bound.
/// The fixed-width big-endian byte form sorts lexicographically in the same
/// order as the numeric form.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RevisionMarker(u64);

impl RevisionMarker {
    /// Creates a marker from its numeric value.
    #[inline]
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the underlying value.
    #[inline]
    pub fn value(&self) -> u64 {
        self.0
    }

    /// Creates a marker from its 8-byte big-endian form.
    #[inline]
    pub fn from_bytes(bytes: [u8; 8]) -> Self {
        Self(u64::from_be_bytes(bytes))
    }

    /// Returns the 8-byte big-endian form.
    #[inline]
    pub fn to_bytes(&self) -> [u8; 8] {
        self.0.to_be_bytes()
    }
}

impl fmt::Display for RevisionMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016x}", self.0)
    }
}

/// Stable identity of a stored object.
///
/// Two identities are equal iff their ids are equal. The owning store is
/// always passed alongside, never embedded.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(u64);

impl ObjectId {
    #[inline]
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    #[inline]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
