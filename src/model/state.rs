//! RawState - decoded but not yet interpreted payload of one revision
//!
//! The derived ordering compares the variant first and the contents second.
//! Keys of heterogeneous types therefore never need to be compared with each
//! other: same-typed keys group together and sort naturally within a group.
//! Mapping keys and diff output both rely on this order.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::ObjectId;

/// Attribute key holding an object's name in a mapping payload.
pub const NAME_KEY: &str = "__name__";

/// Attribute key holding a reference to an object's parent.
pub const PARENT_KEY: &str = "__parent__";

/// A dynamically typed value tree.
///
/// `None`, `Bool`, `Int`, `Bytes` and `Str` are scalars. References compare
/// by object id only; they are never dereferenced for equality.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RawState {
    None,
    Bool(bool),
    Int(i64),
    Bytes(Vec<u8>),
    Str(String),
    Sequence(Vec<RawState>),
    Mapping(#[serde(with = "mapping_pairs")] BTreeMap<RawState, RawState>),
    Reference(ObjectId),
}

/// Structural shape of a payload, the second half of a decoder dispatch key.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Shape {
    Mapping,
    Sequence,
    Scalar,
    None,
}

impl RawState {
    pub fn str(value: impl Into<String>) -> Self {
        RawState::Str(value.into())
    }

    pub fn int(value: i64) -> Self {
        RawState::Int(value)
    }

    pub fn reference(oid: ObjectId) -> Self {
        RawState::Reference(oid)
    }

    /// Builds a mapping from key/value pairs. Later duplicates win.
    pub fn mapping<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (RawState, RawState)>,
    {
        RawState::Mapping(pairs.into_iter().collect())
    }

    pub fn sequence<I>(values: I) -> Self
    where
        I: IntoIterator<Item = RawState>,
    {
        RawState::Sequence(values.into_iter().collect())
    }

    /// Empty mapping.
    pub fn empty_mapping() -> Self {
        RawState::Mapping(BTreeMap::new())
    }

    pub fn shape(&self) -> Shape {
        match self {
            RawState::None => Shape::None,
            RawState::Mapping(_) => Shape::Mapping,
            RawState::Sequence(_) => Shape::Sequence,
            RawState::Bool(_)
            | RawState::Int(_)
            | RawState::Bytes(_)
            | RawState::Str(_)
            | RawState::Reference(_) => Shape::Scalar,
        }
    }

    /// Short name of the variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            RawState::None => "none",
            RawState::Bool(_) => "bool",
            RawState::Int(_) => "int",
            RawState::Bytes(_) => "bytes",
            RawState::Str(_) => "str",
            RawState::Sequence(_) => "sequence",
            RawState::Mapping(_) => "mapping",
            RawState::Reference(_) => "reference",
        }
    }

    pub fn as_mapping(&self) -> Option<&BTreeMap<RawState, RawState>> {
        match self {
            RawState::Mapping(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[RawState]> {
        match self {
            RawState::Sequence(values) => Some(values),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<ObjectId> {
        match self {
            RawState::Reference(oid) => Some(*oid),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            RawState::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Looks up a string-keyed attribute of a mapping payload.
    pub fn get(&self, key: &str) -> Option<&RawState> {
        // Allocation only happens for mapping payloads.
        self.as_mapping()
            .and_then(|map| map.get(&RawState::Str(key.to_string())))
    }

    /// True for `None`, empty sequences and empty mappings.
    pub fn is_empty(&self) -> bool {
        match self {
            RawState::None => true,
            RawState::Sequence(values) => values.is_empty(),
            RawState::Mapping(map) => map.is_empty(),
            _ => false,
        }
    }
}

impl From<&str> for RawState {
    fn from(value: &str) -> Self {
        RawState::Str(value.to_string())
    }
}

impl From<String> for RawState {
    fn from(value: String) -> Self {
        RawState::Str(value)
    }
}

impl From<i64> for RawState {
    fn from(value: i64) -> Self {
        RawState::Int(value)
    }
}

impl From<bool> for RawState {
    fn from(value: bool) -> Self {
        RawState::Bool(value)
    }
}

impl From<ObjectId> for RawState {
    fn from(value: ObjectId) -> Self {
        RawState::Reference(value)
    }
}

/// Mappings with non-string keys serialize as a list of `[key, value]` pairs.
mod mapping_pairs {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Deserializer, Serializer};

    use super::RawState;

    pub fn serialize<S>(map: &BTreeMap<RawState, RawState>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(map.iter())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<BTreeMap<RawState, RawState>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let pairs: Vec<(RawState, RawState)> = Vec::deserialize(deserializer)?;
        Ok(pairs.into_iter().collect())
    }
}
