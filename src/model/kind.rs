//! ObjectKind - declared type tag of a stored object

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Declared kind of an object, supplied by the storage layer.
///
/// Together with the payload [`Shape`](super::Shape) it forms the decoder
/// dispatch key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectKind(Cow<'static, str>);

impl ObjectKind {
    /// Plain object whose payload is an attribute mapping.
    pub const OBJECT: ObjectKind = ObjectKind::from_static("object");
    /// Spine node of a chained ordered map.
    pub const CHAINED_MAP: ObjectKind = ObjectKind::from_static("chained_map");
    /// Leaf node of a chained ordered map.
    pub const CHAINED_LEAF: ObjectKind = ObjectKind::from_static("chained_leaf");
    /// Mapping whose entries live under its `data` attribute.
    pub const PERSISTENT_MAPPING: ObjectKind = ObjectKind::from_static("persistent_mapping");
    /// Dictionary whose entries live under its `data` attribute.
    pub const PERSISTENT_DICT: ObjectKind = ObjectKind::from_static("persistent_dict");
    /// List whose values live under its `data` attribute.
    pub const PERSISTENT_LIST: ObjectKind = ObjectKind::from_static("persistent_list");
    /// Container keeping its entries in a chained map under `data`.
    pub const FOLDER: ObjectKind = ObjectKind::from_static("folder");
    /// Container keeping its entries in a chained map under `_SampleContainer__data`.
    pub const BTREE_CONTAINER: ObjectKind = ObjectKind::from_static("btree_container");
    /// Container keeping its entries in a persistent dict under `_SampleContainer__data`.
    pub const SAMPLE_CONTAINER: ObjectKind = ObjectKind::from_static("sample_container");
    /// Container with separate `_data` mapping and `_order` list.
    pub const ORDERED_CONTAINER: ObjectKind = ObjectKind::from_static("ordered_container");

    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
