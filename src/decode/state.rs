//! InterpretedState - uniform view over a decoded revision

use std::collections::BTreeMap;

use crate::model::{ObjectId, RawState, NAME_KEY, PARENT_KEY};

/// Uniform attribute/item view produced by every decoder.
///
/// When decoding failed, `error()` is set and every other accessor returns
/// None or an empty map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterpretedState {
    name: Option<String>,
    parent: Option<ObjectId>,
    attributes: Option<Vec<(RawState, RawState)>>,
    items: Option<Vec<(RawState, RawState)>>,
    flat: BTreeMap<RawState, RawState>,
    error: Option<String>,
}

impl InterpretedState {
    /// An attribute bag. Name and parent come from the well-known keys.
    pub fn from_mapping(map: &BTreeMap<RawState, RawState>) -> Self {
        let name_key = RawState::str(NAME_KEY);
        let parent_key = RawState::str(PARENT_KEY);

        Self {
            name: map.get(&name_key).and_then(RawState::as_str).map(str::to_string),
            parent: map.get(&parent_key).and_then(RawState::as_reference),
            attributes: Some(map.iter().map(|(k, v)| (k.clone(), v.clone())).collect()),
            items: None,
            flat: map.clone(),
            error: None,
        }
    }

    /// A container with items only. Item order is kept as given.
    pub fn from_items(items: Vec<(RawState, RawState)>) -> Self {
        Self {
            flat: items.iter().cloned().collect(),
            items: Some(items),
            ..Self::default()
        }
    }

    /// A revision that could not be decoded.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }

    /// Adds items to an attribute bag. The flat map stays the attributes.
    pub fn with_items(mut self, items: Vec<(RawState, RawState)>) -> Self {
        if self.attributes.is_none() {
            self.flat = items.iter().cloned().collect();
        }
        self.items = Some(items);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn parent(&self) -> Option<ObjectId> {
        self.parent
    }

    /// None when this kind has no concept of attributes.
    pub fn attributes(&self) -> Option<&[(RawState, RawState)]> {
        self.attributes.as_deref()
    }

    /// None when this kind is not container-like.
    pub fn items(&self) -> Option<&[(RawState, RawState)]> {
        self.items.as_deref()
    }

    /// Single map used for diffing: the attributes when present, otherwise
    /// the items.
    pub fn as_flat_map(&self) -> &BTreeMap<RawState, RawState> {
        &self.flat
    }

    pub fn flat_state(&self) -> RawState {
        RawState::Mapping(self.flat.clone())
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}
