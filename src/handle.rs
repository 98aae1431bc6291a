use std::{collections::HashSet, sync::Arc};

use crate::{host::ObjectId, registry::TypeKey};

/// Whether a lookup may materialize a handle for a host-known id, or must
/// only return already-cached entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    KnownOnly,
    Materialize,
}

/// Cached facade instance for one host-side overlay.
#[derive(Debug)]
pub struct OverlayHandle {
    pub id: ObjectId,
    pub type_key: TypeKey,
    pub tag: Arc<str>,
}

/// Cached facade instance for one host-side panel.
#[derive(Debug)]
pub struct PanelHandle {
    pub id: ObjectId,
}

/// An id resolved to either side of the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneObject {
    Overlay(ObjectId),
    Panel(ObjectId),
}

impl SceneObject {
    pub const fn id(self) -> ObjectId {
        match self {
            Self::Overlay(id) | Self::Panel(id) => id,
        }
    }
}

/// Caller-curated id set that restricts the already-known check of a
/// resolve, without blocking materialization into the live cache.
#[derive(Debug, Default, Clone)]
pub struct SearchSet(HashSet<ObjectId>);

impl SearchSet {
    pub fn from_ids<I: IntoIterator<Item = ObjectId>>(ids: I) -> Self {
        Self(ids.into_iter().collect())
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.0.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<ObjectId> for SearchSet {
    fn from_iter<I: IntoIterator<Item = ObjectId>>(ids: I) -> Self {
        Self::from_ids(ids)
    }
}
