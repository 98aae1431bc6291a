use std::{collections::HashMap, sync::Arc};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Registration happens once at startup; any of these indicates a broken
/// type catalog, not a runtime condition to recover from.
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("overlay type tag {0:?} is already registered")]
    DuplicateTypeTag(Arc<str>),
    #[error("property {0:?} is already defined by an ancestor")]
    DuplicatePropertyName(Arc<str>),
    #[error("type {0:?} is declared more than once")]
    DuplicateTypeName(Arc<str>),
    #[error("property group {0:?} is declared more than once")]
    DuplicateGroupName(Arc<str>),
    #[error("unknown parent type {0:?}")]
    UnknownParentType(Arc<str>),
    #[error("unknown property group {0:?}")]
    UnknownPropertyGroup(Arc<str>),
}

/// Index of a descriptor inside its registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeKey(usize);

/// One level of the overlay type hierarchy.
///
/// Concrete descriptors carry a tag and can be reached from a host-reported
/// type string; abstract ones exist only to be extended and cannot be
/// instantiated through the facade.
#[derive(Debug)]
pub struct TypeDescriptor {
    tag: Option<Arc<str>>,
    parent: Option<TypeKey>,
    own_props: Vec<Arc<str>>,
    effective: Vec<Arc<str>>,
    panel_attachable: bool,
}

impl TypeDescriptor {
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub const fn is_abstract(&self) -> bool {
        self.tag.is_none()
    }

    pub const fn parent(&self) -> Option<TypeKey> {
        self.parent
    }

    /// Property names introduced at this level only.
    pub fn own_properties(&self) -> &[Arc<str>] {
        &self.own_props
    }

    /// Full property set in ancestor-then-self order.
    pub fn properties(&self) -> &[Arc<str>] {
        &self.effective
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.effective.iter().any(|p| p.as_ref() == name)
    }

    pub const fn is_panel_attachable(&self) -> bool {
        self.panel_attachable
    }
}

/// Everything needed to register one type level.
///
/// Property-group composition happens before this point: callers union a
/// level's own names with the groups it opts into and pass one flat list.
#[derive(Debug, Default)]
pub struct TypeSpec {
    pub parent: Option<TypeKey>,
    /// `None` registers an abstract level.
    pub tag: Option<Arc<str>>,
    pub properties: Vec<Arc<str>>,
    pub panel_attachable: bool,
}

/// Descriptor arena plus the tag map used for host-reported type discovery.
/// Also holds the property schema of the single panel kind, which goes
/// through the same duplicate validation as overlay types.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: Vec<TypeDescriptor>,
    by_tag: HashMap<Arc<str>, TypeKey>,
    panel_props: Vec<Arc<str>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type level under `spec.parent` (or as a root).
    pub fn define(&mut self, spec: TypeSpec) -> Result<TypeKey, RegistryError> {
        let mut effective = match spec.parent {
            Some(parent) => self.get(parent).effective.clone(),
            None => Vec::new(),
        };
        for name in &spec.properties {
            if effective.iter().any(|p| p == name) {
                return Err(RegistryError::DuplicatePropertyName(name.clone()));
            }
            effective.push(name.clone());
        }

        if let Some(tag) = &spec.tag {
            if self.by_tag.contains_key(tag) {
                return Err(RegistryError::DuplicateTypeTag(tag.clone()));
            }
        }

        let panel_attachable = spec.panel_attachable
            || spec
                .parent
                .is_some_and(|p| self.get(p).panel_attachable);

        let key = TypeKey(self.types.len());
        self.types.push(TypeDescriptor {
            tag: spec.tag.clone(),
            parent: spec.parent,
            own_props: spec.properties,
            effective,
            panel_attachable,
        });
        if let Some(tag) = spec.tag {
            log::debug!("registered overlay type {tag:?} with {key:?}");
            self.by_tag.insert(tag, key);
        }
        Ok(key)
    }

    pub fn set_panel_schema(&mut self, props: Vec<Arc<str>>) -> Result<(), RegistryError> {
        let mut seen: Vec<&Arc<str>> = Vec::with_capacity(props.len());
        for name in &props {
            if seen.iter().any(|p| *p == name) {
                return Err(RegistryError::DuplicatePropertyName(name.clone()));
            }
            seen.push(name);
        }
        self.panel_props = props;
        Ok(())
    }

    pub fn get(&self, key: TypeKey) -> &TypeDescriptor {
        &self.types[key.0]
    }

    pub fn by_tag(&self, tag: &str) -> Option<TypeKey> {
        self.by_tag.get(tag).copied()
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.by_tag.keys().map(AsRef::as_ref)
    }

    pub fn concrete_count(&self) -> usize {
        self.by_tag.len()
    }

    pub fn panel_properties(&self) -> &[Arc<str>] {
        &self.panel_props
    }

    pub fn panel_has_property(&self, name: &str) -> bool {
        self.panel_props.iter().any(|p| p.as_ref() == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(strs: &[&str]) -> Vec<Arc<str>> {
        strs.iter().map(|s| Arc::from(*s)).collect()
    }

    #[test]
    fn effective_set_accumulates_in_ancestor_order() {
        let mut reg = TypeRegistry::new();
        let base = reg
            .define(TypeSpec {
                properties: names(&["a", "b"]),
                ..Default::default()
            })
            .unwrap();
        let child = reg
            .define(TypeSpec {
                parent: Some(base),
                tag: Some("child".into()),
                properties: names(&["c", "d"]),
                panel_attachable: false,
            })
            .unwrap();

        let desc = reg.get(child);
        let props: Vec<&str> = desc.properties().iter().map(AsRef::as_ref).collect();
        assert_eq!(props, ["a", "b", "c", "d"]);
        assert!(reg.get(base).is_abstract());
        assert!(!desc.is_abstract());
        assert_eq!(reg.by_tag("child"), Some(child));
    }

    #[test]
    fn property_redefinition_is_rejected() {
        let mut reg = TypeRegistry::new();
        let base = reg
            .define(TypeSpec {
                properties: names(&["a", "b"]),
                ..Default::default()
            })
            .unwrap();
        let err = reg
            .define(TypeSpec {
                parent: Some(base),
                tag: Some("bad".into()),
                properties: names(&["c", "a"]),
                panel_attachable: false,
            })
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicatePropertyName(p) if p.as_ref() == "a"));
        // the failed define must not have registered the tag
        assert_eq!(reg.by_tag("bad"), None);
    }

    #[test]
    fn duplicate_within_one_level_is_rejected() {
        let mut reg = TypeRegistry::new();
        let err = reg
            .define(TypeSpec {
                properties: names(&["x", "x"]),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicatePropertyName(_)));
    }

    #[test]
    fn tag_collision_is_rejected() {
        let mut reg = TypeRegistry::new();
        reg.define(TypeSpec {
            tag: Some("box".into()),
            ..Default::default()
        })
        .unwrap();
        let err = reg
            .define(TypeSpec {
                tag: Some("box".into()),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateTypeTag(t) if t.as_ref() == "box"));
    }

    #[test]
    fn panel_attachable_is_inherited() {
        let mut reg = TypeRegistry::new();
        let mid = reg
            .define(TypeSpec {
                properties: names(&["offsetPosition"]),
                panel_attachable: true,
                ..Default::default()
            })
            .unwrap();
        let leaf = reg
            .define(TypeSpec {
                parent: Some(mid),
                tag: Some("leaf".into()),
                properties: names(&["url"]),
                panel_attachable: false,
            })
            .unwrap();
        assert!(reg.get(leaf).is_panel_attachable());
    }

    #[test]
    fn panel_schema_rejects_duplicates() {
        let mut reg = TypeRegistry::new();
        assert!(reg.set_panel_schema(names(&["visible", "visible"])).is_err());
        assert!(reg.set_panel_schema(names(&["visible", "anchorScale"])).is_ok());
        assert!(reg.panel_has_property("anchorScale"));
        assert!(!reg.panel_has_property("bogus"));
    }
}
