use std::{collections::HashMap, path::PathBuf, sync::Arc};

use log::error;
use serde::Deserialize;

use crate::registry::{RegistryError, TypeRegistry, TypeSpec};

const FALLBACK_CATALOG: &str = include_str!("res/overlay-types.yaml");
const CATALOG_FILE: &str = "overlay-types.yaml";

/// Group name that marks a type as attachable to panels.
const PANEL_ATTACHABLE_GROUP: &str = "panel_attachable";

/// Named list of properties a type can opt into, replacing ad-hoc
/// property-list concatenation with composition at registration time.
#[derive(Debug, Clone, Deserialize)]
pub struct GroupDef {
    pub name: Arc<str>,
    pub properties: Vec<Arc<str>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TypeDef {
    pub name: Arc<str>,
    #[serde(default)]
    pub parent: Option<Arc<str>>,
    /// Absent tag means the type is abstract.
    #[serde(default)]
    pub tag: Option<Arc<str>>,
    #[serde(default)]
    pub properties: Vec<Arc<str>>,
    #[serde(default)]
    pub groups: Vec<Arc<str>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PanelDef {
    #[serde(default)]
    pub properties: Vec<Arc<str>>,
    #[serde(default)]
    pub groups: Vec<Arc<str>>,
}

/// Declarative overlay type hierarchy, deserialized from YAML.
#[derive(Debug, Clone, Deserialize)]
pub struct TypeCatalog {
    #[serde(default)]
    pub groups: Vec<GroupDef>,
    pub types: Vec<TypeDef>,
    #[serde(default)]
    pub panel: PanelDef,
}

pub fn get_config_root() -> PathBuf {
    xdg::BaseDirectories::with_prefix("ovlkit")
        .get_config_home()
        .unwrap_or_else(|| PathBuf::from("/tmp/ovlkit"))
}

fn load_catalog_override() -> Option<String> {
    let path = get_config_root().join(CATALOG_FILE);
    if !path.exists() {
        return None;
    }
    log::info!("Loading type catalog: {}", path.to_string_lossy());
    std::fs::read_to_string(path).ok()
}

/// Load the type catalog, preferring a user copy in the config directory
/// over the built-in one. A broken user file is logged and skipped.
pub fn load_catalog() -> TypeCatalog {
    let maybe_override = load_catalog_override();

    for yaml in [maybe_override.as_deref(), Some(FALLBACK_CATALOG)]
        .iter()
        .flatten()
    {
        match serde_yaml::from_str::<TypeCatalog>(yaml) {
            Ok(catalog) => return catalog,
            Err(e) => {
                error!("Failed to parse {CATALOG_FILE}, falling back to built-in catalog.");
                error!("{e}");
            }
        }
    }
    // can only get here if the built-in catalog is broken
    panic!("No usable type catalog found.");
}

pub fn parse_catalog(yaml: &str) -> serde_yaml::Result<TypeCatalog> {
    serde_yaml::from_str(yaml)
}

/// The compiled-in catalog, ignoring any user override.
pub fn builtin_catalog() -> TypeCatalog {
    match parse_catalog(FALLBACK_CATALOG) {
        Ok(catalog) => catalog,
        Err(e) => panic!("built-in type catalog is broken: {e}"),
    }
}

/// Compile a catalog into a registry: resolve parents by declaration order,
/// union each type's own properties with its groups, and run the duplicate
/// checks the registry enforces.
pub fn build_registry(catalog: &TypeCatalog) -> Result<TypeRegistry, RegistryError> {
    let mut groups = HashMap::new();
    for group in &catalog.groups {
        if groups.insert(group.name.clone(), &group.properties).is_some() {
            return Err(RegistryError::DuplicateGroupName(group.name.clone()));
        }
    }

    let flatten = |own: &[Arc<str>], wanted: &[Arc<str>]| -> Result<Vec<Arc<str>>, RegistryError> {
        let mut props = own.to_vec();
        for name in wanted {
            let Some(member_props) = groups.get(name) else {
                return Err(RegistryError::UnknownPropertyGroup(name.clone()));
            };
            props.extend(member_props.iter().cloned());
        }
        Ok(props)
    };

    let mut registry = TypeRegistry::new();
    let mut keys = HashMap::new();

    for def in &catalog.types {
        if keys.contains_key(&def.name) {
            return Err(RegistryError::DuplicateTypeName(def.name.clone()));
        }
        let parent = match &def.parent {
            Some(name) => Some(
                *keys
                    .get(name)
                    .ok_or_else(|| RegistryError::UnknownParentType(name.clone()))?,
            ),
            None => None,
        };
        let key = registry.define(TypeSpec {
            parent,
            tag: def.tag.clone(),
            properties: flatten(&def.properties, &def.groups)?,
            panel_attachable: def.groups.iter().any(|g| g.as_ref() == PANEL_ATTACHABLE_GROUP),
        })?;
        keys.insert(def.name.clone(), key);
    }

    registry.set_panel_schema(flatten(&catalog.panel.properties, &catalog.panel.groups)?)?;

    log::info!(
        "type catalog loaded: {} concrete tags",
        registry.concrete_count()
    );
    Ok(registry)
}

/// Registry built from the stock catalog (or its user override).
pub fn stock_registry() -> Result<TypeRegistry, RegistryError> {
    build_registry(&load_catalog())
}
