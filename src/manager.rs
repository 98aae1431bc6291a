use std::{collections::HashMap, sync::Arc};

use glam::Vec2;
use log::{debug, warn};
use serde_json::Value;
use thiserror::Error;

use crate::{
    config,
    handle::{Lookup, OverlayHandle, PanelHandle, SceneObject, SearchSet},
    host::{HostApi, HostEvent, ObjectId, PropertyMap, Ray},
    registry::{RegistryError, TypeKey, TypeRegistry},
};

#[derive(Error, Debug)]
pub enum FacadeError {
    #[error("no overlay type registered for tag {0:?}")]
    UnregisteredTag(Arc<str>),
    #[error("property {name:?} is not defined for {target:?}")]
    UnknownProperty { target: Arc<str>, name: Arc<str> },
    #[error("host call failed: {0:?}")]
    Host(#[from] anyhow::Error),
}

/// The single owner of the id→handle mapping for both overlays and panels,
/// and the sole consumer of host-originated deletion notifications.
///
/// All host traffic of the facade goes through here; the manager assumes a
/// single-threaded, event-driven host in which every call completes before
/// the next statement runs.
pub struct OverlayManager<H: HostApi> {
    pub(crate) host: H,
    pub(crate) registry: TypeRegistry,
    pub(crate) overlays: HashMap<ObjectId, OverlayHandle>,
    pub(crate) panels: HashMap<ObjectId, PanelHandle>,
}

impl<H: HostApi> OverlayManager<H> {
    pub fn new(host: H, registry: TypeRegistry) -> Self {
        Self {
            host,
            registry,
            overlays: HashMap::new(),
            panels: HashMap::new(),
        }
    }

    /// Manager over the stock type catalog (or its user override).
    pub fn with_stock_catalog(host: H) -> Result<Self, RegistryError> {
        Ok(Self::new(host, config::stock_registry()?))
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Create an overlay of a registered concrete type. Initial properties
    /// pass through to the host unvalidated.
    pub fn create_overlay(
        &mut self,
        tag: &str,
        props: &PropertyMap,
    ) -> Result<ObjectId, FacadeError> {
        let Some(key) = self.registry.by_tag(tag) else {
            return Err(FacadeError::UnregisteredTag(tag.into()));
        };
        let id = self.host.add_overlay(tag, props)?;
        debug!("{id}: created as {tag:?}");
        self.overlays.insert(
            id,
            OverlayHandle {
                id,
                type_key: key,
                tag: tag.into(),
            },
        );
        Ok(id)
    }

    pub fn create_panel(&mut self, props: &PropertyMap) -> Result<ObjectId, FacadeError> {
        let id = self.host.add_panel(props)?;
        debug!("{id}: created as panel");
        self.panels.insert(id, PanelHandle { id });
        Ok(id)
    }

    /// Get or lazily materialize the handle for a host id.
    ///
    /// `search` overrides the cache for the already-known check only;
    /// materialization always records into the live cache, and an id that is
    /// already cached is never instantiated a second time.
    pub fn resolve_overlay(
        &mut self,
        id: ObjectId,
        mode: Lookup,
        search: Option<&SearchSet>,
    ) -> Option<&OverlayHandle> {
        if !id.is_valid() {
            return None;
        }
        let known = match search {
            Some(set) => set.contains(id) && self.overlays.contains_key(&id),
            None => self.overlays.contains_key(&id),
        };
        if known {
            return self.overlays.get(&id);
        }
        if mode == Lookup::KnownOnly {
            return None;
        }
        self.materialize_overlay(id)
    }

    fn materialize_overlay(&mut self, id: ObjectId) -> Option<&OverlayHandle> {
        let tag = self.host.overlay_type(id)?;
        let Some(key) = self.registry.by_tag(&tag) else {
            warn!("{id}: host reports unregistered overlay type {tag:?}");
            return None;
        };
        debug!("{id}: materialized as {tag:?}");
        Some(self.overlays.entry(id).or_insert(OverlayHandle {
            id,
            type_key: key,
            tag,
        }))
    }

    pub fn resolve_panel(
        &mut self,
        id: ObjectId,
        mode: Lookup,
        search: Option<&SearchSet>,
    ) -> Option<&PanelHandle> {
        if !id.is_valid() {
            return None;
        }
        let known = match search {
            Some(set) => set.contains(id) && self.panels.contains_key(&id),
            None => self.panels.contains_key(&id),
        };
        if known {
            return self.panels.get(&id);
        }
        if mode == Lookup::KnownOnly || !self.host.is_added_panel(id) {
            return None;
        }
        debug!("{id}: materialized as panel");
        Some(self.panels.entry(id).or_insert(PanelHandle { id }))
    }

    /// Overlay resolution first, then panel resolution. The host keeps the
    /// two id ranges disjoint in practice; the try order only matters if it
    /// ever stops doing so.
    pub fn resolve_any(
        &mut self,
        id: ObjectId,
        mode: Lookup,
        search: Option<&SearchSet>,
    ) -> Option<SceneObject> {
        if self.resolve_overlay(id, mode, search).is_some() {
            return Some(SceneObject::Overlay(id));
        }
        if self.resolve_panel(id, mode, search).is_some() {
            return Some(SceneObject::Panel(id));
        }
        None
    }

    pub fn make_search_set<I: IntoIterator<Item = ObjectId>>(&self, ids: I) -> SearchSet {
        SearchSet::from_ids(ids)
    }

    /// Resolve whatever the host's ray pick reports.
    pub fn find_on_ray(
        &mut self,
        ray: &Ray,
        mode: Lookup,
        search: Option<&SearchSet>,
    ) -> Option<&OverlayHandle> {
        let hit = self.host.ray_intersect(ray)?;
        self.resolve_overlay(hit.id, mode, search)
    }

    /// Resolve the overlay under a screen point, falling back to a pick ray
    /// through the point when the direct test misses.
    pub fn find_at_point(
        &mut self,
        point: Vec2,
        mode: Lookup,
        search: Option<&SearchSet>,
    ) -> Option<&OverlayHandle> {
        match self.host.overlay_at_point(point) {
            Some(id) => self.resolve_overlay(id, mode, search),
            None => {
                let ray = self.host.pick_ray(point);
                self.find_on_ray(&ray, mode, search)
            }
        }
    }

    /// Deletion notification entry point; idempotent. Runs to completion
    /// relative to all other facade calls.
    pub fn on_overlay_deleted(&mut self, id: ObjectId) -> Result<(), FacadeError> {
        if !self.overlays.contains_key(&id) {
            return Ok(());
        }
        // detach before evicting; a handle must not leave the cache
        // while the host still reports it attached
        self.detach(id)?;
        self.overlays.remove(&id);
        debug!("{id}: overlay evicted");
        Ok(())
    }

    pub fn on_panel_deleted(&mut self, id: ObjectId) -> Result<(), FacadeError> {
        if !self.panels.contains_key(&id) {
            return Ok(());
        }
        self.detach(id)?;
        self.panels.remove(&id);
        debug!("{id}: panel evicted");
        Ok(())
    }

    fn detach(&mut self, id: ObjectId) -> Result<(), FacadeError> {
        if self.host.parent_panel(id).is_some() {
            self.host.set_parent_panel(id, None)?;
        }
        Ok(())
    }

    /// Drain the host's deletion notifications into the entry points above.
    pub fn process_host_events(&mut self) -> Result<(), FacadeError> {
        while let Some(event) = self.host.poll_event() {
            match event {
                HostEvent::OverlayDeleted(id) => self.on_overlay_deleted(id)?,
                HostEvent::PanelDeleted(id) => self.on_panel_deleted(id)?,
            }
        }
        Ok(())
    }

    /// Accessor guard for a cached overlay.
    pub fn overlay(&mut self, id: ObjectId) -> Option<OverlayRef<'_, H>> {
        let handle = self.overlays.get(&id)?;
        let (key, tag) = (handle.type_key, handle.tag.clone());
        Some(OverlayRef {
            mgr: self,
            id,
            key,
            tag,
        })
    }
}

/// Borrowed view of one cached overlay, giving property access in the shape
/// of the host-side object: reads and writes go straight to the host, never
/// through a local value cache.
pub struct OverlayRef<'m, H: HostApi> {
    pub(crate) mgr: &'m mut OverlayManager<H>,
    pub(crate) id: ObjectId,
    key: TypeKey,
    tag: Arc<str>,
}

impl<H: HostApi> OverlayRef<'_, H> {
    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Effective property set, ancestor-then-self order.
    pub fn properties(&self) -> &[Arc<str>] {
        self.mgr.registry.get(self.key).properties()
    }

    pub fn is_panel_attachable(&self) -> bool {
        self.mgr.registry.get(self.key).is_panel_attachable()
    }

    fn check_property(&self, name: &str) -> Result<(), FacadeError> {
        if self.mgr.registry.get(self.key).has_property(name) {
            Ok(())
        } else {
            Err(FacadeError::UnknownProperty {
                target: self.tag.clone(),
                name: name.into(),
            })
        }
    }

    /// Live read of one declared property.
    pub fn get(&mut self, name: &str) -> Result<Value, FacadeError> {
        self.check_property(name)?;
        Ok(self.mgr.host.overlay_property(self.id, name)?)
    }

    /// Single-key write of one declared property.
    pub fn set(&mut self, name: &str, value: Value) -> Result<(), FacadeError> {
        self.check_property(name)?;
        let mut props = PropertyMap::new();
        props.insert(name.to_owned(), value);
        Ok(self.mgr.host.edit_overlay(self.id, &props)?)
    }

    /// Bulk update in a single host round trip. Pass-through: names and
    /// values are not validated, and partial failure is the host's business.
    pub fn set_properties(&mut self, props: &PropertyMap) -> Result<(), FacadeError> {
        Ok(self.mgr.host.edit_overlay(self.id, props)?)
    }

    pub fn is_loaded(&mut self) -> bool {
        self.mgr.host.overlay_loaded(self.id)
    }

    pub fn text_size(&mut self, text: &str) -> Result<Vec2, FacadeError> {
        Ok(self.mgr.host.text_size(self.id, text)?)
    }

    /// Panel this overlay is attached to, materialized through the cache.
    pub fn parent_panel(&mut self) -> Option<ObjectId> {
        let pid = self.mgr.host.parent_panel(self.id)?;
        self.mgr
            .resolve_panel(pid, Lookup::Materialize, None)
            .map(|p| p.id)
    }

    /// Host-side duplicate; the new overlay is materialized and cached.
    pub fn duplicate(&mut self) -> Result<ObjectId, FacadeError> {
        let new_id = self.mgr.host.clone_overlay(self.id)?;
        match self.mgr.resolve_overlay(new_id, Lookup::Materialize, None) {
            Some(handle) => Ok(handle.id),
            None => Err(FacadeError::Host(anyhow::anyhow!(
                "cloned overlay {new_id} did not resolve"
            ))),
        }
    }

    /// Ask the host to delete this overlay. The cache entry stays until the
    /// host's deletion notification is processed; until then the id still
    /// resolves in `KnownOnly` mode.
    pub fn destroy(self) -> Result<(), FacadeError> {
        Ok(self.mgr.host.delete_overlay(self.id)?)
    }
}
