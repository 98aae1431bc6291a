use std::sync::Arc;

use log::warn;
use serde_json::Value;
use smallvec::{SmallVec, smallvec};

use crate::{
    handle::{Lookup, SceneObject},
    host::{HostApi, ObjectId, PropertyMap},
    manager::{FacadeError, OverlayManager},
};

/// Children lists are host-authoritative and re-read on every access; this
/// is only the resolved shape of one such read.
pub type Children = SmallVec<[SceneObject; 8]>;

impl<H: HostApi> OverlayManager<H> {
    /// Accessor guard for a cached panel.
    pub fn panel(&mut self, id: ObjectId) -> Option<PanelRef<'_, H>> {
        if !self.panels.contains_key(&id) {
            return None;
        }
        Some(PanelRef { mgr: self, id })
    }

    /// Fresh read of a panel's children, in host-defined order, resolved
    /// through the cache. Ids the host reports but the facade cannot
    /// resolve are skipped.
    pub fn children(&mut self, panel: ObjectId) -> Result<Children, FacadeError> {
        let value = self.host.panel_property(panel, "children")?;
        let Some(raw_ids) = value.as_array() else {
            return Ok(SmallVec::new());
        };

        let mut out = SmallVec::with_capacity(raw_ids.len());
        for raw in raw_ids {
            let Some(num) = raw.as_u64() else { continue };
            let id = ObjectId(num);
            match self.resolve_any(id, Lookup::Materialize, None) {
                Some(child) => out.push(child),
                None => warn!("{panel}: child {id} did not resolve"),
            }
        }
        Ok(out)
    }

    /// Attach `child` to `panel`; returns the child id for chaining. The
    /// parent link lives in the host, not in the cache.
    pub fn add_child(&mut self, panel: ObjectId, child: ObjectId) -> Result<ObjectId, FacadeError> {
        self.host.set_parent_panel(child, Some(panel))?;
        Ok(child)
    }

    /// Detach `child` if it is currently attached to `panel`.
    /// Read-verify-then-act; a concurrent external reparent can win the race.
    pub fn remove_child(&mut self, panel: ObjectId, child: ObjectId) -> Result<(), FacadeError> {
        if self.host.parent_panel(child) == Some(panel) {
            self.host.set_parent_panel(child, None)?;
        }
        Ok(())
    }

    /// Recursively set `visible = true` on everything under `panel`.
    /// Plain tree walk; the host keeps the panel graph acyclic.
    pub fn set_children_visible(&mut self, panel: ObjectId) -> Result<(), FacadeError> {
        let mut visible = PropertyMap::new();
        visible.insert("visible".to_owned(), Value::Bool(true));

        let mut stack: SmallVec<[ObjectId; 8]> = smallvec![panel];
        while let Some(pid) = stack.pop() {
            for child in self.children(pid)? {
                match child {
                    SceneObject::Overlay(id) => self.host.edit_overlay(id, &visible)?,
                    SceneObject::Panel(id) => {
                        self.host.edit_panel(id, &visible)?;
                        stack.push(id);
                    }
                }
            }
        }
        Ok(())
    }
}

/// Borrowed view of one cached panel.
pub struct PanelRef<'m, H: HostApi> {
    mgr: &'m mut OverlayManager<H>,
    id: ObjectId,
}

impl<H: HostApi> PanelRef<'_, H> {
    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn properties(&self) -> &[Arc<str>] {
        self.mgr.registry().panel_properties()
    }

    fn check_property(&self, name: &str) -> Result<(), FacadeError> {
        if self.mgr.registry().panel_has_property(name) {
            Ok(())
        } else {
            Err(FacadeError::UnknownProperty {
                target: "panel".into(),
                name: name.into(),
            })
        }
    }

    pub fn get(&mut self, name: &str) -> Result<Value, FacadeError> {
        self.check_property(name)?;
        Ok(self.mgr.host.panel_property(self.id, name)?)
    }

    pub fn set(&mut self, name: &str, value: Value) -> Result<(), FacadeError> {
        self.check_property(name)?;
        let mut props = PropertyMap::new();
        props.insert(name.to_owned(), value);
        Ok(self.mgr.host.edit_panel(self.id, &props)?)
    }

    /// Bulk update, pass-through like the overlay flavor.
    pub fn set_properties(&mut self, props: &PropertyMap) -> Result<(), FacadeError> {
        Ok(self.mgr.host.edit_panel(self.id, props)?)
    }

    pub fn parent_panel(&mut self) -> Option<ObjectId> {
        let pid = self.mgr.host.parent_panel(self.id)?;
        self.mgr
            .resolve_panel(pid, Lookup::Materialize, None)
            .map(|p| p.id)
    }

    pub fn children(&mut self) -> Result<Children, FacadeError> {
        self.mgr.children(self.id)
    }

    pub fn add_child(&mut self, child: ObjectId) -> Result<ObjectId, FacadeError> {
        self.mgr.add_child(self.id, child)
    }

    pub fn remove_child(&mut self, child: ObjectId) -> Result<(), FacadeError> {
        self.mgr.remove_child(self.id, child)
    }

    pub fn set_children_visible(&mut self) -> Result<(), FacadeError> {
        self.mgr.set_children_visible(self.id)
    }

    /// Host delete; eviction follows the deletion notification, as for
    /// overlays.
    pub fn destroy(self) -> Result<(), FacadeError> {
        Ok(self.mgr.host.delete_panel(self.id)?)
    }
}
