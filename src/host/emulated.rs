use std::{
    collections::{BTreeMap, VecDeque},
    sync::Arc,
};

use anyhow::bail;
use glam::{Vec2, Vec3A, vec2};
use serde_json::Value;

use super::{HostApi, HostEvent, ObjectId, PropertyMap, Ray, RayHit};

// Fixed-advance text metrics; good enough for layout-shaped assertions.
const CHAR_ADVANCE: f32 = 8.0;
const DEFAULT_LINE_HEIGHT: f32 = 16.0;

#[derive(Debug)]
struct EmuOverlay {
    tag: Arc<str>,
    props: PropertyMap,
    parent: ObjectId,
}

#[derive(Debug)]
struct EmuPanel {
    props: PropertyMap,
    parent: ObjectId,
}

/// In-memory host runtime.
///
/// Keeps plain records for overlays and panels, queues deletion events the
/// way a real host would push them, and answers point picks from the 2D
/// bounds properties of its records. Ray picks carry real intersection math
/// in a real host; here they are scripted per test via [`Self::script_ray_hit`].
///
/// Ids for overlays and panels come from one counter, so the two ranges are
/// disjoint but interleaved.
#[derive(Debug, Default)]
pub struct EmulatedHost {
    next_id: u64,
    overlays: BTreeMap<ObjectId, EmuOverlay>,
    panels: BTreeMap<ObjectId, EmuPanel>,
    events: VecDeque<HostEvent>,
    ray_hits: VecDeque<RayHit>,
}

impl EmulatedHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the result of the next `ray_intersect` call.
    pub fn script_ray_hit(&mut self, hit: RayHit) {
        self.ray_hits.push_back(hit);
    }

    pub fn overlay_count(&self) -> usize {
        self.overlays.len()
    }

    pub fn panel_count(&self) -> usize {
        self.panels.len()
    }

    fn alloc_id(&mut self) -> ObjectId {
        self.next_id += 1;
        ObjectId(self.next_id)
    }

    fn unparent_children_of(&mut self, parent: ObjectId) {
        for rec in self.overlays.values_mut() {
            if rec.parent == parent {
                rec.parent = ObjectId::NONE;
            }
        }
        for rec in self.panels.values_mut() {
            if rec.parent == parent {
                rec.parent = ObjectId::NONE;
            }
        }
    }

    fn children_of(&self, parent: ObjectId) -> Vec<ObjectId> {
        let mut ids: Vec<ObjectId> = self
            .overlays
            .iter()
            .filter(|(_, rec)| rec.parent == parent)
            .map(|(id, _)| *id)
            .chain(
                self.panels
                    .iter()
                    .filter(|(_, rec)| rec.parent == parent)
                    .map(|(id, _)| *id),
            )
            .collect();
        ids.sort_unstable();
        ids
    }
}

fn prop_f32(props: &PropertyMap, name: &str) -> Option<f32> {
    props.get(name).and_then(Value::as_f64).map(|v| v as f32)
}

impl HostApi for EmulatedHost {
    fn add_overlay(&mut self, type_tag: &str, props: &PropertyMap) -> anyhow::Result<ObjectId> {
        let id = self.alloc_id();
        self.overlays.insert(
            id,
            EmuOverlay {
                tag: type_tag.into(),
                props: props.clone(),
                parent: ObjectId::NONE,
            },
        );
        Ok(id)
    }

    fn edit_overlay(&mut self, id: ObjectId, props: &PropertyMap) -> anyhow::Result<()> {
        let Some(rec) = self.overlays.get_mut(&id) else {
            bail!("no overlay {id}");
        };
        for (k, v) in props {
            rec.props.insert(k.clone(), v.clone());
        }
        Ok(())
    }

    fn delete_overlay(&mut self, id: ObjectId) -> anyhow::Result<()> {
        if self.overlays.remove(&id).is_none() {
            bail!("no overlay {id}");
        }
        self.events.push_back(HostEvent::OverlayDeleted(id));
        Ok(())
    }

    fn clone_overlay(&mut self, id: ObjectId) -> anyhow::Result<ObjectId> {
        let Some(rec) = self.overlays.get(&id) else {
            bail!("no overlay {id}");
        };
        let copy = EmuOverlay {
            tag: rec.tag.clone(),
            props: rec.props.clone(),
            // clones start detached
            parent: ObjectId::NONE,
        };
        let new_id = self.alloc_id();
        self.overlays.insert(new_id, copy);
        Ok(new_id)
    }

    fn overlay_property(&mut self, id: ObjectId, name: &str) -> anyhow::Result<Value> {
        let Some(rec) = self.overlays.get(&id) else {
            bail!("no overlay {id}");
        };
        Ok(rec.props.get(name).cloned().unwrap_or(Value::Null))
    }

    fn overlay_type(&mut self, id: ObjectId) -> Option<Arc<str>> {
        self.overlays.get(&id).map(|rec| rec.tag.clone())
    }

    fn overlay_loaded(&mut self, id: ObjectId) -> bool {
        self.overlays.contains_key(&id)
    }

    fn text_size(&mut self, id: ObjectId, text: &str) -> anyhow::Result<Vec2> {
        let Some(rec) = self.overlays.get(&id) else {
            bail!("no overlay {id}");
        };
        let line_height = prop_f32(&rec.props, "lineHeight").unwrap_or(DEFAULT_LINE_HEIGHT);
        let widest = text.lines().map(str::len).max().unwrap_or(0);
        let lines = text.lines().count().max(1);
        Ok(vec2(
            widest as f32 * CHAR_ADVANCE,
            lines as f32 * line_height,
        ))
    }

    fn add_panel(&mut self, props: &PropertyMap) -> anyhow::Result<ObjectId> {
        let id = self.alloc_id();
        self.panels.insert(
            id,
            EmuPanel {
                props: props.clone(),
                parent: ObjectId::NONE,
            },
        );
        Ok(id)
    }

    fn edit_panel(&mut self, id: ObjectId, props: &PropertyMap) -> anyhow::Result<()> {
        let Some(rec) = self.panels.get_mut(&id) else {
            bail!("no panel {id}");
        };
        for (k, v) in props {
            rec.props.insert(k.clone(), v.clone());
        }
        Ok(())
    }

    fn delete_panel(&mut self, id: ObjectId) -> anyhow::Result<()> {
        if self.panels.remove(&id).is_none() {
            bail!("no panel {id}");
        }
        self.unparent_children_of(id);
        self.events.push_back(HostEvent::PanelDeleted(id));
        Ok(())
    }

    fn panel_property(&mut self, id: ObjectId, name: &str) -> anyhow::Result<Value> {
        let Some(rec) = self.panels.get(&id) else {
            bail!("no panel {id}");
        };
        if name == "children" {
            let ids: Vec<Value> = self
                .children_of(id)
                .into_iter()
                .map(|c| Value::from(c.0))
                .collect();
            return Ok(Value::Array(ids));
        }
        Ok(rec.props.get(name).cloned().unwrap_or(Value::Null))
    }

    fn is_added_panel(&mut self, id: ObjectId) -> bool {
        self.panels.contains_key(&id)
    }

    fn parent_panel(&mut self, id: ObjectId) -> Option<ObjectId> {
        let parent = self
            .overlays
            .get(&id)
            .map(|rec| rec.parent)
            .or_else(|| self.panels.get(&id).map(|rec| rec.parent))?;
        parent.is_valid().then_some(parent)
    }

    fn set_parent_panel(
        &mut self,
        child: ObjectId,
        parent: Option<ObjectId>,
    ) -> anyhow::Result<()> {
        let parent = parent.unwrap_or(ObjectId::NONE);
        if parent.is_valid() && !self.panels.contains_key(&parent) {
            bail!("no panel {parent}");
        }
        if let Some(rec) = self.overlays.get_mut(&child) {
            rec.parent = parent;
        } else if let Some(rec) = self.panels.get_mut(&child) {
            rec.parent = parent;
        } else {
            bail!("no object {child}");
        }
        Ok(())
    }

    fn ray_intersect(&mut self, _ray: &Ray) -> Option<RayHit> {
        self.ray_hits.pop_front()
    }

    fn overlay_at_point(&mut self, point: Vec2) -> Option<ObjectId> {
        for (id, rec) in &self.overlays {
            let (Some(x), Some(y), Some(w), Some(h)) = (
                prop_f32(&rec.props, "x"),
                prop_f32(&rec.props, "y"),
                prop_f32(&rec.props, "width"),
                prop_f32(&rec.props, "height"),
            ) else {
                continue;
            };
            if point.x >= x && point.x <= x + w && point.y >= y && point.y <= y + h {
                return Some(*id);
            }
        }
        None
    }

    fn pick_ray(&mut self, point: Vec2) -> Ray {
        Ray {
            origin: Vec3A::new(point.x, point.y, 0.0),
            direction: Vec3A::NEG_Z,
        }
    }

    fn poll_event(&mut self) -> Option<HostEvent> {
        self.events.pop_front()
    }
}
