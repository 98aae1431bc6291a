pub mod emulated;

use std::fmt;

use glam::{Vec2, Vec3A};
use serde::{Deserialize, Serialize};

/// Host-assigned identifier for an overlay or a panel.
///
/// The host owns both id ranges and keeps them disjoint in practice, but
/// nothing here relies on that. `0` means "no object".
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct ObjectId(pub u64);

impl ObjectId {
    pub const NONE: Self = Self(0);

    pub const fn is_valid(self) -> bool {
        self.0 > 0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Property bags are JSON-shaped; the facade passes values through to the
/// host without validating them.
pub type PropertyMap = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Ray {
    pub origin: Vec3A,
    pub direction: Vec3A,
}

/// A successful ray pick. A miss is the absence of this value.
#[derive(Debug, Clone, Copy)]
pub struct RayHit {
    pub id: ObjectId,
    pub distance: f32,
    pub point: Vec3A,
}

/// Host-pushed deletion notification, at most once per deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostEvent {
    OverlayDeleted(ObjectId),
    PanelDeleted(ObjectId),
}

/// The imperative scene-overlay API of the external runtime.
///
/// Everything the facade does bottoms out here. Host failures are opaque to
/// this layer and propagate unmodified; there are no retries and no
/// compensation for partial multi-property updates.
pub trait HostApi {
    fn add_overlay(&mut self, type_tag: &str, props: &PropertyMap) -> anyhow::Result<ObjectId>;
    fn edit_overlay(&mut self, id: ObjectId, props: &PropertyMap) -> anyhow::Result<()>;
    fn delete_overlay(&mut self, id: ObjectId) -> anyhow::Result<()>;
    fn clone_overlay(&mut self, id: ObjectId) -> anyhow::Result<ObjectId>;
    fn overlay_property(&mut self, id: ObjectId, name: &str) -> anyhow::Result<serde_json::Value>;
    /// Type tag of a live overlay, or `None` when the id is unknown to the
    /// host. This is the probe behind lazy materialization.
    fn overlay_type(&mut self, id: ObjectId) -> Option<std::sync::Arc<str>>;
    fn overlay_loaded(&mut self, id: ObjectId) -> bool;
    fn text_size(&mut self, id: ObjectId, text: &str) -> anyhow::Result<Vec2>;

    fn add_panel(&mut self, props: &PropertyMap) -> anyhow::Result<ObjectId>;
    fn edit_panel(&mut self, id: ObjectId, props: &PropertyMap) -> anyhow::Result<()>;
    fn delete_panel(&mut self, id: ObjectId) -> anyhow::Result<()>;
    fn panel_property(&mut self, id: ObjectId, name: &str) -> anyhow::Result<serde_json::Value>;
    fn is_added_panel(&mut self, id: ObjectId) -> bool;

    /// Panel the object is currently attached to, or `None`.
    fn parent_panel(&mut self, id: ObjectId) -> Option<ObjectId>;
    /// Attach `child` to `parent`, or detach it when `parent` is `None`.
    fn set_parent_panel(&mut self, child: ObjectId, parent: Option<ObjectId>)
    -> anyhow::Result<()>;

    fn ray_intersect(&mut self, ray: &Ray) -> Option<RayHit>;
    fn overlay_at_point(&mut self, point: Vec2) -> Option<ObjectId>;
    /// Pick ray through a screen point, used when a direct point test misses.
    fn pick_ray(&mut self, point: Vec2) -> Ray;

    /// Drain one pending deletion notification, oldest first.
    fn poll_event(&mut self) -> Option<HostEvent>;
}
