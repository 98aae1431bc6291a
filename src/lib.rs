//! Object-oriented overlay and panel management on top of scene-overlay
//! host runtimes.
//!
//! Hosts expose overlays through imperative create/edit/delete-by-id calls.
//! Instead of:
//!
//! ```text
//! let id = host.add_overlay("image3d", &props)?;
//! host.edit_overlay(id, &visible_props)?;
//! host.delete_overlay(id)?;
//! ```
//!
//! you work with typed handles backed by a registry of overlay types and an
//! id-keyed cache that follows host-side deletions:
//!
//! ```
//! use ovlkit::{EmulatedHost, Lookup, OverlayManager, PropertyMap};
//! use serde_json::json;
//!
//! # fn main() -> anyhow::Result<()> {
//! let mut mgr = OverlayManager::with_stock_catalog(EmulatedHost::new())?;
//!
//! let mut props = PropertyMap::new();
//! props.insert("visible".into(), json!(true));
//! props.insert("isFacingAvatar".into(), json!(true));
//! let billboard = mgr.create_overlay("image3d", &props)?;
//!
//! // every property access is a live host round trip
//! mgr.overlay(billboard).unwrap().set("url", json!("http://example.com/a.jpg"))?;
//! assert_eq!(mgr.overlay(billboard).unwrap().get("visible")?, json!(true));
//!
//! // group overlays under a panel
//! let panel = mgr.create_panel(&PropertyMap::new())?;
//! mgr.add_child(panel, billboard)?;
//!
//! // deletion flows back through the host's notification channel
//! mgr.overlay(billboard).unwrap().destroy()?;
//! mgr.process_host_events()?;
//! assert!(mgr.resolve_overlay(billboard, Lookup::KnownOnly, None).is_none());
//! # Ok(())
//! # }
//! ```
//!
//! The host itself stays external: rendering, picking math and ground-truth
//! state live behind [`HostApi`], with [`EmulatedHost`] as an in-memory
//! stand-in for tests.

pub mod config;
pub mod handle;
pub mod host;
pub mod manager;
pub mod panel;
pub mod registry;

pub use handle::{Lookup, OverlayHandle, PanelHandle, SceneObject, SearchSet};
pub use host::{HostApi, HostEvent, ObjectId, PropertyMap, Ray, RayHit, emulated::EmulatedHost};
pub use manager::{FacadeError, OverlayManager, OverlayRef};
pub use panel::{Children, PanelRef};
pub use registry::{RegistryError, TypeDescriptor, TypeKey, TypeRegistry, TypeSpec};
