use glam::{Vec3A, vec2};
use ovlkit::{
    EmulatedHost, HostApi, Lookup, ObjectId, OverlayManager, PropertyMap, RayHit, SceneObject,
    TypeRegistry, TypeSpec,
};
use serde_json::{Value, json};

fn props(pairs: &[(&str, Value)]) -> PropertyMap {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_owned(), v.clone()))
        .collect()
}

fn stock_mgr() -> OverlayManager<EmulatedHost> {
    OverlayManager::with_stock_catalog(EmulatedHost::new()).unwrap()
}

#[test]
fn box_lifecycle_end_to_end() {
    // two-level hierarchy: abstract base with "visible", concrete "box"
    // adding "size"
    let mut registry = TypeRegistry::new();
    let base = registry
        .define(TypeSpec {
            properties: vec!["visible".into()],
            ..Default::default()
        })
        .unwrap();
    registry
        .define(TypeSpec {
            parent: Some(base),
            tag: Some("box".into()),
            properties: vec!["size".into()],
            panel_attachable: false,
        })
        .unwrap();

    let mut mgr = OverlayManager::new(EmulatedHost::new(), registry);
    let box1 = mgr
        .create_overlay("box", &props(&[("visible", json!(true)), ("size", json!(10))]))
        .unwrap();

    {
        let mut ov = mgr.overlay(box1).unwrap();
        assert_eq!(ov.get("visible").unwrap(), json!(true));
        assert_eq!(ov.get("size").unwrap(), json!(10));
        let names: Vec<&str> = ov.properties().iter().map(AsRef::as_ref).collect();
        assert_eq!(names, ["visible", "size"]);
    }

    mgr.overlay(box1).unwrap().destroy().unwrap();
    // destroy alone does not evict; the deletion notification does
    assert!(mgr.resolve_overlay(box1, Lookup::KnownOnly, None).is_some());

    mgr.process_host_events().unwrap();
    assert!(mgr.resolve_overlay(box1, Lookup::KnownOnly, None).is_none());
}

#[test]
fn set_properties_round_trip() {
    let mut mgr = stock_mgr();
    let id = mgr.create_overlay("text", &PropertyMap::new()).unwrap();

    mgr.overlay(id)
        .unwrap()
        .set_properties(&props(&[
            ("text", json!("hello")),
            ("backgroundAlpha", json!(0.5)),
        ]))
        .unwrap();

    assert_eq!(mgr.overlay(id).unwrap().get("text").unwrap(), json!("hello"));
    assert_eq!(
        mgr.overlay(id).unwrap().get("backgroundAlpha").unwrap(),
        json!(0.5)
    );
}

#[test]
fn panel_attach_detach() {
    let mut mgr = stock_mgr();
    let p1 = mgr.create_panel(&PropertyMap::new()).unwrap();
    let o1 = mgr
        .create_overlay("image3d", &props(&[("visible", json!(true))]))
        .unwrap();

    mgr.add_child(p1, o1).unwrap();
    assert_eq!(mgr.overlay(o1).unwrap().parent_panel(), Some(p1));
    let children = mgr.children(p1).unwrap();
    assert!(children.contains(&SceneObject::Overlay(o1)));

    mgr.remove_child(p1, o1).unwrap();
    assert_eq!(mgr.overlay(o1).unwrap().parent_panel(), None);
    assert!(mgr.children(p1).unwrap().is_empty());
}

#[test]
fn remove_child_verifies_parentage() {
    let mut mgr = stock_mgr();
    let p1 = mgr.create_panel(&PropertyMap::new()).unwrap();
    let p2 = mgr.create_panel(&PropertyMap::new()).unwrap();
    let o1 = mgr.create_overlay("text3d", &PropertyMap::new()).unwrap();

    mgr.add_child(p1, o1).unwrap();
    // removing through the wrong panel must not detach
    mgr.remove_child(p2, o1).unwrap();
    assert_eq!(mgr.overlay(o1).unwrap().parent_panel(), Some(p1));
}

#[test]
fn deletion_notification_detaches_then_evicts() {
    let mut mgr = stock_mgr();
    let p1 = mgr.create_panel(&PropertyMap::new()).unwrap();
    let o1 = mgr.create_overlay("image3d", &PropertyMap::new()).unwrap();
    mgr.add_child(p1, o1).unwrap();

    // notification arriving while the host record is still live (the host
    // evicts lazily); the facade must unparent before dropping the handle
    mgr.on_overlay_deleted(o1).unwrap();

    assert!(mgr.resolve_overlay(o1, Lookup::KnownOnly, None).is_none());
    assert_eq!(mgr.host_mut().parent_panel(o1), None);
    assert!(mgr.children(p1).unwrap().is_empty());
}

#[test]
fn deletion_notification_is_idempotent() {
    let mut mgr = stock_mgr();
    let o1 = mgr.create_overlay("cube", &PropertyMap::new()).unwrap();

    mgr.on_overlay_deleted(o1).unwrap();
    assert!(mgr.resolve_overlay(o1, Lookup::KnownOnly, None).is_none());
    // second delivery is a no-op
    mgr.on_overlay_deleted(o1).unwrap();
    // and so is one for an id never seen
    mgr.on_overlay_deleted(ObjectId(9999)).unwrap();
}

#[test]
fn panel_deletion_unparents_children() {
    let mut mgr = stock_mgr();
    let p1 = mgr.create_panel(&PropertyMap::new()).unwrap();
    let o1 = mgr.create_overlay("image3d", &PropertyMap::new()).unwrap();
    mgr.add_child(p1, o1).unwrap();

    mgr.panel(p1).unwrap().destroy().unwrap();
    mgr.process_host_events().unwrap();

    assert!(mgr.resolve_panel(p1, Lookup::KnownOnly, None).is_none());
    assert_eq!(mgr.overlay(o1).unwrap().parent_panel(), None);
}

#[test]
fn lazy_materialization_from_indirect_discovery() {
    let mut mgr = stock_mgr();
    // the host learns about an overlay the facade never saw created
    let id = mgr
        .host_mut()
        .add_overlay("model", &props(&[("url", json!("mesh.glb"))]))
        .unwrap();

    assert!(mgr.resolve_overlay(id, Lookup::KnownOnly, None).is_none());
    let handle = mgr.resolve_overlay(id, Lookup::Materialize, None).unwrap();
    assert_eq!(handle.tag.as_ref(), "model");
    assert_eq!(mgr.overlay(id).unwrap().get("url").unwrap(), json!("mesh.glb"));
}

#[test]
fn resolve_any_distinguishes_overlays_and_panels() {
    let mut mgr = stock_mgr();
    let o1 = mgr.create_overlay("sphere", &PropertyMap::new()).unwrap();
    let p1 = mgr.create_panel(&PropertyMap::new()).unwrap();

    assert_eq!(
        mgr.resolve_any(o1, Lookup::KnownOnly, None),
        Some(SceneObject::Overlay(o1))
    );
    assert_eq!(
        mgr.resolve_any(p1, Lookup::KnownOnly, None),
        Some(SceneObject::Panel(p1))
    );
    assert_eq!(mgr.resolve_any(ObjectId(4242), Lookup::Materialize, None), None);
}

#[test]
fn find_at_point_direct_hit() {
    let mut mgr = stock_mgr();
    let id = mgr
        .create_overlay(
            "image",
            &props(&[
                ("x", json!(10.0)),
                ("y", json!(10.0)),
                ("width", json!(100.0)),
                ("height", json!(50.0)),
            ]),
        )
        .unwrap();

    let found = mgr.find_at_point(vec2(20.0, 20.0), Lookup::KnownOnly, None);
    assert_eq!(found.map(|h| h.id), Some(id));
    assert!(
        mgr.find_at_point(vec2(500.0, 500.0), Lookup::KnownOnly, None)
            .is_none()
    );
}

#[test]
fn find_at_point_falls_back_to_pick_ray() {
    let mut mgr = stock_mgr();
    // a 3D overlay has no screen rect, so the direct point test misses
    let id = mgr.create_overlay("cube", &PropertyMap::new()).unwrap();
    mgr.host_mut().script_ray_hit(RayHit {
        id,
        distance: 1.5,
        point: Vec3A::ZERO,
    });

    let found = mgr.find_at_point(vec2(0.0, 0.0), Lookup::Materialize, None);
    assert_eq!(found.map(|h| h.id), Some(id));
}

#[test]
fn find_on_ray_respects_search_set() {
    let mut mgr = stock_mgr();
    let a = mgr.create_overlay("cube", &PropertyMap::new()).unwrap();
    let b = mgr.create_overlay("cube", &PropertyMap::new()).unwrap();
    let only_a = mgr.make_search_set([a]);

    mgr.host_mut().script_ray_hit(RayHit {
        id: b,
        distance: 1.0,
        point: Vec3A::ZERO,
    });
    let ray = mgr.host_mut().pick_ray(vec2(0.0, 0.0));
    assert!(mgr.find_on_ray(&ray, Lookup::KnownOnly, Some(&only_a)).is_none());

    mgr.host_mut().script_ray_hit(RayHit {
        id: a,
        distance: 1.0,
        point: Vec3A::ZERO,
    });
    let found = mgr.find_on_ray(&ray, Lookup::KnownOnly, Some(&only_a));
    assert_eq!(found.map(|h| h.id), Some(a));
}

#[test]
fn duplicate_materializes_the_clone() {
    let mut mgr = stock_mgr();
    let id = mgr
        .create_overlay("image3d", &props(&[("url", json!("a.jpg"))]))
        .unwrap();

    let copy = mgr.overlay(id).unwrap().duplicate().unwrap();
    assert_ne!(copy, id);
    let mut ov = mgr.overlay(copy).unwrap();
    assert_eq!(ov.tag(), "image3d");
    assert_eq!(ov.get("url").unwrap(), json!("a.jpg"));
}

#[test]
fn set_children_visible_recurses_into_panels() {
    let mut mgr = stock_mgr();
    let p1 = mgr.create_panel(&PropertyMap::new()).unwrap();
    let p2 = mgr.create_panel(&props(&[("visible", json!(false))])).unwrap();
    let o1 = mgr
        .create_overlay("text3d", &props(&[("visible", json!(false))]))
        .unwrap();

    mgr.add_child(p1, p2).unwrap();
    mgr.add_child(p2, o1).unwrap();

    mgr.panel(p1).unwrap().set_children_visible().unwrap();

    assert_eq!(
        mgr.host_mut().panel_property(p2, "visible").unwrap(),
        json!(true)
    );
    assert_eq!(
        mgr.host_mut().overlay_property(o1, "visible").unwrap(),
        json!(true)
    );
}

#[test]
fn panel_property_dispatch() {
    let mut mgr = stock_mgr();
    let p1 = mgr.create_panel(&PropertyMap::new()).unwrap();
    let mut panel = mgr.panel(p1).unwrap();

    panel.set("anchorScale", json!(2.0)).unwrap();
    assert_eq!(panel.get("anchorScale").unwrap(), json!(2.0));
    // group properties are part of the panel schema
    panel.set("offsetScale", json!(0.5)).unwrap();
    assert!(panel.get("borderSize").is_err());
}

#[test]
fn overlay_misc_host_passthrough() {
    let mut mgr = stock_mgr();
    let id = mgr
        .create_overlay("text", &props(&[("lineHeight", json!(20.0))]))
        .unwrap();

    let mut ov = mgr.overlay(id).unwrap();
    assert!(ov.is_loaded());
    let size = ov.text_size("hello\nworld!").unwrap();
    assert_eq!(size.y, 40.0);
    assert!(size.x > 0.0);
    assert!(!ov.is_panel_attachable());

    let billboard = mgr.create_overlay("image3d", &PropertyMap::new()).unwrap();
    assert!(mgr.overlay(billboard).unwrap().is_panel_attachable());
}
