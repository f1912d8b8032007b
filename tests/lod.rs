//! Dynamic level of detail driven by the camera.

mod common;

use std::sync::Arc;

use common::*;
use crowd_scene::prelude::*;

const LOD0_BODY: &str = "/crowd/field_A/Entity_1/Geometry/LOD0/Geo/Body.points";
const LOD1_BODY: &str = "/crowd/field_A/Entity_1/Geometry/LOD1/Body.points";
const LOD0_VIS: &str = "/crowd/field_A/Entity_1/Geometry/LOD0.visibility";
const LOD1_VIS: &str = "/crowd/field_A/Entity_1/Geometry/LOD1.visibility";

#[test]
fn test_dynamic_layout() {
    let (store, _) = store(dynamic());
    assert_eq!(store.list_children("/crowd/field_A/Entity_1/Geometry"), vec!["LOD0", "LOD1"]);
    assert_eq!(store.list_children("/crowd/field_A/Entity_1/Geometry/LOD0"), vec!["Geo", "Hair"]);
    assert_eq!(store.list_children("/crowd/field_A/Entity_1/Geometry/LOD1"), vec!["Body"]);
    assert_eq!(store.has("/crowd/field_A/Entity_1/Geometry/LOD1", "typeName"), Some(Value::token("Xform")));
    assert_eq!(store.stats().templates, 2);
}

#[test]
fn test_camera_distance_switches_lod() {
    let (store, _) = store(dynamic());

    // entity 1 is at x=1 on frame 1; camera 5m away
    store.set_camera_position(Vec3::new(6.0, 0.0, 0.0));
    assert_eq!(points(store.query_time_sample(LOD0_BODY, 1.0)).len(), 4);
    assert_eq!(store.query_time_sample(LOD1_BODY, 1.0), None);
    assert_eq!(store.query_time_sample(LOD0_VIS, 1.0), Some(Value::token("inherited")));
    assert_eq!(store.query_time_sample(LOD1_VIS, 1.0), Some(Value::token("invisible")));

    // 20m away, same frame
    store.set_camera_position(Vec3::new(21.0, 0.0, 0.0));
    assert_eq!(store.query_time_sample(LOD0_BODY, 1.0), None);
    assert_eq!(points(store.query_time_sample(LOD1_BODY, 1.0)).len(), 3);
    assert_eq!(store.query_time_sample(LOD0_VIS, 1.0), Some(Value::token("invisible")));
    assert_eq!(store.query_time_sample(LOD1_VIS, 1.0), Some(Value::token("inherited")));
}

#[test]
fn test_lod_is_stable_for_fixed_camera() {
    let (store, sim) = store(dynamic());
    store.set_camera_position(Vec3::new(11.0, 0.0, 0.0));

    // exactly on the 10m threshold
    let first = store.compute(0, 1).unwrap();
    assert_eq!(first.variant, 1);
    for _ in 0..20 {
        let again = store.compute(0, 1).unwrap();
        assert!(Arc::ptr_eq(&first, &again));
    }
    assert_eq!(sim.deform_calls_for(1), 1);
}

#[test]
fn test_disabled_entity_hides_all_lods() {
    let (store, _) = store(dynamic());
    let lod0 = "/crowd/field_A/Entity_2/Geometry/LOD0.visibility";
    let lod1 = "/crowd/field_A/Entity_2/Geometry/LOD1.visibility";
    assert_eq!(store.query_time_sample(lod0, 3.0), Some(Value::token("invisible")));
    assert_eq!(store.query_time_sample(lod1, 3.0), Some(Value::token("invisible")));
}

#[test]
fn test_connected_camera() {
    let params = Arc::new(MemoryParameters::new());
    params.set("/cam_near.translate", Vec3::new(1.0, 0.0, 3.0));
    params.set("/cam_far.translate", Vec3::new(1.0, 0.0, 50.0));

    let sim = Arc::new(simulation());
    let config = StoreConfig { camera_source: Some("/cam_near.translate".into()), ..dynamic() };
    let source: Arc<dyn ParameterSource> = params.clone();
    let store = CrowdStore::new(config, sim.clone(), sim, Some(source));

    assert_eq!(store.compute(0, 1).unwrap().variant, 0);
    store.compute(0, 1).unwrap();
    assert_eq!(params.resolve_calls(), 1);

    // host reassigns the connection
    store.connect_camera("/cam_far.translate");
    assert_eq!(store.compute(0, 1).unwrap().variant, 1);
    assert!(store.query_time_sample(LOD1_BODY, 1.0).is_some());
}

#[test]
fn test_simulation_threshold_override() {
    let mut data = partition();
    data.lod_thresholds = Some(vec![vec![0.0, 3.0]]);
    let sim = simulation_of(data);

    let (store, _) = build(dynamic(), sim);
    store.set_camera_position(Vec3::new(6.0, 0.0, 0.0));
    // 5m is past the overridden 3m threshold
    assert_eq!(store.compute(0, 1).unwrap().variant, 1);
}

#[test]
fn test_failed_template_omits_lod() {
    let mut sim = simulation();
    sim.fail_template(0, 1);
    let (store, _) = build(dynamic(), sim);

    assert_eq!(store.list_children("/crowd/field_A/Entity_1/Geometry"), vec!["LOD0"]);
    assert!(!store.has_spec("/crowd/field_A/Entity_1/Geometry/LOD1"));
    assert_eq!(store.stats().failed_templates, 1);

    // far camera picks the missing variant: entity stays visible, no geometry
    store.set_camera_position(Vec3::new(50.0, 0.0, 0.0));
    let snapshot = store.compute(0, 1).unwrap();
    assert!(snapshot.enabled);
    assert_eq!(snapshot.variant, 1);
    assert!(snapshot.sub_assets.is_empty());
    assert_eq!(store.query_time_sample(LOD0_BODY, 1.0), None);
}

#[test]
fn test_static_lod_choice() {
    let config = StoreConfig { static_lod: 1, ..Default::default() };
    let (store, sim) = store(config);
    assert_eq!(store.list_children("/crowd/field_A/Entity_1/Geometry"), vec!["Body"]);
    assert_eq!(points(store.query_time_sample("/crowd/field_A/Entity_1/Geometry/Body.points", 1.0)).len(), 3);
    // only the configured variant is prepared
    assert_eq!(sim.template_calls(), 1);

    // out of range clamps to the last variant
    let config = StoreConfig { static_lod: 7, ..Default::default() };
    let (store, _) = common::store(config);
    assert_eq!(store.list_children("/crowd/field_A/Entity_1/Geometry"), vec!["Body"]);
}
