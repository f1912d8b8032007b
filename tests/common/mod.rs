//! Shared fixture: one crowd field, one character with two LODs.
//!
//! - entity 1 walks +X one unit per frame from x=1
//! - entity 2 stands at z=5 and is disabled at frame 3
//! - entity 3 stands at y=-5 and is killed at frame 4
//!
//! LOD0 (from 0m) has a quad "Body" under alias `Geo/Body` plus a fur
//! "Hair"; LOD1 (from 10m) has a triangle "Body".

#![allow(dead_code)]

use std::sync::Arc;

use crowd_scene::prelude::*;

pub const FIRST: i64 = 1;
pub const LAST: i64 = 10;
pub const FPS: f32 = 24.0;

pub const ENTITY_1: &str = "/crowd/field_A/Entity_1";
pub const ENTITY_2: &str = "/crowd/field_A/Entity_2";
pub const ENTITY_3: &str = "/crowd/field_A/Entity_3";

pub fn character() -> Character {
    Character {
        name: "Man".into(),
        variants: vec![
            GeometryVariant {
                name: "LOD0".into(),
                lod_threshold: 0.0,
                sub_assets: vec![SubAssetDesc::mesh("body_hi", "Geo/Body"), SubAssetDesc::fur("Hair")],
            },
            GeometryVariant {
                name: "LOD1".into(),
                lod_threshold: 10.0,
                sub_assets: vec![SubAssetDesc::mesh("Body", "")],
            },
        ],
        bones: vec!["hips".into(), "head".into()],
        shader_attributes: vec![ShaderAttribute { name: "hue".into(), default: AttributeValue::Float(0.25) }],
        extent: BBox3f::new(Vec3::new(-0.5, 0.0, -0.5), Vec3::new(0.5, 2.0, 0.5)),
    }
}

pub fn quad() -> TemplateGeometry {
    TemplateGeometry {
        counts: vec![4],
        indices: vec![0, 1, 2, 3],
        points: vec![Vec3::ZERO, Vec3::X, Vec3::new(1.0, 1.0, 0.0), Vec3::Y],
        normals: vec![Vec3::Z; 4],
        material: "/Looks/Skin".into(),
        uv_sets: vec![("map1".into(), vec![Vec2::ZERO, Vec2::X, Vec2::ONE, Vec2::Y])],
        ..Default::default()
    }
}

pub fn hair() -> TemplateGeometry {
    TemplateGeometry {
        counts: vec![2],
        points: vec![Vec3::new(0.0, 2.0, 0.0), Vec3::new(0.0, 2.2, 0.0)],
        widths: vec![0.02, 0.01],
        ..Default::default()
    }
}

pub fn triangle() -> TemplateGeometry {
    TemplateGeometry {
        counts: vec![3],
        indices: vec![0, 1, 2],
        points: vec![Vec3::ZERO, Vec3::X, Vec3::Y],
        ..Default::default()
    }
}

pub fn position(entity: usize, frame: i64) -> Vec3 {
    match entity {
        0 => Vec3::new(frame as f32, 0.0, 0.0),
        1 => Vec3::new(0.0, 0.0, 5.0),
        _ => Vec3::new(0.0, -5.0, 0.0),
    }
}

fn record(id: i64, attribute_offset: usize, killed_at: Option<i64>) -> EntityRecord {
    EntityRecord {
        id,
        character: 0,
        scale: 1.0,
        bone_offset: (id as usize - 1) * 2,
        attribute_offset,
        killed_at,
    }
}

pub fn frames() -> Vec<FrameData> {
    (FIRST..=LAST)
        .map(|f| FrameData {
            frame: f,
            enabled: vec![true, f != 3, true],
            positions: (0..3).map(|e| position(e, f)).collect(),
            bone_positions: (0..3).flat_map(|e| [position(e, f) + Vec3::Y, position(e, f) + Vec3::Y * 1.8]).collect(),
            bone_orientations: vec![Quat::IDENTITY; 6],
            per_point: vec![PerPointBuffer::Float(vec![f as f32, 0.0, 0.0])],
            shader_values: vec![AttributeValue::Float(0.5), AttributeValue::Float(0.6), AttributeValue::Float(0.7)],
        })
        .collect()
}

pub fn partition() -> SimulationData {
    SimulationData {
        name: "field A".into(),
        frame_range: FrameRange::new(FIRST, LAST),
        entities: vec![record(1, 0, None), record(2, 1, None), record(3, 2, Some(4))],
        per_point_attributes: vec![PerPointAttribute { name: "speed".into(), kind: AttributeKind::Float }],
        lod_thresholds: None,
    }
}

/// Simulation over a given partition, with the fixture templates.
pub fn simulation_of(data: SimulationData) -> MemorySimulation {
    let mut sim = MemorySimulation::new(vec![character()]);
    sim.add_partition(data, frames());
    sim.set_template(0, 0, vec![quad(), hair()]);
    sim.set_template(0, 1, vec![triangle()]);
    sim
}

pub fn simulation() -> MemorySimulation {
    simulation_of(partition())
}

pub fn build(config: StoreConfig, sim: MemorySimulation) -> (CrowdStore, Arc<MemorySimulation>) {
    init_logging("crowd_scene=warn");
    let sim = Arc::new(sim);
    let store = CrowdStore::new(config, sim.clone(), sim.clone(), None);
    (store, sim)
}

pub fn store(config: StoreConfig) -> (CrowdStore, Arc<MemorySimulation>) {
    build(config, simulation())
}

/// Local point drift of [`drifting`], per frame.
pub const DRIFT: Vec3 = Vec3::new(0.0, 0.5, 0.0);

/// Store whose deformed points also move in the entity's local frame.
pub fn drifting(config: StoreConfig) -> (CrowdStore, Arc<MemorySimulation>) {
    let mut sim = simulation();
    sim.set_point_drift(DRIFT);
    build(config, sim)
}

pub fn dynamic() -> StoreConfig {
    StoreConfig { lod_mode: LodMode::Dynamic, ..Default::default() }
}

pub fn points(value: Option<Value>) -> Vec<Vec3> {
    value.and_then(|v| v.as_float3_array().map(<[Vec3]>::to_vec)).unwrap_or_default()
}
