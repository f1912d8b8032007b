//! Frame compute engine.
//!
//! Turns (entity, frame) into a [`FrameSnapshot`]:
//!
//! 1. fetch read handles for the partition at the frame, under the
//!    partition lock only;
//! 2. take the entity's compute lock and re-check its cache;
//! 3. read enabled state and root position, short-circuit when disabled;
//! 4. resolve the geometry variant (static or camera-distance LOD);
//! 5. deform the variant's sub-assets (plus shutter samples) and move the
//!    results into the entity's local frame;
//! 6. derive velocities from the previous frame's cached snapshot;
//! 7. resolve custom attribute values;
//! 8. cache the snapshot.
//!
//! Failures in 3-7 yield a disabled snapshot for that frame only.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use smallvec::SmallVec;
use tracing::{debug, trace};

use super::lod::{select_lod, thresholds_for, LodMode};
use super::{Entity, FrameSnapshot, SubAssetFrame};
use crate::core::{Frame, Value};
use crate::schema::{CustomAttributes, CustomField, CustomSource};
use crate::sim::{
    AttributeKind, Character, DeformRequest, DeformedGeometry, EntityRecord, FrameHandles, GeometryPreparer,
    SimulationCache,
};
use crate::template::{TemplateCache, VariantTemplate};
use crate::util::{Error, Quat, Result, Vec3};

/// Engine switches derived from the store configuration.
#[derive(Clone, Debug)]
pub struct EngineSettings {
    pub lod_mode: LodMode,
    /// Frames per second, the velocity scale.
    pub frame_rate: f32,
    pub velocity: bool,
    /// Extra sub-frame samples for motion blur.
    pub shutter_offsets: SmallVec<[f32; 4]>,
    pub skeleton: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            lod_mode: LodMode::Static,
            frame_rate: 24.0,
            velocity: true,
            shutter_offsets: SmallVec::new(),
            skeleton: false,
        }
    }
}

/// Camera reference used for dynamic LOD selection.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CameraSample {
    pub position: Vec3,
    /// Bumped whenever the camera input is reassigned.
    pub generation: u64,
}

/// Engine counters.
#[derive(Debug, Default)]
pub struct EngineStats {
    pub evaluations: AtomicU64,
    pub cache_hits: AtomicU64,
    pub degraded: AtomicU64,
    pub evictions: AtomicU64,
}

/// Computes and caches frame snapshots.
pub struct FrameEngine {
    simulation: Arc<dyn SimulationCache>,
    preparer: Arc<dyn GeometryPreparer>,
    characters: Arc<Vec<Character>>,
    /// One per partition, held only around `SimulationCache::load`.
    partition_locks: Vec<Mutex<()>>,
    templates: TemplateCache,
    custom: CustomAttributes,
    settings: EngineSettings,
    stats: EngineStats,
}

impl FrameEngine {
    pub fn new(
        simulation: Arc<dyn SimulationCache>,
        preparer: Arc<dyn GeometryPreparer>,
        characters: Arc<Vec<Character>>,
        templates: TemplateCache,
        custom: CustomAttributes,
        settings: EngineSettings,
    ) -> Self {
        let partition_locks = (0..simulation.partition_count()).map(|_| Mutex::new(())).collect();
        Self {
            simulation,
            preparer,
            characters,
            partition_locks,
            templates,
            custom,
            settings,
            stats: EngineStats::default(),
        }
    }

    #[inline]
    pub fn templates(&self) -> &TemplateCache {
        &self.templates
    }

    #[inline]
    pub fn custom(&self) -> &CustomAttributes {
        &self.custom
    }

    #[inline]
    pub fn characters(&self) -> &[Character] {
        &self.characters
    }

    #[inline]
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    #[inline]
    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    /// Snapshot of an entity at a frame, computed at most once while cached.
    pub fn compute(&self, entity: &Entity, frame: Frame, camera: CameraSample) -> Arc<FrameSnapshot> {
        if let Some(snapshot) = self.fresh(entity, frame, camera) {
            self.stats.cache_hits.fetch_add(1, Ordering::Relaxed);
            return snapshot;
        }

        if entity.info.excluded {
            let _guard = entity.lock_compute();
            if let Some(snapshot) = self.fresh(entity, frame, camera) {
                return snapshot;
            }
            let snapshot = Arc::new(FrameSnapshot::disabled(
                frame,
                Vec3::ZERO,
                entity.info.default_variant,
                camera.generation,
            ));
            self.store(entity, frame, &snapshot);
            return snapshot;
        }

        // Partition lock is released before the entity lock is taken.
        let handles = {
            let _partition = self.partition_locks.get(entity.info.partition).map(|m| m.lock());
            self.simulation.load(entity.info.partition, frame)
        };

        let _guard = entity.lock_compute();
        if let Some(snapshot) = self.fresh(entity, frame, camera) {
            self.stats.cache_hits.fetch_add(1, Ordering::Relaxed);
            return snapshot;
        }

        self.stats.evaluations.fetch_add(1, Ordering::Relaxed);
        let snapshot = Arc::new(self.evaluate(entity, frame, handles, camera));
        self.store(entity, frame, &snapshot);
        snapshot
    }

    /// Cached snapshot usable for `camera`. A snapshot from a newer camera
    /// generation also answers callers still holding an older sample.
    fn fresh(&self, entity: &Entity, frame: Frame, camera: CameraSample) -> Option<Arc<FrameSnapshot>> {
        let snapshot = entity.cached(frame)?;
        let fresh = self.settings.lod_mode == LodMode::Static
            || !snapshot.enabled
            || snapshot.camera_generation >= camera.generation;
        fresh.then_some(snapshot)
    }

    /// Cache a snapshot. Callers hold the entity's compute lock, so the
    /// generation check and the insert do not race other writers.
    fn store(&self, entity: &Entity, frame: Frame, snapshot: &Arc<FrameSnapshot>) {
        if entity
            .cached(frame)
            .map_or(false, |cached| cached.camera_generation > snapshot.camera_generation)
        {
            return;
        }
        if let Some(evicted) = entity.insert(frame, Arc::clone(snapshot)) {
            self.stats.evictions.fetch_add(1, Ordering::Relaxed);
            trace!(entity = entity.id(), frame, evicted, "evicted cached frame");
        }
    }

    fn evaluate(
        &self,
        entity: &Entity,
        frame: Frame,
        handles: Result<FrameHandles>,
        camera: CameraSample,
    ) -> FrameSnapshot {
        let info = &entity.info;
        let degrade = |position: Vec3, e: Error| {
            debug!(entity = info.id, frame, "entity disabled for frame: {e}");
            self.stats.degraded.fetch_add(1, Ordering::Relaxed);
            FrameSnapshot::disabled(frame, position, info.default_variant, camera.generation)
        };

        let handles = match handles {
            Ok(handles) => handles,
            Err(e) => return degrade(Vec3::ZERO, e),
        };
        let position = handles.frame.positions.get(info.sim_index).copied();

        match self.evaluate_with(entity, frame, &handles, position, camera) {
            Ok(snapshot) => snapshot,
            Err(e) => degrade(position.unwrap_or(Vec3::ZERO), e),
        }
    }

    fn evaluate_with(
        &self,
        entity: &Entity,
        frame: Frame,
        handles: &FrameHandles,
        position: Option<Vec3>,
        camera: CameraSample,
    ) -> Result<FrameSnapshot> {
        let info = &entity.info;
        let record = handles
            .simulation
            .entities
            .get(info.sim_index)
            .ok_or_else(|| Error::other(format!("entity {} missing from simulation data", info.id)))?;

        let alive = info.killed_at.map_or(true, |k| frame < k);
        let enabled = alive && handles.frame.enabled.get(info.sim_index).copied().unwrap_or(false);
        if !enabled {
            return Ok(FrameSnapshot::disabled(
                frame,
                position.unwrap_or(Vec3::ZERO),
                info.default_variant,
                camera.generation,
            ));
        }

        let position = position.ok_or(Error::FrameUnavailable {
            partition: info.partition,
            frame,
        })?;
        let character = self
            .characters
            .get(info.character)
            .ok_or(Error::UnknownCharacter(info.character))?;

        let variant = match self.settings.lod_mode {
            LodMode::Static => info.default_variant,
            LodMode::Dynamic => {
                let thresholds = thresholds_for(character, info.character, &handles.simulation);
                select_lod(&thresholds, camera.position.distance(position))
            }
        };

        // Unavailable templates leave the snapshot without sub-assets.
        let sub_assets = match self.templates.get(info.character, variant) {
            Some(template) => {
                let mut subs = self.deform(entity, record, character, variant, template, frame, position, handles)?;
                self.apply_velocities(entity, frame, variant, template, &mut subs);
                subs
            }
            None => Vec::new(),
        };

        let custom = self.resolve_custom(info.partition, info.character, record, info.sim_index, character, handles);

        let (bone_translations, bone_rotations) = if self.settings.skeleton {
            bones(character, record, position, handles)
        } else {
            (Vec::new(), Vec::new())
        };

        Ok(FrameSnapshot {
            frame,
            enabled: true,
            position,
            variant,
            camera_generation: camera.generation,
            custom,
            sub_assets,
            bone_translations: Arc::new(bone_translations),
            bone_rotations: Arc::new(bone_rotations),
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn deform(
        &self,
        entity: &Entity,
        record: &EntityRecord,
        character: &Character,
        variant: usize,
        template: &VariantTemplate,
        frame: Frame,
        position: Vec3,
        handles: &FrameHandles,
    ) -> Result<Vec<SubAssetFrame>> {
        let sample = |shutter_offset: f32| -> Result<Vec<DeformedGeometry>> {
            let deformed = self.preparer.deform(&DeformRequest {
                character,
                variant,
                entity: record,
                entity_index: entity.info.sim_index,
                frame,
                shutter_offset,
                handles,
            })?;
            if deformed.len() != template.sub_assets.len() {
                return Err(Error::preparation(format!(
                    "expected {} deformed sub-assets, got {}",
                    template.sub_assets.len(),
                    deformed.len()
                )));
            }
            for (geo, t) in deformed.iter().zip(&template.sub_assets) {
                if geo.points.len() != t.num_points() {
                    return Err(Error::preparation(format!(
                        "{}: {} deformed points, template has {}",
                        t.name,
                        geo.points.len(),
                        t.num_points()
                    )));
                }
            }
            Ok(deformed)
        };

        let mut out: Vec<SubAssetFrame> = sample(0.0)?
            .into_iter()
            .zip(&template.sub_assets)
            .map(|(geo, t)| SubAssetFrame {
                normals: if geo.normals.len() == t.num_points() {
                    Arc::new(geo.normals)
                } else {
                    Arc::clone(&t.normals)
                },
                points: Arc::new(to_local(geo.points, position)),
                velocities: Arc::clone(&t.velocities),
                shutter_points: SmallVec::new(),
            })
            .collect();

        for &offset in &self.settings.shutter_offsets {
            for (sub, geo) in out.iter_mut().zip(sample(offset)?) {
                sub.shutter_points.push(Arc::new(to_local(geo.points, position)));
            }
        }
        Ok(out)
    }

    /// Local-space velocities from the previous frame when it is cached with
    /// the same variant. Root motion is carried by the translate, not here.
    /// Anything else keeps the template's zero velocities.
    fn apply_velocities(
        &self,
        entity: &Entity,
        frame: Frame,
        variant: usize,
        template: &VariantTemplate,
        sub_assets: &mut [SubAssetFrame],
    ) {
        if !self.settings.velocity {
            return;
        }
        let Some(previous) = entity.cached(frame - 1) else {
            return;
        };
        if !previous.enabled || previous.variant != variant || previous.sub_assets.len() != sub_assets.len() {
            return;
        }

        let rate = self.settings.frame_rate;
        for ((sub, prev), t) in sub_assets.iter_mut().zip(&previous.sub_assets).zip(&template.sub_assets) {
            if prev.points.len() != sub.points.len() {
                sub.velocities = Arc::clone(&t.velocities);
                continue;
            }
            let velocities = sub
                .points
                .iter()
                .zip(prev.points.iter())
                .map(|(cur, old)| (*cur - *old) * rate)
                .collect();
            sub.velocities = Arc::new(velocities);
        }
    }

    fn resolve_custom(
        &self,
        partition: usize,
        character_index: usize,
        record: &EntityRecord,
        sim_index: usize,
        character: &Character,
        handles: &FrameHandles,
    ) -> Vec<Value> {
        self.custom
            .fields(partition)
            .iter()
            .map(|field| match field.source {
                CustomSource::Shader { global } => match self.custom.specific_index(character_index, global) {
                    Some(specific) => handles
                        .frame
                        .shader_values
                        .get(record.attribute_offset + specific)
                        .filter(|v| v.kind() == field.kind)
                        .or_else(|| character.shader_attributes.get(specific).map(|a| &a.default))
                        .map(|v| v.to_value())
                        .unwrap_or_else(|| field.default.clone()),
                    None => field.default.clone(),
                },
                CustomSource::PerPoint { attribute } => handles
                    .frame
                    .per_point
                    .get(attribute)
                    .and_then(|buffer| buffer.value(sim_index))
                    .filter(|v| matches_kind(v, field))
                    .unwrap_or_else(|| field.default.clone()),
            })
            .collect()
    }
}

fn matches_kind(value: &Value, field: &CustomField) -> bool {
    matches!(
        (value, field.kind),
        (Value::Float(_), AttributeKind::Float) | (Value::Float3(_), AttributeKind::Vector)
    )
}

fn to_local(mut points: Vec<Vec3>, position: Vec3) -> Vec<Vec3> {
    for p in &mut points {
        *p -= position;
    }
    points
}

/// Bone transforms at the entity's bone offset; empty when out of range.
fn bones(character: &Character, record: &EntityRecord, position: Vec3, handles: &FrameHandles) -> (Vec<Vec3>, Vec<Quat>) {
    let range = record.bone_offset..record.bone_offset + character.bones.len();
    let translations = handles
        .frame
        .bone_positions
        .get(range.clone())
        .map(|b| b.iter().map(|p| *p - position).collect())
        .unwrap_or_default();
    let rotations = handles
        .frame
        .bone_orientations
        .get(range)
        .map(<[Quat]>::to_vec)
        .unwrap_or_default();
    (translations, rotations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::FrameRange;
    use crate::frame::EntityInfo;
    use crate::sim::memory::MemorySimulation;
    use crate::sim::{
        AttributeValue, FrameData, GeometryVariant, PerPointAttribute, PerPointBuffer, ShaderAttribute,
        SimulationData, SubAssetDesc, TemplateGeometry,
    };
    use crate::template::{TemplateJob, TemplateKey};
    use crate::util::BBox3f;

    const FRAMES: i64 = 6;

    fn character() -> Character {
        Character {
            name: "Man".into(),
            variants: vec![
                GeometryVariant {
                    name: "LOD0".into(),
                    lod_threshold: 0.0,
                    sub_assets: vec![SubAssetDesc::mesh("Body", "")],
                },
                GeometryVariant {
                    name: "LOD1".into(),
                    lod_threshold: 10.0,
                    sub_assets: vec![SubAssetDesc::mesh("Body", "")],
                },
            ],
            bones: vec!["hips".into(), "head".into()],
            shader_attributes: vec![ShaderAttribute { name: "hue".into(), default: AttributeValue::Float(0.25) }],
            extent: BBox3f::EMPTY,
        }
    }

    fn triangle() -> TemplateGeometry {
        TemplateGeometry {
            counts: vec![3],
            indices: vec![0, 1, 2],
            points: vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            normals: vec![Vec3::Z; 3],
            ..Default::default()
        }
    }

    /// One entity walking +X one unit per frame, disabled at frame 4.
    fn simulation() -> MemorySimulation {
        let mut sim = MemorySimulation::new(vec![character()]);
        let frames = (1..=FRAMES)
            .map(|f| FrameData {
                frame: f,
                enabled: vec![f != 4],
                positions: vec![Vec3::new(f as f32, 0.0, 0.0)],
                bone_positions: vec![Vec3::new(f as f32, 1.0, 0.0), Vec3::new(f as f32, 2.0, 0.0)],
                bone_orientations: vec![Quat::IDENTITY; 2],
                per_point: vec![PerPointBuffer::Float(vec![f as f32 * 0.5])],
                shader_values: vec![AttributeValue::Float(0.75)],
            })
            .collect();
        sim.add_partition(
            SimulationData {
                name: "cf".into(),
                frame_range: FrameRange::new(1, FRAMES),
                entities: vec![EntityRecord {
                    id: 7,
                    character: 0,
                    scale: 1.0,
                    bone_offset: 0,
                    attribute_offset: 0,
                    killed_at: None,
                }],
                per_point_attributes: vec![PerPointAttribute { name: "speed".into(), kind: AttributeKind::Float }],
                lod_thresholds: None,
            },
            frames,
        );
        sim.set_template(0, 0, vec![triangle()]);
        sim.set_template(0, 1, vec![triangle()]);
        sim
    }

    fn engine(sim: Arc<MemorySimulation>, settings: EngineSettings) -> FrameEngine {
        let characters = sim.characters().unwrap();
        let data = sim.simulation(0).unwrap();
        let handles = sim.load(0, 1).unwrap();
        let jobs: Vec<_> = (0..2)
            .map(|v| TemplateJob {
                key: TemplateKey::new(0, v),
                entity: &data.entities[0],
                entity_index: 0,
                handles: &handles,
            })
            .collect();
        let templates = TemplateCache::build(&characters, &jobs, sim.as_ref());
        let custom = CustomAttributes::build(&characters, &[data.as_ref()], "");
        FrameEngine::new(sim.clone(), sim, characters, templates, custom, settings)
    }

    fn entity(retained: usize) -> Entity {
        Entity::new(
            EntityInfo {
                id: 7,
                name: "Entity_7".into(),
                partition: 0,
                sim_index: 0,
                character: 0,
                scale: 1.0,
                bone_offset: 0,
                attribute_offset: 0,
                killed_at: None,
                excluded: false,
                default_variant: 0,
                extent: BBox3f::EMPTY,
            },
            retained,
        )
    }

    #[test]
    fn test_compute_is_cached() {
        let sim = Arc::new(simulation());
        let engine = engine(sim.clone(), EngineSettings::default());
        let e = entity(3);

        let a = engine.compute(&e, 2, CameraSample::default());
        let b = engine.compute(&e, 2, CameraSample::default());
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(sim.deform_calls(), 1);
        assert_eq!(engine.stats().cache_hits.load(Ordering::Relaxed), 1);

        // local frame: world minus root
        assert_eq!(a.position, Vec3::new(2.0, 0.0, 0.0));
        assert_eq!(*a.sub_assets[0].points, vec![Vec3::ZERO, Vec3::X, Vec3::Y]);
        assert_eq!(*a.sub_assets[0].normals, vec![Vec3::Z; 3]);
    }

    #[test]
    fn test_velocity_from_previous_frame() {
        let mut sim = simulation();
        sim.set_point_drift(Vec3::new(0.0, 0.5, 0.0));
        let sim = Arc::new(sim);
        let engine = engine(sim, EngineSettings::default());
        let e = entity(3);

        let first = engine.compute(&e, 1, CameraSample::default());
        assert!(first.sub_assets[0].velocities.iter().all(|v| *v == Vec3::ZERO));

        // points drift +Y half a unit per frame in the local frame
        let second = engine.compute(&e, 2, CameraSample::default());
        assert!(second.sub_assets[0].velocities.iter().all(|v| *v == Vec3::new(0.0, 12.0, 0.0)));
        let delta = second.sub_assets[0].points[1] - first.sub_assets[0].points[1];
        assert_eq!(second.sub_assets[0].velocities[1], delta * 24.0);

        // frame 4 disabled, so frame 5 has no usable predecessor
        assert!(!engine.compute(&e, 4, CameraSample::default()).enabled);
        let fifth = engine.compute(&e, 5, CameraSample::default());
        assert!(fifth.sub_assets[0].velocities.iter().all(|v| *v == Vec3::ZERO));
    }

    #[test]
    fn test_velocity_disabled_by_settings() {
        let sim = Arc::new(simulation());
        let settings = EngineSettings { velocity: false, ..Default::default() };
        let engine = engine(sim, settings);
        let e = entity(3);
        engine.compute(&e, 1, CameraSample::default());
        let second = engine.compute(&e, 2, CameraSample::default());
        assert!(second.sub_assets[0].velocities.iter().all(|v| *v == Vec3::ZERO));
    }

    #[test]
    fn test_disabled_frame_keeps_position() {
        let sim = Arc::new(simulation());
        let engine = engine(sim.clone(), EngineSettings::default());
        let e = entity(3);
        let s = engine.compute(&e, 4, CameraSample::default());
        assert!(!s.enabled);
        assert_eq!(s.position, Vec3::new(4.0, 0.0, 0.0));
        assert!(s.sub_assets.is_empty());
        assert_eq!(sim.deform_calls(), 0);
    }

    #[test]
    fn test_failures_degrade() {
        let sim = Arc::new(simulation());
        sim.fail_deform(7, 3);
        let engine = engine(sim, EngineSettings::default());
        let e = entity(3);

        assert!(!engine.compute(&e, 3, CameraSample::default()).enabled);
        // missing frame data
        assert!(!engine.compute(&e, 99, CameraSample::default()).enabled);
        assert_eq!(engine.stats().degraded.load(Ordering::Relaxed), 2);
        assert!(engine.compute(&e, 2, CameraSample::default()).enabled);
    }

    #[test]
    fn test_excluded_skips_collaborators() {
        let sim = Arc::new(simulation());
        let engine = engine(sim.clone(), EngineSettings::default());
        let mut e = entity(3);
        e.info.excluded = true;
        let loads = sim.load_calls();
        assert!(!engine.compute(&e, 2, CameraSample::default()).enabled);
        assert_eq!(sim.load_calls(), loads);
        assert_eq!(sim.deform_calls(), 0);
    }

    #[test]
    fn test_killed_entity() {
        let sim = Arc::new(simulation());
        let engine = engine(sim, EngineSettings::default());
        let mut e = entity(3);
        e.info.killed_at = Some(3);
        assert!(engine.compute(&e, 2, CameraSample::default()).enabled);
        assert!(!engine.compute(&e, 3, CameraSample::default()).enabled);
        assert!(!engine.compute(&e, 5, CameraSample::default()).enabled);
    }

    #[test]
    fn test_dynamic_lod_follows_camera_generation() {
        let sim = Arc::new(simulation());
        let settings = EngineSettings { lod_mode: LodMode::Dynamic, ..Default::default() };
        let engine = engine(sim.clone(), settings);
        let e = entity(3);

        // entity at x=1
        let near = CameraSample { position: Vec3::new(6.0, 0.0, 0.0), generation: 0 };
        assert_eq!(engine.compute(&e, 1, near).variant, 0);
        assert_eq!(engine.compute(&e, 1, near).variant, 0);
        assert_eq!(sim.deform_calls(), 1);

        let far = CameraSample { position: Vec3::new(21.0, 0.0, 0.0), generation: 1 };
        assert_eq!(engine.compute(&e, 1, far).variant, 1);
        assert_eq!(sim.deform_calls(), 2);
    }

    #[test]
    fn test_root_motion_has_no_velocity() {
        let sim = Arc::new(simulation());
        let engine = engine(sim, EngineSettings::default());
        let e = entity(3);
        engine.compute(&e, 1, CameraSample::default());
        let second = engine.compute(&e, 2, CameraSample::default());
        // the entity walks +X but its points are rigid in the local frame
        assert_eq!(*second.sub_assets[0].velocities, vec![Vec3::ZERO; 3]);
    }

    #[test]
    fn test_stale_camera_keeps_newer_snapshot() {
        let sim = Arc::new(simulation());
        let settings = EngineSettings { lod_mode: LodMode::Dynamic, ..Default::default() };
        let engine = engine(sim.clone(), settings);
        let e = entity(3);

        let far = CameraSample { position: Vec3::new(21.0, 0.0, 0.0), generation: 1 };
        let newer = engine.compute(&e, 1, far);
        assert_eq!(newer.variant, 1);

        // a caller that sampled the camera before it moved
        let stale = CameraSample { position: Vec3::new(6.0, 0.0, 0.0), generation: 0 };
        let answer = engine.compute(&e, 1, stale);
        assert!(Arc::ptr_eq(&answer, &newer));
        assert_eq!(sim.deform_calls(), 1);

        // an older snapshot never replaces a newer cached one
        let old = Arc::new(FrameSnapshot::disabled(1, Vec3::ZERO, 0, 0));
        engine.store(&e, 1, &old);
        assert_eq!(e.cached(1).map(|s| s.camera_generation), Some(1));
    }

    #[test]
    fn test_custom_values() {
        let sim = Arc::new(simulation());
        let engine = engine(sim, EngineSettings::default());
        let e = entity(3);
        let s = engine.compute(&e, 2, CameraSample::default());
        assert_eq!(s.custom, vec![Value::Float(0.75), Value::Float(1.0)]);
    }

    #[test]
    fn test_bones_and_shutter() {
        let sim = Arc::new(simulation());
        let settings = EngineSettings {
            skeleton: true,
            shutter_offsets: SmallVec::from_slice(&[-0.25, 0.25]),
            ..Default::default()
        };
        let engine = engine(sim.clone(), settings);
        let e = entity(3);
        let s = engine.compute(&e, 2, CameraSample::default());

        assert_eq!(*s.bone_translations, vec![Vec3::Y, Vec3::new(0.0, 2.0, 0.0)]);
        assert_eq!(s.bone_rotations.len(), 2);

        let sub = &s.sub_assets[0];
        assert_eq!(sub.shutter_points.len(), 2);
        assert_eq!(sub.shutter_points[0][0], Vec3::new(-0.25, 0.0, 0.0));
        assert_eq!(sub.shutter_points[1][0], Vec3::new(0.25, 0.0, 0.0));
        assert_eq!(sim.deform_calls(), 3);
    }
}
