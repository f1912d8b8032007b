//! Query facade.
//!
//! [`CrowdStore`] is the public read surface of the virtual scene. It is
//! built once from a [`StoreConfig`] and the external collaborators, and
//! then answers, from any number of threads:
//!
//! - existence and schema queries ([`CrowdStore::has_spec`],
//!   [`CrowdStore::list_fields`], [`CrowdStore::list`], [`CrowdStore::has`]),
//!   which never evaluate a frame;
//! - time-sampled value queries ([`CrowdStore::query_time_sample`]), which
//!   go through the frame engine and the per-entity frame caches;
//! - time-sample bracketing over the fixed integer frame range.
//!
//! A store that fails to build (bad config, unreadable simulation) is empty:
//! every query answers "not found".
//!
//! # Example
//!
//! ```ignore
//! use crowd_scene::prelude::*;
//!
//! let store = CrowdStore::new(StoreConfig::default(), sim.clone(), sim, None);
//! let points = store.query_time_sample("/crowd/cf/Entity_1/Geometry/Body.points", 12.0);
//! ```

pub mod config;
mod params;

pub use config::StoreConfig;
pub use params::ConnectedParams;

use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::{Arc, OnceLock};

use tracing::{error, info, warn};

use crate::core::{Frame, FrameRange, Value};
use crate::frame::{CameraSample, Entity, EntityInfo, FrameEngine, FrameSnapshot, LodMode};
use crate::registry::{Layout, NodeId, NodeKind, PathRegistry};
use crate::schema::{
    fields, resolve_field, CustomAttributes, CustomField, DynamicFields, FieldId, FieldRef, Visibility,
    PRIM_METADATA, PSEUDO_ROOT_METADATA,
};
use crate::sim::{
    Character, FrameHandles, GeometryPreparer, ParameterSource, SimulationCache, SimulationData,
};
use crate::template::{SubAssetTemplate, TemplateCache, TemplateJob, TemplateKey};
use crate::util::{sanitize_identifier, Error, Result, Vec3};

/// Kind of spec at a path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SpecType {
    PseudoRoot,
    Prim,
    Attribute,
}

/// Counters and sizes of a store.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub entities: usize,
    pub excluded: usize,
    pub templates: usize,
    pub failed_templates: usize,
    pub paths: usize,
    pub evaluations: u64,
    pub cache_hits: u64,
    pub degraded: u64,
    pub evictions: u64,
}

/// Resolved path: a node plus an optional field of it.
struct Resolved<'a> {
    node: NodeId,
    kind: NodeKind,
    field: Option<FieldRef<'a>>,
}

/// Lazily evaluated virtual scene of a crowd simulation.
pub struct CrowdStore {
    config: StoreConfig,
    frame_range: FrameRange,
    registry: PathRegistry,
    entities: Vec<Entity>,
    /// `None` for an empty store.
    engine: Option<FrameEngine>,
    params: ConnectedParams,
    time_samples: OnceLock<Arc<[f64]>>,
}

impl CrowdStore {
    /// Build a store. Construction errors are logged once and yield an
    /// empty store.
    pub fn new(
        config: StoreConfig,
        simulation: Arc<dyn SimulationCache>,
        preparer: Arc<dyn GeometryPreparer>,
        parameters: Option<Arc<dyn ParameterSource>>,
    ) -> Self {
        match Self::try_new(config.clone(), simulation, preparer, parameters.clone()) {
            Ok(store) => store,
            Err(e) => {
                error!("crowd store unavailable: {e}");
                Self::empty(config, parameters)
            }
        }
    }

    /// Store answering "not found" to everything.
    pub fn empty(config: StoreConfig, parameters: Option<Arc<dyn ParameterSource>>) -> Self {
        let params = ConnectedParams::new(config.camera_position(), config.camera_source.clone(), parameters);
        Self {
            frame_range: config.frame_range().unwrap_or_default(),
            config,
            registry: PathRegistry::empty(),
            entities: Vec::new(),
            engine: None,
            params,
            time_samples: OnceLock::new(),
        }
    }

    /// Build a store, returning the construction error.
    #[tracing::instrument(skip_all, fields(root = %config.root_name))]
    pub fn try_new(
        config: StoreConfig,
        simulation: Arc<dyn SimulationCache>,
        preparer: Arc<dyn GeometryPreparer>,
        parameters: Option<Arc<dyn ParameterSource>>,
    ) -> Result<Self> {
        config.validate()?;

        let characters = simulation.characters()?;
        let partition_count = simulation.partition_count();
        if partition_count == 0 {
            return Err(Error::config("simulation has no crowd fields"));
        }
        let partitions = (0..partition_count)
            .map(|p| simulation.simulation(p))
            .collect::<Result<Vec<_>>>()?;

        let frame_range = match config.frame_range() {
            Some(range) => range,
            None => partitions
                .iter()
                .map(|p| p.frame_range)
                .reduce(|a, b| a.union(&b))
                .unwrap_or_default(),
        };

        let infos = collect_entities(&config, &characters, &partitions, frame_range);
        let excluded = infos.iter().filter(|i| i.excluded).count();

        let partition_refs: Vec<&SimulationData> = partitions.iter().map(Arc::as_ref).collect();
        let custom = CustomAttributes::build(&characters, &partition_refs, &config.attribute_namespace);

        let templates = prepare_templates(
            &config,
            &characters,
            &partitions,
            &infos,
            simulation.as_ref(),
            preparer.as_ref(),
            frame_range.start,
        );

        let names: Vec<String> = partitions.iter().map(|p| p.name.clone()).collect();
        let layout = Layout {
            root_name: &config.root_name,
            lod_mode: config.lod_mode,
            skeleton: config.enable_skeleton,
            fur: config.enable_fur,
        };
        let registry = PathRegistry::build(&layout, &names, &infos, &characters, &templates);

        info!(
            entities = infos.len(),
            excluded,
            templates = templates.len(),
            failed_templates = templates.failed_count(),
            paths = registry.len(),
            frames = frame_range.num_samples(),
            "crowd store ready"
        );

        let retained = config.retained_frames();
        let entities = infos.into_iter().map(|info| Entity::new(info, retained)).collect();
        let engine = FrameEngine::new(
            simulation,
            preparer,
            characters,
            templates,
            custom,
            config.engine_settings(),
        );
        let params = ConnectedParams::new(config.camera_position(), config.camera_source.clone(), parameters);

        Ok(Self {
            config,
            frame_range,
            registry,
            entities,
            engine: Some(engine),
            params,
            time_samples: OnceLock::new(),
        })
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    #[inline]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    #[inline]
    pub fn registry(&self) -> &PathRegistry {
        &self.registry
    }

    /// Whether construction failed.
    pub fn is_empty(&self) -> bool {
        self.engine.is_none()
    }

    #[inline]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    #[inline]
    pub fn entity(&self, index: usize) -> Option<&Entity> {
        self.entities.get(index)
    }

    /// Entity owning the prim at `path` (the entity prim or any descendant).
    pub fn entity_by_path(&self, path: &str) -> Option<&Entity> {
        let (prim, _) = split_property(path);
        let id = self.registry.lookup(prim)?;
        let entity = self.registry.node(id)?.kind.entity()?;
        self.entities.get(entity)
    }

    pub fn stats(&self) -> StoreStats {
        let mut stats = StoreStats {
            entities: self.entities.len(),
            excluded: self.entities.iter().filter(|e| e.info.excluded).count(),
            paths: self.registry.len(),
            ..Default::default()
        };
        if let Some(engine) = &self.engine {
            let s = engine.stats();
            stats.templates = engine.templates().len();
            stats.failed_templates = engine.templates().failed_count();
            stats.evaluations = s.evaluations.load(Ordering::Relaxed);
            stats.cache_hits = s.cache_hits.load(Ordering::Relaxed);
            stats.degraded = s.degraded.load(Ordering::Relaxed);
            stats.evictions = s.evictions.load(Ordering::Relaxed);
        }
        stats
    }

    // ------------------------------------------------------------------------
    // Connected parameters
    // ------------------------------------------------------------------------

    /// Connect the LOD camera to a host source path.
    pub fn connect_camera(&self, source: impl Into<String>) {
        self.params.connect(source);
    }

    /// Set a constant LOD camera position.
    pub fn set_camera_position(&self, position: Vec3) {
        self.params.set_position(position);
    }

    fn camera(&self, frame: Frame) -> CameraSample {
        match self.config.lod_mode {
            LodMode::Dynamic => self.params.camera(frame),
            LodMode::Static => CameraSample { position: Vec3::ZERO, generation: self.params.generation() },
        }
    }

    // ------------------------------------------------------------------------
    // Time sampling
    // ------------------------------------------------------------------------

    #[inline]
    pub fn frame_range(&self) -> FrameRange {
        self.frame_range
    }

    /// Lower and upper sample times around `time`. Always equal.
    #[inline]
    pub fn bracket_time_samples(&self, time: f64) -> (f64, f64) {
        self.frame_range.bracket(time)
    }

    /// All sample times, built on first use.
    pub fn time_samples(&self) -> Arc<[f64]> {
        Arc::clone(self.time_samples.get_or_init(|| self.frame_range.sample_times().into()))
    }

    #[inline]
    pub fn num_time_samples(&self) -> usize {
        self.frame_range.num_samples()
    }

    // ------------------------------------------------------------------------
    // Schema queries
    // ------------------------------------------------------------------------

    /// Check whether a prim or attribute spec exists.
    pub fn has_spec(&self, path: &str) -> bool {
        self.spec_type(path).is_some()
    }

    pub fn spec_type(&self, path: &str) -> Option<SpecType> {
        let resolved = self.resolve(path)?;
        Some(match resolved.field {
            Some(_) => SpecType::Attribute,
            None if self.registry.is_pseudo_root(resolved.node) => SpecType::PseudoRoot,
            None => SpecType::Prim,
        })
    }

    /// Child prim names.
    pub fn list_children(&self, path: &str) -> Vec<String> {
        self.registry.children(path)
    }

    /// Attribute names of a prim, in schema order.
    pub fn list_fields(&self, path: &str) -> Vec<String> {
        match self.resolve(path) {
            Some(Resolved { field: None, kind, .. }) => self.fields_of(&kind).iter().map(|f| f.name.to_string()).collect(),
            _ => Vec::new(),
        }
    }

    /// Metadata keys of a spec.
    pub fn list(&self, path: &str) -> Vec<&'static str> {
        let Some(resolved) = self.resolve(path) else {
            return Vec::new();
        };
        match resolved.field {
            Some(field) => field.metadata_fields().to_vec(),
            None if self.registry.is_pseudo_root(resolved.node) => PSEUDO_ROOT_METADATA.to_vec(),
            None => PRIM_METADATA.to_vec(),
        }
    }

    /// Metadata value of a spec. Never evaluates a frame.
    pub fn has(&self, path: &str, key: &str) -> Option<Value> {
        let resolved = self.resolve(path)?;
        let Some(field) = resolved.field else {
            return self.prim_metadata(&resolved, key);
        };
        if !field.metadata_fields().iter().any(|k| *k == key) {
            return None;
        }
        match key {
            "typeName" => Some(Value::token(field.value_type.type_name())),
            "custom" => Some(Value::Bool(field.is_custom())),
            "variability" => Some(Value::token(field.variability.as_token())),
            "interpolation" => Some(Value::token(field.interpolation.as_token())),
            "timeSamples" => Some(Value::DoubleArray(Arc::new(self.time_samples().to_vec()))),
            "default" => self.default_value(&resolved.kind, &field),
            _ => None,
        }
    }

    fn prim_metadata(&self, resolved: &Resolved<'_>, key: &str) -> Option<Value> {
        let path = self.registry.path_of(resolved.node)?;
        let children = || Value::TokenArray(Arc::new(self.registry.children(path)));
        if self.registry.is_pseudo_root(resolved.node) {
            return (key == "primChildren").then(children);
        }
        match key {
            "specifier" => Some(Value::token("def")),
            "typeName" => Some(Value::token(resolved.kind.schema_kind().prim_type_name())),
            "primChildren" => Some(children()),
            "properties" => Some(Value::TokenArray(Arc::new(
                self.fields_of(&resolved.kind).iter().map(|f| f.name.to_string()).collect(),
            ))),
            _ => None,
        }
    }

    // ------------------------------------------------------------------------
    // Value queries
    // ------------------------------------------------------------------------

    /// Snapshot of an entity at a frame.
    pub fn compute(&self, entity: usize, frame: Frame) -> Option<Arc<FrameSnapshot>> {
        let engine = self.engine.as_ref()?;
        let entity = self.entities.get(entity)?;
        Some(engine.compute(entity, frame, self.camera(frame)))
    }

    /// Value of an attribute at a time.
    ///
    /// The time is clamped into the frame range and floored to a frame.
    pub fn query_time_sample(&self, path: &str, time: f64) -> Option<Value> {
        let resolved = self.resolve(path)?;
        let field = resolved.field?;
        let frame = self.frame_range.frame_for_time(time);

        match resolved.kind {
            NodeKind::Group => None,
            NodeKind::Entity { entity } => self.entity_value(entity, &field, frame),
            NodeKind::Lod { entity, variant } => {
                debug_assert_eq!(field.id, FieldId::Visibility);
                let snapshot = self.compute(entity, frame)?;
                Some(Visibility::from_active(snapshot.enabled && snapshot.variant == variant).into())
            }
            NodeKind::Mesh { entity, variant, sub } | NodeKind::Fur { entity, variant, sub } => {
                self.sub_asset_value(entity, variant, sub, &field, frame)
            }
            NodeKind::Skel { entity } => self.skeleton_value(entity, &field, frame),
        }
    }

    /// Motion blur samples of a mesh or fur prim's points, in shutter
    /// offset order.
    pub fn query_shutter_points(&self, path: &str, time: f64) -> Option<Vec<Value>> {
        let resolved = self.resolve(path)?;
        let (NodeKind::Mesh { entity, variant, sub } | NodeKind::Fur { entity, variant, sub }) = resolved.kind else {
            return None;
        };
        let snapshot = self.compute(entity, self.frame_range.frame_for_time(time))?;
        let frame = snapshot.sub_asset(variant, sub)?;
        Some(frame.shutter_points.iter().map(|p| Value::Float3Array(Arc::clone(p))).collect())
    }

    fn entity_value(&self, index: usize, field: &FieldRef<'_>, frame: Frame) -> Option<Value> {
        let entity = self.entities.get(index)?;
        if !field.is_time_varying() {
            return self.entity_uniform(entity, field.id);
        }
        let snapshot = self.compute(index, frame)?;
        match field.id {
            FieldId::Visibility => Some(Visibility::from_active(snapshot.enabled).into()),
            FieldId::Translate => Some(Value::Float3(snapshot.position)),
            FieldId::Custom(i) if snapshot.enabled => snapshot.custom.get(i).cloned(),
            _ => None,
        }
    }

    fn entity_uniform(&self, entity: &Entity, id: FieldId) -> Option<Value> {
        match id {
            FieldId::Extent => {
                let extent = entity.info.extent;
                let corners = if extent.is_empty() { vec![Vec3::ZERO; 2] } else { extent.corners() };
                Some(Value::Float3Array(Arc::new(corners)))
            }
            FieldId::EntityId => Some(Value::Int64(entity.info.id)),
            FieldId::CharacterName => {
                let character = self.character(entity)?;
                Some(Value::token(character.name.clone()))
            }
            _ => None,
        }
    }

    fn sub_asset_value(&self, index: usize, variant: usize, sub: usize, field: &FieldRef<'_>, frame: Frame) -> Option<Value> {
        let snapshot = self.compute(index, frame)?;
        let current = snapshot.sub_asset(variant, sub)?;
        let template = self.template(index, variant, sub)?;
        match field.id {
            FieldId::Visibility => Some(Visibility::Inherited.into()),
            FieldId::Points => Some(Value::Float3Array(Arc::clone(&current.points))),
            FieldId::Normals => Some(Value::Float3Array(Arc::clone(&current.normals))),
            FieldId::Velocities => Some(Value::Float3Array(Arc::clone(&current.velocities))),
            id => template_value(template, id),
        }
    }

    fn skeleton_value(&self, index: usize, field: &FieldRef<'_>, frame: Frame) -> Option<Value> {
        let entity = self.entities.get(index)?;
        match field.id {
            FieldId::Joints => Some(Value::TokenArray(Arc::new(self.character(entity)?.bones.clone()))),
            FieldId::Scales => {
                let count = self.character(entity)?.bones.len();
                Some(Value::Float3Array(Arc::new(vec![Vec3::splat(entity.info.scale); count])))
            }
            FieldId::Translations | FieldId::Rotations => {
                let snapshot = self.compute(index, frame)?;
                if !snapshot.enabled {
                    return None;
                }
                Some(match field.id {
                    FieldId::Translations => Value::Float3Array(Arc::clone(&snapshot.bone_translations)),
                    _ => Value::QuatArray(Arc::clone(&snapshot.bone_rotations)),
                })
            }
            _ => None,
        }
    }

    /// Schema default of a field, from templates and entity data only.
    fn default_value(&self, kind: &NodeKind, field: &FieldRef<'_>) -> Option<Value> {
        if field.id == FieldId::Visibility {
            return Some(Visibility::Inherited.into());
        }
        match *kind {
            NodeKind::Entity { entity } => {
                let e = self.entities.get(entity)?;
                match field.id {
                    FieldId::Custom(i) => self.custom_fields(e).get(i).map(|c| c.default.clone()),
                    id => self.entity_uniform(e, id),
                }
            }
            NodeKind::Mesh { entity, variant, sub } | NodeKind::Fur { entity, variant, sub } => {
                let template = self.template(entity, variant, sub)?;
                match field.id {
                    FieldId::Points => Some(Value::Float3Array(Arc::clone(&template.points))),
                    FieldId::Normals => Some(Value::Float3Array(Arc::clone(&template.normals))),
                    FieldId::Velocities => Some(Value::Float3Array(Arc::clone(&template.velocities))),
                    id => template_value(template, id),
                }
            }
            NodeKind::Skel { entity } => {
                let e = self.entities.get(entity)?;
                match field.id {
                    FieldId::Joints => Some(Value::TokenArray(Arc::new(self.character(e)?.bones.clone()))),
                    FieldId::Scales => {
                        let count = self.character(e)?.bones.len();
                        Some(Value::Float3Array(Arc::new(vec![Vec3::splat(e.info.scale); count])))
                    }
                    _ => None,
                }
            }
            NodeKind::Group | NodeKind::Lod { .. } => None,
        }
    }

    // ------------------------------------------------------------------------
    // Resolution helpers
    // ------------------------------------------------------------------------

    fn resolve(&self, path: &str) -> Option<Resolved<'_>> {
        let (prim, field) = split_property(path);
        let node = self.registry.lookup(prim)?;
        let kind = self.registry.node(node)?.kind;
        let field = match field {
            Some(name) => Some(resolve_field(kind.schema_kind(), name, self.dynamic_fields(&kind))?),
            None => None,
        };
        Some(Resolved { node, kind, field })
    }

    fn fields_of(&self, kind: &NodeKind) -> Vec<FieldRef<'_>> {
        fields(kind.schema_kind(), self.dynamic_fields(kind))
    }

    fn dynamic_fields(&self, kind: &NodeKind) -> DynamicFields<'_> {
        match *kind {
            NodeKind::Entity { entity } => DynamicFields {
                custom: self.entities.get(entity).map(|e| self.custom_fields(e)).unwrap_or(&[]),
                uv_names: &[],
            },
            NodeKind::Mesh { entity, variant, sub } => DynamicFields {
                custom: &[],
                uv_names: self.template(entity, variant, sub).map(|t| t.uv_names.as_slice()).unwrap_or(&[]),
            },
            _ => DynamicFields::default(),
        }
    }

    fn custom_fields(&self, entity: &Entity) -> &[CustomField] {
        self.engine
            .as_ref()
            .map(|engine| engine.custom().fields(entity.info.partition))
            .unwrap_or(&[])
    }

    fn template(&self, entity: usize, variant: usize, sub: usize) -> Option<&SubAssetTemplate> {
        let engine = self.engine.as_ref()?;
        let entity = self.entities.get(entity)?;
        engine.templates().get(entity.info.character, variant)?.sub_assets.get(sub)
    }

    fn character(&self, entity: &Entity) -> Option<&Character> {
        self.engine.as_ref()?.characters().get(entity.info.character)
    }
}

impl std::fmt::Debug for CrowdStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrowdStore")
            .field("root", &self.config.root_name)
            .field("frame_range", &self.frame_range)
            .field("entities", &self.entities.len())
            .field("paths", &self.registry.len())
            .finish()
    }
}

/// Uniform sub-asset fields served from the template.
fn template_value(template: &SubAssetTemplate, id: FieldId) -> Option<Value> {
    match id {
        FieldId::FaceVertexCounts | FieldId::CurveVertexCounts => Some(Value::IntArray(Arc::clone(&template.counts))),
        FieldId::FaceVertexIndices => Some(Value::IntArray(Arc::clone(&template.indices))),
        FieldId::Widths => Some(Value::FloatArray(Arc::clone(&template.widths))),
        FieldId::MaterialBinding if !template.material.is_empty() => Some(Value::Path(template.material.clone())),
        FieldId::Uv(i) => template.uv_sets.get(i).map(|uv| Value::Float2Array(Arc::clone(uv))),
        _ => None,
    }
}

/// Split `prim.field` at the first `.` of the last path segment.
fn split_property(path: &str) -> (&str, Option<&str>) {
    let segment_start = path.rfind('/').map_or(0, |i| i + 1);
    match path[segment_start..].find('.') {
        Some(dot) => {
            let at = segment_start + dot;
            let prim = if at == 0 { "/" } else { &path[..at] };
            (prim, Some(&path[at + 1..]))
        }
        None => (path, None),
    }
}

/// Entities surviving the id filter, with exclusion and default variant
/// resolved.
fn collect_entities(
    config: &StoreConfig,
    characters: &[Character],
    partitions: &[Arc<SimulationData>],
    frame_range: FrameRange,
) -> Vec<EntityInfo> {
    let mut infos = Vec::new();
    for (partition, sim) in partitions.iter().enumerate() {
        let candidates: Vec<_> = sim
            .entities
            .iter()
            .enumerate()
            .filter(|(_, r)| config.entity_ids.as_ref().map_or(true, |ids| ids.contains(&r.id)))
            .filter(|(_, r)| {
                let known = r.character < characters.len();
                if !known {
                    warn!(entity = r.id, character = r.character, "entity references unknown character, skipped");
                }
                known
            })
            .collect();

        let cutoff = (candidates.len() as f64 * f64::from(config.render_percent) / 100.0).round() as usize;
        for (rank, (sim_index, record)) in candidates.into_iter().enumerate() {
            let character = &characters[record.character];
            let default_variant = match config.lod_mode {
                LodMode::Static => config.static_lod.min(character.variants.len().saturating_sub(1)),
                LodMode::Dynamic => 0,
            };
            let killed_early = record.killed_at.map_or(false, |k| k <= frame_range.start);
            infos.push(EntityInfo {
                id: record.id,
                name: sanitize_identifier(&format!("{}{}", config.entity_name_prefix, record.id)),
                partition,
                sim_index,
                character: record.character,
                scale: record.scale,
                bone_offset: record.bone_offset,
                attribute_offset: record.attribute_offset,
                killed_at: record.killed_at,
                excluded: rank >= cutoff || killed_early,
                default_variant,
                extent: character.extent.scaled(record.scale),
            });
        }
    }
    infos
}

/// Prepare the templates needed by surviving entities, one representative
/// entity per character, at the reference frame.
fn prepare_templates(
    config: &StoreConfig,
    characters: &[Character],
    partitions: &[Arc<SimulationData>],
    infos: &[EntityInfo],
    simulation: &dyn SimulationCache,
    preparer: &dyn GeometryPreparer,
    reference_frame: Frame,
) -> TemplateCache {
    let mut handles: HashMap<usize, Option<FrameHandles>> = HashMap::new();
    let mut representatives: HashMap<usize, &EntityInfo> = HashMap::new();
    for info in infos.iter().filter(|i| !i.excluded) {
        if representatives.contains_key(&info.character) {
            continue;
        }
        let loaded = handles.entry(info.partition).or_insert_with(|| {
            simulation
                .load(info.partition, reference_frame)
                .map_err(|e| warn!(partition = info.partition, "reference frame unavailable: {e}"))
                .ok()
        });
        if loaded.is_some() {
            representatives.insert(info.character, info);
        }
    }

    let mut keys: Vec<TemplateKey> = representatives
        .keys()
        .flat_map(|&character| match config.lod_mode {
            LodMode::Dynamic => {
                let count = characters.get(character).map_or(0, |c| c.variants.len());
                (0..count).map(|v| TemplateKey::new(character, v)).collect::<Vec<_>>()
            }
            LodMode::Static => infos
                .iter()
                .filter(|i| !i.excluded && i.character == character)
                .map(|i| TemplateKey::new(character, i.default_variant))
                .collect(),
        })
        .collect();
    keys.sort();
    keys.dedup();

    let jobs: Vec<TemplateJob<'_>> = keys
        .into_iter()
        .filter_map(|key| {
            let info = representatives.get(&key.character)?;
            let handles = handles.get(&info.partition)?.as_ref()?;
            let entity = partitions.get(info.partition)?.entities.get(info.sim_index)?;
            Some(TemplateJob {
                key,
                entity,
                entity_index: info.sim_index,
                handles,
            })
        })
        .collect();

    TemplateCache::build(characters, &jobs, preparer)
}
