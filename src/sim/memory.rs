//! In-memory collaborators.
//!
//! [`MemorySimulation`] serves simulation data from memory and deforms
//! template geometry with a rigid transform plus an optional drift:
//! `point * scale + root_position + X * shutter_offset + drift * time`,
//! where `time` is the frame plus the shutter offset.
//! It counts every call, which makes cache and locking behavior observable.
//!
//! [`MemoryParameters`] is a map-backed [`ParameterSource`].

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};

use super::{
    Character, DeformRequest, DeformedGeometry, FrameData, FrameHandles, GeometryPreparer,
    ParameterSource, SimulationCache, SimulationData, TemplateGeometry, TemplateRequest,
};
use crate::core::Frame;
use crate::util::{Error, Result, Vec3};

struct MemoryPartition {
    simulation: Arc<SimulationData>,
    frames: BTreeMap<Frame, Arc<FrameData>>,
}

/// Call counters (relaxed; only meaningful once calls have returned).
#[derive(Default)]
struct Counters {
    loads: AtomicUsize,
    templates: AtomicUsize,
    deforms: AtomicUsize,
}

/// In-memory simulation cache and geometry preparer.
pub struct MemorySimulation {
    characters: Arc<Vec<Character>>,
    partitions: Vec<MemoryPartition>,
    templates: HashMap<(usize, usize), Vec<TemplateGeometry>>,
    failing_templates: HashSet<(usize, usize)>,
    unreadable: HashSet<usize>,
    failing_deforms: Mutex<HashSet<(i64, Frame)>>,
    deform_delay: Option<Duration>,
    point_drift: Vec3,
    counters: Counters,
    deforms_per_entity: Mutex<HashMap<i64, usize>>,
}

impl MemorySimulation {
    /// Create a simulation with the given character table and no partitions.
    pub fn new(characters: Vec<Character>) -> Self {
        Self {
            characters: Arc::new(characters),
            partitions: Vec::new(),
            templates: HashMap::new(),
            failing_templates: HashSet::new(),
            unreadable: HashSet::new(),
            failing_deforms: Mutex::new(HashSet::new()),
            deform_delay: None,
            point_drift: Vec3::ZERO,
            counters: Counters::default(),
            deforms_per_entity: Mutex::new(HashMap::new()),
        }
    }

    /// Add a partition with its frames. Returns the partition index.
    pub fn add_partition(&mut self, simulation: SimulationData, frames: Vec<FrameData>) -> usize {
        let frames = frames.into_iter().map(|f| (f.frame, Arc::new(f))).collect();
        self.partitions.push(MemoryPartition {
            simulation: Arc::new(simulation),
            frames,
        });
        self.partitions.len() - 1
    }

    /// Set the template geometry of a (character, variant).
    pub fn set_template(&mut self, character: usize, variant: usize, geometry: Vec<TemplateGeometry>) {
        self.templates.insert((character, variant), geometry);
    }

    /// Make template preparation fail for a (character, variant).
    pub fn fail_template(&mut self, character: usize, variant: usize) {
        self.failing_templates.insert((character, variant));
    }

    /// Make a partition fail to open.
    pub fn make_unreadable(&mut self, partition: usize) {
        self.unreadable.insert(partition);
    }

    /// Make deformation fail for one entity at one frame.
    pub fn fail_deform(&self, entity_id: i64, frame: Frame) {
        self.failing_deforms.lock().insert((entity_id, frame));
    }

    /// Sleep inside every deform call.
    pub fn set_deform_delay(&mut self, delay: Duration) {
        self.deform_delay = Some(delay);
    }

    /// Move deformed points by `drift` per frame, on top of the root.
    pub fn set_point_drift(&mut self, drift: Vec3) {
        self.point_drift = drift;
    }

    pub fn load_calls(&self) -> usize {
        self.counters.loads.load(Ordering::Relaxed)
    }

    pub fn template_calls(&self) -> usize {
        self.counters.templates.load(Ordering::Relaxed)
    }

    /// Deform calls, counting each shutter sample.
    pub fn deform_calls(&self) -> usize {
        self.counters.deforms.load(Ordering::Relaxed)
    }

    /// Deform calls for one entity.
    pub fn deform_calls_for(&self, entity_id: i64) -> usize {
        self.deforms_per_entity.lock().get(&entity_id).copied().unwrap_or(0)
    }

    fn partition(&self, partition: usize) -> Result<&MemoryPartition> {
        if self.unreadable.contains(&partition) {
            return Err(Error::PartitionUnavailable {
                partition,
                reason: "marked unreadable".into(),
            });
        }
        self.partitions.get(partition).ok_or_else(|| Error::PartitionUnavailable {
            partition,
            reason: "no such partition".into(),
        })
    }
}

impl SimulationCache for MemorySimulation {
    fn characters(&self) -> Result<Arc<Vec<Character>>> {
        Ok(Arc::clone(&self.characters))
    }

    fn partition_count(&self) -> usize {
        self.partitions.len()
    }

    fn simulation(&self, partition: usize) -> Result<Arc<SimulationData>> {
        Ok(Arc::clone(&self.partition(partition)?.simulation))
    }

    fn load(&self, partition: usize, frame: Frame) -> Result<FrameHandles> {
        self.counters.loads.fetch_add(1, Ordering::Relaxed);
        let p = self.partition(partition)?;
        let data = p
            .frames
            .get(&frame)
            .ok_or(Error::FrameUnavailable { partition, frame })?;
        Ok(FrameHandles {
            simulation: Arc::clone(&p.simulation),
            frame: Arc::clone(data),
        })
    }
}

impl GeometryPreparer for MemorySimulation {
    fn prepare_template(&self, request: &TemplateRequest<'_>) -> Result<Vec<TemplateGeometry>> {
        self.counters.templates.fetch_add(1, Ordering::Relaxed);
        let key = (request.character_index, request.variant);
        if self.failing_templates.contains(&key) {
            return Err(Error::preparation(format!(
                "template {}:{} failed",
                request.character.name, request.variant
            )));
        }
        self.templates.get(&key).cloned().ok_or_else(|| {
            Error::preparation(format!(
                "no template for {}:{}",
                request.character.name, request.variant
            ))
        })
    }

    fn deform(&self, request: &DeformRequest<'_>) -> Result<Vec<DeformedGeometry>> {
        self.counters.deforms.fetch_add(1, Ordering::Relaxed);
        *self.deforms_per_entity.lock().entry(request.entity.id).or_insert(0) += 1;

        if let Some(delay) = self.deform_delay {
            std::thread::sleep(delay);
        }
        if self.failing_deforms.lock().contains(&(request.entity.id, request.frame)) {
            return Err(Error::preparation(format!(
                "deform of entity {} failed at frame {}",
                request.entity.id, request.frame
            )));
        }

        let character_index = request.entity.character;
        let template = self
            .templates
            .get(&(character_index, request.variant))
            .ok_or_else(|| Error::preparation("no template to deform"))?;
        let root = request
            .handles
            .frame
            .positions
            .get(request.entity_index)
            .copied()
            .ok_or_else(|| Error::preparation("entity missing from frame data"))?;
        let time = request.frame as f32 + request.shutter_offset;
        let offset = root + Vec3::X * request.shutter_offset + self.point_drift * time;
        let scale = request.entity.scale;

        Ok(template
            .iter()
            .map(|t| DeformedGeometry {
                points: t.points.iter().map(|p| *p * scale + offset).collect(),
                normals: t.normals.clone(),
            })
            .collect())
    }
}

/// Map-backed connected-parameter source.
#[derive(Default)]
pub struct MemoryParameters {
    values: RwLock<HashMap<String, Vec3>>,
    resolves: AtomicUsize,
}

impl MemoryParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the value behind a source path (same for every frame).
    pub fn set(&self, source: impl Into<String>, value: Vec3) {
        self.values.write().insert(source.into(), value);
    }

    /// Number of resolve calls so far.
    pub fn resolve_calls(&self) -> usize {
        self.resolves.load(Ordering::Relaxed)
    }
}

impl ParameterSource for MemoryParameters {
    fn resolve_vec3(&self, source: &str, _frame: Frame) -> Option<Vec3> {
        self.resolves.fetch_add(1, Ordering::Relaxed);
        self.values.read().get(source).copied()
    }
}
