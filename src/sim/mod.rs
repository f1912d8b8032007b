//! External collaborators: the simulation cache, the geometry preparation
//! engine and the host's connected-parameter source.
//!
//! The store never reads simulation files or deforms meshes itself. It
//! talks to these traits, which return plain immutable records. Handles
//! returned by a collaborator are shared (`Arc`) and safe for concurrent
//! reads.
//!
//! [`memory`] holds in-memory implementations for embedding and tests.

pub mod memory;

use std::sync::Arc;

use crate::core::{Frame, FrameRange, Value};
use crate::util::{BBox3f, Quat, Result, Vec2, Vec3};

// ============================================================================
// Characters
// ============================================================================

/// Type of a custom attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AttributeKind {
    Int,
    Float,
    Vector,
    String,
}

/// A custom attribute value as stored by the simulation.
#[derive(Clone, Debug, PartialEq)]
pub enum AttributeValue {
    Int(i64),
    Float(f32),
    Vector(Vec3),
    String(String),
}

impl AttributeValue {
    pub fn kind(&self) -> AttributeKind {
        match self {
            Self::Int(_) => AttributeKind::Int,
            Self::Float(_) => AttributeKind::Float,
            Self::Vector(_) => AttributeKind::Vector,
            Self::String(_) => AttributeKind::String,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Self::Int(v) => Value::Int64(*v),
            Self::Float(v) => Value::Float(*v),
            Self::Vector(v) => Value::Float3(*v),
            Self::String(v) => Value::String(v.clone()),
        }
    }
}

/// Character-level ("shader") attribute with its default value.
#[derive(Clone, Debug)]
pub struct ShaderAttribute {
    pub name: String,
    pub default: AttributeValue,
}

/// Simulation-wide per-entity attribute.
#[derive(Clone, Debug)]
pub struct PerPointAttribute {
    pub name: String,
    pub kind: AttributeKind,
}

/// Kind of a renderable sub-asset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SubAssetKind {
    Mesh,
    Fur,
}

/// One sub-asset of a geometry variant.
#[derive(Clone, Debug)]
pub struct SubAssetDesc {
    pub name: String,
    /// Hierarchical alias authored in the simulation (`/` or `|` separated).
    /// Empty means "use the name".
    pub alias: String,
    pub kind: SubAssetKind,
}

impl SubAssetDesc {
    pub fn mesh(name: impl Into<String>, alias: impl Into<String>) -> Self {
        Self { name: name.into(), alias: alias.into(), kind: SubAssetKind::Mesh }
    }

    pub fn fur(name: impl Into<String>) -> Self {
        Self { name: name.into(), alias: String::new(), kind: SubAssetKind::Fur }
    }
}

/// Geometry variant (level of detail) of a character.
#[derive(Clone, Debug)]
pub struct GeometryVariant {
    pub name: String,
    /// Camera distance from which this variant applies.
    pub lod_threshold: f32,
    pub sub_assets: Vec<SubAssetDesc>,
}

/// Character description shared by all entities using it.
#[derive(Clone, Debug)]
pub struct Character {
    pub name: String,
    /// Variants ordered from highest to lowest detail.
    pub variants: Vec<GeometryVariant>,
    pub bones: Vec<String>,
    pub shader_attributes: Vec<ShaderAttribute>,
    /// Unscaled bounding box.
    pub extent: BBox3f,
}

impl Character {
    /// LOD thresholds in variant order.
    pub fn lod_thresholds(&self) -> Vec<f32> {
        self.variants.iter().map(|v| v.lod_threshold).collect()
    }
}

// ============================================================================
// Simulation data
// ============================================================================

/// Per-entity record of a simulation partition.
#[derive(Clone, Debug)]
pub struct EntityRecord {
    pub id: i64,
    pub character: usize,
    pub scale: f32,
    /// First bone of this entity in [`FrameData::bone_positions`].
    pub bone_offset: usize,
    /// First shader attribute of this entity in [`FrameData::shader_values`].
    pub attribute_offset: usize,
    /// Frame at which the entity is permanently removed, if any.
    pub killed_at: Option<Frame>,
}

/// Static data of one simulation partition (crowd field).
#[derive(Clone, Debug, Default)]
pub struct SimulationData {
    pub name: String,
    pub frame_range: FrameRange,
    pub entities: Vec<EntityRecord>,
    pub per_point_attributes: Vec<PerPointAttribute>,
    /// Per-character LOD threshold overrides for this run.
    pub lod_thresholds: Option<Vec<Vec<f32>>>,
}

/// Per-entity buffer of one per-point attribute.
#[derive(Clone, Debug)]
pub enum PerPointBuffer {
    Float(Vec<f32>),
    Vector(Vec<Vec3>),
}

impl PerPointBuffer {
    /// Value for the entity at `index`.
    pub fn value(&self, index: usize) -> Option<Value> {
        match self {
            Self::Float(v) => v.get(index).map(|x| Value::Float(*x)),
            Self::Vector(v) => v.get(index).map(|x| Value::Float3(*x)),
        }
    }
}

/// Simulation state of one partition at one frame.
#[derive(Clone, Debug, Default)]
pub struct FrameData {
    pub frame: Frame,
    /// Indexed by entity simulation index.
    pub enabled: Vec<bool>,
    /// Root position per entity.
    pub positions: Vec<Vec3>,
    pub bone_positions: Vec<Vec3>,
    pub bone_orientations: Vec<Quat>,
    /// One buffer per [`SimulationData::per_point_attributes`] entry.
    pub per_point: Vec<PerPointBuffer>,
    /// Flattened per-entity shader attribute values.
    pub shader_values: Vec<AttributeValue>,
}

/// Read handles for one partition at one frame.
#[derive(Clone, Debug)]
pub struct FrameHandles {
    pub simulation: Arc<SimulationData>,
    pub frame: Arc<FrameData>,
}

/// Simulation cache collaborator.
///
/// Implementations need not tolerate concurrent loads on one partition;
/// the store serializes them per partition. Returned handles are immutable.
pub trait SimulationCache: Send + Sync {
    /// Character table.
    fn characters(&self) -> Result<Arc<Vec<Character>>>;

    /// Number of partitions (crowd fields).
    fn partition_count(&self) -> usize;

    /// Static data of a partition.
    fn simulation(&self, partition: usize) -> Result<Arc<SimulationData>>;

    /// Read handles for a partition at a frame.
    fn load(&self, partition: usize, frame: Frame) -> Result<FrameHandles>;
}

// ============================================================================
// Geometry preparation
// ============================================================================

/// Time-invariant geometry of one sub-asset.
#[derive(Clone, Debug, Default)]
pub struct TemplateGeometry {
    /// Face vertex counts for meshes, curve vertex counts for fur.
    pub counts: Vec<i32>,
    pub indices: Vec<i32>,
    pub points: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub widths: Vec<f32>,
    pub material: String,
    pub uv_sets: Vec<(String, Vec<Vec2>)>,
}

/// Template request: one representative entity at the reference frame.
pub struct TemplateRequest<'a> {
    pub character: &'a Character,
    pub character_index: usize,
    pub variant: usize,
    pub entity: &'a EntityRecord,
    pub entity_index: usize,
    pub handles: &'a FrameHandles,
}

/// Deformed buffers of one sub-asset, in world space.
#[derive(Clone, Debug, Default)]
pub struct DeformedGeometry {
    pub points: Vec<Vec3>,
    /// May be empty; template normals are used then.
    pub normals: Vec<Vec3>,
}

/// Deformation request for one entity at one (sub-)frame.
pub struct DeformRequest<'a> {
    pub character: &'a Character,
    pub variant: usize,
    pub entity: &'a EntityRecord,
    pub entity_index: usize,
    pub frame: Frame,
    /// Sub-frame offset for motion blur, 0 for the frame itself.
    pub shutter_offset: f32,
    pub handles: &'a FrameHandles,
}

/// Geometry preparation collaborator.
///
/// Both calls return one entry per sub-asset of the requested variant, in
/// variant order. Calls have no observable side effects on shared state.
pub trait GeometryPreparer: Send + Sync {
    fn prepare_template(&self, request: &TemplateRequest<'_>) -> Result<Vec<TemplateGeometry>>;

    fn deform(&self, request: &DeformRequest<'_>) -> Result<Vec<DeformedGeometry>>;
}

// ============================================================================
// Connected parameters
// ============================================================================

/// Host-side source of connected scalar inputs (e.g. a camera position
/// authored elsewhere in the host document).
pub trait ParameterSource: Send + Sync {
    /// Resolve a vector-valued source path at a frame.
    fn resolve_vec3(&self, source: &str, frame: Frame) -> Option<Vec3>;
}
