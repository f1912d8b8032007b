//! Static schema of the virtual scene.
//!
//! Every prim has one [`SchemaKind`]. Each kind has a fixed, ordered table
//! of [`FieldSpec`]s. Two kinds grow per prim: entities append their
//! partition's [`CustomField`]s, and meshes append one `primvars:stN` field
//! per UV set of their template.
//!
//! Fields carry host-facing metadata (type, variability, interpolation).
//! Which metadata keys a spec exposes depends only on that metadata, see
//! [`FieldRef::metadata_fields`].

pub mod custom;
pub mod visibility;

pub use custom::{CustomAttributes, CustomField, CustomSource};
pub use visibility::{Visibility, VISIBILITY_FIELD_NAME};

use crate::core::ValueType;

/// Prim kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SchemaKind {
    /// Structural node: pseudo-root, root, partitions, `Geometry`, alias groups.
    Group,
    Entity,
    Lod,
    Mesh,
    Fur,
    Skel,
}

impl SchemaKind {
    /// Prim type name exposed to hosts.
    pub fn prim_type_name(&self) -> &'static str {
        match self {
            Self::Group | Self::Entity | Self::Lod => "Xform",
            Self::Mesh => "Mesh",
            Self::Fur => "BasisCurves",
            Self::Skel => "SkelAnimation",
        }
    }

    /// Static fields of this kind, in listing order.
    pub fn static_fields(&self) -> &'static [FieldSpec] {
        match self {
            Self::Group => &[],
            Self::Entity => ENTITY_FIELDS,
            Self::Lod => LOD_FIELDS,
            Self::Mesh => MESH_FIELDS,
            Self::Fur => FUR_FIELDS,
            Self::Skel => SKEL_FIELDS,
        }
    }
}

/// Whether a field changes over time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Variability {
    Varying,
    Uniform,
}

impl Variability {
    pub fn as_token(&self) -> &'static str {
        match self {
            Self::Varying => "varying",
            Self::Uniform => "uniform",
        }
    }
}

/// Interpolation hint between samples, for hosts that interpolate.
/// The store itself never does.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Interpolation {
    /// Not interpolable (uniform fields).
    None,
    Held,
    Linear,
}

impl Interpolation {
    pub fn as_token(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Held => "held",
            Self::Linear => "linear",
        }
    }
}

/// Field identity, independent of its name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FieldId {
    Visibility,
    Translate,
    Extent,
    EntityId,
    CharacterName,
    Points,
    Normals,
    Velocities,
    FaceVertexCounts,
    FaceVertexIndices,
    MaterialBinding,
    CurveVertexCounts,
    Widths,
    Joints,
    Translations,
    Rotations,
    Scales,
    /// UV set index of the mesh template.
    Uv(usize),
    /// Index into the entity's custom fields.
    Custom(usize),
}

/// Static field descriptor.
#[derive(Clone, Copy, Debug)]
pub struct FieldSpec {
    pub id: FieldId,
    pub name: &'static str,
    pub value_type: ValueType,
    pub variability: Variability,
    pub interpolation: Interpolation,
}

impl FieldSpec {
    const fn varying(id: FieldId, name: &'static str, value_type: ValueType, interpolation: Interpolation) -> Self {
        Self { id, name, value_type, variability: Variability::Varying, interpolation }
    }

    const fn uniform(id: FieldId, name: &'static str, value_type: ValueType) -> Self {
        Self { id, name, value_type, variability: Variability::Uniform, interpolation: Interpolation::None }
    }
}

const VISIBILITY: FieldSpec =
    FieldSpec::varying(FieldId::Visibility, VISIBILITY_FIELD_NAME, ValueType::Token, Interpolation::Held);

pub const ENTITY_FIELDS: &[FieldSpec] = &[
    VISIBILITY,
    FieldSpec::varying(FieldId::Translate, "xformOp:translate", ValueType::Float3, Interpolation::Linear),
    FieldSpec::uniform(FieldId::Extent, "extent", ValueType::Float3Array),
    FieldSpec::uniform(FieldId::EntityId, "entityId", ValueType::Int64),
    FieldSpec::uniform(FieldId::CharacterName, "characterName", ValueType::Token),
];

pub const LOD_FIELDS: &[FieldSpec] = &[VISIBILITY];

pub const MESH_FIELDS: &[FieldSpec] = &[
    VISIBILITY,
    FieldSpec::varying(FieldId::Points, "points", ValueType::Point3fArray, Interpolation::Linear),
    FieldSpec::varying(FieldId::Normals, "normals", ValueType::Normal3fArray, Interpolation::Linear),
    FieldSpec::varying(FieldId::Velocities, "velocities", ValueType::Vector3fArray, Interpolation::Linear),
    FieldSpec::uniform(FieldId::FaceVertexCounts, "faceVertexCounts", ValueType::IntArray),
    FieldSpec::uniform(FieldId::FaceVertexIndices, "faceVertexIndices", ValueType::IntArray),
    FieldSpec::uniform(FieldId::MaterialBinding, "material:binding", ValueType::Path),
];

pub const FUR_FIELDS: &[FieldSpec] = &[
    VISIBILITY,
    FieldSpec::varying(FieldId::Points, "points", ValueType::Point3fArray, Interpolation::Linear),
    FieldSpec::varying(FieldId::Velocities, "velocities", ValueType::Vector3fArray, Interpolation::Linear),
    FieldSpec::uniform(FieldId::CurveVertexCounts, "curveVertexCounts", ValueType::IntArray),
    FieldSpec::uniform(FieldId::Widths, "widths", ValueType::FloatArray),
    FieldSpec::uniform(FieldId::MaterialBinding, "material:binding", ValueType::Path),
];

pub const SKEL_FIELDS: &[FieldSpec] = &[
    FieldSpec::uniform(FieldId::Joints, "joints", ValueType::TokenArray),
    FieldSpec::varying(FieldId::Translations, "translations", ValueType::Float3Array, Interpolation::Linear),
    FieldSpec::varying(FieldId::Rotations, "rotations", ValueType::QuatfArray, Interpolation::Linear),
    FieldSpec::uniform(FieldId::Scales, "scales", ValueType::Float3Array),
];

/// Metadata keys of a prim spec.
pub const PRIM_METADATA: &[&str] = &["specifier", "typeName", "primChildren", "properties"];
/// Metadata keys of the pseudo-root.
pub const PSEUDO_ROOT_METADATA: &[&str] = &["primChildren"];
/// Metadata keys of a uniform attribute spec.
pub const UNIFORM_METADATA: &[&str] = &["typeName", "custom", "variability", "default"];
/// Metadata keys of a varying, held attribute spec.
pub const HELD_METADATA: &[&str] = &["typeName", "custom", "variability", "default", "timeSamples"];
/// Metadata keys of a varying, interpolated attribute spec.
pub const INTERPOLATED_METADATA: &[&str] =
    &["typeName", "custom", "variability", "default", "timeSamples", "interpolation"];

/// Resolved field of one prim, borrowing dynamic names from their owner.
#[derive(Clone, Copy, Debug)]
pub struct FieldRef<'a> {
    pub id: FieldId,
    pub name: &'a str,
    pub value_type: ValueType,
    pub variability: Variability,
    pub interpolation: Interpolation,
}

impl<'a> FieldRef<'a> {
    pub fn is_time_varying(&self) -> bool {
        self.variability == Variability::Varying
    }

    pub fn is_custom(&self) -> bool {
        matches!(self.id, FieldId::Custom(_))
    }

    /// Metadata keys this field exposes.
    pub fn metadata_fields(&self) -> &'static [&'static str] {
        match (self.variability, self.interpolation) {
            (Variability::Uniform, _) => UNIFORM_METADATA,
            (Variability::Varying, Interpolation::Linear) => INTERPOLATED_METADATA,
            (Variability::Varying, _) => HELD_METADATA,
        }
    }
}

impl<'a> From<&FieldSpec> for FieldRef<'a> {
    fn from(spec: &FieldSpec) -> Self {
        Self {
            id: spec.id,
            name: spec.name,
            value_type: spec.value_type,
            variability: spec.variability,
            interpolation: spec.interpolation,
        }
    }
}

/// Per-prim dynamic fields.
#[derive(Clone, Copy, Debug, Default)]
pub struct DynamicFields<'a> {
    /// Entity custom fields.
    pub custom: &'a [CustomField],
    /// Mesh UV field names.
    pub uv_names: &'a [String],
}

/// All fields of a prim, in listing order.
pub fn fields<'a>(kind: SchemaKind, dynamic: DynamicFields<'a>) -> Vec<FieldRef<'a>> {
    let mut out: Vec<FieldRef<'a>> = kind.static_fields().iter().map(FieldRef::from).collect();
    match kind {
        SchemaKind::Entity => {
            out.extend(dynamic.custom.iter().enumerate().map(|(i, c)| FieldRef {
                id: FieldId::Custom(i),
                name: c.name.as_str(),
                value_type: c.value_type,
                variability: c.variability(),
                interpolation: c.interpolation(),
            }));
        }
        SchemaKind::Mesh => {
            out.extend(dynamic.uv_names.iter().enumerate().map(|(i, name)| FieldRef {
                id: FieldId::Uv(i),
                name: name.as_str(),
                value_type: ValueType::TexCoord2fArray,
                variability: Variability::Uniform,
                interpolation: Interpolation::None,
            }));
        }
        _ => {}
    }
    out
}

/// Resolve one field of a prim by name.
pub fn resolve_field<'a>(kind: SchemaKind, name: &str, dynamic: DynamicFields<'a>) -> Option<FieldRef<'a>> {
    if let Some(spec) = kind.static_fields().iter().find(|s| s.name == name) {
        return Some(spec.into());
    }
    match kind {
        SchemaKind::Entity => dynamic.custom.iter().position(|c| c.name == name).map(|i| {
            let c = &dynamic.custom[i];
            FieldRef {
                id: FieldId::Custom(i),
                name: c.name.as_str(),
                value_type: c.value_type,
                variability: c.variability(),
                interpolation: c.interpolation(),
            }
        }),
        SchemaKind::Mesh => dynamic.uv_names.iter().position(|n| n == name).map(|i| FieldRef {
            id: FieldId::Uv(i),
            name: dynamic.uv_names[i].as_str(),
            value_type: ValueType::TexCoord2fArray,
            variability: Variability::Uniform,
            interpolation: Interpolation::None,
        }),
        _ => None,
    }
}

/// Field name of the `index`-th UV set.
pub fn uv_field_name(index: usize) -> String {
    if index == 0 {
        "primvars:st".to_string()
    } else {
        format!("primvars:st{index}")
    }
}
