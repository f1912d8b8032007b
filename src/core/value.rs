//! Typed values returned by field queries.
//!
//! Array values share their buffers with snapshots and templates through
//! `Arc`, so answering a query never copies geometry.

use std::fmt;
use std::sync::Arc;

use crate::util::{Quat, Vec2, Vec3};

/// Declared type of a field.
///
/// Several types share a storage layout and differ only in role
/// (points, normals, vectors), which hosts care about for `typeName`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueType {
    Bool,
    Int,
    Int64,
    Float,
    Double,
    Token,
    String,
    Path,
    Float3,
    Vector3f,
    IntArray,
    FloatArray,
    DoubleArray,
    Float3Array,
    Point3fArray,
    Normal3fArray,
    Vector3fArray,
    TexCoord2fArray,
    QuatfArray,
    TokenArray,
}

impl ValueType {
    /// Host-facing type name.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Int64 => "int64",
            Self::Float => "float",
            Self::Double => "double",
            Self::Token => "token",
            Self::String => "string",
            Self::Path => "rel",
            Self::Float3 => "float3",
            Self::Vector3f => "vector3f",
            Self::IntArray => "int[]",
            Self::FloatArray => "float[]",
            Self::DoubleArray => "double[]",
            Self::Float3Array => "float3[]",
            Self::Point3fArray => "point3f[]",
            Self::Normal3fArray => "normal3f[]",
            Self::Vector3fArray => "vector3f[]",
            Self::TexCoord2fArray => "texCoord2f[]",
            Self::QuatfArray => "quatf[]",
            Self::TokenArray => "token[]",
        }
    }

    /// Check if values of this type are arrays.
    pub fn is_array(&self) -> bool {
        self.type_name().ends_with("[]")
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// A field value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i32),
    Int64(i64),
    Float(f32),
    Double(f64),
    Token(String),
    String(String),
    Path(String),
    Float3(Vec3),
    IntArray(Arc<Vec<i32>>),
    FloatArray(Arc<Vec<f32>>),
    DoubleArray(Arc<Vec<f64>>),
    Float3Array(Arc<Vec<Vec3>>),
    Float2Array(Arc<Vec<Vec2>>),
    QuatArray(Arc<Vec<Quat>>),
    TokenArray(Arc<Vec<String>>),
}

impl Value {
    /// Token value.
    pub fn token(s: impl Into<String>) -> Self {
        Self::Token(s.into())
    }

    /// Check if this is an array value.
    pub fn is_array(&self) -> bool {
        matches!(
            self,
            Self::IntArray(_)
                | Self::FloatArray(_)
                | Self::DoubleArray(_)
                | Self::Float3Array(_)
                | Self::Float2Array(_)
                | Self::QuatArray(_)
                | Self::TokenArray(_)
        )
    }

    /// Number of elements (1 for scalars).
    pub fn len(&self) -> usize {
        match self {
            Self::IntArray(v) => v.len(),
            Self::FloatArray(v) => v.len(),
            Self::DoubleArray(v) => v.len(),
            Self::Float3Array(v) => v.len(),
            Self::Float2Array(v) => v.len(),
            Self::QuatArray(v) => v.len(),
            Self::TokenArray(v) => v.len(),
            _ => 1,
        }
    }

    /// Check if this is an empty array.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_token(&self) -> Option<&str> {
        match self {
            Self::Token(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_float3(&self) -> Option<Vec3> {
        match self {
            Self::Float3(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float3_array(&self) -> Option<&[Vec3]> {
        match self {
            Self::Float3Array(v) => Some(v.as_slice()),
            _ => None,
        }
    }

    pub fn as_int_array(&self) -> Option<&[i32]> {
        match self {
            Self::IntArray(v) => Some(v.as_slice()),
            _ => None,
        }
    }

    pub fn as_token_array(&self) -> Option<&[String]> {
        match self {
            Self::TokenArray(v) => Some(v.as_slice()),
            _ => None,
        }
    }

    pub fn as_double_array(&self) -> Option<&[f64]> {
        match self {
            Self::DoubleArray(v) => Some(v.as_slice()),
            _ => None,
        }
    }

    /// Flat `f32` view of float vector arrays, for hosts that upload raw
    /// buffers.
    pub fn as_f32_slice(&self) -> Option<&[f32]> {
        match self {
            Self::FloatArray(v) => Some(v.as_slice()),
            Self::Float3Array(v) => Some(bytemuck::cast_slice(v.as_slice())),
            Self::Float2Array(v) => Some(bytemuck::cast_slice(v.as_slice())),
            Self::QuatArray(v) => Some(bytemuck::cast_slice(v.as_slice())),
            _ => None,
        }
    }

    /// Check whether two array values share the same buffer.
    pub fn shares_buffer(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Float3Array(a), Self::Float3Array(b)) => Arc::ptr_eq(a, b),
            (Self::IntArray(a), Self::IntArray(b)) => Arc::ptr_eq(a, b),
            (Self::FloatArray(a), Self::FloatArray(b)) => Arc::ptr_eq(a, b),
            (Self::Float2Array(a), Self::Float2Array(b)) => Arc::ptr_eq(a, b),
            (Self::QuatArray(a), Self::QuatArray(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}
