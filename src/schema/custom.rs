//! Custom attribute discovery.
//!
//! Two groups of fields are discovered at construction and appended to the
//! entity schema:
//! - shader attributes, declared per character. Every entity exposes the
//!   ordered union over all characters; a per-character remap table turns a
//!   global index into the character's own index (or none, in which case
//!   the declaring character's default applies).
//! - per-point attributes, declared per simulation partition.
//!
//! Field names are `primvars:[ns:]name` for shader attributes and
//! `primvars:[ns:]pp_name` for per-point attributes, sanitized and made
//! unique within a partition.

use std::collections::{HashMap, HashSet};

use super::{Interpolation, Variability};
use crate::core::{Value, ValueType};
use crate::sim::{AttributeKind, Character, SimulationData};
use crate::util::{sanitize_identifier, unique_name, Vec3};

/// Where a custom field's per-frame value comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CustomSource {
    /// Index into the global shader attribute list.
    Shader { global: usize },
    /// Index into the partition's per-point attribute list.
    PerPoint { attribute: usize },
}

/// A discovered custom field.
#[derive(Clone, Debug)]
pub struct CustomField {
    pub name: String,
    pub value_type: ValueType,
    pub kind: AttributeKind,
    pub source: CustomSource,
    pub default: Value,
}

impl CustomField {
    pub fn interpolation(&self) -> Interpolation {
        match self.kind {
            AttributeKind::Float | AttributeKind::Vector => Interpolation::Linear,
            AttributeKind::Int | AttributeKind::String => Interpolation::Held,
        }
    }

    pub fn variability(&self) -> Variability {
        Variability::Varying
    }
}

fn value_type(kind: AttributeKind) -> ValueType {
    match kind {
        AttributeKind::Int => ValueType::Int64,
        AttributeKind::Float => ValueType::Float,
        AttributeKind::Vector => ValueType::Float3,
        AttributeKind::String => ValueType::String,
    }
}

fn zero_value(kind: AttributeKind) -> Value {
    match kind {
        AttributeKind::Int => Value::Int64(0),
        AttributeKind::Float => Value::Float(0.0),
        AttributeKind::Vector => Value::Float3(Vec3::ZERO),
        AttributeKind::String => Value::String(String::new()),
    }
}

/// Custom fields of every partition plus the shader remap tables.
#[derive(Clone, Debug, Default)]
pub struct CustomAttributes {
    shader_count: usize,
    /// `[character][global] -> character-specific index`
    remap: Vec<Vec<Option<usize>>>,
    /// `[partition]`: shader fields followed by per-point fields.
    fields: Vec<Vec<CustomField>>,
}

impl CustomAttributes {
    /// Discover custom fields.
    pub fn build(characters: &[Character], partitions: &[&SimulationData], namespace: &str) -> Self {
        let prefix = if namespace.is_empty() {
            "primvars:".to_string()
        } else {
            format!("primvars:{}:", sanitize_identifier(namespace))
        };

        // Global union keyed by (raw name, kind), in first-seen order.
        let mut global: Vec<CustomField> = Vec::new();
        let mut global_index: HashMap<(String, AttributeKind), usize> = HashMap::new();
        let mut taken = HashSet::new();
        let mut remap = Vec::with_capacity(characters.len());

        for character in characters {
            for attr in &character.shader_attributes {
                let kind = attr.default.kind();
                let key = (attr.name.clone(), kind);
                if global_index.contains_key(&key) {
                    continue;
                }
                let name = unique_name(&format!("{prefix}{}", sanitize_identifier(&attr.name)), &mut taken);
                global_index.insert(key, global.len());
                global.push(CustomField {
                    name,
                    value_type: value_type(kind),
                    kind,
                    source: CustomSource::Shader { global: global.len() },
                    default: attr.default.to_value(),
                });
            }
        }

        for character in characters {
            let mut table = vec![None; global.len()];
            for (specific, attr) in character.shader_attributes.iter().enumerate() {
                if let Some(&g) = global_index.get(&(attr.name.clone(), attr.default.kind())) {
                    // first declaration wins on duplicates within a character
                    table[g].get_or_insert(specific);
                }
            }
            remap.push(table);
        }

        let fields = partitions
            .iter()
            .map(|sim| {
                let mut taken = taken.clone();
                let mut fields = global.clone();
                for (attribute, pp) in sim.per_point_attributes.iter().enumerate() {
                    let name = unique_name(&format!("{prefix}pp_{}", sanitize_identifier(&pp.name)), &mut taken);
                    fields.push(CustomField {
                        name,
                        value_type: value_type(pp.kind),
                        kind: pp.kind,
                        source: CustomSource::PerPoint { attribute },
                        default: zero_value(pp.kind),
                    });
                }
                fields
            })
            .collect();

        Self {
            shader_count: global.len(),
            remap,
            fields,
        }
    }

    /// Number of global shader attributes.
    pub fn shader_count(&self) -> usize {
        self.shader_count
    }

    /// Custom fields of entities in a partition.
    pub fn fields(&self, partition: usize) -> &[CustomField] {
        self.fields.get(partition).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Character-specific index of a global shader attribute.
    pub fn specific_index(&self, character: usize, global: usize) -> Option<usize> {
        self.remap.get(character)?.get(global).copied().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{AttributeValue, PerPointAttribute, ShaderAttribute};
    use crate::util::BBox3f;

    fn character(name: &str, attrs: &[(&str, AttributeValue)]) -> Character {
        Character {
            name: name.into(),
            variants: vec![],
            bones: vec![],
            shader_attributes: attrs
                .iter()
                .map(|(n, v)| ShaderAttribute { name: n.to_string(), default: v.clone() })
                .collect(),
            extent: BBox3f::EMPTY,
        }
    }

    #[test]
    fn test_union_and_remap() {
        let characters = vec![
            character("A", &[("hue", AttributeValue::Float(0.5)), ("tint color", AttributeValue::Vector(Vec3::ONE))]),
            character("B", &[("tint color", AttributeValue::Vector(Vec3::ZERO)), ("id", AttributeValue::Int(4))]),
        ];
        let sim = SimulationData::default();
        let custom = CustomAttributes::build(&characters, &[&sim], "");

        let names: Vec<_> = custom.fields(0).iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["primvars:hue", "primvars:tint_color", "primvars:id"]);
        assert_eq!(custom.shader_count(), 3);

        assert_eq!(custom.specific_index(0, 0), Some(0));
        assert_eq!(custom.specific_index(0, 2), None);
        assert_eq!(custom.specific_index(1, 1), Some(0));
        assert_eq!(custom.specific_index(1, 2), Some(1));
        assert_eq!(custom.specific_index(5, 0), None);

        // declaring character's default
        assert_eq!(custom.fields(0)[1].default, Value::Float3(Vec3::ONE));
    }

    #[test]
    fn test_per_point_namespaced_and_unique() {
        let characters = vec![character("A", &[("pp_speed", AttributeValue::Float(0.0))])];
        let sim = SimulationData {
            per_point_attributes: vec![
                PerPointAttribute { name: "speed".into(), kind: AttributeKind::Float },
                PerPointAttribute { name: "dir".into(), kind: AttributeKind::Vector },
            ],
            ..Default::default()
        };
        let custom = CustomAttributes::build(&characters, &[&sim], "glm");

        let fields = custom.fields(0);
        assert_eq!(fields[0].name, "primvars:glm:pp_speed");
        assert_eq!(fields[1].name, "primvars:glm:pp_speed_1");
        assert_eq!(fields[1].source, CustomSource::PerPoint { attribute: 0 });
        assert_eq!(fields[2].value_type, ValueType::Float3);
        assert!(custom.fields(9).is_empty());
    }

    #[test]
    fn test_same_name_different_kind() {
        let characters = vec![
            character("A", &[("mask", AttributeValue::Int(1))]),
            character("B", &[("mask", AttributeValue::String("x".into()))]),
        ];
        let custom = CustomAttributes::build(&characters, &[&SimulationData::default()], "");
        let names: Vec<_> = custom.fields(0).iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["primvars:mask", "primvars:mask_1"]);
        assert_eq!(custom.specific_index(1, 1), Some(0));
        assert_eq!(custom.fields(0)[0].interpolation(), Interpolation::Held);
    }
}
