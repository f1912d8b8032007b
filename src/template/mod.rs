//! Template data cache.
//!
//! Time-invariant geometry per (character, geometry variant): topology,
//! default points/normals, zero velocities, widths, material bindings and
//! UV sets. Templates are prepared once at construction, in parallel, by
//! the geometry preparation collaborator at a reference frame. They are
//! never mutated afterwards and are shared read-only by every entity of
//! that character.
//!
//! A failed preparation marks the key unavailable. The registry leaves the
//! variant's sub-assets out instead of failing the store.

use std::collections::HashMap;
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::schema::uv_field_name;
use crate::sim::{
    Character, EntityRecord, FrameHandles, GeometryPreparer, SubAssetKind, TemplateGeometry,
    TemplateRequest,
};
use crate::util::{sanitize_identifier, Error, Result, Vec2, Vec3};

/// Template cache key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TemplateKey {
    pub character: usize,
    pub variant: usize,
}

impl TemplateKey {
    pub fn new(character: usize, variant: usize) -> Self {
        Self { character, variant }
    }
}

/// Template of one sub-asset.
#[derive(Clone, Debug)]
pub struct SubAssetTemplate {
    pub kind: SubAssetKind,
    /// Sanitized sub-asset name.
    pub name: String,
    /// Alias as authored; hierarchy segments are sanitized by the registry.
    pub alias: String,
    /// Face vertex counts (meshes) or curve vertex counts (fur).
    pub counts: Arc<Vec<i32>>,
    pub indices: Arc<Vec<i32>>,
    pub points: Arc<Vec<Vec3>>,
    pub normals: Arc<Vec<Vec3>>,
    /// Zero-filled, one per point.
    pub velocities: Arc<Vec<Vec3>>,
    pub widths: Arc<Vec<f32>>,
    pub material: String,
    /// UV field names, parallel to `uv_sets`.
    pub uv_names: Vec<String>,
    pub uv_sets: Vec<Arc<Vec<Vec2>>>,
}

impl SubAssetTemplate {
    pub fn num_points(&self) -> usize {
        self.points.len()
    }

    pub fn has_uvs(&self) -> bool {
        !self.uv_sets.is_empty()
    }

    fn from_geometry(desc_kind: SubAssetKind, name: &str, alias: &str, geometry: TemplateGeometry) -> Result<Self> {
        let num_points = geometry.points.len();
        let total: i64 = geometry.counts.iter().map(|&c| c as i64).sum();

        match desc_kind {
            SubAssetKind::Mesh => {
                if total != geometry.indices.len() as i64 {
                    return Err(Error::preparation(format!(
                        "{name}: face counts sum to {total} but {} indices given",
                        geometry.indices.len()
                    )));
                }
                if let Some(bad) = geometry.indices.iter().find(|&&i| i < 0 || i as usize >= num_points) {
                    return Err(Error::preparation(format!(
                        "{name}: face index {bad} out of bounds (points: {num_points})"
                    )));
                }
            }
            SubAssetKind::Fur => {
                if total != num_points as i64 {
                    return Err(Error::preparation(format!(
                        "{name}: curve counts sum to {total} but {num_points} points given"
                    )));
                }
            }
        }

        let normals = if geometry.normals.len() == num_points {
            geometry.normals
        } else {
            vec![Vec3::ZERO; num_points]
        };

        let (uv_names, uv_sets) = geometry
            .uv_sets
            .into_iter()
            .enumerate()
            .map(|(i, (_, values))| (uv_field_name(i), Arc::new(values)))
            .unzip();

        Ok(Self {
            kind: desc_kind,
            name: sanitize_identifier(name),
            alias: alias.to_string(),
            counts: Arc::new(geometry.counts),
            indices: Arc::new(geometry.indices),
            points: Arc::new(geometry.points),
            normals: Arc::new(normals),
            velocities: Arc::new(vec![Vec3::ZERO; num_points]),
            widths: Arc::new(geometry.widths),
            material: geometry.material,
            uv_names,
            uv_sets,
        })
    }
}

/// Template of one (character, variant).
#[derive(Clone, Debug)]
pub struct VariantTemplate {
    pub key: TemplateKey,
    pub sub_assets: Vec<SubAssetTemplate>,
}

/// One template to prepare: the key plus a representative entity loaded at
/// the reference frame.
pub struct TemplateJob<'a> {
    pub key: TemplateKey,
    pub entity: &'a EntityRecord,
    pub entity_index: usize,
    pub handles: &'a FrameHandles,
}

/// Prepared templates, keyed by (character, variant).
#[derive(Default)]
pub struct TemplateCache {
    entries: HashMap<TemplateKey, Option<Arc<VariantTemplate>>>,
}

impl TemplateCache {
    /// Prepare all jobs in parallel. Failures are logged once and recorded
    /// as unavailable.
    pub fn build(characters: &[Character], jobs: &[TemplateJob<'_>], preparer: &dyn GeometryPreparer) -> Self {
        let _span = tracing::info_span!("prepare_templates", count = jobs.len()).entered();

        let results: Vec<(TemplateKey, Result<VariantTemplate>)> = jobs
            .par_iter()
            .map(|job| (job.key, Self::compute(characters, job, preparer)))
            .collect();

        let mut entries = HashMap::with_capacity(results.len());
        for (key, result) in results {
            match result {
                Ok(template) => {
                    debug!(character = key.character, variant = key.variant, "template ready");
                    entries.insert(key, Some(Arc::new(template)));
                }
                Err(e) => {
                    warn!(character = key.character, variant = key.variant, "template unavailable: {e}");
                    entries.insert(key, None);
                }
            }
        }
        Self { entries }
    }

    /// Prepare a single template.
    pub fn compute(
        characters: &[Character],
        job: &TemplateJob<'_>,
        preparer: &dyn GeometryPreparer,
    ) -> Result<VariantTemplate> {
        let key = job.key;
        let character = characters
            .get(key.character)
            .ok_or(Error::UnknownCharacter(key.character))?;
        let variant = character.variants.get(key.variant).ok_or(Error::VariantOutOfBounds {
            variant: key.variant,
            count: character.variants.len(),
        })?;

        let geometry = preparer.prepare_template(&TemplateRequest {
            character,
            character_index: key.character,
            variant: key.variant,
            entity: job.entity,
            entity_index: job.entity_index,
            handles: job.handles,
        })?;
        if geometry.len() != variant.sub_assets.len() {
            return Err(Error::preparation(format!(
                "{}: expected {} sub-assets, got {}",
                variant.name,
                variant.sub_assets.len(),
                geometry.len()
            )));
        }

        let sub_assets = variant
            .sub_assets
            .iter()
            .zip(geometry)
            .map(|(desc, geo)| SubAssetTemplate::from_geometry(desc.kind, &desc.name, &desc.alias, geo))
            .collect::<Result<Vec<_>>>()?;

        Ok(VariantTemplate { key, sub_assets })
    }

    /// Template of a (character, variant), if prepared successfully.
    #[inline]
    pub fn get(&self, character: usize, variant: usize) -> Option<&Arc<VariantTemplate>> {
        self.entries.get(&TemplateKey::new(character, variant))?.as_ref()
    }

    #[inline]
    pub fn is_available(&self, character: usize, variant: usize) -> bool {
        self.get(character, variant).is_some()
    }

    /// Number of keys attempted.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of keys whose preparation failed.
    pub fn failed_count(&self) -> usize {
        self.entries.values().filter(|t| t.is_none()).count()
    }
}
