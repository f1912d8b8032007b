//! Frame snapshots: everything an entity exposes at one frame.

use std::sync::Arc;

use smallvec::SmallVec;

use crate::core::{Frame, Value};
use crate::util::{Quat, Vec3};

/// Per-frame buffers of one sub-asset, in the entity's local frame
/// (world position minus the snapshot's reference position).
#[derive(Clone, Debug, Default)]
pub struct SubAssetFrame {
    pub points: Arc<Vec<Vec3>>,
    pub normals: Arc<Vec<Vec3>>,
    pub velocities: Arc<Vec<Vec3>>,
    /// Points at each configured shutter offset, in offset order.
    pub shutter_points: SmallVec<[Arc<Vec<Vec3>>; 2]>,
}

/// Materialized state of one entity at one frame.
///
/// Snapshots are shared through `Arc`: a caller holding one is unaffected
/// when the entity's frame cache later evicts it.
#[derive(Clone, Debug)]
pub struct FrameSnapshot {
    pub frame: Frame,
    pub enabled: bool,
    /// World-space reference (root) position.
    pub position: Vec3,
    /// Active geometry variant.
    pub variant: usize,
    /// Camera generation the variant was chosen with.
    pub camera_generation: u64,
    /// Custom attribute values, parallel to the entity's custom fields.
    /// Empty when disabled.
    pub custom: Vec<Value>,
    /// One entry per sub-asset of the active variant. Empty when disabled or
    /// when the variant's template is unavailable.
    pub sub_assets: Vec<SubAssetFrame>,
    /// Bone translations relative to `position`.
    pub bone_translations: Arc<Vec<Vec3>>,
    pub bone_rotations: Arc<Vec<Quat>>,
}

impl FrameSnapshot {
    /// Snapshot of an entity that is not rendered at this frame.
    pub fn disabled(frame: Frame, position: Vec3, variant: usize, camera_generation: u64) -> Self {
        Self {
            frame,
            enabled: false,
            position,
            variant,
            camera_generation,
            custom: Vec::new(),
            sub_assets: Vec::new(),
            bone_translations: Arc::default(),
            bone_rotations: Arc::default(),
        }
    }

    /// Sub-asset buffers, if the entity is enabled and `variant` is active.
    pub fn sub_asset(&self, variant: usize, index: usize) -> Option<&SubAssetFrame> {
        if !self.enabled || self.variant != variant {
            return None;
        }
        self.sub_assets.get(index)
    }

    /// World-space points of a sub-asset.
    pub fn world_points(&self, index: usize) -> Option<Vec<Vec3>> {
        let sub = self.sub_assets.get(index)?;
        Some(sub.points.iter().map(|p| *p + self.position).collect())
    }
}
