//! Entities: one simulated actor each, with its own frame cache and
//! compute lock.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use super::FrameSnapshot;
use crate::core::{Frame, FrameCache};
use crate::util::BBox3f;

/// Immutable description of an entity, fixed at construction.
#[derive(Clone, Debug)]
pub struct EntityInfo {
    pub id: i64,
    /// Sanitized prim name.
    pub name: String,
    pub partition: usize,
    /// Index into the partition's entity records and frame buffers.
    pub sim_index: usize,
    pub character: usize,
    pub scale: f32,
    pub bone_offset: usize,
    pub attribute_offset: usize,
    pub killed_at: Option<Frame>,
    /// Beyond the render percentage, or removed before the first frame.
    pub excluded: bool,
    /// Variant used in static LOD mode and for disabled snapshots.
    pub default_variant: usize,
    /// Scaled character extent.
    pub extent: BBox3f,
}

/// An entity plus its mutable per-frame state.
///
/// Two locks with different scopes:
/// - the cache lock is held only for map operations;
/// - the compute lock serializes computation of this entity and is held for
///   the whole evaluation. It is always taken after the partition lock has
///   been released.
pub struct Entity {
    pub info: EntityInfo,
    cache: Mutex<FrameCache<Arc<FrameSnapshot>>>,
    compute_lock: Mutex<()>,
}

impl Entity {
    pub fn new(info: EntityInfo, retained_frames: usize) -> Self {
        Self {
            info,
            cache: Mutex::new(FrameCache::new(retained_frames)),
            compute_lock: Mutex::new(()),
        }
    }

    #[inline]
    pub fn id(&self) -> i64 {
        self.info.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.info.name
    }

    /// Cached snapshot of a frame, if resident.
    pub fn cached(&self, frame: Frame) -> Option<Arc<FrameSnapshot>> {
        self.cache.lock().get(frame)
    }

    /// Resident frames in ascending order.
    pub fn cached_frames(&self) -> Vec<Frame> {
        self.cache.lock().frames()
    }

    /// Drop all cached snapshots.
    pub fn clear_cache(&self) {
        self.cache.lock().clear();
    }

    /// Store a snapshot; returns the evicted frame, if any.
    pub(crate) fn insert(&self, frame: Frame, snapshot: Arc<FrameSnapshot>) -> Option<Frame> {
        self.cache.lock().insert(frame, snapshot)
    }

    pub(crate) fn lock_compute(&self) -> MutexGuard<'_, ()> {
        self.compute_lock.lock()
    }
}

impl std::fmt::Debug for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Entity")
            .field("info", &self.info)
            .field("cached_frames", &self.cached_frames())
            .finish()
    }
}
