//! Connected parameters.
//!
//! The camera reference position may be a constant or connected to a
//! source path in the host document. Connected values are resolved once per
//! frame through the [`ParameterSource`] and cached. Resolution of a frame
//! not seen yet is serialized by a refresh lock; frames already resolved
//! are answered from the cache without taking it.
//!
//! Reassigning the input bumps a generation counter. Snapshots remember the
//! generation their LOD was chosen with, so stale ones get recomputed.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::debug;

use crate::core::{Frame, FrameCache};
use crate::frame::CameraSample;
use crate::sim::ParameterSource;
use crate::util::Vec3;

/// Resolved frames kept per input.
const RESOLVED_FRAMES: usize = 64;

#[derive(Clone, Debug)]
enum CameraInput {
    Constant(Vec3),
    Connected(String),
}

/// Camera input with its per-frame resolution cache.
pub struct ConnectedParams {
    parameters: Option<Arc<dyn ParameterSource>>,
    input: RwLock<CameraInput>,
    /// Value used when a connected source cannot be resolved.
    fallback: RwLock<Vec3>,
    generation: AtomicU64,
    resolved: RwLock<FrameCache<Vec3>>,
    refresh: Mutex<()>,
}

impl ConnectedParams {
    pub fn new(position: Vec3, source: Option<String>, parameters: Option<Arc<dyn ParameterSource>>) -> Self {
        let input = match source {
            Some(path) => CameraInput::Connected(path),
            None => CameraInput::Constant(position),
        };
        Self {
            parameters,
            input: RwLock::new(input),
            fallback: RwLock::new(position),
            generation: AtomicU64::new(0),
            resolved: RwLock::new(FrameCache::new(RESOLVED_FRAMES)),
            refresh: Mutex::new(()),
        }
    }

    /// Current generation of the camera input.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Connected source path, if any.
    pub fn source(&self) -> Option<String> {
        match &*self.input.read() {
            CameraInput::Connected(path) => Some(path.clone()),
            CameraInput::Constant(_) => None,
        }
    }

    /// Camera sample for a frame.
    pub fn camera(&self, frame: Frame) -> CameraSample {
        let generation = self.generation();
        if let Some(position) = self.resolved.read().get(frame) {
            return CameraSample { position, generation };
        }

        let _refresh = self.refresh.lock();
        let generation = self.generation();
        if let Some(position) = self.resolved.read().get(frame) {
            return CameraSample { position, generation };
        }

        let position = match &*self.input.read() {
            CameraInput::Constant(p) => *p,
            CameraInput::Connected(path) => self
                .parameters
                .as_ref()
                .and_then(|params| params.resolve_vec3(path, frame))
                .unwrap_or_else(|| *self.fallback.read()),
        };
        self.resolved.write().insert(frame, position);
        CameraSample { position, generation }
    }

    /// Reassign the camera to a source path (host change notification).
    pub fn connect(&self, source: impl Into<String>) {
        let source = source.into();
        debug!(%source, "camera connected");
        self.reassign(CameraInput::Connected(source));
    }

    /// Reassign the camera to a constant position.
    pub fn set_position(&self, position: Vec3) {
        *self.fallback.write() = position;
        self.reassign(CameraInput::Constant(position));
    }

    fn reassign(&self, input: CameraInput) {
        let _refresh = self.refresh.lock();
        *self.input.write() = input;
        self.resolved.write().clear();
        self.generation.fetch_add(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::memory::MemoryParameters;

    #[test]
    fn test_constant() {
        let params = ConnectedParams::new(Vec3::new(1.0, 2.0, 3.0), None, None);
        let sample = params.camera(5);
        assert_eq!(sample.position, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(sample.generation, 0);
        assert!(params.source().is_none());

        params.set_position(Vec3::X);
        let sample = params.camera(5);
        assert_eq!(sample.position, Vec3::X);
        assert_eq!(sample.generation, 1);
    }

    #[test]
    fn test_connected_resolves_once_per_frame() {
        let source = Arc::new(MemoryParameters::new());
        source.set("/cam.translate", Vec3::new(0.0, 0.0, 9.0));
        let params = ConnectedParams::new(Vec3::ZERO, Some("/cam.translate".into()), Some(source.clone()));

        for _ in 0..5 {
            assert_eq!(params.camera(1).position, Vec3::new(0.0, 0.0, 9.0));
        }
        assert_eq!(source.resolve_calls(), 1);
        params.camera(2);
        assert_eq!(source.resolve_calls(), 2);
    }

    #[test]
    fn test_reconnect_re_resolves() {
        let source = Arc::new(MemoryParameters::new());
        source.set("/a", Vec3::X);
        source.set("/b", Vec3::Y);
        let params = ConnectedParams::new(Vec3::ZERO, Some("/a".into()), Some(source.clone()));
        assert_eq!(params.camera(1).position, Vec3::X);

        params.connect("/b");
        let sample = params.camera(1);
        assert_eq!(sample.position, Vec3::Y);
        assert_eq!(sample.generation, 1);
        assert_eq!(params.source().as_deref(), Some("/b"));
    }

    #[test]
    fn test_unresolvable_source_falls_back() {
        let params = ConnectedParams::new(Vec3::Z, Some("/missing".into()), Some(Arc::new(MemoryParameters::new())));
        assert_eq!(params.camera(3).position, Vec3::Z);

        let unconnected = ConnectedParams::new(Vec3::Y, Some("/cam".into()), None);
        assert_eq!(unconnected.camera(3).position, Vec3::Y);
    }

    #[test]
    fn test_concurrent_refresh() {
        let source = Arc::new(MemoryParameters::new());
        source.set("/cam", Vec3::ONE);
        let params = ConnectedParams::new(Vec3::ZERO, Some("/cam".into()), Some(source.clone()));

        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| assert_eq!(params.camera(7).position, Vec3::ONE));
            }
        });
        assert_eq!(source.resolve_calls(), 1);
    }
}
