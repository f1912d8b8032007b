//! Per-frame evaluation.
//!
//! - [`FrameSnapshot`] - materialized state of one entity at one frame
//! - [`Entity`] - an entity with its bounded frame cache and compute lock
//! - [`FrameEngine`] - computes snapshots on demand
//! - [`select_lod`] - camera-distance variant selection

mod snapshot;
mod entity;
mod lod;
mod engine;

pub use snapshot::{FrameSnapshot, SubAssetFrame};
pub use entity::{Entity, EntityInfo};
pub use lod::{select_lod, thresholds_for, LodMode};
pub use engine::{CameraSample, EngineSettings, EngineStats, FrameEngine};
