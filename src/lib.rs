//! # Crowd Scene
//!
//! Lazily evaluated virtual scene hierarchy over crowd simulation caches.
//!
//! A simulated population of thousands of animated entities is exposed as a
//! hierarchical namespace of prims and attributes. Nothing per-frame is
//! materialized up front: attribute values are computed on demand from the
//! simulation, per entity and per frame, and a small window of recent frames
//! is cached per entity. Queries are safe from any number of threads.
//!
//! ## Modules
//!
//! - [`util`] - Errors, math types, identifier sanitizing, logging setup
//! - [`core`] - Frame range, bounded frame cache, typed values
//! - [`sim`] - Simulation, geometry and parameter collaborator interfaces
//! - [`schema`] - Prim kinds, field tables, custom attribute discovery
//! - [`registry`] - Path registry
//! - [`template`] - Per-character template geometry
//! - [`frame`] - Frame snapshots and the frame compute engine
//! - [`store`] - The [`CrowdStore`] query facade and its configuration
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use crowd_scene::prelude::*;
//!
//! let sim = Arc::new(MemorySimulation::new(characters));
//! let store = CrowdStore::new(StoreConfig::default(), sim.clone(), sim, None);
//!
//! for name in store.list_children("/crowd") {
//!     println!("{name}");
//! }
//! let points = store.query_time_sample("/crowd/cf/Entity_1/Geometry/Body.points", 12.0);
//! ```

pub mod util;
pub mod core;
pub mod sim;
pub mod schema;
pub mod registry;
pub mod template;
pub mod frame;
pub mod store;

// Re-export commonly used types
pub use util::{Error, Result};
pub use store::{CrowdStore, SpecType, StoreConfig, StoreStats};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::util::{init_logging, BBox3f, Error, Quat, Result, Vec2, Vec3};
    pub use crate::core::{Frame, FrameRange, Value, ValueType};
    pub use crate::sim::memory::{MemoryParameters, MemorySimulation};
    pub use crate::sim::{
        AttributeKind, AttributeValue, Character, DeformRequest, DeformedGeometry, EntityRecord, FrameData,
        GeometryPreparer, GeometryVariant, ParameterSource, PerPointAttribute, PerPointBuffer, ShaderAttribute,
        SimulationCache, SimulationData, SubAssetDesc, SubAssetKind, TemplateGeometry, TemplateRequest,
    };
    pub use crate::frame::{FrameSnapshot, LodMode};
    pub use crate::store::{CrowdStore, SpecType, StoreConfig, StoreStats};
}
