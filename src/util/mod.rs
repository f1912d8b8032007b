//! Utility types and functions.
//!
//! This module contains fundamental types used throughout the crate:
//! - [`Error`] / [`Result`] - Error handling
//! - Math type re-exports from glam and [`BBox3f`]
//! - Identifier sanitizing for simulation-authored names
//! - [`init_logging`] - tracing subscriber setup

mod error;
mod math;
mod names;
mod logging;

pub use error::*;
pub use math::*;
pub use names::*;
pub use logging::init_logging;
