//! Core layer - fundamental types shared by every component.
//!
//! This module provides:
//! - [`FrameRange`] - Integer frame sampling and time bracketing
//! - [`FrameCache`] - Bounded frame-keyed cache with smallest-key eviction
//! - [`Value`] / [`ValueType`] - Typed field values

mod time_sampling;
mod cache;
mod value;

pub use time_sampling::{Frame, FrameRange};
pub use cache::FrameCache;
pub use value::{Value, ValueType};
