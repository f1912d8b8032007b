//! Error types for the crowd scene store.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for store construction and collaborator calls.
///
/// Query paths never surface these: lookups degrade to "not found" and
/// per-frame failures degrade to a disabled snapshot.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file does not exist or cannot be accessed
    #[error("Config file not found: {0}")]
    ConfigNotFound(PathBuf),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Simulation partition (crowd field) could not be opened
    #[error("Simulation partition {partition} unavailable: {reason}")]
    PartitionUnavailable { partition: usize, reason: String },

    /// Frame data missing from the simulation cache
    #[error("Frame {frame} unavailable in partition {partition}")]
    FrameUnavailable { partition: usize, frame: i64 },

    /// Character index not present in the character table
    #[error("Unknown character index {0}")]
    UnknownCharacter(usize),

    /// Geometry variant index out of bounds for a character
    #[error("Geometry variant {variant} out of bounds (count: {count})")]
    VariantOutOfBounds { variant: usize, count: usize },

    /// Geometry preparation collaborator reported a failure
    #[error("Geometry preparation failed: {0}")]
    Preparation(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an "other" error from a string.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a geometry preparation error.
    pub fn preparation(msg: impl Into<String>) -> Self {
        Self::Preparation(msg.into())
    }
}

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, Error>;
