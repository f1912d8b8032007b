//! Store configuration

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::path::Path;

use crate::core::FrameRange;
use crate::frame::{EngineSettings, LodMode};
use crate::util::{Error, Result, Vec3};

/// Longest accepted frame range, in frames.
pub const MAX_FRAME_SPAN: i64 = 1_000_000;

/// Store configuration, loadable from JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    // Namespace
    pub root_name: String,
    pub entity_name_prefix: String,
    pub attribute_namespace: String,

    // Time
    /// Inclusive frame range; the simulation's own range when unset.
    pub frame_range: Option<(i64, i64)>,
    pub frames_per_second: f32,
    /// Frames kept per entity (minimum 1)
    pub retained_frames: usize,

    // Population
    pub render_percent: f32,
    /// Only these entity ids are created, when set.
    pub entity_ids: Option<Vec<i64>>,

    // Level of detail
    pub lod_mode: LodMode,
    pub static_lod: usize,
    pub camera_position: [f32; 3],
    /// Connected camera source, resolved per frame by the host.
    pub camera_source: Option<String>,

    // Outputs
    pub enable_velocity: bool,
    /// Motion blur sub-frame offsets
    pub shutter_offsets: Vec<f32>,
    pub enable_skeleton: bool,
    pub enable_fur: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root_name: "crowd".to_string(),
            entity_name_prefix: "Entity_".to_string(),
            attribute_namespace: String::new(),
            frame_range: None,
            frames_per_second: 24.0,
            retained_frames: 3,
            render_percent: 100.0,
            entity_ids: None,
            lod_mode: LodMode::Static,
            static_lod: 0,
            camera_position: [0.0; 3],
            camera_source: None,
            enable_velocity: true,
            shutter_offsets: Vec::new(),
            enable_skeleton: false,
            enable_fur: true,
        }
    }
}

impl StoreConfig {
    /// Parse from a JSON string. Missing keys take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::ConfigNotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Save to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        if let Some((start, end)) = self.frame_range {
            if end < start {
                return Err(Error::config(format!("frame range {start}..{end} is inverted")));
            }
            if end.checked_sub(start).map_or(true, |span| span >= MAX_FRAME_SPAN) {
                return Err(Error::config(format!(
                    "frame range {start}..{end} spans more than {MAX_FRAME_SPAN} frames"
                )));
            }
        }
        if !(self.frames_per_second > 0.0) {
            return Err(Error::config(format!(
                "frames per second must be positive, got {}",
                self.frames_per_second
            )));
        }
        if !(0.0..=100.0).contains(&self.render_percent) {
            return Err(Error::config(format!(
                "render percent must be within [0, 100], got {}",
                self.render_percent
            )));
        }
        if self.root_name.is_empty() {
            return Err(Error::config("root name is empty"));
        }
        Ok(())
    }

    pub fn frame_range(&self) -> Option<FrameRange> {
        self.frame_range.map(|(start, end)| FrameRange::new(start, end))
    }

    pub fn camera_position(&self) -> Vec3 {
        Vec3::from_array(self.camera_position)
    }

    pub fn retained_frames(&self) -> usize {
        self.retained_frames.max(1)
    }

    /// Engine switches.
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            lod_mode: self.lod_mode,
            frame_rate: self.frames_per_second,
            velocity: self.enable_velocity,
            shutter_offsets: SmallVec::from_slice(&self.shutter_offsets),
            skeleton: self.enable_skeleton,
        }
    }
}
