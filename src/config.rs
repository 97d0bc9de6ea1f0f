//! Tunable parameters for the reader pipeline.
//!
//! Every field has a default, so a JSON file only needs to name what it
//! overrides:
//!
//! ```no_run
//! use ball_sort_reader::config::ReaderConfig;
//! use std::path::Path;
//!
//! let config = ReaderConfig::from_json_file(Path::new("reader.json"))?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

pub const INNER_RADIUS_FRACTION: f32 = 0.7;
pub const RING_STEP: usize = 2;
pub const MIN_BRIGHTNESS: f32 = 30.0;
pub const MAX_BRIGHTNESS: f32 = 220.0;
pub const MIN_CHANNEL_SPREAD: u8 = 15;

pub const MIN_BALL_RADIUS: i32 = 5;
pub const DEFAULT_BALL_RADIUS: i32 = 15;
pub const DEFAULT_TUBE_COUNT: usize = 5;
pub const DEFAULT_BALLS_PER_TUBE: usize = 4;
pub const MIN_GRID_SPACING: u32 = 10;
pub const DEFAULT_GRID_SPACING: u32 = 30;

pub const DEFAULT_COLOR_TOLERANCE: u32 = 40;
pub const DEFAULT_MERGE_TOLERANCE: f64 = 60.0;
pub const DEFAULT_EMPTY_TUBES: usize = 2;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Thresholds for the radial dominant-color scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    /// Fraction of the ball radius that is actually scanned.
    pub inner_radius_fraction: f32,
    /// Pixel distance between scanned rings.
    pub ring_step: usize,
    pub min_brightness: f32,
    pub max_brightness: f32,
    pub min_channel_spread: u8,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            inner_radius_fraction: INNER_RADIUS_FRACTION,
            ring_step: RING_STEP,
            min_brightness: MIN_BRIGHTNESS,
            max_brightness: MAX_BRIGHTNESS,
            min_channel_spread: MIN_CHANNEL_SPREAD,
        }
    }
}

/// Initial grid parameters for a fresh acquisition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridDefaults {
    pub ball_radius: i32,
    pub tube_count: usize,
    pub balls_per_tube: usize,
    pub grid_spacing: u32,
}

impl Default for GridDefaults {
    fn default() -> Self {
        Self {
            ball_radius: DEFAULT_BALL_RADIUS,
            tube_count: DEFAULT_TUBE_COUNT,
            balls_per_tube: DEFAULT_BALLS_PER_TUBE,
            grid_spacing: DEFAULT_GRID_SPACING,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    pub sampler: SamplerConfig,
    pub grid: GridDefaults,
    /// Manhattan threshold for per-row grouping, clamped to 10..=100 when applied.
    pub color_tolerance: u32,
    /// Euclidean threshold for merging groups across rows.
    pub merge_tolerance: f64,
    pub empty_tubes: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            sampler: SamplerConfig::default(),
            grid: GridDefaults::default(),
            color_tolerance: DEFAULT_COLOR_TOLERANCE,
            merge_tolerance: DEFAULT_MERGE_TOLERANCE,
            empty_tubes: DEFAULT_EMPTY_TUBES,
        }
    }
}

impl ReaderConfig {
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }
}
