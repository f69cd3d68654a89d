use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core_modules::hsv_range::HsvRange;
use crate::core_modules::position_controller::{AxisSpeed, ControlMode, SearchPolicy};
use crate::core_modules::target_selector::DEFAULT_MIN_AREA;
use crate::error::ConfigError;

/// The persisted threshold record, as written by the calibrator
/// (`{"lower": [h, s, v], "upper": [h, s, v]}`).
///
/// Values are kept as plain integers so that out-of-range entries produce a
/// readable [`ConfigError`] when converted into an [`HsvRange`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    pub lower: [i32; 3],
    pub upper: [i32; 3],
}

impl ThresholdConfig {
    /// Reads and validates a threshold file.
    pub fn load(path: impl AsRef<Path>) -> Result<HsvRange, ConfigError> {
        let record: ThresholdConfig = read_json(path.as_ref())?;
        HsvRange::try_from(record)
    }

    pub fn save(range: HsvRange, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let json = serde_json::to_string(&ThresholdConfig::from(range))?;
        fs::write(path, json).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Everything the tracking loop needs, fixed for the lifetime of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Frames are resized to this width before detection.
    pub frame_width: u32,
    /// Frames are resized to this height before detection.
    pub frame_height: u32,
    pub thresholds: HsvRange,
    /// Noise floor in square pixels.
    pub min_area: f64,
    /// Dead-zone half-width in pixels, inclusive.
    pub tolerance: u32,
    /// Symmetric bound of every command axis.
    pub command_limit: AxisSpeed,
    pub mode: ControlMode,
    pub search: SearchPolicy,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            frame_width: 640,
            frame_height: 480,
            thresholds: HsvRange::default(),
            min_area: DEFAULT_MIN_AREA,
            tolerance: 40,
            command_limit: 100,
            mode: ControlMode::default(),
            search: SearchPolicy::default(),
        }
    }
}

impl TrackerConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config: TrackerConfig = read_json(path.as_ref())?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the fields the type system cannot. Thresholds are valid by
    /// construction.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frame_width == 0 || self.frame_height == 0 {
            return Err(ConfigError::EmptyFrameSize {
                width: self.frame_width,
                height: self.frame_height,
            });
        }
        if !(self.min_area.is_finite() && self.min_area > 0.0) {
            return Err(ConfigError::NonPositiveMinArea(self.min_area));
        }
        if self.command_limit <= 0 {
            return Err(ConfigError::NonPositiveLimit(self.command_limit));
        }
        match self.mode {
            ControlMode::FixedStep { step } if step <= 0 => Err(ConfigError::NonPositiveStep(step)),
            ControlMode::FixedStep { .. } => Ok(()),
            ControlMode::Feedback { x, y } => {
                x.validate()?;
                y.validate()
            }
        }
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_str(&text)?)
}
