use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use thiserror::Error;

use crate::geometry::CONTROL_POINT_RADIUS;
use crate::tool::VariantKind;
use crate::warp::{ProcessingMode, Tolerance};

/// Errors that can occur while reading or writing a configuration file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to access config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config data: {0}")]
    Json(#[from] serde_json::Error),
}

/// Tunables for a [`crate::SelectionModel`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// Variant a new model starts with
    pub variant: VariantKind,
    /// Grab radius around control points, in pixels
    pub control_point_radius: u32,
    /// Zero threshold for pivots and determinants
    pub tolerance: Tolerance,
    pub processing: ProcessingMode,
    /// Re-run the last paste when a corner is moved or a move is undone
    pub rewarp_on_corner_move: bool,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            variant: VariantKind::default(),
            control_point_radius: CONTROL_POINT_RADIUS as u32,
            tolerance: Tolerance::default(),
            processing: ProcessingMode::default(),
            rewarp_on_corner_move: true,
        }
    }
}

impl SelectorConfig {
    /// Squared grab radius used by `closest_point`
    pub fn tolerance_squared(&self) -> i64 {
        let r = i64::from(self.control_point_radius);
        r * r
    }

    /// Load a config from JSON. A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(json) => Ok(serde_json::from_str(&json)?),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::info!("no config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}
