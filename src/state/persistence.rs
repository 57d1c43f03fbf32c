use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::error::SelectionError;
use crate::geometry::Point;
use crate::model::SelectionModel;
use crate::tool::VariantKind;
use crate::util::time;

/// Errors that can occur while saving or restoring a selection
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Failed to serialize selection: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Failed to access selection file: {0}")]
    Io(#[from] std::io::Error),

    /// Replaying the stored points was rejected by the model
    #[error("Invalid selection data: {0}")]
    InvalidSelection(#[from] SelectionError),
}

/// Result type for persistence operations
pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// A serializable copy of a selection's geometry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionSnapshot {
    pub variant: VariantKind,
    /// Control points in placement order
    pub points: Vec<Point>,
    pub closed: bool,
    /// Timestamp of when the snapshot was taken
    pub timestamp: u64,
    /// Version of the crate that wrote the snapshot
    pub version: String,
}

impl SelectionSnapshot {
    pub fn capture(model: &SelectionModel) -> Self {
        let path = model.selection_path();
        Self {
            variant: model.variant_kind(),
            points: path.control_points(),
            closed: path.is_closed(),
            timestamp: time::timestamp_secs(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Rebuild the selection on `model` by replaying every point, so each
    /// state-machine rule is checked again. The model must already hold an
    /// image the points fit on.
    pub fn restore_into(&self, model: &mut SelectionModel) -> PersistenceResult<()> {
        if self.version != env!("CARGO_PKG_VERSION") {
            log::warn!(
                "selection snapshot version {} differs from current version {}",
                self.version,
                env!("CARGO_PKG_VERSION")
            );
        }

        self.validate_against(model)?;

        model.switch_variant(self.variant)?;
        if let Err(e) = self.replay(model) {
            model.reset();
            return Err(e.into());
        }
        log::info!("restored selection with {} point(s)", self.points.len());
        Ok(())
    }

    /// Reject the snapshot before the model's current selection is discarded
    fn validate_against(&self, model: &SelectionModel) -> Result<(), SelectionError> {
        let state = model.state();
        if state.is_processing() {
            return Err(SelectionError::illegal_state("restore a selection", state));
        }
        if self.points.is_empty() {
            return Ok(());
        }

        let Some((width, height)) = model.image().map(|image| image.dimensions()) else {
            return Err(SelectionError::illegal_state("restore a selection without an image", state));
        };
        if let Some(p) = self.points.iter().find(|p| !p.is_within(width, height)) {
            return Err(SelectionError::InvalidArgument(format!(
                "snapshot point {p} lies outside the {width}x{height} image"
            )));
        }
        if let Some(limit) = self.variant.new_instance().corner_count() {
            if self.points.len() > limit {
                return Err(SelectionError::InvalidArgument(format!(
                    "{} points exceed the {limit} corners of the {:?} variant",
                    self.points.len(),
                    self.variant
                )));
            }
        }
        Ok(())
    }

    fn replay(&self, model: &mut SelectionModel) -> Result<(), SelectionError> {
        for &p in &self.points {
            model.add_point(p)?;
        }
        if self.closed && model.state().is_selecting() {
            model.finish_selection()?;
        }
        Ok(())
    }

    pub fn save(&self, path: impl AsRef<Path>) -> PersistenceResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> PersistenceResult<Self> {
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}
