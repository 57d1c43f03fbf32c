use image::RgbaImage;

use crate::error::{SelectionError, SelectionResult};
use crate::shapes::ShapeKind;

/// Where pasted content came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasteKind {
    /// A decoded external image
    Image,
    /// Text rendered to a raster by the caller
    Text,
    Shape(ShapeKind),
}

/// An externally supplied raster attached to a closed four-corner selection
#[derive(Debug, Clone)]
pub struct PastedContent {
    pub raster: RgbaImage,
    pub kind: PasteKind,
}

impl PastedContent {
    /// Rejects rasters with no pixels, which have no bounding quad to map
    pub fn new(raster: RgbaImage, kind: PasteKind) -> SelectionResult<Self> {
        if raster.width() == 0 || raster.height() == 0 {
            return Err(SelectionError::InvalidArgument(format!(
                "pasted content must not be empty (got {}x{})",
                raster.width(),
                raster.height()
            )));
        }
        Ok(Self { raster, kind })
    }
}
