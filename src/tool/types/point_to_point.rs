use serde::{Deserialize, Serialize};

use crate::geometry::Point;
use crate::path::SelectionPath;
use crate::tool::trait_def::{AppendOutcome, SelectionVariant};

use super::VariantKind;

/// Straight segments between successive clicks; the user decides when the
/// polygon is complete.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PointToPoint;

impl SelectionVariant for PointToPoint {
    fn name(&self) -> &'static str {
        "Point-to-point"
    }

    fn kind(&self) -> VariantKind {
        VariantKind::PointToPoint
    }

    fn append_to_selection(&self, path: &mut SelectionPath, p: Point) -> AppendOutcome {
        path.append_point(p);
        AppendOutcome::Continue
    }
}
