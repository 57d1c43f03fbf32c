use serde::{Deserialize, Serialize};

use crate::geometry::Point;
use crate::path::SelectionPath;
use crate::tool::trait_def::{AppendOutcome, SelectionVariant};

use super::VariantKind;

pub const CORNER_COUNT: usize = 4;

/// Exactly four user-placed corners spanning a plane for perspective pasting.
/// The path closes itself the instant the fourth corner is placed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FourCorner;

impl SelectionVariant for FourCorner {
    fn name(&self) -> &'static str {
        "Four-corner"
    }

    fn kind(&self) -> VariantKind {
        VariantKind::FourCorner
    }

    fn append_to_selection(&self, path: &mut SelectionPath, p: Point) -> AppendOutcome {
        path.append_point(p);
        if path.point_count() == CORNER_COUNT {
            AppendOutcome::AutoFinish
        } else {
            AppendOutcome::Continue
        }
    }

    fn corner_count(&self) -> Option<usize> {
        Some(CORNER_COUNT)
    }

    fn undo_reopens_auto_close(&self) -> bool {
        true
    }
}
