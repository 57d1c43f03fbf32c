use std::fmt;

use crate::geometry::{Point, Segment};
use crate::path::SelectionPath;

use super::types::VariantKind;

/// What the model should do after a variant appended a point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// Keep collecting points
    Continue,
    /// Close the path immediately
    AutoFinish,
}

/// What the model should do when asked to finish the selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishOutcome {
    /// Append the closing segment and enter `Selected`
    Close,
    /// Too few points to form a region; discard the path
    Reset,
}

/// Per-variant geometry rules plugged into the shared selection state machine.
///
/// The model owns every state transition and undo checkpoint; a variant only
/// decides how points become segments and when a path is complete.
pub trait SelectionVariant: Send + fmt::Debug {
    /// Return the name of the variant
    fn name(&self) -> &'static str;

    fn kind(&self) -> VariantKind;

    /// Append `p` to an open path that already has a start point
    fn append_to_selection(&self, path: &mut SelectionPath, p: Point) -> AppendOutcome;

    /// The segment the view should draw from the last point to the pointer
    fn live_wire(&self, path: &SelectionPath, p: Point) -> Option<Segment> {
        path.live_wire(p)
    }

    /// Decide whether an open path may be closed
    fn finish_selection(&self, path: &SelectionPath) -> FinishOutcome {
        if path.point_count() < 2 {
            FinishOutcome::Reset
        } else {
            FinishOutcome::Close
        }
    }

    /// Number of corners a closed path must have for perspective pasting,
    /// or `None` if the variant does not support it
    fn corner_count(&self) -> Option<usize> {
        None
    }

    /// If true, undo directly after an automatic close reopens the path
    fn undo_reopens_auto_close(&self) -> bool {
        false
    }
}
