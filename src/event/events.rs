use std::sync::Arc;

use crate::error::SelectionError;
use crate::state::SelectionState;
use crate::warp::JobId;

/// Progress of a long-running pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// Completed share of the work, 0–100
    Percent(u8),
    Indeterminate,
}

/// Change notifications emitted by the selection model on the interaction thread
#[derive(Debug, Clone)]
pub enum SelectionEvent {
    /// Segments were added, removed or moved
    PathChanged,
    StateChanged {
        old: SelectionState,
        new: SelectionState,
    },
    /// The working raster was replaced or edited
    RasterChanged,
    ProgressChanged(Progress),
    /// A background pass ended with an error instead of a raster
    ProcessingFailed {
        job: JobId,
        error: Arc<SelectionError>,
    },
}
