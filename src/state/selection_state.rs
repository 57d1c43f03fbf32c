/// The lifecycle of a selection.
///
/// The valid state transitions are:
/// ```text
///                 add first point           add point
///  ┌─────────────┐ ───────────────► ┌─────────────┐ ◄──┐
///  │             │                  │             │ ───┘
///  │ NoSelection │ ◄─────────────── │  Selecting  │
///  │             │ undo / too-short │             │
///  └─────────────┘      finish      └──────┬──────┘
///         ▲                                │ finish / 4th corner
///         │ reset (any state)              ▼
///         │                         ┌─────────────┐ ◄──┐
///         └──────────────────────── │  Selected   │ ───┘ move point / undo move
///                                   └──────┬──────┘
///                        paste launched    │  ▲ completed / cancelled
///                                          ▼  │
///                                   ┌─────────────┐
///                                   │ Processing  │
///                                   └─────────────┘
/// ```
///
/// `Selected → Selecting` appears in the table only so the four-corner variant
/// can reopen a path it closed automatically; the model never takes that edge
/// for any other reason.
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SelectionState {
    /// No path exists
    #[default]
    NoSelection,
    /// Points are being added to an open path
    Selecting,
    /// The path is closed and may be edited, filled, saved or pasted into
    Selected,
    /// A long-running pass is in flight; only cancellation is accepted
    Processing,
}

impl SelectionState {
    /// Validates whether a transition to the new state is allowed
    pub fn can_transition_to(&self, new_state: SelectionState) -> bool {
        use SelectionState::*;
        match (self, new_state) {
            // Reset is always available
            (_, NoSelection) => true,

            (NoSelection, Selecting) => true,

            (Selecting, Selecting) => true,
            (Selecting, Selected) => true,
            (Selecting, Processing) => true,

            (Selected, Selected) => true,
            (Selected, Processing) => true,
            (Selected, Selecting) => true,

            // Completion or cancellation returns to the state the pass started from
            (Processing, Selected) => true,
            (Processing, Selecting) => true,

            // All other transitions are invalid
            _ => false,
        }
    }

    pub fn is_selecting(&self) -> bool {
        matches!(self, SelectionState::Selecting)
    }

    pub fn is_selected(&self) -> bool {
        matches!(self, SelectionState::Selected)
    }

    pub fn is_processing(&self) -> bool {
        matches!(self, SelectionState::Processing)
    }
}

impl fmt::Display for SelectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SelectionState::NoSelection => "NoSelection",
            SelectionState::Selecting => "Selecting",
            SelectionState::Selected => "Selected",
            SelectionState::Processing => "Processing",
        };
        f.write_str(name)
    }
}
