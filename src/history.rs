use crate::path::SelectionPath;
use crate::state::SelectionState;

/// What kind of edit a checkpoint precedes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointKind {
    /// A point was appended to an open path
    AppendPoint,
    /// The path was closed by an explicit finish
    Finish,
    /// A point was appended and the variant closed the path automatically
    AutoFinish,
    /// A control point of a closed path was moved
    MovePoint,
}

/// A deep copy of the path as it was before an edit
#[derive(Debug, Clone, PartialEq)]
pub struct Checkpoint {
    pub kind: CheckpointKind,
    pub path: SelectionPath,
    pub state: SelectionState,
}

impl Checkpoint {
    pub fn new(kind: CheckpointKind, path: SelectionPath, state: SelectionState) -> Self {
        Self { kind, path, state }
    }
}

/// Linear history of path snapshots for single-step undo.
///
/// Snapshots live in an arena indexed by `top`; everything at or above `top`
/// has been undone and is overwritten by the next push. Redo is not offered.
#[derive(Debug, Default)]
pub struct UndoHistory {
    arena: Vec<Checkpoint>,
    top: usize,
}

impl UndoHistory {
    /// Creates a new empty history
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a snapshot taken before a mutating edit
    pub fn push(&mut self, checkpoint: Checkpoint) {
        self.arena.truncate(self.top);
        self.arena.push(checkpoint);
        self.top = self.arena.len();
    }

    /// The most recent snapshot, if any
    pub fn peek(&self) -> Option<&Checkpoint> {
        self.top.checked_sub(1).and_then(|i| self.arena.get(i))
    }

    /// Remove and return the most recent snapshot
    pub fn pop(&mut self) -> Option<Checkpoint> {
        if self.top == 0 {
            return None;
        }
        self.top -= 1;
        self.arena.get(self.top).cloned()
    }

    /// Returns true if there are snapshots that can be restored
    pub fn can_undo(&self) -> bool {
        self.top > 0
    }

    pub fn len(&self) -> usize {
        self.top
    }

    pub fn is_empty(&self) -> bool {
        self.top == 0
    }

    /// Clear the history
    pub fn clear(&mut self) {
        self.arena.clear();
        self.top = 0;
    }
}
