use thiserror::Error;

use crate::state::SelectionState;

/// Errors raised by the selection model and the perspective compositor.
///
/// Every variant is produced synchronously at the point of misuse, before any
/// model state is touched. The asynchronous pixel pass reports its failures
/// through [`crate::event::SelectionEvent::ProcessingFailed`] instead.
#[derive(Debug, Error)]
pub enum SelectionError {
    /// The operation is not valid in the model's current state
    #[error("cannot {operation} while in state {state}")]
    IllegalState {
        operation: &'static str,
        state: SelectionState,
    },

    /// An index, point or correspondence set was out of range or malformed
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A linear system or matrix inversion was singular or nearly so
    #[error("numerical failure: {0}")]
    NumericalFailure(String),

    /// A background pass ended without delivering a raster
    #[error("processing failed: {0}")]
    ProcessingFailed(String),

    #[error("failed to encode image: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SelectionError {
    pub(crate) fn illegal_state(operation: &'static str, state: SelectionState) -> Self {
        Self::IllegalState { operation, state }
    }

    /// Returns true for [`SelectionError::IllegalState`]
    pub fn is_illegal_state(&self) -> bool {
        matches!(self, Self::IllegalState { .. })
    }

    /// Returns true for [`SelectionError::InvalidArgument`]
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }

    /// Returns true for [`SelectionError::NumericalFailure`]
    pub fn is_numerical_failure(&self) -> bool {
        matches!(self, Self::NumericalFailure(_))
    }
}

/// Result type for selection and compositing operations
pub type SelectionResult<T> = Result<T, SelectionError>;
