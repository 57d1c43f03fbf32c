mod selection_state;
pub mod persistence;

pub use selection_state::SelectionState;
pub use persistence::{PersistenceError, PersistenceResult, SelectionSnapshot};
