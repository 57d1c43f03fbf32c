pub mod types;
mod trait_def;

pub use trait_def::{AppendOutcome, FinishOutcome, SelectionVariant};
pub use types::{FourCorner, PointToPoint, VariantKind};
