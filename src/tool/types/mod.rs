pub mod four_corner;
pub mod point_to_point;

pub use four_corner::FourCorner;
pub use point_to_point::PointToPoint;

use serde::{Deserialize, Serialize};

use super::trait_def::SelectionVariant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VariantKind {
    PointToPoint,
    #[default]
    FourCorner,
}

impl VariantKind {
    /// Create a fresh instance of the variant
    pub fn new_instance(self) -> Box<dyn SelectionVariant> {
        match self {
            VariantKind::PointToPoint => Box::new(PointToPoint),
            VariantKind::FourCorner => Box::new(FourCorner),
        }
    }
}
