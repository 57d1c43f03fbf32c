pub mod hit_testing;
mod point;
mod polygon;

pub use hit_testing::{closest_control_point, CONTROL_POINT_RADIUS};
pub use point::{Point, Segment};
pub use polygon::{PixelBounds, Polygon};
