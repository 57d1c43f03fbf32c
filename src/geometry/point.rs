use serde::{Deserialize, Serialize};
use std::fmt;

/// An integer pixel coordinate. Equality is exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance, widened so it cannot overflow
    pub fn distance_squared(self, other: Point) -> i64 {
        let dx = i64::from(self.x) - i64::from(other.x);
        let dy = i64::from(self.y) - i64::from(other.y);
        dx * dx + dy * dy
    }

    pub fn to_f64(self) -> (f64, f64) {
        (f64::from(self.x), f64::from(self.y))
    }

    /// True if the point lies on a `width`×`height` raster. Vertices sit on
    /// pixel corners, so the far edges `x == width` and `y == height` count.
    pub fn is_within(self, width: u32, height: u32) -> bool {
        self.x >= 0 && self.y >= 0 && self.x as u32 <= width && self.y as u32 <= height
    }
}

impl From<(i32, i32)> for Point {
    fn from((x, y): (i32, i32)) -> Self {
        Self::new(x, y)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// One straight edge of a selection boundary, in traversal order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    start: Point,
    end: Point,
}

impl Segment {
    pub const fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }

    pub fn start(&self) -> Point {
        self.start
    }

    pub fn end(&self) -> Point {
        self.end
    }

    pub fn with_start(self, start: Point) -> Self {
        Self { start, ..self }
    }

    pub fn with_end(self, end: Point) -> Self {
        Self { end, ..self }
    }
}
