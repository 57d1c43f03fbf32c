//! The selection boundary: an ordered, insertion-order-significant sequence of
//! straight segments.
//!
//! While a selection is being built the path is *open*: it has a start point
//! and `n - 1` segments for `n` points. Closing it appends the segment from
//! the last point back to the start, after which the path has exactly as many
//! segments as control points and corner `i` is segment `i`'s start.

use serde::{Deserialize, Serialize};

use crate::error::{SelectionError, SelectionResult};
use crate::geometry::{closest_control_point, Point, Polygon, Segment};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SelectionPath {
    start: Option<Point>,
    segments: Vec<Segment>,
    closed: bool,
}

impl SelectionPath {
    pub fn new() -> Self {
        Self::default()
    }

    /// True until the first point is placed
    pub fn is_empty(&self) -> bool {
        self.start.is_none()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn start(&self) -> Option<Point> {
        self.start
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Number of user-placed control points
    pub fn point_count(&self) -> usize {
        match (self.start, self.closed) {
            (None, _) => 0,
            (Some(_), true) => self.segments.len(),
            (Some(_), false) => self.segments.len() + 1,
        }
    }

    /// The most recently placed point: the last segment's end, or the start
    /// point if no segment exists yet.
    pub fn last_point(&self) -> Option<Point> {
        if self.closed {
            return self.start;
        }
        self.segments.last().map(Segment::end).or(self.start)
    }

    /// Control points in placement order
    pub fn control_points(&self) -> Vec<Point> {
        let Some(start) = self.start else {
            return Vec::new();
        };
        if self.closed {
            return self.segments.iter().map(Segment::start).collect();
        }
        std::iter::once(start)
            .chain(self.segments.iter().map(Segment::end))
            .collect()
    }

    /// Places the first point of a new path
    pub(crate) fn begin(&mut self, start: Point) {
        debug_assert!(self.is_empty(), "path already started");
        self.start = Some(start);
        self.segments.clear();
        self.closed = false;
    }

    /// Appends the segment from the last-known point to `p`
    pub(crate) fn append_point(&mut self, p: Point) {
        debug_assert!(!self.closed, "cannot append to a closed path");
        if let Some(last) = self.last_point() {
            self.segments.push(Segment::new(last, p));
        }
    }

    /// Appends the closing segment back to the start point
    pub(crate) fn close(&mut self) {
        debug_assert!(!self.closed, "path already closed");
        if let (Some(last), Some(start)) = (self.last_point(), self.start) {
            self.segments.push(Segment::new(last, start));
            self.closed = true;
        }
    }

    /// Relocates the control point shared by segment `index`'s start and the
    /// previous segment's end, keeping the boundary closed.
    pub(crate) fn move_point(&mut self, index: usize, new_pos: Point) -> SelectionResult<()> {
        if !self.closed {
            return Err(SelectionError::InvalidArgument(
                "control points can only be moved on a closed path".into(),
            ));
        }
        let count = self.segments.len();
        if index >= count {
            return Err(SelectionError::InvalidArgument(format!(
                "control point index {index} out of range (path has {count})"
            )));
        }

        let prev = (index + count - 1) % count;
        self.segments[index] = self.segments[index].with_start(new_pos);
        self.segments[prev] = self.segments[prev].with_end(new_pos);
        if index == 0 {
            self.start = Some(new_pos);
        }
        Ok(())
    }

    /// The segment that would be appended if `p` were the next point
    pub fn live_wire(&self, p: Point) -> Option<Segment> {
        if self.closed {
            return None;
        }
        self.last_point().map(|last| Segment::new(last, p))
    }

    /// Index of the control point within `tolerance_squared` of `p`
    pub fn closest_point(&self, p: Point, tolerance_squared: i64) -> Option<usize> {
        closest_control_point(&self.control_points(), p, tolerance_squared)
    }

    /// Ordered vertex list for rasterization and correspondence use
    pub fn to_polygon(&self) -> Polygon {
        if self.closed {
            Polygon::from_segments(&self.segments)
        } else {
            Polygon::new(self.control_points())
        }
    }

    pub(crate) fn clear(&mut self) {
        *self = Self::default();
    }
}
