use image::{GrayImage, Luma};

use super::{Point, Segment};

/// A closed polygon materialized from a selection boundary. Vertex `i` is the
/// start of segment `i`; the edge from the last vertex back to the first is
/// implied.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Polygon {
    vertices: Vec<Point>,
}

/// Inclusive-exclusive pixel bounds `[min_x, max_x) × [min_y, max_y)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelBounds {
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
}

impl PixelBounds {
    pub fn width(&self) -> u32 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> u32 {
        self.max_y - self.min_y
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }
}

impl Polygon {
    pub fn new(vertices: Vec<Point>) -> Self {
        Self { vertices }
    }

    /// Builds the vertex list from segments stored in traversal order
    pub fn from_segments(segments: &[Segment]) -> Self {
        Self {
            vertices: segments.iter().map(Segment::start).collect(),
        }
    }

    pub fn vertices(&self) -> &[Point] {
        &self.vertices
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Bounding box of the vertices clamped to a `width`×`height` raster
    pub fn bounds(&self, width: u32, height: u32) -> Option<PixelBounds> {
        let first = self.vertices.first()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in &self.vertices[1..] {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }

        let clamp = |v: i32, limit: u32| v.clamp(0, limit as i32) as u32;
        Some(PixelBounds {
            min_x: clamp(min_x, width),
            min_y: clamp(min_y, height),
            max_x: clamp(max_x, width),
            max_y: clamp(max_y, height),
        })
    }

    /// Calls `visit(x, y)` for every pixel of a `width`×`height` raster whose
    /// center lies inside the polygon (even-odd rule).
    pub fn for_each_covered_pixel(&self, width: u32, height: u32, mut visit: impl FnMut(u32, u32)) {
        let n = self.vertices.len();
        if n < 3 {
            return;
        }

        let mut nodes: Vec<f64> = Vec::with_capacity(n);
        for y in 0..height {
            let yf = f64::from(y) + 0.5;
            nodes.clear();

            // Walk every edge, including the closing edge n-1 → 0
            for i in 0..n {
                let (xi, yi) = self.vertices[i].to_f64();
                let (xj, yj) = self.vertices[(i + 1) % n].to_f64();
                if (yi < yf && yj >= yf) || (yj < yf && yi >= yf) {
                    let t = (yf - yi) / (yj - yi);
                    nodes.push(xi + t * (xj - xi));
                }
            }
            nodes.sort_by(|a, b| a.total_cmp(b));

            for pair in nodes.chunks_exact(2) {
                // Pixel x is covered when x + 0.5 lies in [left, right)
                let left = (pair[0] - 0.5).ceil().max(0.0);
                let right = (pair[1] - 0.5).ceil().min(f64::from(width));
                if right <= left {
                    continue;
                }
                for x in left as u32..right as u32 {
                    visit(x, y);
                }
            }
        }
    }

    /// Coverage of the polygon as an 8-bit mask (255 inside, 0 outside)
    pub fn coverage_mask(&self, width: u32, height: u32) -> GrayImage {
        let mut mask = GrayImage::new(width, height);
        self.for_each_covered_pixel(width, height, |x, y| mask.put_pixel(x, y, Luma([255u8])));
        mask
    }
}
