//! Simple filled shapes for pasting in perspective.

use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use crate::error::{SelectionError, SelectionResult};
use crate::geometry::{Point, Polygon};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShapeKind {
    Circle,
    Square,
    Oval,
    Triangle,
    Pentagon,
}

impl ShapeKind {
    pub fn all() -> &'static [ShapeKind] {
        &[
            ShapeKind::Circle,
            ShapeKind::Square,
            ShapeKind::Oval,
            ShapeKind::Triangle,
            ShapeKind::Pentagon,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            ShapeKind::Circle => "circle",
            ShapeKind::Square => "square",
            ShapeKind::Oval => "oval",
            ShapeKind::Triangle => "triangle",
            ShapeKind::Pentagon => "pentagon",
        }
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ShapeKind {
    type Err = SelectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        ShapeKind::all()
            .iter()
            .copied()
            .find(|kind| kind.name() == lower)
            .ok_or_else(|| SelectionError::InvalidArgument(format!("unsupported shape type: {s}")))
    }
}

/// Render `kind` filled with `color` into a `size`×`size` raster on a fully
/// transparent background. Coverage is decided at pixel centers.
pub fn render_shape(kind: ShapeKind, size: u32, color: Rgba<u8>) -> SelectionResult<RgbaImage> {
    if size == 0 {
        return Err(SelectionError::InvalidArgument("shape size must be positive".into()));
    }

    let mut img = RgbaImage::new(size, size);
    let s = f64::from(size);

    match kind {
        ShapeKind::Square => {
            for p in img.pixels_mut() {
                *p = color;
            }
        }
        ShapeKind::Circle => fill_ellipse(&mut img, s / 2.0, s / 2.0, s / 2.0, s / 2.0, color),
        // Full width, half height, vertically centered
        ShapeKind::Oval => fill_ellipse(&mut img, s / 2.0, s / 2.0, s / 2.0, s / 4.0, color),
        ShapeKind::Triangle => {
            let size = size as i32;
            let triangle = Polygon::new(vec![
                Point::new(size / 2, 0),
                Point::new(0, size),
                Point::new(size, size),
            ]);
            fill_polygon(&mut img, &triangle, color);
        }
        ShapeKind::Pentagon => {
            let r = s / 2.0;
            let vertices = (0..5)
                .map(|i| {
                    let angle = f64::from(i) * 2.0 * PI / 5.0 - PI / 2.0;
                    Point::new((r + r * angle.cos()) as i32, (r + r * angle.sin()) as i32)
                })
                .collect();
            fill_polygon(&mut img, &Polygon::new(vertices), color);
        }
    }

    Ok(img)
}

fn fill_ellipse(img: &mut RgbaImage, cx: f64, cy: f64, rx: f64, ry: f64, color: Rgba<u8>) {
    for (x, y, p) in img.enumerate_pixels_mut() {
        let dx = (f64::from(x) + 0.5 - cx) / rx;
        let dy = (f64::from(y) + 0.5 - cy) / ry;
        if dx * dx + dy * dy <= 1.0 {
            *p = color;
        }
    }
}

fn fill_polygon(img: &mut RgbaImage, polygon: &Polygon, color: Rgba<u8>) {
    let (w, h) = img.dimensions();
    polygon.for_each_covered_pixel(w, h, |x, y| img.put_pixel(x, y, color));
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);

    fn opaque_count(img: &RgbaImage) -> usize {
        img.pixels().filter(|p| p.0[3] == 255).count()
    }

    #[test]
    fn test_square_is_fully_opaque() {
        let img = render_shape(ShapeKind::Square, 10, RED).unwrap();
        assert_eq!(opaque_count(&img), 100);
    }

    #[test]
    fn test_circle_leaves_corners_transparent() {
        let img = render_shape(ShapeKind::Circle, 100, RED).unwrap();
        assert_eq!(img.get_pixel(0, 0).0[3], 0);
        assert_eq!(*img.get_pixel(50, 50), RED);
        // Area of a circle is about 78.5% of its bounding square
        let share = opaque_count(&img) as f64 / 10_000.0;
        assert!((share - PI / 4.0).abs() < 0.02);
    }

    #[test]
    fn test_oval_is_half_height() {
        let img = render_shape(ShapeKind::Oval, 100, RED).unwrap();
        assert_eq!(img.get_pixel(50, 10).0[3], 0);
        assert_eq!(*img.get_pixel(50, 50), RED);
        assert_eq!(img.get_pixel(50, 90).0[3], 0);
    }

    #[test]
    fn test_triangle_and_pentagon_cover_center() {
        for kind in [ShapeKind::Triangle, ShapeKind::Pentagon] {
            let img = render_shape(kind, 60, RED).unwrap();
            assert_eq!(*img.get_pixel(30, 40), RED, "{kind}");
            assert_eq!(img.get_pixel(1, 1).0[3], 0, "{kind}");
        }
    }

    #[test]
    fn test_parse_shape_names() {
        assert_eq!("Circle".parse::<ShapeKind>().unwrap(), ShapeKind::Circle);
        assert!("hexagon".parse::<ShapeKind>().unwrap_err().is_invalid_argument());
    }

    #[test]
    fn test_zero_size_is_rejected() {
        assert!(render_shape(ShapeKind::Square, 0, RED).is_err());
    }
}
