//! Perspective compositing by inverse mapping.
//!
//! For every destination pixel the inverse homography gives a fractional
//! source position; the four neighbouring source pixels are bilinearly
//! interpolated and the result is blended source-over onto the destination.
//! Inverse mapping means no destination pixel inside the target quad is left
//! unvisited.

use image::{Rgba, RgbaImage};
use rayon::prelude::*;

use crate::error::SelectionResult;
use crate::geometry::Point;

use super::homography::{Homography, Tolerance};
use super::job::{JobControl, Interrupted};

/// Slack allowed when a mapped coordinate lands a hair outside the
/// interpolation margin because of rounding in the solve
const SAMPLE_EPSILON: f64 = 1e-6;

/// Corners of a `width`×`height` raster in top-left, top-right, bottom-right,
/// bottom-left order
pub fn source_quad(width: u32, height: u32) -> [(f64, f64); 4] {
    let (w, h) = (f64::from(width), f64::from(height));
    [(0.0, 0.0), (w, 0.0), (w, h), (0.0, h)]
}

/// Homography taking the bounding rectangle of a `width`×`height` raster onto
/// `corners` (in path order)
pub fn perspective_homography(
    width: u32,
    height: u32,
    corners: &[Point],
    tolerance: Tolerance,
) -> SelectionResult<Homography> {
    let dst: Vec<(f64, f64)> = corners.iter().map(|p| p.to_f64()).collect();
    Homography::from_correspondences(&source_quad(width, height), &dst, tolerance)
}

/// Bilinear interpolation of all four channels independently.
///
/// Returns `None` when `(x, y)` falls outside the area where four neighbours
/// exist, i.e. outside `[0, width - 1] × [0, height - 1]`.
pub fn bilinear_sample(img: &RgbaImage, x: f64, y: f64) -> Option<Rgba<u8>> {
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return None;
    }
    let max_x = f64::from(width - 1);
    let max_y = f64::from(height - 1);

    // Negated comparisons also reject NaN
    if !(x >= -SAMPLE_EPSILON && y >= -SAMPLE_EPSILON && x <= max_x + SAMPLE_EPSILON && y <= max_y + SAMPLE_EPSILON) {
        return None;
    }
    let x = x.clamp(0.0, max_x);
    let y = y.clamp(0.0, max_y);

    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    let x1 = (x0 + 1).min(width - 1);
    let y1 = (y0 + 1).min(height - 1);
    let fx = x - f64::from(x0);
    let fy = y - f64::from(y0);

    let tl = img.get_pixel(x0, y0).0;
    let tr = img.get_pixel(x1, y0).0;
    let bl = img.get_pixel(x0, y1).0;
    let br = img.get_pixel(x1, y1).0;

    let lerp = |a: f64, b: f64, t: f64| a + (b - a) * t;
    let mut out = [0u8; 4];
    for c in 0..4 {
        let top = lerp(f64::from(tl[c]), f64::from(tr[c]), fx);
        let bot = lerp(f64::from(bl[c]), f64::from(br[c]), fx);
        out[c] = lerp(top, bot, fy).round().clamp(0.0, 255.0) as u8;
    }
    Some(Rgba(out))
}

/// Straight-alpha source-over compositing
pub fn blend_over(src: Rgba<u8>, dst: Rgba<u8>) -> Rgba<u8> {
    let alpha_src = f64::from(src.0[3]) / 255.0;
    let alpha_dst = f64::from(dst.0[3]) / 255.0;

    let out_a = alpha_src + alpha_dst * (1.0 - alpha_src);
    if out_a <= 0.0 {
        return Rgba([0, 0, 0, 0]);
    }

    let mut out = [0u8; 4];
    for c in 0..3 {
        let value = (f64::from(src.0[c]) * alpha_src + f64::from(dst.0[c]) * alpha_dst * (1.0 - alpha_src)) / out_a;
        out[c] = value.round().clamp(0.0, 255.0) as u8;
    }
    out[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
    Rgba(out)
}

/// Warp `content` through `inverse` (destination → source) and blend it onto
/// `dest`. Rows are processed in parallel; `control` is consulted before each
/// row so a cancelled pass stops early. On `Err` the contents of `dest` are
/// unspecified and must be discarded.
pub fn warp_and_overlay(
    content: &RgbaImage,
    dest: &mut RgbaImage,
    inverse: &Homography,
    control: &JobControl,
) -> Result<(), Interrupted> {
    let width = dest.width() as usize;
    if width == 0 || dest.height() == 0 {
        return Ok(());
    }
    let row_bytes = width * 4;
    let dst_raw: &mut [u8] = dest;

    dst_raw
        .par_chunks_mut(row_bytes)
        .enumerate()
        .try_for_each(|(y, row)| {
            if control.is_cancelled() {
                return Err(Interrupted);
            }

            for x in 0..width {
                let Some((sx, sy)) = inverse.apply(x as f64, y as f64) else {
                    continue;
                };
                let Some(sample) = bilinear_sample(content, sx, sy) else {
                    continue;
                };
                if sample.0[3] == 0 {
                    continue;
                }

                let px = x * 4;
                let existing = Rgba([row[px], row[px + 1], row[px + 2], row[px + 3]]);
                row[px..px + 4].copy_from_slice(&blend_over(sample, existing).0);
            }

            control.row_done();
            Ok(())
        })
}

/// Synchronous convenience: solve, invert and composite in one call
pub fn composite(
    content: &RgbaImage,
    dest: &mut RgbaImage,
    corners: &[Point],
    tolerance: Tolerance,
) -> SelectionResult<()> {
    let forward = perspective_homography(content.width(), content.height(), corners, tolerance)?;
    let inverse = forward.inverse(tolerance)?;
    let control = JobControl::new(dest.height() as usize);
    // A private control is never cancelled
    let _ = warp_and_overlay(content, dest, &inverse, &control);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opaque_source_replaces_destination() {
        let out = blend_over(Rgba([10, 20, 30, 255]), Rgba([200, 200, 200, 255]));
        assert_eq!(out, Rgba([10, 20, 30, 255]));
    }

    #[test]
    fn test_half_transparent_over_opaque() {
        let out = blend_over(Rgba([255, 0, 0, 128]), Rgba([0, 0, 255, 255]));
        assert_eq!(out.0[3], 255);
        assert!((i32::from(out.0[0]) - 128).abs() <= 1);
        assert!((i32::from(out.0[2]) - 127).abs() <= 1);
    }

    #[test]
    fn test_both_transparent_short_circuits() {
        assert_eq!(blend_over(Rgba([9, 9, 9, 0]), Rgba([7, 7, 7, 0])), Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn test_bilinear_midpoint() {
        let mut img = RgbaImage::new(2, 1);
        img.put_pixel(0, 0, Rgba([0, 0, 0, 255]));
        img.put_pixel(1, 0, Rgba([200, 100, 50, 255]));
        assert_eq!(bilinear_sample(&img, 0.5, 0.0), Some(Rgba([100, 50, 25, 255])));
    }

    #[test]
    fn test_bilinear_outside_margin() {
        let img = RgbaImage::new(4, 4);
        assert!(bilinear_sample(&img, -0.5, 1.0).is_none());
        assert!(bilinear_sample(&img, 3.5, 1.0).is_none());
        assert!(bilinear_sample(&img, f64::NAN, 1.0).is_none());
        assert!(bilinear_sample(&img, 3.0, 3.0).is_some());
    }

    #[test]
    fn test_composite_translates_content() {
        let content = RgbaImage::from_pixel(2, 2, Rgba([0, 255, 0, 255]));
        let mut dest = RgbaImage::from_pixel(6, 6, Rgba([0, 0, 0, 255]));
        let corners = [Point::new(2, 1), Point::new(4, 1), Point::new(4, 3), Point::new(2, 3)];
        composite(&content, &mut dest, &corners, Tolerance::default()).unwrap();

        let green = dest.pixels().filter(|p| p.0 == [0, 255, 0, 255]).count();
        assert_eq!(green, 4);
        assert_eq!(dest.get_pixel(3, 2).0, [0, 255, 0, 255]);
        assert_eq!(dest.get_pixel(4, 2).0, [0, 0, 0, 255]);
    }

    #[test]
    fn test_cancelled_control_interrupts_pass() {
        let content = RgbaImage::from_pixel(4, 4, Rgba([255, 0, 0, 255]));
        let mut dest = RgbaImage::new(8, 8);
        let control = JobControl::new(8);
        control.cancel();
        let result = warp_and_overlay(&content, &mut dest, &Homography::identity(), &control);
        assert!(result.is_err());
    }
}
