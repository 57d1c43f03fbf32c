//! Projective transforms between quadrilaterals.
//!
//! A homography is stored as a 3×3 matrix whose bottom-right entry is fixed to
//! 1. It maps `(x, y)` to
//! ```text
//! X = (a·x + b·y + c) / (g·x + h·y + 1)
//! Y = (d·x + e·y + f) / (g·x + h·y + 1)
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{SelectionError, SelectionResult};

/// Default threshold below which a pivot or determinant counts as zero
pub const DEFAULT_EPSILON: f64 = 1e-10;

/// How "numerically zero" is decided for pivots and determinants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Tolerance {
    /// Fixed threshold regardless of operand size
    Absolute(f64),
    /// Threshold scaled by the operand magnitudes. Determinants are measured
    /// against the product of the matrix column norms, so a translation
    /// column in pixels does not swamp a small linear part.
    Relative(f64),
}

impl Default for Tolerance {
    fn default() -> Self {
        Tolerance::Absolute(DEFAULT_EPSILON)
    }
}

impl Tolerance {
    /// Threshold for a quantity whose natural magnitude is `scale`
    pub fn threshold(&self, scale: f64) -> f64 {
        match *self {
            Tolerance::Absolute(eps) => eps,
            Tolerance::Relative(eps) => eps * scale.max(f64::MIN_POSITIVE),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Homography {
    m: [[f64; 3]; 3],
}

impl Default for Homography {
    fn default() -> Self {
        Self::identity()
    }
}

impl Homography {
    pub fn identity() -> Self {
        Self {
            m: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
        }
    }

    pub fn from_matrix(m: [[f64; 3]; 3]) -> Self {
        Self { m }
    }

    pub fn matrix(&self) -> &[[f64; 3]; 3] {
        &self.m
    }

    /// Solve for the transform mapping `src[i]` onto `dst[i]` for four
    /// correspondences. The order of the correspondences is significant.
    pub fn from_correspondences(
        src: &[(f64, f64)],
        dst: &[(f64, f64)],
        tolerance: Tolerance,
    ) -> SelectionResult<Self> {
        if src.len() != 4 || dst.len() != 4 {
            return Err(SelectionError::InvalidArgument(format!(
                "exactly four source and destination points are required (got {} and {})",
                src.len(),
                dst.len()
            )));
        }

        // Two equations per correspondence after clearing the denominator
        let mut a = [[0.0f64; 8]; 8];
        let mut b = [0.0f64; 8];
        for i in 0..4 {
            let (x, y) = src[i];
            let (xp, yp) = dst[i];

            a[2 * i] = [x, y, 1.0, 0.0, 0.0, 0.0, -x * xp, -y * xp];
            b[2 * i] = xp;

            a[2 * i + 1] = [0.0, 0.0, 0.0, x, y, 1.0, -x * yp, -y * yp];
            b[2 * i + 1] = yp;
        }

        let h = solve_linear_system(a, b, tolerance)?;
        let homography = Self {
            m: [[h[0], h[1], h[2]], [h[3], h[4], h[5]], [h[6], h[7], 1.0]],
        };

        // A collinear triple on either side forces a rank-deficient matrix even
        // when the linear system itself had usable pivots
        let det = homography.determinant();
        if !det.is_finite() || det.abs() < tolerance.threshold(homography.determinant_scale()) {
            return Err(SelectionError::NumericalFailure(
                "correspondences are degenerate - cannot compute homography".into(),
            ));
        }

        Ok(homography)
    }

    pub fn determinant(&self) -> f64 {
        let [[a, b, c], [d, e, f], [g, h, i]] = self.m;
        a * (e * i - f * h) - b * (d * i - f * g) + c * (d * h - e * g)
    }

    /// Hadamard bound on the determinant: the product of the column norms.
    /// `|det| / scale` lies in `[0, 1]` whatever units each column is in.
    fn determinant_scale(&self) -> f64 {
        (0..3)
            .map(|col| self.m.iter().map(|row| row[col] * row[col]).sum::<f64>().sqrt())
            .product()
    }

    /// Closed-form inverse via the adjugate, rescaled so the bottom-right
    /// entry is 1 again when possible
    pub fn inverse(&self, tolerance: Tolerance) -> SelectionResult<Self> {
        let [[a, b, c], [d, e, f], [g, h, i]] = self.m;

        let det = self.determinant();
        if !det.is_finite() || det.abs() < tolerance.threshold(self.determinant_scale()) {
            return Err(SelectionError::NumericalFailure(
                "homography matrix is singular and cannot be inverted".into(),
            ));
        }

        let inv = 1.0 / det;
        let mut m = [
            [(e * i - f * h) * inv, (c * h - b * i) * inv, (b * f - c * e) * inv],
            [(f * g - d * i) * inv, (a * i - c * g) * inv, (c * d - a * f) * inv],
            [(d * h - e * g) * inv, (b * g - a * h) * inv, (a * e - b * d) * inv],
        ];

        let corner = m[2][2];
        if corner.abs() > f64::EPSILON {
            for row in &mut m {
                for v in row.iter_mut() {
                    *v /= corner;
                }
            }
        }

        Ok(Self { m })
    }

    /// Map a point, or `None` if it lands on the line at infinity
    #[inline]
    pub fn apply(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        let m = &self.m;
        let w = m[2][0] * x + m[2][1] * y + m[2][2];
        if w.abs() < 1e-12 {
            return None;
        }
        let xp = (m[0][0] * x + m[0][1] * y + m[0][2]) / w;
        let yp = (m[1][0] * x + m[1][1] * y + m[1][2]) / w;
        Some((xp, yp))
    }

    /// Entry-wise comparison
    pub fn approx_eq(&self, other: &Homography, tolerance: f64) -> bool {
        self.m
            .iter()
            .flatten()
            .zip(other.m.iter().flatten())
            .all(|(a, b)| (a - b).abs() <= tolerance)
    }
}

/// Solve an 8×8 linear system using Gaussian elimination with partial pivoting
fn solve_linear_system(
    mut a: [[f64; 8]; 8],
    mut b: [f64; 8],
    tolerance: Tolerance,
) -> SelectionResult<[f64; 8]> {
    let n = 8;
    let scale = a.iter().flatten().fold(0.0f64, |acc, v| acc.max(v.abs()));
    let threshold = tolerance.threshold(scale);

    // Forward elimination with partial pivoting
    for col in 0..n {
        let mut max_row = col;
        let mut max_val = a[col][col].abs();
        for row in (col + 1)..n {
            if a[row][col].abs() > max_val {
                max_val = a[row][col].abs();
                max_row = row;
            }
        }

        if max_row != col {
            a.swap(col, max_row);
            b.swap(col, max_row);
        }

        let pivot = a[col][col];
        if !pivot.is_finite() || pivot.abs() < threshold {
            return Err(SelectionError::NumericalFailure(
                "singular matrix - cannot compute homography".into(),
            ));
        }

        for row in (col + 1)..n {
            let factor = a[row][col] / pivot;
            for j in col..n {
                a[row][j] -= factor * a[col][j];
            }
            b[row] -= factor * b[col];
        }
    }

    // Back substitution
    let mut x = [0.0f64; 8];
    for i in (0..n).rev() {
        let mut sum = b[i];
        for j in (i + 1)..n {
            sum -= a[i][j] * x[j];
        }
        x[i] = sum / a[i][i];
    }

    Ok(x)
}
