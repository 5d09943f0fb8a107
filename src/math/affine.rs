use std::ops::Mul;

use cgmath::{Matrix3, Point2, SquareMatrix};
use serde::{Deserialize, Serialize};

/// A 2D affine transform stored as the top two rows of a 3x3 matrix:
///
/// ```text
/// | a b c |
/// | d e f |
/// | 0 0 1 |
/// ```
///
/// A node's transform maps the unit square onto its parent's space.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Affine(pub [[f32; 3]; 2]);

impl Default for Affine {
    fn default() -> Self {
        Affine::identity()
    }
}

impl Affine {
    #[inline]
    pub fn identity() -> Self {
        Affine([[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]])
    }

    #[inline]
    pub fn scale(sx: f32, sy: f32) -> Self {
        Affine([[sx, 0.0, 0.0], [0.0, sy, 0.0]])
    }

    #[inline]
    pub fn translate(tx: f32, ty: f32) -> Self {
        Affine([[1.0, 0.0, tx], [0.0, 1.0, ty]])
    }

    /// Returns the inverse transform, or `None` if this one is degenerate.
    pub fn inverse(&self) -> Option<Affine> {
        Matrix3::from(*self).invert().map(Affine::from)
    }

    #[inline]
    pub fn transform_point(&self, p: Point2<f32>) -> Point2<f32> {
        let m = &self.0;
        Point2::new(
            m[0][0] * p.x + m[0][1] * p.y + m[0][2],
            m[1][0] * p.x + m[1][1] * p.y + m[1][2],
        )
    }
}

impl From<Affine> for Matrix3<f32> {
    fn from(v: Affine) -> Self {
        let m = &v.0;
        // cgmath matrices are column-major.
        Matrix3::new(
            m[0][0], m[1][0], 0.0, m[0][1], m[1][1], 0.0, m[0][2], m[1][2], 1.0,
        )
    }
}

impl From<Matrix3<f32>> for Affine {
    fn from(m: Matrix3<f32>) -> Self {
        Affine([[m.x.x, m.y.x, m.z.x], [m.x.y, m.y.y, m.z.y]])
    }
}

impl Mul for Affine {
    type Output = Affine;

    /// `lhs * rhs` applies `rhs` first.
    fn mul(self, rhs: Affine) -> Affine {
        Affine::from(Matrix3::from(self) * Matrix3::from(rhs))
    }
}
