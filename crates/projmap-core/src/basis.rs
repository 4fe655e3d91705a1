//! Orthonormal frames spanned by three points.

use crate::error::{Degeneracy, PointSpace, SolveError};
use nalgebra::{Matrix3, Point3, Vector3};

/// Right-handed orthonormal frame anchored at the first of three points.
///
/// `axes[0]` points from `p0` to `p1`, `axes[2]` is the normal of the plane
/// through the three points and `axes[1] = axes[2] × axes[0]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OrthonormalBasis {
    pub origin: Point3<f64>,
    axes: [Vector3<f64>; 3],
    /// Edge vectors `p1 - p0` and `p2 - p0`, kept for scale recovery.
    edges: [Vector3<f64>; 2],
}

impl OrthonormalBasis {
    /// Build the frame spanned by `p0`, `p1`, `p2`.
    ///
    /// Fails when `|e1 × e2| <= eps · L²`, `L` being the longest triangle
    /// edge, i.e. when the points are (nearly) collinear or coincident.
    /// `space` only labels the error.
    pub fn from_points(
        p0: Point3<f64>,
        p1: Point3<f64>,
        p2: Point3<f64>,
        eps: f64,
        space: PointSpace,
    ) -> Result<Self, SolveError> {
        let e1 = p1 - p0;
        let e2 = p2 - p0;
        let normal = e1.cross(&e2);

        let longest = e1.norm().max(e2.norm()).max((p2 - p1).norm());
        let area2 = normal.norm();
        if longest <= 0.0 || area2 <= eps * longest * longest {
            return Err(Degeneracy::Collinear {
                space,
                indices: [0, 1, 2],
            }
            .into());
        }

        let a1 = e1.normalize();
        let a3 = normal / area2;
        let a2 = a3.cross(&a1);

        Ok(Self {
            origin: p0,
            axes: [a1, a2, a3],
            edges: [e1, e2],
        })
    }

    #[inline]
    pub fn axes(&self) -> &[Vector3<f64>; 3] {
        &self.axes
    }

    #[inline]
    pub fn normal(&self) -> Vector3<f64> {
        self.axes[2]
    }

    /// Edge vectors `p1 - p0` and `p2 - p0`.
    #[inline]
    pub fn edges(&self) -> &[Vector3<f64>; 2] {
        &self.edges
    }

    /// Rotation whose columns are the frame axes (local → world).
    pub fn to_matrix(&self) -> Matrix3<f64> {
        Matrix3::from_columns(&self.axes)
    }

    /// Express a world point in frame coordinates.
    pub fn to_local(&self, p: Point3<f64>) -> Point3<f64> {
        Point3::from(self.to_matrix().transpose() * (p - self.origin))
    }

    /// Map frame coordinates back into world space.
    pub fn to_world(&self, p: Point3<f64>) -> Point3<f64> {
        self.origin + self.to_matrix() * p.coords
    }
}
