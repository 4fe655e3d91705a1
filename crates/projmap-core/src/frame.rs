//! Surface-local coordinates of a planar projection surface.
//!
//! Solvers work in the plane of the surface: local `(x, y)` span the plane
//! and local `z` runs along its normal. Horizontal planes keep the world
//! axes, so planar-mode points (`z = 0`) have identical world and local
//! coordinates. Keystone targets are given in local `(x, y)`.

use nalgebra::{Matrix3, Point2, Point3, SymmetricEigen, Vector3};
use serde::{Deserialize, Serialize};

/// Normal components at or below this magnitude count as zero when the
/// normal is oriented.
const AXIS_EPS: f64 = 1e-12;

/// Right-handed frame attached to a plane in world space.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SurfaceFrame {
    /// Foot of the perpendicular from the world origin onto the plane.
    pub origin: Point3<f64>,
    /// Columns: local x, local y, plane normal.
    pub axes: Matrix3<f64>,
}

impl SurfaceFrame {
    /// The plane `z = height` with world-aligned axes.
    pub fn horizontal(height: f64) -> Self {
        Self {
            origin: Point3::new(0.0, 0.0, height),
            axes: Matrix3::identity(),
        }
    }

    /// Frame of the plane through `point` with the given (non-zero) normal.
    ///
    /// The normal is flipped to point toward `+z`; for vertical planes
    /// toward `+y`, then `+x`. Local x is world x projected into the plane,
    /// or world y when the plane is nearly perpendicular to world x.
    pub fn from_plane(point: Point3<f64>, normal: Vector3<f64>) -> Self {
        let mut n = normal.normalize();
        let lead = if n.z.abs() > AXIS_EPS {
            n.z
        } else if n.y.abs() > AXIS_EPS {
            n.y
        } else {
            n.x
        };
        if lead < 0.0 {
            n = -n;
        }

        let seed = if n.x.abs() < 0.9 {
            Vector3::x()
        } else {
            Vector3::y()
        };
        let u = (seed - n * n.dot(&seed)).normalize();
        let v = n.cross(&u);
        Self {
            origin: Point3::from(n * n.dot(&point.coords)),
            axes: Matrix3::from_columns(&[u, v, n]),
        }
    }

    /// Least-squares plane through `points`; `None` for an empty slice.
    ///
    /// Points sharing one exact `z` get [`SurfaceFrame::horizontal`].
    pub fn fit(points: &[Point3<f64>]) -> Option<Self> {
        let first = points.first()?;
        if points.iter().all(|p| p.z == first.z) {
            return Some(Self::horizontal(first.z));
        }

        let centroid =
            points.iter().fold(Vector3::zeros(), |acc, p| acc + p.coords) / points.len() as f64;
        let mut scatter = Matrix3::zeros();
        for p in points {
            let d = p.coords - centroid;
            scatter += d * d.transpose();
        }
        let eig = SymmetricEigen::new(scatter);
        let normal = eig.eigenvectors.column(eig.eigenvalues.imin()).into_owned();
        Some(Self::from_plane(Point3::from(centroid), normal))
    }

    #[inline]
    pub fn normal(&self) -> Vector3<f64> {
        self.axes.column(2).into_owned()
    }

    /// World → local. Local `z` is the signed distance from the plane.
    pub fn to_local(&self, p: Point3<f64>) -> Point3<f64> {
        Point3::from(self.axes.transpose() * (p - self.origin))
    }

    pub fn to_world(&self, p: Point3<f64>) -> Point3<f64> {
        self.origin + self.axes * p.coords
    }

    /// Lift an in-plane local point into world space.
    pub fn plane_to_world(&self, p: Point2<f64>) -> Point3<f64> {
        self.to_world(Point3::new(p.x, p.y, 0.0))
    }

    pub fn approx_eq(&self, other: &SurfaceFrame, tol: f64) -> bool {
        (self.axes - other.axes).amax() <= tol
            && (self.origin - other.origin).amax() <= tol * self.origin.coords.amax().max(1.0)
    }
}
