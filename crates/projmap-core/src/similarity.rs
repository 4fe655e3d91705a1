//! Closed-form similarity alignment from three correspondences.
//!
//! The screen points are lifted into the `z = 0` reference plane and both
//! point triples are turned into orthonormal frames. The rotation maps the
//! screen frame onto the surface frame; scale comes from the first edge and
//! translation pins the first point.

use crate::basis::OrthonormalBasis;
use crate::error::{PointSpace, SolveError};
use crate::frame::SurfaceFrame;
use crate::homography::Homography;
use crate::params::SolverParams;
use crate::transform::{Transform, TransformModel};
use crate::types::{rms, CorrespondencePoint};
use log::{debug, warn};
use nalgebra::{Matrix3, Matrix4, Point2, Point3, Vector3};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// `q = scale · rotation · p + translation`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimilarityTransform {
    pub rotation: Matrix3<f64>,
    pub scale: f64,
    pub translation: Vector3<f64>,
}

impl SimilarityTransform {
    pub fn new(rotation: Matrix3<f64>, scale: f64, translation: Vector3<f64>) -> Self {
        Self {
            rotation,
            scale,
            translation,
        }
    }

    /// Map a screen point (lifted to `z = 0`).
    #[inline]
    pub fn apply(&self, p: Point2<f64>) -> Point3<f64> {
        self.apply_3d(Point3::new(p.x, p.y, 0.0))
    }

    #[inline]
    pub fn apply_3d(&self, p: Point3<f64>) -> Point3<f64> {
        Point3::from(self.scale * (self.rotation * p.coords) + self.translation)
    }

    /// Homogeneous 4×4 matrix, as consumed by render pipelines.
    pub fn to_matrix4(&self) -> Matrix4<f64> {
        let mut m = Matrix4::identity();
        m.fixed_view_mut::<3, 3>(0, 0)
            .copy_from(&(self.rotation * self.scale));
        m.fixed_view_mut::<3, 1>(0, 3).copy_from(&self.translation);
        m
    }

    /// Plane the screen lands on: normal `R·ẑ` through the translation.
    pub fn surface_frame(&self) -> SurfaceFrame {
        SurfaceFrame::from_plane(Point3::from(self.translation), self.rotation * Vector3::z())
    }

    /// Screen → surface-local `(x, y)` in [`surface_frame`](Self::surface_frame).
    pub fn planar_homography(&self) -> Homography {
        let frame = self.surface_frame();
        let to_local = frame.axes.transpose();
        let sr = to_local * (self.rotation * self.scale);
        let t = to_local * (self.translation - frame.origin.coords);
        Homography::new(Matrix3::new(
            sr[(0, 0)],
            sr[(0, 1)],
            t.x,
            sr[(1, 0)],
            sr[(1, 1)],
            t.y,
            0.0,
            0.0,
            1.0,
        ))
    }

    pub fn approx_eq(&self, other: &SimilarityTransform, tol: f64) -> bool {
        (self.rotation - other.rotation).amax() <= tol
            && (self.scale - other.scale).abs() <= tol * self.scale.abs().max(1.0)
            && (self.translation - other.translation).amax()
                <= tol * self.translation.amax().max(1.0)
    }
}

/// Solver for [`CalibrationKind::ThreePoint`](crate::CalibrationKind::ThreePoint).
#[derive(Clone, Copy, Debug, Default)]
pub struct ThreePointAligner {
    params: SolverParams,
}

impl ThreePointAligner {
    pub fn new(params: SolverParams) -> Self {
        Self { params }
    }

    /// Fit a similarity transform to exactly three correspondences.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self, points), fields(points = points.len()))
    )]
    pub fn solve(&self, points: &[CorrespondencePoint]) -> Result<Transform, SolveError> {
        let [a, b, c] = points else {
            return Err(SolveError::WrongPointCount {
                expected: 3,
                got: points.len(),
            });
        };

        let eps = self.params.collinearity_epsilon;
        let src = OrthonormalBasis::from_points(
            a.screen_3d(),
            b.screen_3d(),
            c.screen_3d(),
            eps,
            PointSpace::Screen,
        )?;
        let dst = OrthonormalBasis::from_points(
            a.surface(),
            b.surface(),
            c.surface(),
            eps,
            PointSpace::Surface,
        )?;

        let rotation = dst.to_matrix() * src.to_matrix().transpose();

        let [src_e1, src_e2] = src.edges();
        let [dst_e1, dst_e2] = dst.edges();
        let scale = dst_e1.norm() / src_e1.norm();
        let scale_e2 = dst_e2.norm() / src_e2.norm();
        let anisotropy = (scale_e2 - scale).abs() / scale;
        if anisotropy > self.params.anisotropy_tolerance {
            warn!(
                "three-point fit is not a similarity: edge scales {:.6} vs {:.6} ({:.2}% apart)",
                scale,
                scale_e2,
                anisotropy * 100.0
            );
        }

        let translation = a.surface().coords - scale * (rotation * src.origin.coords);
        let similarity = SimilarityTransform::new(rotation, scale, translation);

        let residual_error = rms(
            points
                .iter()
                .map(|p| (similarity.apply(p.screen()) - p.surface()).norm()),
        );
        debug!(
            "three-point fit: scale={:.6} residual={:.3e}",
            scale, residual_error
        );

        Ok(Transform::solved(
            TransformModel::Similarity(similarity),
            residual_error,
        ))
    }
}
