use crate::frame::SurfaceFrame;
use crate::homography::Homography;
use crate::similarity::SimilarityTransform;
use nalgebra::{Point2, Point3};
use serde::{Deserialize, Serialize};

/// The geometric model a calibration solved for.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformModel {
    /// Screen plane (`z = 0`) into 3D surface space.
    Similarity(SimilarityTransform),
    /// Screen plane onto the surface plane described by `frame`; `matrix`
    /// maps into the frame's local `(x, y)`.
    Homography {
        matrix: Homography,
        frame: SurfaceFrame,
    },
}

/// Screen → surface transform with its fit quality.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub model: TransformModel,
    /// RMS distance between mapped screen points and their surface points,
    /// in surface units.
    pub residual_error: f64,
    /// Only set by a successful solve.
    pub valid: bool,
}

impl Transform {
    pub(crate) fn solved(model: TransformModel, residual_error: f64) -> Self {
        Self {
            model,
            residual_error,
            valid: true,
        }
    }

    /// Map a screen point onto the surface, in world coordinates.
    pub fn map_point(&self, screen: Point2<f64>) -> Point3<f64> {
        match &self.model {
            TransformModel::Similarity(s) => s.apply(screen),
            TransformModel::Homography { matrix, frame } => {
                frame.plane_to_world(matrix.apply(screen))
            }
        }
    }

    /// Map a screen point into surface-local `(x, y)`.
    pub fn map_point_local(&self, screen: Point2<f64>) -> Point2<f64> {
        self.planar_homography().apply(screen)
    }

    /// Plane of the surface the transform maps onto.
    pub fn surface_frame(&self) -> SurfaceFrame {
        match &self.model {
            TransformModel::Similarity(s) => s.surface_frame(),
            TransformModel::Homography { frame, .. } => *frame,
        }
    }

    /// In-plane 3×3 form of the transform (screen → surface-local `(x, y)`).
    pub fn planar_homography(&self) -> Homography {
        match &self.model {
            TransformModel::Similarity(s) => s.planar_homography(),
            TransformModel::Homography { matrix, .. } => *matrix,
        }
    }

    /// Whether two transforms describe the same mapping within `tol`.
    ///
    /// Homographies are compared up to projective scale.
    pub fn approx_eq(&self, other: &Transform, tol: f64) -> bool {
        match (&self.model, &other.model) {
            (TransformModel::Similarity(a), TransformModel::Similarity(b)) => a.approx_eq(b, tol),
            (
                TransformModel::Homography { matrix: a, frame: fa },
                TransformModel::Homography { matrix: b, frame: fb },
            ) => a.approx_eq(b, tol) && fa.approx_eq(fb, tol),
            _ => false,
        }
    }
}
