//! Keystone pre-warp for off-axis projection onto a planar surface.
//!
//! A projector hitting the surface at an angle turns its rectangular image
//! into a trapezoid. Given the calibrated screen → surface transform `F`,
//! the corrector finds a pre-warp `P` so that content rendered at the
//! frustum corners lands on the requested target footprint:
//! `F(P(frustum[i])) = target[i]`.
//!
//! Targets are surface-local `(x, y)` in the transform's
//! [`SurfaceFrame`](crate::SurfaceFrame), so tilted and vertical surfaces
//! work the same way as horizontal ones.

use crate::error::{Degeneracy, SolveError};
use crate::homography::{Homography, HomographySolver};
use crate::params::SolverParams;
use crate::transform::Transform;
use log::debug;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Render-time warp applied to content before it leaves the projector.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PrewarpMapping {
    pub matrix: Homography,
    pub valid: bool,
}

impl PrewarpMapping {
    #[inline]
    pub fn apply(&self, p: Point2<f64>) -> Point2<f64> {
        self.matrix.apply(p)
    }

    pub fn warp_corners(&self, corners: &[Point2<f64>; 4]) -> [Point2<f64>; 4] {
        corners.map(|p| self.apply(p))
    }
}

/// Computes pre-warps toward a fixed on-surface target footprint.
///
/// Corner order must be consistent between target and frustum corners
/// (e.g. TL, TR, BR, BL).
#[derive(Clone, Debug)]
pub struct KeystoneCorrector {
    target: [Point2<f64>; 4],
    solver: HomographySolver,
}

impl KeystoneCorrector {
    pub fn new(target_corners: [Point2<f64>; 4], params: SolverParams) -> Self {
        Self {
            target: target_corners,
            solver: HomographySolver::new(params),
        }
    }

    /// Axis-aligned rectangular target in surface units, corners TL, TR, BR, BL.
    pub fn for_rect(origin: Point2<f64>, width: f64, height: f64, params: SolverParams) -> Self {
        Self::new(
            [
                origin,
                Point2::new(origin.x + width, origin.y),
                Point2::new(origin.x + width, origin.y + height),
                Point2::new(origin.x, origin.y + height),
            ],
            params,
        )
    }

    #[inline]
    pub fn target_corners(&self) -> &[Point2<f64>; 4] {
        &self.target
    }

    /// Pre-warp for content rendered over `frustum_corners` (screen space).
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip(self, transform)))]
    pub fn compute_prewarp(
        &self,
        transform: &Transform,
        frustum_corners: [Point2<f64>; 4],
    ) -> Result<PrewarpMapping, SolveError> {
        if !transform.valid {
            return Err(SolveError::InvalidTransform);
        }

        // Desired footprint: frustum corners straight onto the target.
        let desired = self.solver.estimate(&frustum_corners, &self.target)?;
        let projection = transform.planar_homography();
        let undo = projection.inverse().ok_or(Degeneracy::Singular)?;

        let matrix = undo.compose(&desired.homography);
        debug!(
            "keystone prewarp: desired residual={:.3e}",
            desired.residual_error
        );
        Ok(PrewarpMapping {
            matrix,
            valid: true,
        })
    }
}
