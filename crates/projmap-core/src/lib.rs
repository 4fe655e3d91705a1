//! Geometric solvers for projection-mapping calibration.
//!
//! This crate is intentionally small and stateless. It turns matched
//! (screen, surface) correspondences into a screen → surface transform and
//! derives keystone pre-warps from it:
//!
//! - [`ThreePointAligner`]: closed-form similarity from three points, built on
//!   [`OrthonormalBasis`].
//! - [`HomographySolver`]: normalized DLT homography from four or more points.
//! - [`SurfaceFrame`]: plane frame the homography solver works in, so wall
//!   and tilted surfaces are handled like the floor.
//! - [`KeystoneCorrector`]: pre-warp that makes oblique projection land on a
//!   rectilinear target.
//!
//! Calibration state (point collection, last-known-good results) lives in
//! the `projmap` crate.

mod basis;
mod error;
mod frame;
mod homography;
mod keystone;
mod params;
mod similarity;
mod transform;
mod types;

pub use basis::OrthonormalBasis;
pub use error::{Degeneracy, PointSpace, SolveError};
pub use frame::SurfaceFrame;
pub use homography::{reprojection_rms, Homography, HomographyFit, HomographySolver};
pub use keystone::{KeystoneCorrector, PrewarpMapping};
pub use params::SolverParams;
pub use similarity::{SimilarityTransform, ThreePointAligner};
pub use transform::{Transform, TransformModel};
pub use types::{CalibrationKind, CorrespondencePoint, PointId};
