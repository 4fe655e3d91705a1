//! Plane-to-plane homography estimation via normalized DLT.

use crate::error::{Degeneracy, PointSpace, SolveError};
use crate::frame::SurfaceFrame;
use crate::params::SolverParams;
use crate::transform::{Transform, TransformModel};
use crate::types::{rms, CorrespondencePoint};
use log::debug;
use nalgebra::{DMatrix, Matrix3, Point2, Point3, Vector3};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Projective transform `dst ~ H · src`.
///
/// Serialized as a row-major `[[f64; 3]; 3]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "[[f64; 3]; 3]", into = "[[f64; 3]; 3]")]
pub struct Homography {
    pub h: Matrix3<f64>,
}

impl Homography {
    pub fn new(h: Matrix3<f64>) -> Self {
        Self { h }
    }

    pub fn identity() -> Self {
        Self::new(Matrix3::identity())
    }

    pub fn from_array(rows: [[f64; 3]; 3]) -> Self {
        Self::new(Matrix3::from_row_slice(&[
            rows[0][0], rows[0][1], rows[0][2], rows[1][0], rows[1][1], rows[1][2], rows[2][0],
            rows[2][1], rows[2][2],
        ]))
    }

    pub fn to_array(&self) -> [[f64; 3]; 3] {
        [
            [self.h[(0, 0)], self.h[(0, 1)], self.h[(0, 2)]],
            [self.h[(1, 0)], self.h[(1, 1)], self.h[(1, 2)]],
            [self.h[(2, 0)], self.h[(2, 1)], self.h[(2, 2)]],
        ]
    }

    /// Map a point. Points on the vanishing line come back non-finite.
    #[inline]
    pub fn apply(&self, p: Point2<f64>) -> Point2<f64> {
        let v = self.h * Vector3::new(p.x, p.y, 1.0);
        let w = v[2];
        Point2::new(v[0] / w, v[1] / w)
    }

    pub fn inverse(&self) -> Option<Self> {
        self.h.try_inverse().map(|h| Self::new(normalize_scale(h)))
    }

    /// `self ∘ other`: apply `other` first, then `self`.
    pub fn compose(&self, other: &Homography) -> Self {
        Self::new(normalize_scale(self.h * other.h))
    }

    /// Whether two homographies describe the same mapping up to scale.
    pub fn approx_eq(&self, other: &Homography, tol: f64) -> bool {
        let a = self.h / self.h.norm();
        let b = other.h / other.h.norm();
        // Same projective map up to sign.
        (a - b).amax() <= tol || (a + b).amax() <= tol
    }
}

impl From<[[f64; 3]; 3]> for Homography {
    fn from(rows: [[f64; 3]; 3]) -> Self {
        Self::from_array(rows)
    }
}

impl From<Homography> for [[f64; 3]; 3] {
    fn from(h: Homography) -> Self {
        h.to_array()
    }
}

/// Fix the projective scale: `H[2,2] = 1` when that entry is usable,
/// otherwise unit Frobenius norm with the largest-magnitude entry positive.
pub(crate) fn normalize_scale(h: Matrix3<f64>) -> Matrix3<f64> {
    let norm = h.norm();
    if norm == 0.0 {
        return h;
    }
    let s = h[(2, 2)];
    if s.abs() > 1e-12 * norm {
        return h / s;
    }
    let hn = h / norm;
    let imax = hn.iamax_full();
    if hn[imax] < 0.0 {
        -hn
    } else {
        hn
    }
}

/// Hartley normalization: translate to centroid, scale so mean distance = sqrt(2).
fn normalize_points(pts: &[Point2<f64>]) -> (Vec<Point2<f64>>, Matrix3<f64>) {
    let n = pts.len() as f64;
    let cx = pts.iter().map(|p| p.x).sum::<f64>() / n;
    let cy = pts.iter().map(|p| p.y).sum::<f64>() / n;

    let mean_dist = pts
        .iter()
        .map(|p| ((p.x - cx).powi(2) + (p.y - cy).powi(2)).sqrt())
        .sum::<f64>()
        / n;

    let s = if mean_dist > 1e-12 {
        std::f64::consts::SQRT_2 / mean_dist
    } else {
        1.0
    };

    let t = Matrix3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0);
    let out = pts
        .iter()
        .map(|p| Point2::new(s * (p.x - cx), s * (p.y - cy)))
        .collect();
    (out, t)
}

/// Largest pairwise distance within a point set.
fn extent(pts: &[Point2<f64>]) -> f64 {
    let mut best = 0.0_f64;
    for (i, a) in pts.iter().enumerate() {
        for b in &pts[i + 1..] {
            best = best.max((b - a).norm());
        }
    }
    best
}

fn extent_3d(pts: &[Point3<f64>]) -> f64 {
    let mut best = 0.0_f64;
    for (i, a) in pts.iter().enumerate() {
        for b in &pts[i + 1..] {
            best = best.max((b - a).norm());
        }
    }
    best
}

/// Find the first triple of (nearly) collinear points, if any.
fn find_collinear_triple(pts: &[Point2<f64>], eps: f64) -> Option<[usize; 3]> {
    let l = extent(pts);
    let tol = eps * l * l;
    let n = pts.len();
    for i in 0..n {
        for j in i + 1..n {
            for k in j + 1..n {
                let e1 = pts[j] - pts[i];
                let e2 = pts[k] - pts[i];
                let area2 = (e1.x * e2.y - e1.y * e2.x).abs();
                if area2 <= tol {
                    return Some([i, j, k]);
                }
            }
        }
    }
    None
}

/// Root-mean-square reprojection error of `h` over the pairs.
pub fn reprojection_rms(h: &Homography, src: &[Point2<f64>], dst: &[Point2<f64>]) -> f64 {
    rms(src.iter().zip(dst).map(|(s, d)| (h.apply(*s) - d).norm()))
}

/// A homography together with its RMS reprojection error.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HomographyFit {
    pub homography: Homography,
    pub residual_error: f64,
}

/// Direct linear transform solver for `n >= 4` correspondences.
#[derive(Clone, Copy, Debug, Default)]
pub struct HomographySolver {
    params: SolverParams,
}

impl HomographySolver {
    pub fn new(params: SolverParams) -> Self {
        Self { params }
    }

    #[inline]
    pub fn params(&self) -> &SolverParams {
        &self.params
    }

    /// Solve the screen → surface homography from correspondences.
    ///
    /// The surface points are fitted with a plane and the homography maps
    /// into that plane's local `(x, y)` (see [`SurfaceFrame`]). Points more
    /// than `planarity_epsilon · L` off the plane are rejected.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self, points), fields(points = points.len()))
    )]
    pub fn solve(&self, points: &[CorrespondencePoint]) -> Result<Transform, SolveError> {
        if points.len() < 4 {
            return Err(SolveError::TooFewPoints {
                needed: 4,
                got: points.len(),
            });
        }

        let surface: Vec<Point3<f64>> = points.iter().map(|c| c.surface()).collect();
        let frame = SurfaceFrame::fit(&surface).ok_or(Degeneracy::Singular)?;
        let local: Vec<Point3<f64>> = surface.iter().map(|p| frame.to_local(*p)).collect();

        let max_deviation = local.iter().fold(0.0_f64, |m, p| m.max(p.z.abs()));
        let tolerance = self.params.planarity_epsilon * extent_3d(&surface);
        if max_deviation > tolerance {
            return Err(Degeneracy::NonPlanar {
                max_deviation,
                tolerance,
            }
            .into());
        }

        let src: Vec<Point2<f64>> = points.iter().map(|c| c.screen()).collect();
        let dst: Vec<Point2<f64>> = local.iter().map(|p| p.xy()).collect();
        let fit = self.estimate(&src, &dst)?;

        let residual_error = rms(points.iter().map(|c| {
            (frame.plane_to_world(fit.homography.apply(c.screen())) - c.surface()).norm()
        }));
        Ok(Transform::solved(
            TransformModel::Homography {
                matrix: fit.homography,
                frame,
            },
            residual_error,
        ))
    }

    /// Estimate `H` such that `dst ~ H · src`.
    ///
    /// Exact for four points, algebraic least squares for more.
    pub fn estimate(
        &self,
        src: &[Point2<f64>],
        dst: &[Point2<f64>],
    ) -> Result<HomographyFit, SolveError> {
        if src.len() != dst.len() {
            return Err(SolveError::LengthMismatch {
                src: src.len(),
                dst: dst.len(),
            });
        }
        let n = src.len();
        if n < 4 {
            return Err(SolveError::TooFewPoints { needed: 4, got: n });
        }

        let eps = self.params.collinearity_epsilon;
        if let Some(indices) = find_collinear_triple(src, eps) {
            return Err(Degeneracy::Collinear {
                space: PointSpace::Screen,
                indices,
            }
            .into());
        }
        if let Some(indices) = find_collinear_triple(dst, eps) {
            return Err(Degeneracy::Collinear {
                space: PointSpace::Surface,
                indices,
            }
            .into());
        }

        let (s, ts) = normalize_points(src);
        let (d, td) = normalize_points(dst);

        // Build A (2N x 9), zero-padded to at least 9 rows so that the full
        // right singular basis is available for N = 4.
        let rows = (2 * n).max(9);
        let mut a = DMatrix::<f64>::zeros(rows, 9);
        for k in 0..n {
            let (x, y) = (s[k].x, s[k].y);
            let (u, v) = (d[k].x, d[k].y);

            // [ -x -y -1   0  0  0   u*x u*y u ]
            a[(2 * k, 0)] = -x;
            a[(2 * k, 1)] = -y;
            a[(2 * k, 2)] = -1.0;
            a[(2 * k, 6)] = u * x;
            a[(2 * k, 7)] = u * y;
            a[(2 * k, 8)] = u;

            // [ 0  0  0  -x -y -1   v*x v*y v ]
            a[(2 * k + 1, 3)] = -x;
            a[(2 * k + 1, 4)] = -y;
            a[(2 * k + 1, 5)] = -1.0;
            a[(2 * k + 1, 6)] = v * x;
            a[(2 * k + 1, 7)] = v * y;
            a[(2 * k + 1, 8)] = v;
        }

        let svd = a.svd(false, true);
        let vt = svd.v_t.ok_or(Degeneracy::Singular)?;
        let sv = &svd.singular_values;

        let mut order: Vec<usize> = (0..sv.len()).collect();
        order.sort_by(|&i, &j| sv[i].total_cmp(&sv[j]));
        let (smallest, second) = (order[0], order[1]);
        let sigma_max = sv[order[order.len() - 1]];
        let gap = sv[second] - sv[smallest];
        debug!(
            "dlt: n={} sigma_min={:.3e} sigma_next={:.3e} sigma_max={:.3e}",
            n, sv[smallest], sv[second], sigma_max
        );
        if gap.is_nan() || gap <= self.params.conditioning_epsilon * sigma_max {
            return Err(Degeneracy::IllConditioned { gap, sigma_max }.into());
        }

        let h = vt.row(smallest);
        let hn =
            Matrix3::<f64>::from_row_slice(&[h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], h[8]]);

        // Denormalize: H = Td^{-1} * Hn * Ts
        let td_inv = td.try_inverse().ok_or(Degeneracy::Singular)?;
        let homography = Homography::new(normalize_scale(td_inv * hn * ts));
        if homography.h.determinant().abs() <= f64::EPSILON * homography.h.norm().powi(3) {
            return Err(Degeneracy::Singular.into());
        }

        let residual_error = reprojection_rms(&homography, src, dst);
        Ok(HomographyFit {
            homography,
            residual_error,
        })
    }
}
