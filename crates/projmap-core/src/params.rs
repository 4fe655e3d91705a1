use serde::{Deserialize, Serialize};

/// Tolerances shared by the solvers.
///
/// All epsilons are relative, so the same values work for normalized
/// `[0, 1]²` screens and for pixel or millimetre coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverParams {
    /// Three points count as collinear when twice their triangle area is at
    /// most `collinearity_epsilon · L²`, with `L` the extent of the point set.
    pub collinearity_epsilon: f64,
    /// A DLT system is rejected when the gap between its two smallest
    /// singular values is at most `conditioning_epsilon · σ_max`.
    pub conditioning_epsilon: f64,
    /// Homography surface points may sit at most `planarity_epsilon · L`
    /// off their fitted plane.
    pub planarity_epsilon: f64,
    /// Relative disagreement between the two edge-length scale ratios of a
    /// three-point fit above which anisotropy is reported.
    pub anisotropy_tolerance: f64,
}

impl Default for SolverParams {
    fn default() -> Self {
        Self {
            collinearity_epsilon: 1e-6,
            conditioning_epsilon: 1e-6,
            planarity_epsilon: 1e-3,
            anisotropy_tolerance: 1e-3,
        }
    }
}
