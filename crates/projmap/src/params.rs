use projmap_core::SolverParams;
use serde::{Deserialize, Serialize};

/// Configuration for a [`CalibrationManager`](crate::CalibrationManager).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationParams {
    /// Absolute distance under which two screen points, or two surface
    /// points, are considered the same point.
    pub duplicate_epsilon: f64,
    /// Solver tolerances.
    pub solver: SolverParams,
}

impl Default for CalibrationParams {
    fn default() -> Self {
        Self {
            duplicate_epsilon: 1e-9,
            solver: SolverParams::default(),
        }
    }
}
