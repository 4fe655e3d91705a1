//! JSON persistence for solved calibrations.

use crate::calibration::SolvedCalibration;
use crate::CalibrationError;
use projmap_core::{
    CalibrationKind, CorrespondencePoint, HomographySolver, SolverParams, ThreePointAligner,
    Transform, TransformModel,
};
use serde::{Deserialize, Serialize};

/// Persistable form of a solved calibration.
///
/// Holds the correspondences together with the transform solved from them,
/// so a loaded record can be checked by solving again.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationRecord {
    pub kind: CalibrationKind,
    pub points: Vec<CorrespondencePoint>,
    #[serde(rename = "transform")]
    pub model: TransformModel,
    pub residual_error: f64,
}

impl CalibrationRecord {
    pub(crate) fn from_solution(kind: CalibrationKind, solution: &SolvedCalibration) -> Self {
        Self {
            kind,
            points: solution.points.clone(),
            model: solution.transform.model,
            residual_error: solution.transform.residual_error,
        }
    }

    /// Stored transform, marked valid.
    pub fn transform(&self) -> Transform {
        Transform {
            model: self.model,
            residual_error: self.residual_error,
            valid: true,
        }
    }

    pub fn to_json(&self) -> Result<String, CalibrationError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(s: &str) -> Result<Self, CalibrationError> {
        Ok(serde_json::from_str(s)?)
    }

    /// Solve the stored points again with the solver for `kind`.
    pub fn resolve(&self, params: &SolverParams) -> Result<Transform, CalibrationError> {
        let result = match self.kind {
            CalibrationKind::ThreePoint => ThreePointAligner::new(*params).solve(&self.points),
            CalibrationKind::FourPointHomography => {
                HomographySolver::new(*params).solve(&self.points)
            }
        };
        result.map_err(|err| CalibrationError::from_solve(self.kind, err))
    }

    /// Check that the stored transform is what its points solve to.
    pub fn verify(&self, params: &SolverParams, tol: f64) -> Result<(), CalibrationError> {
        let model_matches_kind = matches!(
            (self.kind, &self.model),
            (CalibrationKind::ThreePoint, TransformModel::Similarity(_))
                | (
                    CalibrationKind::FourPointHomography,
                    TransformModel::Homography { .. }
                )
        );
        if !model_matches_kind {
            return Err(CalibrationError::RecordMismatch {
                reason: format!("{} calibration with a mismatched transform model", self.kind),
            });
        }

        let solved = self.resolve(params)?;
        if !solved.approx_eq(&self.transform(), tol) {
            return Err(CalibrationError::RecordMismatch {
                reason: format!(
                    "stored transform differs from re-solve (residual {:.3e} vs {:.3e})",
                    self.residual_error, solved.residual_error
                ),
            });
        }
        Ok(())
    }
}
