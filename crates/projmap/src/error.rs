use projmap_core::{CalibrationKind, Degeneracy, PointId, SolveError};

/// Errors returned by [`CalibrationManager`](crate::CalibrationManager).
#[derive(thiserror::Error, Debug)]
pub enum CalibrationError {
    #[error("{kind} calibration needs {needed} points, got {got}")]
    InsufficientPoints {
        kind: CalibrationKind,
        needed: usize,
        got: usize,
    },
    #[error("{kind} calibration accepts at most {max} points")]
    TooManyPoints { kind: CalibrationKind, max: usize },
    #[error("point coincides with existing {existing}")]
    DuplicatePoint { existing: PointId },
    #[error("degenerate configuration: {0}")]
    DegenerateConfiguration(Degeneracy),
    #[error("no valid calibration")]
    NotCalibrated,
    #[error("stored calibration does not match its correspondences: {reason}")]
    RecordMismatch { reason: String },
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl CalibrationError {
    /// Attach calibration context to a solver failure.
    pub(crate) fn from_solve(kind: CalibrationKind, err: SolveError) -> Self {
        match err {
            SolveError::Degenerate(d) => CalibrationError::DegenerateConfiguration(d),
            SolveError::InvalidTransform => CalibrationError::NotCalibrated,
            SolveError::WrongPointCount { expected, got } if got > expected => {
                CalibrationError::TooManyPoints {
                    kind,
                    max: expected,
                }
            }
            SolveError::WrongPointCount { expected, got } => CalibrationError::InsufficientPoints {
                kind,
                needed: expected,
                got,
            },
            SolveError::TooFewPoints { needed, got } => {
                CalibrationError::InsufficientPoints { kind, needed, got }
            }
            SolveError::LengthMismatch { src, dst } => CalibrationError::RecordMismatch {
                reason: format!("{src} screen points vs {dst} surface points"),
            },
        }
    }
}
