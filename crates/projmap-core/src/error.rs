use serde::{Deserialize, Serialize};

/// Which point set of a correspondence list a degeneracy was found in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointSpace {
    Screen,
    Surface,
}

impl std::fmt::Display for PointSpace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PointSpace::Screen => write!(f, "screen"),
            PointSpace::Surface => write!(f, "surface"),
        }
    }
}

/// Why a point configuration does not determine a unique transform.
#[derive(thiserror::Error, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Degeneracy {
    #[error("points {indices:?} are collinear or coincident in {space} space")]
    Collinear { space: PointSpace, indices: [usize; 3] },
    #[error("ill-conditioned system (singular value gap {gap:.3e}, largest {sigma_max:.3e})")]
    IllConditioned { gap: f64, sigma_max: f64 },
    #[error("transform is singular")]
    Singular,
    #[error("surface points are not coplanar (max deviation {max_deviation:.3e}, allowed {tolerance:.3e})")]
    NonPlanar { max_deviation: f64, tolerance: f64 },
}

/// Errors returned by the geometric solvers.
#[derive(thiserror::Error, Clone, Debug, PartialEq)]
pub enum SolveError {
    #[error("expected exactly {expected} correspondences, got {got}")]
    WrongPointCount { expected: usize, got: usize },
    #[error("need at least {needed} correspondences, got {got}")]
    TooFewPoints { needed: usize, got: usize },
    #[error("source and destination lengths differ ({src} vs {dst})")]
    LengthMismatch { src: usize, dst: usize },
    #[error("transform is not a valid calibration result")]
    InvalidTransform,
    #[error("degenerate configuration: {0}")]
    Degenerate(#[from] Degeneracy),
}
