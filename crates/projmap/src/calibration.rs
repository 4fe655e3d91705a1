//! Per-surface calibration aggregate.

use crate::CalibrationError;
use projmap_core::{CalibrationKind, CorrespondencePoint, Degeneracy, Transform};
use serde::{Deserialize, Serialize};

/// Lifecycle of a [`SurfaceCalibration`].
///
/// `Empty → Collecting → Solved`, with `Invalid` reached when a solve fails
/// and no earlier solve succeeded. `reset` returns to `Empty` from anywhere.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationState {
    Empty,
    Collecting,
    Solved,
    Invalid,
}

impl std::fmt::Display for CalibrationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CalibrationState::Empty => write!(f, "empty"),
            CalibrationState::Collecting => write!(f, "collecting"),
            CalibrationState::Solved => write!(f, "solved"),
            CalibrationState::Invalid => write!(f, "invalid"),
        }
    }
}

/// A successful solve and the exact point set it was computed from.
#[derive(Clone, Debug, PartialEq)]
pub struct SolvedCalibration {
    pub points: Vec<CorrespondencePoint>,
    pub transform: Transform,
}

/// Calibration of one physical surface.
///
/// Points keep their insertion order. The last successful solve is kept
/// separately so a failed re-solve never loses it.
#[derive(Clone, Debug)]
pub struct SurfaceCalibration {
    kind: CalibrationKind,
    points: Vec<CorrespondencePoint>,
    last_good: Option<SolvedCalibration>,
    failure: Option<Degeneracy>,
    state: CalibrationState,
}

impl SurfaceCalibration {
    pub fn new(kind: CalibrationKind) -> Self {
        Self {
            kind,
            points: Vec::new(),
            last_good: None,
            failure: None,
            state: CalibrationState::Empty,
        }
    }

    pub(crate) fn from_solution(kind: CalibrationKind, solution: SolvedCalibration) -> Self {
        Self {
            kind,
            points: solution.points.clone(),
            last_good: Some(solution),
            failure: None,
            state: CalibrationState::Solved,
        }
    }

    #[inline]
    pub fn kind(&self) -> CalibrationKind {
        self.kind
    }

    #[inline]
    pub fn state(&self) -> CalibrationState {
        self.state
    }

    /// Working point set, in collection order.
    #[inline]
    pub fn points(&self) -> &[CorrespondencePoint] {
        &self.points
    }

    /// Solution currently in effect; `Some` only in [`CalibrationState::Solved`].
    pub fn solution(&self) -> Option<&SolvedCalibration> {
        match self.state {
            CalibrationState::Solved => self.last_good.as_ref(),
            _ => None,
        }
    }

    /// Reason the calibration went `Invalid`, if it did.
    #[inline]
    pub fn failure(&self) -> Option<&Degeneracy> {
        self.failure.as_ref()
    }

    /// Append a point. Checks the kind's point limit and duplicates only;
    /// geometry is checked at solve time.
    pub(crate) fn push(
        &mut self,
        point: CorrespondencePoint,
        duplicate_epsilon: f64,
    ) -> Result<(), CalibrationError> {
        if let Some(reason) = self.invalid_reason() {
            return Err(reason);
        }
        if let Some(max) = self.kind.max_points() {
            if self.points.len() >= max {
                return Err(CalibrationError::TooManyPoints {
                    kind: self.kind,
                    max,
                });
            }
        }
        if let Some(existing) = self.points.iter().find(|p| {
            p.id() == point.id()
                || (p.surface() - point.surface()).norm() <= duplicate_epsilon
                || (p.screen() - point.screen()).norm() <= duplicate_epsilon
        }) {
            return Err(CalibrationError::DuplicatePoint {
                existing: existing.id(),
            });
        }

        self.points.push(point);
        self.state = CalibrationState::Collecting;
        Ok(())
    }

    pub(crate) fn invalid_reason(&self) -> Option<CalibrationError> {
        match (self.state, &self.failure) {
            (CalibrationState::Invalid, Some(d)) => {
                Some(CalibrationError::DegenerateConfiguration(d.clone()))
            }
            _ => None,
        }
    }

    pub(crate) fn accept(&mut self, transform: Transform) -> &Transform {
        self.failure = None;
        self.state = CalibrationState::Solved;
        let solution = self.last_good.insert(SolvedCalibration {
            points: self.points.clone(),
            transform,
        });
        &solution.transform
    }

    /// Record a failed solve: keep the last good solution if there is one.
    pub(crate) fn reject(&mut self, reason: Option<Degeneracy>) {
        if self.last_good.is_some() {
            self.state = CalibrationState::Solved;
        } else if let Some(reason) = reason {
            self.failure = Some(reason);
            self.state = CalibrationState::Invalid;
        }
    }
}
