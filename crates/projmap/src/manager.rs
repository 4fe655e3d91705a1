use crate::calibration::{CalibrationState, SolvedCalibration, SurfaceCalibration};
use crate::record::CalibrationRecord;
use crate::{CalibrationError, CalibrationParams};
use log::{debug, info, warn};
use nalgebra::{Point2, Point3};
use projmap_core::{
    CalibrationKind, CorrespondencePoint, HomographySolver, KeystoneCorrector, PointId,
    PrewarpMapping, SolveError, ThreePointAligner, Transform,
};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Calibration session for one physical surface.
///
/// Collects correspondences, runs the solver selected by the
/// [`CalibrationKind`] and answers mapping queries with the last good
/// transform. Construct one manager per surface; mutation takes `&mut self`.
#[derive(Clone, Debug)]
pub struct CalibrationManager {
    params: CalibrationParams,
    calibration: SurfaceCalibration,
    next_id: PointId,
}

impl CalibrationManager {
    /// Start an empty calibration of the given kind with default parameters.
    pub fn new(kind: CalibrationKind) -> Self {
        Self::with_params(kind, CalibrationParams::default())
    }

    pub fn with_params(kind: CalibrationKind, params: CalibrationParams) -> Self {
        Self {
            params,
            calibration: SurfaceCalibration::new(kind),
            next_id: PointId(0),
        }
    }

    /// Discard the current calibration and begin a new one of `kind`.
    pub fn begin(&mut self, kind: CalibrationKind) {
        debug!("begin {} calibration", kind);
        self.calibration = SurfaceCalibration::new(kind);
        self.next_id = PointId(0);
    }

    /// Clear points and transform; the calibration kind is kept.
    pub fn reset(&mut self) {
        self.begin(self.calibration.kind());
    }

    #[inline]
    pub fn params(&self) -> &CalibrationParams {
        &self.params
    }

    #[inline]
    pub fn kind(&self) -> CalibrationKind {
        self.calibration.kind()
    }

    #[inline]
    pub fn state(&self) -> CalibrationState {
        self.calibration.state()
    }

    #[inline]
    pub fn points(&self) -> &[CorrespondencePoint] {
        self.calibration.points()
    }

    #[inline]
    pub fn calibration(&self) -> &SurfaceCalibration {
        &self.calibration
    }

    /// Add a correspondence with a manager-assigned id.
    pub fn add_point(
        &mut self,
        surface: Point3<f64>,
        screen: Point2<f64>,
    ) -> Result<PointId, CalibrationError> {
        self.add_correspondence(CorrespondencePoint::new(self.next_id, surface, screen))
    }

    /// Planar-mode variant of [`add_point`](Self::add_point).
    pub fn add_planar_point(
        &mut self,
        surface: Point2<f64>,
        screen: Point2<f64>,
    ) -> Result<PointId, CalibrationError> {
        self.add_correspondence(CorrespondencePoint::planar(self.next_id, surface, screen))
    }

    /// Add a caller-built correspondence. Its id must be unused.
    pub fn add_correspondence(
        &mut self,
        point: CorrespondencePoint,
    ) -> Result<PointId, CalibrationError> {
        self.calibration
            .push(point, self.params.duplicate_epsilon)?;
        let id = point.id();
        if id >= self.next_id {
            self.next_id = id.next();
        }
        debug!(
            "added {} (surface {:?}, screen {:?}), {} points",
            id,
            point.surface(),
            point.screen(),
            self.calibration.points().len()
        );
        Ok(id)
    }

    /// Solve the calibration from the current points.
    ///
    /// On failure the previous good transform, if any, stays in effect.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self), fields(kind = %self.kind(), points = self.points().len()))
    )]
    pub fn solve(&mut self) -> Result<&Transform, CalibrationError> {
        if let Some(err) = self.calibration.invalid_reason() {
            return Err(err);
        }

        let kind = self.calibration.kind();
        let got = self.calibration.points().len();
        let needed = kind.min_points();
        if got < needed {
            return Err(CalibrationError::InsufficientPoints { kind, needed, got });
        }

        let solver = self.params.solver;
        let points = self.calibration.points();
        let result = match kind {
            CalibrationKind::ThreePoint => ThreePointAligner::new(solver).solve(points),
            CalibrationKind::FourPointHomography => HomographySolver::new(solver).solve(points),
        };

        match result {
            Ok(transform) => {
                info!(
                    "{} calibration solved from {} points, residual {:.3e}",
                    kind, got, transform.residual_error
                );
                Ok(self.calibration.accept(transform))
            }
            Err(err) => {
                warn!("{} calibration failed: {}", kind, err);
                let reason = match &err {
                    SolveError::Degenerate(d) => Some(d.clone()),
                    _ => None,
                };
                self.calibration.reject(reason);
                Err(CalibrationError::from_solve(kind, err))
            }
        }
    }

    /// Map a screen point onto the surface with the current transform.
    pub fn query(&self, screen: Point2<f64>) -> Result<Point3<f64>, CalibrationError> {
        self.current_transform()
            .map(|t| t.map_point(screen))
            .ok_or(CalibrationError::NotCalibrated)
    }

    /// Transform in effect; `None` unless the calibration is solved.
    pub fn current_transform(&self) -> Option<&Transform> {
        self.calibration.solution().map(|s| &s.transform)
    }

    pub fn residual_error(&self) -> Option<f64> {
        self.current_transform().map(|t| t.residual_error)
    }

    /// Keystone pre-warp for the current transform.
    pub fn prewarp(
        &self,
        corrector: &KeystoneCorrector,
        frustum_corners: [Point2<f64>; 4],
    ) -> Result<PrewarpMapping, CalibrationError> {
        let transform = self
            .current_transform()
            .ok_or(CalibrationError::NotCalibrated)?;
        corrector
            .compute_prewarp(transform, frustum_corners)
            .map_err(|err| CalibrationError::from_solve(self.kind(), err))
    }

    /// Persistable snapshot of the solution in effect.
    pub fn export(&self) -> Option<CalibrationRecord> {
        self.calibration
            .solution()
            .map(|s| CalibrationRecord::from_solution(self.kind(), s))
    }

    /// Rebuild a solved manager from a stored record.
    ///
    /// The record is re-solved and must reproduce its stored transform
    /// within `params.solver` tolerances; the stored values are kept as-is.
    pub fn restore(
        record: CalibrationRecord,
        params: CalibrationParams,
    ) -> Result<Self, CalibrationError> {
        record.verify(&params.solver, RESTORE_TOLERANCE)?;

        let mut replay = SurfaceCalibration::new(record.kind);
        for p in &record.points {
            replay.push(*p, params.duplicate_epsilon)?;
        }

        let next_id = record
            .points
            .iter()
            .map(|p| p.id().next())
            .max()
            .unwrap_or(PointId(0));
        let kind = record.kind;
        let solution = SolvedCalibration {
            transform: record.transform(),
            points: record.points,
        };
        info!(
            "restored {} calibration with {} points",
            kind,
            solution.points.len()
        );
        Ok(Self {
            params,
            calibration: SurfaceCalibration::from_solution(kind, solution),
            next_id,
        })
    }
}

/// Relative tolerance for a restored record to match its re-solve.
const RESTORE_TOLERANCE: f64 = 1e-9;
