//! Projection-mapping calibration for arbitrarily oriented surfaces.
//!
//! This crate provides:
//! - [`CalibrationManager`], the per-surface session that collects
//!   (surface, screen) correspondences, solves them and answers queries
//! - last-known-good retention: a failed re-solve never loses a good transform
//! - JSON persistence through [`CalibrationRecord`]
//! - re-exports of the stateless solvers in `projmap-core`
//!
//! ## Quickstart
//!
//! ```
//! use nalgebra::Point2;
//! use projmap::{CalibrationKind, CalibrationManager};
//!
//! # fn main() -> Result<(), projmap::CalibrationError> {
//! let mut manager = CalibrationManager::new(CalibrationKind::FourPointHomography);
//! manager.add_planar_point(Point2::new(0.0, 0.0), Point2::new(0.0, 0.0))?;
//! manager.add_planar_point(Point2::new(2.0, 0.0), Point2::new(1.0, 0.0))?;
//! manager.add_planar_point(Point2::new(2.0, 1.5), Point2::new(1.0, 1.0))?;
//! manager.add_planar_point(Point2::new(0.0, 1.5), Point2::new(0.0, 1.0))?;
//! manager.solve()?;
//!
//! let on_surface = manager.query(Point2::new(0.5, 0.5))?;
//! assert!((on_surface.x - 1.0).abs() < 1e-9);
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `projmap::core`: solvers, transforms and point types.
//! - [`CalibrationManager`] / [`SurfaceCalibration`]: calibration state.
//! - [`CalibrationRecord`]: persisted calibrations.

mod calibration;
mod error;
mod manager;
mod params;
mod record;

pub use projmap_core as core;

pub use calibration::{CalibrationState, SolvedCalibration, SurfaceCalibration};
pub use error::CalibrationError;
pub use manager::CalibrationManager;
pub use params::CalibrationParams;
pub use record::CalibrationRecord;

pub use projmap_core::{
    CalibrationKind, CorrespondencePoint, Degeneracy, Homography, KeystoneCorrector, PointId,
    PrewarpMapping, SolverParams, SurfaceFrame, Transform, TransformModel,
};

/// Route `log` records into `tracing` and install a subscriber filtered by
/// `RUST_LOG` (default `info`).
///
/// Solver spans are reported when they close, with their timing. Repeated
/// calls leave the first subscriber in place.
#[cfg(feature = "tracing")]
pub fn init_tracing(json: bool) {
    use tracing_subscriber::fmt::format::FmtSpan;
    use tracing_subscriber::EnvFilter;

    let _ = tracing_log::LogTracer::init();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE);
    let _ = if json {
        builder.json().flatten_event(true).try_init()
    } else {
        builder.try_init()
    };
}
