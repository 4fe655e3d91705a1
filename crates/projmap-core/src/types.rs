use nalgebra::{Point2, Point3};
use serde::{Deserialize, Serialize};

/// Opaque identifier of a correspondence within one calibration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PointId(pub u32);

impl PointId {
    /// Get the raw ID value.
    pub fn raw(&self) -> u32 {
        self.0
    }

    /// The identifier following this one.
    pub fn next(&self) -> PointId {
        PointId(self.0.saturating_add(1))
    }
}

impl std::fmt::Display for PointId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PointId({})", self.0)
    }
}

/// One matched pair: a point on the physical surface and the screen-space
/// point that lands on it.
///
/// `surface` is a world-space point in real-world units. In planar mode the
/// surface point lies in `z = 0`; otherwise the homography solver fits the
/// plane the surface points share. `screen` is either normalized `[0, 1]²` or
/// pixel coordinates, as long as one calibration uses one convention.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CorrespondencePoint {
    id: PointId,
    surface: Point3<f64>,
    screen: Point2<f64>,
}

impl CorrespondencePoint {
    /// Pair a measured surface point with the screen point that lands on it.
    pub fn new(id: PointId, surface: Point3<f64>, screen: Point2<f64>) -> Self {
        Self {
            id,
            surface,
            screen,
        }
    }

    /// Planar-mode correspondence: the surface point is lifted to `z = 0`.
    pub fn planar(id: PointId, surface: Point2<f64>, screen: Point2<f64>) -> Self {
        Self::new(id, Point3::new(surface.x, surface.y, 0.0), screen)
    }

    /// Identifier assigned when the point was added.
    #[inline]
    pub fn id(&self) -> PointId {
        self.id
    }

    /// Surface point in world coordinates.
    #[inline]
    pub fn surface(&self) -> Point3<f64> {
        self.surface
    }

    /// Screen point, in whatever units the calibration uses.
    #[inline]
    pub fn screen(&self) -> Point2<f64> {
        self.screen
    }

    /// Screen point lifted into the `z = 0` reference plane.
    #[inline]
    pub fn screen_3d(&self) -> Point3<f64> {
        Point3::new(self.screen.x, self.screen.y, 0.0)
    }
}

/// Which solver a calibration uses. Fixed when the calibration begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationKind {
    /// Closed-form similarity transform from exactly three points.
    ThreePoint,
    /// Projective homography from four or more points (least squares).
    FourPointHomography,
}

impl CalibrationKind {
    /// Minimum number of correspondences needed before solving.
    pub fn min_points(&self) -> usize {
        match self {
            CalibrationKind::ThreePoint => 3,
            CalibrationKind::FourPointHomography => 4,
        }
    }

    /// Maximum number of correspondences accepted, if bounded.
    pub fn max_points(&self) -> Option<usize> {
        match self {
            CalibrationKind::ThreePoint => Some(3),
            CalibrationKind::FourPointHomography => None,
        }
    }
}

impl std::fmt::Display for CalibrationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CalibrationKind::ThreePoint => write!(f, "three-point"),
            CalibrationKind::FourPointHomography => write!(f, "four-point homography"),
        }
    }
}

/// Root-mean-square of a sequence of distances. Zero for an empty sequence.
pub(crate) fn rms(distances: impl IntoIterator<Item = f64>) -> f64 {
    let mut sum = 0.0;
    let mut n = 0usize;
    for d in distances {
        sum += d * d;
        n += 1;
    }
    if n == 0 {
        return 0.0;
    }
    (sum / n as f64).sqrt()
}
