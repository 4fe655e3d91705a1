use approx::assert_relative_eq;
use nalgebra::{Matrix3, Point2, Point3, Rotation3, Unit, Vector3};
use projmap::core::{PointSpace, SimilarityTransform};
use projmap::{
    CalibrationError, CalibrationKind, CalibrationManager, CalibrationState, Degeneracy,
    Homography,
};

fn oblique_wall() -> Homography {
    Homography::new(Matrix3::new(
        2.4, 0.3, 0.5, //
        -0.2, 1.8, 0.25, //
        0.15, -0.1, 1.0,
    ))
}

fn tilted_panel() -> SimilarityTransform {
    let axis = Unit::new_normalize(Vector3::new(0.2, 1.0, -0.5));
    let r = Rotation3::from_axis_angle(&axis, 0.9);
    SimilarityTransform::new(*r.matrix(), 1.75, Vector3::new(-3.0, 2.0, 4.5))
}

fn grid(nx: usize, ny: usize) -> Vec<Point2<f64>> {
    let mut out = Vec::with_capacity(nx * ny);
    for j in 0..ny {
        for i in 0..nx {
            out.push(Point2::new(
                i as f64 / (nx - 1) as f64,
                j as f64 / (ny - 1) as f64,
            ));
        }
    }
    out
}

/// Sunflower spiral in the unit square: no three points near a common line.
fn scattered(n: usize) -> Vec<Point2<f64>> {
    (0..n)
        .map(|i| {
            let angle = i as f64 * 2.399963;
            let r = 0.45 * ((i as f64 + 0.5) / n as f64).sqrt();
            Point2::new(0.5 + r * angle.cos(), 0.5 + r * angle.sin())
        })
        .collect()
}

/// Fixed, sign-varying offsets of magnitude `sigma`.
fn deterministic_noise(i: usize, sigma: f64) -> Vector3<f64> {
    let k = i as f64;
    Vector3::new((1.7 * k + 0.3).sin(), (2.3 * k + 1.1).cos(), 0.0) * sigma
}

fn homography_manager(h: &Homography, screen: &[Point2<f64>], sigma: f64) -> CalibrationManager {
    let mut m = CalibrationManager::new(CalibrationKind::FourPointHomography);
    for (i, &s) in screen.iter().enumerate() {
        let q = h.apply(s);
        let surface = Point3::new(q.x, q.y, 0.0) + deterministic_noise(i, sigma);
        m.add_point(surface, s).expect("add point");
    }
    m
}

#[test]
fn three_points_are_recovered_exactly() {
    let truth = tilted_panel();
    let screen = [
        Point2::new(0.1, 0.2),
        Point2::new(0.9, 0.25),
        Point2::new(0.4, 0.85),
    ];

    let mut m = CalibrationManager::new(CalibrationKind::ThreePoint);
    for s in screen {
        m.add_point(truth.apply(s), s).expect("add point");
    }
    let residual = m.solve().expect("solve").residual_error;
    assert!(residual < 1e-9, "residual {residual}");
    assert_eq!(m.state(), CalibrationState::Solved);

    for s in screen {
        let q = m.query(s).expect("query");
        assert_relative_eq!(q, truth.apply(s), epsilon = 1e-9);
    }
    // A rigid fit is exact away from the calibration points as well.
    let off = Point2::new(0.55, 0.5);
    assert_relative_eq!(m.query(off).expect("query"), truth.apply(off), epsilon = 1e-9);
}

#[test]
fn four_points_are_recovered_exactly() {
    let h = oblique_wall();
    let screen = grid(2, 2);
    let mut m = homography_manager(&h, &screen, 0.0);

    let residual = m.solve().expect("solve").residual_error;
    assert!(residual < 1e-9, "residual {residual}");
    for s in &screen {
        let q = m.query(*s).expect("query");
        let expected = h.apply(*s);
        assert_relative_eq!(q, Point3::new(expected.x, expected.y, 0.0), epsilon = 1e-9);
    }
    let fitted = m.current_transform().expect("transform").planar_homography();
    assert!(fitted.approx_eq(&h, 1e-9));
}

#[test]
fn overdetermined_fit_degrades_gracefully_with_noise() {
    let h = oblique_wall();
    let screen = scattered(12);

    let mut residuals = Vec::new();
    for sigma in [0.0, 0.5e-3, 1e-3, 2e-3] {
        let mut m = homography_manager(&h, &screen, sigma);
        let t = *m.solve().expect("solve");
        residuals.push(t.residual_error);

        // Mapping stays close to the noise-free one.
        let center = Point2::new(0.5, 0.5);
        let expected = h.apply(center);
        let got = t.map_point(center);
        assert!(
            (got.xy() - expected).norm() <= 10.0 * sigma + 1e-9,
            "sigma {sigma}: center off by {}",
            (got.xy() - expected).norm()
        );
    }

    assert!(residuals[0] < 1e-9);
    for w in residuals.windows(2) {
        assert!(w[0] < w[1], "residuals not increasing: {residuals:?}");
    }
}

#[test]
fn homography_on_a_vertical_wall() {
    // Wall in the x-z plane at y = 3; screen maps to (x, z) through `h`.
    let h = oblique_wall();
    let screen = grid(2, 2)
        .into_iter()
        .chain([Point2::new(0.35, 0.6)])
        .collect::<Vec<_>>();
    let mut m = CalibrationManager::new(CalibrationKind::FourPointHomography);
    for s in &screen {
        let q = h.apply(*s);
        m.add_point(Point3::new(q.x, 3.0, q.y), *s).expect("add point");
    }

    let t = *m.solve().expect("solve");
    assert!(t.residual_error < 1e-9, "residual {}", t.residual_error);
    assert_relative_eq!(t.surface_frame().normal(), Vector3::y(), epsilon = 1e-12);

    let inside = Point2::new(0.7, 0.2);
    let q = h.apply(inside);
    assert_relative_eq!(
        m.query(inside).expect("query"),
        Point3::new(q.x, 3.0, q.y),
        epsilon = 1e-9
    );
}

#[test]
fn surface_points_off_a_common_plane_are_rejected() {
    let h = oblique_wall();
    let mut m = CalibrationManager::new(CalibrationKind::FourPointHomography);
    for (i, s) in grid(2, 2)
        .into_iter()
        .chain([Point2::new(0.35, 0.6)])
        .enumerate()
    {
        let q = h.apply(s);
        let bump = if i == 4 { 0.5 } else { 0.0 };
        m.add_point(Point3::new(q.x, 3.0 + bump, q.y), s)
            .expect("add point");
    }
    assert!(matches!(
        m.solve(),
        Err(CalibrationError::DegenerateConfiguration(
            Degeneracy::NonPlanar { .. }
        ))
    ));
}

#[test]
fn collinear_screen_points_are_rejected() {
    let h = oblique_wall();
    let screen = [
        Point2::new(0.0, 0.0),
        Point2::new(0.5, 0.5),
        Point2::new(1.0, 1.0),
        Point2::new(1.0, 0.0),
    ];
    let mut m = homography_manager(&h, &screen, 0.0);
    let err = m.solve().unwrap_err();
    assert!(matches!(
        err,
        CalibrationError::DegenerateConfiguration(Degeneracy::Collinear {
            space: PointSpace::Screen,
            ..
        })
    ));
    assert_eq!(m.state(), CalibrationState::Invalid);
    assert!(m.current_transform().is_none());
}

#[test]
fn collinear_surface_points_are_rejected() {
    let mut m = CalibrationManager::new(CalibrationKind::FourPointHomography);
    let pairs = [
        ((0.0, 0.0), (0.0, 0.0)),
        ((1.0, 0.0), (1.0, 1.0)),
        ((1.0, 1.0), (2.0, 2.0)),
        ((0.0, 1.0), (0.0, 3.0)),
    ];
    for (s, q) in pairs {
        m.add_planar_point(Point2::new(q.0, q.1), Point2::new(s.0, s.1))
            .expect("add point");
    }
    let err = m.solve().unwrap_err();
    assert!(matches!(
        err,
        CalibrationError::DegenerateConfiguration(Degeneracy::Collinear {
            space: PointSpace::Surface,
            indices: [0, 1, 2],
        })
    ));
}

#[test]
fn nearly_collinear_triangle_is_rejected() {
    let mut m = CalibrationManager::new(CalibrationKind::ThreePoint);
    m.add_point(Point3::new(0.0, 0.0, 0.0), Point2::new(0.0, 0.0))
        .expect("add point");
    m.add_point(Point3::new(1.0, 0.0, 0.0), Point2::new(1.0, 0.0))
        .expect("add point");
    m.add_point(Point3::new(2.0, 1e-9, 0.0), Point2::new(0.0, 1.0))
        .expect("add point");
    let err = m.solve().unwrap_err();
    assert!(matches!(
        err,
        CalibrationError::DegenerateConfiguration(Degeneracy::Collinear {
            space: PointSpace::Surface,
            ..
        })
    ));
}

#[test]
fn solve_below_minimum_keeps_collecting() {
    let mut m = CalibrationManager::new(CalibrationKind::FourPointHomography);
    assert!(matches!(
        m.solve(),
        Err(CalibrationError::InsufficientPoints { got: 0, .. })
    ));
    assert_eq!(m.state(), CalibrationState::Empty);

    for s in grid(2, 2).into_iter().take(3) {
        m.add_planar_point(s * 3.0, s).expect("add point");
    }
    let err = m.solve().unwrap_err();
    assert!(matches!(
        err,
        CalibrationError::InsufficientPoints {
            kind: CalibrationKind::FourPointHomography,
            needed: 4,
            got: 3,
        }
    ));
    assert_eq!(m.state(), CalibrationState::Collecting);
    assert!(matches!(
        m.query(Point2::new(0.2, 0.2)),
        Err(CalibrationError::NotCalibrated)
    ));
}

#[test]
fn three_point_calibration_takes_no_fourth_point() {
    let truth = tilted_panel();
    let mut m = CalibrationManager::new(CalibrationKind::ThreePoint);
    for s in [
        Point2::new(0.0, 0.0),
        Point2::new(1.0, 0.0),
        Point2::new(0.0, 1.0),
    ] {
        m.add_point(truth.apply(s), s).expect("add point");
    }
    let s = Point2::new(1.0, 1.0);
    let err = m.add_point(truth.apply(s), s).unwrap_err();
    assert!(matches!(
        err,
        CalibrationError::TooManyPoints {
            kind: CalibrationKind::ThreePoint,
            max: 3,
        }
    ));
    assert_eq!(m.points().len(), 3);
}

#[test]
fn duplicate_coordinates_are_rejected() {
    let mut m = CalibrationManager::new(CalibrationKind::FourPointHomography);
    let first = m
        .add_planar_point(Point2::new(1.0, 1.0), Point2::new(0.2, 0.2))
        .expect("add point");

    let same_screen = m.add_planar_point(Point2::new(5.0, 5.0), Point2::new(0.2, 0.2));
    assert!(matches!(
        same_screen,
        Err(CalibrationError::DuplicatePoint { existing }) if existing == first
    ));
    let same_surface = m.add_planar_point(Point2::new(1.0, 1.0), Point2::new(0.7, 0.7));
    assert!(matches!(
        same_surface,
        Err(CalibrationError::DuplicatePoint { existing }) if existing == first
    ));
    assert_eq!(m.points().len(), 1);
}

#[test]
fn failed_resolve_keeps_last_known_good() {
    let h = oblique_wall();
    let mut m = homography_manager(&h, &grid(2, 2), 0.0);
    let good = *m.solve().expect("solve");

    let sample = Point2::new(0.3, 0.6);
    let before = m.query(sample).expect("query");

    // On the line through screen (0,0) and (1,1): the set is now degenerate.
    let s = Point2::new(0.5, 0.5);
    let q = h.apply(s);
    m.add_planar_point(q, s).expect("add point");
    assert_eq!(m.state(), CalibrationState::Collecting);

    let err = m.solve().unwrap_err();
    assert!(matches!(err, CalibrationError::DegenerateConfiguration(_)));
    assert_eq!(m.state(), CalibrationState::Solved);
    assert_eq!(m.current_transform(), Some(&good));
    assert_eq!(m.query(sample).expect("query"), before);

    let solution = m.calibration().solution().expect("solution");
    assert_eq!(solution.points.len(), 4);
    assert_eq!(m.points().len(), 5);
}

#[test]
fn reset_leaves_invalid() {
    let mut m = CalibrationManager::new(CalibrationKind::ThreePoint);
    for s in [
        Point2::new(0.0, 0.0),
        Point2::new(0.5, 0.0),
        Point2::new(1.0, 0.0),
    ] {
        m.add_planar_point(Point2::new(s.x * 2.0, s.y + 1.0), s)
            .expect("add point");
    }
    assert!(m.solve().is_err());
    assert_eq!(m.state(), CalibrationState::Invalid);

    m.reset();
    assert_eq!(m.state(), CalibrationState::Empty);
    let truth = tilted_panel();
    for s in [
        Point2::new(0.0, 0.0),
        Point2::new(1.0, 0.0),
        Point2::new(0.0, 1.0),
    ] {
        m.add_point(truth.apply(s), s).expect("add point");
    }
    m.solve().expect("solve after reset");
    assert_eq!(m.state(), CalibrationState::Solved);
}

#[test]
fn repeated_solves_are_bit_identical() {
    let h = oblique_wall();
    let screen = scattered(9);

    let mut a = homography_manager(&h, &screen, 1e-3);
    let first = *a.solve().expect("solve");
    let second = *a.solve().expect("solve");
    assert_eq!(first, second);

    let mut b = homography_manager(&h, &screen, 1e-3);
    assert_eq!(*b.solve().expect("solve"), first);

    let truth = tilted_panel();
    let mut c = CalibrationManager::new(CalibrationKind::ThreePoint);
    for s in [
        Point2::new(0.0, 0.0),
        Point2::new(1.0, 0.1),
        Point2::new(0.2, 1.0),
    ] {
        c.add_point(truth.apply(s), s).expect("add point");
    }
    let first = *c.solve().expect("solve");
    assert_eq!(*c.solve().expect("solve"), first);
}
