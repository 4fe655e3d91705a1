//! Calibrate an off-axis projector against four measured wall points and
//! print the pre-warp that squares up a 1.2 m × 0.8 m target.
//!
//! Run with `cargo run -p projmap --example keystone`; `RUST_LOG` overrides
//! the default `debug` filter.

use nalgebra::Point2;
use projmap::{
    CalibrationError, CalibrationKind, CalibrationManager, KeystoneCorrector, SolverParams,
};

fn main() -> Result<(), CalibrationError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();

    // Normalized screen corners and where they were measured on the wall (m).
    let measured = [
        (Point2::new(0.0, 0.0), Point2::new(0.12, 0.05)),
        (Point2::new(1.0, 0.0), Point2::new(1.58, 0.18)),
        (Point2::new(1.0, 1.0), Point2::new(1.49, 1.21)),
        (Point2::new(0.0, 1.0), Point2::new(0.08, 0.97)),
    ];

    let mut manager = CalibrationManager::new(CalibrationKind::FourPointHomography);
    for (screen, wall) in measured {
        manager.add_planar_point(wall, screen)?;
    }
    let transform = manager.solve()?;
    println!("residual: {:.3e} m", transform.residual_error);

    let frustum = measured.map(|(screen, _)| screen);
    let corrector =
        KeystoneCorrector::for_rect(Point2::new(0.2, 0.2), 1.2, 0.8, SolverParams::default());
    let prewarp = manager.prewarp(&corrector, frustum)?;

    println!("prewarp matrix: {:?}", prewarp.matrix.to_array());
    for (corner, warped) in frustum.iter().zip(prewarp.warp_corners(&frustum)) {
        let landed = manager.query(warped)?;
        println!(
            "screen ({:.2}, {:.2}) -> render at ({:.4}, {:.4}) -> wall ({:.4}, {:.4})",
            corner.x, corner.y, warped.x, warped.y, landed.x, landed.y
        );
    }

    if let Some(record) = manager.export() {
        println!("{}", record.to_json()?);
    }
    Ok(())
}
