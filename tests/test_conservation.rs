use common::{blast_2d, get_config, get_engine, PERIODIC_CONFIG};
use float_cmp::assert_approx_eq;
use glam::DVec3;
use mvmm_hydro::{MemorySnapshotWriter, ParticleMotion};

mod common;

fn check_conservation(motion: ParticleMotion, reconstruction: &str, riemann_solver: &str) {
    let mut config = get_config(PERIODIC_CONFIG);
    config.mesh.particle_motion = motion;
    config
        .set_parameter("reconstruction", reconstruction)
        .unwrap();
    config
        .set_parameter("riemann_solver", riemann_solver)
        .unwrap();
    let mut engine = get_engine(config, blast_2d(10, Some(0.2), DVec3::new(0.3, -0.1, 0.)));
    let before = engine.total_conserved();

    let mut writer = MemorySnapshotWriter::new();
    engine.solve(&mut writer).unwrap();
    assert_eq!(engine.step_count(), 10);
    let after = engine.total_conserved();

    assert_approx_eq!(f64, after.mass(), before.mass(), epsilon = 1e-12);
    assert_approx_eq!(f64, after.momentum().x, before.momentum().x, epsilon = 1e-12);
    assert_approx_eq!(f64, after.momentum().y, before.momentum().y, epsilon = 1e-12);
    assert_approx_eq!(f64, after.energy(), before.energy(), epsilon = 1e-11);

    // The mesh moved, so the test is not trivially satisfied
    let snapshot = writer.snapshots.last().unwrap();
    let first = &writer.snapshots[0];
    let moved = snapshot
        .positions
        .iter()
        .zip(first.positions.iter())
        .any(|(a, b)| a.distance(*b) > 1e-6);
    assert_eq!(moved, motion != ParticleMotion::Fixed);
    let names: Vec<_> = writer.snapshots.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["periodic_0000", "periodic_0005", "periodic_0010"]);
}

#[test]
fn test_conservation_moving_mesh() {
    check_conservation(ParticleMotion::default(), "linear", "HLLC");
}

#[test]
fn test_conservation_lagrangian_hll() {
    check_conservation(ParticleMotion::Fluid, "constant", "HLL");
}

#[test]
fn test_conservation_static_mesh() {
    check_conservation(ParticleMotion::Fixed, "linear", "HLLC");
}
