use common::{get_config, get_engine};
use float_cmp::assert_approx_eq;
use glam::DVec3;
use mvmm_hydro::{
    physical_quantities::{Primitive, State},
    HydroDimension, InitialConditions, MemorySnapshotWriter, MovingMeshConfig,
};

mod common;

const CONFIG_3D: &str = r##"
hydrodynamics:
  gamma: 1.66666666667
  cfl_criterion: 0.3
  riemann_solver: "HLLC"
  reconstruction: "linear"

time_integration:
  max_time: 1.
  max_steps: 10

snapshots:
  output_cycle: 10
  prefix: "blast_3d"

mesh:
  particle_motion: "steer"

space:
  boundary: "periodic"
  box_size: [1., 1., 1.]
  dimensionality: 3
"##;

fn blast_3d(perturbations: Option<f64>, velocity: DVec3) -> InitialConditions {
    InitialConditions::from_fn(
        DVec3::ONE,
        4,
        HydroDimension::HydroDimension3D,
        perturbations,
        |x| {
            let pressure = if x.distance_squared(DVec3::splat(0.5)) < 0.1 { 10. } else { 1. };
            State::<Primitive>::new(1., velocity, pressure)
        },
    )
}

fn total_volume(config: MovingMeshConfig, ics: InitialConditions, steps: usize) -> f64 {
    let mut engine = get_engine(config, ics);
    for _ in 0..steps {
        engine.step().unwrap();
    }
    engine.refresh().unwrap();
    engine.cells().unwrap().iter().map(|cell| cell.volume).sum()
}

#[test]
fn test_conservation_periodic_3d() {
    let config = get_config(CONFIG_3D);
    let mut engine = get_engine(config, blast_3d(Some(0.1), DVec3::new(0.3, -0.1, 0.2)));
    assert_eq!(engine.positions().len(), 64);
    let before = engine.total_conserved();

    let mut writer = MemorySnapshotWriter::new();
    engine.solve(&mut writer).unwrap();
    assert_eq!(engine.step_count(), 10);
    let after = engine.total_conserved();

    assert_approx_eq!(f64, after.mass(), before.mass(), epsilon = 1e-12);
    assert_approx_eq!(f64, after.momentum().x, before.momentum().x, epsilon = 1e-12);
    assert_approx_eq!(f64, after.momentum().y, before.momentum().y, epsilon = 1e-12);
    assert_approx_eq!(f64, after.momentum().z, before.momentum().z, epsilon = 1e-12);
    assert_approx_eq!(f64, after.energy(), before.energy(), epsilon = 1e-12);

    // The periodic cells still tile the box after the mesh moved
    engine.refresh().unwrap();
    let volume: f64 = engine.cells().unwrap().iter().map(|cell| cell.volume).sum();
    assert_approx_eq!(f64, volume, 1., epsilon = 1e-10);
    let last = writer.snapshots.last().unwrap();
    assert!(last
        .positions
        .iter()
        .zip(writer.snapshots[0].positions.iter())
        .any(|(a, b)| a.distance(*b) > 1e-6));
}

#[test]
fn test_reflective_lattice_volumes_3d() {
    let reflective = || {
        let mut config = get_config(CONFIG_3D);
        config.set_parameter("boundary", "reflective").unwrap();
        config
    };

    let mut engine = get_engine(reflective(), blast_3d(None, DVec3::ZERO));
    engine.refresh().unwrap();
    let cells = engine.cells().unwrap();
    assert_eq!(cells.len(), 64);
    for (cell, x) in cells.iter().zip(engine.positions()) {
        // Corner, edge and face cells are closed by their mirror images
        assert_approx_eq!(f64, cell.volume, 1. / 64., epsilon = 1e-12);
        assert_approx_eq!(f64, cell.centroid.distance(*x), 0., epsilon = 1e-12);
    }

    let volume = total_volume(reflective(), blast_3d(None, DVec3::ZERO), 10);
    assert_approx_eq!(f64, volume, 1., epsilon = 1e-10);
}
