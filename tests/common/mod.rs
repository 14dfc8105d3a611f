#![allow(dead_code)]

use glam::DVec3;
use mvmm_hydro::{
    physical_quantities::{Primitive, State},
    HydroDimension, InitialConditions, MovingMesh, MovingMeshConfig,
};

pub const PERIODIC_CONFIG: &str = r##"
hydrodynamics:
  gamma: 1.4
  cfl_criterion: 0.4
  riemann_solver: "HLLC"
  reconstruction: "linear"

time_integration:
  max_time: 1.
  max_steps: 10

snapshots:
  output_cycle: 5
  prefix: "periodic"

mesh:
  particle_motion: "steer"

space:
  boundary: "periodic"
  box_size: [1., 1., 1.]
  dimensionality: 2
"##;

pub const SEDOV_CONFIG: &str = r##"
hydrodynamics:
  gamma: 1.4
  cfl_criterion: 0.5
  riemann_solver: "HLL"
  reconstruction: "constant"

time_integration:
  max_time: 0.1
  max_steps: 3

snapshots:
  prefix: "sedov_2d_cartesian"

mesh:
  regularization: true

space:
  boundary: "reflective"
  box_size: [1., 1., 1.]
  dimensionality: 2

initial_conditions:
  kind: "sedov"
  num_part: 51
"##;

pub fn get_config(yaml: &str) -> MovingMeshConfig {
    MovingMeshConfig::from_yaml_str(yaml).expect("Error loading config!")
}

pub fn get_engine(config: MovingMeshConfig, ics: InitialConditions) -> MovingMesh {
    let mut engine = MovingMesh::serial(config).expect("Error constructing engine!");
    engine
        .set_initial_state(ics)
        .expect("Error setting initial state!");
    engine
}

/// Uniform gas at rest with a pressure bump in the centre of the unit square.
pub fn blast_2d(num_part: usize, perturbations: Option<f64>, velocity: DVec3) -> InitialConditions {
    InitialConditions::from_fn(
        DVec3::ONE,
        num_part,
        HydroDimension::HydroDimension2D,
        perturbations,
        |x| {
            let r2 = (x - DVec3::new(0.5, 0.5, 0.)).length_squared();
            let pressure = if r2 < 0.04 { 10. } else { 1. };
            State::<Primitive>::new(1., velocity, pressure)
        },
    )
}
