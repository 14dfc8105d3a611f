use float_cmp::assert_approx_eq;
use glam::DVec3;
use mvmm_hydro::{
    boundary::bootstrap_ghosts,
    config::{InitialConditionsCfg, Placement},
    faces::faces_for_flux,
    flux::compute_fluxes,
    gas_law::GasLaw,
    ics_from_preset,
    riemann_solver::{HLLCRiemannSolver, HLLRiemannSolver, RiemannFluxSolver},
    tessellate, Boundary, Domain, HydroDimension,
};

fn check_initial_fluxes<R: RiemannFluxSolver>(solver: &R, placement: Placement) {
    let eos = GasLaw::ideal(1.4);
    let dim = HydroDimension::HydroDimension2D;
    let domain = Domain::new(DVec3::ZERO, DVec3::ONE, Boundary::Reflective, dim);
    let ics = ics_from_preset(
        &InitialConditionsCfg {
            kind: "sodshock".to_string(),
            num_part: 10,
            placement,
            seed: 0,
            relax_iterations: 0,
        },
        &domain,
        &eos,
    )
    .unwrap();

    let (positions, index) = bootstrap_ghosts(ics.positions(), &domain, dim).unwrap();
    let mut primitives = ics.primitives().to_vec();
    for ghost in index.ghosts() {
        primitives.push(ghost.image.primitives(&primitives[ghost.origin]));
    }
    let velocities = vec![DVec3::ZERO; positions.len()];
    let tessellation = tessellate(&positions, dim).unwrap();
    let faces = faces_for_flux(&positions, &primitives, &velocities, &index, &tessellation).unwrap();
    let fluxes = compute_fluxes(&faces, solver, &eos).unwrap();

    let mut num_interface = 0;
    for (face, flux) in faces.iter().zip(fluxes.iter()) {
        let left_high = positions[face.left].x < 0.5;
        let right_high = positions[face.right].x < 0.5;
        if left_high == right_high {
            // Gas at rest in a uniform region: only the pressure acts on the face
            assert_approx_eq!(f64, flux.mass(), 0., epsilon = 1e-14);
            assert_approx_eq!(f64, flux.energy(), 0., epsilon = 1e-14);
            let pressure = if left_high { 1. } else { 0.1 };
            assert_approx_eq!(
                f64,
                flux.momentum().dot(face.normal),
                pressure,
                epsilon = 1e-12
            );
        } else if face.area > 1e-12 {
            // Mass flows from the dense towards the dilute side
            num_interface += 1;
            let direction = if left_high { 1. } else { -1. };
            assert!(direction * flux.mass() > 0.);
            assert!(flux.energy().abs() > 0.);
        }
    }
    assert!(num_interface > 0);
}

#[test]
fn test_shock_tube_lattice() {
    check_initial_fluxes(&HLLCRiemannSolver, Placement::Lattice { perturbations: None });
    check_initial_fluxes(&HLLRiemannSolver, Placement::Lattice { perturbations: None });
}

#[test]
fn test_shock_tube_random() {
    check_initial_fluxes(&HLLCRiemannSolver, Placement::Random);
}
