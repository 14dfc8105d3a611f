use rayon::prelude::*;

use crate::{
    errors::PhysicsError,
    faces::FaceInfo,
    gas_law::GasLaw,
    particle::ParticleIndex,
    physical_quantities::{Conserved, State},
    riemann_solver::RiemannFluxSolver,
};

/// Flux per unit area and time across every face, solved in the frame moving with the face.
pub fn compute_fluxes<R: RiemannFluxSolver + ?Sized>(
    faces: &[FaceInfo],
    riemann_solver: &R,
    eos: &GasLaw,
) -> Result<Vec<State<Conserved>>, PhysicsError> {
    faces
        .par_iter()
        .map(|face| {
            let v_face = face.velocity;
            let flux = riemann_solver
                .solve_for_flux(
                    &face.primitives_left.boost(-v_face),
                    &face.primitives_right.boost(-v_face),
                    v_face,
                    face.normal,
                    eos,
                )
                .map_err(|err| match err {
                    PhysicsError::VacuumGeneration { .. } => PhysicsError::VacuumGeneration {
                        left: face.left,
                        right: face.right,
                    },
                    err => err,
                })?;
            if !flux.is_finite() {
                return Err(PhysicsError::NonFiniteFlux {
                    left: face.left,
                    right: face.right,
                });
            }
            Ok(flux)
        })
        .collect()
}

/// Apply the fluxes to the conserved state of the real cells.
///
/// The flux across a face leaves `left` and enters `right`. Ghosts have no conserved state: what
/// flows into them leaves the domain.
pub fn update(
    conserved: &mut [State<Conserved>],
    fluxes: &[State<Conserved>],
    faces: &[FaceInfo],
    dt: f64,
    particle_index: &ParticleIndex,
) {
    debug_assert_eq!(fluxes.len(), faces.len());
    for (face, flux) in faces.iter().zip(fluxes.iter()) {
        let exchanged = (dt * face.area) * *flux;
        conserved[face.left] -= exchanged;
        if particle_index.is_real(face.right) {
            conserved[face.right] += exchanged;
        }
    }
}
