use glam::DVec3;
use rayon::prelude::*;

use crate::{
    boundary::BoundaryCondition,
    gas_law::GasLaw,
    particle::ParticleIndex,
    physical_quantities::{Primitive, State},
    utils::HydroDimension,
    voronoi::CellInfo,
};

/// How the generators move with respect to the fluid.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ParticleMotion {
    /// Eulerian: the mesh does not move.
    Fixed,
    /// Lagrangian: the generators move with the fluid velocity.
    Fluid,
    /// Fluid velocity plus a correction steering the generators towards the centroids of their
    /// cells once the offset exceeds a fraction `eta` of the cell radius.
    Steer { eta: f64, chi: f64 },
}

pub const DEFAULT_ETA: f64 = 0.25;
pub const DEFAULT_CHI: f64 = 1.;

impl Default for ParticleMotion {
    fn default() -> Self {
        ParticleMotion::Steer {
            eta: DEFAULT_ETA,
            chi: DEFAULT_CHI,
        }
    }
}

/// Mesh velocity of a single real cell.
fn mesh_velocity(
    position: DVec3,
    primitives: &State<Primitive>,
    cell: &CellInfo,
    eos: &GasLaw,
    motion: ParticleMotion,
    dimensionality: HydroDimension,
) -> DVec3 {
    match motion {
        ParticleMotion::Fixed => DVec3::ZERO,
        ParticleMotion::Fluid => primitives.velocity(),
        ParticleMotion::Steer { eta, chi } => {
            let v = primitives.velocity();
            if eta <= 0. {
                return v;
            }
            let offset = dimensionality.project(cell.centroid - position);
            let d = offset.length();
            let radius = dimensionality.effective_radius(cell.volume);
            let lower = 0.9 * eta * radius;
            let upper = 1.1 * eta * radius;
            if d <= lower {
                return v;
            }
            let c = primitives.sound_speed(eos);
            let strength = if d > upper {
                chi * c
            } else {
                chi * c * (d - lower) / (upper - lower)
            };
            v + strength * offset / d
        }
    }
}

/// Assign the mesh velocity of every particle. Ghosts inherit the (imaged) velocity of the real
/// particle they originate from.
pub fn assign_velocities(
    positions: &[DVec3],
    primitives: &[State<Primitive>],
    particle_index: &ParticleIndex,
    cells: &[CellInfo],
    eos: &GasLaw,
    motion: ParticleMotion,
    dimensionality: HydroDimension,
) -> Vec<DVec3> {
    let mut velocities: Vec<DVec3> = particle_index
        .real()
        .into_par_iter()
        .map(|i| {
            mesh_velocity(
                positions[i],
                &primitives[i],
                &cells[i],
                eos,
                motion,
                dimensionality,
            )
        })
        .collect();
    let ghost_velocities: Vec<DVec3> = particle_index
        .ghosts()
        .iter()
        .map(|ghost| ghost.image.vector(velocities[ghost.origin]))
        .collect();
    velocities.extend(ghost_velocities);
    velocities
}

/// Drift the real particles over `dt` and bring them back into the domain.
pub fn advance_positions<B: BoundaryCondition + ?Sized>(
    positions: &mut [DVec3],
    velocities: &[DVec3],
    particle_index: &ParticleIndex,
    dt: f64,
    boundary: &B,
) {
    positions[particle_index.real()]
        .par_iter_mut()
        .zip(velocities.par_iter())
        .for_each(|(x, w)| {
            *x += dt * *w;
            boundary.restore(x);
        });
}

#[cfg(test)]
mod test {
    use float_cmp::assert_approx_eq;
    use glam::DVec3;

    use super::*;
    use crate::{
        boundary::{Boundary, Domain, GhostImage},
        particle::GhostEntry,
    };

    fn setup() -> (Vec<DVec3>, Vec<State<Primitive>>, Vec<CellInfo>, GasLaw) {
        let positions = vec![DVec3::new(0.5, 0.5, 0.), DVec3::new(0.2, 0.2, 0.)];
        let primitives = vec![
            State::<Primitive>::new(1., DVec3::new(1., 0., 0.), 1.),
            State::<Primitive>::new(1.4, DVec3::new(0., -1., 0.), 1.),
        ];
        let cells = vec![
            CellInfo {
                volume: std::f64::consts::PI,
                centroid: DVec3::new(0.5, 0.5, 0.),
            },
            CellInfo {
                volume: std::f64::consts::PI,
                centroid: DVec3::new(0.7, 0.2, 0.),
            },
        ];
        (positions, primitives, cells, GasLaw::ideal(1.4))
    }

    #[test]
    fn test_motion_modes() {
        let (positions, primitives, cells, eos) = setup();
        let index = ParticleIndex::real_only(2);
        let dim = HydroDimension::HydroDimension2D;

        let fixed =
            assign_velocities(&positions, &primitives, &index, &cells, &eos, ParticleMotion::Fixed, dim);
        assert!(fixed.iter().all(|w| *w == DVec3::ZERO));

        let fluid =
            assign_velocities(&positions, &primitives, &index, &cells, &eos, ParticleMotion::Fluid, dim);
        assert_eq!(fluid[1], DVec3::new(0., -1., 0.));

        // eta = 0: pure Lagrangian
        let lagrangian = assign_velocities(
            &positions,
            &primitives,
            &index,
            &cells,
            &eos,
            ParticleMotion::Steer { eta: 0., chi: 1. },
            dim,
        );
        assert_eq!(lagrangian, fluid);
    }

    #[test]
    fn test_steering() {
        let (positions, primitives, cells, eos) = setup();
        let index = ParticleIndex::real_only(2);
        let dim = HydroDimension::HydroDimension2D;
        // Cell radius is 1, offset of the second cell is 0.5, sound speed 1
        let full = assign_velocities(
            &positions,
            &primitives,
            &index,
            &cells,
            &eos,
            ParticleMotion::Steer { eta: 0.25, chi: 1. },
            dim,
        );
        assert_eq!(full[0], DVec3::new(1., 0., 0.));
        assert_approx_eq!(f64, full[1].x, 1., epsilon = 1e-12);
        assert_approx_eq!(f64, full[1].y, -1.);

        let none = assign_velocities(
            &positions,
            &primitives,
            &index,
            &cells,
            &eos,
            ParticleMotion::Steer { eta: 0.6, chi: 1. },
            dim,
        );
        assert_approx_eq!(f64, none[1].x, 0.);

        // Halfway the ramp between 0.9 and 1.1 eta R
        let ramp = assign_velocities(
            &positions,
            &primitives,
            &index,
            &cells,
            &eos,
            ParticleMotion::Steer { eta: 0.5, chi: 1. },
            dim,
        );
        assert_approx_eq!(f64, ramp[1].x, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_ghost_velocities_and_advection() {
        let (mut positions, primitives, cells, eos) = setup();
        let domain = Domain::new(
            DVec3::ZERO,
            DVec3::ONE,
            Boundary::Periodic,
            HydroDimension::HydroDimension2D,
        );
        let mirror = GhostImage::identity();
        let index = ParticleIndex::new(
            2,
            vec![GhostEntry {
                origin: 0,
                image: mirror,
            }],
        );
        positions.push(DVec3::new(1.5, 0.5, 0.));
        let velocities = assign_velocities(
            &positions,
            &primitives,
            &index,
            &cells,
            &eos,
            ParticleMotion::Fluid,
            HydroDimension::HydroDimension2D,
        );
        assert_eq!(velocities.len(), 3);
        assert_eq!(velocities[2], velocities[0]);

        advance_positions(&mut positions, &velocities, &index, 0.6, &domain);
        assert_approx_eq!(f64, positions[0].x, 0.1, epsilon = 1e-12);
        assert_approx_eq!(f64, positions[1].y, 0.6, epsilon = 1e-12);
        // Ghosts are never moved
        assert_eq!(positions[2], DVec3::new(1.5, 0.5, 0.));
    }
}
