use glam::DVec3;

use crate::{
    errors::{ConfigError, PhysicsError},
    gas_law::GasLaw,
    physical_quantities::{Conserved, Primitive, State},
};

mod hll;
mod hllc;

pub use hll::HLLRiemannSolver;
pub use hllc::HLLCRiemannSolver;

/// Solves the Riemann problem across a face for the flux (per unit area and time).
///
/// `left` and `right` are expected in the rest frame of the interface, the returned flux is
/// deboosted to the lab frame using `interface_velocity`.
///
/// Vacuum generation is reported with placeholder face indices, the flux pipeline fills in the
/// actual cells.
pub trait RiemannFluxSolver: Send + Sync {
    fn solve_for_flux(
        &self,
        left: &State<Primitive>,
        right: &State<Primitive>,
        interface_velocity: DVec3,
        n_unit: DVec3,
        eos: &GasLaw,
    ) -> Result<State<Conserved>, PhysicsError>;
}

pub fn riemann_solver_from_config(kind: &str) -> Result<Box<dyn RiemannFluxSolver>, ConfigError> {
    match kind {
        "HLLC" | "hllc" => Ok(Box::new(HLLCRiemannSolver)),
        "HLL" | "hll" => Ok(Box::new(HLLRiemannSolver)),
        _ => Err(ConfigError::UnknownRiemannSolver(kind.to_string())),
    }
}

/// Input states of a Riemann problem together with the quantities every solver needs.
struct RiemannInput {
    rho_l_inv: f64,
    rho_r_inv: f64,
    v_l: f64,
    v_r: f64,
    a_l: f64,
    a_r: f64,
}

impl RiemannInput {
    fn new(
        left: &State<Primitive>,
        right: &State<Primitive>,
        n_unit: DVec3,
        eos: &GasLaw,
    ) -> Result<Self, PhysicsError> {
        for state in [left, right] {
            if !(state.density() > 0. && state.pressure() > 0.) || !state.is_finite() {
                return Err(PhysicsError::InvalidRiemannState {
                    density: state.density(),
                    pressure: state.pressure(),
                });
            }
        }
        let rho_l_inv = 1. / left.density();
        let rho_r_inv = 1. / right.density();
        let input = Self {
            rho_l_inv,
            rho_r_inv,
            v_l: left.velocity().dot(n_unit),
            v_r: right.velocity().dot(n_unit),
            a_l: eos.sound_speed(left.pressure(), rho_l_inv),
            a_r: eos.sound_speed(right.pressure(), rho_r_inv),
        };
        // Toro (2009), eq. 4.40: pressure positivity condition
        if eos.gamma().tdgm1() * (input.a_l + input.a_r) <= input.v_r - input.v_l {
            return Err(PhysicsError::VacuumGeneration { left: 0, right: 0 });
        }
        Ok(input)
    }
}

/// Specific total energy of a state.
fn specific_energy(primitives: &State<Primitive>, density_inv: f64, eos: &GasLaw) -> f64 {
    eos.gas_internal_energy_from_pressure(primitives.pressure(), density_inv)
        + 0.5 * primitives.velocity().length_squared()
}

/// Conserved densities (mass, momentum and energy per unit volume) of a state.
fn conserved_density(primitives: &State<Primitive>, density_inv: f64, eos: &GasLaw) -> State<Conserved> {
    State::<Conserved>::new(
        primitives.density(),
        primitives.density() * primitives.velocity(),
        primitives.density() * specific_energy(primitives, density_inv, eos),
    )
}

/// Euler flux of a state through a face with normal `n_unit`, `v_n` being the normal velocity.
fn euler_flux(
    primitives: &State<Primitive>,
    density_inv: f64,
    v_n: f64,
    n_unit: DVec3,
    eos: &GasLaw,
) -> State<Conserved> {
    let rho_v_n = primitives.density() * v_n;
    let rho_e = primitives.density() * specific_energy(primitives, density_inv, eos);
    State::<Conserved>::new(
        rho_v_n,
        rho_v_n * primitives.velocity() + primitives.pressure() * n_unit,
        (rho_e + primitives.pressure()) * v_n,
    )
}

/// Deboost a flux from the interface frame to the lab frame
fn deboost(flux: State<Conserved>, interface_velocity: DVec3) -> State<Conserved> {
    flux + State::<Conserved>::new(
        0.,
        interface_velocity * flux.mass(),
        interface_velocity.dot(flux.momentum())
            + 0.5 * interface_velocity.length_squared() * flux.mass(),
    )
}
