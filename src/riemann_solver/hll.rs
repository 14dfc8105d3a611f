use glam::DVec3;

use crate::{
    errors::PhysicsError,
    gas_law::GasLaw,
    physical_quantities::{Conserved, Primitive, State},
};

use super::*;

/// HLL Riemann solver with the wave speed estimates of Davis (1988).
pub struct HLLRiemannSolver;

impl RiemannFluxSolver for HLLRiemannSolver {
    /// See Section 10.3 in Toro (2009)
    fn solve_for_flux(
        &self,
        left: &State<Primitive>,
        right: &State<Primitive>,
        interface_velocity: DVec3,
        n_unit: DVec3,
        eos: &GasLaw,
    ) -> Result<State<Conserved>, PhysicsError> {
        let RiemannInput {
            rho_l_inv,
            rho_r_inv,
            v_l,
            v_r,
            a_l,
            a_r,
        } = RiemannInput::new(left, right, n_unit, eos)?;

        let s_l = (v_l - a_l).min(v_r - a_r);
        let s_r = (v_l + a_l).max(v_r + a_r);

        let flux = if s_l >= 0. {
            euler_flux(left, rho_l_inv, v_l, n_unit, eos)
        } else if s_r <= 0. {
            euler_flux(right, rho_r_inv, v_r, n_unit, eos)
        } else {
            let flux_l = euler_flux(left, rho_l_inv, v_l, n_unit, eos);
            let flux_r = euler_flux(right, rho_r_inv, v_r, n_unit, eos);
            let u_l = conserved_density(left, rho_l_inv, eos);
            let u_r = conserved_density(right, rho_r_inv, eos);
            (1. / (s_r - s_l)) * (s_r * flux_l - s_l * flux_r + s_l * s_r * (u_r - u_l))
        };
        debug_assert!(flux.is_finite());

        Ok(deboost(flux, interface_velocity))
    }
}

#[cfg(test)]
mod test {
    use float_cmp::assert_approx_eq;

    use super::*;

    #[test]
    fn test_supersonic_upwind() {
        let eos = GasLaw::ideal(1.4);
        let left = State::<Primitive>::new(1., -5. * DVec3::Y, 1.);
        let right = State::<Primitive>::new(0.5, -5. * DVec3::Y, 2.);
        let flux = HLLRiemannSolver
            .solve_for_flux(&left, &right, DVec3::ZERO, DVec3::Y, &eos)
            .unwrap();
        // All waves move to the left: the flux is the Euler flux of the right state
        assert_approx_eq!(f64, flux.mass(), -2.5, epsilon = 1e-12);
        assert_approx_eq!(f64, flux.momentum().y, 0.5 * 25. + 2., epsilon = 1e-12);
        assert_approx_eq!(f64, flux.energy(), -5. * (5. + 6.25 + 2.), epsilon = 1e-12);
    }
}
