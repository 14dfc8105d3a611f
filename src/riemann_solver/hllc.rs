use glam::DVec3;

use crate::{
    errors::PhysicsError,
    gas_law::GasLaw,
    physical_quantities::{Conserved, Primitive, State},
};

use super::*;

/// HLLC Riemann solver
pub struct HLLCRiemannSolver;

impl RiemannFluxSolver for HLLCRiemannSolver {
    /// See Section 10.4, 10.5 and 10.6 in Toro (2009)
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

        // velocity difference
        let v_r_m_v_l = v_r - v_l;

        // STEP 1: Pressure estimate
        let ppvrs = 0.5 * (left.pressure() + right.pressure())
            - 0.125 * v_r_m_v_l * (left.density() + right.density()) * (a_l + a_r);
        let p_star = ppvrs.max(0.);

        // STEP 2: wave speed estimates
        let mut q_l = 1.;
        if p_star > left.pressure() {
            q_l = (1. + 0.5 * eos.gamma().gp1dg() * (p_star / left.pressure() - 1.)).sqrt();
        }
        let mut q_r = 1.;
        if p_star > right.pressure() {
            q_r = (1. + 0.5 * eos.gamma().gp1dg() * (p_star / right.pressure() - 1.)).sqrt();
        }

        let s_l_m_v_l = -a_l * q_l;
        let s_r_m_v_r = a_r * q_r;
        let s_star = (right.pressure() - left.pressure() + left.density() * v_l * s_l_m_v_l
            - right.density() * v_r * s_r_m_v_r)
            / (left.density() * s_l_m_v_l - right.density() * s_r_m_v_r);

        // STEP 3: HLLC flux in a frame moving with the interface velocity
        let mut flux;
        if s_star >= 0. {
            // flux FL
            flux = euler_flux(left, rho_l_inv, v_l, n_unit, eos);
            let s_l = s_l_m_v_l + v_l;
            if s_l < 0. {
                // flux FL*
                let u_l = conserved_density(left, rho_l_inv, eos);
                let e_l = u_l.energy() * rho_l_inv;
                let starfac = left.density() * s_l_m_v_l / (s_l - s_star);
                let e_star = e_l
                    + (s_star - v_l) * (s_star + left.pressure() / (left.density() * s_l_m_v_l));
                let u_star = starfac
                    * State::<Conserved>::new(1., (s_star - v_l) * n_unit + left.velocity(), e_star);
                flux += s_l * (u_star - u_l);
            }
        } else {
            // flux FR
            flux = euler_flux(right, rho_r_inv, v_r, n_unit, eos);
            let s_r = s_r_m_v_r + v_r;
            if s_r > 0. {
                // flux FR*
                let u_r = conserved_density(right, rho_r_inv, eos);
                let e_r = u_r.energy() * rho_r_inv;
                let starfac = right.density() * s_r_m_v_r / (s_r - s_star);
                let e_star = e_r
                    + (s_star - v_r) * (s_star + right.pressure() / (right.density() * s_r_m_v_r));
                let u_star = starfac
                    * State::<Conserved>::new(1., (s_star - v_r) * n_unit + right.velocity(), e_star);
                flux += s_r * (u_star - u_r);
            }
        }
        debug_assert!(flux.is_finite());

        // Deboost to lab frame
        Ok(deboost(flux, interface_velocity))
    }
}
