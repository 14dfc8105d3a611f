//! Closure relations between pressure, density and internal energy.

/// Adiabatic index together with the derived constants the Riemann solvers use.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct AdiabaticIndex {
    gamma: f64,
    gamma_inv: f64,
    odgm1: f64,
    odgp1: f64,
}

impl From<f64> for AdiabaticIndex {
    fn from(value: f64) -> Self {
        AdiabaticIndex {
            gamma: value,
            gamma_inv: 1. / value,
            odgm1: 1. / (value - 1.),
            odgp1: 1. / (value + 1.),
        }
    }
}

impl From<AdiabaticIndex> for f64 {
    fn from(value: AdiabaticIndex) -> Self {
        value.gamma
    }
}

impl AdiabaticIndex {
    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    /// (gamma + 1) / gamma
    pub fn gp1dg(&self) -> f64 {
        (self.gamma + 1.) * self.gamma_inv
    }

    /// 1 / (gamma - 1)
    pub fn odgm1(&self) -> f64 {
        self.odgm1
    }

    /// 2 / (gamma - 1)
    pub fn tdgm1(&self) -> f64 {
        2. * self.odgm1
    }

    /// 2 / (gamma + 1)
    pub fn tdgp1(&self) -> f64 {
        2. * self.odgp1
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EquationOfState {
    Ideal,
    Isothermal { isothermal_internal_energy: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GasLaw {
    gamma: AdiabaticIndex,
    eos: EquationOfState,
}

impl GasLaw {
    pub fn new(gamma: f64, eos: EquationOfState) -> Self {
        Self {
            gamma: gamma.into(),
            eos,
        }
    }

    /// Ideal gas with the given adiabatic index.
    pub fn ideal(gamma: f64) -> Self {
        Self::new(gamma, EquationOfState::Ideal)
    }

    pub fn gamma(&self) -> &AdiabaticIndex {
        &self.gamma
    }

    pub fn equation_of_state(&self) -> EquationOfState {
        self.eos
    }

    /// Specific internal energy
    pub fn gas_internal_energy_from_pressure(&self, pressure: f64, density_inv: f64) -> f64 {
        match self.eos {
            EquationOfState::Ideal => pressure * density_inv * self.gamma.odgm1(),
            EquationOfState::Isothermal {
                isothermal_internal_energy,
            } => isothermal_internal_energy,
        }
    }

    pub fn gas_pressure_from_internal_energy(&self, internal_energy: f64, density: f64) -> f64 {
        let internal_energy = match self.eos {
            EquationOfState::Ideal => internal_energy,
            EquationOfState::Isothermal {
                isothermal_internal_energy,
            } => isothermal_internal_energy,
        };
        (self.gamma.gamma - 1.) * internal_energy * density
    }

    pub fn sound_speed(&self, pressure: f64, density_inv: f64) -> f64 {
        match self.eos {
            EquationOfState::Ideal => (self.gamma.gamma * pressure * density_inv).sqrt(),
            EquationOfState::Isothermal {
                isothermal_internal_energy,
            } => f64::sqrt(isothermal_internal_energy * self.gamma.gamma * (self.gamma.gamma - 1.)),
        }
    }

    pub fn gas_entropy_from_internal_energy(&self, internal_energy: f64, density: f64) -> f64 {
        (self.gamma.gamma - 1.) * internal_energy * density.powf(1. - self.gamma.gamma)
    }
}
