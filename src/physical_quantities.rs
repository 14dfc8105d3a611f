use std::{
    marker::PhantomData,
    ops::{Add, AddAssign, Index, IndexMut, Mul, Sub, SubAssign},
};

use glam::DVec3;

use crate::{errors::PhysicsError, gas_law::GasLaw};

#[derive(Default, Debug, Clone, Copy, PartialEq)]
pub struct Primitive;
#[derive(Default, Debug, Clone, Copy, PartialEq)]
pub struct Conserved;

/// A hydro state vector (scalar, vector, scalar), tagged with its flavour.
#[derive(Default, Debug, Clone, Copy, PartialEq)]
pub struct State<T>(f64, DVec3, f64, PhantomData<T>);

impl<T> Add for State<T> {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0, self.1 + rhs.1, self.2 + rhs.2, PhantomData)
    }
}

impl<T> AddAssign for State<T> {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
        self.1 += rhs.1;
        self.2 += rhs.2;
    }
}

impl<T> Sub for State<T> {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0, self.1 - rhs.1, self.2 - rhs.2, PhantomData)
    }
}

impl<T> SubAssign for State<T> {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
        self.1 -= rhs.1;
        self.2 -= rhs.2;
    }
}

impl<T> Mul<State<T>> for f64 {
    type Output = State<T>;

    fn mul(self, rhs: State<T>) -> Self::Output {
        State::<T>(self * rhs.0, self * rhs.1, self * rhs.2, PhantomData)
    }
}

impl<T> State<T> {
    pub(crate) fn splat(value: f64) -> Self {
        Self(value, DVec3::splat(value), value, PhantomData)
    }

    pub fn vacuum() -> Self {
        Self(0., DVec3::ZERO, 0., PhantomData)
    }

    pub fn pairwise_max(&self, other: &Self) -> Self {
        Self(
            self.0.max(other.0),
            self.1.max(other.1),
            self.2.max(other.2),
            PhantomData,
        )
    }

    pub fn pairwise_min(&self, other: &Self) -> Self {
        Self(
            self.0.min(other.0),
            self.1.min(other.1),
            self.2.min(other.2),
            PhantomData,
        )
    }

    pub fn is_finite(&self) -> bool {
        self.0.is_finite() && self.1.is_finite() && self.2.is_finite()
    }
}

impl<T> Index<usize> for State<T> {
    type Output = f64;

    fn index(&self, index: usize) -> &Self::Output {
        match index {
            0 => &self.0,
            1 => &self.1.x,
            2 => &self.1.y,
            3 => &self.1.z,
            4 => &self.2,
            _ => panic!("Index out of bounds for StateVector!"),
        }
    }
}

impl<T> IndexMut<usize> for State<T> {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        match index {
            0 => &mut self.0,
            1 => &mut self.1.x,
            2 => &mut self.1.y,
            3 => &mut self.1.z,
            4 => &mut self.2,
            _ => panic!("Index out of bounds for StateVector!"),
        }
    }
}

/// Spatial gradients of every component of a state vector.
#[derive(Default, Debug, Clone, Copy, PartialEq)]
pub struct Gradients<T>(DVec3, [DVec3; 3], DVec3, PhantomData<T>);

impl<T> Gradients<T> {
    pub fn zeros() -> Self {
        Gradients(DVec3::ZERO, [DVec3::ZERO; 3], DVec3::ZERO, PhantomData)
    }

    /// Change of the state over the displacement `dx`.
    pub fn dot(&self, dx: DVec3) -> State<T> {
        State::<T>(
            self.0.dot(dx),
            DVec3 {
                x: self.1[0].dot(dx),
                y: self.1[1].dot(dx),
                z: self.1[2].dot(dx),
            },
            self.2.dot(dx),
            PhantomData,
        )
    }

    pub fn is_finite(&self) -> bool {
        self.0.is_finite()
            && self.1[0].is_finite()
            && self.1[1].is_finite()
            && self.1[2].is_finite()
            && self.2.is_finite()
    }
}

impl<T> Index<usize> for Gradients<T> {
    type Output = DVec3;

    fn index(&self, index: usize) -> &Self::Output {
        match index {
            0 => &self.0,
            1 => &self.1[0],
            2 => &self.1[1],
            3 => &self.1[2],
            4 => &self.2,
            _ => panic!("Index out of bounds for StateVector!"),
        }
    }
}

impl<T> IndexMut<usize> for Gradients<T> {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        match index {
            0 => &mut self.0,
            1 => &mut self.1[0],
            2 => &mut self.1[1],
            3 => &mut self.1[2],
            4 => &mut self.2,
            _ => panic!("Index out of bounds for StateVector!"),
        }
    }
}

impl State<Primitive> {
    pub fn new(density: f64, velocity: DVec3, pressure: f64) -> Self {
        Self(density, velocity, pressure, PhantomData)
    }

    pub fn density(&self) -> f64 {
        self.0
    }

    pub fn velocity(&self) -> DVec3 {
        self.1
    }

    pub fn pressure(&self) -> f64 {
        self.2
    }

    /// Recover the primitive state of `cell` from its conserved quantities and volume.
    pub fn from_conserved(
        conserved: &State<Conserved>,
        volume: f64,
        eos: &GasLaw,
        cell: usize,
    ) -> Result<Self, PhysicsError> {
        if !(conserved.mass() > 0.) {
            return Err(PhysicsError::NonPositiveMass {
                cell,
                mass: conserved.mass(),
            });
        }
        let m_inv = 1. / conserved.mass();
        let density = conserved.mass() / volume;
        let velocity = conserved.momentum() * m_inv;
        let pressure = eos.gas_pressure_from_internal_energy(conserved.internal_energy(), density);
        Self::new(density, velocity, pressure).check_physical(cell)
    }

    /// Sound speed of this state.
    pub fn sound_speed(&self, eos: &GasLaw) -> f64 {
        eos.sound_speed(self.pressure(), 1. / self.density())
    }

    pub fn boost(&self, velocity: DVec3) -> Self {
        Self::new(self.density(), self.velocity() + velocity, self.pressure())
    }

    /// Reflect velocity component along normal
    pub fn reflect(&self, normal: DVec3) -> Self {
        let v = self.velocity() - 2. * self.velocity().dot(normal) * normal;
        Self::new(self.density(), v, self.pressure())
    }

    /// Fails on non-positive (or non-finite) density and pressure.
    pub fn check_physical(self, cell: usize) -> Result<Self, PhysicsError> {
        if !(self.density() > 0.) || !self.density().is_finite() {
            return Err(PhysicsError::NonPositiveDensity {
                cell,
                density: self.density(),
            });
        }
        if !(self.pressure() > 0.) || !self.pressure().is_finite() {
            return Err(PhysicsError::NonPositivePressure {
                cell,
                pressure: self.pressure(),
            });
        }
        debug_assert!(
            self.velocity().is_finite(),
            "Infinite velocity in cell {cell}!"
        );
        Ok(self)
    }
}

impl State<Conserved> {
    pub fn new(mass: f64, momentum: DVec3, energy: f64) -> Self {
        Self(mass, momentum, energy, PhantomData)
    }

    pub fn mass(&self) -> f64 {
        self.0
    }

    pub fn momentum(&self) -> DVec3 {
        self.1
    }

    pub fn energy(&self) -> f64 {
        self.2
    }

    /// returns the specific internal energy e defined by: E = E_kin + E_therm = E_kin + m * e
    pub fn internal_energy(&self) -> f64 {
        let m_inv = 1. / self.mass();
        let thermal_energy = self.energy() - 0.5 * self.momentum().length_squared() * m_inv;
        thermal_energy * m_inv
    }

    pub fn from_primitives(primitives: &State<Primitive>, volume: f64, eos: &GasLaw) -> Self {
        let mass = primitives.density() * volume;
        let momentum = mass * primitives.velocity();
        let energy = 0.5 * momentum.dot(primitives.velocity())
            + mass
                * eos.gas_internal_energy_from_pressure(
                    primitives.pressure(),
                    1. / primitives.density(),
                );
        Self::new(mass, momentum, energy)
    }
}
