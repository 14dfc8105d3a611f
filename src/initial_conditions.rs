use glam::DVec3;
use log::info;
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{
    boundary::{bootstrap_ghosts, Boundary, BoundaryCondition, Domain},
    config::{InitialConditionsCfg, Placement},
    errors::{ConfigError, ExchangeError, HydroError},
    fields::ParticleContainer,
    gas_law::GasLaw,
    particle::{GhostEntry, ParticleIndex},
    physical_quantities::{Primitive, State},
    utils::HydroDimension,
    voronoi::{tessellate, volume_center_mass},
};

const AXES: [&str; 3] = ["x", "y", "z"];

/// Cell centred lattice with `num_part` generators along every axis of the box.
///
/// The first axis varies slowest.
pub fn lattice_positions(
    box_size: DVec3,
    num_part: usize,
    dimensionality: HydroDimension,
) -> Vec<DVec3> {
    let dx = box_size / num_part as f64;
    let total = num_part.pow(dimensionality.dim() as u32);
    (0..total)
        .map(|mut k| {
            let mut position = DVec3::ZERO;
            for axis in (0..dimensionality.dim()).rev() {
                position[axis] = ((k % num_part) as f64 + 0.5) * dx[axis];
                k /= num_part;
            }
            position
        })
        .collect()
}

/// `num_part` generators drawn uniformly from the box.
pub fn random_positions(
    box_size: DVec3,
    num_part: usize,
    dimensionality: HydroDimension,
    seed: u64,
) -> Vec<DVec3> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..num_part)
        .map(|_| {
            let unit = DVec3::new(rng.gen(), rng.gen(), rng.gen());
            dimensionality.project(unit * box_size)
        })
        .collect()
}

/// Displace every generator by a uniform random fraction (at most `amplitude`) of the spacing
/// `dx`, keeping it inside the domain.
pub fn perturb_positions(positions: &mut [DVec3], dx: DVec3, amplitude: f64, domain: &Domain, seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    let dimensionality = domain.dimensionality();
    for position in positions.iter_mut() {
        let shift = DVec3::new(
            rng.gen_range(-1. ..1.),
            rng.gen_range(-1. ..1.),
            rng.gen_range(-1. ..1.),
        );
        *position += dimensionality.project(amplitude * shift * dx);
        domain.restore(position);
    }
}

/// Move every generator to the centroid of its cell, `iterations` times.
pub fn lloyd_relaxation(
    mut positions: Vec<DVec3>,
    domain: &Domain,
    iterations: usize,
) -> Result<Vec<DVec3>, HydroError> {
    let dimensionality = domain.dimensionality();
    for iteration in 0..iterations {
        let (augmented, index) = bootstrap_ghosts(&positions, domain, dimensionality)?;
        let tessellation = tessellate(&augmented, dimensionality)?;
        let cells = volume_center_mass(&augmented, &tessellation, &index, dimensionality)?;
        let mut max_shift: f64 = 0.;
        for (position, cell) in positions.iter_mut().zip(cells.iter()) {
            max_shift = max_shift.max(position.distance(cell.centroid));
            *position = cell.centroid;
            domain.restore(position);
        }
        info!("Relaxation iteration {iteration}: largest displacement {max_shift:.3e}");
    }
    Ok(positions)
}

/// Initial state of a run: the generators of the real particles, their ids and primitive
/// variables, and optionally a precomputed set of ghosts.
#[derive(Debug, Clone)]
pub struct InitialConditions {
    box_size: DVec3,
    dimensionality: HydroDimension,
    positions: Vec<DVec3>,
    ids: Vec<i64>,
    primitives: Vec<State<Primitive>>,
    ghosts: Option<(Vec<DVec3>, Vec<GhostEntry>)>,
}

impl InitialConditions {
    /// Evaluate `f` at every generator. The particles are numbered in order.
    pub fn from_positions<F>(
        positions: Vec<DVec3>,
        box_size: DVec3,
        dimensionality: HydroDimension,
        mut f: F,
    ) -> Self
    where
        F: FnMut(DVec3) -> State<Primitive>,
    {
        let primitives = positions.iter().map(|&x| f(x)).collect();
        let ids = (0..positions.len() as i64).collect();
        Self {
            box_size,
            dimensionality,
            positions,
            ids,
            primitives,
            ghosts: None,
        }
    }

    /// Regular lattice with `num_part` particles per dimension, optionally perturbed.
    pub fn from_fn<F>(
        box_size: DVec3,
        num_part: usize,
        dimensionality: HydroDimension,
        perturbations: Option<f64>,
        f: F,
    ) -> Self
    where
        F: FnMut(DVec3) -> State<Primitive>,
    {
        let mut positions = lattice_positions(box_size, num_part, dimensionality);
        if let Some(amplitude) = perturbations {
            let domain = Domain::new(DVec3::ZERO, box_size, Boundary::Periodic, dimensionality);
            let dx = box_size / num_part as f64;
            perturb_positions(&mut positions, dx, amplitude, &domain, 0);
        }
        Self::from_positions(positions, box_size, dimensionality, f)
    }

    /// Read the generators and primitive variables from a particle container holding the
    /// `position-*`, `velocity-*`, `density`, `pressure` and `ids` fields.
    pub fn from_container(
        container: &ParticleContainer,
        box_size: DVec3,
        dimensionality: HydroDimension,
    ) -> Result<Self, ExchangeError> {
        let axes = &AXES[..dimensionality.dim()];
        let n = container.num_particles();
        let mut positions = vec![DVec3::ZERO; n];
        let mut velocities = vec![DVec3::ZERO; n];
        for (axis, name) in axes.iter().enumerate() {
            for (i, &x) in container.f64(&format!("position-{name}"))?.iter().enumerate() {
                positions[i][axis] = x;
            }
            for (i, &v) in container.f64(&format!("velocity-{name}"))?.iter().enumerate() {
                velocities[i][axis] = v;
            }
        }
        let primitives = container
            .f64("density")?
            .iter()
            .zip(container.f64("pressure")?.iter())
            .zip(velocities.iter())
            .map(|((&density, &pressure), &velocity)| State::<Primitive>::new(density, velocity, pressure))
            .collect();
        Ok(Self {
            box_size,
            dimensionality,
            positions,
            ids: container.i64("ids")?.to_vec(),
            primitives,
            ghosts: None,
        })
    }

    /// The inverse of [`InitialConditions::from_container`].
    pub fn to_container(&self) -> ParticleContainer {
        let axes = &AXES[..self.dimensionality.dim()];
        let mut container = ParticleContainer::new(self.positions.len());
        container.register_f64("density");
        container.register_f64("pressure");
        container.register_i64("ids");
        for name in axes {
            container.register_f64(&format!("position-{name}"));
            container.register_f64(&format!("velocity-{name}"));
        }
        let fill = |container: &mut ParticleContainer, name: &str, values: Vec<f64>| {
            if let Ok(field) = container.f64_mut(name) {
                field.copy_from_slice(&values);
            }
        };
        for (axis, name) in axes.iter().enumerate() {
            fill(
                &mut container,
                &format!("position-{name}"),
                self.positions.iter().map(|x| x[axis]).collect(),
            );
            fill(
                &mut container,
                &format!("velocity-{name}"),
                self.primitives.iter().map(|w| w.velocity()[axis]).collect(),
            );
        }
        fill(
            &mut container,
            "density",
            self.primitives.iter().map(|w| w.density()).collect(),
        );
        fill(
            &mut container,
            "pressure",
            self.primitives.iter().map(|w| w.pressure()).collect(),
        );
        if let Ok(ids) = container.i64_mut("ids") {
            ids.copy_from_slice(&self.ids);
        }
        container
    }

    /// Use the given ghosts for the first step instead of generating them from the walls.
    ///
    /// `positions` holds the ghost generators, `entries` their origins and images, in the same
    /// order.
    pub fn with_ghosts(mut self, positions: Vec<DVec3>, entries: Vec<GhostEntry>) -> Self {
        self.ghosts = Some((positions, entries));
        self
    }

    pub fn box_size(&self) -> DVec3 {
        self.box_size
    }

    pub fn dimensionality(&self) -> HydroDimension {
        self.dimensionality
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn positions(&self) -> &[DVec3] {
        &self.positions
    }

    pub fn ids(&self) -> &[i64] {
        &self.ids
    }

    pub fn primitives(&self) -> &[State<Primitive>] {
        &self.primitives
    }

    /// Real generators followed by the supplied ghosts, if any.
    pub(crate) fn supplied_ghosts(&self) -> Option<(Vec<DVec3>, ParticleIndex)> {
        self.ghosts.as_ref().map(|(ghost_positions, entries)| {
            let mut positions = self.positions.clone();
            positions.extend_from_slice(ghost_positions);
            (
                positions,
                ParticleIndex::new(self.positions.len(), entries.clone()),
            )
        })
    }

    pub(crate) fn into_parts(self) -> (Vec<DVec3>, Vec<i64>, Vec<State<Primitive>>) {
        (self.positions, self.ids, self.primitives)
    }
}

fn sod_shock(box_size: DVec3) -> impl Fn(DVec3) -> State<Primitive> {
    let x_mid = 0.5 * box_size.x;
    move |x| {
        if x.x < x_mid {
            State::<Primitive>::new(1., DVec3::ZERO, 1.)
        } else {
            State::<Primitive>::new(0.125, DVec3::ZERO, 0.1)
        }
    }
}

fn toro(box_size: DVec3) -> impl Fn(DVec3) -> State<Primitive> {
    let x_mid = 0.5 * box_size.x;
    move |x| {
        let velocity = if x.x < x_mid { 2. } else { -2. };
        State::<Primitive>::new(1., velocity * DVec3::X, 0.4)
    }
}

/// Cold gas streaming radially towards the centre of the box.
fn noh(box_size: DVec3, dimensionality: HydroDimension) -> impl Fn(DVec3) -> State<Primitive> {
    let centre = dimensionality.project(0.5 * box_size);
    move |x| {
        let velocity = -(dimensionality.project(x) - centre).normalize_or_zero();
        State::<Primitive>::new(1., velocity, 1.0e-6)
    }
}

/// Gas at rest with all the energy of the blast deposited in the cells around the centre.
fn sedov(
    box_size: DVec3,
    num_part: usize,
    dimensionality: HydroDimension,
    eos: &GasLaw,
) -> impl Fn(DVec3) -> State<Primitive> {
    let gm1 = eos.gamma().gamma() - 1.;
    let centre = dimensionality.project(0.5 * box_size);
    let dx = box_size.x / num_part as f64;
    let r = 0.51 * dx;
    let cell_volume = dx.powi(dimensionality.dim() as i32);
    move |x| {
        let pressure = if (dimensionality.project(x) - centre).length_squared() <= r * r {
            gm1 / cell_volume
        } else {
            1.0e-5 * gm1
        };
        State::<Primitive>::new(1., DVec3::ZERO, pressure)
    }
}

fn constant() -> impl Fn(DVec3) -> State<Primitive> {
    |_| State::<Primitive>::new(1., DVec3::ZERO, 1.)
}

/// Build one of the named test problems in `domain`.
pub fn ics_from_preset(
    cfg: &InitialConditionsCfg,
    domain: &Domain,
    eos: &GasLaw,
) -> Result<InitialConditions, HydroError> {
    let box_size = domain.box_size();
    let dimensionality = domain.dimensionality();
    let mut positions = match cfg.placement {
        Placement::Lattice { perturbations } => {
            let mut positions = lattice_positions(box_size, cfg.num_part, dimensionality);
            if let Some(amplitude) = perturbations {
                let dx = box_size / cfg.num_part as f64;
                perturb_positions(&mut positions, dx, amplitude, domain, cfg.seed);
            }
            positions
        }
        Placement::Random => random_positions(
            box_size,
            cfg.num_part.pow(dimensionality.dim() as u32),
            dimensionality,
            cfg.seed,
        ),
    };
    positions = lloyd_relaxation(positions, domain, cfg.relax_iterations)?;
    let ics = match cfg.kind.as_str() {
        "sodshock" => {
            InitialConditions::from_positions(positions, box_size, dimensionality, sod_shock(box_size))
        }
        "toro" => InitialConditions::from_positions(positions, box_size, dimensionality, toro(box_size)),
        "noh" => InitialConditions::from_positions(
            positions,
            box_size,
            dimensionality,
            noh(box_size, dimensionality),
        ),
        "sedov" => InitialConditions::from_positions(
            positions,
            box_size,
            dimensionality,
            sedov(box_size, cfg.num_part, dimensionality, eos),
        ),
        "constant" => {
            InitialConditions::from_positions(positions, box_size, dimensionality, constant())
        }
        _ => return Err(ConfigError::UnknownICs(cfg.kind.clone()).into()),
    };
    info!("Created {} initial conditions with {} particles", cfg.kind, ics.len());
    Ok(ics)
}
