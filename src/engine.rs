use glam::DVec3;
use log::{debug, info};
use rayon::prelude::*;

use crate::{
    boundary::{bootstrap_ghosts, update_boundaries, Domain},
    comm::{Communicator, SerialComm},
    config::MovingMeshConfig,
    errors::{ExchangeError, HydroError, SimulationError},
    exchange::exchange_particles,
    faces::faces_for_flux,
    fields::ParticleContainer,
    flux::{compute_fluxes, update},
    gradients::{extrapolate_to_faces, reconstruction_from_config, Reconstruction},
    initial_conditions::InitialConditions,
    mesh_motion::{advance_positions, assign_velocities},
    particle::{Particle, ParticleIndex},
    physical_quantities::{Conserved, Primitive, State},
    riemann_solver::{riemann_solver_from_config, RiemannFluxSolver},
    snapshot::{Snapshot, SnapshotWriter},
    timestep::compute_dt,
    voronoi::{tessellate, volume_center_mass, CellInfo, Tessellation},
};

const AXES: [&str; 3] = ["x", "y", "z"];

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IntegratorState {
    Uninitialized,
    Initialized,
    Stepping,
    Finished,
}

/// Geometry of the current generator positions.
struct Geometry {
    positions: Vec<DVec3>,
    particle_index: ParticleIndex,
    tessellation: Tessellation,
    cells: Vec<CellInfo>,
    /// Real cells followed by the images of the ghosts.
    primitives: Vec<State<Primitive>>,
}

/// Everything that changes during a run.
pub struct SimulationState {
    pub time: f64,
    pub step: usize,
    pub dt: f64,
    /// Real generators.
    positions: Vec<DVec3>,
    ids: Vec<i64>,
    conserved: Vec<State<Conserved>>,
    /// Geometry of the previous step, from which the next ghosts are derived.
    previous: Option<(Vec<DVec3>, ParticleIndex, Tessellation)>,
    /// Geometry of `positions`, if already computed.
    current: Option<Geometry>,
}

impl SimulationState {
    pub fn num_particles(&self) -> usize {
        self.positions.len()
    }
}

/// Moving mesh integrator: drives the per step pipeline and the outer time loop.
pub struct MovingMesh<C: Communicator = SerialComm> {
    config: MovingMeshConfig,
    domain: Domain,
    riemann_solver: Box<dyn RiemannFluxSolver>,
    reconstruction: Box<dyn Reconstruction>,
    comm: C,
    integrator_state: IntegratorState,
    state: Option<SimulationState>,
    last_output: Option<usize>,
}

impl MovingMesh<SerialComm> {
    pub fn serial(config: MovingMeshConfig) -> Result<Self, HydroError> {
        Self::new(config, SerialComm)
    }
}

impl<C: Communicator> MovingMesh<C> {
    pub fn new(config: MovingMeshConfig, comm: C) -> Result<Self, HydroError> {
        let domain = Domain::from_config(&config.space);
        let riemann_solver = riemann_solver_from_config(&config.hydro.riemann_solver)?;
        let reconstruction = reconstruction_from_config(&config.hydro.reconstruction)?;
        Ok(Self {
            config,
            domain,
            riemann_solver,
            reconstruction,
            comm,
            integrator_state: IntegratorState::Uninitialized,
            state: None,
            last_output: None,
        })
    }

    pub fn config(&self) -> &MovingMeshConfig {
        &self.config
    }

    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    pub fn integrator_state(&self) -> IntegratorState {
        self.integrator_state
    }

    pub fn state(&self) -> Option<&SimulationState> {
        self.state.as_ref()
    }

    pub fn time(&self) -> f64 {
        self.state.as_ref().map_or(0., |state| state.time)
    }

    pub fn step_count(&self) -> usize {
        self.state.as_ref().map_or(0, |state| state.step)
    }

    /// Real generator positions.
    pub fn positions(&self) -> &[DVec3] {
        self.state
            .as_ref()
            .map(|state| state.positions.as_slice())
            .unwrap_or_default()
    }

    pub fn ids(&self) -> &[i64] {
        self.state
            .as_ref()
            .map(|state| state.ids.as_slice())
            .unwrap_or_default()
    }

    pub fn conserved(&self) -> &[State<Conserved>] {
        self.state
            .as_ref()
            .map(|state| state.conserved.as_slice())
            .unwrap_or_default()
    }

    /// Primitive variables of the real cells, if the geometry of the current positions has been
    /// computed (see [`MovingMesh::refresh`]).
    pub fn primitives(&self) -> Option<&[State<Primitive>]> {
        let state = self.state.as_ref()?;
        let geometry = state.current.as_ref()?;
        Some(&geometry.primitives[geometry.particle_index.real()])
    }

    /// Volumes and centroids of the real cells, if the geometry of the current positions has been
    /// computed.
    pub fn cells(&self) -> Option<&[CellInfo]> {
        let geometry = self.state.as_ref()?.current.as_ref()?;
        Some(&geometry.cells)
    }

    /// Real particles followed by the ghosts of the current geometry.
    pub fn particles(&self) -> Option<Vec<Particle>> {
        let state = self.state.as_ref()?;
        let geometry = state.current.as_ref()?;
        Some(
            geometry
                .particle_index
                .particles(&geometry.positions, &state.ids),
        )
    }

    /// Total mass, momentum and energy of the local real cells.
    pub fn total_conserved(&self) -> State<Conserved> {
        self.conserved()
            .iter()
            .fold(State::<Conserved>::vacuum(), |total, u| total + *u)
    }

    fn expect_state(&self, allowed: &[IntegratorState], expected: &'static str) -> Result<(), SimulationError> {
        if allowed.contains(&self.integrator_state) {
            Ok(())
        } else {
            Err(SimulationError::InvalidState(self.integrator_state, expected))
        }
    }

    /// Load the initial conditions: tessellate them and convert the primitive variables to
    /// conserved quantities.
    pub fn set_initial_state(&mut self, ics: InitialConditions) -> Result<(), SimulationError> {
        self.expect_state(&[IntegratorState::Uninitialized], "Uninitialized")?;
        let state = self.initial_state(ics).map_err(SimulationError::Setup)?;
        info!(
            "Initialized {} particles ({} ghosts)",
            state.num_particles(),
            state
                .current
                .as_ref()
                .map_or(0, |geometry| geometry.particle_index.num_ghost())
        );
        self.state = Some(state);
        self.integrator_state = IntegratorState::Initialized;
        Ok(())
    }

    fn initial_state(&self, ics: InitialConditions) -> Result<SimulationState, HydroError> {
        let dimensionality = self.domain.dimensionality();
        let eos = &self.config.hydro.gas_law;
        let (positions_all, particle_index) = match ics.supplied_ghosts() {
            Some(supplied) => supplied,
            None => bootstrap_ghosts(ics.positions(), &self.domain, dimensionality)?,
        };
        let (positions, ids, primitives) = ics.into_parts();
        let tessellation = tessellate(&positions_all, dimensionality)?;
        let cells = volume_center_mass(&positions_all, &tessellation, &particle_index, dimensionality)?;

        let mut primitives = primitives
            .into_iter()
            .enumerate()
            .map(|(cell, w)| w.check_physical(cell))
            .collect::<Result<Vec<_>, _>>()?;
        let conserved = primitives
            .iter()
            .zip(cells.iter())
            .map(|(w, cell)| State::<Conserved>::from_primitives(w, cell.volume, eos))
            .collect();
        let ghost_primitives: Vec<_> = particle_index
            .ghosts()
            .iter()
            .map(|ghost| ghost.image.primitives(&primitives[ghost.origin]))
            .collect();
        primitives.extend(ghost_primitives);

        Ok(SimulationState {
            time: 0.,
            step: 0,
            dt: 0.,
            positions,
            ids,
            conserved,
            previous: None,
            current: Some(Geometry {
                positions: positions_all,
                particle_index,
                tessellation,
                cells,
                primitives,
            }),
        })
    }

    /// Ghosts, tessellation, cell volumes and primitive variables of the current positions.
    fn geometry(&self, state: &SimulationState) -> Result<Geometry, HydroError> {
        let dimensionality = self.domain.dimensionality();
        let eos = &self.config.hydro.gas_law;
        let (positions, particle_index) = match &state.previous {
            Some((previous_positions, previous_index, previous_tessellation)) => {
                // Real generators have moved since the previous tessellation, the ghosts have not
                let mut positions = previous_positions.clone();
                positions[previous_index.real()].copy_from_slice(&state.positions);
                update_boundaries(
                    &positions,
                    previous_index,
                    previous_tessellation,
                    &self.domain,
                    dimensionality,
                )?
            }
            None => bootstrap_ghosts(&state.positions, &self.domain, dimensionality)?,
        };
        let tessellation = tessellate(&positions, dimensionality)?;
        let cells = volume_center_mass(&positions, &tessellation, &particle_index, dimensionality)?;

        let mut primitives = state
            .conserved
            .par_iter()
            .zip(cells.par_iter())
            .enumerate()
            .map(|(cell, (u, info))| State::<Primitive>::from_conserved(u, info.volume, eos, cell))
            .collect::<Result<Vec<_>, _>>()?;
        let ghost_primitives: Vec<_> = particle_index
            .ghosts()
            .iter()
            .map(|ghost| ghost.image.primitives(&primitives[ghost.origin]))
            .collect();
        primitives.extend(ghost_primitives);
        debug!(
            "Tessellated {} particles ({} ghosts) into {} vertices",
            positions.len(),
            particle_index.num_ghost(),
            tessellation.vertices().len()
        );

        Ok(Geometry {
            positions,
            particle_index,
            tessellation,
            cells,
            primitives,
        })
    }

    /// Compute the geometry and primitive variables of the current positions, unless up to date.
    pub fn refresh(&mut self) -> Result<(), HydroError> {
        let Some(state) = self.state.as_ref() else {
            return Ok(());
        };
        if state.current.is_none() {
            let geometry = self.geometry(state)?;
            if let Some(state) = self.state.as_mut() {
                state.current = Some(geometry);
            }
        }
        Ok(())
    }

    fn advance(&mut self) -> Result<f64, HydroError> {
        self.refresh()?;
        let Some(state) = self.state.as_mut() else {
            return Ok(0.);
        };
        let Some(geometry) = state.current.take() else {
            return Ok(0.);
        };
        let dimensionality = self.domain.dimensionality();
        let hydro = &self.config.hydro;
        let eos = &hydro.gas_law;
        let index = &geometry.particle_index;

        let dt = compute_dt(
            &geometry.cells,
            &geometry.primitives[index.real()],
            eos,
            hydro.cfl,
            state.time,
            self.config.time_integration.max_time,
            dimensionality,
            &self.comm,
        )?;
        let velocities = assign_velocities(
            &geometry.positions,
            &geometry.primitives,
            index,
            &geometry.cells,
            eos,
            self.config.mesh.particle_motion,
            dimensionality,
        );
        let gradients = self.reconstruction.gradients(
            &geometry.positions,
            &geometry.primitives,
            index,
            &geometry.cells,
            &geometry.tessellation,
            dimensionality,
        )?;
        let mut faces = faces_for_flux(
            &geometry.positions,
            &geometry.primitives,
            &velocities,
            index,
            &geometry.tessellation,
        )?;
        extrapolate_to_faces(
            &mut faces,
            &geometry.primitives,
            &gradients,
            &velocities,
            &geometry.cells,
            index,
            dt,
            eos,
        );
        let fluxes = compute_fluxes(&faces, self.riemann_solver.as_ref(), eos)?;
        update(&mut state.conserved, &fluxes, &faces, dt, index);
        advance_positions(&mut state.positions, &velocities, index, dt, &self.domain);

        let max_time = self.config.time_integration.max_time;
        state.time = if dt >= max_time - state.time {
            max_time
        } else {
            state.time + dt
        };
        state.step += 1;
        state.dt = dt;
        state.previous = Some((geometry.positions, geometry.particle_index, geometry.tessellation));
        Ok(dt)
    }

    /// Execute a single step of the pipeline. Returns the time step taken.
    pub fn step(&mut self) -> Result<f64, SimulationError> {
        self.expect_state(
            &[IntegratorState::Initialized, IntegratorState::Stepping],
            "Initialized or Stepping",
        )?;
        self.integrator_state = IntegratorState::Stepping;
        let (step, time) = (self.step_count(), self.time());
        match self.advance() {
            Ok(dt) => {
                info!(
                    "Step {}: t = {:.6e}, dt = {:.6e}",
                    self.step_count(),
                    self.time(),
                    dt
                );
                Ok(dt)
            }
            Err(source) => {
                self.integrator_state = IntegratorState::Finished;
                Err(SimulationError::Step { step, time, source })
            }
        }
    }

    pub fn is_done(&self) -> bool {
        self.time() >= self.config.time_integration.max_time
            || self.step_count() >= self.config.time_integration.max_steps
    }

    /// Write the current state of the real particles under `name`.
    pub fn write_snapshot<W: SnapshotWriter + ?Sized>(
        &mut self,
        writer: &mut W,
        name: &str,
    ) -> Result<(), HydroError> {
        self.refresh()?;
        let Some(state) = self.state.as_ref() else {
            return Ok(());
        };
        let Some(geometry) = state.current.as_ref() else {
            return Ok(());
        };
        writer.write(
            name,
            &Snapshot {
                step: state.step,
                time: state.time,
                positions: &state.positions,
                ids: &state.ids,
                primitives: &geometry.primitives[geometry.particle_index.real()],
                eos: &self.config.hydro.gas_law,
            },
        )?;
        self.last_output = Some(state.step);
        Ok(())
    }

    fn output(&mut self, writer: &mut (impl SnapshotWriter + ?Sized)) -> Result<(), SimulationError> {
        let step = self.step_count();
        if self.last_output == Some(step) {
            return Ok(());
        }
        let name = format!("{}_{:04}", self.config.snapshots.prefix, step);
        let time = self.time();
        self.write_snapshot(writer, &name).map_err(|source| {
            self.integrator_state = IntegratorState::Finished;
            SimulationError::Step { step, time, source }
        })
    }

    /// Run until `max_time` or `max_steps` is reached, writing a snapshot every `output_cycle`
    /// steps and once more at the end.
    pub fn solve<W: SnapshotWriter + ?Sized>(&mut self, writer: &mut W) -> Result<(), SimulationError> {
        self.expect_state(
            &[IntegratorState::Initialized, IntegratorState::Stepping],
            "Initialized or Stepping",
        )?;
        let output_cycle = self.config.snapshots.output_cycle.max(1);
        while !self.is_done() {
            if self.step_count() % output_cycle == 0 {
                self.output(writer)?;
            }
            self.step()?;
        }
        self.output(writer)?;
        self.integrator_state = IntegratorState::Finished;
        info!(
            "Finished after {} steps at t = {:.6e}",
            self.step_count(),
            self.time()
        );
        Ok(())
    }

    /// The real particles as exchangeable records: positions, ids, conserved quantities and tag.
    pub fn to_container(&self) -> Result<ParticleContainer, ExchangeError> {
        let dimensionality = self.domain.dimensionality();
        let mut container = ParticleContainer::hydro(self.positions().len(), dimensionality);
        for (axis, name) in AXES.iter().enumerate().take(dimensionality.dim()) {
            for (value, x) in container
                .f64_mut(&format!("position-{name}"))?
                .iter_mut()
                .zip(self.positions())
            {
                *value = x[axis];
            }
            for (value, u) in container
                .f64_mut(&format!("momentum-{name}"))?
                .iter_mut()
                .zip(self.conserved())
            {
                *value = u.momentum()[axis];
            }
        }
        for (value, u) in container.f64_mut("mass")?.iter_mut().zip(self.conserved()) {
            *value = u.mass();
        }
        for (value, u) in container.f64_mut("energy")?.iter_mut().zip(self.conserved()) {
            *value = u.energy();
        }
        container.i64_mut("ids")?.copy_from_slice(self.ids());
        Ok(container)
    }

    fn load_container(&mut self, container: &ParticleContainer) -> Result<(), ExchangeError> {
        let dimensionality = self.domain.dimensionality();
        let n = container.num_particles();
        let mut positions = vec![DVec3::ZERO; n];
        let mut momenta = vec![DVec3::ZERO; n];
        for (axis, name) in AXES.iter().enumerate().take(dimensionality.dim()) {
            for (x, &value) in positions
                .iter_mut()
                .zip(container.f64(&format!("position-{name}"))?)
            {
                x[axis] = value;
            }
            for (p, &value) in momenta
                .iter_mut()
                .zip(container.f64(&format!("momentum-{name}"))?)
            {
                p[axis] = value;
            }
        }
        let conserved = container
            .f64("mass")?
            .iter()
            .zip(momenta)
            .zip(container.f64("energy")?)
            .map(|((&mass, momentum), &energy)| State::<Conserved>::new(mass, momentum, energy))
            .collect();
        let ids = container.i64("ids")?.to_vec();
        if let Some(state) = self.state.as_mut() {
            state.positions = positions;
            state.ids = ids;
            state.conserved = conserved;
            state.previous = None;
            state.current = None;
        }
        Ok(())
    }

    /// Move the real particles `export_ids` to the ranks `export_ranks` (collectively over all
    /// ranks) and continue with the redistributed particle set.
    pub fn redistribute(&mut self, export_ids: &[usize], export_ranks: &[usize]) -> Result<(), SimulationError> {
        self.expect_state(
            &[IntegratorState::Initialized, IntegratorState::Stepping],
            "Initialized or Stepping",
        )?;
        let (step, time) = (self.step_count(), self.time());
        let wrap = |source: ExchangeError| SimulationError::Step {
            step,
            time,
            source: source.into(),
        };
        let mut container = self.to_container().map_err(wrap)?;
        let received = exchange_particles(&mut container, export_ids, export_ranks, &self.comm)
            .map_err(wrap)?;
        debug!(
            "Rank {} received {} particles",
            self.comm.rank(),
            received.iter().sum::<usize>()
        );
        self.load_container(&container).map_err(wrap)
    }
}

#[cfg(test)]
mod test {
    use float_cmp::assert_approx_eq;

    use super::*;
    use crate::{
        boundary::Boundary, errors::PhysicsError, snapshot::MemorySnapshotWriter,
        utils::HydroDimension,
    };

    fn config(boundary: Boundary, max_steps: usize) -> MovingMeshConfig {
        let mut config = MovingMeshConfig::default();
        config.space.boundary = boundary;
        config.time_integration.max_steps = max_steps;
        config.time_integration.max_time = 10.;
        config
    }

    fn uniform(n: usize) -> InitialConditions {
        InitialConditions::from_fn(
            DVec3::ONE,
            n,
            HydroDimension::HydroDimension2D,
            None,
            |_| State::<Primitive>::new(1., DVec3::ZERO, 1.),
        )
    }

    #[test]
    fn test_state_machine() {
        let mut engine = MovingMesh::serial(config(Boundary::Reflective, 2)).unwrap();
        assert_eq!(engine.integrator_state(), IntegratorState::Uninitialized);
        assert!(matches!(
            engine.step(),
            Err(SimulationError::InvalidState(IntegratorState::Uninitialized, _))
        ));

        engine.set_initial_state(uniform(6)).unwrap();
        assert_eq!(engine.integrator_state(), IntegratorState::Initialized);
        assert!(matches!(
            engine.set_initial_state(uniform(6)),
            Err(SimulationError::InvalidState(IntegratorState::Initialized, _))
        ));

        let mut writer = MemorySnapshotWriter::new();
        engine.solve(&mut writer).unwrap();
        assert_eq!(engine.integrator_state(), IntegratorState::Finished);
        assert_eq!(engine.step_count(), 2);
        assert!(matches!(
            engine.step(),
            Err(SimulationError::InvalidState(IntegratorState::Finished, _))
        ));
        let names: Vec<_> = writer.snapshots.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["simulation_0000", "simulation_0002"]);
    }

    #[test]
    fn test_initial_conversion() {
        let mut engine = MovingMesh::serial(config(Boundary::Periodic, 1)).unwrap();
        engine.set_initial_state(uniform(4)).unwrap();
        let total = engine.total_conserved();
        assert_approx_eq!(f64, total.mass(), 1., epsilon = 1e-12);
        assert_approx_eq!(f64, total.energy(), 1. / 0.4, epsilon = 1e-12);
        for u in engine.conserved() {
            assert_approx_eq!(f64, u.mass(), 1. / 16., epsilon = 1e-12);
        }
        let primitives = engine.primitives().unwrap();
        assert_eq!(primitives.len(), 16);

        let particles = engine.particles().unwrap();
        assert!(particles.len() > 16);
        assert!(particles[..16].iter().all(|p| !p.is_ghost()));
        assert!(particles[16..].iter().all(|p| p.is_ghost()));
        assert!(particles.iter().all(|p| engine.ids().contains(&p.id)));
    }

    #[test]
    fn test_uniform_state_is_stationary() {
        let mut engine = MovingMesh::serial(config(Boundary::Periodic, 3)).unwrap();
        engine.set_initial_state(uniform(5)).unwrap();
        for _ in 0..3 {
            let dt = engine.step().unwrap();
            assert!(dt > 0.);
        }
        engine.refresh().unwrap();
        for w in engine.primitives().unwrap() {
            assert_approx_eq!(f64, w.density(), 1., epsilon = 1e-10);
            assert_approx_eq!(f64, w.pressure(), 1., epsilon = 1e-10);
            assert_approx_eq!(f64, w.velocity().length(), 0., epsilon = 1e-10);
        }
        assert!(engine.time() > 0.);
    }

    #[test]
    fn test_max_time_is_reached_exactly() {
        let mut config = config(Boundary::Periodic, 1000);
        config.time_integration.max_time = 0.05;
        let mut engine = MovingMesh::serial(config).unwrap();
        engine.set_initial_state(uniform(4)).unwrap();
        engine.solve(&mut MemorySnapshotWriter::new()).unwrap();
        assert_eq!(engine.time(), 0.05);
        assert!(engine.step_count() < 1000);
    }

    #[test]
    fn test_errors_report_step() {
        let mut engine = MovingMesh::serial(config(Boundary::Periodic, 5)).unwrap();
        engine.set_initial_state(uniform(4)).unwrap();
        engine.step().unwrap();
        // Negative energy in one cell
        if let Some(state) = engine.state.as_mut() {
            state.conserved[3] = State::<Conserved>::new(0.1, DVec3::ZERO, -1.);
        }
        match engine.step() {
            Err(SimulationError::Step {
                step,
                source: HydroError::Physics(PhysicsError::NonPositivePressure { cell, .. }),
                ..
            }) => {
                assert_eq!(step, 1);
                assert_eq!(cell, 3);
            }
            other => panic!("Unexpected result: {other:?}"),
        }
        assert_eq!(engine.integrator_state(), IntegratorState::Finished);
    }

    #[test]
    fn test_invalid_initial_state() {
        let mut engine = MovingMesh::serial(config(Boundary::Reflective, 5)).unwrap();
        let ics = InitialConditions::from_fn(
            DVec3::ONE,
            4,
            HydroDimension::HydroDimension2D,
            None,
            |x| State::<Primitive>::new(if x.x < 0.5 { 1. } else { -1. }, DVec3::ZERO, 1.),
        );
        assert!(matches!(
            engine.set_initial_state(ics),
            Err(SimulationError::Setup(HydroError::Physics(_)))
        ));
        assert_eq!(engine.integrator_state(), IntegratorState::Uninitialized);
    }

    #[test]
    fn test_redistribute_serial() {
        let mut engine = MovingMesh::serial(config(Boundary::Periodic, 5)).unwrap();
        engine.set_initial_state(uniform(4)).unwrap();
        let before = engine.total_conserved();
        engine.redistribute(&[0, 5], &[0, 0]).unwrap();
        assert_eq!(engine.positions().len(), 16);
        assert_eq!(&engine.ids()[14..], &[0, 5]);
        assert!(engine.primitives().is_none());
        let after = engine.total_conserved();
        assert_approx_eq!(f64, before.mass(), after.mass(), epsilon = 1e-12);
        assert_approx_eq!(f64, before.energy(), after.energy(), epsilon = 1e-12);
        engine.step().unwrap();
    }

    #[test]
    fn test_container_fields_are_filled() {
        let mut engine = MovingMesh::serial(config(Boundary::Periodic, 5)).unwrap();
        engine.set_initial_state(uniform(4)).unwrap();
        let container = engine.to_container().unwrap();
        // Every exported column carries engine data
        let names: Vec<_> = container.property_names().collect();
        assert_eq!(
            names,
            vec!["energy", "ids", "mass", "momentum-x", "momentum-y", "position-x", "position-y"]
        );
        assert_eq!(container.i64("ids").unwrap(), engine.ids());
        for ((&mass, &energy), u) in container
            .f64("mass")
            .unwrap()
            .iter()
            .zip(container.f64("energy").unwrap())
            .zip(engine.conserved())
        {
            assert_eq!(mass, u.mass());
            assert_eq!(energy, u.energy());
        }
        for ((&x, &y), p) in container
            .f64("position-x")
            .unwrap()
            .iter()
            .zip(container.f64("position-y").unwrap())
            .zip(engine.positions())
        {
            assert_eq!(x, p.x);
            assert_eq!(y, p.y);
        }
    }
}
