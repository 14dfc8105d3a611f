//! Voronoi moving mesh hydrodynamics: an arbitrary Lagrangian-Eulerian finite volume integrator
//! for the Euler equations on a mesh whose generators move with the flow.
//!
//! The library also provides the particle exchange used to redistribute particles between the
//! ranks of a parallel run.

pub use boundary::{Boundary, BoundaryCondition, Domain};
pub use comm::{Communicator, SerialComm, ThreadComm};
pub use config::MovingMeshConfig;
pub use engine::{IntegratorState, MovingMesh};
pub use errors::{
    BoundaryError, ConfigError, ExchangeError, GeometryError, HydroError, PhysicsError,
    SimulationError, SnapshotError,
};
pub use exchange::exchange_particles;
pub use fields::ParticleContainer;
pub use initial_conditions::{ics_from_preset, InitialConditions};
pub use mesh_motion::ParticleMotion;
pub use snapshot::{MemorySnapshotWriter, SnapshotWriter, TextSnapshotWriter};
pub use utils::HydroDimension;
pub use voronoi::{tessellate, volume_center_mass, CellInfo, Tessellation};

#[cfg(feature = "mpi")]
pub use comm::MpiComm;
#[cfg(feature = "hdf5")]
pub use snapshot::Hdf5SnapshotWriter;

pub mod boundary;
pub mod comm;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exchange;
pub mod faces;
pub mod fields;
pub mod flux;
pub mod gas_law;
pub mod gradients;
pub mod initial_conditions;
pub mod mesh_motion;
pub mod particle;
pub mod physical_quantities;
pub mod riemann_solver;
pub mod snapshot;
pub mod timestep;
pub mod utils;
pub mod voronoi;
