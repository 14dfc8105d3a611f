use thiserror::Error;

/// Failures of the geometry kernel (tessellation and cell geometry).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GeometryError {
    #[error("Need at least {required} distinct, non-degenerate generators, but found {found}")]
    InsufficientPoints { required: usize, found: usize },
    #[error("Generator set is affinely degenerate (all points collinear or coplanar)")]
    DegeneratePointSet,
    #[error("Degenerate simplex with generator {0}")]
    DegenerateSimplex(usize),
    #[error("Delaunay triangulation failed: {0}")]
    Triangulation(String),
    #[error("Cell {cell} references invalid tessellation vertex {vertex} ({num_vertices} vertices)")]
    InvalidVertex {
        cell: usize,
        vertex: i64,
        num_vertices: usize,
    },
    #[error("Cell {cell} has no Voronoi neighbours")]
    IsolatedCell { cell: usize },
    #[error("Cell {cell} has non-positive volume {volume}")]
    NonPositiveVolume { cell: usize, volume: f64 },
}

/// Failures of the boundary collaborator and the ghost generator.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BoundaryError {
    #[error("Boundary condition {0:?} cannot generate ghost particles")]
    Unsupported(crate::boundary::Boundary),
    #[error("Particle {particle} at {position:?} cannot be classified against the domain")]
    Unclassifiable {
        particle: usize,
        position: [f64; 3],
    },
}

/// Unphysical states encountered during the hydro update.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PhysicsError {
    #[error("Non-positive density {density} in cell {cell}")]
    NonPositiveDensity { cell: usize, density: f64 },
    #[error("Non-positive pressure {pressure} in cell {cell}")]
    NonPositivePressure { cell: usize, pressure: f64 },
    #[error("Non-positive mass {mass} in cell {cell}")]
    NonPositiveMass { cell: usize, mass: f64 },
    #[error("Riemann problem between cells {left} and {right} generates vacuum")]
    VacuumGeneration { left: usize, right: usize },
    #[error("Invalid Riemann input state: density {density}, pressure {pressure}")]
    InvalidRiemannState { density: f64, pressure: f64 },
    #[error("Non-finite flux across face ({left}, {right})")]
    NonFiniteFlux { left: usize, right: usize },
}

/// Failures of the distributed particle exchange.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExchangeError {
    #[error("Malformed export assignment: {0}")]
    MalformedExport(String),
    #[error(
        "Receive space for property {property} is insufficient: need {required} elements, found {available}"
    )]
    InsufficientReceiveSpace {
        property: String,
        required: usize,
        available: usize,
    },
    #[error("Rank {partner} sent {received} elements, but {expected} were declared")]
    SizeMismatch {
        partner: usize,
        expected: usize,
        received: usize,
    },
    #[error("Property {0} is not registered on this rank")]
    UnknownProperty(String),
    #[error("Property {0} has the wrong element type")]
    PropertyType(String),
    #[error("Communication with rank {0} failed")]
    Disconnected(usize),
}

/// Invalid or unknown configuration parameters.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Missing required parameter in configuration: {0}")]
    MissingParameter(String),
    #[error("Unknown parameter: {0}")]
    UnknownParameter(String),
    #[error("Parameter {name} must be of type {expected}")]
    InvalidType { name: String, expected: &'static str },
    #[error("Unknown type of boundary condition configured: {0}")]
    UnknownBoundaryConditions(String),
    #[error("Unknown type of Riemann solver configured: {0}")]
    UnknownRiemannSolver(String),
    #[error("Unknown type of reconstruction configured: {0}")]
    UnknownReconstruction(String),
    #[error("Unknown type of particle motion configured: {0}")]
    UnknownParticleMotion(String),
    #[error("Unknown type of initial conditions configured: {0}")]
    UnknownICs(String),
    #[error("Illegal DVec3 format: {0}")]
    IllegalDVec3(String),
    #[error("Invalid configuration value for {name}: {reason}")]
    InvalidValue { name: String, reason: String },
}

/// Failures of the checkpoint writers.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Failed to write snapshot: {0}")]
    Io(#[from] std::io::Error),
    #[cfg(feature = "hdf5")]
    #[error("Failed to write HDF5 snapshot: {0}")]
    Hdf5(#[from] hdf5::Error),
}

/// Any error that is fatal to a hydro step.
#[derive(Debug, Error)]
pub enum HydroError {
    #[error("Geometry error: {0}")]
    Geometry(#[from] GeometryError),
    #[error("Boundary error: {0}")]
    Boundary(#[from] BoundaryError),
    #[error("Physics error: {0}")]
    Physics(#[from] PhysicsError),
    #[error("Exchange error: {0}")]
    Exchange(#[from] ExchangeError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),
}

/// Errors surfaced by the moving mesh integrator.
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("Simulation halted at step {step} (t = {time}): {source}")]
    Step {
        step: usize,
        time: f64,
        #[source]
        source: HydroError,
    },
    #[error("Invalid initial state: {0}")]
    Setup(#[source] HydroError),
    #[error("Integrator is {0:?}, expected {1}")]
    InvalidState(crate::engine::IntegratorState, &'static str),
}

impl SimulationError {
    /// The underlying hydro error, if any.
    pub fn hydro_error(&self) -> Option<&HydroError> {
        match self {
            SimulationError::Step { source, .. } | SimulationError::Setup(source) => Some(source),
            SimulationError::InvalidState(..) => None,
        }
    }
}
