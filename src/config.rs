use glam::DVec3;
use yaml_rust::{Yaml, YamlLoader};

use crate::{
    boundary::Boundary,
    errors::ConfigError,
    gas_law::{EquationOfState, GasLaw},
    mesh_motion::{ParticleMotion, DEFAULT_CHI, DEFAULT_ETA},
    utils::HydroDimension,
};

const SECTIONS: &[&str] = &[
    "hydrodynamics",
    "time_integration",
    "snapshots",
    "mesh",
    "space",
    "initial_conditions",
];

/// Fail on keys of a section that are not in `allowed`.
fn check_keys(yaml: &Yaml, section: &str, allowed: &[&str]) -> Result<(), ConfigError> {
    match yaml {
        Yaml::BadValue | Yaml::Null => Ok(()),
        Yaml::Hash(hash) => {
            for key in hash.keys() {
                let key = key.as_str().ok_or(ConfigError::InvalidType {
                    name: format!("{section}:{key:?}"),
                    expected: "string key",
                })?;
                if !allowed.contains(&key) {
                    return Err(ConfigError::UnknownParameter(if section.is_empty() {
                        key.to_string()
                    } else {
                        format!("{section}:{key}")
                    }));
                }
            }
            Ok(())
        }
        _ => Err(ConfigError::InvalidType {
            name: section.to_string(),
            expected: "mapping",
        }),
    }
}

fn parse_f64(yaml: &Yaml, name: &str) -> Result<Option<f64>, ConfigError> {
    match yaml {
        Yaml::BadValue | Yaml::Null => Ok(None),
        Yaml::Real(_) => Ok(yaml.as_f64()),
        Yaml::Integer(i) => Ok(Some(*i as f64)),
        _ => Err(ConfigError::InvalidType {
            name: name.to_string(),
            expected: "float",
        }),
    }
}

fn parse_usize(yaml: &Yaml, name: &str) -> Result<Option<usize>, ConfigError> {
    match yaml {
        Yaml::BadValue | Yaml::Null => Ok(None),
        Yaml::Integer(i) if *i >= 0 => Ok(Some(*i as usize)),
        _ => Err(ConfigError::InvalidType {
            name: name.to_string(),
            expected: "non-negative integer",
        }),
    }
}

fn parse_str<'a>(yaml: &'a Yaml, name: &str) -> Result<Option<&'a str>, ConfigError> {
    match yaml {
        Yaml::BadValue | Yaml::Null => Ok(None),
        Yaml::String(s) => Ok(Some(s)),
        _ => Err(ConfigError::InvalidType {
            name: name.to_string(),
            expected: "string",
        }),
    }
}

fn parse_bool(yaml: &Yaml, name: &str) -> Result<Option<bool>, ConfigError> {
    match yaml {
        Yaml::BadValue | Yaml::Null => Ok(None),
        Yaml::Boolean(b) => Ok(Some(*b)),
        _ => Err(ConfigError::InvalidType {
            name: name.to_string(),
            expected: "boolean",
        }),
    }
}

fn parse_dvec3(yaml: &Yaml, name: &str) -> Result<Option<DVec3>, ConfigError> {
    let components = match yaml {
        Yaml::BadValue | Yaml::Null => return Ok(None),
        Yaml::Array(components) => components,
        _ => return Err(ConfigError::IllegalDVec3(format!("{name}: {yaml:?}"))),
    };
    let components = components
        .iter()
        .map(|c| parse_f64(c, name).ok().flatten())
        .collect::<Option<Vec<f64>>>()
        .ok_or_else(|| ConfigError::IllegalDVec3(format!("{name}: {yaml:?}")))?;
    match components[..] {
        [x, y, z] => Ok(Some(DVec3::new(x, y, z))),
        [x, y] => Ok(Some(DVec3::new(x, y, 1.))),
        _ => Err(ConfigError::IllegalDVec3(format!("{name}: {yaml:?}"))),
    }
}

fn positive(value: f64, name: &str) -> Result<f64, ConfigError> {
    if value > 0. && value.is_finite() {
        Ok(value)
    } else {
        Err(ConfigError::InvalidValue {
            name: name.to_string(),
            reason: format!("must be positive, got {value}"),
        })
    }
}

pub struct HydroCfg {
    pub gas_law: GasLaw,
    pub cfl: f64,
    pub riemann_solver: String,
    pub reconstruction: String,
}

impl Default for HydroCfg {
    fn default() -> Self {
        Self {
            gas_law: GasLaw::ideal(1.4),
            cfl: 0.5,
            riemann_solver: "HLLC".to_string(),
            reconstruction: "constant".to_string(),
        }
    }
}

impl HydroCfg {
    fn parse(yaml: &Yaml) -> Result<Self, ConfigError> {
        check_keys(
            yaml,
            "hydrodynamics",
            &[
                "gamma",
                "equation_of_state",
                "isothermal_internal_energy",
                "cfl_criterion",
                "riemann_solver",
                "reconstruction",
            ],
        )?;
        let default = Self::default();
        let gamma = parse_f64(&yaml["gamma"], "hydrodynamics:gamma")?
            .unwrap_or(default.gas_law.gamma().gamma());
        if gamma <= 1. {
            return Err(ConfigError::InvalidValue {
                name: "hydrodynamics:gamma".to_string(),
                reason: format!("adiabatic index must exceed 1, got {gamma}"),
            });
        }
        let equation_of_state = match parse_str(
            &yaml["equation_of_state"],
            "hydrodynamics:equation_of_state",
        )?
        .unwrap_or("Ideal")
        {
            "Ideal" => EquationOfState::Ideal,
            "Isothermal" => {
                let isothermal_internal_energy = parse_f64(
                    &yaml["isothermal_internal_energy"],
                    "hydrodynamics:isothermal_internal_energy",
                )?
                .ok_or(ConfigError::MissingParameter(
                    "hydrodynamics:isothermal_internal_energy".to_string(),
                ))?;
                EquationOfState::Isothermal {
                    isothermal_internal_energy,
                }
            }
            other => {
                return Err(ConfigError::InvalidValue {
                    name: "hydrodynamics:equation_of_state".to_string(),
                    reason: format!("unknown equation of state {other}"),
                })
            }
        };
        let cfl = parse_f64(&yaml["cfl_criterion"], "hydrodynamics:cfl_criterion")?
            .map(|cfl| positive(cfl, "hydrodynamics:cfl_criterion"))
            .transpose()?
            .unwrap_or(default.cfl);
        let riemann_solver = parse_str(&yaml["riemann_solver"], "hydrodynamics:riemann_solver")?
            .map_or(default.riemann_solver, str::to_string);
        let reconstruction = parse_str(&yaml["reconstruction"], "hydrodynamics:reconstruction")?
            .map_or(default.reconstruction, str::to_string);
        Ok(Self {
            gas_law: GasLaw::new(gamma, equation_of_state),
            cfl,
            riemann_solver,
            reconstruction,
        })
    }
}

pub struct TimeIntegrationCfg {
    pub max_time: f64,
    pub max_steps: usize,
}

impl TimeIntegrationCfg {
    fn parse(yaml: &Yaml) -> Result<Self, ConfigError> {
        check_keys(yaml, "time_integration", &["max_time", "max_steps"])?;
        let max_time = parse_f64(&yaml["max_time"], "time_integration:max_time")?
            .ok_or(ConfigError::MissingParameter(
                "time_integration:max_time".to_string(),
            ))?;
        let max_steps = parse_usize(&yaml["max_steps"], "time_integration:max_steps")?
            .unwrap_or(usize::MAX);
        Ok(Self {
            max_time: positive(max_time, "time_integration:max_time")?,
            max_steps,
        })
    }
}

pub struct SnapshotsCfg {
    pub output_cycle: usize,
    pub prefix: String,
}

impl SnapshotsCfg {
    fn parse(yaml: &Yaml) -> Result<Self, ConfigError> {
        check_keys(yaml, "snapshots", &["output_cycle", "prefix"])?;
        let output_cycle = parse_usize(&yaml["output_cycle"], "snapshots:output_cycle")?
            .unwrap_or(100_000);
        if output_cycle == 0 {
            return Err(ConfigError::InvalidValue {
                name: "snapshots:output_cycle".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        let prefix = parse_str(&yaml["prefix"], "snapshots:prefix")?
            .unwrap_or("simulation")
            .to_string();
        Ok(Self {
            output_cycle,
            prefix,
        })
    }
}

pub struct MeshCfg {
    pub particle_motion: ParticleMotion,
}

impl MeshCfg {
    fn parse(yaml: &Yaml) -> Result<Self, ConfigError> {
        check_keys(
            yaml,
            "mesh",
            &["particle_motion", "regularization", "eta", "chi"],
        )?;
        let eta = parse_f64(&yaml["eta"], "mesh:eta")?.unwrap_or(DEFAULT_ETA);
        let chi = parse_f64(&yaml["chi"], "mesh:chi")?.unwrap_or(DEFAULT_CHI);
        let regularization = parse_bool(&yaml["regularization"], "mesh:regularization")?;
        let particle_motion = match parse_str(&yaml["particle_motion"], "mesh:particle_motion")? {
            Some("fixed") => ParticleMotion::Fixed,
            Some("fluid") => ParticleMotion::Fluid,
            Some("steer") => ParticleMotion::Steer { eta, chi },
            Some(other) => return Err(ConfigError::UnknownParticleMotion(other.to_string())),
            None => match regularization {
                Some(false) => ParticleMotion::Fluid,
                _ => ParticleMotion::Steer { eta, chi },
            },
        };
        Ok(Self { particle_motion })
    }
}

pub struct SpaceCfg {
    pub boundary: Boundary,
    pub box_size: DVec3,
    pub dimensionality: HydroDimension,
}

impl SpaceCfg {
    fn parse(yaml: &Yaml) -> Result<Self, ConfigError> {
        check_keys(yaml, "space", &["boundary", "box_size", "dimensionality"])?;
        let boundary = parse_str(&yaml["boundary"], "space:boundary")?
            .unwrap_or("reflective")
            .try_into()?;
        let box_size = parse_dvec3(&yaml["box_size"], "space:box_size")?.unwrap_or(DVec3::ONE);
        let dimensionality = parse_usize(&yaml["dimensionality"], "space:dimensionality")?
            .unwrap_or(2)
            .try_into()
            .map_err(|_| ConfigError::InvalidValue {
                name: "space:dimensionality".to_string(),
                reason: "only 2 and 3 dimensional runs are supported".to_string(),
            })?;
        Ok(Self {
            boundary,
            box_size,
            dimensionality,
        })
    }
}

/// How the generators of the initial conditions are placed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Placement {
    /// Regular lattice, optionally perturbed by a fraction of the spacing.
    Lattice { perturbations: Option<f64> },
    /// Uniformly random.
    Random,
}

pub struct InitialConditionsCfg {
    pub kind: String,
    pub num_part: usize,
    pub placement: Placement,
    pub seed: u64,
    pub relax_iterations: usize,
}

impl InitialConditionsCfg {
    fn parse(yaml: &Yaml) -> Result<Self, ConfigError> {
        check_keys(
            yaml,
            "initial_conditions",
            &[
                "kind",
                "num_part",
                "placement",
                "perturbations",
                "seed",
                "relax_iterations",
            ],
        )?;
        let kind = parse_str(&yaml["kind"], "initial_conditions:kind")?
            .ok_or(ConfigError::MissingParameter(
                "initial_conditions:kind".to_string(),
            ))?
            .to_string();
        let num_part = parse_usize(&yaml["num_part"], "initial_conditions:num_part")?.unwrap_or(50);
        let perturbations = parse_f64(&yaml["perturbations"], "initial_conditions:perturbations")?;
        let placement = match parse_str(&yaml["placement"], "initial_conditions:placement")? {
            None | Some("lattice") => Placement::Lattice { perturbations },
            Some("random") => Placement::Random,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    name: "initial_conditions:placement".to_string(),
                    reason: format!("unknown placement {other}"),
                })
            }
        };
        let seed = parse_usize(&yaml["seed"], "initial_conditions:seed")?.unwrap_or(0) as u64;
        let relax_iterations =
            parse_usize(&yaml["relax_iterations"], "initial_conditions:relax_iterations")?
                .unwrap_or(0);
        Ok(Self {
            kind,
            num_part,
            placement,
            seed,
            relax_iterations,
        })
    }
}

/// A value for [`MovingMeshConfig::set_parameter`].
#[derive(Clone, Debug, PartialEq)]
pub enum ParameterValue {
    Float(f64),
    Integer(i64),
    Bool(bool),
    Text(String),
}

impl From<f64> for ParameterValue {
    fn from(value: f64) -> Self {
        ParameterValue::Float(value)
    }
}

impl From<i64> for ParameterValue {
    fn from(value: i64) -> Self {
        ParameterValue::Integer(value)
    }
}

impl From<usize> for ParameterValue {
    fn from(value: usize) -> Self {
        ParameterValue::Integer(value as i64)
    }
}

impl From<bool> for ParameterValue {
    fn from(value: bool) -> Self {
        ParameterValue::Bool(value)
    }
}

impl From<&str> for ParameterValue {
    fn from(value: &str) -> Self {
        ParameterValue::Text(value.to_string())
    }
}

impl ParameterValue {
    fn float(&self, name: &str) -> Result<f64, ConfigError> {
        match self {
            ParameterValue::Float(value) => Ok(*value),
            ParameterValue::Integer(value) => Ok(*value as f64),
            _ => Err(ConfigError::InvalidType {
                name: name.to_string(),
                expected: "float",
            }),
        }
    }

    fn count(&self, name: &str) -> Result<usize, ConfigError> {
        match self {
            ParameterValue::Integer(value) if *value >= 0 => Ok(*value as usize),
            _ => Err(ConfigError::InvalidType {
                name: name.to_string(),
                expected: "non-negative integer",
            }),
        }
    }

    fn text(&self, name: &str) -> Result<&str, ConfigError> {
        match self {
            ParameterValue::Text(value) => Ok(value),
            _ => Err(ConfigError::InvalidType {
                name: name.to_string(),
                expected: "string",
            }),
        }
    }

    fn flag(&self, name: &str) -> Result<bool, ConfigError> {
        match self {
            ParameterValue::Bool(value) => Ok(*value),
            _ => Err(ConfigError::InvalidType {
                name: name.to_string(),
                expected: "boolean",
            }),
        }
    }
}

/// Run parameters of the moving mesh integrator.
pub struct MovingMeshConfig {
    pub hydro: HydroCfg,
    pub time_integration: TimeIntegrationCfg,
    pub snapshots: SnapshotsCfg,
    pub mesh: MeshCfg,
    pub space: SpaceCfg,
    pub initial_conditions: Option<InitialConditionsCfg>,
}

impl Default for MovingMeshConfig {
    fn default() -> Self {
        Self {
            hydro: HydroCfg::default(),
            time_integration: TimeIntegrationCfg {
                max_time: f64::INFINITY,
                max_steps: 100,
            },
            snapshots: SnapshotsCfg {
                output_cycle: 100_000,
                prefix: "simulation".to_string(),
            },
            mesh: MeshCfg {
                particle_motion: ParticleMotion::default(),
            },
            space: SpaceCfg {
                boundary: Boundary::Reflective,
                box_size: DVec3::ONE,
                dimensionality: HydroDimension::HydroDimension2D,
            },
            initial_conditions: None,
        }
    }
}

impl MovingMeshConfig {
    pub fn parse(yaml: &Yaml) -> Result<Self, ConfigError> {
        check_keys(yaml, "", SECTIONS)?;
        let initial_conditions = if yaml["initial_conditions"].is_badvalue() {
            None
        } else {
            Some(InitialConditionsCfg::parse(&yaml["initial_conditions"])?)
        };
        Ok(Self {
            hydro: HydroCfg::parse(&yaml["hydrodynamics"])?,
            time_integration: TimeIntegrationCfg::parse(&yaml["time_integration"])?,
            snapshots: SnapshotsCfg::parse(&yaml["snapshots"])?,
            mesh: MeshCfg::parse(&yaml["mesh"])?,
            space: SpaceCfg::parse(&yaml["space"])?,
            initial_conditions,
        })
    }

    pub fn from_yaml_str(source: &str) -> Result<Self, ConfigError> {
        let docs = YamlLoader::load_from_str(source).map_err(|err| ConfigError::InvalidValue {
            name: "configuration".to_string(),
            reason: err.to_string(),
        })?;
        match docs.first() {
            Some(yaml) => Self::parse(yaml),
            None => Self::parse(&Yaml::BadValue),
        }
    }

    /// Change a single run parameter by name.
    pub fn set_parameter<V: Into<ParameterValue>>(
        &mut self,
        name: &str,
        value: V,
    ) -> Result<(), ConfigError> {
        let value = value.into();
        match name {
            "gamma" => {
                let gamma = value.float(name)?;
                if gamma <= 1. {
                    return Err(ConfigError::InvalidValue {
                        name: name.to_string(),
                        reason: format!("adiabatic index must exceed 1, got {gamma}"),
                    });
                }
                self.hydro.gas_law = GasLaw::new(gamma, self.hydro.gas_law.equation_of_state());
            }
            "cfl" => self.hydro.cfl = positive(value.float(name)?, name)?,
            "riemann_solver" => self.hydro.riemann_solver = value.text(name)?.to_string(),
            "reconstruction" => self.hydro.reconstruction = value.text(name)?.to_string(),
            "max_time" => self.time_integration.max_time = positive(value.float(name)?, name)?,
            "max_steps" => self.time_integration.max_steps = value.count(name)?,
            "output_cycle" => {
                self.snapshots.output_cycle = value.count(name)?.max(1);
            }
            "output_name" | "prefix" => self.snapshots.prefix = value.text(name)?.to_string(),
            "regularization" => {
                self.mesh.particle_motion = if value.flag(name)? {
                    ParticleMotion::default()
                } else {
                    ParticleMotion::Fluid
                }
            }
            "particle_motion" => {
                self.mesh.particle_motion = match value.text(name)? {
                    "fixed" => ParticleMotion::Fixed,
                    "fluid" => ParticleMotion::Fluid,
                    "steer" => ParticleMotion::default(),
                    other => return Err(ConfigError::UnknownParticleMotion(other.to_string())),
                }
            }
            "eta" | "chi" => {
                let new = value.float(name)?;
                let (mut eta, mut chi) = match self.mesh.particle_motion {
                    ParticleMotion::Steer { eta, chi } => (eta, chi),
                    _ => {
                        return Err(ConfigError::InvalidValue {
                            name: name.to_string(),
                            reason: "only used by steered particle motion".to_string(),
                        })
                    }
                };
                if name == "eta" {
                    eta = new;
                } else {
                    chi = new;
                }
                self.mesh.particle_motion = ParticleMotion::Steer { eta, chi };
            }
            "boundary" => self.space.boundary = value.text(name)?.try_into()?,
            _ => return Err(ConfigError::UnknownParameter(name.to_string())),
        }
        Ok(())
    }
}
