use std::{error::Error, fs, path::PathBuf};

use clap::Parser;
use log::info;
use mvmm_hydro::{
    config::MovingMeshConfig, ics_from_preset, ConfigError, MovingMesh, SnapshotWriter,
    TextSnapshotWriter,
};

#[derive(Parser)]
#[clap(about = "Run a moving mesh hydrodynamics simulation")]
struct Cli {
    /// The path to the config file to read
    #[clap(parse(from_os_str))]
    config: PathBuf,
    /// Directory to write the snapshots to
    #[clap(short, long, parse(from_os_str), default_value = ".")]
    output: PathBuf,
    /// Write HDF5 instead of text snapshots
    #[cfg(feature = "hdf5")]
    #[clap(long)]
    hdf5: bool,
}

fn snapshot_writer(cli: &Cli) -> Box<dyn SnapshotWriter> {
    #[cfg(feature = "hdf5")]
    if cli.hdf5 {
        return Box::new(mvmm_hydro::Hdf5SnapshotWriter::new(&cli.output));
    }
    Box::new(TextSnapshotWriter::new(&cli.output))
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let mut config = MovingMeshConfig::from_yaml_str(&fs::read_to_string(&cli.config)?)?;
    let ic_cfg = config
        .initial_conditions
        .take()
        .ok_or(ConfigError::MissingParameter("initial_conditions".to_string()))?;
    let gas_law = config.hydro.gas_law;

    let mut engine = MovingMesh::serial(config)?;
    let ics = ics_from_preset(&ic_cfg, engine.domain(), &gas_law)?;
    engine.set_initial_state(ics)?;

    let mut writer = snapshot_writer(&cli);
    engine.solve(writer.as_mut())?;

    let total = engine.total_conserved();
    info!(
        "Final mass {:.6e}, momentum {:?}, energy {:.6e}",
        total.mass(),
        total.momentum(),
        total.energy()
    );
    println!("Done!");
    Ok(())
}
