use std::{
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use glam::DVec3;

use crate::{
    errors::SnapshotError,
    gas_law::GasLaw,
    physical_quantities::{Primitive, State},
};

/// Write a single-valued attribute to an HDF5 group.
#[cfg(feature = "hdf5")]
macro_rules! header_attr {
    ($group:expr, $name:expr, $value:expr) => {
        $group
            .new_attr_builder()
            .with_data(&[$value])
            .create($name)
    };
}

/// Collect a per-particle quantity into a dataset of an HDF5 group.
#[cfg(feature = "hdf5")]
macro_rules! particle_dataset {
    ($group:expr, $name:expr, $values:expr) => {{
        let values: Vec<_> = $values.collect();
        $group.new_dataset_builder().with_data(&values).create($name)
    }};
}

/// View of the real particles at a point in time.
pub struct Snapshot<'a> {
    pub step: usize,
    pub time: f64,
    pub positions: &'a [DVec3],
    pub ids: &'a [i64],
    pub primitives: &'a [State<Primitive>],
    pub eos: &'a GasLaw,
}

pub trait SnapshotWriter {
    fn write(&mut self, name: &str, snapshot: &Snapshot) -> Result<(), SnapshotError>;
}

/// Tab separated text files, one line per particle.
pub struct TextSnapshotWriter {
    directory: PathBuf,
}

impl TextSnapshotWriter {
    pub fn new<P: AsRef<Path>>(directory: P) -> Self {
        Self {
            directory: directory.as_ref().to_path_buf(),
        }
    }

    fn dump(f: &mut impl Write, snapshot: &Snapshot) -> Result<(), std::io::Error> {
        writeln!(f, "## Step {} at time {}", snapshot.step, snapshot.time)?;
        writeln!(f, "#p\tid\tx\ty\tz\trho\tvx\tvy\tvz\tP\tu\tS")?;
        for ((x, id), w) in snapshot
            .positions
            .iter()
            .zip(snapshot.ids.iter())
            .zip(snapshot.primitives.iter())
        {
            let density = w.density();
            let internal_energy = snapshot
                .eos
                .gas_internal_energy_from_pressure(w.pressure(), 1. / density);
            let entropy = snapshot
                .eos
                .gas_entropy_from_internal_energy(internal_energy, density);
            writeln!(
                f,
                "p\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
                id,
                x.x,
                x.y,
                x.z,
                density,
                w.velocity().x,
                w.velocity().y,
                w.velocity().z,
                w.pressure(),
                internal_energy,
                entropy,
            )?;
        }
        f.flush()
    }
}

impl SnapshotWriter for TextSnapshotWriter {
    fn write(&mut self, name: &str, snapshot: &Snapshot) -> Result<(), SnapshotError> {
        let path = self.directory.join(format!("{name}.txt"));
        let mut f = BufWriter::new(File::create(&path)?);
        Self::dump(&mut f, snapshot)?;
        log::debug!("Wrote snapshot to {}", path.display());
        Ok(())
    }
}

/// Owned copy of a [`Snapshot`].
#[derive(Debug, Clone)]
pub struct StoredSnapshot {
    pub name: String,
    pub step: usize,
    pub time: f64,
    pub positions: Vec<DVec3>,
    pub ids: Vec<i64>,
    pub primitives: Vec<State<Primitive>>,
}

/// Keeps every snapshot in memory.
#[derive(Debug, Default)]
pub struct MemorySnapshotWriter {
    pub snapshots: Vec<StoredSnapshot>,
}

impl MemorySnapshotWriter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotWriter for MemorySnapshotWriter {
    fn write(&mut self, name: &str, snapshot: &Snapshot) -> Result<(), SnapshotError> {
        self.snapshots.push(StoredSnapshot {
            name: name.to_string(),
            step: snapshot.step,
            time: snapshot.time,
            positions: snapshot.positions.to_vec(),
            ids: snapshot.ids.to_vec(),
            primitives: snapshot.primitives.to_vec(),
        });
        Ok(())
    }
}

/// One HDF5 file per snapshot, with a `Header` and a `Particles` group.
#[cfg(feature = "hdf5")]
pub struct Hdf5SnapshotWriter {
    directory: PathBuf,
}

#[cfg(feature = "hdf5")]
impl Hdf5SnapshotWriter {
    pub fn new<P: AsRef<Path>>(directory: P) -> Self {
        Self {
            directory: directory.as_ref().to_path_buf(),
        }
    }
}

#[cfg(feature = "hdf5")]
impl SnapshotWriter for Hdf5SnapshotWriter {
    fn write(&mut self, name: &str, snapshot: &Snapshot) -> Result<(), SnapshotError> {
        let path = self.directory.join(format!("{name}.hdf5"));
        let file = hdf5::File::create(&path)?;

        let header = file.create_group("Header")?;
        header_attr!(header, "Time", snapshot.time)?;
        header_attr!(header, "Step", snapshot.step as u64)?;
        header_attr!(header, "NumPart", snapshot.positions.len() as u64)?;

        let particles = file.create_group("Particles")?;
        let primitives = snapshot.primitives;
        particle_dataset!(
            particles,
            "Coordinates",
            snapshot.positions.iter().map(|x| x.to_array())
        )?;
        particle_dataset!(particles, "ParticleIDs", snapshot.ids.iter().copied())?;
        particle_dataset!(particles, "Densities", primitives.iter().map(|w| w.density()))?;
        particle_dataset!(
            particles,
            "Velocities",
            primitives.iter().map(|w| w.velocity().to_array())
        )?;
        particle_dataset!(particles, "Pressures", primitives.iter().map(|w| w.pressure()))?;
        log::debug!("Wrote snapshot to {}", path.display());
        Ok(())
    }
}
