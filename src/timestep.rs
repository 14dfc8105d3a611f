use rayon::prelude::*;

use crate::{
    comm::Communicator,
    errors::HydroError,
    errors::PhysicsError,
    gas_law::GasLaw,
    physical_quantities::{Primitive, State},
    utils::HydroDimension,
    voronoi::CellInfo,
};

/// Largest signal speed of the state: max(|u - c|, |u|, |u + c|).
fn signal_speed(primitives: &State<Primitive>, sound_speed: f64) -> f64 {
    let u = primitives.velocity().length();
    (u - sound_speed).abs().max(u).max(u + sound_speed)
}

/// Local CFL time step candidate over the real cells.
pub fn local_dt(
    cells: &[CellInfo],
    primitives: &[State<Primitive>],
    eos: &GasLaw,
    cfl: f64,
    dimensionality: HydroDimension,
) -> Result<f64, PhysicsError> {
    cells
        .par_iter()
        .zip(primitives.par_iter())
        .enumerate()
        .map(|(cell, (info, primitives))| {
            let primitives = primitives.check_physical(cell)?;
            let c = primitives.sound_speed(eos);
            let radius = dimensionality.effective_radius(info.volume);
            Ok(cfl * radius / signal_speed(&primitives, c))
        })
        .try_reduce(|| f64::INFINITY, |a, b| Ok(a.min(b)))
}

/// Global time step: the minimum of the local candidates of all ranks, clipped so that the
/// simulation does not step past `max_time`.
#[allow(clippy::too_many_arguments)]
pub fn compute_dt<C: Communicator>(
    cells: &[CellInfo],
    primitives: &[State<Primitive>],
    eos: &GasLaw,
    cfl: f64,
    time: f64,
    max_time: f64,
    dimensionality: HydroDimension,
    comm: &C,
) -> Result<f64, HydroError> {
    let dt = local_dt(cells, primitives, eos, cfl, dimensionality)?;
    let dt = comm.all_reduce_min(dt)?;
    Ok(dt.min(max_time - time))
}
