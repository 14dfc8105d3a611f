use glam::DVec3;
use rayon::prelude::*;

use crate::{
    errors::GeometryError,
    particle::ParticleIndex,
    physical_quantities::{Primitive, State},
    voronoi::Tessellation,
};

/// A face between the real cell `left` and its neighbour `right` (real or ghost).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceInfo {
    pub left: usize,
    pub right: usize,
    pub area: f64,
    pub centroid: DVec3,
    /// Unit vector pointing from `left` to `right`.
    pub normal: DVec3,
    pub velocity: DVec3,
    pub primitives_left: State<Primitive>,
    pub primitives_right: State<Primitive>,
}

/// Enumerate every face with at least one real cell exactly once.
///
/// Real-real faces are listed with `left < right`, real-ghost faces always with the ghost on the
/// right. The states are the (unreconstructed) cell averages.
pub fn faces_for_flux(
    positions: &[DVec3],
    primitives: &[State<Primitive>],
    velocities: &[DVec3],
    particle_index: &ParticleIndex,
    tessellation: &Tessellation,
) -> Result<Vec<FaceInfo>, GeometryError> {
    let per_cell = particle_index
        .real()
        .into_par_iter()
        .map(|left| {
            tessellation
                .neighbors()
                .valid_neighbors(left)
                .filter(|&(_, right)| right > left)
                .map(|(entry, right)| {
                    let (area, centroid) = tessellation.face_area_centroid(left, entry)?;
                    let normal = (positions[right] - positions[left]).normalize_or_zero();
                    Ok(FaceInfo {
                        left,
                        right,
                        area,
                        centroid,
                        normal,
                        velocity: 0.5 * (velocities[left] + velocities[right]),
                        primitives_left: primitives[left],
                        primitives_right: primitives[right],
                    })
                })
                .collect::<Result<Vec<_>, GeometryError>>()
        })
        .collect::<Result<Vec<_>, GeometryError>>()?;
    Ok(per_cell.into_iter().flatten().collect())
}
