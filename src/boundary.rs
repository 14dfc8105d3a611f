use std::collections::BTreeSet;

use glam::DVec3;
use log::debug;

use crate::{
    config::SpaceCfg,
    errors::{BoundaryError, ConfigError, HydroError},
    particle::{GhostEntry, ParticleIndex},
    physical_quantities::{Gradients, Primitive, State},
    utils::{box_reflect, box_wrap, HydroDimension},
    voronoi::{tessellate, Tessellation},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Boundary {
    Periodic,
    Reflective,
    Open,
    Vacuum,
}

impl TryFrom<&str> for Boundary {
    type Error = ConfigError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "periodic" => Ok(Boundary::Periodic),
            "reflective" => Ok(Boundary::Reflective),
            "open" => Ok(Boundary::Open),
            "vacuum" => Ok(Boundary::Vacuum),
            _ => Err(ConfigError::UnknownBoundaryConditions(value.to_string())),
        }
    }
}

/// Walls of the box a particle lies next to (or beyond): per axis `-1` for the minimum wall, `1`
/// for the maximum wall and `0` for neither.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Crossing([i8; 3]);

impl Crossing {
    pub fn new(sides: [i8; 3]) -> Self {
        Self(sides.map(|s| s.signum()))
    }

    pub fn side(&self, axis: usize) -> i8 {
        self.0[axis]
    }

    pub fn is_empty(&self) -> bool {
        self.0 == [0; 3]
    }

    /// Union of two crossings of distinct axes (a corner or edge crossing).
    pub fn combine(&self, other: &Crossing) -> Option<Crossing> {
        let mut combined = self.0;
        for axis in 0..3 {
            match (self.0[axis], other.0[axis]) {
                (_, 0) => (),
                (0, s) => combined[axis] = s,
                _ => return None,
            }
        }
        Some(Crossing(combined))
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BoundaryClass {
    Interior,
    Exterior { kind: Boundary, crossing: Crossing },
}

/// Affine map `x -> sign * x + offset` taking a real particle onto one of its ghost images.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GhostImage {
    sign: DVec3,
    offset: DVec3,
}

impl GhostImage {
    pub fn identity() -> Self {
        Self {
            sign: DVec3::ONE,
            offset: DVec3::ZERO,
        }
    }

    pub fn translation(offset: DVec3) -> Self {
        Self {
            sign: DVec3::ONE,
            offset,
        }
    }

    pub fn sign(&self) -> DVec3 {
        self.sign
    }

    pub fn offset(&self) -> DVec3 {
        self.offset
    }

    pub fn point(&self, x: DVec3) -> DVec3 {
        self.sign * x + self.offset
    }

    pub fn vector(&self, v: DVec3) -> DVec3 {
        self.sign * v
    }

    pub fn primitives(&self, primitives: &State<Primitive>) -> State<Primitive> {
        State::<Primitive>::new(
            primitives.density(),
            self.vector(primitives.velocity()),
            primitives.pressure(),
        )
    }

    /// Gradients of the imaged primitive field: scalars pick up the sign of every axis, velocity
    /// component `k` additionally the sign of axis `k`.
    pub fn gradients(&self, gradients: &Gradients<Primitive>) -> Gradients<Primitive> {
        let mut mapped = *gradients;
        mapped[0] = self.sign * gradients[0];
        for k in 0..3 {
            mapped[k + 1] = self.sign[k] * self.sign * gradients[k + 1];
        }
        mapped[4] = self.sign * gradients[4];
        mapped
    }
}

/// Capabilities of a boundary condition needed by the ghost generator and the advector.
pub trait BoundaryCondition: Send + Sync {
    fn classify(&self, point: DVec3) -> BoundaryClass;

    /// The image of a real particle next to the walls of `crossing`.
    fn ghost_image(&self, crossing: Crossing) -> Result<GhostImage, BoundaryError>;

    /// Bring a generator that drifted out of the domain back in.
    fn restore(&self, position: &mut DVec3);

    fn classify_and_reflect(
        &self,
        point: DVec3,
    ) -> Result<Option<(GhostImage, Boundary)>, BoundaryError> {
        match self.classify(point) {
            BoundaryClass::Interior => Ok(None),
            BoundaryClass::Exterior { kind, crossing } => {
                Ok(Some((self.ghost_image(crossing)?, kind)))
            }
        }
    }
}

/// Rectangular simulation box with a single kind of boundary condition on all walls.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Domain {
    min: DVec3,
    max: DVec3,
    boundary: Boundary,
    dimensionality: HydroDimension,
}

impl Domain {
    pub fn new(
        min: DVec3,
        max: DVec3,
        boundary: Boundary,
        dimensionality: HydroDimension,
    ) -> Self {
        Self {
            min: dimensionality.project(min),
            max: dimensionality.project(max),
            boundary,
            dimensionality,
        }
    }

    /// Box `[0, box_size)` as configured in the `space` section.
    pub fn from_config(space_cfg: &SpaceCfg) -> Self {
        Self::new(
            DVec3::ZERO,
            space_cfg.box_size,
            space_cfg.boundary,
            space_cfg.dimensionality,
        )
    }

    pub fn min(&self) -> DVec3 {
        self.min
    }

    pub fn max(&self) -> DVec3 {
        self.max
    }

    pub fn box_size(&self) -> DVec3 {
        self.max - self.min
    }

    pub fn volume(&self) -> f64 {
        let size = self.box_size();
        match self.dimensionality {
            HydroDimension::HydroDimension2D => size.x * size.y,
            HydroDimension::HydroDimension3D => size.x * size.y * size.z,
        }
    }

    pub fn boundary(&self) -> Boundary {
        self.boundary
    }

    pub fn dimensionality(&self) -> HydroDimension {
        self.dimensionality
    }
}

impl BoundaryCondition for Domain {
    fn classify(&self, point: DVec3) -> BoundaryClass {
        let mut sides = [0; 3];
        for (axis, side) in sides.iter_mut().enumerate().take(self.dimensionality.dim()) {
            if point[axis] < self.min[axis] {
                *side = -1;
            } else if point[axis] > self.max[axis] {
                *side = 1;
            }
        }
        let crossing = Crossing(sides);
        if crossing.is_empty() {
            BoundaryClass::Interior
        } else {
            BoundaryClass::Exterior {
                kind: self.boundary,
                crossing,
            }
        }
    }

    fn ghost_image(&self, crossing: Crossing) -> Result<GhostImage, BoundaryError> {
        let mut image = GhostImage::identity();
        for axis in 0..self.dimensionality.dim() {
            let side = crossing.side(axis);
            if side == 0 {
                continue;
            }
            let wall = if side < 0 {
                self.min[axis]
            } else {
                self.max[axis]
            };
            match self.boundary {
                Boundary::Reflective => {
                    image.sign[axis] = -1.;
                    image.offset[axis] = 2. * wall;
                }
                Boundary::Periodic => {
                    // The image is needed on the opposite side of the box
                    image.offset[axis] = -f64::from(side) * (self.max[axis] - self.min[axis]);
                }
                Boundary::Open | Boundary::Vacuum => {
                    return Err(BoundaryError::Unsupported(self.boundary))
                }
            }
        }
        Ok(image)
    }

    fn restore(&self, position: &mut DVec3) {
        match self.boundary {
            Boundary::Periodic => {
                box_wrap(self.min, self.max, position, self.dimensionality.dim())
            }
            Boundary::Reflective => {
                box_reflect(self.min, self.max, position, self.dimensionality.dim())
            }
            Boundary::Open | Boundary::Vacuum => (),
        }
    }
}

/// Synthesize the ghost particles for the current real particles.
///
/// `positions` and `tessellation` describe the previous particle set (real particles first,
/// possibly followed by the ghosts of the previous step). The returned positions hold the
/// unchanged real particles followed by one ghost per (particle, crossing).
pub fn update_boundaries<B: BoundaryCondition + ?Sized>(
    positions: &[DVec3],
    particle_index: &ParticleIndex,
    tessellation: &Tessellation,
    boundary: &B,
    dimensionality: HydroDimension,
) -> Result<(Vec<DVec3>, ParticleIndex), BoundaryError> {
    let num_real = particle_index.num_real();
    let neighbors = tessellation.neighbors();

    let mut first_layer: Vec<BTreeSet<Crossing>> = vec![BTreeSet::new(); num_real];
    for (i, crossings) in first_layer.iter_mut().enumerate() {
        let x = positions[i];
        if !x.is_finite() {
            return Err(BoundaryError::Unclassifiable {
                particle: i,
                position: x.to_array(),
            });
        }
        let mut on_boundary = neighbors.neighbors(i).contains(&crate::voronoi::SENTINEL);
        let mut h: f64 = 0.;
        for (entry, j) in neighbors.valid_neighbors(i) {
            h = h.max(x.distance(positions[j]));
            on_boundary |= tessellation.faces().is_unbounded(entry);
            if let BoundaryClass::Exterior { crossing, .. } = boundary.classify(positions[j]) {
                crossings.insert(crossing);
                on_boundary = true;
            }
        }
        if on_boundary && h > 0. {
            for axis in 0..dimensionality.dim() {
                for direction in [-1., 1.] {
                    let mut shifted = x;
                    shifted[axis] += direction * h;
                    if let BoundaryClass::Exterior { crossing, .. } = boundary.classify(shifted) {
                        crossings.insert(crossing);
                    }
                }
            }
        }
    }

    // Second layer: the real neighbours of boundary particles
    let mut crossings = first_layer.clone();
    for (i, first) in first_layer.iter().enumerate() {
        if first.is_empty() {
            continue;
        }
        for (_, j) in neighbors.valid_neighbors(i) {
            if j < num_real {
                crossings[j].extend(first.iter().copied());
            }
        }
    }

    // Edge and corner images
    for set in crossings.iter_mut() {
        loop {
            let current: &BTreeSet<Crossing> = set;
            let combined: Vec<Crossing> = current
                .iter()
                .flat_map(|a| current.iter().filter_map(move |b| a.combine(b)))
                .filter(|c| !current.contains(c))
                .collect();
            if combined.is_empty() {
                break;
            }
            set.extend(combined);
        }
    }

    let mut augmented = positions[..num_real].to_vec();
    let mut ghosts = vec![];
    for (origin, set) in crossings.iter().enumerate() {
        for crossing in set.iter() {
            let image = boundary.ghost_image(*crossing)?;
            augmented.push(image.point(positions[origin]));
            ghosts.push(GhostEntry { origin, image });
        }
    }
    debug!(
        "Generated {} ghost particles for {} real particles",
        ghosts.len(),
        num_real
    );

    Ok((augmented, ParticleIndex::new(num_real, ghosts)))
}

/// Ghosts for a set of real particles that has no tessellation yet.
///
/// The generators alone are tessellated first; a second pass on the augmented set picks up the
/// particles whose cells only reach the walls once the first ghosts are in place.
pub fn bootstrap_ghosts<B: BoundaryCondition + ?Sized>(
    positions: &[DVec3],
    boundary: &B,
    dimensionality: HydroDimension,
) -> Result<(Vec<DVec3>, ParticleIndex), HydroError> {
    let real_only = ParticleIndex::real_only(positions.len());
    let tessellation = tessellate(positions, dimensionality)?;
    let (augmented, index) =
        update_boundaries(positions, &real_only, &tessellation, boundary, dimensionality)?;
    let tessellation = tessellate(&augmented, dimensionality)?;
    Ok(update_boundaries(
        &augmented,
        &index,
        &tessellation,
        boundary,
        dimensionality,
    )?)
}

#[cfg(test)]
mod test {
    use float_cmp::assert_approx_eq;
    use glam::DVec3;

    use super::*;
    use crate::voronoi::volume_center_mass;

    fn unit_square(boundary: Boundary) -> Domain {
        Domain::new(
            DVec3::ZERO,
            DVec3::ONE,
            boundary,
            HydroDimension::HydroDimension2D,
        )
    }

    fn grid(n: usize) -> Vec<DVec3> {
        let dx = 1. / n as f64;
        (0..n * n)
            .map(|k| DVec3::new(((k % n) as f64 + 0.5) * dx, ((k / n) as f64 + 0.5) * dx, 0.))
            .collect()
    }

    #[test]
    fn test_classify() {
        let domain = unit_square(Boundary::Reflective);
        assert_eq!(domain.classify(DVec3::splat(0.5)), BoundaryClass::Interior);
        assert_eq!(
            domain.classify(DVec3::new(-0.1, 1.2, 0.)),
            BoundaryClass::Exterior {
                kind: Boundary::Reflective,
                crossing: Crossing::new([-1, 1, 0])
            }
        );
        // The z coordinate is ignored in 2D
        assert_eq!(domain.classify(DVec3::new(0.5, 0.5, 3.)), BoundaryClass::Interior);
    }

    #[test]
    fn test_reflective_image() {
        let domain = unit_square(Boundary::Reflective);
        let image = domain.ghost_image(Crossing::new([1, 0, 0])).unwrap();
        let ghost = image.point(DVec3::new(0.9, 0.3, 0.));
        assert_approx_eq!(f64, ghost.x, 1.1);
        assert_approx_eq!(f64, ghost.y, 0.3);
        let primitives = State::<Primitive>::new(1., DVec3::new(0.5, -0.25, 0.), 2.);
        let mirrored = image.primitives(&primitives);
        assert_approx_eq!(f64, mirrored.velocity().x, -0.5);
        assert_approx_eq!(f64, mirrored.velocity().y, -0.25);
        assert_approx_eq!(f64, mirrored.pressure(), 2.);

        let mut gradients = Gradients::<Primitive>::zeros();
        gradients[0] = DVec3::new(1., 2., 0.);
        gradients[1] = DVec3::new(3., 4., 0.);
        gradients[2] = DVec3::new(5., 6., 0.);
        let mapped = image.gradients(&gradients);
        assert_eq!(mapped[0], DVec3::new(-1., 2., 0.));
        assert_eq!(mapped[1], DVec3::new(3., -4., 0.));
        assert_eq!(mapped[2], DVec3::new(-5., 6., 0.));
    }

    #[test]
    fn test_periodic_image() {
        let domain = unit_square(Boundary::Periodic);
        let image = domain.ghost_image(Crossing::new([-1, 1, 0])).unwrap();
        let ghost = image.point(DVec3::new(0.1, 0.95, 0.));
        assert_approx_eq!(f64, ghost.x, 1.1);
        assert_approx_eq!(f64, ghost.y, -0.05, epsilon = 1e-12);
        assert_eq!(image.vector(DVec3::X), DVec3::X);
    }

    #[test]
    fn test_unsupported() {
        let domain = unit_square(Boundary::Open);
        assert_eq!(
            domain.ghost_image(Crossing::new([1, 0, 0])),
            Err(BoundaryError::Unsupported(Boundary::Open))
        );
        let positions = grid(4);
        let tessellation = tessellate(&positions, HydroDimension::HydroDimension2D).unwrap();
        let result = update_boundaries(
            &positions,
            &ParticleIndex::real_only(16),
            &tessellation,
            &domain,
            HydroDimension::HydroDimension2D,
        );
        assert!(matches!(result, Err(BoundaryError::Unsupported(Boundary::Open))));
    }

    fn check_closed_cells(boundary: Boundary) {
        let domain = unit_square(boundary);
        let positions = grid(8);
        let tessellation = tessellate(&positions, HydroDimension::HydroDimension2D).unwrap();
        let (augmented, index) = update_boundaries(
            &positions,
            &ParticleIndex::real_only(positions.len()),
            &tessellation,
            &domain,
            HydroDimension::HydroDimension2D,
        )
        .unwrap();
        assert_eq!(index.num_real(), positions.len());
        assert_eq!(&augmented[..positions.len()], &positions[..]);
        assert!(index.num_ghost() > 0);
        for ghost in index.ghosts() {
            assert!(ghost.origin < positions.len());
        }

        let tessellation = tessellate(&augmented, HydroDimension::HydroDimension2D).unwrap();
        let cells = volume_center_mass(
            &augmented,
            &tessellation,
            &index,
            HydroDimension::HydroDimension2D,
        )
        .unwrap();
        let total: f64 = cells.iter().map(|c| c.volume).sum();
        assert_approx_eq!(f64, total, 1., epsilon = 1e-10);
        for cell in cells {
            assert_approx_eq!(f64, cell.volume, 1. / 64., epsilon = 1e-10);
        }

        // Regenerating from a tessellation that already contains ghosts gives the same set
        let (again, index_again) = update_boundaries(
            &augmented,
            &index,
            &tessellation,
            &domain,
            HydroDimension::HydroDimension2D,
        )
        .unwrap();
        assert_eq!(index_again.num_real(), index.num_real());
        let tessellation = tessellate(&again, HydroDimension::HydroDimension2D).unwrap();
        let cells =
            volume_center_mass(&again, &tessellation, &index_again, HydroDimension::HydroDimension2D)
                .unwrap();
        let total: f64 = cells.iter().map(|c| c.volume).sum();
        assert_approx_eq!(f64, total, 1., epsilon = 1e-10);
    }

    #[test]
    fn test_reflective_ghosts_close_cells() {
        check_closed_cells(Boundary::Reflective);
    }

    #[test]
    fn test_periodic_ghosts_close_cells() {
        check_closed_cells(Boundary::Periodic);
    }

    #[test]
    fn test_restore() {
        let mut p = DVec3::new(1.1, -0.2, 0.);
        unit_square(Boundary::Periodic).restore(&mut p);
        assert_approx_eq!(f64, p.x, 0.1, epsilon = 1e-12);
        assert_approx_eq!(f64, p.y, 0.8);
        let mut p = DVec3::new(1.1, -0.2, 0.);
        unit_square(Boundary::Reflective).restore(&mut p);
        assert_approx_eq!(f64, p.x, 0.9, epsilon = 1e-12);
        assert_approx_eq!(f64, p.y, 0.2);
    }
}
