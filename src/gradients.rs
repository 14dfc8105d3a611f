use glam::{DMat3, DVec3};
use log::debug;
use rayon::prelude::*;

use crate::{
    errors::{ConfigError, GeometryError},
    faces::FaceInfo,
    gas_law::GasLaw,
    particle::ParticleIndex,
    physical_quantities::{Gradients, Primitive, State},
    utils::HydroDimension,
    voronoi::{CellInfo, Tessellation},
};

/// Estimates per-cell gradients of the primitive variables.
///
/// The result covers every particle: real cells first, followed by the ghosts, whose gradients
/// are the mapped gradients of the cell they originate from.
pub trait Reconstruction: Send + Sync {
    fn gradients(
        &self,
        positions: &[DVec3],
        primitives: &[State<Primitive>],
        particle_index: &ParticleIndex,
        cells: &[CellInfo],
        tessellation: &Tessellation,
        dimensionality: HydroDimension,
    ) -> Result<Vec<Gradients<Primitive>>, GeometryError>;
}

pub fn reconstruction_from_config(kind: &str) -> Result<Box<dyn Reconstruction>, ConfigError> {
    match kind {
        "constant" | "piecewise_constant" => Ok(Box::new(PiecewiseConstant)),
        "linear" | "piecewise_linear" => Ok(Box::new(PiecewiseLinear)),
        _ => Err(ConfigError::UnknownReconstruction(kind.to_string())),
    }
}

/// First order: zero gradients everywhere.
pub struct PiecewiseConstant;

impl Reconstruction for PiecewiseConstant {
    fn gradients(
        &self,
        _positions: &[DVec3],
        _primitives: &[State<Primitive>],
        particle_index: &ParticleIndex,
        _cells: &[CellInfo],
        _tessellation: &Tessellation,
        _dimensionality: HydroDimension,
    ) -> Result<Vec<Gradients<Primitive>>, GeometryError> {
        Ok(vec![Gradients::zeros(); particle_index.len()])
    }
}

/// Weighted least squares gradients over the Voronoi neighbours, limited with a cell wide
/// slope limiter.
pub struct PiecewiseLinear;

impl Reconstruction for PiecewiseLinear {
    fn gradients(
        &self,
        _positions: &[DVec3],
        primitives: &[State<Primitive>],
        particle_index: &ParticleIndex,
        cells: &[CellInfo],
        tessellation: &Tessellation,
        dimensionality: HydroDimension,
    ) -> Result<Vec<Gradients<Primitive>>, GeometryError> {
        let mut gradients = particle_index
            .real()
            .into_par_iter()
            .map(|cell| {
                let centroid = cells[cell].centroid;
                let mut faces = Vec::with_capacity(tessellation.neighbors().counts()[cell]);
                for (entry, other) in tessellation.neighbors().valid_neighbors(cell) {
                    let (area, face_centroid) = tessellation.face_area_centroid(cell, entry)?;
                    faces.push((other, area, face_centroid));
                }

                let mut gradient_data = GradientData::init(dimensionality);
                for &(other, area, _) in faces.iter() {
                    let ds = cell_centroid(other, cells, particle_index) - centroid;
                    gradient_data.collect(
                        &primitives[cell],
                        &primitives[other],
                        area / ds.length_squared(),
                        ds,
                    );
                }
                let mut gradients = gradient_data.finalize();
                if !gradients.is_finite() {
                    debug!("Singular gradient matrix for cell {cell}, falling back to first order");
                    return Ok(Gradients::zeros());
                }

                let mut limiter = LimiterData::init(&primitives[cell]);
                for &(other, _, face_centroid) in faces.iter() {
                    let extrapolated = gradients.dot(face_centroid - centroid);
                    limiter.collect(&primitives[other], &extrapolated);
                }
                limiter.limit(&mut gradients, &primitives[cell]);
                debug_assert!(gradients.is_finite());

                Ok(gradients)
            })
            .collect::<Result<Vec<_>, GeometryError>>()?;

        let ghost_gradients: Vec<_> = particle_index
            .ghosts()
            .iter()
            .map(|ghost| ghost.image.gradients(&gradients[ghost.origin]))
            .collect();
        gradients.extend(ghost_gradients);
        Ok(gradients)
    }
}

/// Centroid of any particle's cell. Ghost cells are the images of the cells they originate from.
pub(crate) fn cell_centroid(idx: usize, cells: &[CellInfo], particle_index: &ParticleIndex) -> DVec3 {
    match particle_index.ghost_entry(idx) {
        Some(ghost) => ghost.image.point(cells[ghost.origin].centroid),
        None => cells[idx].centroid,
    }
}

pub struct GradientData {
    gradients: Gradients<Primitive>,
    matrix_wls: DMat3,
}

impl GradientData {
    pub fn init(dimensionality: HydroDimension) -> Self {
        let matrix_wls = match dimensionality {
            HydroDimension::HydroDimension2D => {
                let mut mat = DMat3::ZERO;
                mat.z_axis.z = 1.;
                mat
            }
            HydroDimension::HydroDimension3D => DMat3::ZERO,
        };

        Self {
            gradients: Gradients::zeros(),
            matrix_wls,
        }
    }

    pub fn collect(
        &mut self,
        primitives_left: &State<Primitive>,
        primitives_right: &State<Primitive>,
        w: f64,
        ds: DVec3,
    ) {
        for i in 0..5 {
            self.gradients[i] += w * (primitives_right[i] - primitives_left[i]) * ds;
        }
        self.matrix_wls += DMat3::from_cols(w * ds.x * ds, w * ds.y * ds, w * ds.z * ds);
    }

    pub fn finalize(mut self) -> Gradients<Primitive> {
        let matrix_wls = self.matrix_wls.inverse();
        for i in 0..5 {
            self.gradients[i] = matrix_wls.mul_vec3(self.gradients[i]);
        }
        self.gradients
    }
}

/// Cell wide limiter: the extrapolated values at the faces may not exceed the range spanned by
/// the neighbouring cells.
pub struct LimiterData {
    min: State<Primitive>,
    max: State<Primitive>,
    e_min: State<Primitive>,
    e_max: State<Primitive>,
}

impl LimiterData {
    pub fn init(primitives: &State<Primitive>) -> Self {
        Self {
            min: *primitives,
            max: *primitives,
            e_min: State::splat(f64::INFINITY),
            e_max: State::splat(f64::NEG_INFINITY),
        }
    }

    pub fn collect(&mut self, primitives: &State<Primitive>, extrapolated: &State<Primitive>) {
        self.min = self.min.pairwise_min(primitives);
        self.max = self.max.pairwise_max(primitives);
        self.e_min = self.e_min.pairwise_min(extrapolated);
        self.e_max = self.e_max.pairwise_max(extrapolated);
    }

    fn limit_single_quantity(max: f64, min: f64, e_max: f64, e_min: f64) -> f64 {
        let alpha_max = if e_max > 0. { max / e_max } else { 1. };
        let alpha_min = if e_min < 0. { min / e_min } else { 1. };
        alpha_max.min(alpha_min).clamp(0., 1.)
    }

    pub fn limit(&self, gradients: &mut Gradients<Primitive>, primitives: &State<Primitive>) {
        for i in 0..5 {
            let alpha = Self::limit_single_quantity(
                self.max[i] - primitives[i],
                self.min[i] - primitives[i],
                self.e_max[i],
                self.e_min[i],
            );
            gradients[i] *= alpha;
        }
    }
}

/// Half time step prediction of a state from its spatial gradients, in the frame moving with
/// velocity `w`.
fn predict(
    primitives: &State<Primitive>,
    gradients: &Gradients<Primitive>,
    w: DVec3,
    dt: f64,
    eos: &GasLaw,
) -> State<Primitive> {
    let rho = primitives.density();
    let v = primitives.velocity();
    let p = primitives.pressure();
    let v_rel = v - w;
    let div_v = gradients[1].x + gradients[2].y + gradients[3].z;
    let grad_p = gradients[4];

    let d_rho = -v_rel.dot(gradients[0]) - rho * div_v;
    let d_v = DVec3::new(
        -v_rel.dot(gradients[1]),
        -v_rel.dot(gradients[2]),
        -v_rel.dot(gradients[3]),
    ) - grad_p / rho;
    let d_p = -v_rel.dot(grad_p) - eos.gamma().gamma() * p * div_v;

    State::<Primitive>::new(rho + dt * d_rho, v + dt * d_v, p + dt * d_p)
}

/// Replace the cell averages stored in the faces by the states reconstructed at the face
/// centroids, predicted over half the time step.
///
/// A reconstructed state that is not physical falls back to the cell average.
#[allow(clippy::too_many_arguments)]
pub fn extrapolate_to_faces(
    faces: &mut [FaceInfo],
    primitives: &[State<Primitive>],
    gradients: &[Gradients<Primitive>],
    velocities: &[DVec3],
    cells: &[CellInfo],
    particle_index: &ParticleIndex,
    dt: f64,
    eos: &GasLaw,
) {
    let extrapolate = |idx: usize, face_centroid: DVec3| {
        let centroid = cell_centroid(idx, cells, particle_index);
        let predicted = predict(&primitives[idx], &gradients[idx], velocities[idx], 0.5 * dt, eos);
        let extrapolated = predicted + gradients[idx].dot(face_centroid - centroid);
        extrapolated.check_physical(idx).unwrap_or(primitives[idx])
    };
    faces.par_iter_mut().for_each(|face| {
        face.primitives_left = extrapolate(face.left, face.centroid);
        face.primitives_right = extrapolate(face.right, face.centroid);
    });
}

#[cfg(test)]
mod test {
    use float_cmp::assert_approx_eq;

    use super::*;
    use crate::{
        boundary::{update_boundaries, Boundary, Domain},
        faces::faces_for_flux,
        voronoi::{tessellate, volume_center_mass},
    };

    fn setup(
        n: usize,
        boundary: Boundary,
    ) -> (Vec<DVec3>, ParticleIndex, Tessellation, Vec<CellInfo>) {
        let dx = 1. / n as f64;
        let dim = HydroDimension::HydroDimension2D;
        let positions: Vec<DVec3> = (0..n * n)
            .map(|k| DVec3::new(((k % n) as f64 + 0.5) * dx, ((k / n) as f64 + 0.5) * dx, 0.))
            .collect();
        let domain = Domain::new(DVec3::ZERO, DVec3::ONE, boundary, dim);
        let bootstrap = tessellate(&positions, dim).unwrap();
        let (positions, index) = update_boundaries(
            &positions,
            &ParticleIndex::real_only(n * n),
            &bootstrap,
            &domain,
            dim,
        )
        .unwrap();
        let tessellation = tessellate(&positions, dim).unwrap();
        let cells = volume_center_mass(&positions, &tessellation, &index, dim).unwrap();
        (positions, index, tessellation, cells)
    }

    fn with_ghosts(
        real: Vec<State<Primitive>>,
        index: &ParticleIndex,
    ) -> Vec<State<Primitive>> {
        let ghosts: Vec<_> = index
            .ghosts()
            .iter()
            .map(|ghost| ghost.image.primitives(&real[ghost.origin]))
            .collect();
        real.into_iter().chain(ghosts).collect()
    }

    #[test]
    fn test_unknown_reconstruction() {
        assert!(reconstruction_from_config("linear").is_ok());
        assert!(matches!(
            reconstruction_from_config("parabolic"),
            Err(ConfigError::UnknownReconstruction(_))
        ));
    }

    #[test]
    fn test_constant() {
        let (positions, index, tessellation, cells) = setup(4, Boundary::Reflective);
        let primitives = vec![State::<Primitive>::new(1., DVec3::ZERO, 1.); index.len()];
        let gradients = PiecewiseConstant
            .gradients(
                &positions,
                &primitives,
                &index,
                &cells,
                &tessellation,
                HydroDimension::HydroDimension2D,
            )
            .unwrap();
        assert_eq!(gradients.len(), index.len());
        assert!(gradients.iter().all(|g| *g == Gradients::zeros()));
    }

    #[test]
    fn test_linear_field() {
        // A linear density field is reproduced exactly away from the walls
        let n = 6;
        let (positions, index, tessellation, cells) = setup(n, Boundary::Periodic);
        let real = (0..n * n)
            .map(|i| State::<Primitive>::new(1. + 0.5 * cells[i].centroid.y, DVec3::ZERO, 1.))
            .collect();
        let primitives = with_ghosts(real, &index);
        let gradients = PiecewiseLinear
            .gradients(
                &positions,
                &primitives,
                &index,
                &cells,
                &tessellation,
                HydroDimension::HydroDimension2D,
            )
            .unwrap();
        assert_eq!(gradients.len(), index.len());
        for i in n..n * (n - 1) {
            assert_approx_eq!(f64, gradients[i][0].x, 0., epsilon = 1e-10);
            assert_approx_eq!(f64, gradients[i][0].y, 0.5, epsilon = 1e-10);
            assert_approx_eq!(f64, gradients[i][4].length(), 0., epsilon = 1e-10);
        }
        // Periodic images have the same gradients as their origin
        for ghost in index.num_real()..index.len() {
            assert_eq!(gradients[ghost], gradients[index.origin(ghost)]);
        }
    }

    #[test]
    fn test_limiter_extrema() {
        // A single peak may not be extrapolated beyond its neighbours
        let n = 5;
        let (positions, index, tessellation, cells) = setup(n, Boundary::Reflective);
        let mut real = vec![State::<Primitive>::new(1., DVec3::ZERO, 1.); n * n];
        real[12] = State::<Primitive>::new(2., DVec3::ZERO, 2.);
        let primitives = with_ghosts(real, &index);
        let gradients = PiecewiseLinear
            .gradients(
                &positions,
                &primitives,
                &index,
                &cells,
                &tessellation,
                HydroDimension::HydroDimension2D,
            )
            .unwrap();
        assert_approx_eq!(f64, gradients[12][0].length(), 0., epsilon = 1e-12);
        assert_approx_eq!(f64, gradients[12][4].length(), 0., epsilon = 1e-12);

        let velocities = vec![DVec3::ZERO; index.len()];
        let mut faces =
            faces_for_flux(&positions, &primitives, &velocities, &index, &tessellation).unwrap();
        extrapolate_to_faces(
            &mut faces,
            &primitives,
            &gradients,
            &velocities,
            &cells,
            &index,
            0.,
            &GasLaw::ideal(1.4),
        );
        for face in faces.iter() {
            for state in [face.primitives_left, face.primitives_right] {
                assert!(state.density() >= 1. - 1e-12 && state.density() <= 2. + 1e-12);
            }
        }
    }

    #[test]
    fn test_prediction() {
        let eos = GasLaw::ideal(1.4);
        let primitives = State::<Primitive>::new(1., DVec3::new(1., 0., 0.), 1.);
        let mut gradients = Gradients::<Primitive>::zeros();
        gradients[0] = DVec3::new(0.2, 0., 0.);
        gradients[1] = DVec3::new(0.1, 0., 0.);
        let predicted = predict(&primitives, &gradients, DVec3::ZERO, 0.5, &eos);
        // drho/dt = -u drho/dx - rho du/dx
        assert_approx_eq!(f64, predicted.density(), 1. - 0.5 * (0.2 + 0.1), epsilon = 1e-14);
        // du/dt = -u du/dx
        assert_approx_eq!(f64, predicted.velocity().x, 1. - 0.5 * 0.1, epsilon = 1e-14);
        // dp/dt = -gamma p du/dx
        assert_approx_eq!(f64, predicted.pressure(), 1. - 0.5 * 1.4 * 0.1, epsilon = 1e-14);

        // Comoving with the fluid only the compression terms remain
        let comoving = predict(&primitives, &gradients, DVec3::X, 0.5, &eos);
        assert_approx_eq!(f64, comoving.density(), 1. - 0.5 * 0.1, epsilon = 1e-14);
    }
}
