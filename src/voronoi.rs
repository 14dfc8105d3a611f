//! Voronoi tessellation of the generators and extraction of the cell geometry.

use std::collections::BTreeMap;

use delaunay::{prelude::DelaunayTriangulation, vertex};
use glam::DVec3;
use log::debug;
use rayon::prelude::*;
use rstar::{primitives::GeomWithData, RTree};

use crate::{errors::GeometryError, particle::ParticleIndex, utils::HydroDimension};

mod graph;

pub use graph::{FaceGraph, FlatGraph, NeighborGraph, SENTINEL};

/// Volume and centroid of a real cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellInfo {
    pub volume: f64,
    pub centroid: DVec3,
}

/// Neighbour graph, face graph and vertices of the Voronoi diagram of a point set.
#[derive(Debug, Clone, Default)]
pub struct Tessellation {
    neighbors: NeighborGraph,
    faces: FaceGraph,
    vertices: Vec<DVec3>,
    dimension: Option<HydroDimension>,
}

impl Tessellation {
    pub fn neighbors(&self) -> &NeighborGraph {
        &self.neighbors
    }

    pub fn faces(&self) -> &FaceGraph {
        &self.faces
    }

    pub fn vertices(&self) -> &[DVec3] {
        &self.vertices
    }

    pub fn num_particles(&self) -> usize {
        self.neighbors.len()
    }

    /// Resolve the vertex `vertex` of the face of `cell`.
    fn vertex(&self, cell: usize, vertex: i64) -> Result<DVec3, GeometryError> {
        usize::try_from(vertex)
            .ok()
            .and_then(|v| self.vertices.get(v))
            .copied()
            .ok_or(GeometryError::InvalidVertex {
                cell,
                vertex,
                num_vertices: self.vertices.len(),
            })
    }

    /// Area (length in 2D) and centroid of the face belonging to neighbour entry `entry` of `cell`.
    pub fn face_area_centroid(
        &self,
        cell: usize,
        entry: usize,
    ) -> Result<(f64, DVec3), GeometryError> {
        let face = self.faces.face(entry);
        let corners = face
            .iter()
            .map(|&v| self.vertex(cell, v))
            .collect::<Result<Vec<_>, _>>()?;
        match self.dimension {
            Some(HydroDimension::HydroDimension2D) => {
                let (a, b) = (corners[0], corners[corners.len() - 1]);
                Ok((a.distance(b), 0.5 * (a + b)))
            }
            _ => {
                let mut area = 0.;
                let mut centroid = DVec3::ZERO;
                for w in corners[1..].windows(2) {
                    let triangle_area = 0.5 * (w[0] - corners[0]).cross(w[1] - corners[0]).length();
                    area += triangle_area;
                    centroid += triangle_area * (corners[0] + w[0] + w[1]) / 3.;
                }
                if area > 0. {
                    centroid /= area;
                } else {
                    centroid = corners.iter().sum::<DVec3>() / corners.len() as f64;
                }
                Ok((area, centroid))
            }
        }
    }
}

type TreeNode = GeomWithData<[f64; 3], usize>;

/// Relative distance below which two generators are considered identical.
const DUPLICATE_TOLERANCE: f64 = 1e-12;
/// Relative distance below which two circumcentres are merged into one Voronoi vertex.
const VERTEX_TOLERANCE: f64 = 1e-9;

/// A Delaunay simplex, by generator index, with its circumcentre.
struct Simplex {
    vertices: Vec<usize>,
    circumcenter: DVec3,
}

fn circumcircle(a: DVec3, b: DVec3, c: DVec3) -> Option<DVec3> {
    let b = b - a;
    let c = c - a;
    let b2 = b.x * b.x + b.y * b.y;
    let c2 = c.x * c.x + c.y * c.y;
    let d = 2. * (b.x * c.y - b.y * c.x);
    if d.abs() <= f64::EPSILON * (b2 + c2) {
        return None;
    }
    Some(a + DVec3::new((c.y * b2 - b.y * c2) / d, (b.x * c2 - c.x * b2) / d, 0.))
}

fn circumsphere(a: DVec3, b: DVec3, c: DVec3, d: DVec3) -> Option<DVec3> {
    let u = b - a;
    let v = c - a;
    let w = d - a;
    let det = 2. * u.dot(v.cross(w));
    if det.abs() <= f64::EPSILON * u.length() * v.length() * w.length() {
        return None;
    }
    let offset = (u.length_squared() * v.cross(w)
        + v.length_squared() * w.cross(u)
        + w.length_squared() * u.cross(v))
        / det;
    Some(a + offset)
}

/// Corner coordinates of the cells of the Delaunay triangulation of `$points`.
macro_rules! delaunay_cells {
    ($points:expr, $dim:literal, $coords:expr) => {{
        let coords = $coords;
        let vertices: Vec<_> = $points.iter().map(|&p| vertex!(coords(p))).collect();
        let triangulation: DelaunayTriangulation<_, (), (), $dim> =
            DelaunayTriangulation::new(&vertices)
                .map_err(|err| GeometryError::Triangulation(err.to_string()))?;
        let triangulation = triangulation.as_triangulation();
        triangulation
            .cells()
            .map(|(_, cell)| {
                cell.vertices()
                    .iter()
                    .map(|&key| {
                        triangulation
                            .vertex_coords(key)
                            .map(|c| DVec3::new(c[0], c[1], if $dim == 3 { c[2] } else { 0. }))
                            .ok_or(GeometryError::DegeneratePointSet)
                    })
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?
    }};
}

/// Delaunay simplices of `points`, skipping (near) coincident generators.
fn delaunay_simplices(
    points: &[DVec3],
    dimension: HydroDimension,
) -> Result<(Vec<Simplex>, f64), GeometryError> {
    let required = dimension.simplex_size();
    if points.len() < required {
        return Err(GeometryError::InsufficientPoints {
            required,
            found: points.len(),
        });
    }
    let (min, max) = points.iter().fold(
        (DVec3::splat(f64::INFINITY), DVec3::splat(f64::NEG_INFINITY)),
        |(min, max), &p| (min.min(p), max.max(p)),
    );
    let extent = (max - min).max_element();
    if !extent.is_finite() {
        return Err(GeometryError::DegeneratePointSet);
    }

    let tolerance = DUPLICATE_TOLERANCE * extent;
    let mut tree: RTree<TreeNode> = RTree::new();
    let mut unique = vec![];
    for (i, p) in points.iter().enumerate() {
        let loc = p.to_array();
        let duplicate = tree
            .locate_within_distance(loc, tolerance * tolerance)
            .next()
            .is_some();
        if !duplicate {
            tree.insert(TreeNode::new(loc, i));
            unique.push(*p);
        }
    }
    if unique.len() < required || extent == 0. {
        return Err(GeometryError::InsufficientPoints {
            required,
            found: unique.len(),
        });
    }

    let cells = match dimension {
        HydroDimension::HydroDimension2D => delaunay_cells!(unique, 2, |p: DVec3| [p.x, p.y]),
        HydroDimension::HydroDimension3D => delaunay_cells!(unique, 3, |p: DVec3| p.to_array()),
    };

    let simplices = cells
        .into_iter()
        .map(|corners| -> Result<Simplex, GeometryError> {
            // Map the corners back onto the generators they were built from
            let vertices = corners
                .iter()
                .map(|c| {
                    tree.nearest_neighbor(&c.to_array())
                        .map(|node| node.data)
                        .ok_or(GeometryError::DegeneratePointSet)
                })
                .collect::<Result<Vec<_>, _>>()?;
            let corners: Vec<DVec3> = vertices.iter().map(|&v| points[v]).collect();
            let circumcenter = match dimension {
                HydroDimension::HydroDimension2D => {
                    circumcircle(corners[0], corners[1], corners[2])
                }
                HydroDimension::HydroDimension3D => {
                    circumsphere(corners[0], corners[1], corners[2], corners[3])
                }
            }
            .ok_or(GeometryError::DegenerateSimplex(vertices[0]))?;
            Ok(Simplex {
                vertices,
                circumcenter,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    if simplices.is_empty() {
        return Err(GeometryError::DegeneratePointSet);
    }
    Ok((simplices, VERTEX_TOLERANCE * extent))
}

/// Compute the Voronoi diagram of `positions` (real particles followed by ghosts).
///
/// Every ridge between two generators `p1` and `p2` appends `p2` to the neighbour run of `p1` (and
/// vice versa) and the ridge vertices to the matching face runs. Unbounded ridges carry
/// [`SENTINEL`] among their vertices. Generators without any ridge (e.g. duplicates) get the runs
/// `[SENTINEL]`, so that no run is ever empty.
pub fn tessellate(
    positions: &[DVec3],
    dimension: HydroDimension,
) -> Result<Tessellation, GeometryError> {
    let points: Vec<DVec3> = positions.iter().map(|&p| dimension.project(p)).collect();
    let (simplices, tolerance) = delaunay_simplices(&points, dimension)?;

    // Merge coincident circumcentres (cospherical generators) into a single vertex
    let mut tree: RTree<TreeNode> = RTree::new();
    let mut vertices = vec![];
    let simplex_vertex: Vec<i64> = simplices
        .iter()
        .map(|simplex| {
            let loc = simplex.circumcenter.to_array();
            let found = tree
                .locate_within_distance(loc, tolerance * tolerance)
                .next()
                .map(|node| node.data);
            let idx = match found {
                Some(idx) => idx,
                None => {
                    vertices.push(simplex.circumcenter);
                    tree.insert(TreeNode::new(loc, vertices.len() - 1));
                    vertices.len() - 1
                }
            };
            idx as i64
        })
        .collect();

    let mut edges: BTreeMap<(usize, usize), Vec<usize>> = BTreeMap::new();
    for (s, simplex) in simplices.iter().enumerate() {
        let nodes = &simplex.vertices;
        for (k, &a) in nodes.iter().enumerate() {
            for &b in nodes[k + 1..].iter() {
                edges.entry((a.min(b), a.max(b))).or_default().push(s);
            }
        }
    }

    let mut entries: Vec<Vec<(i64, Vec<i64>)>> = vec![vec![]; positions.len()];
    for ((p1, p2), incident) in edges.iter() {
        let ridge = match dimension {
            HydroDimension::HydroDimension2D => ridge_2d(incident, &simplex_vertex),
            HydroDimension::HydroDimension3D => {
                ridge_3d(*p1, *p2, incident, &simplices, &simplex_vertex)
            }
        };
        if let Some(ridge) = ridge {
            entries[*p1].push((*p2 as i64, ridge.clone()));
            entries[*p2].push((*p1 as i64, ridge));
        }
    }

    let mut neighbor_runs = Vec::with_capacity(positions.len());
    let mut face_runs = vec![];
    for particle_entries in entries {
        if particle_entries.is_empty() {
            neighbor_runs.push(vec![]);
            face_runs.push(vec![]);
            continue;
        }
        let mut run = Vec::with_capacity(particle_entries.len());
        for (neighbor, face) in particle_entries {
            run.push(neighbor);
            face_runs.push(face);
        }
        neighbor_runs.push(run);
    }

    let tessellation = Tessellation {
        neighbors: NeighborGraph::from_runs(neighbor_runs),
        faces: FaceGraph::from_runs(face_runs),
        vertices,
        dimension: Some(dimension),
    };
    debug!(
        "Tessellated {} generators: {} simplices, {} vertices, {} neighbour entries",
        positions.len(),
        simplices.len(),
        tessellation.vertices.len(),
        tessellation.neighbors.values().len()
    );
    Ok(tessellation)
}

/// The ridge dual to a 2D Delaunay edge.
fn ridge_2d(incident: &[usize], simplex_vertex: &[i64]) -> Option<Vec<i64>> {
    match incident {
        [a] => Some(vec![SENTINEL, simplex_vertex[*a]]),
        [a, b] if simplex_vertex[*a] != simplex_vertex[*b] => {
            Some(vec![simplex_vertex[*a], simplex_vertex[*b]])
        }
        _ => None,
    }
}

/// The ridge dual to the 3D Delaunay edge `(p1, p2)`: the circumcentres of the tetrahedra around
/// the edge, in cyclic order.
fn ridge_3d(
    p1: usize,
    p2: usize,
    incident: &[usize],
    simplices: &[Simplex],
    simplex_vertex: &[i64],
) -> Option<Vec<i64>> {
    let opposite: Vec<[usize; 2]> = incident
        .iter()
        .map(|&s| {
            let mut others = simplices[s]
                .vertices
                .iter()
                .copied()
                .filter(|&v| v != p1 && v != p2);
            [
                others.next().unwrap_or(usize::MAX),
                others.next().unwrap_or(usize::MAX),
            ]
        })
        .collect();
    let occurrences = |v: usize| opposite.iter().filter(|o| o.contains(&v)).count();

    let mut unbounded = false;
    let mut visited = vec![false; incident.len()];
    let mut ordered = vec![];
    while let Some(start) = visited.iter().position(|v| !v) {
        // Prefer starting an open chain at one of its ends
        let (start, mut incoming) = opposite
            .iter()
            .enumerate()
            .filter(|(k, _)| !visited[*k])
            .find_map(|(k, o)| o.iter().find(|&&v| occurrences(v) == 1).map(|&v| (k, v)))
            .unwrap_or((start, opposite[start][0]));
        if occurrences(incoming) == 1 || !ordered.is_empty() {
            unbounded = true;
        }
        let mut current = start;
        loop {
            visited[current] = true;
            ordered.push(simplex_vertex[incident[current]]);
            let outgoing = if opposite[current][0] == incoming {
                opposite[current][1]
            } else {
                opposite[current][0]
            };
            match (0..incident.len()).find(|&k| !visited[k] && opposite[k].contains(&outgoing)) {
                Some(next) => {
                    incoming = outgoing;
                    current = next;
                }
                None => break,
            }
        }
    }

    ordered.dedup();
    if !unbounded && ordered.len() > 1 && ordered.first() == ordered.last() {
        ordered.pop();
    }
    if unbounded {
        ordered.insert(0, SENTINEL);
        Some(ordered)
    } else if ordered.len() >= 3 {
        Some(ordered)
    } else {
        None
    }
}

/// Volume and centroid of every real cell, by decomposition into simplices anchored at the
/// generator.
pub fn volume_center_mass(
    positions: &[DVec3],
    tessellation: &Tessellation,
    particle_index: &ParticleIndex,
    dimension: HydroDimension,
) -> Result<Vec<CellInfo>, GeometryError> {
    particle_index
        .real()
        .into_par_iter()
        .map(|cell| {
            let generator = positions[cell];
            let mut volume = 0.;
            let mut centroid = DVec3::ZERO;
            for entry in tessellation.neighbors().entries(cell) {
                let corners = tessellation
                    .faces()
                    .face(entry)
                    .iter()
                    .map(|&v| tessellation.vertex(cell, v))
                    .collect::<Result<Vec<_>, _>>()?;
                match dimension {
                    HydroDimension::HydroDimension2D => {
                        let (a, b) = (corners[0], corners[corners.len() - 1]);
                        let area = 0.5
                            * (a - generator)
                                .truncate()
                                .perp_dot((b - generator).truncate())
                                .abs();
                        volume += area;
                        centroid += area * (generator + a + b) / 3.;
                    }
                    HydroDimension::HydroDimension3D => {
                        for w in corners[1..].windows(2) {
                            let tet = (corners[0] - generator)
                                .dot((w[0] - generator).cross(w[1] - generator))
                                .abs()
                                / 6.;
                            volume += tet;
                            centroid += tet * (generator + corners[0] + w[0] + w[1]) / 4.;
                        }
                    }
                }
            }
            if !(volume > 0.) {
                return Err(GeometryError::NonPositiveVolume { cell, volume });
            }
            Ok(CellInfo {
                volume,
                centroid: centroid / volume,
            })
        })
        .collect()
}
