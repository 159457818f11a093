//! Gyroid lattice infill.
//!
//! The gyroid field is sampled on a regular grid and both level sets
//! `±thickness / unit_size` are extracted with marching tetrahedra, giving a
//! double-walled sheet. When extraction cannot produce a surface the lattice
//! degrades to a solid box filling the same bounds; the caller learns why
//! through [`LatticeOutcome::fallback`].

use std::collections::HashMap;
use std::f64::consts::TAU;

use nalgebra::{Point3, Vector3};
use tracing::{debug, info, instrument, warn};

use crate::mesh::Solid;
use crate::primitives::make_box;
use crate::types::{require_positive, KernelError};

/// Smallest extent a lattice's fallback box is given along any axis (mm).
pub const MIN_LATTICE_EXTENT: f64 = 1e-3;

const CORNER_OFFSETS: [[usize; 3]; 8] = [
    [0, 0, 0],
    [1, 0, 0],
    [1, 1, 0],
    [0, 1, 0],
    [0, 0, 1],
    [1, 0, 1],
    [1, 1, 1],
    [0, 1, 1],
];

/// Six tetrahedra sharing the 0-6 diagonal. Neighbouring cells agree on
/// their shared face diagonals, so the extracted surface has no cracks.
const CELL_TETRAHEDRA: [[usize; 4]; 6] = [
    [0, 5, 1, 6],
    [0, 1, 2, 6],
    [0, 2, 3, 6],
    [0, 3, 7, 6],
    [0, 7, 4, 6],
    [0, 4, 5, 6],
];

/// Where and how dense the lattice is.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatticeParams {
    /// Minimum corner of the bounding volume.
    pub origin: Point3<f64>,
    /// Extent of the bounding volume along each axis.
    pub size: Vector3<f64>,
    /// Period of the gyroid cell (mm).
    pub unit_size: f64,
    /// Wall thickness (mm).
    pub thickness: f64,
}

impl Default for LatticeParams {
    fn default() -> Self {
        Self {
            origin: Point3::origin(),
            size: Vector3::new(50.0, 50.0, 50.0),
            unit_size: 5.0,
            thickness: 1.0,
        }
    }
}

impl LatticeParams {
    /// Center of the bounding volume.
    pub fn center(&self) -> Point3<f64> {
        self.origin + self.size / 2.0
    }

    /// The iso value of the outer wall.
    pub fn iso_level(&self) -> f64 {
        self.thickness / self.unit_size
    }
}

/// Sampling limits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatticeConfig {
    /// Grid samples per gyroid period.
    pub samples_per_unit: f64,
    /// Lower bound on samples per axis.
    pub min_samples: usize,
    /// Upper bound on samples per axis.
    pub max_samples: usize,
}

impl Default for LatticeConfig {
    fn default() -> Self {
        Self {
            samples_per_unit: 4.0,
            min_samples: 20,
            max_samples: 128,
        }
    }
}

impl LatticeConfig {
    /// Coarse sampling for previews and tests.
    pub fn preview() -> Self {
        Self {
            max_samples: 40,
            ..Self::default()
        }
    }

    /// Samples per axis for a given lattice.
    pub fn resolution(&self, params: &LatticeParams) -> usize {
        let longest = params.size.x.max(params.size.y).max(params.size.z);
        let step = params.unit_size / self.samples_per_unit;
        let wanted = (longest / step).floor() as usize;
        let resolution = wanted.max(self.min_samples);
        if resolution > self.max_samples {
            warn!(
                wanted = resolution,
                cap = self.max_samples,
                "lattice sampling capped"
            );
            return self.max_samples.max(2);
        }
        resolution.max(2)
    }
}

/// Why iso-surface extraction produced nothing usable.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IsosurfaceError {
    #[error("iso level {level} outside sampled field range [{min}, {max}]")]
    LevelNotBracketed { level: f64, min: f64, max: f64 },

    #[error("extraction at iso level {level} produced no triangles")]
    NoTriangles { level: f64 },

    #[error("lattice bounds have no volume along {axis} (extent {extent})")]
    DegenerateBounds { axis: &'static str, extent: f64 },
}

/// A lattice and, if the surface could not be extracted, the reason the box
/// fallback was used instead.
#[derive(Debug, Clone)]
pub struct LatticeOutcome {
    pub solid: Solid,
    pub fallback: Option<IsosurfaceError>,
}

/// The gyroid implicit function with wavenumber `k`.
pub fn gyroid(p: &Point3<f64>, k: f64) -> f64 {
    let (x, y, z) = (p.x * k, p.y * k, p.z * k);
    x.sin() * y.cos() + y.sin() * z.cos() + z.sin() * x.cos()
}

/// Build a double-walled gyroid lattice, falling back to a solid box of the
/// same bounds when no surface can be extracted.
///
/// Bounds without volume also take the fallback, with each empty extent
/// clamped to [`MIN_LATTICE_EXTENT`].
#[instrument(level = "debug", skip(config))]
pub fn make_gyroid_lattice(
    params: &LatticeParams,
    config: &LatticeConfig,
) -> Result<LatticeOutcome, KernelError> {
    require_positive("unit_size", params.unit_size)?;
    require_positive("thickness", params.thickness)?;

    if let Some(reason) = degenerate_bounds(&params.size) {
        warn!(%reason, "lattice bounds are empty, using a thin box");
        let size = params.size.map(|e| {
            if e.is_finite() && e > MIN_LATTICE_EXTENT {
                e
            } else {
                MIN_LATTICE_EXTENT
            }
        });
        let center = params.origin + size / 2.0;
        let solid = make_box(size.x, size.y, size.z, center)?;
        return Ok(LatticeOutcome {
            solid,
            fallback: Some(reason),
        });
    }

    let resolution = config.resolution(params);
    let k = TAU / params.unit_size;
    let grid = ScalarGrid::sample(params.origin, params.size, resolution, |p| gyroid(p, k));
    let level = params.iso_level();
    info!(
        resolution,
        level,
        unit_size = params.unit_size,
        "creating gyroid lattice"
    );

    let extracted = grid.extract(level, Facing::TowardAbove).and_then(|outer| {
        let inner = grid.extract(-level, Facing::TowardBelow)?;
        Ok(outer.concatenate(&inner))
    });

    match extracted {
        Ok(solid) => {
            debug!(faces = solid.face_count(), "gyroid extracted");
            Ok(LatticeOutcome {
                solid,
                fallback: None,
            })
        }
        Err(reason) => {
            warn!(%reason, "gyroid extraction failed, filling bounds with a box");
            let solid = make_box(params.size.x, params.size.y, params.size.z, params.center())?;
            Ok(LatticeOutcome {
                solid,
                fallback: Some(reason),
            })
        }
    }
}

fn degenerate_bounds(size: &Vector3<f64>) -> Option<IsosurfaceError> {
    ["width", "depth", "height"]
        .into_iter()
        .zip(size.iter())
        .find(|(_, extent)| !(extent.is_finite() && **extent > 0.0))
        .map(|(axis, &extent)| IsosurfaceError::DegenerateBounds { axis, extent })
}

/// Which side of the level set the triangle normals face.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Facing {
    TowardAbove,
    TowardBelow,
}

struct ScalarGrid {
    origin: Point3<f64>,
    spacing: Vector3<f64>,
    n: usize,
    values: Vec<f64>,
    min: f64,
    max: f64,
}

impl ScalarGrid {
    fn sample(
        origin: Point3<f64>,
        size: Vector3<f64>,
        n: usize,
        field: impl Fn(&Point3<f64>) -> f64,
    ) -> Self {
        let spacing = size / (n - 1) as f64;
        let mut values = Vec::with_capacity(n * n * n);
        let (mut min, mut max) = (f64::INFINITY, f64::NEG_INFINITY);
        for z in 0..n {
            for y in 0..n {
                for x in 0..n {
                    let p = origin + Vector3::new(x as f64, y as f64, z as f64).component_mul(&spacing);
                    let v = field(&p);
                    min = min.min(v);
                    max = max.max(v);
                    values.push(v);
                }
            }
        }
        Self {
            origin,
            spacing,
            n,
            values,
            min,
            max,
        }
    }

    fn index(&self, x: usize, y: usize, z: usize) -> usize {
        (z * self.n + y) * self.n + x
    }

    fn point(&self, index: usize) -> Point3<f64> {
        let x = index % self.n;
        let y = (index / self.n) % self.n;
        let z = index / (self.n * self.n);
        self.origin + Vector3::new(x as f64, y as f64, z as f64).component_mul(&self.spacing)
    }

    fn extract(&self, level: f64, facing: Facing) -> Result<Solid, IsosurfaceError> {
        if !(self.min < level && level < self.max) {
            return Err(IsosurfaceError::LevelNotBracketed {
                level,
                min: self.min,
                max: self.max,
            });
        }

        let mut vertices = Vec::new();
        let mut faces = Vec::new();
        let mut edge_cache: HashMap<(usize, usize), u32> = HashMap::new();

        for z in 0..self.n - 1 {
            for y in 0..self.n - 1 {
                for x in 0..self.n - 1 {
                    let corners = CORNER_OFFSETS.map(|[ox, oy, oz]| self.index(x + ox, y + oy, z + oz));
                    for tet in CELL_TETRAHEDRA {
                        let ids = tet.map(|c| corners[c]);
                        self.march_tetrahedron(ids, level, facing, &mut edge_cache, &mut vertices, &mut faces);
                    }
                }
            }
        }

        if faces.is_empty() {
            return Err(IsosurfaceError::NoTriangles { level });
        }
        Ok(Solid::new(vertices, faces))
    }

    fn march_tetrahedron(
        &self,
        ids: [usize; 4],
        level: f64,
        facing: Facing,
        edge_cache: &mut HashMap<(usize, usize), u32>,
        vertices: &mut Vec<Point3<f64>>,
        faces: &mut Vec<[u32; 3]>,
    ) {
        let below: Vec<usize> = (0..4).filter(|&c| self.values[ids[c]] < level).collect();
        let above: Vec<usize> = (0..4).filter(|&c| self.values[ids[c]] >= level).collect();

        let crossings: Vec<[usize; 2]> = match below.len() {
            1 => above.iter().map(|&a| [below[0], a]).collect(),
            3 => below.iter().map(|&b| [b, above[0]]).collect(),
            2 => vec![
                [below[0], above[0]],
                [below[0], above[1]],
                [below[1], above[1]],
                [below[1], above[0]],
            ],
            _ => return,
        };
        let polygon: Vec<u32> = crossings
            .iter()
            .map(|&[b, a]| self.edge_vertex(ids[b], ids[a], level, edge_cache, vertices))
            .collect();

        let centroid = |set: &[usize]| {
            set.iter()
                .fold(Vector3::zeros(), |acc, &c| acc + self.point(ids[c]).coords)
                / set.len() as f64
        };
        let mut toward = centroid(&above) - centroid(&below);
        if facing == Facing::TowardBelow {
            toward = -toward;
        }

        for k in 1..polygon.len() - 1 {
            let mut tri = [polygon[0], polygon[k], polygon[k + 1]];
            let [p0, p1, p2] = tri.map(|i| vertices[i as usize]);
            let normal = (p1 - p0).cross(&(p2 - p0));
            if normal.norm_squared() <= f64::EPSILON * f64::EPSILON {
                continue;
            }
            if normal.dot(&toward) < 0.0 {
                tri.swap(1, 2);
            }
            faces.push(tri);
        }
    }

    fn edge_vertex(
        &self,
        from: usize,
        to: usize,
        level: f64,
        edge_cache: &mut HashMap<(usize, usize), u32>,
        vertices: &mut Vec<Point3<f64>>,
    ) -> u32 {
        let key = (from.min(to), from.max(to));
        *edge_cache.entry(key).or_insert_with(|| {
            let (fa, fb) = (self.values[from], self.values[to]);
            let t = ((level - fa) / (fb - fa)).clamp(0.0, 1.0);
            let (pa, pb) = (self.point(from), self.point(to));
            vertices.push(pa + (pb - pa) * t);
            (vertices.len() - 1) as u32
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn small_lattice() -> LatticeParams {
        LatticeParams {
            origin: Point3::new(0.0, 0.0, 0.0),
            size: Vector3::new(10.0, 10.0, 10.0),
            unit_size: 5.0,
            thickness: 1.0,
        }
    }

    #[test]
    fn gyroid_vanishes_at_origin() {
        assert_relative_eq!(gyroid(&Point3::origin(), 1.0), 0.0);
    }

    #[test]
    fn resolution_has_a_floor_and_a_cap() {
        let config = LatticeConfig::default();
        assert_eq!(config.resolution(&small_lattice()), 20);

        let big = LatticeParams {
            size: Vector3::new(400.0, 10.0, 10.0),
            ..small_lattice()
        };
        assert_eq!(config.resolution(&big), 128);

        let medium = LatticeParams {
            size: Vector3::new(50.0, 50.0, 50.0),
            ..small_lattice()
        };
        assert_eq!(config.resolution(&medium), 40);
    }

    #[test]
    fn lattice_extracts_both_walls() {
        let outcome = make_gyroid_lattice(&small_lattice(), &LatticeConfig::preview()).unwrap();
        assert!(outcome.fallback.is_none(), "fallback: {:?}", outcome.fallback);
        assert!(outcome.solid.face_count() > 100);

        let (lo, hi) = outcome.solid.bounding_box().unwrap();
        for axis in 0..3 {
            assert!(lo[axis] >= -1e-9 && hi[axis] <= 10.0 + 1e-9);
        }
    }

    #[test]
    fn extracted_wall_has_no_interior_cracks() {
        let params = small_lattice();
        let grid = ScalarGrid::sample(params.origin, params.size, 20, |p| gyroid(p, TAU / 5.0));
        let wall = grid.extract(0.2, Facing::TowardAbove).unwrap();
        let report = wall.edge_report(&crate::Tolerance::default());
        // Open only where the sheet meets the bounding box.
        assert_eq!(report.non_manifold, 0);
        assert_eq!(report.misoriented, 0);
        assert!(report.boundary > 0);
    }

    #[test]
    fn thick_walls_fall_back_to_bounding_box() {
        let params = LatticeParams {
            thickness: 20.0,
            ..small_lattice()
        };
        let outcome = make_gyroid_lattice(&params, &LatticeConfig::preview()).unwrap();
        assert!(matches!(
            outcome.fallback,
            Some(IsosurfaceError::LevelNotBracketed { .. })
        ));
        assert_eq!(outcome.solid.vertex_count(), 8);
        let (lo, hi) = outcome.solid.bounding_box().unwrap();
        assert_relative_eq!(lo, Point3::new(0.0, 0.0, 0.0), epsilon = 1e-12);
        assert_relative_eq!(hi, Point3::new(10.0, 10.0, 10.0), epsilon = 1e-12);
    }

    #[test]
    fn empty_bounds_fall_back_to_a_thin_box() {
        let params = LatticeParams {
            size: Vector3::new(0.0, 10.0, -4.0),
            ..small_lattice()
        };
        let outcome = make_gyroid_lattice(&params, &LatticeConfig::default()).unwrap();
        assert_eq!(
            outcome.fallback,
            Some(IsosurfaceError::DegenerateBounds {
                axis: "width",
                extent: 0.0
            })
        );
        assert!(outcome.solid.is_watertight());
        let (lo, hi) = outcome.solid.bounding_box().unwrap();
        assert_relative_eq!(lo, Point3::new(0.0, 0.0, 0.0), epsilon = 1e-12);
        assert_relative_eq!(
            hi,
            Point3::new(MIN_LATTICE_EXTENT, 10.0, MIN_LATTICE_EXTENT),
            epsilon = 1e-12
        );
    }

    #[test]
    fn invalid_unit_size_is_rejected() {
        let params = LatticeParams {
            unit_size: 0.0,
            ..small_lattice()
        };
        assert!(make_gyroid_lattice(&params, &LatticeConfig::default()).is_err());
    }
}
