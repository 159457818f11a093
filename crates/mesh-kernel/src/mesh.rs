//! The [`Solid`] boundary mesh and its read-only analysis.

use std::collections::HashMap;

use nalgebra::{Point3, Vector3};

use crate::weld::weld_vertices;
use crate::Tolerance;

/// An indexed triangle mesh bounding a (hopefully) closed volume.
///
/// Triangles wind counter-clockwise seen from outside. Watertightness is not
/// stored; it is derived on demand because every mesh operation can change it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Solid {
    pub vertices: Vec<Point3<f64>>,
    pub faces: Vec<[u32; 3]>,
}

/// Edge-incidence summary over welded vertices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EdgeReport {
    /// Undirected edges.
    pub edges: usize,
    /// Edges used by exactly one triangle.
    pub boundary: usize,
    /// Edges used by more than two triangles.
    pub non_manifold: usize,
    /// Edges used twice in the same direction.
    pub misoriented: usize,
}

impl EdgeReport {
    pub fn is_closed(&self) -> bool {
        self.edges > 0 && self.boundary == 0 && self.non_manifold == 0 && self.misoriented == 0
    }
}

impl Solid {
    pub fn new(vertices: Vec<Point3<f64>>, faces: Vec<[u32; 3]>) -> Self {
        Self { vertices, faces }
    }

    /// A solid with no geometry.
    pub fn empty() -> Self {
        Self::default()
    }

    /// True when there are no triangles to render.
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    pub fn triangle(&self, face: [u32; 3]) -> [Point3<f64>; 3] {
        [
            self.vertices[face[0] as usize],
            self.vertices[face[1] as usize],
            self.vertices[face[2] as usize],
        ]
    }

    /// Un-normalized face normal (length = twice the triangle area).
    pub fn face_normal(&self, face: [u32; 3]) -> Vector3<f64> {
        let [a, b, c] = self.triangle(face);
        (b - a).cross(&(c - a))
    }

    /// Axis-aligned bounds over referenced and unreferenced vertices alike.
    pub fn bounding_box(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        let first = *self.vertices.first()?;
        let bounds = self.vertices.iter().fold((first, first), |(lo, hi), p| {
            (
                Point3::new(lo.x.min(p.x), lo.y.min(p.y), lo.z.min(p.z)),
                Point3::new(hi.x.max(p.x), hi.y.max(p.y), hi.z.max(p.z)),
            )
        });
        Some(bounds)
    }

    /// Signed enclosed volume (divergence theorem). Positive for outward
    /// winding when the mesh is closed.
    pub fn volume(&self) -> f64 {
        self.faces
            .iter()
            .map(|&f| {
                let [a, b, c] = self.triangle(f);
                a.coords.dot(&b.coords.cross(&c.coords))
            })
            .sum::<f64>()
            / 6.0
    }

    pub fn surface_area(&self) -> f64 {
        self.faces
            .iter()
            .map(|&f| self.face_normal(f).norm() * 0.5)
            .sum()
    }

    /// Watertight at the default tolerance.
    pub fn is_watertight(&self) -> bool {
        self.is_watertight_with(&Tolerance::default())
    }

    /// Every welded edge is shared by exactly two triangles with opposite
    /// orientation.
    pub fn is_watertight_with(&self, tol: &Tolerance) -> bool {
        self.edge_report(tol).is_closed()
    }

    pub fn edge_report(&self, tol: &Tolerance) -> EdgeReport {
        let (remap, _) = weld_vertices(&self.vertices, tol.weld);
        // (min, max) -> (uses as min->max, uses as max->min)
        let mut uses: HashMap<(u32, u32), (u32, u32)> = HashMap::new();

        for face in &self.faces {
            let w = face.map(|i| remap[i as usize]);
            if w[0] == w[1] || w[1] == w[2] || w[0] == w[2] {
                continue;
            }
            for k in 0..3 {
                let (a, b) = (w[k], w[(k + 1) % 3]);
                let entry = uses.entry((a.min(b), a.max(b))).or_default();
                if a < b {
                    entry.0 += 1;
                } else {
                    entry.1 += 1;
                }
            }
        }

        let mut report = EdgeReport {
            edges: uses.len(),
            ..EdgeReport::default()
        };
        for &(forward, backward) in uses.values() {
            match forward + backward {
                1 => report.boundary += 1,
                2 if forward != 1 => report.misoriented += 1,
                2 => {}
                _ => report.non_manifold += 1,
            }
        }
        report
    }

    /// Both meshes side by side in one vertex/face list, without fusing.
    pub fn concatenate(&self, other: &Solid) -> Solid {
        let offset = self.vertices.len() as u32;
        let mut vertices = Vec::with_capacity(self.vertices.len() + other.vertices.len());
        vertices.extend_from_slice(&self.vertices);
        vertices.extend_from_slice(&other.vertices);

        let mut faces = Vec::with_capacity(self.faces.len() + other.faces.len());
        faces.extend_from_slice(&self.faces);
        faces.extend(other.faces.iter().map(|f| f.map(|i| i + offset)));

        Solid { vertices, faces }
    }

    /// Reverse the winding of every triangle.
    pub fn flip_winding(&mut self) {
        for face in &mut self.faces {
            face.swap(1, 2);
        }
    }
}
