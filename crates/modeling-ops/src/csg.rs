//! Exact boundary CSG on a binary space partitioning tree.
//!
//! Each operand's triangles become convex polygons; the polygons of one
//! operand are clipped against the BSP tree of the other, following the
//! classic clip/invert sequence. The surviving polygons are welded back into
//! an indexed mesh and the T-junctions left by splitting are resolved so the
//! result can be checked for watertightness and fed into later booleans.

use std::collections::{BTreeSet, HashSet};

use mesh_kernel::{Solid, Tolerance, VertexWelder};
use nalgebra::{Point3, Vector3};

/// Distance below which a point counts as lying on a splitting plane.
const PLANE_EPSILON: f64 = 1e-5;
/// Passes of T-junction splitting before the mesh is taken as is.
const MAX_T_JUNCTION_PASSES: usize = 8;

const COPLANAR: u8 = 0;
const FRONT: u8 = 1;
const BACK: u8 = 2;
const SPANNING: u8 = 3;

#[derive(Debug, Clone, Copy)]
struct Plane {
    normal: Vector3<f64>,
    w: f64,
}

impl Plane {
    fn from_points(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>) -> Option<Self> {
        let n = (b - a).cross(&(c - a));
        let len = n.norm();
        if !len.is_finite() || len <= 1e-12 {
            return None;
        }
        let normal = n / len;
        Some(Self {
            normal,
            w: normal.dot(&a.coords),
        })
    }

    fn flip(&mut self) {
        self.normal = -self.normal;
        self.w = -self.w;
    }

    fn side_of(&self, p: &Point3<f64>) -> u8 {
        let t = self.normal.dot(&p.coords) - self.w;
        if t < -PLANE_EPSILON {
            BACK
        } else if t > PLANE_EPSILON {
            FRONT
        } else {
            COPLANAR
        }
    }

    fn split(&self, polygon: Polygon) -> Split {
        let sides: Vec<u8> = polygon.vertices.iter().map(|v| self.side_of(v)).collect();
        let kind = sides.iter().fold(COPLANAR, |acc, s| acc | s);

        match kind {
            COPLANAR => {
                if self.normal.dot(&polygon.plane.normal) > 0.0 {
                    Split::CoplanarFront(polygon)
                } else {
                    Split::CoplanarBack(polygon)
                }
            }
            FRONT => Split::Front(polygon),
            BACK => Split::Back(polygon),
            _ => {
                let n = polygon.vertices.len();
                let mut front = Vec::with_capacity(n + 1);
                let mut back = Vec::with_capacity(n + 1);
                for i in 0..n {
                    let j = (i + 1) % n;
                    let (si, sj) = (sides[i], sides[j]);
                    let (vi, vj) = (polygon.vertices[i], polygon.vertices[j]);
                    if si != BACK {
                        front.push(vi);
                    }
                    if si != FRONT {
                        back.push(vi);
                    }
                    if si | sj == SPANNING {
                        let t = (self.w - self.normal.dot(&vi.coords)) / self.normal.dot(&(vj - vi));
                        let v = vi + (vj - vi) * t;
                        front.push(v);
                        back.push(v);
                    }
                }
                Split::Spanning {
                    front: Polygon::with_plane(front, polygon.plane),
                    back: Polygon::with_plane(back, polygon.plane),
                }
            }
        }
    }
}

enum Split {
    CoplanarFront(Polygon),
    CoplanarBack(Polygon),
    Front(Polygon),
    Back(Polygon),
    Spanning {
        front: Option<Polygon>,
        back: Option<Polygon>,
    },
}

#[derive(Debug, Clone)]
struct Polygon {
    vertices: Vec<Point3<f64>>,
    plane: Plane,
}

impl Polygon {
    fn from_triangle(tri: [Point3<f64>; 3]) -> Option<Self> {
        let plane = Plane::from_points(&tri[0], &tri[1], &tri[2])?;
        Some(Self {
            vertices: tri.to_vec(),
            plane,
        })
    }

    fn with_plane(vertices: Vec<Point3<f64>>, plane: Plane) -> Option<Self> {
        (vertices.len() >= 3).then_some(Self { vertices, plane })
    }

    fn flip(&mut self) {
        self.vertices.reverse();
        self.plane.flip();
    }
}

#[derive(Debug, Default)]
struct BspNode {
    plane: Option<Plane>,
    front: Option<Box<BspNode>>,
    back: Option<Box<BspNode>>,
    polygons: Vec<Polygon>,
}

impl BspNode {
    fn new(polygons: Vec<Polygon>) -> Self {
        let mut node = Self::default();
        node.build(polygons);
        node
    }

    /// Swap solid and empty space.
    fn invert(&mut self) {
        for polygon in &mut self.polygons {
            polygon.flip();
        }
        if let Some(plane) = &mut self.plane {
            plane.flip();
        }
        if let Some(front) = &mut self.front {
            front.invert();
        }
        if let Some(back) = &mut self.back {
            back.invert();
        }
        std::mem::swap(&mut self.front, &mut self.back);
    }

    /// Remove the parts of `polygons` that are inside this tree.
    fn clip_polygons(&self, polygons: Vec<Polygon>) -> Vec<Polygon> {
        let Some(plane) = self.plane else {
            return polygons;
        };

        let mut front = Vec::new();
        let mut back = Vec::new();
        for polygon in polygons {
            match plane.split(polygon) {
                Split::CoplanarFront(p) | Split::Front(p) => front.push(p),
                Split::CoplanarBack(p) | Split::Back(p) => back.push(p),
                Split::Spanning { front: f, back: b } => {
                    front.extend(f);
                    back.extend(b);
                }
            }
        }

        let mut kept = match &self.front {
            Some(node) => node.clip_polygons(front),
            None => front,
        };
        if let Some(node) = &self.back {
            kept.extend(node.clip_polygons(back));
        }
        kept
    }

    /// Remove the parts of this tree's polygons that are inside `other`.
    fn clip_to(&mut self, other: &BspNode) {
        let polygons = std::mem::take(&mut self.polygons);
        self.polygons = other.clip_polygons(polygons);
        if let Some(front) = &mut self.front {
            front.clip_to(other);
        }
        if let Some(back) = &mut self.back {
            back.clip_to(other);
        }
    }

    fn all_polygons(&self) -> Vec<Polygon> {
        let mut out = Vec::new();
        self.collect_polygons(&mut out);
        out
    }

    fn collect_polygons(&self, out: &mut Vec<Polygon>) {
        out.extend(self.polygons.iter().cloned());
        if let Some(front) = &self.front {
            front.collect_polygons(out);
        }
        if let Some(back) = &self.back {
            back.collect_polygons(out);
        }
    }

    fn build(&mut self, polygons: Vec<Polygon>) {
        let Some(first) = polygons.first() else {
            return;
        };
        let plane = *self.plane.get_or_insert(first.plane);

        let mut front = Vec::new();
        let mut back = Vec::new();
        for polygon in polygons {
            match plane.split(polygon) {
                Split::CoplanarFront(p) | Split::CoplanarBack(p) => self.polygons.push(p),
                Split::Front(p) => front.push(p),
                Split::Back(p) => back.push(p),
                Split::Spanning { front: f, back: b } => {
                    front.extend(f);
                    back.extend(b);
                }
            }
        }

        if !front.is_empty() {
            self.front.get_or_insert_with(Box::default).build(front);
        }
        if !back.is_empty() {
            self.back.get_or_insert_with(Box::default).build(back);
        }
    }
}

/// A polygon soup ready for boolean combination.
#[derive(Debug, Clone, Default)]
pub struct Csg {
    polygons: Vec<Polygon>,
}

impl Csg {
    /// Convert a mesh, dropping zero-area triangles.
    pub fn from_solid(solid: &Solid) -> Self {
        let polygons = solid
            .faces
            .iter()
            .filter_map(|&f| Polygon::from_triangle(solid.triangle(f)))
            .collect();
        Self { polygons }
    }

    pub fn polygon_count(&self) -> usize {
        self.polygons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    pub fn union(&self, other: &Csg) -> Csg {
        let mut a = BspNode::new(self.polygons.clone());
        let mut b = BspNode::new(other.polygons.clone());
        a.clip_to(&b);
        b.clip_to(&a);
        b.invert();
        b.clip_to(&a);
        b.invert();
        a.build(b.all_polygons());
        Csg {
            polygons: a.all_polygons(),
        }
    }

    pub fn subtract(&self, other: &Csg) -> Csg {
        let mut a = BspNode::new(self.polygons.clone());
        let mut b = BspNode::new(other.polygons.clone());
        a.invert();
        a.clip_to(&b);
        b.clip_to(&a);
        b.invert();
        b.clip_to(&a);
        b.invert();
        a.build(b.all_polygons());
        a.invert();
        Csg {
            polygons: a.all_polygons(),
        }
    }

    pub fn intersect(&self, other: &Csg) -> Csg {
        let mut a = BspNode::new(self.polygons.clone());
        let mut b = BspNode::new(other.polygons.clone());
        a.invert();
        b.clip_to(&a);
        b.invert();
        a.clip_to(&b);
        b.clip_to(&a);
        a.build(b.all_polygons());
        a.invert();
        Csg {
            polygons: a.all_polygons(),
        }
    }

    /// Weld the polygons into an indexed triangle mesh.
    pub fn into_solid(self, tol: &Tolerance) -> Solid {
        let mut welder = VertexWelder::new(tol.weld);
        let mut faces = Vec::new();

        for polygon in &self.polygons {
            let mut ring: Vec<u32> = polygon.vertices.iter().map(|v| welder.insert(*v)).collect();
            ring.dedup();
            while ring.len() > 1 && ring.first() == ring.last() {
                ring.pop();
            }
            for k in 1..ring.len().saturating_sub(1) {
                faces.push([ring[0], ring[k], ring[k + 1]]);
            }
        }

        let vertices = welder.into_points();
        let faces = resolve_t_junctions(&vertices, faces, tol.weld * 10.0);
        let faces = faces
            .into_iter()
            .filter(|f| f[0] != f[1] && f[1] != f[2] && f[0] != f[2])
            .collect();
        Solid::new(vertices, faces)
    }
}

/// Split triangles along edges that have another vertex lying on them, so
/// that every edge is matched by its reverse.
fn resolve_t_junctions(vertices: &[Point3<f64>], mut faces: Vec<[u32; 3]>, tol: f64) -> Vec<[u32; 3]> {
    for _ in 0..MAX_T_JUNCTION_PASSES {
        let directed: HashSet<(u32, u32)> = faces
            .iter()
            .flat_map(|f| [(f[0], f[1]), (f[1], f[2]), (f[2], f[0])])
            .collect();
        let unmatched: HashSet<(u32, u32)> = directed
            .iter()
            .copied()
            .filter(|&(a, b)| !directed.contains(&(b, a)))
            .collect();
        if unmatched.is_empty() {
            break;
        }
        let candidates: BTreeSet<u32> = unmatched.iter().flat_map(|&(a, b)| [a, b]).collect();

        let mut changed = false;
        let mut next = Vec::with_capacity(faces.len());
        for face in faces {
            let mut split = None;
            for k in 0..3 {
                let (a, b, c) = (face[k], face[(k + 1) % 3], face[(k + 2) % 3]);
                if !unmatched.contains(&(a, b)) {
                    continue;
                }
                let mut on_edge: Vec<(f64, u32)> = candidates
                    .iter()
                    .filter(|&&v| v != a && v != b)
                    .filter_map(|&v| {
                        param_on_segment(&vertices[v as usize], &vertices[a as usize], &vertices[b as usize], tol)
                            .map(|t| (t, v))
                    })
                    .collect();
                if on_edge.is_empty() {
                    continue;
                }
                on_edge.sort_by(|x, y| x.0.total_cmp(&y.0));
                split = Some((a, b, c, on_edge));
                break;
            }

            match split {
                Some((a, b, c, on_edge)) => {
                    let mut prev = a;
                    for (_, v) in on_edge {
                        next.push([prev, v, c]);
                        prev = v;
                    }
                    next.push([prev, b, c]);
                    changed = true;
                }
                None => next.push(face),
            }
        }
        faces = next;
        if !changed {
            break;
        }
    }
    faces
}

/// Parameter of `p` along segment `a`-`b` if it lies strictly inside it.
fn param_on_segment(p: &Point3<f64>, a: &Point3<f64>, b: &Point3<f64>, tol: f64) -> Option<f64> {
    let d = b - a;
    let len_sq = d.norm_squared();
    if len_sq <= tol * tol {
        return None;
    }
    let t = (p - a).dot(&d) / len_sq;
    let len = len_sq.sqrt();
    if t * len <= tol || (1.0 - t) * len <= tol {
        return None;
    }
    let closest = a + d * t;
    ((p - closest).norm_squared() <= tol * tol).then_some(t)
}
