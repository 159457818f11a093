//! Rigid and affine transforms plus Laplacian smoothing.
//!
//! All transforms return a new solid; inputs are never mutated because the
//! executor may still reference them under their own id.

use std::collections::BTreeSet;

use nalgebra::{Rotation3, Unit, Vector3};
use tracing::debug;

use crate::mesh::Solid;
use crate::primitives::offset_in_place;
use crate::types::KernelError;
use crate::weld::weld_vertices;
use crate::Tolerance;

/// Move every vertex by `offset`.
pub fn translate(solid: &Solid, offset: Vector3<f64>) -> Solid {
    let mut moved = solid.clone();
    offset_in_place(&mut moved, offset);
    moved
}

/// Rotate about an axis through the origin by `angle_deg` degrees
/// (right-handed).
pub fn rotate(solid: &Solid, axis: Vector3<f64>, angle_deg: f64) -> Result<Solid, KernelError> {
    if !angle_deg.is_finite() {
        return Err(KernelError::invalid("angle", "must be finite"));
    }
    let norm = axis.norm();
    if !norm.is_finite() || norm <= f64::EPSILON {
        return Err(KernelError::invalid("axis", "must be a non-zero vector"));
    }
    let rotation = Rotation3::from_axis_angle(&Unit::new_normalize(axis), angle_deg.to_radians());
    debug!(?axis, angle_deg, "rotating solid");

    let mut rotated = solid.clone();
    for v in &mut rotated.vertices {
        *v = rotation * *v;
    }
    Ok(rotated)
}

/// Scale about the origin. A mirroring scale (odd number of negative factors)
/// flips the winding so normals stay outward.
pub fn scale(solid: &Solid, factors: Vector3<f64>) -> Result<Solid, KernelError> {
    for (name, f) in [("x", factors.x), ("y", factors.y), ("z", factors.z)] {
        if !f.is_finite() || f == 0.0 {
            return Err(KernelError::invalid(name, format!("scale factor must be finite and non-zero, got {f}")));
        }
    }

    let mut scaled = solid.clone();
    for v in &mut scaled.vertices {
        v.coords.component_mul_assign(&factors);
    }
    if factors.x * factors.y * factors.z < 0.0 {
        scaled.flip_winding();
    }
    Ok(scaled)
}

/// Laplacian smoothing: each pass moves every vertex `lambda` of the way
/// toward the average of its neighbours.
///
/// Coincident vertices are welded first so seams move together and the mesh
/// does not tear.
pub fn smooth_laplacian(solid: &Solid, iterations: u32, lambda: f64, tol: &Tolerance) -> Solid {
    if solid.is_empty() || iterations == 0 {
        return solid.clone();
    }
    let (remap, mut points) = weld_vertices(&solid.vertices, tol.weld);

    let mut neighbours: Vec<BTreeSet<u32>> = vec![BTreeSet::new(); points.len()];
    for face in &solid.faces {
        let w = face.map(|i| remap[i as usize]);
        for k in 0..3 {
            let (a, b) = (w[k], w[(k + 1) % 3]);
            if a != b {
                neighbours[a as usize].insert(b);
                neighbours[b as usize].insert(a);
            }
        }
    }

    for _ in 0..iterations {
        let previous = points.clone();
        for (i, adjacent) in neighbours.iter().enumerate() {
            if adjacent.is_empty() {
                continue;
            }
            let sum = adjacent
                .iter()
                .fold(Vector3::zeros(), |acc, &j| acc + previous[j as usize].coords);
            let average = sum / adjacent.len() as f64;
            points[i] += (average - previous[i].coords) * lambda;
        }
    }
    debug!(iterations, lambda, vertices = points.len(), "smoothed solid");

    let vertices = remap.iter().map(|&w| points[w as usize]).collect();
    Solid::new(vertices, solid.faces.clone())
}
