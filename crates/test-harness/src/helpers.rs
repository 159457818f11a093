//! Helper functions: error type, recipe step constructors, mesh math.

use std::collections::HashSet;
use std::path::PathBuf;

use file_format::{EngineFailure, ExportError, LoadError};
use mesh_kernel::weld::weld_vertices;
use mesh_kernel::{Solid, Tolerance};
use recipe_engine::CompileError;
use recipe_types::RawOperation;
use serde_json::json;

// ── Error Type ──────────────────────────────────────────────────────────────

/// Unified error type for the test harness.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("compile failed: {0}")]
    Compile(#[from] CompileError),

    #[error("export failed: {0}")]
    Export(#[from] ExportError),

    #[error("load failed: {0}")]
    Load(#[from] LoadError),

    #[error("engine failed: {0}")]
    Engine(#[from] EngineFailure),

    #[error("I/O error on {path}: {reason}")]
    Io { path: PathBuf, reason: String },

    #[error("no operation named {id}")]
    OperationNotFound { id: String },

    #[error("assertion failed: {detail}")]
    AssertionFailed { detail: String },

    #[error("oracle failure ({oracle}): {detail}")]
    OracleFailure { oracle: String, detail: String },
}

// ── Step Constructors ───────────────────────────────────────────────────────

/// A box of `dx × dy × height`, centered at the origin in XY.
pub fn box_step(id: &str, dx: f64, dy: f64, height: f64) -> RawOperation {
    RawOperation::new("box")
        .with_id(id)
        .with_param("dx", dx)
        .with_param("dy", dy)
        .with_param("height", height)
}

pub fn cylinder_step(id: &str, radius: f64, height: f64) -> RawOperation {
    RawOperation::new("cylinder")
        .with_id(id)
        .with_param("radius", radius)
        .with_param("height", height)
}

pub fn cone_step(id: &str, r_bottom: f64, r_top: f64, height: f64) -> RawOperation {
    RawOperation::new("cone")
        .with_id(id)
        .with_param("r_bottom", r_bottom)
        .with_param("r_top", r_top)
        .with_param("height", height)
}

pub fn sphere_step(id: &str, radius: f64) -> RawOperation {
    RawOperation::new("sphere").with_id(id).with_param("radius", radius)
}

/// A gyroid lattice filling the box `origin .. origin + size`.
pub fn lattice_step(id: &str, origin: [f64; 3], size: [f64; 3], unit_size: f64, thickness: f64) -> RawOperation {
    RawOperation::new("lattice")
        .with_id(id)
        .with_param(
            "bounds",
            json!([origin[0], origin[1], origin[2], size[0], size[1], size[2]]),
        )
        .with_param("unit_size", unit_size)
        .with_param("thickness", thickness)
}

/// A boolean with explicit operands. An empty `target` leaves wiring to the
/// normalizer.
pub fn boolean_step(op: &str, id: &str, target: &str, tool: &str) -> RawOperation {
    let step = RawOperation::new(op).with_id(id);
    if target.is_empty() {
        step
    } else {
        step.with_param("target", target).with_param("tool", tool)
    }
}

pub fn translate_step(id: &str, offset: [f64; 3]) -> RawOperation {
    RawOperation::new("translate")
        .with_id(id)
        .with_param("x", offset[0])
        .with_param("y", offset[1])
        .with_param("z", offset[2])
}

// ── Mesh Math Utilities ─────────────────────────────────────────────────────

/// Axis-aligned bounds as plain arrays; all zeros for an empty solid.
pub fn solid_bounding_box(solid: &Solid) -> ([f64; 3], [f64; 3]) {
    match solid.bounding_box() {
        Some((min, max)) => ([min.x, min.y, min.z], [max.x, max.y, max.z]),
        None => ([0.0; 3], [0.0; 3]),
    }
}

/// Welded (vertex, edge, face) counts, for Euler characteristic checks.
pub fn topology_counts(solid: &Solid, tol: &Tolerance) -> (usize, usize, usize) {
    let (remap, points) = weld_vertices(&solid.vertices, tol.weld);
    let mut edges = HashSet::new();
    let mut faces = 0;
    for face in &solid.faces {
        let w = face.map(|i| remap[i as usize]);
        if w[0] == w[1] || w[1] == w[2] || w[0] == w[2] {
            continue;
        }
        faces += 1;
        for k in 0..3 {
            let (a, b) = (w[k], w[(k + 1) % 3]);
            edges.insert((a.min(b), a.max(b)));
        }
    }
    (points.len(), edges.len(), faces)
}
