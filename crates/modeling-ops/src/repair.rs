//! Final mesh repair.
//!
//! Runs once on the assembled solid. Each step may fail on its own without
//! stopping the others; the pass as a whole never fails and reports whether
//! the result ended up watertight.

use std::collections::{HashMap, HashSet};

use mesh_kernel::weld::weld_vertices;
use mesh_kernel::{Solid, Tolerance};
use nalgebra::{Point3, Vector3};
use tracing::{debug, info, warn};

/// Repair steps, in the order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairStep {
    MergeVertices,
    RemoveDegenerateFaces,
    FillHoles,
}

/// Why a repair step was skipped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepairFailure {
    #[error("mesh has no faces")]
    Empty,

    #[error("boundary vertex {vertex} starts more than one open edge")]
    NonManifoldBoundary { vertex: u32 },

    #[error("open edges do not form closed loops")]
    OpenBoundary,

    #[error("hole with {edges} edges exceeds limit {limit}")]
    HoleTooLarge { edges: usize, limit: usize },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RepairConfig {
    pub tolerance: Tolerance,
    pub merge_vertices: bool,
    pub remove_degenerate_faces: bool,
    pub fill_holes: bool,
    /// Largest boundary loop that will be capped.
    pub max_hole_edges: usize,
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            tolerance: Tolerance::default(),
            merge_vertices: true,
            remove_degenerate_faces: true,
            fill_holes: true,
            max_hole_edges: 1024,
        }
    }
}

impl RepairConfig {
    /// Report watertightness without touching the mesh.
    pub fn inspect_only() -> Self {
        Self {
            merge_vertices: false,
            remove_degenerate_faces: false,
            fill_holes: false,
            ..Self::default()
        }
    }
}

/// What the repair pass did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RepairReport {
    /// The mesh was closed before repair and left untouched.
    pub already_watertight: bool,
    /// Steps that ran, with the number of elements they changed.
    pub applied: Vec<(RepairStep, usize)>,
    /// Steps that failed and were skipped.
    pub skipped: Vec<(RepairStep, RepairFailure)>,
    pub watertight: bool,
}

#[derive(Debug, Clone)]
pub struct RepairOutcome {
    pub solid: Solid,
    pub report: RepairReport,
}

type StepFn = fn(&Solid, &RepairConfig) -> Result<(Solid, usize), RepairFailure>;

/// Repair `solid` if it is not already watertight.
pub fn repair(solid: Solid, config: &RepairConfig) -> RepairOutcome {
    let mut report = RepairReport::default();
    if solid.is_watertight_with(&config.tolerance) {
        report.already_watertight = true;
        report.watertight = true;
        return RepairOutcome { solid, report };
    }

    let steps: [(RepairStep, bool, StepFn); 3] = [
        (RepairStep::MergeVertices, config.merge_vertices, merge_vertices),
        (
            RepairStep::RemoveDegenerateFaces,
            config.remove_degenerate_faces,
            remove_degenerate_faces,
        ),
        (RepairStep::FillHoles, config.fill_holes, fill_holes),
    ];

    let mut current = solid;
    for (step, enabled, run) in steps {
        if !enabled {
            continue;
        }
        match run(&current, config) {
            Ok((repaired, changed)) => {
                debug!(?step, changed, "repair step applied");
                current = repaired;
                report.applied.push((step, changed));
            }
            Err(failure) => {
                warn!(?step, %failure, "repair step skipped");
                report.skipped.push((step, failure));
            }
        }
    }

    report.watertight = current.is_watertight_with(&config.tolerance);
    info!(
        watertight = report.watertight,
        faces = current.face_count(),
        "mesh repair finished"
    );
    RepairOutcome {
        solid: current,
        report,
    }
}

/// Collapse coincident vertices. Reports how many vertices were removed.
fn merge_vertices(solid: &Solid, config: &RepairConfig) -> Result<(Solid, usize), RepairFailure> {
    if solid.is_empty() {
        return Err(RepairFailure::Empty);
    }
    let (remap, vertices) = weld_vertices(&solid.vertices, config.tolerance.weld);
    let removed = solid.vertices.len() - vertices.len();
    let faces = solid
        .faces
        .iter()
        .map(|f| f.map(|i| remap[i as usize]))
        .collect();
    Ok((Solid::new(vertices, faces), removed))
}

/// Drop triangles with repeated corners or (near) zero area.
fn remove_degenerate_faces(
    solid: &Solid,
    config: &RepairConfig,
) -> Result<(Solid, usize), RepairFailure> {
    if solid.is_empty() {
        return Err(RepairFailure::Empty);
    }
    let faces: Vec<[u32; 3]> = solid
        .faces
        .iter()
        .copied()
        .filter(|&f| {
            f[0] != f[1]
                && f[1] != f[2]
                && f[0] != f[2]
                && solid.face_normal(f).norm() * 0.5 > config.tolerance.degenerate_area
        })
        .collect();
    let removed = solid.faces.len() - faces.len();
    Ok((Solid::new(solid.vertices.clone(), faces), removed))
}

/// Cap every boundary loop with a fan around its centroid. Reports how many
/// holes were filled.
fn fill_holes(solid: &Solid, config: &RepairConfig) -> Result<(Solid, usize), RepairFailure> {
    if solid.is_empty() {
        return Err(RepairFailure::Empty);
    }

    let directed: HashSet<(u32, u32)> = solid
        .faces
        .iter()
        .flat_map(|f| [(f[0], f[1]), (f[1], f[2]), (f[2], f[0])])
        .collect();

    let mut next: HashMap<u32, u32> = HashMap::new();
    for &(a, b) in &directed {
        if directed.contains(&(b, a)) {
            continue;
        }
        if next.insert(a, b).is_some() {
            return Err(RepairFailure::NonManifoldBoundary { vertex: a });
        }
    }

    let mut loops = Vec::new();
    let mut starts: Vec<u32> = next.keys().copied().collect();
    starts.sort_unstable();
    let mut visited = HashSet::new();
    for start in starts {
        if visited.contains(&start) {
            continue;
        }
        let mut ring = vec![start];
        visited.insert(start);
        let mut current = start;
        loop {
            let Some(&following) = next.get(&current) else {
                return Err(RepairFailure::OpenBoundary);
            };
            if following == start {
                break;
            }
            if !visited.insert(following) {
                return Err(RepairFailure::OpenBoundary);
            }
            ring.push(following);
            current = following;
        }
        if ring.len() > config.max_hole_edges {
            return Err(RepairFailure::HoleTooLarge {
                edges: ring.len(),
                limit: config.max_hole_edges,
            });
        }
        loops.push(ring);
    }

    let mut vertices = solid.vertices.clone();
    let mut faces = solid.faces.clone();
    for ring in &loops {
        cap_loop(ring, &mut vertices, &mut faces);
    }
    Ok((Solid::new(vertices, faces), loops.len()))
}

/// The boundary runs `ring[i] -> ring[i + 1]`, so the cap uses each edge
/// reversed.
fn cap_loop(ring: &[u32], vertices: &mut Vec<Point3<f64>>, faces: &mut Vec<[u32; 3]>) {
    let n = ring.len();
    if n < 3 {
        return;
    }
    if n == 3 {
        faces.push([ring[2], ring[1], ring[0]]);
        return;
    }
    let sum = ring
        .iter()
        .fold(Vector3::zeros(), |acc, &i| acc + vertices[i as usize].coords);
    let center = vertices.len() as u32;
    vertices.push(Point3::from(sum / n as f64));
    for k in 0..n {
        faces.push([ring[(k + 1) % n], ring[k], center]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use mesh_kernel::make_box;

    fn open_box() -> Solid {
        let mut b = make_box(2.0, 2.0, 2.0, Point3::origin()).unwrap();
        // Drop one side quad.
        b.faces.truncate(b.faces.len() - 2);
        b
    }

    #[test]
    fn watertight_input_is_untouched() {
        let b = make_box(1.0, 1.0, 1.0, Point3::origin()).unwrap();
        let out = repair(b.clone(), &RepairConfig::default());
        assert!(out.report.already_watertight);
        assert!(out.report.watertight);
        assert_eq!(out.solid, b);
    }

    #[test]
    fn missing_quad_is_capped() {
        let out = repair(open_box(), &RepairConfig::default());
        assert!(out.report.watertight, "{:?}", out.report);
        assert!(out.report.applied.contains(&(RepairStep::FillHoles, 1)));
        assert_relative_eq!(out.solid.volume(), 8.0, epsilon = 1e-9);
    }

    #[test]
    fn split_vertices_are_merged_before_filling() {
        // Every triangle owns its corners, so nothing is shared until merged.
        let b = open_box();
        let mut vertices = Vec::new();
        let mut faces = Vec::new();
        for f in &b.faces {
            let base = vertices.len() as u32;
            vertices.extend(b.triangle(*f));
            faces.push([base, base + 1, base + 2]);
        }
        let out = repair(Solid::new(vertices, faces), &RepairConfig::default());
        assert!(out.report.watertight, "{:?}", out.report);
        assert_eq!(out.report.applied[0], (RepairStep::MergeVertices, 30 - 8));
    }

    #[test]
    fn degenerate_faces_are_removed() {
        let mut b = open_box();
        b.faces.push([0, 0, 1]);
        let out = repair(b, &RepairConfig::default());
        assert!(out.report.applied.contains(&(RepairStep::RemoveDegenerateFaces, 1)));
        assert!(out.report.watertight, "{:?}", out.report);
    }

    #[test]
    fn failing_step_is_skipped_not_fatal() {
        // Two triangles sharing only a vertex: vertex 0 starts two open edges.
        let bowtie = Solid::new(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
                Point3::new(-1.0, 0.0, 0.0),
                Point3::new(0.0, -1.0, 0.0),
            ],
            vec![[0, 1, 2], [0, 3, 4]],
        );
        let out = repair(bowtie, &RepairConfig::default());
        assert!(!out.report.watertight);
        assert!(matches!(
            out.report.skipped.as_slice(),
            [(RepairStep::FillHoles, RepairFailure::NonManifoldBoundary { vertex: 0 })]
        ));
        assert_eq!(out.solid.face_count(), 2);
    }

    #[test]
    fn empty_solid_reports_not_watertight() {
        let out = repair(Solid::empty(), &RepairConfig::default());
        assert!(!out.report.watertight);
        assert_eq!(out.report.skipped.len(), 3);
    }

    #[test]
    fn inspect_only_changes_nothing() {
        let open = open_box();
        let out = repair(open.clone(), &RepairConfig::inspect_only());
        assert_eq!(out.solid, open);
        assert!(!out.report.watertight);
    }
}
