//! Verification oracles: pure functions returning pass/fail verdicts.
//!
//! Each oracle returns an `OracleVerdict` with diagnostic detail, not panics.
//! This lets a scenario collect all failures in one pass.

use mesh_kernel::{Solid, Tolerance};

use crate::helpers::topology_counts;

/// The result of a single oracle check.
#[derive(Debug, Clone)]
pub struct OracleVerdict {
    pub oracle_name: String,
    pub passed: bool,
    pub detail: String,
    pub value: Option<f64>,
}

impl OracleVerdict {
    fn pass(name: &str, detail: String) -> Self {
        Self {
            oracle_name: name.to_string(),
            passed: true,
            detail,
            value: None,
        }
    }

    fn pass_val(name: &str, detail: String, value: f64) -> Self {
        Self {
            value: Some(value),
            ..Self::pass(name, detail)
        }
    }

    fn fail(name: &str, detail: String) -> Self {
        Self {
            oracle_name: name.to_string(),
            passed: false,
            detail,
            value: None,
        }
    }

    fn fail_val(name: &str, detail: String, value: f64) -> Self {
        Self {
            value: Some(value),
            ..Self::fail(name, detail)
        }
    }
}

// ── Topology Oracles ────────────────────────────────────────────────────────

/// Check Euler's formula: V - E + F = 2 (for genus-0 solids).
///
/// Lattices and drilled parts have higher genus, so only apply this where
/// the expected shape is a single closed shell without handles.
pub fn check_euler_formula(solid: &Solid, tol: &Tolerance) -> OracleVerdict {
    let (v, e, f) = topology_counts(solid, tol);
    let euler = v as i64 - e as i64 + f as i64;
    let detail = format!("V={} E={} F={} V-E+F={}", v, e, f, euler);
    if euler == 2 {
        OracleVerdict::pass_val("euler_formula", detail, euler as f64)
    } else {
        OracleVerdict::fail_val("euler_formula", detail, euler as f64)
    }
}

/// Every welded edge is used by exactly two triangles.
pub fn check_watertight(solid: &Solid, tol: &Tolerance) -> OracleVerdict {
    let report = solid.edge_report(tol);
    if report.edges > 0 && report.boundary == 0 && report.non_manifold == 0 {
        OracleVerdict::pass("watertight", format!("all {} edges paired", report.edges))
    } else {
        OracleVerdict::fail(
            "watertight",
            format!(
                "{} boundary and {} non-manifold edges out of {}",
                report.boundary, report.non_manifold, report.edges
            ),
        )
    }
}

/// Neighbouring triangles traverse their shared edge in opposite directions.
pub fn check_consistent_winding(solid: &Solid, tol: &Tolerance) -> OracleVerdict {
    let report = solid.edge_report(tol);
    if report.misoriented == 0 {
        OracleVerdict::pass(
            "consistent_winding",
            format!("all {} edges consistently oriented", report.edges),
        )
    } else {
        OracleVerdict::fail(
            "consistent_winding",
            format!("{} of {} edges misoriented", report.misoriented, report.edges),
        )
    }
}

// ── Mesh Oracles ────────────────────────────────────────────────────────────

/// Check that no triangles have zero area (degenerate).
pub fn check_no_degenerate_triangles(solid: &Solid, tol: &Tolerance) -> OracleVerdict {
    let min_double_area = 2.0 * tol.degenerate_area;
    let degenerate = solid
        .faces
        .iter()
        .filter(|&&f| solid.face_normal(f).norm() <= min_double_area)
        .count();

    if degenerate == 0 {
        OracleVerdict::pass(
            "no_degenerate_triangles",
            format!("all {} triangles have area", solid.face_count()),
        )
    } else {
        OracleVerdict::fail_val(
            "no_degenerate_triangles",
            format!("{} of {} triangles are degenerate", degenerate, solid.face_count()),
            degenerate as f64,
        )
    }
}

/// Check that every face index points at a vertex.
pub fn check_valid_indices(solid: &Solid) -> OracleVerdict {
    let count = solid.vertex_count();
    match solid.faces.iter().flatten().find(|&&i| i as usize >= count) {
        None => OracleVerdict::pass(
            "valid_indices",
            format!("{} faces index {} vertices", solid.face_count(), count),
        ),
        Some(&bad) => OracleVerdict::fail(
            "valid_indices",
            format!("index {} out of range for {} vertices", bad, count),
        ),
    }
}

/// Outward winding gives a positive signed volume.
pub fn check_positive_volume(solid: &Solid) -> OracleVerdict {
    let volume = solid.volume();
    if volume > 0.0 {
        OracleVerdict::pass_val("positive_volume", format!("volume {:.3}", volume), volume)
    } else {
        OracleVerdict::fail_val(
            "positive_volume",
            format!("volume {:.3} is not positive", volume),
            volume,
        )
    }
}

/// Check the bounding box against expectations within `tol` per axis.
pub fn check_bounding_box(solid: &Solid, min: [f64; 3], max: [f64; 3], tol: f64) -> OracleVerdict {
    let Some((lo, hi)) = solid.bounding_box() else {
        return OracleVerdict::fail("bounding_box", "solid is empty".to_string());
    };
    let worst = (0..3)
        .map(|i| (lo[i] - min[i]).abs().max((hi[i] - max[i]).abs()))
        .fold(0.0, f64::max);
    let detail = format!(
        "({:.2}, {:.2}, {:.2}) -> ({:.2}, {:.2}, {:.2}), worst deviation {:.4}",
        lo.x, lo.y, lo.z, hi.x, hi.y, hi.z, worst
    );
    if worst <= tol {
        OracleVerdict::pass_val("bounding_box", detail, worst)
    } else {
        OracleVerdict::fail_val("bounding_box", detail, worst)
    }
}

// ── Composite ───────────────────────────────────────────────────────────────

/// Run every shape-independent check on a solid.
pub fn run_all_checks(solid: &Solid, tol: &Tolerance) -> Vec<OracleVerdict> {
    vec![
        check_valid_indices(solid),
        check_watertight(solid, tol),
        check_consistent_winding(solid, tol),
        check_no_degenerate_triangles(solid, tol),
        check_positive_volume(solid),
    ]
}

/// The first failing verdict, if any, as an error.
pub fn first_failure(verdicts: &[OracleVerdict]) -> Option<crate::HarnessError> {
    verdicts
        .iter()
        .find(|v| !v.passed)
        .map(|v| crate::HarnessError::OracleFailure {
            oracle: v.oracle_name.clone(),
            detail: v.detail.clone(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesh_kernel::{make_box, make_sphere};
    use nalgebra::Point3;

    fn open_box() -> Solid {
        let mut solid = make_box(2.0, 2.0, 2.0, Point3::origin()).unwrap();
        solid.faces.truncate(10);
        solid
    }

    #[test]
    fn closed_box_passes_everything() {
        let solid = make_box(2.0, 3.0, 4.0, Point3::origin()).unwrap();
        let tol = Tolerance::default();
        for v in run_all_checks(&solid, &tol) {
            assert!(v.passed, "{}: {}", v.oracle_name, v.detail);
        }
        assert!(check_euler_formula(&solid, &tol).passed);
    }

    #[test]
    fn sphere_is_genus_zero() {
        let solid = make_sphere(5.0, 24, Point3::origin()).unwrap();
        let verdict = check_euler_formula(&solid, &Tolerance::default());
        assert!(verdict.passed, "{}", verdict.detail);
        assert_eq!(verdict.value, Some(2.0));
    }

    #[test]
    fn open_box_fails_watertight() {
        let verdict = check_watertight(&open_box(), &Tolerance::default());
        assert!(!verdict.passed);
        assert!(verdict.detail.contains("boundary"));
    }

    #[test]
    fn flipped_face_fails_winding() {
        let mut solid = make_box(2.0, 2.0, 2.0, Point3::origin()).unwrap();
        solid.faces[0].swap(1, 2);
        assert!(!check_consistent_winding(&solid, &Tolerance::default()).passed);
    }

    #[test]
    fn inverted_solid_has_negative_volume() {
        let mut solid = make_box(2.0, 2.0, 2.0, Point3::origin()).unwrap();
        solid.flip_winding();
        let verdict = check_positive_volume(&solid);
        assert!(!verdict.passed);
        assert!(verdict.value.unwrap() < 0.0);
    }

    #[test]
    fn sliver_is_degenerate() {
        let solid = Solid::new(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(2.0, 0.0, 0.0),
            ],
            vec![[0, 1, 2]],
        );
        assert!(!check_no_degenerate_triangles(&solid, &Tolerance::default()).passed);
    }

    #[test]
    fn out_of_range_index_is_reported() {
        let mut solid = make_box(2.0, 2.0, 2.0, Point3::origin()).unwrap();
        solid.faces.push([0, 1, 42]);
        let verdict = check_valid_indices(&solid);
        assert!(!verdict.passed);
        assert!(verdict.detail.contains("42"));
    }

    #[test]
    fn bounding_box_tolerance() {
        let solid = make_box(2.0, 2.0, 2.0, Point3::origin()).unwrap();
        assert!(check_bounding_box(&solid, [-1.0; 3], [1.0; 3], 1e-9).passed);
        assert!(!check_bounding_box(&solid, [-1.0; 3], [1.5, 1.0, 1.0], 0.1).passed);
        assert!(!check_bounding_box(&Solid::empty(), [0.0; 3], [0.0; 3], 1.0).passed);
    }

    #[test]
    fn first_failure_names_the_oracle() {
        let verdicts = run_all_checks(&open_box(), &Tolerance::default());
        match first_failure(&verdicts) {
            Some(crate::HarnessError::OracleFailure { oracle, .. }) => assert_eq!(oracle, "watertight"),
            other => panic!("expected an oracle failure, got {:?}", other),
        }
    }
}
