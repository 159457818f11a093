//! Rich assertion helpers with diagnostic output.
//!
//! Every failure includes expected vs actual and a caller-supplied context
//! string, so a scenario can bubble them up with `?`.

use mesh_kernel::{Solid, Tolerance};
use recipe_engine::CompileOutput;
use recipe_types::Operation;

use crate::helpers::{solid_bounding_box, HarnessError};

/// Assert the solid's bounding box matches expected values within tolerance.
pub fn assert_bounding_box(
    solid: &Solid,
    expected_min: [f64; 3],
    expected_max: [f64; 3],
    tol: f64,
    ctx: &str,
) -> Result<(), HarnessError> {
    let (actual_min, actual_max) = solid_bounding_box(solid);

    for i in 0..3 {
        if (actual_min[i] - expected_min[i]).abs() > tol {
            return Err(HarnessError::AssertionFailed {
                detail: format!(
                    "[{}] bounding box min[{}]: expected {:.3}, got {:.3} (tol={})",
                    ctx, i, expected_min[i], actual_min[i], tol,
                ),
            });
        }
        if (actual_max[i] - expected_max[i]).abs() > tol {
            return Err(HarnessError::AssertionFailed {
                detail: format!(
                    "[{}] bounding box max[{}]: expected {:.3}, got {:.3} (tol={})",
                    ctx, i, expected_max[i], actual_max[i], tol,
                ),
            });
        }
    }
    Ok(())
}

pub fn assert_watertight(solid: &Solid, ctx: &str) -> Result<(), HarnessError> {
    let report = solid.edge_report(&Tolerance::default());
    if report.is_closed() {
        Ok(())
    } else {
        Err(HarnessError::AssertionFailed {
            detail: format!(
                "[{}] not watertight: {} boundary, {} non-manifold, {} misoriented of {} edges",
                ctx, report.boundary, report.non_manifold, report.misoriented, report.edges,
            ),
        })
    }
}

/// Assert the enclosed volume within a relative tolerance.
pub fn assert_volume(solid: &Solid, expected: f64, rel_tol: f64, ctx: &str) -> Result<(), HarnessError> {
    let actual = solid.volume();
    let scale = expected.abs().max(f64::EPSILON);
    if ((actual - expected) / scale).abs() <= rel_tol {
        Ok(())
    } else {
        Err(HarnessError::AssertionFailed {
            detail: format!(
                "[{}] volume: expected {:.3}, got {:.3} (rel tol={})",
                ctx, expected, actual, rel_tol,
            ),
        })
    }
}

/// Assert the `z` parameter of each normalized operation, in order.
/// Operations without a `z` are skipped.
pub fn assert_z_sequence(operations: &[Operation], expected: &[f64], ctx: &str) -> Result<(), HarnessError> {
    let actual: Vec<f64> = operations
        .iter()
        .filter_map(|op| op.param("z").and_then(|v| v.as_f64()))
        .collect();
    if actual == expected {
        Ok(())
    } else {
        Err(HarnessError::AssertionFailed {
            detail: format!("[{}] z sequence: expected {:?}, got {:?}", ctx, expected, actual),
        })
    }
}

/// Assert an operation's resolved operands.
pub fn assert_operands(
    operations: &[Operation],
    id: &str,
    expected: &[&str],
    ctx: &str,
) -> Result<(), HarnessError> {
    let op = operations
        .iter()
        .find(|op| op.id == id)
        .ok_or_else(|| HarnessError::OperationNotFound { id: id.to_string() })?;
    if op.inputs == expected {
        Ok(())
    } else {
        Err(HarnessError::AssertionFailed {
            detail: format!("[{}] {} operands: expected {:?}, got {:?}", ctx, id, expected, op.inputs),
        })
    }
}

/// Assert how many operations needed a boolean or lattice fallback.
pub fn assert_fallback_count(output: &CompileOutput, expected: usize, ctx: &str) -> Result<(), HarnessError> {
    let used: Vec<&str> = output
        .records
        .iter()
        .filter(|r| r.used_fallback())
        .map(|r| r.id.as_str())
        .collect();
    if used.len() == expected {
        Ok(())
    } else {
        Err(HarnessError::AssertionFailed {
            detail: format!(
                "[{}] expected {} operations with fallbacks, got {}: {:?}",
                ctx,
                expected,
                used.len(),
                used,
            ),
        })
    }
}
