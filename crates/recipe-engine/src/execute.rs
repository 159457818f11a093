use std::collections::HashMap;

use mesh_kernel::{
    make_box, make_cone, make_cylinder, make_gyroid_lattice, make_loft, make_sphere, rotate,
    scale, smooth_laplacian, translate, IsosurfaceError, Solid,
};
use modeling_ops::{compose_all, AppliedFallback, BooleanKind};
use recipe_types::{OpKind, Operation};
use tracing::{debug, instrument};

use crate::params::{
    lattice_params, scale_factors, smooth_iterations, translation, BoxParams, CylinderParams,
    RotateParams, SphereParams, TaperParams,
};
use crate::types::{CompileError, CompileOptions, OpError, OpRecord};
use crate::validate::validate_graph;

/// Result environment of one execution.
#[derive(Debug)]
pub struct Execution {
    /// Every operation's solid, keyed by id.
    pub results: HashMap<String, Solid>,
    /// One record per operation, in list order.
    pub records: Vec<OpRecord>,
}

/// Output of a single handler.
#[derive(Debug)]
struct Step {
    solid: Solid,
    boolean_fallbacks: Vec<AppliedFallback>,
    lattice_fallback: Option<IsosurfaceError>,
}

impl From<Solid> for Step {
    fn from(solid: Solid) -> Self {
        Self {
            solid,
            boolean_fallbacks: Vec::new(),
            lattice_fallback: None,
        }
    }
}

/// Validate the operation graph, then evaluate every operation in order.
///
/// Any handler error aborts the run; nothing is returned for the operations
/// that did succeed.
#[instrument(skip_all, fields(operations = ops.len()))]
pub fn execute(ops: &[Operation], options: &CompileOptions) -> Result<Execution, CompileError> {
    validate_graph(ops)?;

    let mut results: HashMap<String, Solid> = HashMap::with_capacity(ops.len());
    let mut records = Vec::with_capacity(ops.len());

    for op in ops {
        let operands = op
            .inputs
            .iter()
            .map(|operand| {
                results
                    .get(operand)
                    .ok_or_else(|| CompileError::UnresolvedOperand {
                        id: op.id.clone(),
                        operand: operand.clone(),
                    })
            })
            .collect::<Result<Vec<&Solid>, _>>()?;

        let step = dispatch(op, &operands, options).map_err(|source| {
            CompileError::OperationExecution {
                id: op.id.clone(),
                kind: op.kind,
                source,
            }
        })?;

        debug!(
            id = %op.id,
            kind = %op.kind,
            faces = step.solid.face_count(),
            fallbacks = step.boolean_fallbacks.len(),
            "operation evaluated"
        );
        records.push(OpRecord {
            id: op.id.clone(),
            kind: op.kind,
            vertex_count: step.solid.vertex_count(),
            face_count: step.solid.face_count(),
            boolean_fallbacks: step.boolean_fallbacks,
            lattice_fallback: step.lattice_fallback,
        });
        results.insert(op.id.clone(), step.solid);
    }

    Ok(Execution { results, records })
}

fn dispatch(op: &Operation, operands: &[&Solid], options: &CompileOptions) -> Result<Step, OpError> {
    let p = &op.params;
    match op.kind {
        OpKind::Box => {
            let b = BoxParams::from_params(p)?;
            Ok(make_box(b.dx, b.dy, b.height, b.center)?.into())
        }
        OpKind::Cylinder => {
            let c = CylinderParams::from_params(p)?;
            Ok(make_cylinder(c.radius, c.height, c.sections, c.base)?.into())
        }
        OpKind::Cone => {
            let t = TaperParams::cone(p)?;
            Ok(make_cone(t.r_bottom, t.r_top, t.height, t.sections, t.base)?.into())
        }
        OpKind::Loft => {
            let t = TaperParams::loft(p)?;
            Ok(make_loft(t.r_bottom, t.r_top, t.height, t.sections, t.base)?.into())
        }
        OpKind::Sphere => {
            let s = SphereParams::from_params(p)?;
            Ok(make_sphere(s.radius, s.sections, s.center)?.into())
        }
        OpKind::Lattice => {
            let outcome = make_gyroid_lattice(&lattice_params(p)?, &options.lattice)?;
            Ok(Step {
                solid: outcome.solid,
                boolean_fallbacks: Vec::new(),
                lattice_fallback: outcome.fallback,
            })
        }
        OpKind::Union => boolean(BooleanKind::Union, operands, options),
        OpKind::Subtract => boolean(BooleanKind::Subtract, operands, options),
        OpKind::Intersect => boolean(BooleanKind::Intersect, operands, options),
        OpKind::Translate => Ok(translate(single(operands)?, translation(p)?).into()),
        OpKind::Rotate => {
            let r = RotateParams::from_params(p)?;
            Ok(rotate(single(operands)?, r.axis, r.angle_deg)?.into())
        }
        OpKind::Scale => Ok(scale(single(operands)?, scale_factors(p)?)?.into()),
        OpKind::Smooth => Ok(smooth_laplacian(
            single(operands)?,
            smooth_iterations(p)?,
            options.smoothing_lambda,
            &options.tolerance,
        )
        .into()),
    }
}

fn boolean(kind: BooleanKind, operands: &[&Solid], options: &CompileOptions) -> Result<Step, OpError> {
    if operands.len() < 2 {
        return Err(OpError::Arity {
            expected: 2,
            got: operands.len(),
        });
    }
    let composition = compose_all(kind, operands, &options.boolean);
    Ok(Step {
        solid: composition.solid,
        boolean_fallbacks: composition.fallbacks,
        lattice_fallback: None,
    })
}

fn single<'a>(operands: &[&'a Solid]) -> Result<&'a Solid, OpError> {
    match operands {
        [solid] => Ok(*solid),
        _ => Err(OpError::Arity {
            expected: 1,
            got: operands.len(),
        }),
    }
}
