use std::collections::HashSet;

use recipe_types::{OpKind, Operation};

use crate::types::CompileError;

/// Check the whole operation list before anything is built.
///
/// Ids must be unique, every operand must name an operation listed earlier
/// (which rules out forward references and cycles), and each kind must carry
/// the number of operands it consumes.
pub fn validate_graph(ops: &[Operation]) -> Result<(), CompileError> {
    let mut defined: HashSet<&str> = HashSet::with_capacity(ops.len());

    for (index, op) in ops.iter().enumerate() {
        if defined.contains(op.id.as_str()) {
            return Err(CompileError::malformed(index, &op.id, "duplicate operation id"));
        }

        if let Some(operand) = op.inputs.iter().find(|o| !defined.contains(o.as_str())) {
            return Err(CompileError::UnresolvedOperand {
                id: op.id.clone(),
                operand: operand.clone(),
            });
        }

        let got = op.inputs.len();
        let arity_ok = match op.kind {
            OpKind::Union | OpKind::Subtract | OpKind::Intersect => got >= 2,
            OpKind::Translate | OpKind::Rotate | OpKind::Scale | OpKind::Smooth => got == 1,
            OpKind::Box
            | OpKind::Cylinder
            | OpKind::Sphere
            | OpKind::Cone
            | OpKind::Loft
            | OpKind::Lattice => got == 0,
        };
        if !arity_ok {
            return Err(CompileError::malformed(
                index,
                &op.id,
                format!("{} cannot take {got} operand(s)", op.kind),
            ));
        }

        defined.insert(op.id.as_str());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use recipe_types::Params;

    fn op(id: &str, kind: OpKind, inputs: &[&str]) -> Operation {
        Operation::new(
            id,
            kind,
            Params::new(),
            inputs.iter().map(|s| s.to_string()).collect(),
        )
    }

    #[test]
    fn ordered_graph_is_valid() {
        let ops = [
            op("a", OpKind::Box, &[]),
            op("b", OpKind::Sphere, &[]),
            op("u", OpKind::Union, &["a", "b"]),
            op("t", OpKind::Translate, &["u"]),
        ];
        assert_eq!(validate_graph(&ops), Ok(()));
    }

    #[test]
    fn forward_reference_is_unresolved() {
        let ops = [
            op("a", OpKind::Box, &[]),
            op("u", OpKind::Union, &["a", "b"]),
            op("b", OpKind::Sphere, &[]),
        ];
        assert_eq!(
            validate_graph(&ops),
            Err(CompileError::UnresolvedOperand {
                id: "u".into(),
                operand: "b".into(),
            })
        );
    }

    #[test]
    fn self_reference_is_unresolved() {
        let ops = [op("a", OpKind::Box, &[]), op("t", OpKind::Scale, &["t"])];
        assert!(matches!(
            validate_graph(&ops),
            Err(CompileError::UnresolvedOperand { .. })
        ));
    }

    #[test]
    fn duplicate_id_is_malformed() {
        let ops = [op("a", OpKind::Box, &[]), op("a", OpKind::Sphere, &[])];
        assert!(matches!(
            validate_graph(&ops),
            Err(CompileError::MalformedRecipe { index: 1, .. })
        ));
    }

    #[test]
    fn boolean_needs_two_operands() {
        let ops = [op("a", OpKind::Box, &[]), op("u", OpKind::Union, &["a"])];
        assert!(matches!(
            validate_graph(&ops),
            Err(CompileError::MalformedRecipe { index: 1, .. })
        ));
    }
}
