use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::op::{operands_from_params, OpKind, Operation, Params};

/// How much the upstream recipe can be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Deterministic, dimensioned input. Coordinates are used verbatim.
    Engineering,
    /// Free-form input. Structural primitives are stacked along Z.
    Creative,
    /// Anything else; treated like `Creative`.
    #[default]
    #[serde(other)]
    Unknown,
}

impl Mode {
    /// Whether the placement cursor overrides supplied Z coordinates.
    pub fn is_heuristic(self) -> bool {
        !matches!(self, Mode::Engineering)
    }
}

/// One step as produced upstream, before normalization.
///
/// Every field is optional: the id, the kind (under `op` or `type`), the
/// parameters (under `params` or `parameters`), and the operand list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawOperation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, alias = "type", skip_serializing_if = "Option::is_none")]
    pub op: Option<String>,
    #[serde(default, alias = "parameters")]
    pub params: Params,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<String>,
}

impl RawOperation {
    pub fn new(op: impl Into<String>) -> Self {
        Self {
            op: Some(op.into()),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn with_inputs<I, S>(mut self, inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inputs = inputs.into_iter().map(Into::into).collect();
        self
    }
}

/// An upstream recipe: ordered steps plus a trust mode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecipe {
    #[serde(default, alias = "operations")]
    pub steps: Vec<RawOperation>,
    #[serde(default)]
    pub mode: Mode,
    /// Id whose result is the recipe output. Defaults to the last step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_name: Option<String>,
}

impl RawRecipe {
    pub fn new(mode: Mode, steps: Vec<RawOperation>) -> Self {
        Self {
            steps,
            mode,
            output_name: None,
        }
    }
}

/// One step of the canonical recipe handed to the external engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalStep {
    pub id: String,
    pub op: OpKind,
    #[serde(default)]
    pub params: Params,
}

/// The canonical recipe: `{"steps": [{"id", "op", "params"}]}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecipe {
    pub steps: Vec<CanonicalStep>,
}

impl CanonicalRecipe {
    pub fn from_operations(ops: &[Operation]) -> Self {
        Self {
            steps: ops.iter().map(CanonicalStep::from).collect(),
        }
    }

    pub fn into_operations(self) -> Vec<Operation> {
        self.steps.into_iter().map(Operation::from).collect()
    }
}

impl From<&Operation> for CanonicalStep {
    fn from(op: &Operation) -> Self {
        Self {
            id: op.id.clone(),
            op: op.kind,
            params: op.params.clone(),
        }
    }
}

impl From<CanonicalStep> for Operation {
    fn from(step: CanonicalStep) -> Self {
        let inputs = operands_from_params(step.op, &step.params);
        Operation {
            id: step.id,
            kind: step.op,
            params: step.params,
            inputs,
        }
    }
}
