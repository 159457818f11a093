use mesh_kernel::{IsosurfaceError, KernelError, LatticeConfig, Solid, Tolerance};
use modeling_ops::{AppliedFallback, BooleanConfig, RepairConfig, RepairReport};
use recipe_types::{CanonicalRecipe, OpKind, Operation};

use crate::params::ParamError;

/// Errors that abort a compile.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CompileError {
    #[error("malformed recipe at step {index} ({id}): {reason}")]
    MalformedRecipe {
        index: usize,
        id: String,
        reason: String,
    },

    #[error("operation {id} references unknown operand {operand}")]
    UnresolvedOperand { id: String, operand: String },

    #[error("operation {id} ({kind}) failed: {source}")]
    OperationExecution {
        id: String,
        kind: OpKind,
        #[source]
        source: OpError,
    },

    #[error("recipe produced an empty solid")]
    EmptyResult,
}

impl CompileError {
    pub(crate) fn malformed(index: usize, id: &str, reason: impl Into<String>) -> Self {
        CompileError::MalformedRecipe {
            index,
            id: id.to_string(),
            reason: reason.into(),
        }
    }
}

/// Errors from a single operation handler.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OpError {
    #[error("parameter error: {0}")]
    Param(#[from] ParamError),

    #[error("kernel error: {0}")]
    Kernel(#[from] KernelError),

    #[error("expected {expected} operand(s), got {got}")]
    Arity { expected: usize, got: usize },
}

/// Knobs for one compile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompileOptions {
    pub boolean: BooleanConfig,
    pub repair: RepairConfig,
    pub lattice: LatticeConfig,
    /// Step size of each Laplacian smoothing pass.
    pub smoothing_lambda: f64,
    pub tolerance: Tolerance,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            boolean: BooleanConfig::default(),
            repair: RepairConfig::default(),
            lattice: LatticeConfig::default(),
            smoothing_lambda: 0.5,
            tolerance: Tolerance::default(),
        }
    }
}

impl CompileOptions {
    /// Coarser lattice sampling for quick turnaround.
    pub fn preview() -> Self {
        Self {
            lattice: LatticeConfig::preview(),
            ..Self::default()
        }
    }
}

/// What happened when one operation ran.
#[derive(Debug, Clone, PartialEq)]
pub struct OpRecord {
    pub id: String,
    pub kind: OpKind,
    pub vertex_count: usize,
    pub face_count: usize,
    /// Boolean fallbacks taken, in fold order.
    pub boolean_fallbacks: Vec<AppliedFallback>,
    /// Set when a lattice degraded to its bounding box.
    pub lattice_fallback: Option<IsosurfaceError>,
}

impl OpRecord {
    pub fn used_fallback(&self) -> bool {
        !self.boolean_fallbacks.is_empty() || self.lattice_fallback.is_some()
    }
}

/// A finished compile.
#[derive(Debug, Clone)]
pub struct CompileOutput {
    /// The normalized operation list that was executed.
    pub operations: Vec<Operation>,
    /// The same list in the form handed to the external engine.
    pub canonical: CanonicalRecipe,
    /// Id of the operation whose result is `solid`.
    pub output_id: String,
    /// The final solid, after repair.
    pub solid: Solid,
    pub watertight: bool,
    pub repair: RepairReport,
    pub records: Vec<OpRecord>,
}
