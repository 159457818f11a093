//! Recipe compiler.
//!
//! Takes an upstream [`RawRecipe`], normalizes it into a consistent operation
//! list, validates the operand graph, evaluates every operation into a
//! [`Solid`](mesh_kernel::Solid), and repairs the selected output.

pub mod execute;
pub mod normalize;
pub mod params;
pub mod types;
pub mod validate;

use modeling_ops::{repair, RepairOutcome};
use recipe_types::{CanonicalRecipe, Operation, RawRecipe};
use tracing::{info, instrument, warn};

pub use execute::{execute, Execution};
pub use normalize::{canonicalize_params, normalize, normalize_step, PlacementCursor};
pub use params::ParamError;
pub use types::{CompileError, CompileOptions, CompileOutput, OpError, OpRecord};
pub use validate::validate_graph;

/// Compiles recipes with a fixed set of options.
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    options: CompileOptions,
}

impl Compiler {
    pub fn new(options: CompileOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Normalize, execute, and repair a recipe.
    ///
    /// Each call owns its own result environment; nothing carries over
    /// between compiles.
    #[instrument(skip_all, fields(mode = ?recipe.mode, steps = recipe.steps.len()))]
    pub fn compile(&self, recipe: &RawRecipe) -> Result<CompileOutput, CompileError> {
        let operations = normalize(recipe)?;
        if operations.is_empty() {
            return Err(CompileError::EmptyResult);
        }

        let Execution {
            mut results,
            records,
        } = execute(&operations, &self.options)?;

        let output_id = output_id(recipe.output_name.as_deref(), &operations);
        let solid = match results.remove(&output_id) {
            Some(solid) if !solid.is_empty() => solid,
            _ => return Err(CompileError::EmptyResult),
        };

        let RepairOutcome { solid, report } = repair(solid, &self.options.repair);
        if solid.is_empty() {
            return Err(CompileError::EmptyResult);
        }

        info!(
            output = %output_id,
            faces = solid.face_count(),
            watertight = report.watertight,
            fallbacks = records.iter().filter(|r| r.used_fallback()).count(),
            "recipe compiled"
        );

        Ok(CompileOutput {
            canonical: CanonicalRecipe::from_operations(&operations),
            operations,
            output_id,
            watertight: report.watertight,
            solid,
            repair: report,
            records,
        })
    }
}

/// Compile with default options.
pub fn compile(recipe: &RawRecipe) -> Result<CompileOutput, CompileError> {
    Compiler::default().compile(recipe)
}

/// The requested output if it names an operation, otherwise the last one.
fn output_id(requested: Option<&str>, operations: &[Operation]) -> String {
    let last = operations.last().map(|op| op.id.clone()).unwrap_or_default();
    match requested {
        Some(name) if operations.iter().any(|op| op.id == name) => name.to_string(),
        Some(name) => {
            warn!(name, fallback = %last, "output name matches no operation, using the last");
            last
        }
        None => last,
    }
}
