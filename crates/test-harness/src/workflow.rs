//! RecipeBuilder: fluent API for scripting recipe workflows in tests.
//!
//! Drives the real pipeline: the builder assembles a [`RawRecipe`], compiles
//! it with [`Compiler`], and the resulting [`CompiledModel`] exports STL and
//! the canonical recipe or hands off to the external engine.

use std::path::{Path, PathBuf};

use file_format::{run_engine, save_recipe, write_stl, EngineConfig, EngineRun, StlFormat};
use mesh_kernel::{Solid, Tolerance};
use recipe_engine::{CompileOptions, CompileOutput, Compiler};
use recipe_types::{Mode, Operation, RawOperation, RawRecipe};
use tracing::info;

use crate::helpers::*;
use crate::oracle;
use crate::report::CompileReport;

/// A fluent builder for constructing recipes in tests.
///
/// Ids are optional on every step; the normalizer assigns `step_{i}` to
/// anonymous ones.
#[derive(Debug, Clone)]
pub struct RecipeBuilder {
    recipe: RawRecipe,
    options: CompileOptions,
}

impl RecipeBuilder {
    /// Deterministic coordinates: every supplied `z` is used verbatim.
    pub fn engineering() -> Self {
        Self::with_mode(Mode::Engineering)
    }

    /// Heuristic placement: structural primitives are stacked along Z.
    pub fn creative() -> Self {
        Self::with_mode(Mode::Creative)
    }

    pub fn with_mode(mode: Mode) -> Self {
        Self {
            recipe: RawRecipe::new(mode, Vec::new()),
            options: CompileOptions::default(),
        }
    }

    /// Compile with coarse lattice sampling.
    pub fn preview(mut self) -> Self {
        self.options = CompileOptions::preview();
        self
    }

    pub fn options(mut self, options: CompileOptions) -> Self {
        self.options = options;
        self
    }

    // ── Steps ───────────────────────────────────────────────────────────

    /// Append an arbitrary step.
    pub fn step(mut self, step: RawOperation) -> Self {
        self.recipe.steps.push(step);
        self
    }

    pub fn cube(self, id: &str, dx: f64, dy: f64, height: f64) -> Self {
        self.step(box_step(id, dx, dy, height))
    }

    pub fn cylinder(self, id: &str, radius: f64, height: f64) -> Self {
        self.step(cylinder_step(id, radius, height))
    }

    pub fn cone(self, id: &str, r_bottom: f64, r_top: f64, height: f64) -> Self {
        self.step(cone_step(id, r_bottom, r_top, height))
    }

    pub fn sphere(self, id: &str, radius: f64) -> Self {
        self.step(sphere_step(id, radius))
    }

    pub fn lattice(self, id: &str, origin: [f64; 3], size: [f64; 3], unit_size: f64, thickness: f64) -> Self {
        self.step(lattice_step(id, origin, size, unit_size, thickness))
    }

    /// Union of two named results.
    pub fn union(self, id: &str, target: &str, tool: &str) -> Self {
        self.step(boolean_step("union", id, target, tool))
    }

    pub fn subtract(self, id: &str, target: &str, tool: &str) -> Self {
        self.step(boolean_step("subtract", id, target, tool))
    }

    pub fn intersect(self, id: &str, target: &str, tool: &str) -> Self {
        self.step(boolean_step("intersect", id, target, tool))
    }

    /// A union with no operands, wired by the normalizer.
    pub fn bare_union(self, id: &str) -> Self {
        self.step(boolean_step("union", id, "", ""))
    }

    /// Translate the previous result.
    pub fn translate(self, id: &str, offset: [f64; 3]) -> Self {
        self.step(translate_step(id, offset))
    }

    /// Select the output by id instead of taking the last step.
    pub fn output(mut self, id: &str) -> Self {
        self.recipe.output_name = Some(id.to_string());
        self
    }

    // ── Build ───────────────────────────────────────────────────────────

    pub fn recipe(&self) -> &RawRecipe {
        &self.recipe
    }

    pub fn into_recipe(self) -> RawRecipe {
        self.recipe
    }

    /// Normalize without executing.
    pub fn normalize(&self) -> Result<Vec<Operation>, HarnessError> {
        Ok(recipe_engine::normalize(&self.recipe)?)
    }

    pub fn compile(&self) -> Result<CompiledModel, HarnessError> {
        let output = Compiler::new(self.options).compile(&self.recipe)?;
        Ok(CompiledModel { output })
    }
}

/// A successfully compiled recipe.
#[derive(Debug, Clone)]
pub struct CompiledModel {
    pub output: CompileOutput,
}

impl CompiledModel {
    pub fn solid(&self) -> &Solid {
        &self.output.solid
    }

    pub fn operations(&self) -> &[Operation] {
        &self.output.operations
    }

    pub fn operation(&self, id: &str) -> Result<&Operation, HarnessError> {
        self.output
            .operations
            .iter()
            .find(|op| op.id == id)
            .ok_or_else(|| HarnessError::OperationNotFound { id: id.to_string() })
    }

    // ── Export ──────────────────────────────────────────────────────────

    /// Write the compiled solid as binary STL into `dir`.
    pub fn export_stl(&self, dir: &Path, file_name: &str) -> Result<PathBuf, HarnessError> {
        let path = dir.join(file_name);
        write_stl(&path, &self.output.solid, StlFormat::Binary)?;
        Ok(path)
    }

    /// Write the canonical recipe into `dir`.
    pub fn save_canonical(&self, dir: &Path, file_name: &str) -> Result<PathBuf, HarnessError> {
        let path = dir.join(file_name);
        save_recipe(&path, &self.output.canonical)?;
        Ok(path)
    }

    /// Preview export and engine handoff, the way a caller would chain them:
    /// a binary STL of the local solid next to the canonical recipe, then the
    /// external engine on that recipe. The engine's artifact is read back.
    pub fn handoff(&self, config: &EngineConfig) -> Result<(EngineRun, Solid), HarnessError> {
        std::fs::create_dir_all(&config.runtime_dir).map_err(|e| HarnessError::Io {
            path: config.runtime_dir.clone(),
            reason: e.to_string(),
        })?;
        let preview = self.export_stl(&config.runtime_dir, "preview.stl")?;
        info!(path = %preview.display(), "preview written");

        let run = run_engine(config, &self.output.canonical)?;
        let rendered = run.load_artifact(&Tolerance::default())?;
        Ok((run, rendered))
    }

    // ── Oracle Integration ──────────────────────────────────────────────

    /// Run all shape-independent oracles on the output solid.
    pub fn check(&self) -> Vec<oracle::OracleVerdict> {
        oracle::run_all_checks(&self.output.solid, &Tolerance::default())
    }

    /// Fail with the first oracle that does not pass.
    pub fn assert_all_checks_pass(&self) -> Result<&Self, HarnessError> {
        match oracle::first_failure(&self.check()) {
            Some(err) => Err(err),
            None => Ok(self),
        }
    }

    pub fn report(&self) -> CompileReport {
        CompileReport::from_output(&self.output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_collects_steps_in_order() {
        let builder = RecipeBuilder::creative()
            .cube("base", 10.0, 10.0, 2.0)
            .cylinder("post", 1.0, 5.0)
            .bare_union("joined")
            .output("base");
        let recipe = builder.recipe();
        assert_eq!(recipe.mode, Mode::Creative);
        assert_eq!(recipe.steps.len(), 3);
        assert_eq!(recipe.steps[2].op.as_deref(), Some("union"));
        assert_eq!(recipe.output_name.as_deref(), Some("base"));
    }

    #[test]
    fn normalize_wires_bare_union() {
        let ops = RecipeBuilder::engineering()
            .cube("a", 1.0, 1.0, 1.0)
            .sphere("b", 1.0)
            .bare_union("u")
            .normalize()
            .unwrap();
        assert_eq!(ops[2].inputs, vec!["a", "b"]);
    }

    #[test]
    fn missing_operation_is_reported() {
        let model = RecipeBuilder::engineering().cube("a", 1.0, 1.0, 1.0).compile().unwrap();
        assert!(model.operation("a").is_ok());
        assert!(matches!(
            model.operation("zz"),
            Err(HarnessError::OperationNotFound { .. })
        ));
    }
}
