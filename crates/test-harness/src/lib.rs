//! Test harness for end-to-end recipe workflows.
//!
//! Provides programmatic tools for scripting recipes, compiling them through
//! the real pipeline, verifying the result, and exporting or handing off the
//! artifacts.
//!
//! # Key Components
//!
//! - [`RecipeBuilder`]: Fluent API for assembling and compiling recipes
//! - [`oracle`]: Verification functions returning pass/fail verdicts
//! - [`report`]: Structured text compile reports
//! - [`helpers`]: Step constructors and mesh math
//! - [`assertions`]: Rich assertion helpers with diagnostics

pub mod assertions;
pub mod helpers;
pub mod oracle;
pub mod report;
pub mod workflow;

pub use helpers::HarnessError;
pub use oracle::OracleVerdict;
pub use report::CompileReport;
pub use workflow::{CompiledModel, RecipeBuilder};
