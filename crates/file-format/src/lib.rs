//! Artifacts that leave the compiler.
//!
//! - [`canonical`]: the `{"steps": [...]}` recipe handed to the external engine
//! - [`stl`]: binary and ASCII STL export of a compiled solid, and import of
//!   the engine's rendered artifact
//! - [`engine`]: the subprocess contract with the external engine

pub mod canonical;
pub mod engine;
pub mod errors;
pub mod stl;

pub use canonical::{load_recipe, recipe_from_json, recipe_to_json, save_recipe};
pub use engine::{classify_exit, run_engine, EngineConfig, EngineRun};
pub use errors::{EngineFailure, ExportError, LoadError};
pub use stl::{export_ascii_stl, export_binary_stl, parse_stl, read_stl, write_stl, StlFormat};
