use std::fs;
use std::path::Path;

use recipe_types::CanonicalRecipe;
use tracing::debug;

use crate::errors::{ExportError, LoadError};

/// Serialize a canonical recipe to pretty-printed JSON.
pub fn recipe_to_json(recipe: &CanonicalRecipe) -> Result<String, ExportError> {
    serde_json::to_string_pretty(recipe).map_err(|e| ExportError::Serialize(e.to_string()))
}

/// Parse a canonical recipe. Unknown operation kinds are rejected here.
pub fn recipe_from_json(json: &str) -> Result<CanonicalRecipe, LoadError> {
    serde_json::from_str(json).map_err(|e| LoadError::ParseError(e.to_string()))
}

pub fn save_recipe(path: &Path, recipe: &CanonicalRecipe) -> Result<(), ExportError> {
    let json = recipe_to_json(recipe)?;
    fs::write(path, json).map_err(|e| ExportError::Io {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    debug!(path = %path.display(), steps = recipe.steps.len(), "canonical recipe written");
    Ok(())
}

pub fn load_recipe(path: &Path) -> Result<CanonicalRecipe, LoadError> {
    let json = fs::read_to_string(path).map_err(|e| LoadError::Io {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    recipe_from_json(&json)
}
