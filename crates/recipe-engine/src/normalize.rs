//! Recipe normalization.
//!
//! Turns a loosely specified upstream recipe into a consistent operation list:
//! kinds are parsed, ids assigned, parameter aliases folded onto canonical
//! names, Z placement applied, and missing operands wired from preceding
//! steps. No geometry is built here.

use std::collections::HashSet;

use recipe_types::{
    operands_from_params, Mode, OpKind, Operation, Params, RawOperation, RawRecipe,
    EXTRA_TOOLS_KEY, TARGET_KEY, TOOL_KEY,
};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::params::{number, opt_f64};
use crate::types::CompileError;

/// Explicit-unit names. These win over the canonical field.
const REPLACING_ALIASES: [(&str, &str); 10] = [
    ("width_mm", "dx"),
    ("depth_mm", "dy"),
    ("height_mm", "height"),
    ("radius_mm", "radius"),
    ("r_bottom_mm", "r_bottom"),
    ("r_top_mm", "r_top"),
    ("unit_size_mm", "unit_size"),
    ("thickness_mm", "thickness"),
    ("angle_deg", "angle"),
    ("bounds_mm", "bounds"),
];

/// Terse names. These only fill a canonical field that is absent.
const FILLING_ALIASES: [(&str, &str); 7] = [
    ("w", "dx"),
    ("d", "dy"),
    ("h", "height"),
    ("width", "dx"),
    ("depth", "dy"),
    ("radius_top", "r_top"),
    ("radius_bottom", "r_bottom"),
];

/// Sphere radius assumed by the cursor when none is given.
const CURSOR_SPHERE_RADIUS: f64 = 10.0;

/// Running Z offset used to stack structural primitives in heuristic mode.
///
/// A plain value: each step consumes the current cursor and returns the next
/// one, so placement depends only on the steps before it.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlacementCursor {
    z: f64,
}

impl PlacementCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn z(self) -> f64 {
        self.z
    }

    /// Put a stackable primitive at the cursor and return the cursor above it.
    pub fn place(self, id: &str, kind: OpKind, params: &mut Params) -> Self {
        params.insert("z".into(), Value::from(self.z));
        let extent = match kind {
            OpKind::Sphere => 2.0 * lenient(id, params, "radius", CURSOR_SPHERE_RADIUS),
            _ => lenient(id, params, "height", 0.0),
        };
        Self {
            z: self.z + extent.max(0.0),
        }
    }
}

/// A malformed dimension must not stop placement; execution reports it.
fn lenient(id: &str, params: &Params, name: &str, default: f64) -> f64 {
    match opt_f64(params, name) {
        Ok(value) => value.unwrap_or(default),
        Err(err) => {
            warn!(id, %err, "ignoring unreadable dimension for placement");
            0.0
        }
    }
}

/// Fold alias names onto canonical parameter names.
pub fn canonicalize_params(kind: OpKind, mut params: Params) -> Params {
    for (alias, canonical) in REPLACING_ALIASES {
        if let Some(value) = params.remove(alias) {
            params.insert(canonical.into(), value);
        }
    }
    for (alias, canonical) in FILLING_ALIASES {
        if let Some(value) = params.remove(alias) {
            params.entry(canonical).or_insert(value);
        }
    }

    if let Some(center) = params.remove("center") {
        match center.as_array().map(|items| leading_numbers(items, 3)) {
            Some(Some(xyz)) => {
                for (axis, value) in ["x", "y", "z"].into_iter().zip(xyz) {
                    params.insert(axis.into(), Value::from(value));
                }
            }
            Some(None) => warn!(%center, "dropping center without three coordinates"),
            None => {
                params.insert("center".into(), center);
            }
        }
    }

    if kind == OpKind::Box {
        for key in ["size", "size_mm"] {
            let Some(size) = params.remove(key) else {
                continue;
            };
            let dims = match &size {
                Value::Array(items) => leading_numbers(items, 3),
                other => number(other).map(|n| vec![n; 3]),
            };
            match dims {
                Some(dims) => {
                    for (field, value) in ["dx", "dy", "height"].into_iter().zip(dims) {
                        params.entry(field).or_insert(Value::from(value));
                    }
                }
                None => {
                    params.insert(key.into(), size);
                }
            }
        }
    }
    params
}

fn leading_numbers(items: &[Value], n: usize) -> Option<Vec<f64>> {
    if items.len() < n {
        return None;
    }
    items[..n].iter().map(number).collect()
}

/// Normalize a whole recipe, threading the placement cursor through each step.
pub fn normalize(recipe: &RawRecipe) -> Result<Vec<Operation>, CompileError> {
    let mut ops: Vec<Operation> = Vec::with_capacity(recipe.steps.len());
    let mut ids = HashSet::with_capacity(recipe.steps.len());
    let mut cursor = PlacementCursor::new();

    for (index, raw) in recipe.steps.iter().enumerate() {
        let (op, next) = normalize_step(index, raw, recipe.mode, cursor, &ops)?;
        if !ids.insert(op.id.clone()) {
            return Err(CompileError::malformed(index, &op.id, "duplicate operation id"));
        }
        cursor = next;
        ops.push(op);
    }

    debug!(
        steps = ops.len(),
        mode = ?recipe.mode,
        final_z = cursor.z(),
        "recipe normalized"
    );
    Ok(ops)
}

/// Normalize one step given the steps already normalized before it.
pub fn normalize_step(
    index: usize,
    raw: &RawOperation,
    mode: Mode,
    cursor: PlacementCursor,
    prior: &[Operation],
) -> Result<(Operation, PlacementCursor), CompileError> {
    let id = raw
        .id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("step_{index}"));

    let kind = match raw.op.as_deref() {
        None => return Err(CompileError::malformed(index, &id, "missing operation kind")),
        Some(name) => OpKind::parse(name).ok_or_else(|| {
            CompileError::malformed(index, &id, format!("unknown operation kind `{name}`"))
        })?,
    };

    let mut params = canonicalize_params(kind, raw.params.clone());

    let mut operands = operands_from_params(kind, &params);
    for input in &raw.inputs {
        if !operands.contains(input) {
            operands.push(input.clone());
        }
    }
    if kind.is_primitive() {
        let stray = [TARGET_KEY, TOOL_KEY, EXTRA_TOOLS_KEY]
            .into_iter()
            .filter(|key| params.remove(*key).is_some())
            .count();
        if stray > 0 || !raw.inputs.is_empty() {
            warn!(id = %id, %kind, "primitive does not take operands, dropping them");
        }
        operands.clear();
    }
    let operands = wire_operands(index, &id, kind, operands, prior)?;

    let next = if mode.is_heuristic() && kind.is_stackable() {
        cursor.place(&id, kind, &mut params)
    } else {
        // A center left over from aliasing was not a coordinate list; it
        // still counts as a given position.
        if kind.is_positioned() && !params.contains_key("z") && !params.contains_key("center") {
            params.insert("z".into(), Value::from(0.0));
        }
        cursor
    };

    Ok((Operation::new(id, kind, params, operands), next))
}

/// Fill in operands the upstream recipe left out.
fn wire_operands(
    index: usize,
    id: &str,
    kind: OpKind,
    mut operands: Vec<String>,
    prior: &[Operation],
) -> Result<Vec<String>, CompileError> {
    if kind.is_primitive() {
        return Ok(operands);
    }

    if kind.is_transform() {
        match operands.len() {
            0 => {
                let previous = prior.last().ok_or_else(|| {
                    CompileError::malformed(index, id, "transform has no preceding operation")
                })?;
                info!(id, target = %previous.id, "autowired transform target");
                operands.push(previous.id.clone());
            }
            1 => {}
            n => {
                warn!(id, operands = n, "transform takes one operand, keeping the first");
                operands.truncate(1);
            }
        }
        return Ok(operands);
    }

    // Nearest first.
    let mut candidates = prior
        .iter()
        .rev()
        .filter(|op| !op.kind.is_boolean())
        .map(|op| op.id.as_str());

    match operands.len() {
        0 => {
            let (Some(tool), Some(target)) = (candidates.next(), candidates.next()) else {
                return Err(CompileError::malformed(
                    index,
                    id,
                    "boolean has no operands and fewer than two preceding shapes",
                ));
            };
            info!(id, target, tool, "autowired boolean operands");
            operands = vec![target.to_string(), tool.to_string()];
        }
        1 => {
            let target = operands[0].as_str();
            let tool = candidates.find(|c| *c != target).ok_or_else(|| {
                CompileError::malformed(index, id, "boolean has one operand and no preceding shape to pair it with")
            })?;
            info!(id, target, tool, "autowired boolean tool");
            operands.push(tool.to_string());
        }
        _ => {}
    }
    Ok(operands)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: Value) -> Params {
        match value {
            Value::Object(map) => map,
            _ => panic!("params must be an object"),
        }
    }

    #[test]
    fn explicit_units_replace_canonical_fields() {
        let p = canonicalize_params(
            OpKind::Box,
            params(json!({"width_mm": 40, "dx": 5, "h": 7, "height": 3})),
        );
        assert_eq!(p["dx"], json!(40));
        // Terse aliases never override.
        assert_eq!(p["height"], json!(3));
        assert!(!p.contains_key("width_mm"));
        assert!(!p.contains_key("h"));
    }

    #[test]
    fn center_expands_to_coordinates() {
        let p = canonicalize_params(OpKind::Sphere, params(json!({"center": [1, 2, 3], "z": 9})));
        assert_eq!((p["x"].as_f64(), p["y"].as_f64(), p["z"].as_f64()), (Some(1.0), Some(2.0), Some(3.0)));
        assert!(!p.contains_key("center"));

        let p = canonicalize_params(OpKind::Sphere, params(json!({"center": [1, 2]})));
        assert!(!p.contains_key("center"));
        assert!(!p.contains_key("x"));
    }

    #[test]
    fn box_size_fills_missing_dimensions() {
        let p = canonicalize_params(OpKind::Box, params(json!({"size": 4, "dy": 9})));
        assert_eq!(p["dx"].as_f64(), Some(4.0));
        assert_eq!(p["dy"], json!(9));
        assert_eq!(p["height"].as_f64(), Some(4.0));

        // Other kinds leave `size` alone.
        let p = canonicalize_params(OpKind::Cylinder, params(json!({"size": 4})));
        assert_eq!(p["size"], json!(4));
    }

    #[test]
    fn unknown_fields_pass_through() {
        let p = canonicalize_params(OpKind::Box, params(json!({"material": "pla"})));
        assert_eq!(p["material"], json!("pla"));
    }

    #[test]
    fn cursor_stacks_by_height_and_diameter() {
        let mut p = params(json!({"height": 12}));
        let cursor = PlacementCursor::new().place("a", OpKind::Box, &mut p);
        assert_eq!(p["z"].as_f64(), Some(0.0));
        assert_eq!(cursor.z(), 12.0);

        let mut p = params(json!({"radius": 3}));
        let cursor = cursor.place("b", OpKind::Sphere, &mut p);
        assert_eq!(p["z"].as_f64(), Some(12.0));
        assert_eq!(cursor.z(), 18.0);

        let mut p = Params::new();
        assert_eq!(cursor.place("c", OpKind::Sphere, &mut p).z(), 38.0);
    }

    #[test]
    fn cursor_never_moves_down() {
        let mut p = params(json!({"height": -5}));
        let cursor = PlacementCursor::new().place("a", OpKind::Cylinder, &mut p);
        assert_eq!(cursor.z(), 0.0);

        let mut p = params(json!({"height": "tall"}));
        assert_eq!(cursor.place("b", OpKind::Box, &mut p).z(), 0.0);
    }
}
