use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Parameter map of an operation. Values are millimetres and degrees.
pub type Params = serde_json::Map<String, Value>;

/// Param key holding the first operand of a boolean or the input of a transform.
pub const TARGET_KEY: &str = "target";
/// Param key holding the second operand of a boolean.
pub const TOOL_KEY: &str = "tool";
/// Param key holding any operands of an n-ary boolean past the second.
pub const EXTRA_TOOLS_KEY: &str = "tools";

/// The closed set of operation kinds the executor can dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpKind {
    Box,
    Cylinder,
    Sphere,
    Cone,
    Loft,
    Lattice,
    Union,
    Subtract,
    Intersect,
    Translate,
    Rotate,
    Scale,
    Smooth,
}

impl OpKind {
    pub const ALL: [OpKind; 13] = [
        OpKind::Box,
        OpKind::Cylinder,
        OpKind::Sphere,
        OpKind::Cone,
        OpKind::Loft,
        OpKind::Lattice,
        OpKind::Union,
        OpKind::Subtract,
        OpKind::Intersect,
        OpKind::Translate,
        OpKind::Rotate,
        OpKind::Scale,
        OpKind::Smooth,
    ];

    /// Parse an upstream kind name.
    ///
    /// Case-insensitive; strips the `create_` and `boolean_` prefixes the
    /// extraction stage tends to emit, and accepts a handful of synonyms.
    pub fn parse(raw: &str) -> Option<OpKind> {
        let lowered = raw.trim().to_ascii_lowercase();
        let name = lowered
            .strip_prefix("create_")
            .or_else(|| lowered.strip_prefix("boolean_"))
            .unwrap_or(&lowered);

        let kind = match name {
            "box" | "cube" => OpKind::Box,
            "cylinder" => OpKind::Cylinder,
            "sphere" => OpKind::Sphere,
            "cone" | "frustum" => OpKind::Cone,
            "loft" => OpKind::Loft,
            "lattice" | "gyroid" => OpKind::Lattice,
            "union" => OpKind::Union,
            "subtract" | "difference" | "cut" => OpKind::Subtract,
            "intersect" | "intersection" => OpKind::Intersect,
            "translate" | "move" => OpKind::Translate,
            "rotate" => OpKind::Rotate,
            "scale" => OpKind::Scale,
            "smooth" => OpKind::Smooth,
            _ => return None,
        };
        Some(kind)
    }

    /// The canonical lowercase name used in serialized recipes.
    pub fn as_str(self) -> &'static str {
        match self {
            OpKind::Box => "box",
            OpKind::Cylinder => "cylinder",
            OpKind::Sphere => "sphere",
            OpKind::Cone => "cone",
            OpKind::Loft => "loft",
            OpKind::Lattice => "lattice",
            OpKind::Union => "union",
            OpKind::Subtract => "subtract",
            OpKind::Intersect => "intersect",
            OpKind::Translate => "translate",
            OpKind::Rotate => "rotate",
            OpKind::Scale => "scale",
            OpKind::Smooth => "smooth",
        }
    }

    pub fn is_boolean(self) -> bool {
        matches!(self, OpKind::Union | OpKind::Subtract | OpKind::Intersect)
    }

    pub fn is_transform(self) -> bool {
        matches!(
            self,
            OpKind::Translate | OpKind::Rotate | OpKind::Scale | OpKind::Smooth
        )
    }

    pub fn is_primitive(self) -> bool {
        !self.is_boolean() && !self.is_transform()
    }

    /// Primitives the heuristic placement cursor stacks along Z.
    pub fn is_stackable(self) -> bool {
        matches!(
            self,
            OpKind::Box | OpKind::Cylinder | OpKind::Cone | OpKind::Sphere
        )
    }

    /// Primitives anchored at an explicit `x, y, z` position.
    pub fn is_positioned(self) -> bool {
        self.is_stackable() || self == OpKind::Loft
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalized operation.
///
/// `inputs` always equals [`operands_from_params`] of `params`, so the
/// canonical serialized form (which carries operands inside `params`) parses
/// back into an identical operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub id: String,
    pub kind: OpKind,
    pub params: Params,
    pub inputs: Vec<String>,
}

impl Operation {
    /// Build an operation, writing `inputs` into the operand param keys.
    pub fn new(id: impl Into<String>, kind: OpKind, mut params: Params, inputs: Vec<String>) -> Self {
        write_operands(kind, &mut params, &inputs);
        let inputs = operands_from_params(kind, &params);
        Self {
            id: id.into(),
            kind,
            params,
            inputs,
        }
    }

    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }
}

/// Read the operand ids a kind carries in its params.
///
/// Booleans: `target`, `tool`, then each entry of `tools`. Transforms:
/// `target`. Primitives have no operands.
pub fn operands_from_params(kind: OpKind, params: &Params) -> Vec<String> {
    let mut operands = Vec::new();
    if kind.is_primitive() {
        return operands;
    }

    if let Some(target) = params.get(TARGET_KEY).and_then(Value::as_str) {
        operands.push(target.to_string());
    }
    if kind.is_transform() {
        return operands;
    }

    if let Some(tool) = params.get(TOOL_KEY).and_then(Value::as_str) {
        operands.push(tool.to_string());
    }
    if let Some(Value::Array(extra)) = params.get(EXTRA_TOOLS_KEY) {
        operands.extend(extra.iter().filter_map(Value::as_str).map(str::to_string));
    }
    operands
}

/// Replace the operand param keys of `params` with `operands`.
pub fn write_operands(kind: OpKind, params: &mut Params, operands: &[String]) {
    if kind.is_primitive() {
        return;
    }
    params.remove(TARGET_KEY);
    params.remove(TOOL_KEY);
    params.remove(EXTRA_TOOLS_KEY);

    let mut iter = operands.iter();
    if let Some(target) = iter.next() {
        params.insert(TARGET_KEY.into(), Value::String(target.clone()));
    }
    if kind.is_transform() {
        return;
    }
    if let Some(tool) = iter.next() {
        params.insert(TOOL_KEY.into(), Value::String(tool.clone()));
    }
    let extra: Vec<Value> = iter.map(|id| Value::String(id.clone())).collect();
    if !extra.is_empty() {
        params.insert(EXTRA_TOOLS_KEY.into(), Value::Array(extra));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_strips_prefixes_and_synonyms() {
        assert_eq!(OpKind::parse("create_box"), Some(OpKind::Box));
        assert_eq!(OpKind::parse("Create_Cylinder"), Some(OpKind::Cylinder));
        assert_eq!(OpKind::parse("boolean_union"), Some(OpKind::Union));
        assert_eq!(OpKind::parse("difference"), Some(OpKind::Subtract));
        assert_eq!(OpKind::parse("frustum"), Some(OpKind::Cone));
        assert_eq!(OpKind::parse("fillet"), None);
        assert_eq!(OpKind::parse(""), None);
    }

    #[test]
    fn as_str_parses_back() {
        for kind in OpKind::ALL {
            assert_eq!(OpKind::parse(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn categories_are_disjoint() {
        for kind in OpKind::ALL {
            let count = [kind.is_boolean(), kind.is_transform(), kind.is_primitive()]
                .iter()
                .filter(|b| **b)
                .count();
            assert_eq!(count, 1, "{kind} must be in exactly one category");
        }
        assert!(!OpKind::Loft.is_stackable());
        assert!(OpKind::Loft.is_positioned());
        assert!(!OpKind::Lattice.is_positioned());
    }

    #[test]
    fn boolean_operands_round_trip_through_params() {
        let ids: Vec<String> = ["a", "b", "c", "d"].iter().map(|s| s.to_string()).collect();
        let op = Operation::new("u", OpKind::Union, Params::new(), ids.clone());
        assert_eq!(op.inputs, ids);
        assert_eq!(op.params["target"], json!("a"));
        assert_eq!(op.params["tool"], json!("b"));
        assert_eq!(op.params["tools"], json!(["c", "d"]));
    }

    #[test]
    fn transform_keeps_only_target() {
        let op = Operation::new(
            "t",
            OpKind::Translate,
            Params::new(),
            vec!["a".into(), "b".into()],
        );
        assert_eq!(op.inputs, vec!["a".to_string()]);
        assert!(op.params.get("tool").is_none());
    }

    #[test]
    fn primitives_ignore_operand_keys() {
        let mut params = Params::new();
        params.insert("target".into(), json!("x"));
        let op = Operation::new("b", OpKind::Box, params, vec!["y".into()]);
        assert!(op.inputs.is_empty());
    }
}
