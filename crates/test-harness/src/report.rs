//! Structured text-based compile reports.
//!
//! Reports are natural language, not JSON, because they are read by people
//! and agents diagnosing a recipe, not by other programs.

use std::fmt;

use mesh_kernel::Tolerance;
use modeling_ops::FallbackAction;
use recipe_engine::CompileOutput;

use crate::helpers::solid_bounding_box;
use crate::oracle::{self, OracleVerdict};

/// A complete compile report with all sections.
pub struct CompileReport {
    pub entries: Vec<OperationEntry>,
    pub output_id: String,
    pub vertex_count: usize,
    pub face_count: usize,
    pub bounding_box: Option<([f64; 3], [f64; 3])>,
    pub volume: f64,
    pub watertight: bool,
    pub repair_steps: Vec<String>,
    pub oracle_results: Vec<OracleVerdict>,
}

/// One executed operation.
pub struct OperationEntry {
    pub index: usize,
    pub id: String,
    pub kind: String,
    pub inputs: Vec<String>,
    pub vertex_count: usize,
    pub face_count: usize,
    pub fallbacks: Vec<String>,
}

impl CompileReport {
    pub fn from_output(output: &CompileOutput) -> Self {
        let entries = output
            .records
            .iter()
            .enumerate()
            .map(|(index, record)| {
                let inputs = output
                    .operations
                    .iter()
                    .find(|op| op.id == record.id)
                    .map(|op| op.inputs.clone())
                    .unwrap_or_default();
                let mut fallbacks: Vec<String> = record
                    .boolean_fallbacks
                    .iter()
                    .map(|f| format!("{} -> {}", f.failure, describe_action(f.action)))
                    .collect();
                if let Some(err) = &record.lattice_fallback {
                    fallbacks.push(format!("{} -> bounding box", err));
                }
                OperationEntry {
                    index,
                    id: record.id.clone(),
                    kind: record.kind.to_string(),
                    inputs,
                    vertex_count: record.vertex_count,
                    face_count: record.face_count,
                    fallbacks,
                }
            })
            .collect();

        let repair_steps = if output.repair.already_watertight {
            Vec::new()
        } else {
            let applied = output
                .repair
                .applied
                .iter()
                .map(|(step, changed)| format!("{:?}: {} changed", step, changed));
            let skipped = output
                .repair
                .skipped
                .iter()
                .map(|(step, why)| format!("{:?}: skipped ({})", step, why));
            applied.chain(skipped).collect()
        };

        let solid = &output.solid;
        Self {
            entries,
            output_id: output.output_id.clone(),
            vertex_count: solid.vertex_count(),
            face_count: solid.face_count(),
            bounding_box: (!solid.is_empty()).then(|| solid_bounding_box(solid)),
            volume: solid.volume(),
            watertight: output.watertight,
            repair_steps,
            oracle_results: oracle::run_all_checks(solid, &Tolerance::default()),
        }
    }

    pub fn fallback_count(&self) -> usize {
        self.entries.iter().filter(|e| !e.fallbacks.is_empty()).count()
    }

    /// Format the report as text.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        out.push_str("=== Recipe Compile Report ===\n\n");

        out.push_str(&format!(
            "Operations ({} executed, {} with fallbacks):\n",
            self.entries.len(),
            self.fallback_count(),
        ));
        for entry in &self.entries {
            let marker = if entry.id == self.output_id { " [OUTPUT]" } else { "" };
            out.push_str(&format!(
                "  [{}] {} \"{}\"{}\n",
                entry.index, entry.kind, entry.id, marker,
            ));
            if !entry.inputs.is_empty() {
                out.push_str(&format!("      Inputs: {}\n", entry.inputs.join(", ")));
            }
            out.push_str(&format!(
                "      Mesh: {} vertices, {} faces\n",
                entry.vertex_count, entry.face_count,
            ));
            for fallback in &entry.fallbacks {
                out.push_str(&format!("      Fallback: {}\n", fallback));
            }
        }

        out.push_str(&format!(
            "\nOutput \"{}\": {} vertices, {} faces, volume {:.3}, {}\n",
            self.output_id,
            self.vertex_count,
            self.face_count,
            self.volume,
            if self.watertight { "watertight" } else { "NOT watertight" },
        ));

        if let Some((min, max)) = self.bounding_box {
            out.push_str(&format!(
                "Bounding Box: ({:.1}, {:.1}, {:.1}) -> ({:.1}, {:.1}, {:.1})\n",
                min[0], min[1], min[2], max[0], max[1], max[2],
            ));
        }

        if self.repair_steps.is_empty() {
            out.push_str("\nRepair: none needed\n");
        } else {
            out.push_str(&format!("\nRepair ({} steps):\n", self.repair_steps.len()));
            for step in &self.repair_steps {
                out.push_str(&format!("  {}\n", step));
            }
        }

        if !self.oracle_results.is_empty() {
            out.push_str(&format!(
                "\nOracle Results ({} checks):\n",
                self.oracle_results.len()
            ));
            for v in &self.oracle_results {
                let status = if v.passed { "PASS" } else { "FAIL" };
                out.push_str(&format!("  [{}] {}: {}\n", status, v.oracle_name, v.detail));
            }
        }

        out
    }
}

fn describe_action(action: FallbackAction) -> &'static str {
    match action {
        FallbackAction::Concatenated => "concatenated",
        FallbackAction::KeptFirstOperand => "kept first operand",
        FallbackAction::EmptyResult => "empty result",
    }
}

impl fmt::Display for CompileReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_text())
    }
}
