use approx::assert_relative_eq;
use mesh_kernel::{IsosurfaceError, KernelError};
use modeling_ops::{BooleanFailure, FallbackAction};
use recipe_engine::{CompileError, CompileOptions, Compiler, OpError, ParamError};
use recipe_types::{Mode, OpKind, RawOperation, RawRecipe};
use serde_json::json;

fn compiler() -> Compiler {
    Compiler::new(CompileOptions::preview())
}

fn engineering(steps: Vec<RawOperation>) -> RawRecipe {
    RawRecipe::new(Mode::Engineering, steps)
}

fn cube(id: &str, size: f64) -> RawOperation {
    RawOperation::new("box")
        .with_id(id)
        .with_param("dx", size)
        .with_param("dy", size)
        .with_param("height", size)
}

// ── Primitives ──────────────────────────────────────────────────────────

#[test]
fn single_box_compiles_watertight() {
    let out = compiler()
        .compile(&engineering(vec![RawOperation::new("box")
            .with_param("dx", 10)
            .with_param("dy", 20)
            .with_param("height", 5)]))
        .unwrap();
    assert!(out.watertight);
    assert!(out.repair.already_watertight);
    assert_eq!(out.output_id, "step_0");
    assert_relative_eq!(out.solid.volume(), 1000.0, epsilon = 1e-9);
    assert_eq!(out.records.len(), 1);
    assert_eq!(out.records[0].face_count, 12);
}

#[test]
fn defaults_fill_missing_parameters() {
    let out = compiler()
        .compile(&engineering(vec![RawOperation::new("box")]))
        .unwrap();
    assert_relative_eq!(out.solid.volume(), 1000.0, epsilon = 1e-9);
}

#[test]
fn cylinder_anchor_is_base_center() {
    let out = compiler()
        .compile(&engineering(vec![RawOperation::new("cylinder")
            .with_param("radius", 3)
            .with_param("height", 8)
            .with_param("z", 2)]))
        .unwrap();
    let (min, max) = out.solid.bounding_box().unwrap();
    assert_relative_eq!(min.z, 2.0, epsilon = 1e-9);
    assert_relative_eq!(max.z, 10.0, epsilon = 1e-9);
}

// ── Booleans ────────────────────────────────────────────────────────────

#[test]
fn through_hole_subtract_is_exact() {
    let sections = 32u32;
    let out = compiler()
        .compile(&engineering(vec![
            cube("block", 20.0),
            RawOperation::new("cylinder")
                .with_id("bore")
                .with_param("radius", 4)
                .with_param("height", 30)
                .with_param("z", -15)
                .with_param("sections", sections),
            RawOperation::new("subtract"),
        ]))
        .unwrap();

    assert!(out.records[2].boolean_fallbacks.is_empty());
    let n = f64::from(sections);
    let bore_area = 0.5 * n * 16.0 * (std::f64::consts::TAU / n).sin();
    assert_relative_eq!(out.solid.volume(), 8000.0 - 20.0 * bore_area, max_relative = 1e-6);
}

#[test]
fn subtract_with_open_tool_keeps_target() {
    let out = compiler()
        .compile(&engineering(vec![
            RawOperation::new("box")
                .with_id("block")
                .with_param("dx", 10)
                .with_param("dy", 10)
                .with_param("height", 10)
                .with_param("center", json!([5, 5, 5])),
            RawOperation::new("lattice")
                .with_id("infill")
                .with_param("bounds", json!([0, 0, 0, 10, 10, 10])),
            RawOperation::new("subtract")
                .with_param("target", "block")
                .with_param("tool", "infill"),
        ]))
        .unwrap();

    let record = &out.records[2];
    assert_eq!(record.kind, OpKind::Subtract);
    assert_eq!(record.boolean_fallbacks.len(), 1);
    assert_eq!(
        record.boolean_fallbacks[0].failure,
        BooleanFailure::NotWatertight { operand: 1 }
    );
    assert_eq!(record.boolean_fallbacks[0].action, FallbackAction::KeptFirstOperand);
    assert!(!out.solid.is_empty());
    assert_relative_eq!(out.solid.volume(), 1000.0, epsilon = 1e-9);
}

#[test]
fn disjoint_intersection_is_an_empty_result() {
    let err = compiler()
        .compile(&engineering(vec![
            cube("a", 2.0),
            cube("b", 2.0).with_param("x", 100),
            RawOperation::new("intersect"),
        ]))
        .unwrap_err();
    assert_eq!(err, CompileError::EmptyResult);
}

// ── Lattice ─────────────────────────────────────────────────────────────

#[test]
fn unbracketed_lattice_falls_back_to_box() {
    let out = compiler()
        .compile(&engineering(vec![RawOperation::new("lattice")
            .with_param("bounds_mm", json!([0, 0, 0, 10, 10, 10]))
            .with_param("unit_size", 5)
            .with_param("thickness", 10)]))
        .unwrap();
    assert!(matches!(
        out.records[0].lattice_fallback,
        Some(IsosurfaceError::LevelNotBracketed { .. })
    ));
    assert!(out.records[0].used_fallback());
    assert_relative_eq!(out.solid.volume(), 1000.0, epsilon = 1e-9);
}

#[test]
fn flat_lattice_bounds_do_not_fail_the_compile() {
    let out = compiler()
        .compile(&engineering(vec![RawOperation::new("lattice")
            .with_param("bounds", json!([0, 0, 0, 10, 10, 0]))]))
        .unwrap();
    assert_eq!(
        out.records[0].lattice_fallback,
        Some(IsosurfaceError::DegenerateBounds {
            axis: "height",
            extent: 0.0
        })
    );
    assert!(out.watertight);
    assert_relative_eq!(out.solid.volume(), 100.0 * mesh_kernel::MIN_LATTICE_EXTENT, max_relative = 1e-9);
}

#[test]
fn gyroid_lattice_builds_a_surface() {
    let out = compiler()
        .compile(&engineering(vec![RawOperation::new("gyroid")
            .with_param("bounds", json!([0, 0, 0, 10, 10, 10]))]))
        .unwrap();
    assert!(out.records[0].lattice_fallback.is_none());
    assert!(out.solid.face_count() > 100);
}

// ── Transforms ──────────────────────────────────────────────────────────

#[test]
fn translate_moves_previous_result() {
    let out = compiler()
        .compile(&engineering(vec![
            cube("a", 10.0),
            RawOperation::new("move").with_param("x", 10),
        ]))
        .unwrap();
    let (min, max) = out.solid.bounding_box().unwrap();
    assert_relative_eq!(min.x, 5.0, epsilon = 1e-9);
    assert_relative_eq!(max.x, 15.0, epsilon = 1e-9);
}

#[test]
fn rotate_quarter_turn_swaps_extents() {
    let out = compiler()
        .compile(&engineering(vec![
            RawOperation::new("box")
                .with_param("dx", 20)
                .with_param("dy", 10)
                .with_param("height", 2),
            RawOperation::new("rotate").with_param("angle_deg", 90),
        ]))
        .unwrap();
    let (min, max) = out.solid.bounding_box().unwrap();
    assert_relative_eq!(max.x - min.x, 10.0, epsilon = 1e-9);
    assert_relative_eq!(max.y - min.y, 20.0, epsilon = 1e-9);
}

#[test]
fn mirroring_scale_keeps_positive_volume() {
    let out = compiler()
        .compile(&engineering(vec![
            cube("a", 2.0),
            RawOperation::new("scale").with_param("x", -3),
        ]))
        .unwrap();
    assert!(out.watertight);
    assert_relative_eq!(out.solid.volume(), 24.0, epsilon = 1e-9);
}

#[test]
fn smoothing_keeps_topology() {
    let out = compiler()
        .compile(&engineering(vec![
            RawOperation::new("sphere").with_param("radius", 5),
            RawOperation::new("smooth").with_param("iterations", 3),
        ]))
        .unwrap();
    assert_eq!(out.records[0].face_count, out.records[1].face_count);
    let sphere = 4.0 / 3.0 * std::f64::consts::PI * 125.0;
    assert!(out.solid.volume() > 0.0 && out.solid.volume() < sphere);
}

// ── Errors ──────────────────────────────────────────────────────────────

#[test]
fn empty_recipe_is_an_empty_result() {
    assert_eq!(
        compiler().compile(&engineering(Vec::new())).unwrap_err(),
        CompileError::EmptyResult
    );
}

#[test]
fn forward_reference_fails_before_building() {
    let err = compiler()
        .compile(&engineering(vec![
            cube("a", 1.0),
            RawOperation::new("union")
                .with_id("u")
                .with_param("target", "a")
                .with_param("tool", "later"),
            cube("later", 1.0),
        ]))
        .unwrap_err();
    assert_eq!(
        err,
        CompileError::UnresolvedOperand {
            id: "u".into(),
            operand: "later".into(),
        }
    );
}

#[test]
fn bad_parameter_aborts_with_operation_context() {
    let err = compiler()
        .compile(&engineering(vec![
            cube("a", 1.0),
            RawOperation::new("cylinder").with_id("c").with_param("radius", "wide"),
        ]))
        .unwrap_err();
    match err {
        CompileError::OperationExecution { id, kind, source } => {
            assert_eq!(id, "c");
            assert_eq!(kind, OpKind::Cylinder);
            assert!(matches!(source, OpError::Param(ParamError::NotANumber { .. })));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn kernel_rejection_aborts_with_operation_context() {
    let err = compiler()
        .compile(&engineering(vec![RawOperation::new("sphere")
            .with_id("s")
            .with_param("radius", -1)]))
        .unwrap_err();
    assert!(matches!(
        err,
        CompileError::OperationExecution {
            kind: OpKind::Sphere,
            source: OpError::Kernel(KernelError::InvalidParameter { .. }),
            ..
        }
    ));
}

// ── Output ──────────────────────────────────────────────────────────────

#[test]
fn output_name_selects_result() {
    let mut recipe = engineering(vec![cube("small", 1.0), cube("large", 3.0)]);
    recipe.output_name = Some("small".into());
    let out = compiler().compile(&recipe).unwrap();
    assert_eq!(out.output_id, "small");
    assert_relative_eq!(out.solid.volume(), 1.0, epsilon = 1e-9);
}

#[test]
fn unknown_output_name_uses_last_operation() {
    let mut recipe = engineering(vec![cube("small", 1.0), cube("large", 3.0)]);
    recipe.output_name = Some("missing".into());
    let out = compiler().compile(&recipe).unwrap();
    assert_eq!(out.output_id, "large");
}

#[test]
fn canonical_recipe_matches_operations() {
    let out = compiler()
        .compile(&RawRecipe::new(
            Mode::Creative,
            vec![
                cube("base", 4.0),
                RawOperation::new("sphere").with_id("dome").with_param("radius", 2),
                RawOperation::new("union"),
            ],
        ))
        .unwrap();
    assert_eq!(out.canonical.steps.len(), 3);
    assert_eq!(out.canonical.clone().into_operations(), out.operations);
    let json = serde_json::to_value(&out.canonical).unwrap();
    assert_eq!(json["steps"][2]["op"], json!("union"));
    assert_eq!(json["steps"][2]["params"]["target"], json!("base"));
    assert_eq!(json["steps"][1]["params"]["z"], json!(4.0));
}
