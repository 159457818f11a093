//! Property-based tests for primitive and transform invariants.

use approx::relative_eq;
use nalgebra::{Point3, Vector3};
use proptest::prelude::*;

use mesh_kernel::{make_box, make_cone, make_cylinder, make_loft, rotate, scale, translate};

// ---------------------------------------------------------------------------
// Strategy helpers
// ---------------------------------------------------------------------------

fn arb_dim() -> impl Strategy<Value = f64> {
    0.5f64..200.0
}

fn arb_sections() -> impl Strategy<Value = u32> {
    3u32..128
}

fn arb_point() -> impl Strategy<Value = Point3<f64>> {
    (-500.0f64..500.0, -500.0f64..500.0, -500.0f64..500.0).prop_map(|(x, y, z)| Point3::new(x, y, z))
}

const TOL: f64 = 1e-9;

// ---------------------------------------------------------------------------
// 1. Frustum and cone vertex counts follow the section count
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn frustum_has_two_rings_and_two_poles(
        r_bottom in arb_dim(),
        r_top in arb_dim(),
        height in arb_dim(),
        sections in arb_sections(),
    ) {
        let solid = make_cone(r_bottom, r_top, height, sections, Point3::origin()).unwrap();
        prop_assert_eq!(solid.vertex_count(), 2 * sections as usize + 2);
        prop_assert!(solid.is_watertight());
    }

    #[test]
    fn sharp_cone_has_one_ring_and_two_poles(
        r_bottom in arb_dim(),
        height in arb_dim(),
        sections in arb_sections(),
    ) {
        let solid = make_cone(r_bottom, 0.0, height, sections, Point3::origin()).unwrap();
        prop_assert_eq!(solid.vertex_count(), sections as usize + 2);
        prop_assert!(solid.is_watertight());
    }
}

// ---------------------------------------------------------------------------
// 2. Higher resolution strictly adds vertices
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn more_sections_more_vertices(
        radius in arb_dim(),
        height in arb_dim(),
        sections in 3u32..96,
        extra in 1u32..32,
    ) {
        let coarse = make_cylinder(radius, height, sections, Point3::origin()).unwrap();
        let fine = make_cylinder(radius, height, sections + extra, Point3::origin()).unwrap();
        prop_assert!(fine.vertex_count() > coarse.vertex_count());
    }
}

// ---------------------------------------------------------------------------
// 3. Box volume and anchor
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn box_volume_is_product(
        dx in arb_dim(),
        dy in arb_dim(),
        dz in arb_dim(),
        center in arb_point(),
    ) {
        let solid = make_box(dx, dy, dz, center).unwrap();
        let volume = solid.volume();
        prop_assert!(relative_eq!(volume, dx * dy * dz, max_relative = 1e-9),
            "volume {} != {}", volume, dx * dy * dz);
        let (min, max) = solid.bounding_box().unwrap();
        prop_assert!(relative_eq!(nalgebra::center(&min, &max), center, epsilon = 1e-6));
    }
}

// ---------------------------------------------------------------------------
// 4. Loft stays between its radii and sits on its base plane
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn loft_sits_on_base(
        r_bottom in arb_dim(),
        r_top in arb_dim(),
        height in arb_dim(),
        base in arb_point(),
    ) {
        let solid = make_loft(r_bottom, r_top, height, 32, base).unwrap();
        let (min, max) = solid.bounding_box().unwrap();
        prop_assert!((min.z - base.z).abs() < 1e-6);
        prop_assert!((max.z - base.z - height).abs() < 1e-6);
        let r_max = r_bottom.max(r_top);
        prop_assert!(max.x - base.x <= r_max + 1e-6);
        prop_assert!(solid.is_watertight());
    }
}

// ---------------------------------------------------------------------------
// 5. Rigid transforms preserve volume
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn rigid_transforms_preserve_volume(
        size in arb_dim(),
        offset in arb_point(),
        angle in -360.0f64..360.0,
    ) {
        let solid = make_box(size, size, size, Point3::origin()).unwrap();
        let moved = translate(&solid, offset.coords);
        let turned = rotate(&moved, Vector3::new(1.0, 1.0, 0.0), angle).unwrap();
        let v = size * size * size;
        prop_assert!(relative_eq!(turned.volume(), v, max_relative = 1e-6));
        prop_assert!(turned.is_watertight());
    }

    #[test]
    fn scale_multiplies_volume(
        size in arb_dim(),
        fx in 0.1f64..5.0,
        fy in -5.0f64..-0.1,
        fz in 0.1f64..5.0,
    ) {
        let solid = make_box(size, size, size, Point3::origin()).unwrap();
        let scaled = scale(&solid, Vector3::new(fx, fy, fz)).unwrap();
        let expected = size * size * size * (fx * fy * fz).abs();
        prop_assert!(relative_eq!(scaled.volume(), expected, max_relative = 1e-9));
        prop_assert!(scaled.volume() > TOL);
    }
}
