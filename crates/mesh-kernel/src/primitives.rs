//! Parametric primitive construction.
//!
//! Boxes are extrusions of a rectangle; every round primitive is a revolution
//! of a radial `(r, z)` profile about the Z axis. Profile points on the axis
//! collapse to a single pole vertex, so cones and spheres stay closed without
//! degenerate slivers.
//!
//! Anchors: boxes and spheres are placed by their geometric center;
//! cylinders, cones and lofts by the center of their base plane.

use std::f64::consts::{PI, TAU};

use nalgebra::{Point3, Vector3};
use tracing::{info, instrument};

use crate::mesh::Solid;
use crate::types::{require_non_negative, require_positive, KernelError};

/// Lateral subdivisions used when a recipe does not say.
pub const DEFAULT_SECTIONS: u32 = 64;
/// Fewest lateral subdivisions that still enclose a volume.
pub const MIN_SECTIONS: u32 = 3;
/// Most lateral subdivisions a revolved primitive accepts.
pub const MAX_SECTIONS: u32 = 1024;
/// Minimum number of height bands on a loft.
pub const MIN_LOFT_RINGS: u32 = 16;

/// Build an axis-aligned box centered on `center`.
#[instrument(level = "debug")]
pub fn make_box(dx: f64, dy: f64, dz: f64, center: Point3<f64>) -> Result<Solid, KernelError> {
    require_positive("dx", dx)?;
    require_positive("dy", dy)?;
    require_positive("height", dz)?;
    info!(dx, dy, dz, "creating box primitive");

    let (hx, hy) = (dx / 2.0, dy / 2.0);
    let outline = [[-hx, -hy], [hx, -hy], [hx, hy], [-hx, hy]];
    let mut solid = extrude_outline(&outline, -dz / 2.0, dz / 2.0);
    offset_in_place(&mut solid, center.coords);
    Ok(solid)
}

/// Build a cylinder whose base center sits at `base`.
#[instrument(level = "debug")]
pub fn make_cylinder(
    radius: f64,
    height: f64,
    sections: u32,
    base: Point3<f64>,
) -> Result<Solid, KernelError> {
    require_positive("radius", radius)?;
    require_positive("height", height)?;
    info!(radius, height, sections, "creating cylinder primitive");

    let profile = [[0.0, 0.0], [radius, 0.0], [radius, height], [0.0, height]];
    let mut solid = revolve_profile(&profile, sections)?;
    offset_in_place(&mut solid, base.coords);
    Ok(solid)
}

/// Build a cone or frustum whose base center sits at `base`.
///
/// A zero top radius gives a sharp cone with one apex vertex; a zero bottom
/// radius gives the inverted cone.
#[instrument(level = "debug")]
pub fn make_cone(
    r_bottom: f64,
    r_top: f64,
    height: f64,
    sections: u32,
    base: Point3<f64>,
) -> Result<Solid, KernelError> {
    require_non_negative("r_bottom", r_bottom)?;
    require_non_negative("r_top", r_top)?;
    require_positive("height", height)?;
    if r_bottom == 0.0 && r_top == 0.0 {
        return Err(KernelError::invalid("r_bottom", "cone needs at least one non-zero radius"));
    }
    info!(r_bottom, r_top, height, sections, "creating cone primitive");

    let profile = [[0.0, 0.0], [r_bottom, 0.0], [r_top, height], [0.0, height]];
    let mut solid = revolve_profile(&profile, sections)?;
    offset_in_place(&mut solid, base.coords);
    Ok(solid)
}

/// Build a smooth transition between two radii whose base center sits at
/// `base`.
///
/// The radius follows a cosine ease, `r_b + (r_t - r_b)(1 - cos πt)/2`, over
/// `max(16, sections / 4)` height bands.
#[instrument(level = "debug")]
pub fn make_loft(
    r_bottom: f64,
    r_top: f64,
    height: f64,
    sections: u32,
    base: Point3<f64>,
) -> Result<Solid, KernelError> {
    require_non_negative("r_bottom", r_bottom)?;
    require_non_negative("r_top", r_top)?;
    require_positive("height", height)?;
    if r_bottom == 0.0 && r_top == 0.0 {
        return Err(KernelError::invalid("r_bottom", "loft needs at least one non-zero radius"));
    }

    check_sections(sections)?;
    let rings = MIN_LOFT_RINGS.max(sections / 4);
    info!(r_bottom, r_top, height, sections, rings, "creating loft primitive");

    let mut profile = Vec::with_capacity(rings as usize + 3);
    profile.push([0.0, 0.0]);
    for k in 0..=rings {
        let t = f64::from(k) / f64::from(rings);
        let eased = (1.0 - (PI * t).cos()) / 2.0;
        profile.push([r_bottom + (r_top - r_bottom) * eased, height * t]);
    }
    profile.push([0.0, height]);

    let mut solid = revolve_profile(&profile, sections)?;
    offset_in_place(&mut solid, base.coords);
    Ok(solid)
}

/// Build a latitude/longitude sphere centered on `center`.
///
/// `sections` meridians and `max(2, sections / 2)` latitude bands.
#[instrument(level = "debug")]
pub fn make_sphere(radius: f64, sections: u32, center: Point3<f64>) -> Result<Solid, KernelError> {
    require_positive("radius", radius)?;
    check_sections(sections)?;
    let bands = (sections / 2).max(2);
    info!(radius, sections, bands, "creating sphere primitive");

    let profile: Vec<[f64; 2]> = (0..=bands)
        .map(|k| {
            let phi = PI * f64::from(k) / f64::from(bands);
            let r = if k == 0 || k == bands {
                0.0
            } else {
                radius * phi.sin()
            };
            [r, -radius * phi.cos()]
        })
        .collect();

    let mut solid = revolve_profile(&profile, sections)?;
    offset_in_place(&mut solid, center.coords);
    Ok(solid)
}

fn check_sections(sections: u32) -> Result<u32, KernelError> {
    if (MIN_SECTIONS..=MAX_SECTIONS).contains(&sections) {
        Ok(sections)
    } else {
        Err(KernelError::invalid(
            "sections",
            format!("must be between {MIN_SECTIONS} and {MAX_SECTIONS}, got {sections}"),
        ))
    }
}

enum Station {
    Pole(u32),
    Ring(u32),
}

/// Revolve a radial profile about Z.
///
/// The profile runs from a point on the axis, outward and up, back to a point
/// on the axis; traversed that way it is counter-clockwise in the `(r, z)`
/// half-plane, which yields outward-facing triangles. Interior points on the
/// axis are dropped.
pub fn revolve_profile(profile: &[[f64; 2]], sections: u32) -> Result<Solid, KernelError> {
    check_sections(sections)?;
    let s = sections as usize;
    let last = profile.len().saturating_sub(1);

    let mut vertices = Vec::new();
    let mut stations = Vec::new();
    for (idx, &[r, z]) in profile.iter().enumerate() {
        let on_axis = r.abs() <= f64::EPSILON;
        let is_end = idx == 0 || idx == last;
        match (on_axis, is_end) {
            (true, true) => {
                stations.push(Station::Pole(vertices.len() as u32));
                vertices.push(Point3::new(0.0, 0.0, z));
            }
            (true, false) => {}
            (false, true) => {
                return Err(KernelError::DegenerateProfile {
                    reason: "profile must start and end on the axis".into(),
                });
            }
            (false, false) => {
                stations.push(Station::Ring(vertices.len() as u32));
                for i in 0..s {
                    let theta = TAU * i as f64 / s as f64;
                    vertices.push(Point3::new(r * theta.cos(), r * theta.sin(), z));
                }
            }
        }
    }

    if stations.len() < 3 {
        return Err(KernelError::DegenerateProfile {
            reason: "profile needs at least one point off the axis".into(),
        });
    }

    let mut faces = Vec::new();
    for pair in stations.windows(2) {
        for i in 0..s {
            let j = ((i + 1) % s) as u32;
            let i = i as u32;
            match (&pair[0], &pair[1]) {
                (Station::Pole(p), Station::Ring(b)) => faces.push([*p, b + j, b + i]),
                (Station::Ring(a), Station::Pole(p)) => faces.push([a + i, a + j, *p]),
                (Station::Ring(a), Station::Ring(b)) => {
                    faces.push([a + i, a + j, b + j]);
                    faces.push([a + i, b + j, b + i]);
                }
                (Station::Pole(_), Station::Pole(_)) => {
                    return Err(KernelError::DegenerateProfile {
                        reason: "consecutive poles enclose no volume".into(),
                    });
                }
            }
        }
    }

    Ok(Solid::new(vertices, faces))
}

/// Extrude a convex counter-clockwise outline between two heights.
fn extrude_outline(outline: &[[f64; 2]], z0: f64, z1: f64) -> Solid {
    let n = outline.len() as u32;
    let mut vertices = Vec::with_capacity(outline.len() * 2);
    vertices.extend(outline.iter().map(|&[x, y]| Point3::new(x, y, z0)));
    vertices.extend(outline.iter().map(|&[x, y]| Point3::new(x, y, z1)));

    let mut faces = Vec::new();
    for i in 1..n.saturating_sub(1) {
        faces.push([0, i + 1, i]);
        faces.push([n, n + i, n + i + 1]);
    }
    for i in 0..n {
        let j = (i + 1) % n;
        faces.push([i, j, n + j]);
        faces.push([i, n + j, n + i]);
    }
    Solid::new(vertices, faces)
}

pub(crate) fn offset_in_place(solid: &mut Solid, offset: Vector3<f64>) {
    if offset == Vector3::zeros() {
        return;
    }
    for v in &mut solid.vertices {
        *v += offset;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn box_counts_and_volume() {
        let b = make_box(2.0, 3.0, 4.0, Point3::origin()).unwrap();
        assert_eq!(b.vertex_count(), 8);
        assert_eq!(b.face_count(), 12);
        assert!(b.is_watertight(), "box must be closed");
        assert_relative_eq!(b.volume(), 24.0, epsilon = 1e-9);
    }

    #[test]
    fn box_is_centered_on_anchor() {
        let b = make_box(10.0, 10.0, 10.0, Point3::new(5.0, 0.0, 100.0)).unwrap();
        let (lo, hi) = b.bounding_box().unwrap();
        assert_relative_eq!(lo, Point3::new(0.0, -5.0, 95.0), epsilon = 1e-12);
        assert_relative_eq!(hi, Point3::new(10.0, 5.0, 105.0), epsilon = 1e-12);
    }

    #[test]
    fn cylinder_base_sits_on_anchor() {
        let c = make_cylinder(5.0, 20.0, 32, Point3::new(0.0, 0.0, 7.0)).unwrap();
        let (lo, hi) = c.bounding_box().unwrap();
        assert_relative_eq!(lo.z, 7.0);
        assert_relative_eq!(hi.z, 27.0);
        assert_eq!(c.vertex_count(), 2 * 32 + 2);
        assert!(c.is_watertight());
        assert!(c.volume() > 0.0, "outward winding gives positive volume");
    }

    #[test]
    fn cylinder_volume_approaches_analytic() {
        let c = make_cylinder(5.0, 10.0, 256, Point3::origin()).unwrap();
        let exact = PI * 25.0 * 10.0;
        assert_relative_eq!(c.volume(), exact, max_relative = 1e-3);
    }

    #[test]
    fn frustum_vertex_count() {
        for s in [3, 8, 64] {
            let f = make_cone(10.0, 4.0, 12.0, s, Point3::origin()).unwrap();
            assert_eq!(f.vertex_count(), 2 * s as usize + 2, "frustum with {s} sections");
            assert!(f.is_watertight());
        }
    }

    #[test]
    fn sharp_cone_vertex_count() {
        for s in [3, 16, 64] {
            let c = make_cone(10.0, 0.0, 12.0, s, Point3::origin()).unwrap();
            assert_eq!(c.vertex_count(), s as usize + 2, "sharp cone with {s} sections");
            assert!(c.is_watertight());
        }
    }

    #[test]
    fn inverted_cone_is_closed() {
        let c = make_cone(0.0, 6.0, 10.0, 24, Point3::origin()).unwrap();
        assert_eq!(c.vertex_count(), 24 + 2);
        assert!(c.is_watertight());
        assert!(c.volume() > 0.0);
    }

    #[test]
    fn more_sections_more_vertices() {
        let coarse = make_cone(10.0, 5.0, 10.0, 16, Point3::origin()).unwrap();
        let fine = make_cone(10.0, 5.0, 10.0, 17, Point3::origin()).unwrap();
        assert!(fine.vertex_count() > coarse.vertex_count());
    }

    #[test]
    fn cone_rejects_zero_radii_and_few_sections() {
        assert!(make_cone(0.0, 0.0, 10.0, 16, Point3::origin()).is_err());
        assert!(make_cone(5.0, 0.0, 10.0, 2, Point3::origin()).is_err());
        assert!(make_cone(5.0, 0.0, 10.0, MAX_SECTIONS + 1, Point3::origin()).is_err());
        assert!(make_sphere(5.0, u32::MAX, Point3::origin()).is_err());
        assert!(make_cone(5.0, 0.0, -1.0, 16, Point3::origin()).is_err());
    }

    #[test]
    fn loft_ring_count_and_radii() {
        let l = make_loft(10.0, 5.0, 20.0, 64, Point3::origin()).unwrap();
        // 17 rings of 64 plus two cap centers.
        assert_eq!(l.vertex_count(), 17 * 64 + 2);
        assert!(l.is_watertight());

        let (lo, hi) = l.bounding_box().unwrap();
        assert_relative_eq!(hi.x, 10.0, epsilon = 1e-9);
        assert_relative_eq!(lo.z, 0.0);
        assert_relative_eq!(hi.z, 20.0);
        let top_ring_max = l
            .vertices
            .iter()
            .filter(|v| (v.z - 20.0).abs() < 1e-9)
            .map(|v| v.x)
            .fold(f64::MIN, f64::max);
        assert_relative_eq!(top_ring_max, 5.0, epsilon = 1e-9);
    }

    #[test]
    fn loft_to_a_point_drops_the_collapsed_ring() {
        let l = make_loft(8.0, 0.0, 10.0, 64, Point3::origin()).unwrap();
        assert_eq!(l.vertex_count(), 16 * 64 + 2);
        assert!(l.is_watertight());
    }

    #[test]
    fn sphere_is_centered_and_closed() {
        let s = make_sphere(5.0, 32, Point3::new(1.0, 2.0, 3.0)).unwrap();
        let (lo, hi) = s.bounding_box().unwrap();
        assert_relative_eq!(lo.z, -2.0, epsilon = 1e-9);
        assert_relative_eq!(hi.z, 8.0, epsilon = 1e-9);
        assert_eq!(s.vertex_count(), 15 * 32 + 2);
        assert!(s.is_watertight());
        let exact = 4.0 / 3.0 * PI * 125.0;
        assert_relative_eq!(s.volume(), exact, max_relative = 0.03);
    }

    #[test]
    fn revolve_rejects_open_profile() {
        let err = revolve_profile(&[[1.0, 0.0], [1.0, 1.0], [0.0, 1.0]], 8).unwrap_err();
        assert!(matches!(err, KernelError::DegenerateProfile { .. }));
    }
}
