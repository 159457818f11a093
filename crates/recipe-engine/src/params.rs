//! Typed parameter extraction.
//!
//! Upstream values are loose JSON: numbers may arrive as strings and integer
//! counts as floats. Missing values take the documented defaults; values that
//! are present but unusable are errors.

use mesh_kernel::{LatticeParams, DEFAULT_SECTIONS, MAX_SECTIONS};
use nalgebra::{Point3, Vector3};
use recipe_types::Params;
use serde_json::Value;
use tracing::warn;

pub const DEFAULT_BOX_SIZE: f64 = 10.0;
pub const DEFAULT_CYLINDER_RADIUS: f64 = 5.0;
pub const DEFAULT_HEIGHT: f64 = 10.0;
pub const DEFAULT_CONE_BOTTOM_RADIUS: f64 = 10.0;
pub const DEFAULT_LOFT_TOP_RADIUS: f64 = 5.0;
pub const DEFAULT_SPHERE_RADIUS: f64 = 5.0;
pub const DEFAULT_SPHERE_SECTIONS: u32 = 32;
pub const DEFAULT_LATTICE_BOUNDS: [f64; 6] = [0.0, 0.0, 0.0, 50.0, 50.0, 50.0];
pub const DEFAULT_UNIT_SIZE: f64 = 5.0;
pub const DEFAULT_THICKNESS: f64 = 1.0;
pub const DEFAULT_SMOOTH_ITERATIONS: u32 = 1;
pub const MAX_SMOOTH_ITERATIONS: u32 = 100;

/// A parameter that is present but cannot be used.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParamError {
    #[error("`{name}` must be a number, got {value}")]
    NotANumber { name: String, value: String },

    #[error("`{name}` must be a whole number of at least zero, got {value}")]
    NotACount { name: String, value: String },

    #[error("`{name}` must be a list of {expected} numbers, got {value}")]
    BadList {
        name: String,
        expected: usize,
        value: String,
    },
}

/// Read a JSON number or a numeric string.
pub fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub fn opt_f64(params: &Params, name: &str) -> Result<Option<f64>, ParamError> {
    match params.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => number(value)
            .filter(|v| v.is_finite())
            .map(Some)
            .ok_or_else(|| ParamError::NotANumber {
                name: name.to_string(),
                value: value.to_string(),
            }),
    }
}

pub fn f64_or(params: &Params, name: &str, default: f64) -> Result<f64, ParamError> {
    Ok(opt_f64(params, name)?.unwrap_or(default))
}

/// A non-negative integer count, capped at `max`.
pub fn count_or(params: &Params, name: &str, default: u32, max: u32) -> Result<u32, ParamError> {
    let Some(value) = opt_f64(params, name)? else {
        return Ok(default.min(max));
    };
    if value < 0.0 || value.fract() != 0.0 {
        return Err(ParamError::NotACount {
            name: name.to_string(),
            value: value.to_string(),
        });
    }
    if value > f64::from(max) {
        warn!(name, value, cap = max, "count capped");
        return Ok(max);
    }
    Ok(value as u32)
}

fn list_or<const N: usize>(params: &Params, name: &str, default: [f64; N]) -> Result<[f64; N], ParamError> {
    let bad = |value: &Value| ParamError::BadList {
        name: name.to_string(),
        expected: N,
        value: value.to_string(),
    };
    match params.get(name) {
        None | Some(Value::Null) => Ok(default),
        Some(value @ Value::Array(items)) => {
            if items.len() < N {
                return Err(bad(value));
            }
            let mut out = [0.0; N];
            for (slot, item) in out.iter_mut().zip(items) {
                *slot = number(item).filter(|v| v.is_finite()).ok_or_else(|| bad(value))?;
            }
            Ok(out)
        }
        Some(value) => Err(bad(value)),
    }
}

/// The `x, y, z` anchor of a positioned primitive.
pub fn position(params: &Params) -> Result<Point3<f64>, ParamError> {
    Ok(Point3::new(
        f64_or(params, "x", 0.0)?,
        f64_or(params, "y", 0.0)?,
        f64_or(params, "z", 0.0)?,
    ))
}

fn sections(params: &Params, default: u32) -> Result<u32, ParamError> {
    count_or(params, "sections", default, MAX_SECTIONS)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxParams {
    pub dx: f64,
    pub dy: f64,
    pub height: f64,
    pub center: Point3<f64>,
}

impl BoxParams {
    pub fn from_params(params: &Params) -> Result<Self, ParamError> {
        Ok(Self {
            dx: f64_or(params, "dx", DEFAULT_BOX_SIZE)?,
            dy: f64_or(params, "dy", DEFAULT_BOX_SIZE)?,
            height: f64_or(params, "height", DEFAULT_BOX_SIZE)?,
            center: position(params)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CylinderParams {
    pub radius: f64,
    pub height: f64,
    pub sections: u32,
    pub base: Point3<f64>,
}

impl CylinderParams {
    pub fn from_params(params: &Params) -> Result<Self, ParamError> {
        Ok(Self {
            radius: f64_or(params, "radius", DEFAULT_CYLINDER_RADIUS)?,
            height: f64_or(params, "height", DEFAULT_HEIGHT)?,
            sections: sections(params, DEFAULT_SECTIONS)?,
            base: position(params)?,
        })
    }
}

/// Cones and lofts: two radii over a height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaperParams {
    pub r_bottom: f64,
    pub r_top: f64,
    pub height: f64,
    pub sections: u32,
    pub base: Point3<f64>,
}

impl TaperParams {
    /// A plain `radius` stands in for the bottom radius.
    pub fn from_params(params: &Params, default_top: f64) -> Result<Self, ParamError> {
        let r_bottom = match opt_f64(params, "r_bottom")? {
            Some(r) => r,
            None => f64_or(params, "radius", DEFAULT_CONE_BOTTOM_RADIUS)?,
        };
        Ok(Self {
            r_bottom,
            r_top: f64_or(params, "r_top", default_top)?,
            height: f64_or(params, "height", DEFAULT_HEIGHT)?,
            sections: sections(params, DEFAULT_SECTIONS)?,
            base: position(params)?,
        })
    }

    pub fn cone(params: &Params) -> Result<Self, ParamError> {
        Self::from_params(params, 0.0)
    }

    pub fn loft(params: &Params) -> Result<Self, ParamError> {
        Self::from_params(params, DEFAULT_LOFT_TOP_RADIUS)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphereParams {
    pub radius: f64,
    pub sections: u32,
    pub center: Point3<f64>,
}

impl SphereParams {
    pub fn from_params(params: &Params) -> Result<Self, ParamError> {
        Ok(Self {
            radius: f64_or(params, "radius", DEFAULT_SPHERE_RADIUS)?,
            sections: sections(params, DEFAULT_SPHERE_SECTIONS)?,
            center: position(params)?,
        })
    }
}

/// Lattice bounds are `[x0, y0, z0, width, depth, height]`.
pub fn lattice_params(params: &Params) -> Result<LatticeParams, ParamError> {
    if let Some(kind) = params.get("type").and_then(Value::as_str) {
        if !kind.eq_ignore_ascii_case("gyroid") {
            warn!(kind, "unsupported lattice type, building a gyroid");
        }
    }
    let [x0, y0, z0, w, d, h] = list_or(params, "bounds", DEFAULT_LATTICE_BOUNDS)?;
    Ok(LatticeParams {
        origin: Point3::new(x0, y0, z0),
        size: Vector3::new(w, d, h),
        unit_size: f64_or(params, "unit_size", DEFAULT_UNIT_SIZE)?,
        thickness: f64_or(params, "thickness", DEFAULT_THICKNESS)?,
    })
}

pub fn translation(params: &Params) -> Result<Vector3<f64>, ParamError> {
    Ok(position(params)?.coords)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotateParams {
    pub axis: Vector3<f64>,
    pub angle_deg: f64,
}

impl RotateParams {
    pub fn from_params(params: &Params) -> Result<Self, ParamError> {
        let [x, y, z] = list_or(params, "axis", [0.0, 0.0, 1.0])?;
        Ok(Self {
            axis: Vector3::new(x, y, z),
            angle_deg: f64_or(params, "angle", 0.0)?,
        })
    }
}

/// Per-axis factors; a uniform `factor` fills any axis not given.
pub fn scale_factors(params: &Params) -> Result<Vector3<f64>, ParamError> {
    let uniform = f64_or(params, "factor", 1.0)?;
    Ok(Vector3::new(
        f64_or(params, "x", uniform)?,
        f64_or(params, "y", uniform)?,
        f64_or(params, "z", uniform)?,
    ))
}

pub fn smooth_iterations(params: &Params) -> Result<u32, ParamError> {
    count_or(params, "iterations", DEFAULT_SMOOTH_ITERATIONS, MAX_SMOOTH_ITERATIONS)
}
