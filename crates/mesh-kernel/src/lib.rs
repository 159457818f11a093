//! Triangle-mesh geometry kernel.
//!
//! Owns the [`Solid`] boundary-mesh type and everything that produces or
//! reshapes one without combining solids: parametric primitives, the gyroid
//! lattice, rigid and affine transforms, Laplacian smoothing, and the mesh
//! analysis (welding, watertightness, volume) the boolean and repair layers
//! build on.

pub mod lattice;
pub mod mesh;
pub mod primitives;
pub mod transform;
pub mod types;
pub mod weld;

pub use lattice::{
    make_gyroid_lattice, IsosurfaceError, LatticeConfig, LatticeOutcome, LatticeParams, MIN_LATTICE_EXTENT,
};
pub use mesh::{EdgeReport, Solid};
pub use primitives::*;
pub use transform::{rotate, scale, smooth_laplacian, translate};
pub use types::KernelError;
pub use weld::VertexWelder;

/// Geometric tolerances shared by the kernel, the boolean composer and repair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerance {
    /// Points closer than this are the same vertex (mm).
    pub weld: f64,
    /// Triangles with less area than this are degenerate (mm²).
    pub degenerate_area: f64,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            weld: 1e-5,
            degenerate_area: 1e-10,
        }
    }
}

impl Tolerance {
    /// Looser welding for meshes assembled from independently computed
    /// intersection points.
    pub fn coarse() -> Self {
        Self {
            weld: 1e-4,
            ..Self::default()
        }
    }
}
