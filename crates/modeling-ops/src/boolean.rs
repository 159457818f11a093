use mesh_kernel::{Solid, Tolerance};
use tracing::{debug, warn};

use crate::csg::Csg;
use crate::types::{AppliedFallback, BooleanFailure, Composition, FallbackAction};

/// Boolean operation type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BooleanKind {
    Union,
    Subtract,
    Intersect,
}

/// Limits for the exact boolean attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BooleanConfig {
    /// Combined polygon count above which the exact attempt is not made.
    pub max_polygons: usize,
    pub tolerance: Tolerance,
}

impl Default for BooleanConfig {
    fn default() -> Self {
        Self {
            max_polygons: 8192,
            tolerance: Tolerance::default(),
        }
    }
}

/// Attempt an exact boolean between two closed meshes.
///
/// Operands must be watertight; an exact result with no triangles is
/// reported as [`BooleanFailure::Empty`] so callers can tell "nothing left"
/// apart from "could not compute".
pub fn exact_boolean(
    kind: BooleanKind,
    a: &Solid,
    b: &Solid,
    config: &BooleanConfig,
) -> Result<Solid, BooleanFailure> {
    for (operand, solid) in [a, b].into_iter().enumerate() {
        if !solid.is_watertight_with(&config.tolerance) {
            return Err(BooleanFailure::NotWatertight { operand });
        }
    }

    let (ca, cb) = (Csg::from_solid(a), Csg::from_solid(b));
    let polygons = ca.polygon_count() + cb.polygon_count();
    if polygons > config.max_polygons {
        return Err(BooleanFailure::TooComplex {
            polygons,
            budget: config.max_polygons,
        });
    }

    let result = match kind {
        BooleanKind::Union => ca.union(&cb),
        BooleanKind::Subtract => ca.subtract(&cb),
        BooleanKind::Intersect => ca.intersect(&cb),
    };
    let solid = result.into_solid(&config.tolerance);
    if solid.is_empty() {
        return Err(BooleanFailure::Empty);
    }
    debug!(?kind, faces = solid.face_count(), "exact boolean succeeded");
    Ok(solid)
}

/// Combine two solids, degrading deterministically when the exact boolean
/// fails.
///
/// | kind      | empty result        | any other failure   |
/// |-----------|---------------------|---------------------|
/// | union     | both, concatenated  | both, concatenated  |
/// | subtract  | first operand       | first operand       |
/// | intersect | empty solid         | first operand       |
pub fn compose(kind: BooleanKind, a: &Solid, b: &Solid, config: &BooleanConfig) -> Composition {
    match exact_boolean(kind, a, b, config) {
        Ok(solid) => Composition {
            solid,
            fallbacks: Vec::new(),
        },
        Err(failure) => {
            let (solid, action) = match (kind, &failure) {
                (BooleanKind::Union, _) => (a.concatenate(b), FallbackAction::Concatenated),
                (BooleanKind::Subtract, _) => (a.clone(), FallbackAction::KeptFirstOperand),
                (BooleanKind::Intersect, BooleanFailure::Empty) => {
                    (Solid::empty(), FallbackAction::EmptyResult)
                }
                (BooleanKind::Intersect, _) => (a.clone(), FallbackAction::KeptFirstOperand),
            };
            warn!(?kind, %failure, ?action, "exact boolean failed, using fallback");
            Composition {
                solid,
                fallbacks: vec![AppliedFallback { failure, action }],
            }
        }
    }
}

/// Fold `compose` left to right over two or more operands.
///
/// A single operand passes through unchanged; no operands give an empty solid.
pub fn compose_all(kind: BooleanKind, operands: &[&Solid], config: &BooleanConfig) -> Composition {
    let Some((first, rest)) = operands.split_first() else {
        return Composition {
            solid: Solid::empty(),
            fallbacks: Vec::new(),
        };
    };

    rest.iter().fold(
        Composition {
            solid: (*first).clone(),
            fallbacks: Vec::new(),
        },
        |acc, next| {
            let step = compose(kind, &acc.solid, next, config);
            let mut fallbacks = acc.fallbacks;
            fallbacks.extend(step.fallbacks);
            Composition {
                solid: step.solid,
                fallbacks,
            }
        },
    )
}
