use mesh_kernel::Solid;

/// Why an exact boolean produced no usable result.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BooleanFailure {
    #[error("boolean result is empty")]
    Empty,

    #[error("operand {operand} is not watertight")]
    NotWatertight { operand: usize },

    #[error("operands too complex for exact boolean: {polygons} polygons, budget {budget}")]
    TooComplex { polygons: usize, budget: usize },
}

/// What the composer did instead of the exact boolean.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackAction {
    /// Both operands kept side by side without fusing.
    Concatenated,
    /// The first operand passed through unchanged.
    KeptFirstOperand,
    /// An explicitly empty solid.
    EmptyResult,
}

/// A fallback taken while composing, with the failure that triggered it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedFallback {
    pub failure: BooleanFailure,
    pub action: FallbackAction,
}

/// Result of composing solids: always a solid, plus any fallbacks taken.
#[derive(Debug, Clone)]
pub struct Composition {
    pub solid: Solid,
    pub fallbacks: Vec<AppliedFallback>,
}
