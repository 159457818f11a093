//! Solid-combining operations: the boolean composer with its fallback ladder
//! and the final mesh repair pass.

pub mod boolean;
pub mod csg;
pub mod repair;
pub mod types;

pub use boolean::{compose, compose_all, exact_boolean, BooleanConfig, BooleanKind};
pub use csg::Csg;
pub use repair::{repair, RepairConfig, RepairFailure, RepairOutcome, RepairReport, RepairStep};
pub use types::*;
