//! Shared recipe data model: operation kinds, normalized operations, the loose
//! upstream recipe shape, and the canonical `{"steps": [...]}` form consumed by
//! the external engine.

pub mod op;
pub mod recipe;

pub use op::*;
pub use recipe::*;
