//! Residual error model implementations.
//!
//! Models are implemented as small, pure functions so that fitting/scoring code can
//! stay generic.

pub mod model;

pub use model::*;
