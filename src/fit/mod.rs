//! Error-model fitting orchestration.
//!
//! Responsibilities:
//!
//! - pair observations with (possibly replicated) predictions and filter them
//! - estimate the five error models (closed forms + Nelder–Mead chain)
//! - score and rank them by AIC / BIC / custom penalty
//! - weighted-residual diagnostics for a chosen model

pub mod fitter;
pub mod pairs;
pub mod residuals;
pub mod selection;

pub use fitter::*;
pub use pairs::*;
pub use residuals::*;
pub use selection::*;
