//! `errmod` library crate.
//!
//! Ranks candidate residual error models (constant, proportional, two
//! combined forms, exponential) for population model outputs by AIC, BIC or a
//! custom penalty.
//!
//! The binary (`errmod`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the scorer can be embedded by other tools

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod logging;
pub mod math;
pub mod models;
pub mod report;

pub use domain::{Criterion, ErrorModelKind, ObservationSeries, PredictionSeries, RankedResult};
pub use error::{AppError, ScoreError};
pub use fit::score;
