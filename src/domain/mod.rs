//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - validated input series (`ObservationSeries`, `PredictionSeries`)
//! - the closed set of error models (`ErrorModelKind`) and the `Criterion`
//! - scoring outputs (`ScoredCandidate`, `RankedResult`, `OutputSelection`)
//! - run configuration (`ScoreConfig`, `FitOptions`)

pub mod types;

pub use types::*;
