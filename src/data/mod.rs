//! Prediction sources: engine-exported CSV tables and synthetic data.

pub mod sample;
pub mod source;
pub mod table;

pub use sample::{SyntheticConfig, SyntheticSource, DEFAULT_TIMES};
pub use source::PredictionSource;
pub use table::{Table, TableSource};
