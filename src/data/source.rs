//! The collaborator that supplies observed and predicted values per output.
//!
//! The modeling engine itself is external; implementations read what it
//! exported (`TableSource`) or generate data in-process (`SyntheticSource`).

use crate::domain::{ObservationSeries, PredictionSeries};
use crate::error::AppError;

/// Supplies aligned observation/prediction series for named outputs.
pub trait PredictionSource: Sync {
    /// Names of the outputs this source can serve, in a stable order.
    fn outputs(&self) -> Vec<String>;

    fn fetch_observations(&self, output: &str) -> Result<ObservationSeries, AppError>;

    /// Deterministic predictions, one per observation (`R = 1`).
    fn fetch_predictions(&self, output: &str) -> Result<PredictionSeries, AppError>;

    /// Simulated predictions, `R` replicates laid out replicate-major.
    fn fetch_simulated_predictions(&self, output: &str) -> Result<PredictionSeries, AppError>;
}
