//! Observation/prediction pairing.
//!
//! Predictions may come from `R` simulation replicates. Observations are tiled
//! `R` times so that `pred[i + k*N]` is paired with `obs[i]`, then every pair
//! with a non-positive member is dropped (the log-scale and combined models
//! need positive values).

use crate::domain::{ObservationSeries, PredictionSeries};
use crate::error::ScoreError;

/// Smallest number of surviving pairs we accept (two-parameter fits + 1).
pub const MIN_PAIRS: usize = 3;

/// Aligned, strictly positive observation/prediction pairs.
#[derive(Debug, Clone, PartialEq)]
pub struct PairedData {
    pub obs: Vec<f64>,
    pub pred: Vec<f64>,
    pub replicates: usize,
    /// Pairs removed by the positivity filter.
    pub dropped: usize,
}

impl PairedData {
    pub fn len(&self) -> usize {
        self.obs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.obs.is_empty()
    }

    /// Number of non-replicate observations, `n / R`.
    pub fn n_effective(&self) -> f64 {
        self.obs.len() as f64 / self.replicates as f64
    }
}

/// Tile, align and filter the two series.
pub fn pair_and_filter(
    observed: &ObservationSeries,
    predicted: &PredictionSeries,
) -> Result<PairedData, ScoreError> {
    let n_obs = observed.len();
    let n_pred = predicted.len();
    if n_obs == 0 || n_pred == 0 {
        return Err(ScoreError::InvalidInput(
            "observed and predicted series must be non-empty".to_string(),
        ));
    }
    if n_pred % n_obs != 0 {
        return Err(ScoreError::InvalidInput(format!(
            "prediction length {n_pred} is not a multiple of observation length {n_obs}"
        )));
    }
    let replicates = n_pred / n_obs;

    let mut obs = Vec::with_capacity(n_pred);
    let mut pred = Vec::with_capacity(n_pred);
    for (idx, &p) in predicted.values().iter().enumerate() {
        let o = observed.values()[idx % n_obs];
        if o > 0.0 && p > 0.0 {
            obs.push(o);
            pred.push(p);
        }
    }

    let dropped = n_pred - obs.len();
    if obs.len() < MIN_PAIRS {
        return Err(ScoreError::InsufficientData {
            valid: obs.len(),
            required: MIN_PAIRS,
        });
    }

    Ok(PairedData {
        obs,
        pred,
        replicates,
        dropped,
    })
}
