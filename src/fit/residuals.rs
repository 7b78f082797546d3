//! Weighted residuals under a fitted error model.

use crate::domain::{ResidualDiagnostics, ScoredCandidate};
use crate::fit::pairs::PairedData;
use crate::models::weighted_residual;

/// `(o - p) / σ(p)` for every pair (log scale for the exponential model).
pub fn weighted_residuals(pairs: &PairedData, candidate: &ScoredCandidate) -> Vec<f64> {
    pairs
        .obs
        .iter()
        .zip(&pairs.pred)
        .map(|(&o, &p)| weighted_residual(candidate.error_model, o, p, &candidate.params))
        .collect()
}

/// Mean and standard deviation of the weighted residuals.
///
/// Returns `None` if any residual is non-finite.
pub fn residual_diagnostics(pairs: &PairedData, candidate: &ScoredCandidate) -> Option<ResidualDiagnostics> {
    let residuals = weighted_residuals(pairs, candidate);
    if residuals.is_empty() || !residuals.iter().all(|r| r.is_finite()) {
        return None;
    }
    let n = residuals.len() as f64;
    let mean = residuals.iter().sum::<f64>() / n;
    let var = residuals.iter().map(|r| (r - mean) * (r - mean)).sum::<f64>() / n;
    Some(ResidualDiagnostics { mean, sd: var.sqrt() })
}
