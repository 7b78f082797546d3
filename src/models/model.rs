//! Variance functions and log-likelihoods for the five error models.
//!
//! The scorer relies on two primitive operations:
//! - the residual variance σ²(p) at a prediction `p` for fitted parameters
//! - the log-likelihood of the paired data under a model
//!
//! These are implemented here for each model kind.

use std::f64::consts::PI;

use crate::domain::{ErrorModelKind, ErrorModelParams};

/// Residual variance σ²(p) for linear-scale models.
///
/// For `Exponential` this is the log-scale variance `a²` (independent of `p`).
/// Missing parameters are treated as zero.
pub fn variance(model: ErrorModelKind, p: f64, params: &ErrorModelParams) -> f64 {
    let a = params.a.unwrap_or(0.0);
    let b = params.b.unwrap_or(0.0);
    match model {
        ErrorModelKind::Constant | ErrorModelKind::Exponential => a * a,
        ErrorModelKind::Proportional => (b * p) * (b * p),
        ErrorModelKind::Combined1 => (a + b * p) * (a + b * p),
        ErrorModelKind::Combined2 => a * a + (b * p) * (b * p),
    }
}

/// Combined-model objective `Σ e²/σ² + Σ ln σ²` (−2·loglik up to a constant).
pub fn combined_objective(model: ErrorModelKind, obs: &[f64], pred: &[f64], a: f64, b: f64) -> f64 {
    let params = ErrorModelParams::combined(a, b);
    obs.iter()
        .zip(pred)
        .map(|(&o, &p)| {
            let s2 = variance(model, p, &params);
            let e = o - p;
            e * e / s2 + s2.ln()
        })
        .sum()
}

/// Log-likelihood of the pairs under `model`, normalized by the replicate count.
pub fn log_likelihood(
    model: ErrorModelKind,
    obs: &[f64],
    pred: &[f64],
    params: &ErrorModelParams,
    replicates: usize,
) -> f64 {
    let sum: f64 = match model {
        ErrorModelKind::Exponential => {
            let s2 = variance(model, 0.0, params);
            obs.iter()
                .zip(pred)
                .map(|(&o, &p)| {
                    let e = o.ln() - p.ln();
                    e * e / s2 + (2.0 * PI * s2).ln() + 2.0 * o.ln()
                })
                .sum()
        }
        _ => obs
            .iter()
            .zip(pred)
            .map(|(&o, &p)| {
                let s2 = variance(model, p, params);
                let e = o - p;
                e * e / s2 + (2.0 * PI * s2).ln()
            })
            .sum(),
    };
    -0.5 * sum / replicates as f64
}

/// Weighted residual `(o - p) / σ(p)`; log-scale for `Exponential`.
pub fn weighted_residual(model: ErrorModelKind, o: f64, p: f64, params: &ErrorModelParams) -> f64 {
    let sd = variance(model, p, params).sqrt();
    match model {
        ErrorModelKind::Exponential => (o.ln() - p.ln()) / sd,
        _ => (o - p) / sd,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variance_forms() {
        let params = ErrorModelParams::combined(0.5, 0.1);
        assert!((variance(ErrorModelKind::Constant, 10.0, &params) - 0.25).abs() < 1e-12);
        assert!((variance(ErrorModelKind::Proportional, 10.0, &params) - 1.0).abs() < 1e-12);
        assert!((variance(ErrorModelKind::Combined1, 10.0, &params) - 2.25).abs() < 1e-12);
        assert!((variance(ErrorModelKind::Combined2, 10.0, &params) - 1.25).abs() < 1e-12);
    }

    #[test]
    fn constant_loglik_matches_normal_density() {
        let obs = [1.0, 2.0];
        let pred = [1.5, 1.5];
        let params = ErrorModelParams::additive(0.5);
        let ll = log_likelihood(ErrorModelKind::Constant, &obs, &pred, &params, 1);

        // Each residual is exactly one standard deviation.
        let expected = 2.0 * (-0.5 - (0.5 * (2.0 * PI).sqrt()).ln());
        assert!((ll - expected).abs() < 1e-12);
    }

    #[test]
    fn loglik_is_divided_by_replicates() {
        let obs = [1.0, 2.0, 1.0, 2.0];
        let pred = [1.2, 1.9, 0.9, 2.2];
        let params = ErrorModelParams::proportional(0.1);
        let ll1 = log_likelihood(ErrorModelKind::Proportional, &obs, &pred, &params, 1);
        let ll2 = log_likelihood(ErrorModelKind::Proportional, &obs, &pred, &params, 2);
        assert!((ll1 - 2.0 * ll2).abs() < 1e-12);
    }
}
