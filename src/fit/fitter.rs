//! Parameter estimation for the five error models.
//!
//! Closed forms:
//! - constant:     `a = sqrt(mean((o - p)²))`
//! - proportional: `b = sqrt(mean((o/p - 1)²))`
//! - exponential:  `a = sqrt(mean((ln o - ln p)²))`
//!
//! The combined models are refined with Nelder–Mead as a warm-start chain:
//! combined2 starts at `(a_const, 0.2)` and combined1 starts at the combined2
//! solution. The order matters; starting both from generic points can land in
//! different local optima and change the ranking.

use tracing::debug;

use crate::domain::{ErrorModelKind, ErrorModelParams, FitFailure, FitOptions};
use crate::fit::pairs::PairedData;
use crate::math::{hessian, minimize, standard_errors};
use crate::models::combined_objective;

/// Initial proportional coefficient for the combined2 search.
const COMBINED_B_START: f64 = 0.2;

/// Fitted parameters for a single model kind.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelFit {
    pub model: ErrorModelKind,
    pub params: ErrorModelParams,
    pub std_errors: Option<[f64; 2]>,
}

/// Fit every model kind, in canonical order.
///
/// A model whose estimate is degenerate (zero or non-finite) or whose simplex
/// search did not converge comes back as `Err(FitFailure)`.
pub fn fit_all(pairs: &PairedData, opts: &FitOptions) -> Vec<Result<ModelFit, FitFailure>> {
    let a_const = rms(pairs.obs.iter().zip(&pairs.pred).map(|(o, p)| o - p));
    let b_prop = rms(pairs.obs.iter().zip(&pairs.pred).map(|(o, p)| o / p - 1.0));
    let a_expo = rms(pairs.obs.iter().zip(&pairs.pred).map(|(o, p)| o.ln() - p.ln()));
    debug!(a_const, b_prop, a_expo, "closed-form error model estimates");

    let constant = closed_form(ErrorModelKind::Constant, a_const, ErrorModelParams::additive(a_const));
    let proportional = closed_form(
        ErrorModelKind::Proportional,
        b_prop,
        ErrorModelParams::proportional(b_prop),
    );
    let exponential = closed_form(ErrorModelKind::Exponential, a_expo, ErrorModelParams::additive(a_expo));

    let (combined2, warm_start) = fit_combined(
        ErrorModelKind::Combined2,
        pairs,
        [a_const, COMBINED_B_START],
        opts,
    );
    let (combined1, _) = fit_combined(ErrorModelKind::Combined1, pairs, warm_start, opts);

    vec![constant, proportional, combined1, combined2, exponential]
}

fn closed_form(
    model: ErrorModelKind,
    value: f64,
    params: ErrorModelParams,
) -> Result<ModelFit, FitFailure> {
    if !(value.is_finite() && value > 0.0) {
        return Err(FitFailure {
            error_model: model,
            reason: format!("degenerate variance parameter ({value})"),
        });
    }
    Ok(ModelFit {
        model,
        params,
        std_errors: None,
    })
}

/// Fit one combined model from `start`.
///
/// Also returns the point the next model in the chain should start from: the
/// best point found (sign-normalized for combined2), or `start` when the
/// solver failed outright.
fn fit_combined(
    model: ErrorModelKind,
    pairs: &PairedData,
    start: [f64; 2],
    opts: &FitOptions,
) -> (Result<ModelFit, FitFailure>, [f64; 2]) {
    let objective = |x: &[f64]| combined_objective(model, &pairs.obs, &pairs.pred, x[0], x[1]);

    let min = match minimize(objective, &start, opts) {
        Ok(min) => min,
        Err(e) => {
            let failure = FitFailure {
                error_model: model,
                reason: format!("Nelder-Mead failed: {e}"),
            };
            return (Err(failure), start);
        }
    };

    let (a, b) = match model {
        // σ² = a² + (b·p)² is invariant under sign flips of a and b.
        ErrorModelKind::Combined2 => (min.params[0].abs(), min.params[1].abs()),
        _ => (min.params[0], min.params[1]),
    };
    debug!(
        model = model.display_name(),
        a,
        b,
        cost = min.cost,
        iterations = min.iterations,
        converged = min.converged,
        "combined error model search finished"
    );

    if !min.converged {
        let failure = FitFailure {
            error_model: model,
            reason: format!("Nelder-Mead did not converge after {} iterations", min.iterations),
        };
        return (Err(failure), [a, b]);
    }
    if !(a.is_finite() && b.is_finite() && min.cost.is_finite()) {
        let failure = FitFailure {
            error_model: model,
            reason: "non-finite parameters at the optimum".to_string(),
        };
        return (Err(failure), start);
    }

    let h = hessian(objective, &[a, b]);
    let std_errors = standard_errors(&h, 2.0 * pairs.replicates as f64).map(|se| [se[0], se[1]]);

    let fit = ModelFit {
        model,
        params: ErrorModelParams::combined(a, b),
        std_errors,
    };
    (Ok(fit), [a, b])
}

fn rms(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v * v, n + 1));
    if n == 0 {
        return f64::NAN;
    }
    (sum / n as f64).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(obs: &[f64], pred: &[f64]) -> PairedData {
        PairedData {
            obs: obs.to_vec(),
            pred: pred.to_vec(),
            replicates: 1,
            dropped: 0,
        }
    }

    fn params_of(fits: &[Result<ModelFit, FitFailure>], model: ErrorModelKind) -> ErrorModelParams {
        fits.iter()
            .flatten()
            .find(|f| f.model == model)
            .map(|f| f.params)
            .unwrap()
    }

    #[test]
    fn closed_forms_match_definitions() {
        let obs = [1.0, 2.0, 3.0, 4.0, 5.0];
        let pred = [1.1, 1.9, 3.2, 3.8, 5.3];
        let fits = fit_all(&pairs(&obs, &pred), &FitOptions::default());
        assert_eq!(fits.len(), 5);

        let e2: f64 = obs.iter().zip(&pred).map(|(o, p)| (o - p) * (o - p)).sum();
        let a_const = (e2 / 5.0).sqrt();
        let c = params_of(&fits, ErrorModelKind::Constant);
        assert!((c.a.unwrap() - a_const).abs() < 1e-12);

        let r2: f64 = obs.iter().zip(&pred).map(|(o, p)| (o / p - 1.0).powi(2)).sum();
        let p = params_of(&fits, ErrorModelKind::Proportional);
        assert!((p.b.unwrap() - (r2 / 5.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn exponential_estimate_on_log_scale() {
        let obs = [2.0f64, 4.0, 8.0];
        let pred = [2.1f64, 3.9, 8.2];
        let fits = fit_all(&pairs(&obs, &pred), &FitOptions::default());

        let l2: f64 = obs.iter().zip(&pred).map(|(o, p)| (o.ln() - p.ln()).powi(2)).sum();
        let expected = (l2 / 3.0).sqrt();
        let e = params_of(&fits, ErrorModelKind::Exponential);
        assert!((e.a.unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn combined2_parameters_are_non_negative() {
        let obs = [0.8, 2.3, 2.7, 4.6, 4.4, 6.9, 6.1, 8.8];
        let pred = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
        let fits = fit_all(&pairs(&obs, &pred), &FitOptions::default());
        let fit = fits[3].as_ref().unwrap();
        assert_eq!(fit.model, ErrorModelKind::Combined2);
        assert!(fit.params.a.unwrap() >= 0.0);
        assert!(fit.params.b.unwrap() >= 0.0);
    }

    #[test]
    fn combined_search_lowers_the_objective_from_its_start() {
        let obs = [0.8, 2.3, 2.7, 4.6, 4.4, 6.9, 6.1, 8.8];
        let pred = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
        let data = pairs(&obs, &pred);
        let fits = fit_all(&data, &FitOptions::default());

        let a_const = params_of(&fits, ErrorModelKind::Constant).a.unwrap();
        let start_cost = combined_objective(ErrorModelKind::Combined2, &obs, &pred, a_const, 0.2);
        let fitted = params_of(&fits, ErrorModelKind::Combined2);
        let cost = combined_objective(
            ErrorModelKind::Combined2,
            &obs,
            &pred,
            fitted.a.unwrap(),
            fitted.b.unwrap(),
        );
        assert!(cost <= start_cost);
    }

    #[test]
    fn perfect_predictions_are_degenerate_for_closed_forms() {
        let obs = [1.0, 2.0, 3.0];
        let fits = fit_all(&pairs(&obs, &obs), &FitOptions::default());
        assert!(fits[0].is_err());
        assert!(fits[1].is_err());
        assert!(fits[4].is_err());
    }
}
