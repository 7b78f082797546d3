//! Error-model scoring and ranking.
//!
//! For each of the five models we compute the (replicate-normalized)
//! log-likelihood `ll` and
//!
//! ```text
//! criterion = -2·ll + w·df
//! ```
//!
//! where `w` is `ln(N)` for BIC, `2` for AIC or a caller-supplied weight, and
//! `N = n / R` is the number of non-replicate observations that survived
//! filtering. Lower is better.
//!
//! Candidates that fail to fit are excluded from the ranking and reported in
//! `RankedResult::failures`; the call only fails when nothing can be ranked.

use tracing::{debug, warn};

use crate::domain::{
    Criterion, FitFailure, FitOptions, ObservationSeries, PredictionSeries, RankedResult,
    ScoreSummary, ScoredCandidate,
};
use crate::error::ScoreError;
use crate::fit::fitter::{fit_all, ModelFit};
use crate::fit::pairs::{pair_and_filter, PairedData};
use crate::models::log_likelihood;

/// Fit, score and rank the five error models for one output.
pub fn score(
    observed: &ObservationSeries,
    predicted: &PredictionSeries,
    criterion: Criterion,
    top_k: usize,
    opts: &FitOptions,
) -> Result<RankedResult, ScoreError> {
    let pairs = pair_and_filter(observed, predicted)?;
    score_pairs(&pairs, criterion, top_k, opts)
}

/// Score already paired and filtered data.
pub fn score_pairs(
    pairs: &PairedData,
    criterion: Criterion,
    top_k: usize,
    opts: &FitOptions,
) -> Result<RankedResult, ScoreError> {
    let n_effective = pairs.n_effective();
    let penalty_weight = criterion.penalty_weight(n_effective);
    if !penalty_weight.is_finite() {
        return Err(ScoreError::InvalidInput(format!(
            "penalty weight for {criterion} is not finite (N={n_effective})"
        )));
    }

    let mut ranked = Vec::with_capacity(5);
    let mut failures = Vec::new();

    for fit in fit_all(pairs, opts) {
        match fit.and_then(|f| to_scored(f, pairs, penalty_weight)) {
            Ok(candidate) => {
                debug!(
                    model = candidate.error_model.display_name(),
                    ll = candidate.log_likelihood,
                    criterion = candidate.criterion_value,
                    "scored error model"
                );
                ranked.push(candidate);
            }
            Err(failure) => {
                warn!("excluding {failure}");
                failures.push(failure);
            }
        }
    }

    if ranked.is_empty() {
        return Err(ScoreError::AllCandidatesFailed(failures));
    }

    rank_candidates(&mut ranked);
    ranked.truncate(top_k.min(5));

    Ok(RankedResult {
        ranked,
        failures,
        summary: ScoreSummary {
            n_pairs: pairs.len(),
            n_dropped: pairs.dropped,
            replicates: pairs.replicates,
            n_effective,
            criterion,
            penalty_weight,
        },
    })
}

fn to_scored(fit: ModelFit, pairs: &PairedData, penalty_weight: f64) -> Result<ScoredCandidate, FitFailure> {
    let ll = log_likelihood(fit.model, &pairs.obs, &pairs.pred, &fit.params, pairs.replicates);
    if !ll.is_finite() {
        return Err(FitFailure {
            error_model: fit.model,
            reason: "non-finite log-likelihood".to_string(),
        });
    }
    let df = fit.model.df();
    Ok(ScoredCandidate {
        error_model: fit.model,
        log_likelihood: ll,
        df,
        criterion_value: -2.0 * ll + penalty_weight * df as f64,
        params: fit.params,
        std_errors: fit.std_errors,
    })
}

/// Sort ascending by criterion value; exact ties keep the canonical model order.
fn rank_candidates(candidates: &mut [ScoredCandidate]) {
    candidates.sort_by(|a, b| {
        a.criterion_value
            .total_cmp(&b.criterion_value)
            .then(a.error_model.cmp(&b.error_model))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ErrorModelKind, ErrorModelParams};

    fn candidate(model: ErrorModelKind, criterion_value: f64) -> ScoredCandidate {
        ScoredCandidate {
            error_model: model,
            log_likelihood: 0.0,
            df: model.df(),
            criterion_value,
            params: ErrorModelParams::default(),
            std_errors: None,
        }
    }

    #[test]
    fn ranking_is_ascending_with_canonical_tie_break() {
        let mut c = vec![
            candidate(ErrorModelKind::Exponential, 1.0),
            candidate(ErrorModelKind::Combined1, 3.0),
            candidate(ErrorModelKind::Constant, 1.0),
            candidate(ErrorModelKind::Proportional, -2.0),
        ];
        rank_candidates(&mut c);
        let order: Vec<ErrorModelKind> = c.iter().map(|c| c.error_model).collect();
        assert_eq!(
            order,
            vec![
                ErrorModelKind::Proportional,
                ErrorModelKind::Constant,
                ErrorModelKind::Exponential,
                ErrorModelKind::Combined1,
            ]
        );
    }

    #[test]
    fn criterion_adds_penalty_per_degree_of_freedom() {
        let pairs = PairedData {
            obs: vec![1.0, 2.0, 3.0, 4.0],
            pred: vec![1.2, 1.8, 3.1, 4.3],
            replicates: 1,
            dropped: 0,
        };
        let fit = ModelFit {
            model: ErrorModelKind::Combined2,
            params: ErrorModelParams::combined(0.1, 0.05),
            std_errors: None,
        };
        let scored = to_scored(fit, &pairs, 1.5).unwrap();
        assert_eq!(scored.df, 2);
        assert!((scored.criterion_value - (-2.0 * scored.log_likelihood + 3.0)).abs() < 1e-12);
    }

    #[test]
    fn all_candidates_failing_is_an_error() {
        // Perfect predictions make every closed form zero; one iteration
        // cannot converge the combined searches.
        let pairs = PairedData {
            obs: vec![1.0, 2.0, 3.0, 4.0],
            pred: vec![1.0, 2.0, 3.0, 4.0],
            replicates: 1,
            dropped: 0,
        };
        let opts = FitOptions {
            max_iters: 1,
            ..FitOptions::default()
        };
        let failures = match score_pairs(&pairs, Criterion::Bic, 5, &opts) {
            Err(ScoreError::AllCandidatesFailed(failures)) => failures,
            other => panic!("expected AllCandidatesFailed, got {other:?}"),
        };
        let models: Vec<ErrorModelKind> = failures.iter().map(|f| f.error_model).collect();
        assert_eq!(models, ErrorModelKind::ALL.to_vec());
    }

    #[test]
    fn top_k_zero_returns_empty_ranking() {
        let obs = ObservationSeries::new("y", vec![1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        let pred = PredictionSeries::new("y", vec![1.1, 1.9, 3.2, 3.8, 5.3]).unwrap();
        let result = score(&obs, &pred, Criterion::Bic, 0, &FitOptions::default()).unwrap();
        assert!(result.ranked.is_empty());
        assert_eq!(result.summary.n_pairs, 5);
    }
}
