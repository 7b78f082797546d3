//! Shared "selection pipeline" logic used by every CLI command.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! fetch series -> pair/filter -> fit -> score/rank -> residual diagnostics
//!
//! Outputs are independent, so they are scored in parallel.

use rayon::prelude::*;
use tracing::{info, warn};

use crate::data::PredictionSource;
use crate::domain::{OutputSelection, ScoreConfig};
use crate::error::AppError;
use crate::fit::{pair_and_filter, residual_diagnostics, score_pairs};

/// All computed outputs of a single selection run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    /// Successful selections, in the order the outputs were requested.
    pub selections: Vec<OutputSelection>,
    /// Outputs that could not be scored and why.
    pub skipped: Vec<(String, String)>,
}

/// Score every requested output. An empty `outputs` list means "all outputs".
///
/// A failing output does not abort the others; the run fails only if no
/// output could be scored.
pub fn run_selection<S: PredictionSource>(
    source: &S,
    outputs: &[String],
    config: &ScoreConfig,
) -> Result<RunOutput, AppError> {
    let outputs = if outputs.is_empty() {
        source.outputs()
    } else {
        outputs.to_vec()
    };
    if outputs.is_empty() {
        return Err(AppError::new(2, "No outputs to score."));
    }

    let results: Vec<(String, Result<OutputSelection, AppError>)> = outputs
        .par_iter()
        .map(|output| (output.clone(), select_output(source, output, config)))
        .collect();

    let mut selections = Vec::new();
    let mut skipped = Vec::new();
    let mut last_error = None;
    for (output, result) in results {
        match result {
            Ok(selection) => selections.push(selection),
            Err(e) => {
                warn!("skipping output `{output}`: {e}");
                skipped.push((output, e.to_string()));
                last_error = Some(e);
            }
        }
    }

    if selections.is_empty() {
        return Err(last_error.unwrap_or_else(|| AppError::new(4, "No output could be scored.")));
    }

    Ok(RunOutput { selections, skipped })
}

/// Fetch, score and diagnose a single output.
pub fn select_output<S: PredictionSource>(
    source: &S,
    output: &str,
    config: &ScoreConfig,
) -> Result<OutputSelection, AppError> {
    let observed = source.fetch_observations(output)?;
    let predicted = if config.use_simulations {
        source.fetch_simulated_predictions(output)?
    } else {
        source.fetch_predictions(output)?
    };

    let pairs = pair_and_filter(&observed, &predicted)?;
    let result = score_pairs(&pairs, config.criterion, config.top_k, &config.fit)?;
    let diagnostics = result.best().and_then(|best| residual_diagnostics(&pairs, best));

    if let Some(best) = result.best() {
        info!(
            output,
            model = best.error_model.display_name(),
            criterion = best.criterion_value,
            n = result.summary.n_pairs,
            replicates = result.summary.replicates,
            "selected error model"
        );
    }

    Ok(OutputSelection {
        output: output.to_string(),
        result,
        diagnostics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{SyntheticConfig, SyntheticSource};
    use crate::domain::ErrorModelKind;

    #[test]
    fn unknown_output_is_skipped_but_run_succeeds() {
        let src = SyntheticSource::generate(&SyntheticConfig::default()).unwrap();
        let outputs = vec!["y1".to_string(), "y9".to_string()];
        let run = run_selection(&src, &outputs, &ScoreConfig::default()).unwrap();
        assert_eq!(run.selections.len(), 1);
        assert_eq!(run.selections[0].output, "y1");
        assert_eq!(run.skipped.len(), 1);
        assert_eq!(run.skipped[0].0, "y9");
    }

    #[test]
    fn run_fails_when_every_output_fails() {
        let src = SyntheticSource::generate(&SyntheticConfig::default()).unwrap();
        let err = run_selection(&src, &["nope".to_string()], &ScoreConfig::default()).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn simulated_predictions_set_the_replicate_count() {
        let src = SyntheticSource::generate(&SyntheticConfig {
            replicates: 4,
            ..SyntheticConfig::default()
        })
        .unwrap();
        let config = ScoreConfig {
            use_simulations: true,
            ..ScoreConfig::default()
        };
        let selection = select_output(&src, "y1", &config).unwrap();
        assert_eq!(selection.result.summary.replicates, 4);
    }

    #[test]
    fn proportional_data_prefers_proportional_over_constant() {
        let src = SyntheticSource::generate(&SyntheticConfig {
            subjects: 40,
            true_model: ErrorModelKind::Proportional,
            a: 0.0,
            b: 0.2,
            ..SyntheticConfig::default()
        })
        .unwrap();
        let selection = select_output(&src, "y1", &ScoreConfig::default()).unwrap();
        let crit = |m: ErrorModelKind| {
            selection
                .result
                .ranked
                .iter()
                .find(|c| c.error_model == m)
                .map(|c| c.criterion_value)
                .unwrap()
        };
        assert!(crit(ErrorModelKind::Proportional) < crit(ErrorModelKind::Constant));
        assert!(selection.diagnostics.is_some());
    }
}
