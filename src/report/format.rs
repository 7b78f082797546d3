//! Formatted terminal output for selection runs.
//!
//! We keep formatting code in one place so:
//! - the fitting code stays clean and testable
//! - output changes are localized

use crate::app::pipeline::RunOutput;
use crate::domain::{OutputSelection, RankedResult, ScoredCandidate};

/// Header plus one ranking block per output, then skipped outputs.
pub fn format_run(run: &RunOutput) -> String {
    let mut out = String::new();
    out.push_str("=== errmod - residual error model selection ===\n");

    for selection in &run.selections {
        out.push('\n');
        out.push_str(&format_selection(selection));
    }

    if !run.skipped.is_empty() {
        out.push_str("\nSkipped outputs:\n");
        for (output, reason) in &run.skipped {
            out.push_str(&format!("- {output}: {reason}\n"));
        }
    }

    out
}

/// Summary and ranking table for a single output.
pub fn format_selection(selection: &OutputSelection) -> String {
    let mut out = String::new();
    out.push_str(&format!("Output: {}\n", selection.output));
    out.push_str(&format_run_summary(&selection.result));
    out.push_str(&format_ranking(&selection.result));

    if let Some(d) = &selection.diagnostics {
        out.push_str(&format!(
            "Weighted residuals (best model): mean={:.4} sd={:.4}\n",
            d.mean, d.sd
        ));
    }
    out
}

/// Pairs used/dropped, replicate count and penalty.
pub fn format_run_summary(result: &RankedResult) -> String {
    let s = &result.summary;
    format!(
        "Pairs: n={} (dropped {}) | R={} | N={:.1} | {} penalty={:.4}/df\n",
        s.n_pairs, s.n_dropped, s.replicates, s.n_effective, s.criterion, s.penalty_weight
    )
}

/// Ranked candidates with the best marked `*`, then excluded candidates.
pub fn format_ranking(result: &RankedResult) -> String {
    let mut out = String::new();
    out.push_str(
        format!(
            "  {:<13} {:>3} {:>14} {:>14} {:>12} {:>12}\n",
            "model", "df", "loglik", "criterion", "a", "b"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(
        format!(
            "  {:-<13} {:-<3} {:-<14} {:-<14} {:-<12} {:-<12}\n",
            "", "", "", "", "", ""
        )
        .trim_end(),
    );
    out.push('\n');

    for (i, c) in result.ranked.iter().enumerate() {
        let mark = if i == 0 { "*" } else { " " };
        out.push_str(format_row(mark, c).trim_end());
        out.push('\n');
    }
    if result.ranked.is_empty() {
        out.push_str("  (no candidates requested)\n");
    }

    for failure in &result.failures {
        out.push_str(&format!("  (excluded {}) {}\n", failure.error_model, failure.reason));
    }

    out
}

fn format_row(mark: &str, c: &ScoredCandidate) -> String {
    format!(
        "{mark} {:<13} {:>3} {:>14.4} {:>14.4} {:>12} {:>12}\n",
        c.error_model.display_name(),
        c.df,
        c.log_likelihood,
        c.criterion_value,
        fmt_param(c.params.a, c.std_errors.map(|se| se[0])),
        fmt_param(c.params.b, c.std_errors.map(|se| se[1])),
    )
}

fn fmt_param(value: Option<f64>, se: Option<f64>) -> String {
    match (value, se) {
        (Some(v), Some(se)) => format!("{v:.4}({se:.2})"),
        (Some(v), None) => format!("{v:.6}"),
        (None, _) => "-".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        Criterion, ErrorModelKind, ErrorModelParams, FitFailure, ResidualDiagnostics, ScoreSummary,
    };

    fn sample_result() -> RankedResult {
        RankedResult {
            ranked: vec![
                ScoredCandidate {
                    error_model: ErrorModelKind::Proportional,
                    log_likelihood: -3.5,
                    df: 1,
                    criterion_value: 8.6,
                    params: ErrorModelParams::proportional(0.08),
                    std_errors: None,
                },
                ScoredCandidate {
                    error_model: ErrorModelKind::Combined2,
                    log_likelihood: -3.4,
                    df: 2,
                    criterion_value: 10.0,
                    params: ErrorModelParams::combined(0.01, 0.08),
                    std_errors: Some([0.02, 0.03]),
                },
            ],
            failures: vec![FitFailure {
                error_model: ErrorModelKind::Combined1,
                reason: "did not converge".to_string(),
            }],
            summary: ScoreSummary {
                n_pairs: 5,
                n_dropped: 1,
                replicates: 1,
                n_effective: 5.0,
                criterion: Criterion::Bic,
                penalty_weight: 5f64.ln(),
            },
        }
    }

    #[test]
    fn best_candidate_is_marked_and_failures_listed() {
        let text = format_ranking(&sample_result());
        let rows: Vec<&str> = text.lines().collect();
        assert!(rows[2].starts_with("* proportional"));
        assert!(rows[3].starts_with("  combined2"));
        assert!(rows[3].contains("0.0100(0.02)"));
        assert!(text.contains("(excluded combined1) did not converge"));
    }

    #[test]
    fn summary_shows_counts_and_penalty() {
        let text = format_run_summary(&sample_result());
        assert!(text.contains("n=5 (dropped 1)"));
        assert!(text.contains("R=1"));
        assert!(text.contains("BIC penalty=1.6094/df"));
    }

    #[test]
    fn run_lists_skipped_outputs() {
        let run = RunOutput {
            selections: vec![OutputSelection {
                output: "y1".to_string(),
                result: sample_result(),
                diagnostics: Some(ResidualDiagnostics { mean: 0.1, sd: 0.9 }),
            }],
            skipped: vec![("y2".to_string(), "Output `y2` not found.".to_string())],
        };
        let text = format_run(&run);
        assert!(text.contains("Output: y1"));
        assert!(text.contains("mean=0.1000 sd=0.9000"));
        assert!(text.contains("- y2: Output `y2` not found."));
    }
}
