//! Export ranked candidates to CSV.
//!
//! One row per ranked candidate per output, easy to consume in spreadsheets
//! or downstream scripts. Output names come from table headers and may contain
//! commas or quotes, so rows go through `csv::Writer`.

use std::fs::File;
use std::path::Path;

use crate::domain::OutputSelection;
use crate::error::AppError;

const HEADER: [&str; 13] = [
    "output",
    "rank",
    "error_model",
    "df",
    "log_likelihood",
    "criterion",
    "criterion_value",
    "a",
    "b",
    "se_a",
    "se_b",
    "n_pairs",
    "replicates",
];

/// Write the rankings of every output to a CSV file.
pub fn write_results_csv(path: &Path, selections: &[OutputSelection]) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display())))?;

    write_row(&mut writer, HEADER)?;

    for selection in selections {
        let summary = &selection.result.summary;
        for (i, c) in selection.result.ranked.iter().enumerate() {
            let row = [
                selection.output.clone(),
                (i + 1).to_string(),
                c.error_model.to_string(),
                c.df.to_string(),
                format!("{:.10}", c.log_likelihood),
                summary.criterion.to_string(),
                format!("{:.10}", c.criterion_value),
                opt(c.params.a),
                opt(c.params.b),
                opt(c.std_errors.map(|se| se[0])),
                opt(c.std_errors.map(|se| se[1])),
                summary.n_pairs.to_string(),
                summary.replicates.to_string(),
            ];
            write_row(&mut writer, &row)?;
        }
    }

    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to write export CSV: {e}")))
}

fn write_row<I, T>(writer: &mut csv::Writer<File>, row: I) -> Result<(), AppError>
where
    I: IntoIterator<Item = T>,
    T: AsRef<[u8]>,
{
    writer
        .write_record(row)
        .map_err(|e| AppError::new(2, format!("Failed to write export CSV row: {e}")))
}

fn opt(v: Option<f64>) -> String {
    v.map(|v| format!("{v:.10}")).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Criterion, ErrorModelKind, ErrorModelParams, RankedResult, ScoreSummary, ScoredCandidate};

    fn selection(output: &str) -> OutputSelection {
        OutputSelection {
            output: output.to_string(),
            result: RankedResult {
                ranked: vec![
                    ScoredCandidate {
                        error_model: ErrorModelKind::Constant,
                        log_likelihood: -1.0,
                        df: 1,
                        criterion_value: 3.0,
                        params: ErrorModelParams::additive(0.5),
                        std_errors: None,
                    },
                    ScoredCandidate {
                        error_model: ErrorModelKind::Combined2,
                        log_likelihood: -0.5,
                        df: 2,
                        criterion_value: 5.0,
                        params: ErrorModelParams::combined(0.1, 0.2),
                        std_errors: Some([0.01, 0.02]),
                    },
                ],
                failures: Vec::new(),
                summary: ScoreSummary {
                    n_pairs: 8,
                    n_dropped: 0,
                    replicates: 2,
                    n_effective: 4.0,
                    criterion: Criterion::Aic,
                    penalty_weight: 2.0,
                },
            },
            diagnostics: None,
        }
    }

    #[test]
    fn writes_one_row_per_candidate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ranking.csv");
        write_results_csv(&path, &[selection("conc")]).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("conc,1,constant,1,"));
        assert!(lines[1].contains(",AIC,"));
        assert!(lines[1].ends_with(",,,,8,2"));
        assert!(lines[2].starts_with("conc,2,combined2,2,"));
        assert!(lines[2].contains("0.0100000000,0.0200000000"));
    }

    #[test]
    fn output_names_with_commas_and_quotes_keep_rows_aligned() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ranking.csv");
        write_results_csv(&path, &[selection("conc,ng/mL \"free\"")]).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        assert_eq!(reader.headers().unwrap().len(), HEADER.len());
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        for row in &rows {
            assert_eq!(row.len(), HEADER.len());
            assert_eq!(&row[0], "conc,ng/mL \"free\"");
        }
        assert_eq!(&rows[1][2], "combined2");
        assert_eq!(&rows[1][12], "2");
    }
}
