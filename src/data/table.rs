//! CSV tables exported from the modeling engine.
//!
//! Three files are understood:
//!
//! - observations: `id,time,<output>...`
//! - predictions:  `id,time,<output>...` (one row per observation row, same order)
//! - simulations:  `rep,id,time,<output>...` (each replicate repeats the
//!   observation rows in order; optional)
//!
//! Design goals:
//! - **Strict alignment**: `id`/`time` must match row-for-row across tables
//! - **Missing cells** (`""`, `.`, `NA`) in an observation column drop that
//!   row for that output only, in every table
//! - Header names are matched case-insensitively

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;
use tracing::debug;

use crate::data::source::PredictionSource;
use crate::domain::{ObservationSeries, PredictionSeries};
use crate::error::AppError;

const TIME_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq)]
struct RowKey {
    id: String,
    time: f64,
}

impl RowKey {
    fn matches(&self, other: &RowKey) -> bool {
        self.id == other.id && (self.time - other.time).abs() <= TIME_TOLERANCE
    }
}

/// A parsed engine table: row keys plus one numeric column per output.
#[derive(Debug, Clone)]
pub struct Table {
    label: String,
    reps: Option<Vec<u32>>,
    keys: Vec<RowKey>,
    columns: Vec<(String, Vec<Option<f64>>)>,
}

impl Table {
    /// Parse a table from any reader. `label` is used in error messages.
    pub fn from_reader<R: Read>(reader: R, label: &str) -> Result<Self, AppError> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = reader
            .headers()
            .map_err(|e| AppError::new(2, format!("Failed to read {label} headers: {e}")))?
            .clone();
        let names: Vec<String> = headers.iter().map(normalize_header_name).collect();

        let find = |name: &str| names.iter().position(|n| n == name);
        let id_col = find("id").ok_or_else(|| AppError::new(2, format!("Missing required column in {label}: `id`")))?;
        let time_col =
            find("time").ok_or_else(|| AppError::new(2, format!("Missing required column in {label}: `time`")))?;
        let rep_col = find("rep");

        let value_cols: Vec<usize> = (0..names.len())
            .filter(|&i| i != id_col && i != time_col && Some(i) != rep_col)
            .collect();
        if value_cols.is_empty() {
            return Err(AppError::new(2, format!("{label} has no output columns.")));
        }

        let mut keys = Vec::new();
        let mut reps = rep_col.map(|_| Vec::new());
        let mut columns: Vec<(String, Vec<Option<f64>>)> =
            value_cols.iter().map(|&i| (names[i].clone(), Vec::new())).collect();

        for (idx, result) in reader.records().enumerate() {
            // +2: header line plus 1-based numbering.
            let line = idx + 2;
            let record =
                result.map_err(|e| AppError::new(2, format!("{label} line {line}: CSV parse error: {e}")))?;

            let id = field(&record, id_col).to_string();
            let time = parse_opt_f64(field(&record, time_col))
                .map_err(|e| AppError::new(2, format!("{label} line {line}: invalid `time`: {e}")))?
                .ok_or_else(|| AppError::new(2, format!("{label} line {line}: missing `time`")))?;
            keys.push(RowKey { id, time });

            if let (Some(reps), Some(col)) = (reps.as_mut(), rep_col) {
                let rep = field(&record, col)
                    .parse::<u32>()
                    .map_err(|e| AppError::new(2, format!("{label} line {line}: invalid `rep`: {e}")))?;
                reps.push(rep);
            }

            for (slot, &col) in columns.iter_mut().zip(&value_cols) {
                let value = parse_opt_f64(field(&record, col)).map_err(|e| {
                    AppError::new(2, format!("{label} line {line}: invalid `{}` value: {e}", slot.0))
                })?;
                slot.1.push(value);
            }
        }

        if keys.is_empty() {
            return Err(AppError::new(3, format!("{label} has no data rows.")));
        }

        Ok(Self {
            label: label.to_string(),
            reps,
            keys,
            columns,
        })
    }

    pub fn from_path(path: &Path, label: &str) -> Result<Self, AppError> {
        let file = File::open(path)
            .map_err(|e| AppError::new(2, format!("Failed to open {label} '{}': {e}", path.display())))?;
        Self::from_reader(file, label)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Output column names in file order.
    pub fn outputs(&self) -> Vec<String> {
        self.columns.iter().map(|(name, _)| name.clone()).collect()
    }

    fn column(&self, output: &str) -> Result<&[Option<f64>], AppError> {
        let wanted = normalize_header_name(output);
        self.columns
            .iter()
            .find(|(name, _)| *name == wanted)
            .map(|(_, values)| values.as_slice())
            .ok_or_else(|| AppError::new(2, format!("Output `{output}` not found in {}.", self.label)))
    }
}

/// Engine tables bundled as a [`PredictionSource`].
#[derive(Debug, Clone)]
pub struct TableSource {
    observations: Table,
    predictions: Table,
    simulations: Option<Table>,
    /// Row indices into `simulations`, one list per replicate (ascending `rep`).
    replicate_rows: Vec<Vec<usize>>,
}

impl TableSource {
    /// Validate alignment between the tables and build the source.
    pub fn new(observations: Table, predictions: Table, simulations: Option<Table>) -> Result<Self, AppError> {
        check_aligned(&observations, &predictions, &(0..predictions.len()).collect::<Vec<_>>())?;

        let mut replicate_rows = Vec::new();
        if let Some(sim) = &simulations {
            let Some(reps) = &sim.reps else {
                return Err(AppError::new(2, format!("Missing required column in {}: `rep`", sim.label)));
            };
            let mut groups: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
            for (row, &rep) in reps.iter().enumerate() {
                groups.entry(rep).or_default().push(row);
            }
            for rows in groups.into_values() {
                check_aligned(&observations, sim, &rows)?;
                replicate_rows.push(rows);
            }
            debug!(replicates = replicate_rows.len(), "loaded simulation table");
        }

        Ok(Self {
            observations,
            predictions,
            simulations,
            replicate_rows,
        })
    }

    pub fn from_paths(obs: &Path, pred: &Path, sim: Option<&Path>) -> Result<Self, AppError> {
        let observations = Table::from_path(obs, "observations")?;
        let predictions = Table::from_path(pred, "predictions")?;
        let simulations = sim.map(|p| Table::from_path(p, "simulations")).transpose()?;
        Self::new(observations, predictions, simulations)
    }

    pub fn replicates(&self) -> usize {
        self.replicate_rows.len()
    }

    /// Rows in the observation table.
    pub fn rows(&self) -> usize {
        self.observations.len()
    }

    /// Rows of the observation table that carry a value for `output`.
    fn observed_rows(&self, output: &str) -> Result<Vec<usize>, AppError> {
        let column = self.observations.column(output)?;
        Ok(column
            .iter()
            .enumerate()
            .filter_map(|(i, v)| v.map(|_| i))
            .collect())
    }

    fn gather(&self, table: &Table, output: &str, rows: impl Iterator<Item = usize>) -> Result<Vec<f64>, AppError> {
        let column = table.column(output)?;
        rows.map(|row| {
            column[row].ok_or_else(|| {
                AppError::new(
                    2,
                    format!(
                        "{}: missing `{output}` value for id={} time={}",
                        table.label, table.keys[row].id, table.keys[row].time
                    ),
                )
            })
        })
        .collect()
    }
}

impl PredictionSource for TableSource {
    fn outputs(&self) -> Vec<String> {
        self.observations.outputs()
    }

    fn fetch_observations(&self, output: &str) -> Result<ObservationSeries, AppError> {
        let rows = self.observed_rows(output)?;
        let values = self.gather(&self.observations, output, rows.into_iter())?;
        Ok(ObservationSeries::new(output, values)?)
    }

    fn fetch_predictions(&self, output: &str) -> Result<PredictionSeries, AppError> {
        let rows = self.observed_rows(output)?;
        let values = self.gather(&self.predictions, output, rows.into_iter())?;
        Ok(PredictionSeries::new(output, values)?)
    }

    fn fetch_simulated_predictions(&self, output: &str) -> Result<PredictionSeries, AppError> {
        let Some(sim) = &self.simulations else {
            return Err(AppError::new(2, "No simulation table was provided."));
        };
        let rows = self.observed_rows(output)?;
        let mut values = Vec::with_capacity(rows.len() * self.replicate_rows.len());
        for rep_rows in &self.replicate_rows {
            values.extend(self.gather(sim, output, rows.iter().map(|&r| rep_rows[r]))?);
        }
        Ok(PredictionSeries::new(output, values)?)
    }
}

/// `other.keys[rows[i]]` must match `reference.keys[i]` for every row.
fn check_aligned(reference: &Table, other: &Table, rows: &[usize]) -> Result<(), AppError> {
    if rows.len() != reference.len() {
        return Err(AppError::new(
            2,
            format!(
                "{} has {} rows per replicate but {} has {}.",
                other.label,
                rows.len(),
                reference.label,
                reference.len()
            ),
        ));
    }
    for (i, &row) in rows.iter().enumerate() {
        let (a, b) = (&reference.keys[i], &other.keys[row]);
        if !a.matches(b) {
            return Err(AppError::new(
                2,
                format!(
                    "Row mismatch between {} (id={}, time={}) and {} (id={}, time={}).",
                    reference.label, a.id, a.time, other.label, b.id, b.time
                ),
            ));
        }
    }
    Ok(())
}

fn normalize_header_name(name: &str) -> String {
    // Strip a UTF-8 BOM on the first header, as written by some spreadsheet tools.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn field(record: &StringRecord, idx: usize) -> &str {
    record.get(idx).unwrap_or("")
}

fn parse_opt_f64(s: &str) -> Result<Option<f64>, String> {
    let s = s.trim();
    if s.is_empty() || s == "." || s.eq_ignore_ascii_case("na") || s.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    s.parse::<f64>().map(Some).map_err(|e| format!("'{s}': {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const OBS: &str = "ID,TIME,y1,y2\n1,0.5,1.0,10\n1,1.0,2.0,.\n2,0.5,3.0,30\n";
    const PRED: &str = "id,time,y1,y2\n1,0.5,1.1,11\n1,1.0,1.9,19\n2,0.5,3.2,29\n";
    const SIM: &str = "rep,id,time,y1,y2\n\
        2,1,0.5,1.3,13\n2,1,1.0,2.1,21\n2,2,0.5,2.9,31\n\
        1,1,0.5,1.2,12\n1,1,1.0,1.8,18\n1,2,0.5,3.1,28\n";

    fn source(sim: Option<&str>) -> Result<TableSource, AppError> {
        let obs = Table::from_reader(OBS.as_bytes(), "observations")?;
        let pred = Table::from_reader(PRED.as_bytes(), "predictions")?;
        let sim = sim.map(|s| Table::from_reader(s.as_bytes(), "simulations")).transpose()?;
        TableSource::new(obs, pred, sim)
    }

    #[test]
    fn outputs_are_lowercased_value_columns() {
        let src = source(None).unwrap();
        assert_eq!(src.outputs(), vec!["y1".to_string(), "y2".to_string()]);
    }

    #[test]
    fn missing_observation_drops_row_everywhere() {
        let src = source(Some(SIM)).unwrap();
        let obs = src.fetch_observations("Y2").unwrap();
        assert_eq!(obs.values(), &[10.0, 30.0]);
        let pred = src.fetch_predictions("y2").unwrap();
        assert_eq!(pred.values(), &[11.0, 29.0]);
        let sim = src.fetch_simulated_predictions("y2").unwrap();
        // Replicates ordered by `rep`, not by file order.
        assert_eq!(sim.values(), &[12.0, 28.0, 13.0, 31.0]);
    }

    #[test]
    fn simulated_predictions_are_replicate_major() {
        let src = source(Some(SIM)).unwrap();
        assert_eq!(src.replicates(), 2);
        let sim = src.fetch_simulated_predictions("y1").unwrap();
        assert_eq!(sim.values(), &[1.2, 1.8, 3.1, 1.3, 2.1, 2.9]);
    }

    #[test]
    fn mismatched_rows_are_rejected() {
        let obs = Table::from_reader(OBS.as_bytes(), "observations").unwrap();
        let pred = Table::from_reader("id,time,y1,y2\n1,0.5,1,1\n2,1.0,1,1\n2,0.5,1,1\n".as_bytes(), "predictions")
            .unwrap();
        let err = TableSource::new(obs, pred, None).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.message().contains("Row mismatch"));
    }

    #[test]
    fn missing_simulation_table_is_an_error() {
        let src = source(None).unwrap();
        assert!(src.fetch_simulated_predictions("y1").is_err());
    }

    #[test]
    fn unknown_output_is_an_error() {
        let src = source(None).unwrap();
        let err = src.fetch_observations("conc").unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn missing_key_columns_are_rejected() {
        let err = Table::from_reader("id,y1\n1,2\n".as_bytes(), "observations").unwrap_err();
        assert!(err.message().contains("`time`"));
    }
}
