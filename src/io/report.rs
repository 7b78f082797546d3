//! Read/write selection report JSON files.
//!
//! A report is the portable record of a run: criterion, generation time and
//! every output's ranking, failures and diagnostics. The schema is defined by
//! `domain::ReportFile`.

use std::fs::File;
use std::path::Path;

use chrono::Utc;

use crate::domain::{Criterion, OutputSelection, ReportFile};
use crate::error::AppError;

pub const REPORT_TOOL: &str = "errmod";

/// Assemble a report stamped with the current time.
pub fn build_report(criterion: Criterion, selections: &[OutputSelection]) -> ReportFile {
    ReportFile {
        tool: REPORT_TOOL.to_string(),
        generated_at: Utc::now(),
        criterion,
        outputs: selections.to_vec(),
    }
}

/// Write a report JSON file.
pub fn write_report_json(path: &Path, report: &ReportFile) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create report JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, report)
        .map_err(|e| AppError::new(2, format!("Failed to write report JSON: {e}")))?;
    Ok(())
}

/// Read a report JSON file.
pub fn read_report_json(path: &Path) -> Result<ReportFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open report JSON '{}': {e}", path.display())))?;
    let report: ReportFile =
        serde_json::from_reader(file).map_err(|e| AppError::new(2, format!("Invalid report JSON: {e}")))?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_or_malformed_files_are_input_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        assert_eq!(read_report_json(&missing).unwrap_err().exit_code(), 2);

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "{\"tool\": 1}").unwrap();
        assert_eq!(read_report_json(&bad).unwrap_err().exit_code(), 2);
    }

    #[test]
    fn empty_report_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let report = build_report(Criterion::Custom(3.0), &[]);
        write_report_json(&path, &report).unwrap();

        let back = read_report_json(&path).unwrap();
        assert_eq!(back.tool, "errmod");
        assert_eq!(back.criterion, Criterion::Custom(3.0));
        assert_eq!(back.generated_at, report.generated_at);
        assert!(back.outputs.is_empty());
    }
}
