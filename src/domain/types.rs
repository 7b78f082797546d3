//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during scoring
//! - exported to JSON/CSV
//! - reloaded later for display or comparisons

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::ScoreError;

/// Observed values for one output variable, one value per subject-time record.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationSeries {
    name: String,
    values: Vec<f64>,
}

impl ObservationSeries {
    /// Build a series, rejecting empty or non-finite input.
    ///
    /// Non-positive values are accepted here; they are excluded later by the
    /// positivity filter.
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Result<Self, ScoreError> {
        let name = name.into();
        validate_values(&name, "observations", &values)?;
        Ok(Self { name, values })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Predicted values for one output, possibly replicated.
///
/// With `R` replicates the length is `N * R` and index `i + k*N` belongs to
/// observation `i` under replicate `k`.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionSeries {
    name: String,
    values: Vec<f64>,
}

impl PredictionSeries {
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Result<Self, ScoreError> {
        let name = name.into();
        validate_values(&name, "predictions", &values)?;
        Ok(Self { name, values })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn validate_values(name: &str, what: &str, values: &[f64]) -> Result<(), ScoreError> {
    if values.is_empty() {
        return Err(ScoreError::InvalidInput(format!("{what} for '{name}' are empty")));
    }
    if let Some(idx) = values.iter().position(|v| !v.is_finite()) {
        return Err(ScoreError::InvalidInput(format!(
            "{what} for '{name}' contain a non-finite value at index {idx}"
        )));
    }
    Ok(())
}

/// The five residual error models.
///
/// Declaration order is the canonical order used to break exact ties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ErrorModelKind {
    /// σ² = a²
    Constant,
    /// σ² = (b·p)²
    Proportional,
    /// σ² = (a + b·p)²
    Combined1,
    /// σ² = a² + (b·p)²
    Combined2,
    /// Constant variance on the log scale.
    Exponential,
}

impl ErrorModelKind {
    pub const ALL: [ErrorModelKind; 5] = [
        ErrorModelKind::Constant,
        ErrorModelKind::Proportional,
        ErrorModelKind::Combined1,
        ErrorModelKind::Combined2,
        ErrorModelKind::Exponential,
    ];

    /// Label used in terminal output and exports.
    pub fn display_name(self) -> &'static str {
        match self {
            ErrorModelKind::Constant => "constant",
            ErrorModelKind::Proportional => "proportional",
            ErrorModelKind::Combined1 => "combined1",
            ErrorModelKind::Combined2 => "combined2",
            ErrorModelKind::Exponential => "exponential",
        }
    }

    /// Degrees of freedom used by the information criterion.
    pub fn df(self) -> usize {
        match self {
            ErrorModelKind::Constant | ErrorModelKind::Proportional | ErrorModelKind::Exponential => 1,
            ErrorModelKind::Combined1 | ErrorModelKind::Combined2 => 2,
        }
    }
}

impl fmt::Display for ErrorModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Penalty used to turn a log-likelihood into a ranking criterion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Criterion {
    Aic,
    Bic,
    /// Arbitrary penalty weight per degree of freedom.
    Custom(f64),
}

impl Criterion {
    /// Penalty weight per parameter for `n_effective` non-replicate observations.
    pub fn penalty_weight(self, n_effective: f64) -> f64 {
        match self {
            Criterion::Aic => 2.0,
            Criterion::Bic => n_effective.ln(),
            Criterion::Custom(w) => w,
        }
    }
}

impl Default for Criterion {
    fn default() -> Self {
        Criterion::Bic
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Criterion::Aic => f.write_str("AIC"),
            Criterion::Bic => f.write_str("BIC"),
            Criterion::Custom(w) => write!(f, "custom({w})"),
        }
    }
}

impl FromStr for Criterion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("bic") {
            return Ok(Criterion::Bic);
        }
        if s.eq_ignore_ascii_case("aic") {
            return Ok(Criterion::Aic);
        }
        match s.parse::<f64>() {
            Ok(w) if w.is_finite() && w >= 0.0 => Ok(Criterion::Custom(w)),
            Ok(_) => Err(format!("penalty weight must be finite and >= 0, got '{s}'")),
            Err(_) => Err(format!("expected AIC, BIC or a numeric penalty weight, got '{s}'")),
        }
    }
}

/// Fitted error-model parameters.
///
/// `a` is the additive (or log-scale) standard deviation, `b` the proportional
/// coefficient. Unused parameters are `None`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ErrorModelParams {
    pub a: Option<f64>,
    pub b: Option<f64>,
}

impl ErrorModelParams {
    pub fn additive(a: f64) -> Self {
        Self { a: Some(a), b: None }
    }

    pub fn proportional(b: f64) -> Self {
        Self { a: None, b: Some(b) }
    }

    pub fn combined(a: f64, b: f64) -> Self {
        Self {
            a: Some(a),
            b: Some(b),
        }
    }
}

/// One ranked error model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub error_model: ErrorModelKind,
    pub log_likelihood: f64,
    pub df: usize,
    pub criterion_value: f64,
    pub params: ErrorModelParams,
    /// Approximate standard errors of `(a, b)`; only for the combined models.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub std_errors: Option<[f64; 2]>,
}

/// A candidate that was excluded from the ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitFailure {
    pub error_model: ErrorModelKind,
    pub reason: String,
}

impl fmt::Display for FitFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} model: {}", self.error_model, self.reason)
    }
}

/// Bookkeeping about the data that entered a scoring call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreSummary {
    /// Pairs surviving the positivity filter (replicates included).
    pub n_pairs: usize,
    /// Pairs removed by the positivity filter.
    pub n_dropped: usize,
    pub replicates: usize,
    /// `n_pairs / replicates`.
    pub n_effective: f64,
    pub criterion: Criterion,
    pub penalty_weight: f64,
}

/// Output of a scoring call: candidates sorted ascending by criterion value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    pub ranked: Vec<ScoredCandidate>,
    pub failures: Vec<FitFailure>,
    pub summary: ScoreSummary,
}

impl RankedResult {
    pub fn best(&self) -> Option<&ScoredCandidate> {
        self.ranked.first()
    }
}

/// Nelder–Mead settings for the combined models.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitOptions {
    pub max_iters: u64,
    /// Convergence threshold on the standard deviation of simplex costs.
    pub sd_tolerance: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            max_iters: DEFAULT_MAX_ITERS,
            sd_tolerance: DEFAULT_SD_TOLERANCE,
        }
    }
}

pub const DEFAULT_MAX_ITERS: u64 = 5000;
pub const DEFAULT_SD_TOLERANCE: f64 = 1e-10;
pub const DEFAULT_TOP_K: usize = 5;

/// Mean and spread of weighted residuals under the selected model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResidualDiagnostics {
    pub mean: f64,
    pub sd: f64,
}

/// Selection outcome for a single output variable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputSelection {
    pub output: String,
    pub result: RankedResult,
    pub diagnostics: Option<ResidualDiagnostics>,
}

impl OutputSelection {
    pub fn best(&self) -> Option<&ScoredCandidate> {
        self.result.best()
    }
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags over environment defaults.
#[derive(Debug, Clone)]
pub struct ScoreConfig {
    pub criterion: Criterion,
    pub top_k: usize,
    pub fit: FitOptions,
    /// Score against simulated predictions (`R > 1`) instead of the
    /// deterministic ones.
    pub use_simulations: bool,

    pub export_results: Option<PathBuf>,
    pub export_report: Option<PathBuf>,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            criterion: Criterion::Bic,
            top_k: DEFAULT_TOP_K,
            fit: FitOptions::default(),
            use_simulations: false,
            export_results: None,
            export_report: None,
        }
    }
}

/// A saved selection report (JSON).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportFile {
    pub tool: String,
    pub generated_at: chrono::DateTime<chrono::Utc>,
    pub criterion: Criterion,
    pub outputs: Vec<OutputSelection>,
}
