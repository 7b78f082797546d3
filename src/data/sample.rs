//! Synthetic concentration data with a known residual error model.
//!
//! Each subject gets a one-compartment, first-order absorption profile
//!
//! ```text
//! C(t) = D·ka / (V·(ka - k)) · (exp(-k t) - exp(-ka t)),   k = CL / V
//! ```
//!
//! with log-normal inter-individual variation on ka, CL and V. Observations are
//! drawn around the individual prediction from the chosen error model.
//! Simulation replicates redraw the individual parameters, so they play the
//! role of the engine's stochastic predictions.

use std::fs::create_dir_all;
use std::path::{Path, PathBuf};

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;
use tracing::debug;

use crate::data::source::PredictionSource;
use crate::domain::{ErrorModelKind, ErrorModelParams, ObservationSeries, PredictionSeries};
use crate::error::AppError;
use crate::models::variance;

const POP_KA: f64 = 1.0;
const POP_CL: f64 = 2.0;
const POP_V: f64 = 20.0;
/// Standard deviation of the log-normal random effects.
const OMEGA: f64 = 0.3;

/// Default sampling times (hours).
pub const DEFAULT_TIMES: [f64; 8] = [0.5, 1.0, 2.0, 4.0, 6.0, 8.0, 12.0, 24.0];

#[derive(Debug, Clone)]
pub struct SyntheticConfig {
    pub output: String,
    pub subjects: usize,
    pub times: Vec<f64>,
    pub dose: f64,
    pub true_model: ErrorModelKind,
    pub a: f64,
    pub b: f64,
    pub replicates: usize,
    pub seed: u64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            output: "y1".to_string(),
            subjects: 30,
            times: DEFAULT_TIMES.to_vec(),
            dose: 100.0,
            true_model: ErrorModelKind::Combined2,
            a: 0.1,
            b: 0.15,
            replicates: 1,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct PkParams {
    ka: f64,
    cl: f64,
    v: f64,
}

/// In-memory source holding one generated output.
#[derive(Debug, Clone)]
pub struct SyntheticSource {
    output: String,
    ids: Vec<usize>,
    times: Vec<f64>,
    observed: Vec<f64>,
    predicted: Vec<f64>,
    /// `replicates` blocks of `observed.len()` values.
    simulated: Vec<f64>,
    replicates: usize,
}

impl SyntheticSource {
    pub fn generate(config: &SyntheticConfig) -> Result<Self, AppError> {
        validate(config)?;

        let mut rng = StdRng::seed_from_u64(config.seed);
        let normal =
            Normal::new(0.0, 1.0).map_err(|e| AppError::new(4, format!("Noise distribution error: {e}")))?;
        let params = ErrorModelParams::combined(config.a, config.b);

        let n = config.subjects * config.times.len();
        let mut ids = Vec::with_capacity(n);
        let mut times = Vec::with_capacity(n);
        let mut observed = Vec::with_capacity(n);
        let mut predicted = Vec::with_capacity(n);

        for subject in 1..=config.subjects {
            let indiv = draw_individual(&mut rng, &normal);
            for &t in &config.times {
                let p = concentration(config.dose, indiv, t);
                let eps = normal.sample(&mut rng);
                let o = match config.true_model {
                    ErrorModelKind::Exponential => p * (config.a * eps).exp(),
                    model => p + variance(model, p, &params).sqrt() * eps,
                };
                ids.push(subject);
                times.push(t);
                observed.push(o);
                predicted.push(p);
            }
        }

        let mut simulated = Vec::with_capacity(n * config.replicates);
        for _ in 0..config.replicates {
            for _ in 0..config.subjects {
                let indiv = draw_individual(&mut rng, &normal);
                for &t in &config.times {
                    simulated.push(concentration(config.dose, indiv, t));
                }
            }
        }

        debug!(
            subjects = config.subjects,
            records = n,
            replicates = config.replicates,
            model = config.true_model.display_name(),
            "generated synthetic data"
        );

        Ok(Self {
            output: config.output.clone(),
            ids,
            times,
            observed,
            predicted,
            simulated,
            replicates: config.replicates,
        })
    }

    /// Write `observations.csv`, `predictions.csv` and `simulations.csv` into `dir`.
    ///
    /// The files use the layout read by `TableSource`.
    pub fn write_tables(&self, dir: &Path) -> Result<Vec<PathBuf>, AppError> {
        create_dir_all(dir)
            .map_err(|e| AppError::new(2, format!("Failed to create '{}': {e}", dir.display())))?;

        let obs_path = dir.join("observations.csv");
        let pred_path = dir.join("predictions.csv");
        let sim_path = dir.join("simulations.csv");

        self.write_table(&obs_path, &self.observed)?;
        self.write_table(&pred_path, &self.predicted)?;

        if self.replicates == 0 {
            return Ok(vec![obs_path, pred_path]);
        }

        let n = self.observed.len();
        let mut writer = csv_writer(&sim_path)?;
        write_row(&mut writer, &sim_path, ["rep", "id", "time", self.output.as_str()])?;
        for (rep, block) in self.simulated.chunks(n).enumerate() {
            for (i, value) in block.iter().enumerate() {
                let row = [
                    (rep + 1).to_string(),
                    self.ids[i].to_string(),
                    self.times[i].to_string(),
                    value.to_string(),
                ];
                write_row(&mut writer, &sim_path, &row)?;
            }
        }
        flush(&mut writer, &sim_path)?;

        Ok(vec![obs_path, pred_path, sim_path])
    }

    fn write_table(&self, path: &Path, values: &[f64]) -> Result<(), AppError> {
        let mut writer = csv_writer(path)?;
        write_row(&mut writer, path, ["id", "time", self.output.as_str()])?;
        for (i, value) in values.iter().enumerate() {
            let row = [self.ids[i].to_string(), self.times[i].to_string(), value.to_string()];
            write_row(&mut writer, path, &row)?;
        }
        flush(&mut writer, path)
    }

    fn check_output(&self, output: &str) -> Result<(), AppError> {
        if output.eq_ignore_ascii_case(&self.output) {
            Ok(())
        } else {
            Err(AppError::new(2, format!("Output `{output}` not found in synthetic data.")))
        }
    }
}

impl PredictionSource for SyntheticSource {
    fn outputs(&self) -> Vec<String> {
        vec![self.output.clone()]
    }

    fn fetch_observations(&self, output: &str) -> Result<ObservationSeries, AppError> {
        self.check_output(output)?;
        Ok(ObservationSeries::new(output, self.observed.clone())?)
    }

    fn fetch_predictions(&self, output: &str) -> Result<PredictionSeries, AppError> {
        self.check_output(output)?;
        Ok(PredictionSeries::new(output, self.predicted.clone())?)
    }

    fn fetch_simulated_predictions(&self, output: &str) -> Result<PredictionSeries, AppError> {
        self.check_output(output)?;
        if self.replicates == 0 {
            return Err(AppError::new(2, "Synthetic data was generated without replicates."));
        }
        Ok(PredictionSeries::new(output, self.simulated.clone())?)
    }
}

fn validate(config: &SyntheticConfig) -> Result<(), AppError> {
    if config.subjects == 0 {
        return Err(AppError::new(2, "Subject count must be > 0."));
    }
    if config.times.is_empty() || !config.times.iter().all(|t| t.is_finite() && *t > 0.0) {
        return Err(AppError::new(2, "Sampling times must be finite and > 0."));
    }
    if !(config.dose.is_finite() && config.dose > 0.0) {
        return Err(AppError::new(2, "Dose must be finite and > 0."));
    }
    if !(config.a.is_finite() && config.a >= 0.0 && config.b.is_finite() && config.b >= 0.0) {
        return Err(AppError::new(2, "Error model parameters must be finite and >= 0."));
    }
    Ok(())
}

fn draw_individual(rng: &mut StdRng, normal: &Normal<f64>) -> PkParams {
    let mut eta = || (OMEGA * normal.sample(&mut *rng)).exp();
    PkParams {
        ka: POP_KA * eta(),
        cl: POP_CL * eta(),
        v: POP_V * eta(),
    }
}

fn concentration(dose: f64, pk: PkParams, t: f64) -> f64 {
    let k = pk.cl / pk.v;
    if (pk.ka - k).abs() < 1e-9 {
        // Limit ka -> k.
        return dose / pk.v * k * t * (-k * t).exp();
    }
    dose * pk.ka / (pk.v * (pk.ka - k)) * ((-k * t).exp() - (-pk.ka * t).exp())
}

fn csv_writer(path: &Path) -> Result<csv::Writer<std::fs::File>, AppError> {
    csv::Writer::from_path(path)
        .map_err(|e| AppError::new(2, format!("Failed to create '{}': {e}", path.display())))
}

fn write_row<I, T>(writer: &mut csv::Writer<std::fs::File>, path: &Path, row: I) -> Result<(), AppError>
where
    I: IntoIterator<Item = T>,
    T: AsRef<[u8]>,
{
    writer
        .write_record(row)
        .map_err(|e| AppError::new(2, format!("Failed to write '{}': {e}", path.display())))
}

fn flush(writer: &mut csv::Writer<std::fs::File>, path: &Path) -> Result<(), AppError> {
    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to write '{}': {e}", path.display())))
}
