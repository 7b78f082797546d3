//! Command-line parsing for the residual error model selector.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the fitting code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{Criterion, ErrorModelKind};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "errmod",
    version,
    about = "Residual error model selection for population model outputs"
)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Silence all logging.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Also write logs to this file.
    #[arg(long, value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Worker threads used to score outputs in parallel (default: all cores).
    #[arg(long, global = true)]
    pub threads: Option<usize>,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Score the candidate error models on exported engine tables.
    Score(ScoreArgs),
    /// Generate synthetic data with a known error model and score it.
    Demo(DemoArgs),
    /// Print a previously exported JSON report.
    Show(ShowArgs),
}

/// Ranking options shared by `score` and `demo`.
///
/// Unset values fall back to `ERRMOD_*` environment defaults.
#[derive(Debug, Args, Clone, Default)]
pub struct RankingArgs {
    /// Ranking criterion: `bic`, `aic` or a numeric penalty per parameter.
    #[arg(long, value_parser = parse_criterion)]
    pub criterion: Option<Criterion>,

    /// Number of ranked candidates to report (capped at 5).
    #[arg(long)]
    pub top: Option<usize>,

    /// Nelder-Mead iteration cap for the combined models.
    #[arg(long)]
    pub max_iters: Option<u64>,

    /// Nelder-Mead convergence threshold (sd of simplex costs).
    #[arg(long)]
    pub sd_tolerance: Option<f64>,

    /// Export ranked candidates to CSV.
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Export the full report to JSON.
    #[arg(long = "export-json")]
    pub export_json: Option<PathBuf>,
}

/// Options for scoring engine output tables.
#[derive(Debug, Args, Clone)]
pub struct ScoreArgs {
    /// Observation table (`id,time,<output>...`).
    #[arg(long, value_name = "CSV")]
    pub obs: PathBuf,

    /// Individual prediction table, aligned row-by-row with `--obs`.
    #[arg(long, value_name = "CSV")]
    pub pred: PathBuf,

    /// Simulation table (`rep,id,time,<output>...`); scores against the
    /// replicated predictions instead of `--pred`.
    #[arg(long, value_name = "CSV")]
    pub sim: Option<PathBuf>,

    /// Output column to score (repeatable; default: every output column).
    #[arg(long = "output", value_name = "NAME")]
    pub outputs: Vec<String>,

    #[command(flatten)]
    pub ranking: RankingArgs,
}

/// Options for the synthetic demo.
#[derive(Debug, Args, Clone)]
pub struct DemoArgs {
    /// Error model used to generate the observations.
    #[arg(long, value_enum, default_value_t = ErrorModelKind::Combined2)]
    pub model: ErrorModelKind,

    /// Additive (or log-scale) standard deviation.
    #[arg(long, default_value_t = 0.1)]
    pub a: f64,

    /// Proportional coefficient.
    #[arg(long, default_value_t = 0.15)]
    pub b: f64,

    /// Number of simulated subjects.
    #[arg(long, default_value_t = 30)]
    pub subjects: usize,

    /// Simulation replicates; above zero the demo scores against them.
    #[arg(long, default_value_t = 0)]
    pub replicates: usize,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Also write the generated tables to this directory.
    #[arg(long, value_name = "DIR")]
    pub write_dir: Option<PathBuf>,

    #[command(flatten)]
    pub ranking: RankingArgs,
}

/// Options for printing a saved report.
#[derive(Debug, Args, Clone)]
pub struct ShowArgs {
    /// Report JSON produced by `--export-json`.
    #[arg(long, value_name = "JSON")]
    pub report: PathBuf,
}

pub fn parse_criterion(s: &str) -> Result<Criterion, String> {
    s.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_command_parses_repeated_outputs_and_criterion() {
        let cli = Cli::parse_from([
            "errmod", "-vv", "score", "--obs", "o.csv", "--pred", "p.csv", "--output", "cp", "--output",
            "effect", "--criterion", "aic", "--top", "3",
        ]);
        assert_eq!(cli.verbose, 2);
        let Command::Score(args) = cli.command else {
            panic!("expected score");
        };
        assert_eq!(args.outputs, vec!["cp", "effect"]);
        assert_eq!(args.ranking.criterion, Some(Criterion::Aic));
        assert_eq!(args.ranking.top, Some(3));
        assert!(args.sim.is_none());
    }

    #[test]
    fn demo_defaults_and_custom_penalty() {
        let cli = Cli::parse_from(["errmod", "demo", "--model", "proportional", "--criterion", "4"]);
        let Command::Demo(args) = cli.command else {
            panic!("expected demo");
        };
        assert_eq!(args.model, ErrorModelKind::Proportional);
        assert_eq!(args.subjects, 30);
        assert_eq!(args.ranking.criterion, Some(Criterion::Custom(4.0)));
    }

    #[test]
    fn invalid_criterion_is_rejected() {
        let res = Cli::try_parse_from(["errmod", "demo", "--criterion", "-2"]);
        assert!(res.is_err());
    }
}
