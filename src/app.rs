//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and loads environment defaults
//! - sets up logging and the worker pool
//! - reads engine tables or generates synthetic data
//! - runs error-model selection
//! - prints reports and writes optional exports

use clap::Parser;
use tracing::{debug, info};

use crate::cli::{Cli, Command, DemoArgs, RankingArgs, ScoreArgs, ShowArgs};
use crate::data::{SyntheticConfig, SyntheticSource, TableSource};
use crate::domain::{Criterion, FitOptions, ScoreConfig, DEFAULT_MAX_ITERS, DEFAULT_TOP_K};
use crate::error::AppError;

pub mod pipeline;

pub const ENV_CRITERION: &str = "ERRMOD_CRITERION";
pub const ENV_TOP_K: &str = "ERRMOD_TOP_K";
pub const ENV_MAX_ITERS: &str = "ERRMOD_MAX_ITERS";

/// Entry point for the `errmod` binary.
pub fn run() -> Result<(), AppError> {
    // A missing .env file is fine.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    crate::logging::setup_logging(cli.verbose, cli.quiet, cli.log_file.clone())?;

    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .map_err(|e| AppError::new(2, format!("Failed to configure {threads} worker threads: {e}")))?;
    }

    let env = EnvDefaults::from_env()?;
    match cli.command {
        Command::Score(args) => handle_score(args, &env),
        Command::Demo(args) => handle_demo(args, &env),
        Command::Show(args) => handle_show(args),
    }
}

/// Defaults read from `ERRMOD_*` variables; CLI flags take precedence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvDefaults {
    pub criterion: Criterion,
    pub top_k: usize,
    pub max_iters: u64,
}

impl Default for EnvDefaults {
    fn default() -> Self {
        Self {
            criterion: Criterion::Bic,
            top_k: DEFAULT_TOP_K,
            max_iters: DEFAULT_MAX_ITERS,
        }
    }
}

impl EnvDefaults {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build defaults from an arbitrary variable lookup. Unset or blank
    /// variables keep the built-in default; unparsable ones are errors.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let mut out = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get(ENV_CRITERION) {
            out.criterion = v
                .parse()
                .map_err(|e| AppError::new(2, format!("Invalid {ENV_CRITERION}: {e}")))?;
        }
        if let Some(v) = get(ENV_TOP_K) {
            out.top_k = v
                .trim()
                .parse()
                .map_err(|e| AppError::new(2, format!("Invalid {ENV_TOP_K} '{v}': {e}")))?;
        }
        if let Some(v) = get(ENV_MAX_ITERS) {
            out.max_iters = v
                .trim()
                .parse()
                .map_err(|e| AppError::new(2, format!("Invalid {ENV_MAX_ITERS} '{v}': {e}")))?;
        }
        Ok(out)
    }
}

fn handle_score(args: ScoreArgs, env: &EnvDefaults) -> Result<(), AppError> {
    let mut config = score_config_from_args(&args.ranking, env)?;
    config.use_simulations = args.sim.is_some();

    let source = TableSource::from_paths(&args.obs, &args.pred, args.sim.as_deref())?;
    debug!(
        rows = source.rows(),
        replicates = source.replicates(),
        "loaded engine tables"
    );

    execute(&source, &args.outputs, &config)
}

fn handle_demo(args: DemoArgs, env: &EnvDefaults) -> Result<(), AppError> {
    let mut config = score_config_from_args(&args.ranking, env)?;
    config.use_simulations = args.replicates > 0;

    let synthetic = SyntheticConfig {
        subjects: args.subjects,
        true_model: args.model,
        a: args.a,
        b: args.b,
        replicates: args.replicates,
        seed: args.seed,
        ..SyntheticConfig::default()
    };
    let source = SyntheticSource::generate(&synthetic)?;
    println!(
        "Synthetic data: {} subjects, true model {} (a={}, b={}), seed {}",
        synthetic.subjects, synthetic.true_model, synthetic.a, synthetic.b, synthetic.seed
    );

    if let Some(dir) = &args.write_dir {
        let written = source.write_tables(dir)?;
        for path in written {
            info!(path = %path.display(), "wrote table");
        }
    }

    execute(&source, &[], &config)
}

fn handle_show(args: ShowArgs) -> Result<(), AppError> {
    let report = crate::io::read_report_json(&args.report)?;
    println!(
        "Report from {} ({}), criterion {}",
        report.tool,
        report.generated_at.to_rfc3339(),
        report.criterion
    );
    let run = pipeline::RunOutput {
        selections: report.outputs,
        skipped: Vec::new(),
    };
    println!("{}", crate::report::format_run(&run));
    Ok(())
}

fn execute<S: crate::data::PredictionSource>(
    source: &S,
    outputs: &[String],
    config: &ScoreConfig,
) -> Result<(), AppError> {
    let run = pipeline::run_selection(source, outputs, config)?;
    println!("{}", crate::report::format_run(&run));

    if let Some(path) = &config.export_results {
        crate::io::write_results_csv(path, &run.selections)?;
        info!(path = %path.display(), "exported rankings");
    }
    if let Some(path) = &config.export_report {
        let report = crate::io::build_report(config.criterion, &run.selections);
        crate::io::write_report_json(path, &report)?;
        info!(path = %path.display(), "exported report");
    }

    Ok(())
}

/// Merge CLI ranking flags over environment defaults.
pub fn score_config_from_args(args: &RankingArgs, env: &EnvDefaults) -> Result<ScoreConfig, AppError> {
    let defaults = FitOptions::default();
    let sd_tolerance = args.sd_tolerance.unwrap_or(defaults.sd_tolerance);
    if !(sd_tolerance.is_finite() && sd_tolerance > 0.0) {
        return Err(AppError::new(2, "--sd-tolerance must be finite and > 0."));
    }
    let max_iters = args.max_iters.unwrap_or(env.max_iters);
    if max_iters == 0 {
        return Err(AppError::new(2, "--max-iters must be > 0."));
    }

    Ok(ScoreConfig {
        criterion: args.criterion.unwrap_or(env.criterion),
        top_k: args.top.unwrap_or(env.top_k),
        fit: FitOptions {
            max_iters,
            sd_tolerance,
        },
        use_simulations: false,
        export_results: args.export.clone(),
        export_report: args.export_json.clone(),
    })
}
