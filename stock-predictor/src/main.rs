//! stock-predictor CLI
//!
//! # Usage
//!
//! ```bash
//! # Write the default configuration
//! stock-predictor init-config --path config/default.toml
//!
//! # Train and evaluate a single model
//! stock-predictor --config config/default.toml run --window-size 5 --learning-rate 0.5
//!
//! # Window-size sweep (W = 1..10, learning rate 0.5)
//! stock-predictor --config config/default.toml sweep-window
//!
//! # Learning-rate sweep (0.1..1.0, W = 5)
//! stock-predictor --config config/default.toml sweep-rate --parallel
//!
//! # Check the input files before a long run
//! stock-predictor --config config/default.toml validate
//! ```

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use stock_predictor::config::{ErrorPolicy, ExperimentConfig};
use stock_predictor::experiment::{
    ExperimentOrchestrator, IterationPaths, Sweep, SweepKind, SweepReport,
};
use stock_predictor::report::write_report;
use stock_predictor::training::DEFAULT_LEARNING_RATE;
use stock_predictor::validation::SeriesIntegrity;

const SEPARATOR: &str = "============================================================";

#[derive(Parser)]
#[command(name = "stock-predictor")]
#[command(about = "Sliding-window neural network experiments on a price series")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Raw training series (overrides config)
    #[arg(long, global = true)]
    training: Option<PathBuf>,

    /// Raw testing series (overrides config)
    #[arg(long, global = true)]
    testing: Option<PathBuf>,

    /// Directory for per-iteration datasets and models (overrides config)
    #[arg(long, global = true)]
    work_dir: Option<PathBuf>,

    /// Directory for sweep reports (overrides config)
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Run sweep iterations in parallel
    #[arg(long, global = true)]
    parallel: bool,

    /// Record failed iterations and keep sweeping
    #[arg(long, global = true)]
    continue_on_error: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Train and evaluate a single model
    Run {
        /// Sliding window size
        #[arg(short, long, default_value_t = 5)]
        window_size: usize,

        /// Learning rate
        #[arg(short, long, default_value_t = DEFAULT_LEARNING_RATE)]
        learning_rate: f64,
    },

    /// Vary the window size at a fixed learning rate
    SweepWindow,

    /// Vary the learning rate at a fixed window size
    SweepRate,

    /// Run both sweeps
    All,

    /// Check the training and testing files
    Validate,

    /// Write the default configuration file
    InitConfig {
        /// Destination path
        #[arg(short, long, default_value = "config/default.toml")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

impl Cli {
    fn load_config(&self) -> Result<ExperimentConfig> {
        let mut config = match &self.config {
            Some(path) => ExperimentConfig::load(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => ExperimentConfig::default(),
        };

        if let Some(path) = &self.training {
            config.data.training_path = path.clone();
        }
        if let Some(path) = &self.testing {
            config.data.testing_path = path.clone();
        }
        if let Some(dir) = &self.work_dir {
            config.data.work_dir = dir.clone();
        }
        if let Some(dir) = &self.output {
            config.data.report_dir = dir.clone();
        }
        if self.parallel {
            config.policy.parallel = true;
        }
        if self.continue_on_error {
            config.policy.on_error = ErrorPolicy::Continue;
        }

        Ok(config)
    }
}

fn cmd_run(config: ExperimentConfig, window_size: usize, learning_rate: f64) -> Result<()> {
    let dir = config
        .data
        .work_dir
        .join("single")
        .join(format!("w{}-lr{}", window_size, learning_rate));
    let paths = IterationPaths::new(&dir);
    let orchestrator = ExperimentOrchestrator::new(config);

    let outcome = orchestrator
        .run_cycle(window_size, learning_rate, &paths, None)
        .with_context(|| {
            format!(
                "Cycle failed for window size {} and learning rate {}",
                window_size, learning_rate
            )
        })?;

    println!("{}", SEPARATOR);
    println!("Single run (W = {}, learning rate = {})", window_size, learning_rate);
    println!("{}", SEPARATOR);
    println!("  Bounds:          [{}, {}]", outcome.bounds.min, outcome.bounds.max);
    println!("  Samples:         {}", outcome.training.sample_count);
    println!("  Iterations:      {}", outcome.training.iterations);
    println!(
        "  Training error:  {}",
        outcome
            .training
            .final_error
            .map(|e| format!("{:.6}", e))
            .unwrap_or_else(|| "n/a".into())
    );
    println!("  Converged:       {}", outcome.training.converged);
    println!("  Expected value:  {:.4}", outcome.evaluation.actual);
    println!("  Predicted value: {:.4}", outcome.evaluation.predicted);
    println!("  Squared error:   {:.6}", outcome.evaluation.squared_error);
    println!("  Model:           {}", outcome.training.artifact.path().display());

    Ok(())
}

fn run_sweep(orchestrator: &ExperimentOrchestrator, kind: SweepKind, report_dir: &Path) -> Result<SweepReport> {
    let sweep = Sweep::from_config(kind, orchestrator.config());

    let pb = ProgressBar::new(sweep.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")?
            .progress_chars("=>-"),
    );
    pb.set_message(kind.title());

    let report = orchestrator
        .run_sweep_with(&sweep, |result| {
            pb.inc(1);
            pb.set_message(format!(
                "{} = {} (squared error {:.4})",
                kind.parameter_name(),
                result.parameter_value,
                result.squared_error
            ));
        })
        .with_context(|| format!("{} failed", kind.title()))?;
    pb.finish_with_message(format!("{} complete", kind.title()));

    println!("\n{}", report.summary());

    let (csv, json) = write_report(&report, report_dir)
        .with_context(|| format!("Failed to write report to {}", report_dir.display()))?;
    println!("Series written to {}", csv.display());
    println!("Summary written to {}", json.display());

    Ok(report)
}

fn cmd_sweeps(config: ExperimentConfig, kinds: &[SweepKind]) -> Result<()> {
    let report_dir = config.data.report_dir.clone();
    let orchestrator = ExperimentOrchestrator::new(config);

    let mut incomplete = 0;
    for &kind in kinds {
        let report = run_sweep(&orchestrator, kind, &report_dir)?;
        if !report.is_complete() {
            incomplete += report.failures.len();
        }
    }

    if incomplete > 0 {
        bail!("{} iterations failed", incomplete);
    }
    Ok(())
}

fn cmd_validate(config: &ExperimentConfig) -> Result<()> {
    let mut window_sizes = config.window_sweep.window_sizes.clone();
    window_sizes.push(config.rate_sweep.window_size);

    let report = SeriesIntegrity::new(config.evaluation.anchor, &window_sizes)
        .check(&config.data.training_path, &config.data.testing_path);

    println!("{}", SEPARATOR);
    println!("{}", report.summary());
    println!("{}", SEPARATOR);
    for check in &report.checks {
        let status = if check.passed { "PASS" } else { "FAIL" };
        println!("  [{}] {}: {}", status, check.check, check.message);
        if let Some(details) = &check.details {
            println!("         {}", details);
        }
    }

    if !report.all_passed() {
        bail!("{} checks failed", report.failed_checks().len());
    }
    Ok(())
}

fn cmd_init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    ExperimentConfig::default()
        .save(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Default configuration written to {}", path.display());
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.load_config()?;

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("stock_predictor={}", config.logging.level).parse()?),
        )
        .init();

    match cli.command {
        Commands::Run {
            window_size,
            learning_rate,
        } => cmd_run(config, window_size, learning_rate)?,
        Commands::SweepWindow => cmd_sweeps(config, &[SweepKind::WindowSize])?,
        Commands::SweepRate => cmd_sweeps(config, &[SweepKind::LearningRate])?,
        Commands::All => cmd_sweeps(config, &[SweepKind::WindowSize, SweepKind::LearningRate])?,
        Commands::Validate => cmd_validate(&config)?,
        Commands::InitConfig { path, force } => cmd_init_config(&path, force)?,
    }

    Ok(())
}
