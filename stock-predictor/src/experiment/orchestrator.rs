//! Prepare/train/evaluate cycles and the sweeps built on them.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{BoundsPolicy, DivergencePolicy, ErrorPolicy, ExperimentConfig};
use crate::data::{write_dataset, LoaderError, SeriesLoader};
use crate::evaluation::{Evaluation, EvaluationEngine, EvaluationError};
use crate::normalize::{NormalizationBounds, NormalizationError};
use crate::training::{TrainingEngine, TrainingError, TrainingOutcome};
use crate::window::{SlidingWindowBuilder, TrainingDataset, WindowError};

use super::paths::IterationPaths;
use super::result::{ExperimentResult, IterationFailure, SweepReport};
use super::sweep::{Sweep, SweepKind, SweepPoint};

/// Failure of a single cycle.
#[derive(Error, Debug)]
pub enum CycleError {
    #[error("loader error: {0}")]
    Loader(#[from] LoaderError),

    #[error("normalization error: {0}")]
    Normalization(#[from] NormalizationError),

    #[error("window error: {0}")]
    Window(#[from] WindowError),

    #[error("training error: {0}")]
    Training(#[from] TrainingError),

    #[error("evaluation error: {0}")]
    Evaluation(#[from] EvaluationError),

    #[error("training did not converge after {iterations} iterations (error {final_error}, target {max_error})")]
    TrainingDivergence {
        iterations: usize,
        final_error: f64,
        max_error: f64,
    },
}

#[derive(Error, Debug)]
pub enum ExperimentError {
    #[error("{sweep} sweep iteration {index} (window size {window_size}, learning rate {learning_rate}) failed: {source}")]
    Iteration {
        sweep: SweepKind,
        index: usize,
        window_size: usize,
        learning_rate: f64,
        #[source]
        source: CycleError,
    },

    #[error("invalid sweep: {0}")]
    InvalidSweep(String),

    #[error("failed to fit shared bounds on {path}: {source}")]
    SharedBounds {
        path: PathBuf,
        #[source]
        source: CycleError,
    },
}

/// Everything one cycle produced.
#[derive(Debug, Clone)]
pub struct CycleOutcome {
    pub bounds: NormalizationBounds,
    pub training: TrainingOutcome,
    pub evaluation: Evaluation,
}

impl CycleOutcome {
    pub fn into_result(self, parameter_value: f64, learning_rate: f64) -> ExperimentResult {
        ExperimentResult {
            parameter_value,
            squared_error: self.evaluation.squared_error,
            window_size: self.evaluation.window_size,
            learning_rate,
            predicted: self.evaluation.predicted,
            actual: self.evaluation.actual,
            iterations: self.training.iterations,
            final_training_error: self.training.final_error,
            converged: self.training.converged,
        }
    }
}

/// Drives sweeps over the configured training and testing files.
pub struct ExperimentOrchestrator {
    config: ExperimentConfig,
    evaluator: EvaluationEngine,
}

impl ExperimentOrchestrator {
    pub fn new(config: ExperimentConfig) -> Self {
        let evaluator = EvaluationEngine::new(config.evaluation.anchor);
        Self { config, evaluator }
    }

    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    /// Load the training series, normalize it and write the dataset file.
    ///
    /// Bounds are fitted on the training series unless `shared` is given.
    pub fn prepare(
        &self,
        window_size: usize,
        paths: &IterationPaths,
        shared: Option<NormalizationBounds>,
    ) -> Result<(NormalizationBounds, TrainingDataset), CycleError> {
        let builder = SlidingWindowBuilder::new(window_size)?;
        let series = SeriesLoader::new(&self.config.data.training_path).load()?;
        let values = series.values();

        let bounds = match shared {
            Some(bounds) => bounds,
            None => NormalizationBounds::fit(&values)?,
        };
        let normalized = bounds.normalize_all(&values)?;
        let dataset = builder.build(&normalized);

        write_dataset(&paths.dataset, &dataset)?;
        debug!(
            window_size,
            samples = dataset.len(),
            min = bounds.min,
            max = bounds.max,
            "Wrote learning data to {}",
            paths.dataset.display()
        );

        Ok((bounds, dataset))
    }

    /// One full cycle: prepare, train from the dataset file, evaluate.
    pub fn run_cycle(
        &self,
        window_size: usize,
        learning_rate: f64,
        paths: &IterationPaths,
        shared: Option<NormalizationBounds>,
    ) -> Result<CycleOutcome, CycleError> {
        let (bounds, _) = self.prepare(window_size, paths, shared)?;

        let engine = TrainingEngine::new(self.config.training.params(learning_rate))?;
        let training = engine.train_from_file(
            &paths.dataset,
            window_size,
            &paths.artifact,
            |progress| {
                debug!(
                    iteration = progress.iteration,
                    total_error = progress.total_error,
                    "Network error for iteration"
                );
            },
        )?;

        if !training.converged {
            match self.config.policy.divergence {
                DivergencePolicy::Record => {
                    warn!(
                        window_size,
                        learning_rate,
                        iterations = training.iterations,
                        "Training stopped before reaching the error target"
                    );
                }
                DivergencePolicy::Abort => {
                    return Err(CycleError::TrainingDivergence {
                        iterations: training.iterations,
                        final_error: training.final_error.unwrap_or(f64::NAN),
                        max_error: engine.params().max_error,
                    });
                }
            }
        }

        let evaluation = self.evaluator.evaluate(
            &paths.artifact,
            &self.config.data.testing_path,
            window_size,
            &bounds,
        )?;

        info!(
            window_size,
            learning_rate,
            expected = evaluation.actual,
            predicted = evaluation.predicted,
            squared_error = evaluation.squared_error,
            "Cycle complete"
        );

        Ok(CycleOutcome {
            bounds,
            training,
            evaluation,
        })
    }

    pub fn run_sweep(&self, sweep: &Sweep) -> Result<SweepReport, ExperimentError> {
        self.run_sweep_with(sweep, |_| {})
    }

    /// Run every point of `sweep`, calling `on_result` after each successful
    /// iteration. Results are in sweep order in both sequential and parallel
    /// mode. `on_result` is not called once an aborting failure was seen.
    pub fn run_sweep_with<F>(&self, sweep: &Sweep, on_result: F) -> Result<SweepReport, ExperimentError>
    where
        F: Fn(&ExperimentResult) + Sync,
    {
        self.check_sweep(sweep)?;

        let shared = match self.config.policy.bounds {
            BoundsPolicy::PerIteration => None,
            BoundsPolicy::Shared => Some(self.fit_shared_bounds()?),
        };

        info!(
            sweep = %sweep.kind,
            iterations = sweep.len(),
            parallel = self.config.policy.parallel,
            "Starting {}",
            sweep.kind.title()
        );

        let mut report = SweepReport::new(sweep.kind);

        if self.config.policy.parallel {
            // Under `abort`, iterations not yet started when one fails are skipped.
            let aborted = AtomicBool::new(false);
            let abort_on_error = self.config.policy.on_error == ErrorPolicy::Abort;

            let outcomes: Vec<_> = sweep
                .points
                .par_iter()
                .map(|point| {
                    if aborted.load(Ordering::SeqCst) {
                        return (point, None);
                    }
                    let outcome = self.run_point(sweep.kind, point, shared);
                    match &outcome {
                        Ok(result) if !aborted.load(Ordering::SeqCst) => on_result(result),
                        Ok(_) => {}
                        Err(_) if abort_on_error => aborted.store(true, Ordering::SeqCst),
                        Err(_) => {}
                    }
                    (point, Some(outcome))
                })
                .collect();

            for (point, outcome) in outcomes {
                if let Some(outcome) = outcome {
                    self.record(&mut report, sweep.kind, point, outcome)?;
                }
            }
        } else {
            for point in &sweep.points {
                let outcome = self.run_point(sweep.kind, point, shared);
                if let Ok(result) = &outcome {
                    on_result(result);
                }
                self.record(&mut report, sweep.kind, point, outcome)?;
            }
        }

        info!(
            sweep = %sweep.kind,
            completed = report.results.len(),
            failed = report.failures.len(),
            "Finished {}",
            sweep.kind.title()
        );

        Ok(report)
    }

    /// Window sizes 1..=10 at the configured learning rate.
    pub fn run_window_sweep(&self) -> Result<SweepReport, ExperimentError> {
        self.run_sweep(&Sweep::from_config(SweepKind::WindowSize, &self.config))
    }

    /// Learning rates 0.1..=1.0 at the configured window size.
    pub fn run_rate_sweep(&self) -> Result<SweepReport, ExperimentError> {
        self.run_sweep(&Sweep::from_config(SweepKind::LearningRate, &self.config))
    }

    fn run_point(
        &self,
        kind: SweepKind,
        point: &SweepPoint,
        shared: Option<NormalizationBounds>,
    ) -> Result<ExperimentResult, CycleError> {
        let paths = IterationPaths::for_point(&self.config.data.work_dir, kind, point);
        let outcome = self.run_cycle(point.window_size, point.learning_rate, &paths, shared)?;
        Ok(outcome.into_result(point.parameter_value, point.learning_rate))
    }

    fn record(
        &self,
        report: &mut SweepReport,
        kind: SweepKind,
        point: &SweepPoint,
        outcome: Result<ExperimentResult, CycleError>,
    ) -> Result<(), ExperimentError> {
        match outcome {
            Ok(result) => {
                report.results.push(result);
                Ok(())
            }
            Err(source) => match self.config.policy.on_error {
                ErrorPolicy::Abort => Err(ExperimentError::Iteration {
                    sweep: kind,
                    index: point.index,
                    window_size: point.window_size,
                    learning_rate: point.learning_rate,
                    source,
                }),
                ErrorPolicy::Continue => {
                    warn!(
                        sweep = %kind,
                        index = point.index,
                        window_size = point.window_size,
                        learning_rate = point.learning_rate,
                        error = %source,
                        "Iteration failed, continuing"
                    );
                    report.failures.push(IterationFailure {
                        index: point.index,
                        parameter_value: point.parameter_value,
                        window_size: point.window_size,
                        learning_rate: point.learning_rate,
                        error: source.to_string(),
                    });
                    Ok(())
                }
            },
        }
    }

    fn check_sweep(&self, sweep: &Sweep) -> Result<(), ExperimentError> {
        if sweep.is_empty() {
            return Err(ExperimentError::InvalidSweep(format!(
                "{} sweep has no iterations",
                sweep.kind
            )));
        }
        if let Some(point) = sweep.points.iter().find(|p| p.window_size == 0) {
            return Err(ExperimentError::InvalidSweep(format!(
                "iteration {} has window size 0",
                point.index
            )));
        }
        Ok(())
    }

    fn fit_shared_bounds(&self) -> Result<NormalizationBounds, ExperimentError> {
        let path = &self.config.data.training_path;
        fit_bounds(path).map_err(|source| ExperimentError::SharedBounds {
            path: path.clone(),
            source,
        })
    }
}

/// Fit bounds once for a whole sweep; a degenerate range fails here rather
/// than in every iteration.
fn fit_bounds(path: &Path) -> Result<NormalizationBounds, CycleError> {
    let series = SeriesLoader::new(path).load()?;
    let bounds = NormalizationBounds::fit(&series.values())?;
    if bounds.is_degenerate() {
        return Err(NormalizationError::DegenerateRange { value: bounds.min }.into());
    }
    Ok(bounds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::atomic::AtomicUsize;
    use tempfile::{tempdir, TempDir};

    fn write_wave(path: &Path, len: usize, phase: f64) {
        let content: String = (0..len)
            .map(|i| format!("{},{}\n", i, 100.0 + 20.0 * (i as f64 * 0.25 + phase).sin()))
            .collect();
        fs::write(path, content).unwrap();
    }

    fn setup(test_len: usize) -> (TempDir, ExperimentConfig) {
        let dir = tempdir().unwrap();
        let training = dir.path().join("train.csv");
        let testing = dir.path().join("test.csv");
        write_wave(&training, 80, 0.0);
        write_wave(&testing, test_len, 0.1);

        let mut config = ExperimentConfig::default();
        config.data.training_path = training;
        config.data.testing_path = testing;
        config.data.work_dir = dir.path().join("runs");
        config.training.max_iterations = 15;
        config.training.seed = Some(3);
        (dir, config)
    }

    #[test]
    fn test_window_sweep_results_in_order() {
        let (_dir, config) = setup(80);
        let orchestrator = ExperimentOrchestrator::new(config);

        let report = orchestrator.run_window_sweep().unwrap();
        assert_eq!(report.kind, SweepKind::WindowSize);
        assert_eq!(report.results.len(), 10);
        assert!(report.failures.is_empty());
        for (i, result) in report.results.iter().enumerate() {
            assert_eq!(result.parameter_value, (i + 1) as f64);
            assert_eq!(result.window_size, i + 1);
            assert_eq!(result.learning_rate, 0.5);
            assert!(result.iterations <= 15);
            assert!(result.squared_error >= 0.0);
        }
    }

    #[test]
    fn test_rate_sweep_uses_fixed_window() {
        let (_dir, mut config) = setup(80);
        config.rate_sweep.learning_rates = vec![0.1, 0.5, 0.9];
        let orchestrator = ExperimentOrchestrator::new(config);

        let report = orchestrator.run_rate_sweep().unwrap();
        let params: Vec<f64> = report.results.iter().map(|r| r.parameter_value).collect();
        assert_eq!(params, vec![0.1, 0.5, 0.9]);
        assert!(report.results.iter().all(|r| r.window_size == 5));
    }

    #[test]
    fn test_each_iteration_owns_its_artifacts() {
        let (dir, mut config) = setup(80);
        config.window_sweep.window_sizes = vec![2, 3];
        let orchestrator = ExperimentOrchestrator::new(config);
        orchestrator.run_window_sweep().unwrap();

        for label in ["01-w2", "02-w3"] {
            let iteration = dir.path().join("runs/window-size").join(label);
            assert!(iteration.join("learning_data.csv").exists());
            assert!(iteration.join("model.json").exists());
        }
    }

    #[test]
    fn test_cycle_writes_dataset_of_expected_size() {
        let (dir, config) = setup(80);
        let orchestrator = ExperimentOrchestrator::new(config);
        let paths = IterationPaths::new(dir.path().join("single"));

        let outcome = orchestrator.run_cycle(4, 0.5, &paths, None).unwrap();
        assert_eq!(outcome.training.sample_count, 76);
        assert_eq!(outcome.evaluation.skipped_lines, 58);
        assert_eq!(outcome.training.window_size, 4);

        let lines = fs::read_to_string(&paths.dataset).unwrap().lines().count();
        assert_eq!(lines, 76);
    }

    #[test]
    fn test_abort_stops_at_first_failure() {
        // 20 test lines cannot hold the anchored window for any W
        let (_dir, config) = setup(20);
        let orchestrator = ExperimentOrchestrator::new(config);

        let err = orchestrator.run_window_sweep().unwrap_err();
        match err {
            ExperimentError::Iteration {
                index,
                window_size,
                source,
                ..
            } => {
                assert_eq!(index, 0);
                assert_eq!(window_size, 1);
                assert!(matches!(
                    source,
                    CycleError::Evaluation(EvaluationError::InsufficientData { .. })
                ));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_continue_records_failures() {
        let (_dir, mut config) = setup(20);
        config.policy.on_error = ErrorPolicy::Continue;
        config.window_sweep.window_sizes = vec![1, 2, 3];
        let orchestrator = ExperimentOrchestrator::new(config);

        let report = orchestrator.run_window_sweep().unwrap();
        assert!(report.results.is_empty());
        assert_eq!(report.failures.len(), 3);
        assert_eq!(report.failures[2].parameter_value, 3.0);
        assert!(report.failures[0].error.contains("insufficient test data"));
    }

    #[test]
    fn test_divergence_policies() {
        // an error target of 0 can never be reached
        let (_dir, mut config) = setup(80);
        config.training.max_error = 0.0;
        config.window_sweep.window_sizes = vec![2];

        let report = ExperimentOrchestrator::new(config.clone())
            .run_window_sweep()
            .unwrap();
        assert_eq!(report.results.len(), 1);
        assert!(!report.results[0].converged);
        assert_eq!(report.results[0].iterations, 15);
        assert_eq!(report.unconverged_count(), 1);

        config.policy.divergence = DivergencePolicy::Abort;
        let err = ExperimentOrchestrator::new(config)
            .run_window_sweep()
            .unwrap_err();
        assert!(matches!(
            err,
            ExperimentError::Iteration {
                source: CycleError::TrainingDivergence { iterations: 15, .. },
                ..
            }
        ));
    }

    #[test]
    fn test_parallel_abort_returns_failure_without_reporting_results() {
        let (_dir, mut config) = setup(20);
        config.policy.parallel = true;
        let orchestrator = ExperimentOrchestrator::new(config);
        let calls = AtomicUsize::new(0);

        let sweep = Sweep::from_config(SweepKind::WindowSize, orchestrator.config());
        let err = orchestrator
            .run_sweep_with(&sweep, |_| {
                calls.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap_err();
        assert!(matches!(
            err,
            ExperimentError::Iteration {
                source: CycleError::Evaluation(EvaluationError::InsufficientData { .. }),
                ..
            }
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let (_dir, mut config) = setup(80);
        config.window_sweep.window_sizes = vec![1, 3, 5, 7];
        let sequential = ExperimentOrchestrator::new(config.clone())
            .run_window_sweep()
            .unwrap();

        config.policy.parallel = true;
        config.data.work_dir = config.data.work_dir.join("parallel");
        let parallel = ExperimentOrchestrator::new(config)
            .run_window_sweep()
            .unwrap();

        assert_eq!(sequential, parallel);
    }

    #[test]
    fn test_shared_bounds_match_per_iteration_fit() {
        let (_dir, mut config) = setup(80);
        config.window_sweep.window_sizes = vec![2, 4];
        let per_iteration = ExperimentOrchestrator::new(config.clone())
            .run_window_sweep()
            .unwrap();

        config.policy.bounds = BoundsPolicy::Shared;
        let shared = ExperimentOrchestrator::new(config)
            .run_window_sweep()
            .unwrap();

        assert_eq!(per_iteration.series(), shared.series());
    }

    #[test]
    fn test_degenerate_training_series() {
        let (dir, mut config) = setup(80);
        let flat = dir.path().join("flat.csv");
        fs::write(&flat, "0,5\n1,5\n2,5\n").unwrap();
        config.data.training_path = flat;
        config.window_sweep.window_sizes = vec![1];

        let err = ExperimentOrchestrator::new(config.clone())
            .run_window_sweep()
            .unwrap_err();
        assert!(matches!(
            err,
            ExperimentError::Iteration {
                source: CycleError::Normalization(NormalizationError::DegenerateRange { .. }),
                ..
            }
        ));

        config.policy.bounds = BoundsPolicy::Shared;
        let err = ExperimentOrchestrator::new(config.clone())
            .run_window_sweep()
            .unwrap_err();
        assert!(matches!(
            err,
            ExperimentError::SharedBounds {
                source: CycleError::Normalization(NormalizationError::DegenerateRange { .. }),
                ..
            }
        ));

        // fails once up front even when iterations may fail independently
        config.policy.on_error = ErrorPolicy::Continue;
        config.window_sweep.window_sizes = vec![1, 2, 3];
        let err = ExperimentOrchestrator::new(config)
            .run_window_sweep()
            .unwrap_err();
        assert!(matches!(err, ExperimentError::SharedBounds { .. }));
    }

    #[test]
    fn test_on_result_called_per_success() {
        let (_dir, mut config) = setup(80);
        config.window_sweep.window_sizes = vec![1, 2, 3];
        let orchestrator = ExperimentOrchestrator::new(config);
        let calls = AtomicUsize::new(0);

        let sweep = Sweep::from_config(SweepKind::WindowSize, orchestrator.config());
        orchestrator
            .run_sweep_with(&sweep, |_| {
                calls.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_invalid_sweeps_rejected() {
        let (_dir, config) = setup(80);
        let orchestrator = ExperimentOrchestrator::new(config);

        let empty = Sweep::window_sizes(&[], 0.5);
        assert!(matches!(
            orchestrator.run_sweep(&empty),
            Err(ExperimentError::InvalidSweep(_))
        ));

        let zero = Sweep::window_sizes(&[1, 0], 0.5);
        assert!(matches!(
            orchestrator.run_sweep(&zero),
            Err(ExperimentError::InvalidSweep(_))
        ));
    }
}
