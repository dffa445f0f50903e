pub mod config;
pub mod data;
pub mod evaluation;
pub mod experiment;
pub mod network;
pub mod normalize;
pub mod report;
pub mod training;
pub mod validation;
pub mod window;

// Re-export commonly used types
pub use config::{BoundsPolicy, DivergencePolicy, ErrorPolicy, ExperimentConfig};
pub use data::{RawSeries, SeriesLoader};
pub use evaluation::{Evaluation, EvaluationEngine};
pub use experiment::{ExperimentOrchestrator, ExperimentResult, Sweep, SweepKind, SweepReport};
pub use network::{ModelArtifact, MultiLayerPerceptron};
pub use normalize::NormalizationBounds;
pub use training::{TrainingEngine, TrainingOutcome, TrainingParams, TrainingProgress};
pub use validation::SeriesIntegrity;
pub use window::{SlidingWindowBuilder, SlidingWindowSample, TrainingDataset};
