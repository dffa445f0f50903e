//! Supervised samples from a normalized series.

pub mod builder;

pub use builder::{SlidingWindowBuilder, SlidingWindowSample, TrainingDataset, WindowError};
