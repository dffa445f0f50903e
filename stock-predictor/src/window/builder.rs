//! Sliding-window sample construction.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WindowError {
    #[error("window size must be at least 1")]
    ZeroWindow,
}

/// W consecutive normalized values and the value that follows them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlidingWindowSample {
    pub features: Vec<f64>,
    pub target: f64,
}

/// Samples sharing one window size, in series order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingDataset {
    pub window_size: usize,
    pub samples: Vec<SlidingWindowSample>,
}

impl TrainingDataset {
    pub fn empty(window_size: usize) -> Self {
        Self {
            window_size,
            samples: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Slides a window of `window_size + 1` values across a series with stride 1.
#[derive(Debug, Clone, Copy)]
pub struct SlidingWindowBuilder {
    window_size: usize,
}

impl SlidingWindowBuilder {
    pub fn new(window_size: usize) -> Result<Self, WindowError> {
        if window_size == 0 {
            return Err(WindowError::ZeroWindow);
        }
        Ok(Self { window_size })
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Number of samples a series of `len` values yields: `max(0, len - W)`.
    pub fn sample_count(&self, len: usize) -> usize {
        len.saturating_sub(self.window_size)
    }

    /// Build the dataset. Series shorter than `W + 1` give an empty dataset.
    pub fn build(&self, normalized: &[f64]) -> TrainingDataset {
        let samples = normalized
            .windows(self.window_size + 1)
            .map(|w| SlidingWindowSample {
                features: w[..self.window_size].to_vec(),
                target: w[self.window_size],
            })
            .collect();

        TrainingDataset {
            window_size: self.window_size,
            samples,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_window_rejected() {
        assert_eq!(SlidingWindowBuilder::new(0).unwrap_err(), WindowError::ZeroWindow);
    }

    #[test]
    fn test_worked_example() {
        let builder = SlidingWindowBuilder::new(2).unwrap();
        let dataset = builder.build(&[0.1, 0.5, 0.3, 0.7, 0.9]);

        assert_eq!(dataset.window_size, 2);
        assert_eq!(dataset.len(), 3);
        assert_eq!(dataset.samples[0].features, vec![0.1, 0.5]);
        assert_eq!(dataset.samples[0].target, 0.3);
        assert_eq!(dataset.samples[1].features, vec![0.5, 0.3]);
        assert_eq!(dataset.samples[1].target, 0.7);
        assert_eq!(dataset.samples[2].features, vec![0.3, 0.7]);
        assert_eq!(dataset.samples[2].target, 0.9);
    }

    #[test]
    fn test_sample_count_matches_len_minus_window() {
        let series: Vec<f64> = (0..25).map(|i| i as f64 / 25.0).collect();
        for w in 1..=30 {
            let builder = SlidingWindowBuilder::new(w).unwrap();
            for len in 0..=series.len() {
                let dataset = builder.build(&series[..len]);
                assert_eq!(dataset.len(), len.saturating_sub(w));
                assert_eq!(dataset.len(), builder.sample_count(len));
                assert!(dataset.samples.iter().all(|s| s.features.len() == w));
            }
        }
    }

    #[test]
    fn test_short_series_gives_empty_dataset() {
        let builder = SlidingWindowBuilder::new(5).unwrap();
        assert!(builder.build(&[0.1, 0.2, 0.3, 0.4, 0.5]).is_empty());
        assert!(builder.build(&[]).is_empty());
        assert_eq!(builder.build(&[0.1, 0.2, 0.3, 0.4, 0.5, 0.6]).len(), 1);
    }

    #[test]
    fn test_targets_follow_features() {
        let series: Vec<f64> = (0..12).map(|i| 0.1 + i as f64 * 0.05).collect();
        let dataset = SlidingWindowBuilder::new(3).unwrap().build(&series);
        for (i, sample) in dataset.samples.iter().enumerate() {
            assert_eq!(sample.features, series[i..i + 3].to_vec());
            assert_eq!(sample.target, series[i + 3]);
        }
    }

    #[test]
    fn test_build_is_deterministic() {
        let series = [0.1, 0.9, 0.4, 0.6, 0.2, 0.8, 0.3];
        let builder = SlidingWindowBuilder::new(3).unwrap();
        assert_eq!(builder.build(&series), builder.build(&series));
    }
}
