//! Normalization bounds and the forward/inverse scaling.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lower edge of the normalized band.
pub const TARGET_MIN: f64 = 0.1;
/// Upper edge of the normalized band.
pub const TARGET_MAX: f64 = 0.9;

const TARGET_SPAN: f64 = TARGET_MAX - TARGET_MIN;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum NormalizationError {
    #[error("cannot fit normalization bounds on an empty series")]
    EmptySeries,

    #[error("degenerate range: every value equals {value}, normalization is undefined")]
    DegenerateRange { value: f64 },

    #[error("non-finite value {value} at position {index}")]
    NonFinite { index: usize, value: f64 },
}

/// Observed minimum and maximum of a raw series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizationBounds {
    pub min: f64,
    pub max: f64,
}

impl NormalizationBounds {
    /// Scan `values` once and record the smallest and largest entry.
    /// NaN and infinities are rejected.
    pub fn fit(values: &[f64]) -> Result<Self, NormalizationError> {
        if values.is_empty() {
            return Err(NormalizationError::EmptySeries);
        }

        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for (index, &v) in values.iter().enumerate() {
            if !v.is_finite() {
                return Err(NormalizationError::NonFinite { index, value: v });
            }
            if v > max {
                max = v;
            }
            if v < min {
                min = v;
            }
        }

        Ok(Self { min, max })
    }

    /// Width of the observed range.
    pub fn range(&self) -> f64 {
        self.max - self.min
    }

    /// True when every fitted value was identical.
    pub fn is_degenerate(&self) -> bool {
        self.max == self.min
    }

    /// `(x - min) / (max - min) * 0.8 + 0.1`
    ///
    /// Values outside the fitted range map outside `[0.1, 0.9]`; no clamping.
    pub fn normalize(&self, x: f64) -> Result<f64, NormalizationError> {
        if self.is_degenerate() {
            return Err(NormalizationError::DegenerateRange { value: self.min });
        }
        if !x.is_finite() {
            return Err(NormalizationError::NonFinite { index: 0, value: x });
        }
        Ok((x - self.min) / self.range() * TARGET_SPAN + TARGET_MIN)
    }

    /// Normalize every value in order.
    pub fn normalize_all(&self, values: &[f64]) -> Result<Vec<f64>, NormalizationError> {
        values
            .iter()
            .enumerate()
            .map(|(index, &x)| {
                self.normalize(x).map_err(|e| match e {
                    NormalizationError::NonFinite { value, .. } => {
                        NormalizationError::NonFinite { index, value }
                    }
                    other => other,
                })
            })
            .collect()
    }

    /// `min + (y - 0.1) * (max - min) / 0.8`, the exact inverse of `normalize`.
    pub fn denormalize(&self, y: f64) -> f64 {
        self.min + (y - TARGET_MIN) * self.range() / TARGET_SPAN
    }
}
