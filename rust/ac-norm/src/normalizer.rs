//! Raw <-> model-space transform for one signal.
//!
//! Both directions share the same `epsilon`, so `denormalize(normalize(x))` is the exact
//! algebraic inverse; only floating-point rounding separates it from `x`. Non-finite input
//! propagates to the output unchanged in kind.

use ac_core::{NormalizationConfig, NormalizationMode, NormalizedAction, RawAction};
use thiserror::Error;

use crate::stats::StatisticsModel;

/// Default numerical stabilizer added to the spread.
pub const DEFAULT_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum NormalizeError {
    #[error("invalid vector length for signal '{signal}': got {actual}, expected {expected}")]
    DimensionMismatch {
        signal: String,
        expected: usize,
        actual: usize,
    },
    /// The divisor of component `index` (std + epsilon, or q99 - q01 + epsilon) is not > 0.
    #[error("signal '{signal}' has non-positive spread {spread:e} at index {index}")]
    NonPositiveSpread {
        signal: String,
        index: usize,
        spread: f64,
    },
}

/// Stateless transform built from one [`StatisticsModel`].
#[derive(Debug, Clone)]
pub struct Normalizer {
    stats: StatisticsModel,
    epsilon: f64,
    mode: NormalizationMode,
}

impl Normalizer {
    /// Z-score normalizer with the default epsilon.
    pub fn new(stats: StatisticsModel) -> Self {
        Self {
            stats,
            epsilon: DEFAULT_EPSILON,
            mode: NormalizationMode::ZScore,
        }
    }

    /// Builds and checks that every component has a positive spread.
    pub fn from_config(
        stats: StatisticsModel,
        cfg: &NormalizationConfig,
    ) -> Result<Self, NormalizeError> {
        let n = Self::new(stats).with_epsilon(cfg.epsilon).with_mode(cfg.mode);
        n.check_spread()?;
        Ok(n)
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn with_mode(mut self, mode: NormalizationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn stats(&self) -> &StatisticsModel {
        &self.stats
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn mode(&self) -> NormalizationMode {
        self.mode
    }

    fn check_len(&self, actual: usize) -> Result<(), NormalizeError> {
        let expected = self.stats.dimension_count();
        if actual != expected {
            return Err(NormalizeError::DimensionMismatch {
                signal: self.stats.name().to_string(),
                expected,
                actual,
            });
        }
        Ok(())
    }

    fn spread(&self, i: usize) -> f64 {
        let s = &self.stats;
        match self.mode {
            NormalizationMode::ZScore => s.std()[i] + self.epsilon,
            NormalizationMode::Quantile => s.q99()[i] - s.q01()[i] + self.epsilon,
        }
    }

    /// Fails when a tolerated negative std (or a non-positive epsilon) leaves a
    /// component whose divisor is not strictly positive.
    pub fn check_spread(&self) -> Result<(), NormalizeError> {
        for index in 0..self.stats.dimension_count() {
            let spread = self.spread(index);
            if !(spread > 0.0) {
                return Err(NormalizeError::NonPositiveSpread {
                    signal: self.stats.name().to_string(),
                    index,
                    spread,
                });
            }
        }
        Ok(())
    }

    /// Raw values -> model space.
    pub fn normalize_values(&self, raw: &[f64]) -> Result<Vec<f64>, NormalizeError> {
        self.check_len(raw.len())?;
        self.check_spread()?;
        let s = &self.stats;
        let eps = self.epsilon;
        let out = match self.mode {
            NormalizationMode::ZScore => raw
                .iter()
                .zip(s.mean().iter().zip(s.std()))
                .map(|(&x, (&m, &sd))| (x - m) / (sd + eps))
                .collect(),
            NormalizationMode::Quantile => raw
                .iter()
                .zip(s.q01().iter().zip(s.q99()))
                .map(|(&x, (&lo, &hi))| (x - lo) / (hi - lo + eps) * 2.0 - 1.0)
                .collect(),
        };
        Ok(out)
    }

    /// Model space -> raw values.
    pub fn denormalize_values(&self, normalized: &[f64]) -> Result<Vec<f64>, NormalizeError> {
        self.check_len(normalized.len())?;
        self.check_spread()?;
        let s = &self.stats;
        let eps = self.epsilon;
        let out = match self.mode {
            NormalizationMode::ZScore => normalized
                .iter()
                .zip(s.mean().iter().zip(s.std()))
                .map(|(&y, (&m, &sd))| y * (sd + eps) + m)
                .collect(),
            NormalizationMode::Quantile => normalized
                .iter()
                .zip(s.q01().iter().zip(s.q99()))
                .map(|(&y, (&lo, &hi))| (y + 1.0) / 2.0 * (hi - lo + eps) + lo)
                .collect(),
        };
        Ok(out)
    }

    pub fn normalize(&self, raw: &RawAction) -> Result<NormalizedAction, NormalizeError> {
        self.normalize_values(raw.as_slice())
            .map(NormalizedAction::new)
    }

    pub fn denormalize(&self, normalized: &NormalizedAction) -> Result<RawAction, NormalizeError> {
        self.denormalize_values(normalized.as_slice())
            .map(RawAction::new)
    }
}
