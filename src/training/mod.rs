//! Training module: configuration and the minibatch training loop.

pub mod trainer;

pub use trainer::{train_classifier, BatchStatus, TrainingHistory};

use serde::{Deserialize, Serialize};

use crate::utils::error::{PipelineError, Result};

/// Training hyperparameters, supplied once per training invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Batch size as a fraction of the whole dataset, in (0, 1]
    pub batch_size_fraction: f64,
    /// Hidden layer width of the classifier head
    pub dense_units: usize,
    /// Number of training epochs
    pub epochs: usize,
    /// Adam learning rate
    pub learning_rate: f64,
    /// Fraction of (already shuffled) rows withheld from gradient updates,
    /// in [0, 1)
    pub validation_split: f64,
    /// Random seed for the shuffling permutation and head initialization
    pub seed: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            batch_size_fraction: 0.4,
            dense_units: 100,
            epochs: 50,
            learning_rate: 0.0001,
            validation_split: 0.15,
            seed: 42,
        }
    }
}

impl TrainingConfig {
    /// Validate ranges that do not depend on the dataset size.
    pub fn validate(&self) -> Result<()> {
        if !(self.batch_size_fraction > 0.0 && self.batch_size_fraction <= 1.0) {
            return Err(PipelineError::Config(format!(
                "batch_size_fraction must be in (0, 1], got {}",
                self.batch_size_fraction
            )));
        }
        if !(0.0..1.0).contains(&self.validation_split) {
            return Err(PipelineError::Config(format!(
                "validation_split must be in [0, 1), got {}",
                self.validation_split
            )));
        }
        if self.dense_units == 0 {
            return Err(PipelineError::Config("dense_units must be positive".to_string()));
        }
        if self.epochs == 0 {
            return Err(PipelineError::Config("epochs must be positive".to_string()));
        }
        if !(self.learning_rate > 0.0) {
            return Err(PipelineError::Config(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        Ok(())
    }

    /// Compute the minibatch size for a dataset of `total_rows`.
    ///
    /// The batch size is parameterized as a fraction of the dataset so runs
    /// scale with however many examples were collected. Fails with a config
    /// error when `floor(total_rows * batch_size_fraction)` is zero.
    pub fn batch_size(&self, total_rows: usize) -> Result<usize> {
        let batch_size = (total_rows as f64 * self.batch_size_fraction).floor() as usize;
        if batch_size == 0 {
            return Err(PipelineError::Config(format!(
                "batch size is 0 for {} rows at fraction {}; choose a larger fraction",
                total_rows, self.batch_size_fraction
            )));
        }
        Ok(batch_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_size_floor() {
        let config = TrainingConfig {
            batch_size_fraction: 0.4,
            ..Default::default()
        };
        assert_eq!(config.batch_size(10).unwrap(), 4);
        assert_eq!(config.batch_size(11).unwrap(), 4);
    }

    #[test]
    fn test_degenerate_batch_size_fails() {
        let config = TrainingConfig {
            batch_size_fraction: 0.1,
            ..Default::default()
        };
        // floor(2 * 0.1) = 0
        let err = config.batch_size(2).unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }

    #[test]
    fn test_validate_ranges() {
        assert!(TrainingConfig::default().validate().is_ok());

        let bad_fraction = TrainingConfig {
            batch_size_fraction: 1.5,
            ..Default::default()
        };
        assert!(bad_fraction.validate().is_err());

        let bad_split = TrainingConfig {
            validation_split: 1.0,
            ..Default::default()
        };
        assert!(bad_split.validate().is_err());

        let bad_lr = TrainingConfig {
            learning_rate: 0.0,
            ..Default::default()
        };
        assert!(bad_lr.validate().is_err());
    }
}
