//! Training configuration

use crate::architectures::TabNetConfig;
use crate::error::{ChaosError, Result};
use crate::optimizer::ChaosOptimizerConfig;
use crate::preprocessing::PreprocessingConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for one training pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Input table; a synthetic table is generated when absent
    pub data_path: Option<PathBuf>,

    /// Target column name
    pub target_column: String,

    /// Directory receiving the model and preprocessor artifacts
    pub output_dir: PathBuf,

    /// Fraction of rows held out for validation
    pub validation_split: f64,

    /// Seed for the train/validation shuffle
    pub split_seed: u64,

    /// Rows generated when no data path is given
    pub synthetic_rows: usize,

    /// Seed of the synthetic generator
    pub synthetic_seed: u64,

    pub optimizer: ChaosOptimizerConfig,

    pub preprocessing: PreprocessingConfig,

    /// Training budget shared by every candidate and the final model
    pub classifier: TabNetConfig,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            data_path: None,
            target_column: "has_heart_disease".to_string(),
            output_dir: PathBuf::from("models"),
            validation_split: 0.3,
            split_seed: 42,
            synthetic_rows: 1000,
            synthetic_seed: 42,
            optimizer: ChaosOptimizerConfig::default().with_n_iterations(10),
            preprocessing: PreprocessingConfig::default(),
            classifier: TabNetConfig::default(),
        }
    }
}

impl TrainingConfig {
    /// Create a new training config for a target
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target_column: target.into(),
            ..Self::default()
        }
    }

    /// Load from a JSON file; missing fields take their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_data_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_path = Some(path.into());
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_n_iterations(mut self, n: usize) -> Self {
        self.optimizer.n_iterations = n;
        self
    }

    pub fn with_chaos_seed(mut self, x0: f64) -> Self {
        self.optimizer.seed = Some(x0);
        self
    }

    pub fn with_synthetic_rows(mut self, n: usize) -> Self {
        self.synthetic_rows = n;
        self
    }

    pub fn with_preprocessing(mut self, config: PreprocessingConfig) -> Self {
        self.preprocessing = config;
        self
    }

    pub fn with_classifier(mut self, config: TabNetConfig) -> Self {
        self.classifier = config;
        self
    }

    /// Reject settings that would make the run meaningless
    pub fn validate(&self) -> Result<()> {
        if self.target_column.is_empty() {
            return Err(ChaosError::ConfigError("target column is empty".to_string()));
        }
        if !(self.validation_split > 0.0 && self.validation_split < 1.0) {
            return Err(ChaosError::InvalidParameter {
                name: "validation_split".to_string(),
                value: self.validation_split.to_string(),
                reason: "must lie strictly between 0 and 1".to_string(),
            });
        }
        if self.data_path.is_none() && self.synthetic_rows < 2 {
            return Err(ChaosError::InvalidParameter {
                name: "synthetic_rows".to_string(),
                value: self.synthetic_rows.to_string(),
                reason: "need at least 2 rows".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = TrainingConfig::default();
        assert_eq!(config.validation_split, 0.3);
        assert_eq!(config.split_seed, 42);
        assert_eq!(config.synthetic_rows, 1000);
        assert_eq!(config.optimizer.n_iterations, 10);
        assert_eq!(config.classifier.max_epochs, 50);
        assert_eq!(config.classifier.patience, 20);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"target_column": "diabetes", "optimizer": {{"n_iterations": 3}}}}"#
        )
        .unwrap();

        let config = TrainingConfig::from_file(file.path()).unwrap();
        assert_eq!(config.target_column, "diabetes");
        assert_eq!(config.optimizer.n_iterations, 3);
        assert_eq!(config.split_seed, 42);
    }

    #[test]
    fn test_invalid_split_rejected() {
        let mut config = TrainingConfig::new("y");
        config.validation_split = 1.0;
        assert!(matches!(
            config.validate(),
            Err(ChaosError::InvalidParameter { .. })
        ));
    }
}
