//! Preprocessing configuration

use serde::{Deserialize, Serialize};

/// Declared schema and fallback policy for the data preprocessor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessingConfig {
    /// Columns label-encoded to integer codes
    pub categorical_columns: Vec<String>,

    /// Columns mean-imputed and jointly standard-scaled
    pub numeric_columns: Vec<String>,

    /// Columns dropped before fitting
    pub ignored_columns: Vec<String>,

    /// Code emitted for a categorical value not seen during fit
    pub unseen_category_code: usize,
}

impl Default for PreprocessingConfig {
    fn default() -> Self {
        Self {
            categorical_columns: vec![
                "gender".to_string(),
                "smoker".to_string(),
                "physical_activity".to_string(),
            ],
            numeric_columns: vec![
                "age".to_string(),
                "bmi".to_string(),
                "blood_pressure".to_string(),
                "cholesterol".to_string(),
                "glucose".to_string(),
            ],
            ignored_columns: Vec::new(),
            unseen_category_code: 0,
        }
    }
}

impl PreprocessingConfig {
    /// Create a new configuration with the default health schema
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration with an explicit schema
    pub fn with_schema<S: Into<String>>(
        categorical: impl IntoIterator<Item = S>,
        numeric: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            categorical_columns: categorical.into_iter().map(Into::into).collect(),
            numeric_columns: numeric.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Builder method to drop columns before fitting
    pub fn with_ignored<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.ignored_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Whether a column takes part in the declared schema
    pub fn is_declared(&self, column: &str) -> bool {
        self.categorical_columns.iter().any(|c| c == column)
            || self.numeric_columns.iter().any(|c| c == column)
    }
}
