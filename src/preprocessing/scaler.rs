//! Joint standard scaling of numeric columns

use crate::error::{ChaosError, Result};
use serde::{Deserialize, Serialize};

/// Parameters for one scaled column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ScalerParams {
    center: f64, // mean
    scale: f64,  // population standard deviation
}

/// Zero-mean, unit-variance scaler fitted jointly over a fixed column set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    columns: Vec<String>,
    params: Vec<ScalerParams>,
    is_fitted: bool,
}

impl StandardScaler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fit on already-imputed columns, given in `columns` order
    pub fn fit(&mut self, columns: &[String], values: &[Vec<f64>]) -> Result<&mut Self> {
        if columns.len() != values.len() {
            return Err(ChaosError::ShapeError {
                expected: format!("{} columns", columns.len()),
                actual: format!("{} columns", values.len()),
            });
        }

        self.params = values.iter().map(|v| Self::compute_params(v)).collect();
        self.columns = columns.to_vec();
        self.is_fitted = true;
        Ok(self)
    }

    fn compute_params(values: &[f64]) -> ScalerParams {
        if values.is_empty() {
            return ScalerParams { center: 0.0, scale: 1.0 };
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let std = var.sqrt();
        ScalerParams {
            center: mean,
            scale: if std == 0.0 { 1.0 } else { std },
        }
    }

    /// Scale a single value of the column at `index`
    #[inline]
    pub fn scale_value(&self, index: usize, value: f64) -> f64 {
        let p = &self.params[index];
        (value - p.center) / p.scale
    }

    /// Scale every value of the column at `index`
    pub fn scale_column(&self, index: usize, values: &[f64]) -> Vec<f64> {
        values.iter().map(|&v| self.scale_value(index, v)).collect()
    }

    /// Position of a column in the fitted set
    pub fn index_of(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }
}
