//! Mean imputation for numeric columns

use crate::error::{ChaosError, Result};
use polars::prelude::*;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-column fill values computed once at fit time
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeanImputer {
    fill_values: BTreeMap<String, f64>,
}

impl MeanImputer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute the mean of every listed column, ignoring nulls and NaN.
    pub fn fit(&mut self, df: &DataFrame, columns: &[String]) -> Result<&mut Self> {
        let values: Vec<Vec<Option<f64>>> = columns
            .iter()
            .map(|name| numeric_column(df, name))
            .collect::<Result<_>>()?;

        let means: Vec<(String, f64)> = columns
            .par_iter()
            .zip(values.par_iter())
            .map(|(name, column)| {
                let (sum, count) = column
                    .iter()
                    .flatten()
                    .filter(|v| !v.is_nan())
                    .fold((0.0f64, 0usize), |(s, c), v| (s + v, c + 1));
                if count == 0 {
                    return Err(ChaosError::PreprocessingError(format!(
                        "column '{}' has no values to compute a mean from",
                        name
                    )));
                }
                Ok((name.clone(), sum / count as f64))
            })
            .collect::<Result<_>>()?;

        self.fill_values = means.into_iter().collect();
        Ok(self)
    }

    /// Fill value for a column
    pub fn fill_value(&self, column: &str) -> Option<f64> {
        self.fill_values.get(column).copied()
    }

    /// Replace missing entries with the column's fill value
    pub fn impute(&self, column: &str, values: &[Option<f64>]) -> Result<Vec<f64>> {
        let fill = self
            .fill_value(column)
            .ok_or_else(|| ChaosError::FeatureNotFound(column.to_string()))?;
        Ok(values
            .iter()
            .map(|v| match v {
                Some(x) if !x.is_nan() => *x,
                _ => fill,
            })
            .collect())
    }

    pub fn fill_values(&self) -> &BTreeMap<String, f64> {
        &self.fill_values
    }
}

/// Read a column as optional f64 values, casting integer types.
pub fn numeric_column(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let column = df
        .column(name)
        .map_err(|_| ChaosError::FeatureNotFound(name.to_string()))?;
    let series = column.as_materialized_series();

    if !is_numeric_dtype(series.dtype()) {
        return Err(ChaosError::PreprocessingError(format!(
            "column '{}' is not numeric (dtype {})",
            name,
            series.dtype()
        )));
    }

    let casted = series
        .cast(&DataType::Float64)
        .map_err(|e| ChaosError::DataError(e.to_string()))?;
    let ca = casted
        .f64()
        .map_err(|e| ChaosError::DataError(e.to_string()))?;
    Ok(ca.into_iter().collect())
}

pub(crate) fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
            | DataType::Boolean
    )
}
