//! Label encoding for categorical columns

use crate::error::{ChaosError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Token used for missing categorical values, matching their string form
pub const MISSING_TOKEN: &str = "nan";

/// Maps the distinct string values of one column to `0..k` in sorted order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    /// Fit on an iterator of string values
    pub fn fit<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut classes: Vec<String> = values.into_iter().map(Into::into).collect();
        classes.sort();
        classes.dedup();
        Self { classes }
    }

    /// Fit on a column of any dtype, using its string representation
    pub fn fit_series(series: &Series) -> Result<Self> {
        Ok(Self::fit(series_to_strings(series)?))
    }

    /// Code for a value, `None` if it was not seen during fit
    pub fn encode(&self, value: &str) -> Option<usize> {
        self.classes.binary_search_by(|c| c.as_str().cmp(value)).ok()
    }

    /// Value for a code
    pub fn decode(&self, code: usize) -> Option<&str> {
        self.classes.get(code).map(|s| s.as_str())
    }

    /// Encode a whole column; unseen values map to `fallback`
    pub fn transform_series(&self, series: &Series, fallback: usize) -> Result<Vec<usize>> {
        Ok(series_to_strings(series)?
            .iter()
            .map(|v| self.encode(v).unwrap_or(fallback))
            .collect())
    }

    /// Fitted classes in code order
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }
}

/// String form of every value in a column; nulls become [`MISSING_TOKEN`].
pub fn series_to_strings(series: &Series) -> Result<Vec<String>> {
    let casted = series
        .cast(&DataType::String)
        .map_err(|e| ChaosError::DataError(e.to_string()))?;
    let ca = casted
        .str()
        .map_err(|e| ChaosError::DataError(e.to_string()))?;

    Ok(ca
        .into_iter()
        .map(|v| v.unwrap_or(MISSING_TOKEN).to_string())
        .collect())
}
