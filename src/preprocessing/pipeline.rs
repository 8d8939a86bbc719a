//! Data preprocessing pipeline
//!
//! The fitted [`DataPreprocessor`] is the single source of truth for the
//! feature layout a classifier was trained on. Fit happens once; after that
//! the same state serves whole-table transforms during training and
//! single-row transforms at inference time.

use crate::error::{ChaosError, Result};
use super::{
    config::PreprocessingConfig,
    encoder::{series_to_strings, LabelEncoder, MISSING_TOKEN},
    imputer::{is_numeric_dtype, numeric_column, MeanImputer},
    scaler::StandardScaler,
};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::time::Instant;
use tracing::{debug, info};

/// Role of a feature column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnRole {
    /// Declared numeric: imputed then scaled
    Numeric,
    /// Declared categorical: label encoded
    Categorical,
    /// Undeclared numeric: imputed, not scaled
    Passthrough,
}

/// One preprocessed inference row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformedRow {
    /// Features in fit-time order
    pub features: Vec<f64>,
    /// False when a declared numeric column was absent and scaling was skipped
    pub scaling_applied: bool,
    /// Categorical columns whose value was not seen during fit
    pub unseen_categories: Vec<String>,
    /// Feature columns absent from the input row
    pub missing_columns: Vec<String>,
}

impl TransformedRow {
    /// Whether any fallback was taken for this row
    pub fn is_degraded(&self) -> bool {
        !self.scaling_applied || !self.unseen_categories.is_empty() || !self.missing_columns.is_empty()
    }
}

/// Main data preprocessing pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPreprocessor {
    config: PreprocessingConfig,
    target: Option<String>,
    /// Feature columns in fit order, with their role
    features: Vec<(String, ColumnRole)>,
    imputer: MeanImputer,
    encoders: BTreeMap<String, LabelEncoder>,
    scaler: StandardScaler,
    target_encoder: Option<LabelEncoder>,
    n_samples_fit: usize,
    fitted_at: Option<chrono::DateTime<chrono::Utc>>,
    is_fitted: bool,
}

impl DataPreprocessor {
    /// Create a new preprocessor with the default schema
    pub fn new() -> Self {
        Self::with_config(PreprocessingConfig::default())
    }

    /// Create a new preprocessor with a custom schema
    pub fn with_config(config: PreprocessingConfig) -> Self {
        Self {
            config,
            target: None,
            features: Vec::new(),
            imputer: MeanImputer::new(),
            encoders: BTreeMap::new(),
            scaler: StandardScaler::new(),
            target_encoder: None,
            n_samples_fit: 0,
            fitted_at: None,
            is_fitted: false,
        }
    }

    /// Fit imputer, encoders and scaler on a table.
    ///
    /// Every declared column must be present, and the target must not be one
    /// of them. Undeclared columns other than
    /// the target and ignored columns must be numeric and are passed
    /// through. Fitting an already fitted preprocessor is an error.
    pub fn fit(&mut self, df: &DataFrame, target: &str) -> Result<&mut Self> {
        if self.is_fitted {
            return Err(ChaosError::AlreadyFitted);
        }
        let start = Instant::now();

        let target_column = df
            .column(target)
            .map_err(|_| ChaosError::FeatureNotFound(target.to_string()))?;
        if self.config.is_declared(target) {
            return Err(ChaosError::ConfigError(format!(
                "target '{}' is also declared as a feature column",
                target
            )));
        }
        for name in self
            .config
            .numeric_columns
            .iter()
            .chain(self.config.categorical_columns.iter())
        {
            if df.column(name).is_err() {
                return Err(ChaosError::FeatureNotFound(name.clone()));
            }
        }

        let features = self.resolve_features(df, target)?;

        let imputed_columns: Vec<String> = features
            .iter()
            .filter(|(_, role)| *role != ColumnRole::Categorical)
            .map(|(name, _)| name.clone())
            .collect();
        let mut imputer = MeanImputer::new();
        imputer.fit(df, &imputed_columns)?;

        let mut encoders = BTreeMap::new();
        for name in &self.config.categorical_columns {
            let series = df.column(name)?.as_materialized_series();
            encoders.insert(name.clone(), LabelEncoder::fit_series(series)?);
        }

        let numeric = &self.config.numeric_columns;
        let imputed: Vec<Vec<f64>> = numeric
            .iter()
            .map(|name| imputer.impute(name, &numeric_column(df, name)?))
            .collect::<Result<_>>()?;
        let mut scaler = StandardScaler::new();
        scaler.fit(numeric, &imputed)?;

        let target_encoder = LabelEncoder::fit_series(target_column.as_materialized_series())?;
        if target_encoder.n_classes() < 2 {
            return Err(ChaosError::PreprocessingError(format!(
                "target '{}' needs at least two classes, found {}",
                target,
                target_encoder.n_classes()
            )));
        }

        self.target = Some(target.to_string());
        self.features = features;
        self.imputer = imputer;
        self.encoders = encoders;
        self.scaler = scaler;
        self.target_encoder = Some(target_encoder);
        self.n_samples_fit = df.height();
        self.fitted_at = Some(chrono::Utc::now());
        self.is_fitted = true;

        info!(
            rows = df.height(),
            features = self.features.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "preprocessor fitted"
        );
        Ok(self)
    }

    /// Fit and return the transformed feature table
    pub fn fit_transform(&mut self, df: &DataFrame, target: &str) -> Result<DataFrame> {
        self.fit(df, target)?;
        self.transform(df)
    }

    /// Transform a table into the fitted feature layout.
    ///
    /// The table must carry every feature column; the target is not required.
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        let columns = self.transform_columns(df)?;
        let columns: Vec<Column> = self
            .features
            .iter()
            .zip(columns)
            .map(|((name, _), values)| Column::new(name.as_str().into(), values))
            .collect();
        DataFrame::new(columns).map_err(|e| ChaosError::DataError(e.to_string()))
    }

    /// Transform a table straight into a feature matrix
    pub fn transform_to_array(&self, df: &DataFrame) -> Result<Array2<f64>> {
        let columns = self.transform_columns(df)?;
        let n_rows = df.height();
        Ok(Array2::from_shape_fn((n_rows, columns.len()), |(r, c)| columns[c][r]))
    }

    fn transform_columns(&self, df: &DataFrame) -> Result<Vec<Vec<f64>>> {
        self.ensure_fitted()?;

        self.features
            .iter()
            .map(|(name, role)| match role {
                ColumnRole::Categorical => {
                    let series = df
                        .column(name)
                        .map_err(|_| ChaosError::FeatureNotFound(name.clone()))?
                        .as_materialized_series();
                    let codes = self.encoder(name)?
                        .transform_series(series, self.config.unseen_category_code)?;
                    Ok(codes.into_iter().map(|c| c as f64).collect())
                }
                ColumnRole::Numeric => {
                    let index = self.scaler_index(name)?;
                    let filled = self.imputer.impute(name, &numeric_column(df, name)?)?;
                    Ok(self.scaler.scale_column(index, &filled))
                }
                ColumnRole::Passthrough => self.imputer.impute(name, &numeric_column(df, name)?),
            })
            .collect()
    }

    /// Encoded target labels of a table
    pub fn encode_target(&self, df: &DataFrame) -> Result<Array1<usize>> {
        self.ensure_fitted()?;
        let target = self.target.as_deref().ok_or(ChaosError::ModelNotFitted)?;
        let encoder = self.target_encoder.as_ref().ok_or(ChaosError::ModelNotFitted)?;

        let series = df
            .column(target)
            .map_err(|_| ChaosError::FeatureNotFound(target.to_string()))?
            .as_materialized_series();
        series_to_strings(series)?
            .iter()
            .map(|v| {
                encoder.encode(v).ok_or_else(|| {
                    ChaosError::PreprocessingError(format!("unknown target label '{}'", v))
                })
            })
            .collect()
    }

    /// Transform one inference row given as a key-value mapping.
    ///
    /// Never refits. Unseen or missing categorical values take the fallback
    /// code. When any declared numeric column is absent, scaling is skipped
    /// for the whole row: absent values take their fit-time mean and
    /// present values stay raw.
    pub fn transform_row(&self, row: &HashMap<String, Value>) -> Result<TransformedRow> {
        self.ensure_fitted()?;

        let scaling_applied = self
            .config
            .numeric_columns
            .iter()
            .all(|name| row.contains_key(name));

        let mut features = Vec::with_capacity(self.features.len());
        let mut unseen_categories = Vec::new();
        let mut missing_columns = Vec::new();

        for (name, role) in &self.features {
            let value = row.get(name);
            if value.is_none() {
                missing_columns.push(name.clone());
            }

            let feature = match role {
                ColumnRole::Categorical => match value {
                    // absent, not null: the fitted "nan" class does not apply
                    None => self.config.unseen_category_code as f64,
                    Some(v) => match self.encoder(name)?.encode(&value_to_token(v)) {
                        Some(code) => code as f64,
                        None => {
                            unseen_categories.push(name.clone());
                            self.config.unseen_category_code as f64
                        }
                    },
                },
                ColumnRole::Numeric | ColumnRole::Passthrough => {
                    let raw = value.map(|v| value_to_f64(name, v)).transpose()?.flatten();
                    let filled = match raw {
                        Some(x) if !x.is_nan() => x,
                        _ => self
                            .imputer
                            .fill_value(name)
                            .ok_or_else(|| ChaosError::FeatureNotFound(name.clone()))?,
                    };
                    if *role == ColumnRole::Numeric && scaling_applied {
                        self.scaler.scale_value(self.scaler_index(name)?, filled)
                    } else {
                        filled
                    }
                }
            };
            features.push(feature);
        }

        if !scaling_applied {
            debug!(missing = ?missing_columns, "numeric scaling skipped for row");
        }

        Ok(TransformedRow {
            features,
            scaling_applied,
            unseen_categories,
            missing_columns,
        })
    }

    /// Decode a class index back to the original target label
    pub fn decode_label(&self, code: usize) -> Option<&str> {
        self.target_encoder.as_ref().and_then(|e| e.decode(code))
    }

    /// Target class labels in code order
    pub fn target_classes(&self) -> &[String] {
        self.target_encoder.as_ref().map(|e| e.classes()).unwrap_or(&[])
    }

    /// Feature column names in fit order
    pub fn feature_names(&self) -> Vec<String> {
        self.features.iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn n_features(&self) -> usize {
        self.features.len()
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    pub fn numeric_columns(&self) -> &[String] {
        &self.config.numeric_columns
    }

    pub fn categorical_columns(&self) -> &[String] {
        &self.config.categorical_columns
    }

    /// Fitted mean for a numeric or passthrough column
    pub fn fill_value(&self, column: &str) -> Option<f64> {
        self.imputer.fill_value(column)
    }

    /// Fitted encoder for a categorical column
    pub fn encoder_for(&self, column: &str) -> Option<&LabelEncoder> {
        self.encoders.get(column)
    }

    pub fn n_samples_fit(&self) -> usize {
        self.n_samples_fit
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    /// Save the preprocessor to a JSON file
    pub fn save(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load a preprocessor from a JSON file
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let preprocessor: Self = serde_json::from_str(&json)?;
        Ok(preprocessor)
    }

    fn resolve_features(&self, df: &DataFrame, target: &str) -> Result<Vec<(String, ColumnRole)>> {
        let mut features = Vec::new();
        for column in df.get_columns() {
            let name = column.name().to_string();
            if name == target || self.config.ignored_columns.contains(&name) {
                continue;
            }

            let role = if self.config.categorical_columns.contains(&name) {
                ColumnRole::Categorical
            } else if self.config.numeric_columns.contains(&name) {
                ColumnRole::Numeric
            } else if is_numeric_dtype(column.dtype()) {
                ColumnRole::Passthrough
            } else {
                return Err(ChaosError::PreprocessingError(format!(
                    "column '{}' is neither declared nor numeric; declare or ignore it",
                    name
                )));
            };
            features.push((name, role));
        }

        if features.is_empty() {
            return Err(ChaosError::PreprocessingError("no feature columns".to_string()));
        }
        Ok(features)
    }

    fn ensure_fitted(&self) -> Result<()> {
        if self.is_fitted {
            Ok(())
        } else {
            Err(ChaosError::ModelNotFitted)
        }
    }

    fn encoder(&self, name: &str) -> Result<&LabelEncoder> {
        self.encoders
            .get(name)
            .ok_or_else(|| ChaosError::FeatureNotFound(name.to_string()))
    }

    fn scaler_index(&self, name: &str) -> Result<usize> {
        self.scaler
            .index_of(name)
            .ok_or_else(|| ChaosError::FeatureNotFound(name.to_string()))
    }
}

impl Default for DataPreprocessor {
    fn default() -> Self {
        Self::new()
    }
}

/// String form of a JSON value as seen by the categorical encoders
fn value_to_token(value: &Value) -> String {
    match value {
        Value::Null => MISSING_TOKEN.to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn value_to_f64(name: &str, value: &Value) -> Result<Option<f64>> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => Ok(n.as_f64()),
        Value::Bool(b) => Ok(Some(if *b { 1.0 } else { 0.0 })),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => s.trim().parse::<f64>().map(Some).map_err(|_| {
            ChaosError::PreprocessingError(format!("column '{}': '{}' is not numeric", name, s))
        }),
        other => Err(ChaosError::PreprocessingError(format!(
            "column '{}': unsupported value {}",
            name, other
        ))),
    }
}
