//! Risk prediction over loaded artifacts

use crate::architectures::TabNetClassifier;
use crate::error::{ChaosError, Result};
use crate::export::ArtifactPair;
use crate::training::TrainableClassifier;
use ndarray::Array2;
use polars::prelude::DataFrame;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

/// Class index treated as the positive (at-risk) outcome
pub const POSITIVE_CLASS: usize = 1;

/// Coarse risk band of a prediction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// High above 70, Medium above 40, Low otherwise
    pub fn from_score(score: f64) -> Self {
        if score > 70.0 {
            Self::High
        } else if score > 40.0 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        };
        f.write_str(s)
    }
}

/// One prediction with its degradation flags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskPrediction {
    /// Predicted target label
    pub label: String,
    pub class_index: usize,
    /// Per-class probabilities in class-code order
    pub probabilities: Vec<f64>,
    /// Positive-class probability scaled to 0..=100
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    /// False when numeric scaling was skipped for this row
    pub scaling_applied: bool,
    /// Categorical columns whose value was not seen during fit
    pub unseen_categories: Vec<String>,
    /// Feature columns absent from the input row
    pub missing_columns: Vec<String>,
}

/// Counters since the service was loaded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferenceStats {
    pub total_predictions: u64,
    pub degraded_predictions: u64,
}

/// Serves predictions from one model/preprocessor pair loaded at startup
pub struct InferenceService<C = TabNetClassifier> {
    artifacts: ArtifactPair<C>,
    total_predictions: AtomicU64,
    degraded_predictions: AtomicU64,
}

impl<C> fmt::Debug for InferenceService<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InferenceService")
            .field("target", &self.artifacts.model.target)
            .field("n_features", &self.artifacts.model.feature_names.len())
            .field("total_predictions", &self.total_predictions.load(Ordering::Relaxed))
            .finish()
    }
}

impl<C> InferenceService<C>
where
    C: TrainableClassifier + Serialize + DeserializeOwned,
{
    /// Load the artifacts written for `target` under `dir`
    pub fn load(dir: impl AsRef<Path>, target: &str) -> Result<Self> {
        let artifacts = ArtifactPair::load(dir.as_ref(), target)?;
        info!(
            target,
            features = artifacts.model.feature_names.len(),
            valid_accuracy = artifacts.model.valid_accuracy,
            "inference service loaded"
        );
        Ok(Self::from_artifacts(artifacts))
    }

    pub fn from_artifacts(artifacts: ArtifactPair<C>) -> Self {
        Self {
            artifacts,
            total_predictions: AtomicU64::new(0),
            degraded_predictions: AtomicU64::new(0),
        }
    }

    pub fn artifacts(&self) -> &ArtifactPair<C> {
        &self.artifacts
    }

    pub fn target(&self) -> &str {
        self.artifacts.target()
    }

    pub fn feature_names(&self) -> &[String] {
        &self.artifacts.model.feature_names
    }

    /// Predict one key-value row
    pub fn predict(&self, row: &HashMap<String, Value>) -> Result<RiskPrediction> {
        let transformed = self.artifacts.preprocessor.transform_row(row)?;
        let degraded = transformed.is_degraded();
        let n = transformed.features.len();
        let x = Array2::from_shape_vec((1, n), transformed.features)?;
        let probabilities = self.artifacts.model.classifier.predict_proba(&x)?;

        let mut prediction = self.to_prediction(probabilities.row(0).to_vec())?;
        prediction.scaling_applied = transformed.scaling_applied;
        prediction.unseen_categories = transformed.unseen_categories;
        prediction.missing_columns = transformed.missing_columns;

        self.total_predictions.fetch_add(1, Ordering::Relaxed);
        if degraded {
            self.degraded_predictions.fetch_add(1, Ordering::Relaxed);
        }
        debug!(risk_score = prediction.risk_score, level = %prediction.risk_level, "prediction");
        Ok(prediction)
    }

    /// Predict every row of a table holding all feature columns
    pub fn predict_batch(&self, df: &DataFrame) -> Result<Vec<RiskPrediction>> {
        let x = self.artifacts.preprocessor.transform_to_array(df)?;
        let probabilities = self.artifacts.model.classifier.predict_proba(&x)?;
        let predictions = probabilities
            .rows()
            .into_iter()
            .map(|row| self.to_prediction(row.to_vec()))
            .collect::<Result<Vec<_>>>()?;
        self.total_predictions
            .fetch_add(predictions.len() as u64, Ordering::Relaxed);
        Ok(predictions)
    }

    pub fn stats(&self) -> InferenceStats {
        InferenceStats {
            total_predictions: self.total_predictions.load(Ordering::Relaxed),
            degraded_predictions: self.degraded_predictions.load(Ordering::Relaxed),
        }
    }

    fn to_prediction(&self, probabilities: Vec<f64>) -> Result<RiskPrediction> {
        let class_index = probabilities
            .iter()
            .enumerate()
            .fold((0, f64::NEG_INFINITY), |(bi, bv), (i, &v)| if v > bv { (i, v) } else { (bi, bv) })
            .0;
        let label = self
            .artifacts
            .preprocessor
            .decode_label(class_index)
            .ok_or_else(|| {
                ChaosError::InferenceError(format!("no label for class index {}", class_index))
            })?
            .to_string();
        let risk_score = probabilities.get(POSITIVE_CLASS).copied().unwrap_or(0.0) * 100.0;

        Ok(RiskPrediction {
            label,
            class_index,
            risk_level: RiskLevel::from_score(risk_score),
            risk_score,
            probabilities,
            scaling_applied: true,
            unseen_categories: Vec::new(),
            missing_columns: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_levels() {
        assert_eq!(RiskLevel::from_score(70.1), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(70.0), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(40.5), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(40.0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(0.0), RiskLevel::Low);
        assert_eq!(RiskLevel::High.to_string(), "High");
    }
}
