//! Classifier traits and evaluation metrics

use crate::architectures::{TabNetClassifier, TabNetConfig};
use crate::error::{ChaosError, Result};
use crate::optimizer::HyperparameterConfig;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Summary of one classifier fit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitReport {
    /// Epochs actually run before the budget or patience ran out
    pub epochs_run: usize,
    /// Epoch whose weights were kept
    pub best_epoch: usize,
    /// Validation accuracy of the kept weights
    pub best_valid_accuracy: f64,
    /// Mean training loss of the last epoch
    pub final_train_loss: f64,
    /// Training time in seconds
    pub training_time_secs: f64,
}

/// Classifier trained against an explicit validation set
pub trait TrainableClassifier {
    /// Train the classifier, using the validation set for early stopping
    fn fit(
        &mut self,
        x_train: &Array2<f64>,
        y_train: &Array1<usize>,
        x_valid: &Array2<f64>,
        y_valid: &Array1<usize>,
    ) -> Result<FitReport>;

    /// Predict class indices
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<usize>>;

    /// Predict per-class probabilities, one row per sample
    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>>;

    /// Get feature importances (if available)
    fn feature_importances(&self) -> Option<Array1<f64>> {
        None
    }
}

/// Builds a fresh, untrained classifier for a candidate configuration
pub trait ClassifierFactory {
    type Classifier: TrainableClassifier;

    fn build(&self, params: &HyperparameterConfig) -> Result<Self::Classifier>;
}

impl<C, F> ClassifierFactory for F
where
    C: TrainableClassifier,
    F: Fn(&HyperparameterConfig) -> Result<C>,
{
    type Classifier = C;

    fn build(&self, params: &HyperparameterConfig) -> Result<C> {
        self(params)
    }
}

/// Builds TabNet classifiers sharing one training budget
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TabNetFactory {
    budget: TabNetConfig,
}

impl TabNetFactory {
    pub fn new(budget: TabNetConfig) -> Self {
        Self { budget }
    }

    pub fn budget(&self) -> &TabNetConfig {
        &self.budget
    }
}

impl ClassifierFactory for TabNetFactory {
    type Classifier = TabNetClassifier;

    fn build(&self, params: &HyperparameterConfig) -> Result<TabNetClassifier> {
        Ok(TabNetClassifier::new(self.budget.with_hyperparameters(params)))
    }
}

/// Fraction of predictions equal to the true labels
pub fn accuracy_score(y_true: &Array1<usize>, y_pred: &Array1<usize>) -> Result<f64> {
    if y_true.len() != y_pred.len() {
        return Err(ChaosError::ShapeError {
            expected: format!("{} predictions", y_true.len()),
            actual: format!("{} predictions", y_pred.len()),
        });
    }
    if y_true.is_empty() {
        return Err(ChaosError::DataError(
            "cannot score an empty label set".to_string(),
        ));
    }
    let correct = y_true
        .iter()
        .zip(y_pred.iter())
        .filter(|(t, p)| t == p)
        .count();
    Ok(correct as f64 / y_true.len() as f64)
}
