//! End-to-end training pipeline
//!
//! Load or synthesize a table, fit the preprocessor, split, run the chaos
//! search with one fresh classifier per candidate, retrain the winner and
//! persist the model/preprocessor pair.

use super::{
    accuracy_score, train_test_split, ClassifierFactory, DataSplit, FitReport, TabNetFactory,
    TrainableClassifier, TrainingConfig,
};
use crate::error::Result;
use crate::export::{ArtifactPair, ModelArtifact, SavedArtifacts, ARTIFACT_FORMAT_VERSION};
use crate::optimizer::{ChaosOptimizer, HyperparameterConfig, OptimizationOutcome};
use crate::preprocessing::DataPreprocessor;
use crate::synthetic::generate_health_dataset;
use crate::utils::DataLoader;
use chrono::Utc;
use polars::prelude::DataFrame;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{info, warn};

/// Summary of a completed training run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingReport {
    pub target: String,
    pub n_rows: usize,
    pub n_features: usize,
    pub n_train: usize,
    pub n_valid: usize,
    /// Full search history and incumbent
    pub search: OptimizationOutcome,
    /// Configuration used for the final classifier
    pub best_config: HyperparameterConfig,
    /// Validation accuracy of the final classifier
    pub final_valid_accuracy: f64,
    pub final_fit: FitReport,
    pub artifacts: SavedArtifacts,
    pub total_duration_secs: f64,
}

/// Orchestrates preprocessing, search, retraining and persistence
#[derive(Debug, Clone)]
pub struct TrainingPipeline<F = TabNetFactory> {
    config: TrainingConfig,
    factory: F,
}

impl TrainingPipeline<TabNetFactory> {
    /// Pipeline training TabNet classifiers with the configured budget
    pub fn new(config: TrainingConfig) -> Self {
        let factory = TabNetFactory::new(config.classifier.clone());
        Self { config, factory }
    }
}

impl<F> TrainingPipeline<F>
where
    F: ClassifierFactory,
    F::Classifier: Serialize + DeserializeOwned,
{
    pub fn with_factory(config: TrainingConfig, factory: F) -> Self {
        Self { config, factory }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Read the configured table, or generate the synthetic one
    pub fn load_data(&self) -> Result<DataFrame> {
        match &self.config.data_path {
            Some(path) => {
                info!(path = %path.display(), "loading training data");
                DataLoader::new().load_auto(path)
            }
            None => {
                info!(
                    rows = self.config.synthetic_rows,
                    seed = self.config.synthetic_seed,
                    "no data path given, generating synthetic records"
                );
                generate_health_dataset(self.config.synthetic_rows, self.config.synthetic_seed)
            }
        }
    }

    /// Run the whole pipeline on the configured data source
    pub fn run(&self) -> Result<TrainingReport> {
        let df = self.load_data()?;
        self.run_on(&df)
    }

    /// Run the whole pipeline on an in-memory table.
    ///
    /// Nothing is written unless the search finds a viable configuration and
    /// the final classifier trains successfully.
    pub fn run_on(&self, df: &DataFrame) -> Result<TrainingReport> {
        let start = Instant::now();
        self.config.validate()?;
        let target = self.config.target_column.as_str();

        let mut preprocessor = DataPreprocessor::with_config(self.config.preprocessing.clone());
        preprocessor.fit(df, target)?;
        let x = preprocessor.transform_to_array(df)?;
        let y = preprocessor.encode_target(df)?;
        info!(
            rows = x.nrows(),
            features = x.ncols(),
            classes = preprocessor.target_classes().len(),
            "preprocessing fitted"
        );

        let split = train_test_split(&x, &y, self.config.validation_split, self.config.split_seed)?;
        info!(train = split.n_train(), valid = split.n_valid(), "data split");

        let optimizer = ChaosOptimizer::new(self.config.optimizer.clone());
        let search = optimizer.optimize(|params| self.evaluate(params, &split), None)?;
        let (best_config, best_score) = match search.clone().into_result() {
            Ok(best) => best,
            Err(e) => {
                warn!(failed = search.n_failed(), "no viable configuration, nothing written");
                return Err(e);
            }
        };
        info!(score = best_score, config = %best_config, "retraining best configuration");

        let mut classifier = self.factory.build(&best_config)?;
        let final_fit = classifier.fit(&split.x_train, &split.y_train, &split.x_valid, &split.y_valid)?;
        let final_valid_accuracy = accuracy_score(&split.y_valid, &classifier.predict(&split.x_valid)?)?;

        let model = ModelArtifact {
            format_version: ARTIFACT_FORMAT_VERSION,
            target: target.to_string(),
            hyperparameters: best_config.clone(),
            valid_accuracy: final_valid_accuracy,
            feature_names: preprocessor.feature_names(),
            classes: preprocessor.target_classes().to_vec(),
            trained_at: Utc::now(),
            classifier,
        };
        let n_features = preprocessor.n_features();
        let artifacts = ArtifactPair::new(model, preprocessor)?.save(&self.config.output_dir)?;

        let report = TrainingReport {
            target: target.to_string(),
            n_rows: df.height(),
            n_features,
            n_train: split.n_train(),
            n_valid: split.n_valid(),
            search,
            best_config,
            final_valid_accuracy,
            final_fit,
            artifacts,
            total_duration_secs: start.elapsed().as_secs_f64(),
        };
        info!(
            valid_accuracy = report.final_valid_accuracy,
            secs = report.total_duration_secs,
            "training pipeline finished"
        );
        Ok(report)
    }

    /// Validation accuracy of a fresh classifier trained with `params`
    fn evaluate(&self, params: &HyperparameterConfig, split: &DataSplit) -> Result<f64> {
        let mut classifier = self.factory.build(params)?;
        classifier.fit(&split.x_train, &split.y_train, &split.x_valid, &split.y_valid)?;
        let predictions = classifier.predict(&split.x_valid)?;
        accuracy_score(&split.y_valid, &predictions)
    }
}

