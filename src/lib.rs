//! Chaos AutoML - chaos-driven hyperparameter search for tabular classifiers
//!
//! This crate provides a reproducible training pipeline:
//! - Logistic-map candidate generation and hyperparameter mapping
//! - Search loop that isolates failing candidates
//! - Data preprocessing (imputation, label encoding, scaling)
//! - An attentive (TabNet-style) tabular classifier
//! - Artifact persistence and a risk inference service
//!
//! # Modules
//!
//! ## Core
//! - [`optimizer`] - Chaos sequence, mapper and search loop
//! - [`preprocessing`] - Fitted preprocessing state shared by training and inference
//! - [`architectures`] - TabNet classifier and its layers
//! - [`training`] - Classifier traits, split and the training pipeline
//! - [`inference`] - Risk predictions from saved artifacts
//!
//! ## Utilities
//! - [`export`] - Model and preprocessor artifacts
//! - [`synthetic`] - Seeded synthetic health records
//! - [`utils`] - Table loading and saving
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;

// Core ML modules
pub mod optimizer;
pub mod preprocessing;
pub mod architectures;
pub mod training;
pub mod inference;

// Utilities
pub mod export;
pub mod synthetic;
pub mod utils;

// Services
pub mod cli;

pub use error::{ChaosError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{ChaosError, Result};

    // Optimization
    pub use crate::optimizer::{
        map_to_hyperparameters, CandidateOutcome, ChaosOptimizer, ChaosOptimizerConfig,
        HyperparameterConfig, LogisticMap, OptimizationOutcome,
    };

    // Preprocessing
    pub use crate::preprocessing::{DataPreprocessor, PreprocessingConfig, TransformedRow};

    // Architectures
    pub use crate::architectures::{TabNetClassifier, TabNetConfig};

    // Training
    pub use crate::training::{
        ClassifierFactory, TrainableClassifier, TrainingConfig, TrainingPipeline, TrainingReport,
    };

    // Inference
    pub use crate::inference::{InferenceService, RiskLevel, RiskPrediction};

    // Export
    pub use crate::export::{ArtifactPair, ModelArtifact};

    // Synthetic data
    pub use crate::synthetic::generate_health_dataset;
}
