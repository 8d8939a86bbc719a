//! Model training module
//!
//! Provides the pieces of a training run:
//! - Classifier traits and the TabNet factory
//! - Seeded train/validation split
//! - Accuracy scoring
//! - The end-to-end training pipeline

mod config;
mod engine;
mod models;
mod split;

pub use config::TrainingConfig;
pub use engine::{TrainingPipeline, TrainingReport};
pub use models::{accuracy_score, ClassifierFactory, FitReport, TabNetFactory, TrainableClassifier};
pub use split::{train_test_split, DataSplit};
