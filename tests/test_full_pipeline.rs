//! Integration test: Full pipeline (synthesize → preprocess → search → retrain → persist)

use chaos_automl::architectures::{TabNetClassifier, TabNetConfig};
use chaos_automl::error::ChaosError;
use chaos_automl::export::{model_path, preprocessor_path, ArtifactPair};
use chaos_automl::optimizer::HyperparameterConfig;
use chaos_automl::synthetic::{generate_health_dataset, HEALTH_TARGET};
use chaos_automl::training::{TrainableClassifier, TrainingConfig, TrainingPipeline};
use chaos_automl::utils::DataSaver;
use std::path::Path;
use tempfile::tempdir;

/// Small epoch budget keeps each candidate fit quick
fn fast_budget() -> TabNetConfig {
    TabNetConfig::default().with_max_epochs(3).with_patience(2)
}

fn files_in(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn test_synthetic_end_to_end() {
    let dir = tempdir().unwrap();
    let config = TrainingConfig::new(HEALTH_TARGET)
        .with_output_dir(dir.path())
        .with_n_iterations(10)
        .with_chaos_seed(0.37)
        .with_classifier(fast_budget());

    let report = TrainingPipeline::new(config).run().unwrap();

    assert_eq!(report.n_rows, 1000);
    assert_eq!(report.n_train, 700);
    assert_eq!(report.n_valid, 300);
    assert_eq!(report.search.history.len(), 10);
    assert!(report.search.is_viable());
    assert!(report.final_valid_accuracy >= 0.0 && report.final_valid_accuracy <= 1.0);
    assert!(report.final_fit.epochs_run <= 3);

    assert_eq!(
        files_in(dir.path()),
        vec![
            "has_heart_disease_model.bin".to_string(),
            "has_heart_disease_preprocessor.json".to_string()
        ]
    );
    assert_eq!(report.artifacts.model_path, model_path(dir.path(), HEALTH_TARGET));
    assert_eq!(report.artifacts.preprocessor_path, preprocessor_path(dir.path(), HEALTH_TARGET));

    let pair: ArtifactPair<TabNetClassifier> = ArtifactPair::load(dir.path(), HEALTH_TARGET).unwrap();
    assert_eq!(pair.model.hyperparameters, report.best_config);
    assert_eq!(pair.model.feature_names.len(), report.n_features);
    assert_eq!(pair.model.classifier.config().max_epochs, 3);
}

#[test]
fn test_same_seed_same_winner() {
    let run = || {
        let dir = tempdir().unwrap();
        let config = TrainingConfig::new(HEALTH_TARGET)
            .with_output_dir(dir.path())
            .with_synthetic_rows(200)
            .with_n_iterations(3)
            .with_chaos_seed(0.21)
            .with_classifier(fast_budget());
        TrainingPipeline::new(config).run().unwrap()
    };
    let a = run();
    let b = run();
    assert_eq!(a.best_config, b.best_config);
    assert_eq!(a.search.best_score, b.search.best_score);
}

#[test]
fn test_no_viable_configuration_writes_nothing() {
    let dir = tempdir().unwrap();
    let out = dir.path().join("artifacts");
    let config = TrainingConfig::new(HEALTH_TARGET)
        .with_output_dir(&out)
        .with_synthetic_rows(100)
        .with_n_iterations(4)
        .with_chaos_seed(0.3);

    let failing = |_: &HyperparameterConfig| -> chaos_automl::Result<TabNetClassifier> {
        Err(ChaosError::TrainingError("diverged".to_string()))
    };
    let err = TrainingPipeline::with_factory(config, failing).run().unwrap_err();

    assert!(matches!(err, ChaosError::NoViableConfiguration { iterations: 4 }));
    assert!(!out.exists());
}

#[test]
fn test_partial_failures_still_train() {
    let dir = tempdir().unwrap();
    let config = TrainingConfig::new(HEALTH_TARGET)
        .with_output_dir(dir.path())
        .with_synthetic_rows(200)
        .with_n_iterations(6)
        .with_chaos_seed(0.3);

    // only narrow networks are allowed to train
    let picky = |params: &HyperparameterConfig| -> chaos_automl::Result<TabNetClassifier> {
        if params.n_d > 40 {
            return Err(ChaosError::TrainingError("too wide".to_string()));
        }
        Ok(TabNetClassifier::new(fast_budget().with_hyperparameters(params)))
    };
    let report = TrainingPipeline::with_factory(config, picky).run().unwrap();

    assert!(report.best_config.n_d <= 40);
    assert_eq!(report.search.history.len(), 6);
    assert_eq!(files_in(dir.path()).len(), 2);
}

#[test]
fn test_training_from_csv() {
    let dir = tempdir().unwrap();
    let data = dir.path().join("patients.csv");
    let mut df = generate_health_dataset(150, 5).unwrap();
    DataSaver::save_csv(&mut df, &data).unwrap();

    let out = dir.path().join("models");
    let config = TrainingConfig::new(HEALTH_TARGET)
        .with_data_path(&data)
        .with_output_dir(&out)
        .with_n_iterations(2)
        .with_chaos_seed(0.6)
        .with_classifier(fast_budget());
    let report = TrainingPipeline::new(config).run().unwrap();

    assert_eq!(report.n_rows, 150);
    let pair: ArtifactPair<TabNetClassifier> = ArtifactPair::load(&out, HEALTH_TARGET).unwrap();
    assert!(pair.model.classifier.feature_importances().is_some());
}

#[test]
fn test_missing_target_fails_before_search() {
    let dir = tempdir().unwrap();
    let config = TrainingConfig::new("diabetes")
        .with_output_dir(dir.path())
        .with_synthetic_rows(50);
    let err = TrainingPipeline::new(config).run().unwrap_err();
    assert!(matches!(err, ChaosError::FeatureNotFound(c) if c == "diabetes"));
    assert!(files_in(dir.path()).is_empty());
}
