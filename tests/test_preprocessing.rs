//! Integration test: preprocessing on the synthetic health schema

use approx::assert_abs_diff_eq;
use chaos_automl::error::ChaosError;
use chaos_automl::preprocessing::{DataPreprocessor, PreprocessingConfig};
use chaos_automl::synthetic::{generate_health_dataset, HEALTH_TARGET};
use polars::prelude::*;
use serde_json::Value;
use std::collections::HashMap;
use tempfile::tempdir;

fn fitted(df: &DataFrame) -> DataPreprocessor {
    let mut pre = DataPreprocessor::new();
    pre.fit(df, HEALTH_TARGET).unwrap();
    pre
}

/// Row `i` of a table as the key-value mapping used at inference
fn row_of(df: &DataFrame, i: usize) -> HashMap<String, Value> {
    let mut row = HashMap::new();
    for column in df.get_columns() {
        let value = match column.get(i).unwrap() {
            AnyValue::Null => Value::Null,
            AnyValue::Int64(v) => Value::from(v),
            AnyValue::Float64(v) => Value::from(v),
            AnyValue::String(s) => Value::from(s),
            other => panic!("unexpected value {:?}", other),
        };
        row.insert(column.name().to_string(), value);
    }
    row
}

#[test]
fn test_feature_layout() {
    let df = generate_health_dataset(300, 42).unwrap();
    let pre = fitted(&df);

    assert_eq!(pre.n_features(), 8);
    assert!(!pre.feature_names().contains(&HEALTH_TARGET.to_string()));
    assert_eq!(pre.target_classes(), &["0".to_string(), "1".to_string()]);
    assert_eq!(pre.n_samples_fit(), 300);
}

#[test]
fn test_numeric_columns_standardised() {
    let df = generate_health_dataset(500, 42).unwrap();
    let pre = fitted(&df);
    let x = pre.transform_to_array(&df).unwrap();

    for name in ["age", "bmi", "blood_pressure", "cholesterol", "glucose"] {
        let j = pre.feature_names().iter().position(|f| f == name).unwrap();
        let col = x.column(j);
        let mean = col.mean().unwrap();
        let var = col.mapv(|v| (v - mean).powi(2)).mean().unwrap();
        assert_abs_diff_eq!(mean, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(var, 1.0, epsilon = 1e-9);
    }
}

#[test]
fn test_every_row_matches_table_transform() {
    let df = generate_health_dataset(120, 9).unwrap();
    let pre = fitted(&df);
    let x = pre.transform_to_array(&df).unwrap();

    for i in 0..df.height() {
        let row = pre.transform_row(&row_of(&df, i)).unwrap();
        assert!(row.scaling_applied);
        assert!(!row.is_degraded());
        for (a, b) in row.features.iter().zip(x.row(i).iter()) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-12);
        }
    }
}

#[test]
fn test_target_encoding() {
    let df = generate_health_dataset(100, 3).unwrap();
    let pre = fitted(&df);
    let y = pre.encode_target(&df).unwrap();
    let raw = df.column(HEALTH_TARGET).unwrap().as_materialized_series().i64().unwrap().clone();
    for (code, value) in y.iter().zip(raw.into_iter()) {
        assert_eq!(*code as i64, value.unwrap());
    }
    assert_eq!(pre.decode_label(1), Some("1"));
}

#[test]
fn test_unseen_category_uses_fallback_code() {
    let df = generate_health_dataset(100, 1).unwrap();
    let pre = fitted(&df);
    let mut row = row_of(&df, 0);
    row.insert("smoker".to_string(), Value::from("occasionally"));

    let out = pre.transform_row(&row).unwrap();
    let j = pre.feature_names().iter().position(|f| f == "smoker").unwrap();
    assert_eq!(out.features[j], 0.0);
    assert_eq!(out.unseen_categories, vec!["smoker".to_string()]);
    assert!(out.scaling_applied);
}

#[test]
fn test_absent_numeric_column_disables_scaling() {
    let df = generate_health_dataset(100, 1).unwrap();
    let pre = fitted(&df);
    let mut row = row_of(&df, 5);
    row.remove("glucose");
    let raw_bmi = row["bmi"].as_f64().unwrap();

    let out = pre.transform_row(&row).unwrap();
    let names = pre.feature_names();
    let glucose = names.iter().position(|f| f == "glucose").unwrap();
    let bmi = names.iter().position(|f| f == "bmi").unwrap();

    assert!(!out.scaling_applied);
    assert_eq!(out.missing_columns, vec!["glucose".to_string()]);
    assert_abs_diff_eq!(out.features[glucose], pre.fill_value("glucose").unwrap(), epsilon = 1e-12);
    assert_abs_diff_eq!(out.features[bmi], raw_bmi, epsilon = 1e-12);
}

#[test]
fn test_refit_rejected() {
    let df = generate_health_dataset(50, 1).unwrap();
    let mut pre = fitted(&df);
    assert!(matches!(pre.fit(&df, HEALTH_TARGET), Err(ChaosError::AlreadyFitted)));
}

#[test]
fn test_missing_declared_column() {
    let df = generate_health_dataset(50, 1).unwrap().drop("cholesterol").unwrap();
    let mut pre = DataPreprocessor::new();
    assert!(matches!(
        pre.fit(&df, HEALTH_TARGET),
        Err(ChaosError::FeatureNotFound(c)) if c == "cholesterol"
    ));
}

#[test]
fn test_custom_schema_with_nulls() {
    let df = df!(
        "income" => &[Some(10.0), None, Some(30.0), Some(50.0)],
        "region" => &[Some("north"), Some("south"), None, Some("north")],
        "churn" => &["no", "yes", "no", "yes"]
    )
    .unwrap();
    let config = PreprocessingConfig::with_schema(["region"], ["income"]);
    let mut pre = DataPreprocessor::with_config(config);
    pre.fit(&df, "churn").unwrap();

    assert_eq!(pre.fill_value("income"), Some(30.0));
    let classes: Vec<&str> = pre
        .encoder_for("region")
        .unwrap()
        .classes()
        .iter()
        .map(|s| s.as_str())
        .collect();
    assert_eq!(classes, vec!["nan", "north", "south"]);
    assert_eq!(pre.target_classes(), &["no".to_string(), "yes".to_string()]);
}

#[test]
fn test_persisted_preprocessor_transforms_identically() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("pre.json");
    let df = generate_health_dataset(80, 11).unwrap();
    let pre = fitted(&df);
    pre.save(&path).unwrap();

    let loaded = DataPreprocessor::load(&path).unwrap();
    assert!(loaded.is_fitted());
    assert_eq!(
        pre.transform_to_array(&df).unwrap(),
        loaded.transform_to_array(&df).unwrap()
    );
}
