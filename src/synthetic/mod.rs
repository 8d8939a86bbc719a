//! Synthetic health records
//!
//! Seeded generator for the default patient schema, used when training runs
//! without an input table.

use crate::error::{ChaosError, Result};
use polars::prelude::*;
use rand::prelude::*;
use rand_distr::Normal;
use rand_xoshiro::Xoshiro256PlusPlus;

/// Target column of the generated table
pub const HEALTH_TARGET: &str = "has_heart_disease";

pub const DEFAULT_SEED: u64 = 42;

/// `n` draws from N(mean, std)
fn normal_column<R: Rng>(rng: &mut R, n: usize, mean: f64, std: f64) -> Result<Vec<f64>> {
    let normal = Normal::new(mean, std)
        .map_err(|e| ChaosError::InvalidParameter {
            name: "std".to_string(),
            value: std.to_string(),
            reason: e.to_string(),
        })?;
    Ok(normal.sample_iter(rng).take(n).collect())
}

fn choice_column<R: Rng>(rng: &mut R, n: usize, choices: &[&'static str]) -> Vec<&'static str> {
    (0..n).map(|_| choices[rng.gen_range(0..choices.len())]).collect()
}

/// Generate `n_rows` patient records.
///
/// Columns: `age` (18..=89), `gender`, `bmi`, `blood_pressure`, `cholesterol`,
/// `glucose`, `smoker`, `physical_activity` and the binary `has_heart_disease`.
/// The same seed always yields the same table.
pub fn generate_health_dataset(n_rows: usize, seed: u64) -> Result<DataFrame> {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let n = n_rows;

    let age: Vec<i64> = (0..n).map(|_| rng.gen_range(18..90)).collect();
    let gender = choice_column(&mut rng, n, &["M", "F"]);
    let bmi = normal_column(&mut rng, n, 25.0, 5.0)?;
    let blood_pressure = normal_column(&mut rng, n, 120.0, 15.0)?;
    let cholesterol = normal_column(&mut rng, n, 200.0, 40.0)?;
    let glucose = normal_column(&mut rng, n, 100.0, 20.0)?;
    let smoker = choice_column(&mut rng, n, &["yes", "no", "former"]);
    let physical_activity = choice_column(&mut rng, n, &["low", "moderate", "high"]);
    let target: Vec<i64> = (0..n).map(|_| rng.gen_range(0..2)).collect();

    let df = df!(
        "age" => age,
        "gender" => gender,
        "bmi" => bmi,
        "blood_pressure" => blood_pressure,
        "cholesterol" => cholesterol,
        "glucose" => glucose,
        "smoker" => smoker,
        "physical_activity" => physical_activity,
        HEALTH_TARGET => target
    )?;
    Ok(df)
}
