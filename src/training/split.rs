//! Seeded train/validation split

use crate::error::{ChaosError, Result};
use ndarray::{Array1, Array2, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

/// Rows held by each side of a split
#[derive(Debug, Clone)]
pub struct DataSplit {
    pub x_train: Array2<f64>,
    pub y_train: Array1<usize>,
    pub x_valid: Array2<f64>,
    pub y_valid: Array1<usize>,
}

impl DataSplit {
    pub fn n_train(&self) -> usize {
        self.y_train.len()
    }

    pub fn n_valid(&self) -> usize {
        self.y_valid.len()
    }
}

/// Shuffle rows with a fixed seed and hold out `valid_fraction` of them.
///
/// The held-out count is `ceil(n * valid_fraction)`, and both sides must be
/// non-empty. The same seed always yields the same partition.
pub fn train_test_split(
    x: &Array2<f64>,
    y: &Array1<usize>,
    valid_fraction: f64,
    seed: u64,
) -> Result<DataSplit> {
    let n = x.nrows();
    if n != y.len() {
        return Err(ChaosError::ShapeError {
            expected: format!("{} labels", n),
            actual: format!("{} labels", y.len()),
        });
    }
    if !(valid_fraction > 0.0 && valid_fraction < 1.0) {
        return Err(ChaosError::InvalidParameter {
            name: "valid_fraction".to_string(),
            value: valid_fraction.to_string(),
            reason: "must lie strictly between 0 and 1".to_string(),
        });
    }

    let n_valid = (n as f64 * valid_fraction).ceil() as usize;
    if n_valid == 0 || n_valid >= n {
        return Err(ChaosError::DataError(format!(
            "cannot split {} rows into non-empty train and validation sets",
            n
        )));
    }

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    indices.shuffle(&mut rng);
    let (valid_idx, train_idx) = indices.split_at(n_valid);

    Ok(DataSplit {
        x_train: x.select(Axis(0), train_idx),
        y_train: y.select(Axis(0), train_idx),
        x_valid: x.select(Axis(0), valid_idx),
        y_valid: y.select(Axis(0), valid_idx),
    })
}
