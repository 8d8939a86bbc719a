//! Chaotic value to hyperparameter mapping
//!
//! A single scalar drives every tunable knob, so the whole configuration
//! moves along one chaotic trajectory through the search space. The
//! transforms are fixed; changing them changes every recorded search trace.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Relaxation factor for feature reuse across decision steps
pub const DEFAULT_GAMMA: f64 = 1.3;
/// Momentum of the input normalisation running statistics
pub const DEFAULT_MOMENTUM: f64 = 0.02;

/// Hyperparameters for one attentive tabular classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HyperparameterConfig {
    /// Adam step size, log-uniform in [1e-4, 1e-2]
    pub learning_rate: f64,
    /// Sparsity penalty weight, log-uniform in [1e-4, 1e-1]
    pub lambda_sparse: f64,
    /// Decision steps, in [3, 10]
    pub n_steps: usize,
    /// Decision layer width, in [8, 64]
    pub n_d: usize,
    /// Attention layer width, always equal to `n_d`
    pub n_a: usize,
    pub gamma: f64,
    pub momentum: f64,
}

impl Default for HyperparameterConfig {
    fn default() -> Self {
        Self {
            learning_rate: 2e-2,
            lambda_sparse: 1e-3,
            n_steps: 5,
            n_d: 32,
            n_a: 32,
            gamma: DEFAULT_GAMMA,
            momentum: DEFAULT_MOMENTUM,
        }
    }
}

impl fmt::Display for HyperparameterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "lr={:.2e} lambda_sparse={:.2e} n_steps={} n_d={} n_a={} gamma={} momentum={}",
            self.learning_rate,
            self.lambda_sparse,
            self.n_steps,
            self.n_d,
            self.n_a,
            self.gamma,
            self.momentum
        )
    }
}

/// Map a chaotic value in [0, 1] to a full configuration.
///
/// Values outside [0, 1] are clamped so the mapping stays total.
pub fn map_to_hyperparameters(x: f64) -> HyperparameterConfig {
    let x = if x.is_nan() { 0.0 } else { x.clamp(0.0, 1.0) };

    let learning_rate = 10f64.powf(-4.0 + x * 2.0);
    let lambda_sparse = 10f64.powf(-4.0 + x * 3.0);
    let n_steps = (3 + (x * 8.0).floor() as usize).min(10);
    let dim = 8 + (x * 56.0).floor() as usize;

    HyperparameterConfig {
        learning_rate,
        lambda_sparse,
        n_steps,
        n_d: dim,
        n_a: dim,
        gamma: DEFAULT_GAMMA,
        momentum: DEFAULT_MOMENTUM,
    }
}
