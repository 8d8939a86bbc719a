//! Optimization configuration

use serde::{Deserialize, Serialize};
use super::chaos::FULLY_CHAOTIC_R;

/// Configuration for the chaos optimizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChaosOptimizerConfig {
    /// Number of candidates to evaluate
    pub n_iterations: usize,

    /// Logistic map control parameter
    pub r: f64,

    /// Explicit initial chaotic value; drawn at random when absent
    pub seed: Option<f64>,
}

impl Default for ChaosOptimizerConfig {
    fn default() -> Self {
        Self {
            n_iterations: 30,
            r: FULLY_CHAOTIC_R,
            seed: None,
        }
    }
}

impl ChaosOptimizerConfig {
    /// Create a new configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the iteration budget
    pub fn with_n_iterations(mut self, n: usize) -> Self {
        self.n_iterations = n;
        self
    }

    /// Builder method to set the control parameter
    pub fn with_r(mut self, r: f64) -> Self {
        self.r = r;
        self
    }

    /// Builder method to pin the initial chaotic value
    pub fn with_seed(mut self, x0: f64) -> Self {
        self.seed = Some(x0);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ChaosOptimizerConfig::default();
        assert_eq!(config.n_iterations, 30);
        assert_eq!(config.r, 4.0);
        assert!(config.seed.is_none());
    }

    #[test]
    fn test_builder() {
        let config = ChaosOptimizerConfig::new()
            .with_n_iterations(10)
            .with_seed(0.1);

        assert_eq!(config.n_iterations, 10);
        assert_eq!(config.seed, Some(0.1));
    }

    #[test]
    fn test_json_roundtrip() {
        let json = r#"{"n_iterations": 5, "r": 3.9, "seed": 0.2}"#;
        let config: ChaosOptimizerConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.n_iterations, 5);
        assert_eq!(config.r, 3.9);
    }
}
