//! Chaos hyperparameter optimization module
//!
//! Provides a deterministic, chaos-driven search:
//! - Logistic-map sequence generation
//! - Chaotic value to hyperparameter mapping
//! - Search loop with per-candidate failure isolation

pub mod chaos;
mod config;
mod mapper;
mod optimizer;

pub use chaos::{is_valid_seed, random_seed, LogisticMap, DEGENERATE_SEEDS, FULLY_CHAOTIC_R};
pub use config::ChaosOptimizerConfig;
pub use mapper::{map_to_hyperparameters, HyperparameterConfig, DEFAULT_GAMMA, DEFAULT_MOMENTUM};
pub use optimizer::{CandidateOutcome, CandidateResult, ChaosOptimizer, OptimizationOutcome};
