//! ChaosOptimizer - chaos-driven hyperparameter search loop

use crate::error::{ChaosError, Result};
use super::{
    chaos::{random_seed, LogisticMap},
    config::ChaosOptimizerConfig,
    mapper::{map_to_hyperparameters, HyperparameterConfig},
};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Outcome of evaluating one candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CandidateOutcome {
    /// Evaluator returned a finite score
    Success(f64),
    /// Evaluator failed or produced a non-finite score
    Failure(String),
}

impl CandidateOutcome {
    /// Score if the candidate succeeded
    pub fn score(&self) -> Option<f64> {
        match self {
            CandidateOutcome::Success(score) => Some(*score),
            CandidateOutcome::Failure(_) => None,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, CandidateOutcome::Failure(_))
    }
}

/// Result of a single search iteration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateResult {
    /// Zero-based iteration index
    pub iteration: usize,
    /// Chaotic value the configuration was mapped from
    pub chaos_value: f64,
    /// Configuration evaluated
    pub config: HyperparameterConfig,
    /// Score or failure reason
    pub outcome: CandidateOutcome,
    /// Evaluation wall time in seconds
    pub duration_secs: f64,
}

/// Terminal result of one search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationOutcome {
    /// Winning configuration; `None` when every candidate failed
    pub best_config: Option<HyperparameterConfig>,
    /// Winning score; negative infinity when every candidate failed
    pub best_score: f64,
    /// Iteration that produced the winner
    pub best_iteration: Option<usize>,
    /// Initial chaotic value actually used
    pub seed: f64,
    /// Every candidate in iteration order
    pub history: Vec<CandidateResult>,
    /// Total search wall time in seconds
    pub total_duration_secs: f64,
}

impl OptimizationOutcome {
    fn empty(seed: f64) -> Self {
        Self {
            best_config: None,
            best_score: f64::NEG_INFINITY,
            best_iteration: None,
            seed,
            history: Vec::new(),
            total_duration_secs: 0.0,
        }
    }

    /// Whether at least one candidate produced a score
    pub fn is_viable(&self) -> bool {
        self.best_config.is_some()
    }

    /// Number of failed candidates
    pub fn n_failed(&self) -> usize {
        self.history.iter().filter(|c| c.outcome.is_failure()).count()
    }

    /// Winning configuration and score, or `NoViableConfiguration`.
    pub fn into_result(self) -> Result<(HyperparameterConfig, f64)> {
        match self.best_config {
            Some(config) => Ok((config, self.best_score)),
            None => Err(ChaosError::NoViableConfiguration {
                iterations: self.history.len(),
            }),
        }
    }

    /// Record a candidate, replacing the incumbent only on a strictly higher score.
    fn record(&mut self, candidate: CandidateResult) {
        if let CandidateOutcome::Success(score) = candidate.outcome {
            if score > self.best_score {
                self.best_score = score;
                self.best_config = Some(candidate.config.clone());
                self.best_iteration = Some(candidate.iteration);
            }
        }
        self.history.push(candidate);
    }
}

/// Chaos optimization algorithm over the mapped hyperparameter space
#[derive(Debug, Clone)]
pub struct ChaosOptimizer {
    config: ChaosOptimizerConfig,
}

impl Default for ChaosOptimizer {
    fn default() -> Self {
        Self::new(ChaosOptimizerConfig::default())
    }
}

impl ChaosOptimizer {
    /// Create a new optimizer
    pub fn new(config: ChaosOptimizerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ChaosOptimizerConfig {
        &self.config
    }

    /// Run the search.
    ///
    /// `seed` overrides the configured seed; with neither, one is drawn at
    /// random. Evaluator errors never abort the loop: they are recorded as
    /// failed candidates. The only errors returned are an invalid seed or
    /// control parameter, checked before the first evaluation.
    pub fn optimize<F>(&self, mut evaluator: F, seed: Option<f64>) -> Result<OptimizationOutcome>
    where
        F: FnMut(&HyperparameterConfig) -> Result<f64>,
    {
        let x0 = match seed.or(self.config.seed) {
            Some(x0) => x0,
            None => random_seed(&mut rand::thread_rng()),
        };
        let mut map = LogisticMap::with_r(self.config.r, x0)?;

        let n = self.config.n_iterations;
        let start = Instant::now();
        let mut outcome = OptimizationOutcome::empty(x0);

        info!(x0, n_iterations = n, "starting chaos optimization");

        for iteration in 0..n {
            let chaos_value = map.step();
            let params = map_to_hyperparameters(chaos_value);
            debug!(iteration = iteration + 1, %params, "evaluating candidate");

            let trial_start = Instant::now();
            let result = match evaluator(&params) {
                Ok(score) if score.is_finite() => CandidateOutcome::Success(score),
                Ok(score) => CandidateOutcome::Failure(format!("non-finite score {}", score)),
                Err(e) => CandidateOutcome::Failure(e.to_string()),
            };

            match &result {
                CandidateOutcome::Success(score) => {
                    let improved = *score > outcome.best_score;
                    info!(
                        iteration = iteration + 1,
                        score = *score,
                        improved,
                        "candidate scored"
                    );
                }
                CandidateOutcome::Failure(reason) => {
                    warn!(iteration = iteration + 1, %reason, "candidate failed");
                }
            }

            outcome.record(CandidateResult {
                iteration,
                chaos_value,
                config: params,
                outcome: result,
                duration_secs: trial_start.elapsed().as_secs_f64(),
            });
        }

        outcome.total_duration_secs = start.elapsed().as_secs_f64();

        if outcome.is_viable() {
            info!(
                best_score = outcome.best_score,
                best_iteration = outcome.best_iteration.map(|i| i + 1),
                failed = outcome.n_failed(),
                "chaos optimization finished"
            );
        } else {
            warn!(iterations = n, "no candidate produced a score");
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn optimizer(n: usize) -> ChaosOptimizer {
        ChaosOptimizer::new(ChaosOptimizerConfig::new().with_n_iterations(n))
    }

    #[test]
    fn test_history_length() {
        let outcome = optimizer(12).optimize(|c| Ok(c.learning_rate), Some(0.3)).unwrap();
        assert_eq!(outcome.history.len(), 12);
        assert!(outcome.is_viable());
        assert_eq!(outcome.seed, 0.3);
    }

    #[test]
    fn test_first_seen_wins_ties() {
        let outcome = optimizer(8).optimize(|_| Ok(0.5), Some(0.2)).unwrap();
        assert_eq!(outcome.best_iteration, Some(0));
        assert_eq!(outcome.best_config, Some(outcome.history[0].config.clone()));
    }

    #[test]
    fn test_failures_are_isolated() {
        let mut calls = 0;
        let outcome = optimizer(6)
            .optimize(
                |c| {
                    calls += 1;
                    if calls % 2 == 1 {
                        Err(ChaosError::TrainingError("boom".into()))
                    } else {
                        Ok(c.n_d as f64)
                    }
                },
                Some(0.41),
            )
            .unwrap();

        assert_eq!(calls, 6);
        assert_eq!(outcome.n_failed(), 3);
        assert!(outcome.is_viable());
        assert!(outcome.best_iteration.map(|i| i % 2 == 1).unwrap());
    }

    #[test]
    fn test_nan_score_is_failure() {
        let outcome = optimizer(4).optimize(|_| Ok(f64::NAN), Some(0.33)).unwrap();
        assert!(!outcome.is_viable());
        assert_eq!(outcome.best_score, f64::NEG_INFINITY);
        assert_eq!(outcome.n_failed(), 4);
    }

    #[test]
    fn test_invalid_seed_rejected_before_evaluation() {
        let mut calls = 0;
        let result = optimizer(5).optimize(
            |_| {
                calls += 1;
                Ok(1.0)
            },
            Some(0.75),
        );
        assert!(matches!(result, Err(ChaosError::InvalidParameter { .. })));
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_into_result_sentinel() {
        let outcome = optimizer(3)
            .optimize(|_| Err(ChaosError::TrainingError("x".into())), Some(0.1))
            .unwrap();
        match outcome.into_result() {
            Err(ChaosError::NoViableConfiguration { iterations }) => assert_eq!(iterations, 3),
            other => panic!("unexpected: {:?}", other),
        }
    }
}
