//! Integration test: chaos search properties

use approx::assert_abs_diff_eq;
use chaos_automl::error::ChaosError;
use chaos_automl::optimizer::{
    map_to_hyperparameters, CandidateOutcome, ChaosOptimizer, ChaosOptimizerConfig, LogisticMap,
    DEFAULT_GAMMA, DEFAULT_MOMENTUM,
};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

fn optimizer(n: usize) -> ChaosOptimizer {
    ChaosOptimizer::new(ChaosOptimizerConfig::new().with_n_iterations(n))
}

#[test]
fn test_known_sequence() {
    let mut map = LogisticMap::new(0.1).unwrap();
    let values = map.take(3);
    assert_abs_diff_eq!(values[0], 0.36, epsilon = 1e-12);
    assert_abs_diff_eq!(values[1], 0.9216, epsilon = 1e-12);
    assert_abs_diff_eq!(values[2], 0.28901376, epsilon = 1e-12);
}

#[test]
fn test_sequence_stays_in_open_interval() {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(2024);
    for _ in 0..50 {
        let x0 = rng.gen_range(0.001..0.999);
        let Ok(mut map) = LogisticMap::new(x0) else {
            continue;
        };
        for _ in 0..10_000 {
            let x = map.step();
            assert!(x > 0.0 && x < 1.0, "x0 = {} escaped to {}", x0, x);
        }
    }
}

#[test]
fn test_mapped_configs_within_bounds() {
    let mut map = LogisticMap::new(0.2137).unwrap();
    for x in map.take(2_000) {
        let c = map_to_hyperparameters(x);
        assert!(c.learning_rate >= 1e-4 && c.learning_rate <= 1e-2);
        assert!(c.lambda_sparse >= 1e-4 && c.lambda_sparse <= 1e-1);
        assert!((3..=10).contains(&c.n_steps));
        assert!((8..=64).contains(&c.n_d));
        assert_eq!(c.n_d, c.n_a);
        assert_eq!(c.gamma, DEFAULT_GAMMA);
        assert_eq!(c.momentum, DEFAULT_MOMENTUM);
    }
}

#[test]
fn test_same_seed_same_search() {
    let score = |c: &chaos_automl::optimizer::HyperparameterConfig| Ok(c.learning_rate * c.n_d as f64);
    let a = optimizer(15).optimize(score, Some(0.37)).unwrap();
    let b = optimizer(15).optimize(score, Some(0.37)).unwrap();

    assert_eq!(a.best_config, b.best_config);
    assert_eq!(a.best_iteration, b.best_iteration);
    let configs_a: Vec<_> = a.history.iter().map(|c| c.config.clone()).collect();
    let configs_b: Vec<_> = b.history.iter().map(|c| c.config.clone()).collect();
    assert_eq!(configs_a, configs_b);
}

#[test]
fn test_always_failing_evaluator_returns_sentinel() {
    let mut calls = 0;
    let outcome = optimizer(8)
        .optimize(
            |_| {
                calls += 1;
                Err(ChaosError::TrainingError("diverged".to_string()))
            },
            Some(0.42),
        )
        .unwrap();

    assert_eq!(calls, 8);
    assert!(!outcome.is_viable());
    assert_eq!(outcome.best_score, f64::NEG_INFINITY);
    assert_eq!(outcome.n_failed(), 8);
    assert!(matches!(
        outcome.into_result(),
        Err(ChaosError::NoViableConfiguration { iterations: 8 })
    ));
}

#[test]
fn test_failures_do_not_stop_search() {
    let mut i = 0;
    let outcome = optimizer(6)
        .optimize(
            |c| {
                i += 1;
                if i % 2 == 0 {
                    Ok(f64::NAN)
                } else {
                    Ok(c.n_d as f64)
                }
            },
            Some(0.3),
        )
        .unwrap();

    assert_eq!(outcome.history.len(), 6);
    assert_eq!(outcome.n_failed(), 3);
    assert!(outcome.is_viable());
    assert!(outcome.history[1].outcome.is_failure());
}

#[test]
fn test_monotone_objective_finds_wide_networks() {
    for x0 in [0.123, 0.37, 0.61, 0.9] {
        let outcome = optimizer(50).optimize(|c| Ok(c.n_d as f64), Some(x0)).unwrap();
        let best = outcome.best_config.unwrap();
        assert!(best.n_d >= 56, "x0 = {} only reached n_d = {}", x0, best.n_d);
    }
}

#[test]
fn test_first_seen_wins_ties() {
    let outcome = optimizer(10).optimize(|_| Ok(0.5), Some(0.7)).unwrap();
    assert_eq!(outcome.best_iteration, Some(0));
    assert_eq!(
        outcome.best_config.as_ref(),
        Some(&outcome.history[0].config)
    );
    assert!(matches!(outcome.history[0].outcome, CandidateOutcome::Success(s) if s == 0.5));
}

#[test]
fn test_degenerate_seed_rejected_before_evaluation() {
    let mut calls = 0;
    let result = optimizer(5).optimize(
        |_| {
            calls += 1;
            Ok(1.0)
        },
        Some(0.5),
    );
    assert!(result.is_err());
    assert_eq!(calls, 0);
}

#[test]
fn test_random_seed_is_recorded() {
    let outcome = optimizer(3).optimize(|_| Ok(1.0), None).unwrap();
    assert!(outcome.seed > 0.0 && outcome.seed < 1.0);
    assert_eq!(outcome.history.len(), 3);
}
