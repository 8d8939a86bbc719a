//! Logistic-map chaotic sequence generator
//!
//! Produces a deterministic pseudo-random stream on (0, 1) from the
//! recurrence `x <- r * x * (1 - x)`. At `r = 4` the map is fully chaotic:
//! the stream is ergodic over the interval yet exactly reproducible from
//! `(r, x0)`, which is what makes a search trace replayable.

use crate::error::{ChaosError, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Control parameter for the fully chaotic regime
pub const FULLY_CHAOTIC_R: f64 = 4.0;

/// Seeds that collapse the map at `r = 4` into a fixed point or a short cycle
pub const DEGENERATE_SEEDS: [f64; 5] = [0.0, 0.25, 0.5, 0.75, 1.0];

/// Whether `x0` is usable as a seed: strictly inside (0, 1) and not degenerate.
pub fn is_valid_seed(x0: f64) -> bool {
    x0.is_finite() && x0 > 0.0 && x0 < 1.0 && !DEGENERATE_SEEDS.contains(&x0)
}

/// Draw a seed uniformly from (0, 1), redrawing while it is degenerate.
pub fn random_seed<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    loop {
        let x0: f64 = rng.gen();
        if is_valid_seed(x0) {
            return x0;
        }
    }
}

/// Chaotic state: the current value plus how many steps produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticMap {
    r: f64,
    x: f64,
    iteration: usize,
}

impl LogisticMap {
    /// Create a generator with `r = 4` from a seed.
    pub fn new(x0: f64) -> Result<Self> {
        Self::with_r(FULLY_CHAOTIC_R, x0)
    }

    /// Create a generator with an explicit control parameter.
    pub fn with_r(r: f64, x0: f64) -> Result<Self> {
        if !(r > 0.0 && r <= FULLY_CHAOTIC_R) {
            return Err(ChaosError::InvalidParameter {
                name: "r".to_string(),
                value: r.to_string(),
                reason: "must lie in (0, 4]".to_string(),
            });
        }
        if !is_valid_seed(x0) {
            return Err(ChaosError::InvalidParameter {
                name: "x0".to_string(),
                value: x0.to_string(),
                reason: "seed must lie in (0, 1) and avoid 0.25, 0.5, 0.75".to_string(),
            });
        }
        Ok(Self { r, x: x0, iteration: 0 })
    }

    /// Advance the map once and return the new value.
    #[inline]
    pub fn step(&mut self) -> f64 {
        self.x = self.r * self.x * (1.0 - self.x);
        self.iteration += 1;
        self.x
    }

    /// Advance `n` times, collecting every produced value.
    pub fn take(&mut self, n: usize) -> Vec<f64> {
        (0..n).map(|_| self.step()).collect()
    }

    /// Current value
    pub fn value(&self) -> f64 {
        self.x
    }

    /// Number of steps taken so far
    pub fn iteration(&self) -> usize {
        self.iteration
    }

    /// Control parameter
    pub fn r(&self) -> f64 {
        self.r
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_known_vector() {
        let mut map = LogisticMap::new(0.1).unwrap();
        assert_abs_diff_eq!(map.step(), 0.36, epsilon = 1e-9);
        assert_abs_diff_eq!(map.step(), 0.9216, epsilon = 1e-9);
        assert_abs_diff_eq!(map.step(), 0.28901376, epsilon = 1e-9);
        assert_eq!(map.iteration(), 3);
    }

    #[test]
    fn test_rejects_degenerate_seeds() {
        for &seed in DEGENERATE_SEEDS.iter() {
            assert!(LogisticMap::new(seed).is_err(), "seed {} accepted", seed);
        }
        assert!(LogisticMap::new(-0.2).is_err());
        assert!(LogisticMap::new(f64::NAN).is_err());
    }

    #[test]
    fn test_rejects_bad_r() {
        assert!(LogisticMap::with_r(4.5, 0.3).is_err());
        assert!(LogisticMap::with_r(0.0, 0.3).is_err());
        assert!(LogisticMap::with_r(3.7, 0.3).is_ok());
    }

    #[test]
    fn test_take_matches_step() {
        let mut a = LogisticMap::new(0.123).unwrap();
        let mut b = LogisticMap::new(0.123).unwrap();
        let batch = a.take(50);
        let stepped: Vec<f64> = (0..50).map(|_| b.step()).collect();
        assert_eq!(batch, stepped);
    }

    #[test]
    fn test_random_seed_redraws_degenerate_values() {
        use rand::rngs::mock::StepRng;

        // draws 0.0, then 0.0625
        let mut rng = StepRng::new(0, 1 << 60);
        assert_eq!(random_seed(&mut rng), 0.0625);

        // draws 0.25, then 0.3125
        let mut rng = StepRng::new(1 << 62, 1 << 60);
        assert_eq!(random_seed(&mut rng), 0.3125);
    }

    #[test]
    fn test_random_seed_is_valid() {
        let mut rng = rand::thread_rng();
        for _ in 0..100 {
            assert!(is_valid_seed(random_seed(&mut rng)));
        }
    }
}
