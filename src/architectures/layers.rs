//! Building blocks for attentive tabular architectures

use ndarray::{Array1, Array2, Axis};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Input normalisation driven by running statistics
///
/// Statistics are seeded from the full training matrix and then follow each
/// mini-batch with the configured momentum. Inputs are always normalised with
/// the running values, so evaluation and training see the same transform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunningNorm {
    momentum: f64,
    eps: f64,
    running_mean: Array1<f64>,
    running_var: Array1<f64>,
}

impl RunningNorm {
    /// Create with statistics taken from `x`
    pub fn from_data(x: &Array2<f64>, momentum: f64) -> Self {
        let n = x.ncols();
        let running_mean = x.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(n));
        let running_var = if x.nrows() > 0 {
            x.var_axis(Axis(0), 0.0)
        } else {
            Array1::ones(n)
        };
        Self {
            momentum,
            eps: 1e-5,
            running_mean,
            running_var,
        }
    }

    /// Fold a training batch into the running statistics
    pub fn update(&mut self, batch: &Array2<f64>) {
        if let Some(mean) = batch.mean_axis(Axis(0)) {
            let var = batch.var_axis(Axis(0), 0.0);
            self.running_mean = &self.running_mean * (1.0 - self.momentum) + &mean * self.momentum;
            self.running_var = &self.running_var * (1.0 - self.momentum) + &var * self.momentum;
        }
    }

    /// Normalise with the running statistics
    pub fn apply(&self, x: &Array2<f64>) -> Array2<f64> {
        let std = self.running_var.mapv(|v| (v + self.eps).sqrt());
        (x - &self.running_mean) / &std
    }
}

/// Sparsemax activation function
///
/// Projects onto the probability simplex, producing sparse outputs.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sparsemax;

impl Sparsemax {
    /// Apply sparsemax to a single vector
    pub fn forward(&self, x: &[f64]) -> Vec<f64> {
        let mut sorted: Vec<f64> = x.to_vec();
        sorted.sort_by(|a, b| b.total_cmp(a));

        let mut cumsum = 0.0;
        let mut k = 0;
        let mut support_sum = 0.0;
        for (i, &val) in sorted.iter().enumerate() {
            cumsum += val;
            if 1.0 + (i + 1) as f64 * val > cumsum {
                k = i + 1;
                support_sum = cumsum;
            }
        }

        let tau = (support_sum - 1.0) / k.max(1) as f64;
        x.iter().map(|&xi| (xi - tau).max(0.0)).collect()
    }

    /// Apply sparsemax to each row of a 2D array
    pub fn forward_batch(&self, x: &Array2<f64>) -> Array2<f64> {
        let mut result = Array2::zeros(x.raw_dim());
        for (i, row) in x.rows().into_iter().enumerate() {
            let sparse_row = self.forward(&row.to_vec());
            result.row_mut(i).assign(&Array1::from(sparse_row));
        }
        result
    }

    /// Gradient with respect to the sparsemax input.
    ///
    /// On the support the upstream gradient is centred; elsewhere it is zero.
    pub fn backward_batch(&self, output: &Array2<f64>, grad: &Array2<f64>) -> Array2<f64> {
        let mut result = Array2::zeros(grad.raw_dim());
        for ((out_row, grad_row), mut res_row) in output
            .rows()
            .into_iter()
            .zip(grad.rows())
            .zip(result.rows_mut())
        {
            let (sum, count) = out_row
                .iter()
                .zip(grad_row.iter())
                .filter(|&(&p, _)| p > 0.0)
                .fold((0.0, 0usize), |(s, c), (_, &g)| (s + g, c + 1));
            let mean = if count > 0 { sum / count as f64 } else { 0.0 };
            for ((r, &p), &g) in res_row.iter_mut().zip(out_row.iter()).zip(grad_row.iter()) {
                *r = if p > 0.0 { g - mean } else { 0.0 };
            }
        }
        result
    }
}

/// Softmax over rows of 2D array
pub fn softmax_2d(x: &Array2<f64>) -> Array2<f64> {
    let mut result = x.clone();
    for mut row in result.rows_mut() {
        let max_val = row.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let exp: Array1<f64> = row.mapv(|v| (v - max_val).exp());
        let sum: f64 = exp.sum();
        row.assign(&(exp / sum));
    }
    result
}

pub fn relu(x: &Array2<f64>) -> Array2<f64> {
    x.mapv(|v| v.max(0.0))
}

pub fn relu_grad(pre: &Array2<f64>) -> Array2<f64> {
    pre.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 })
}

/// Xavier/Glorot uniform initialisation
pub fn xavier<R: Rng>(rng: &mut R, n_in: usize, n_out: usize) -> Array2<f64> {
    let scale = (6.0 / (n_in + n_out) as f64).sqrt();
    Array2::from_shape_fn((n_in, n_out), |_| rng.gen::<f64>() * 2.0 * scale - scale)
}

/// Adam optimiser state over a fixed list of parameter tensors
#[derive(Debug, Clone)]
pub struct Adam {
    learning_rate: f64,
    beta1: f64,
    beta2: f64,
    eps: f64,
    t: i32,
    m: Vec<Array2<f64>>,
    v: Vec<Array2<f64>>,
}

impl Adam {
    /// Create state shaped like `params`
    pub fn new(learning_rate: f64, params: &[&Array2<f64>]) -> Self {
        Self {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            eps: 1e-8,
            t: 0,
            m: params.iter().map(|p| Array2::zeros(p.raw_dim())).collect(),
            v: params.iter().map(|p| Array2::zeros(p.raw_dim())).collect(),
        }
    }

    /// Apply one update; `params` and `grads` share the constructor's order
    pub fn step(&mut self, params: Vec<&mut Array2<f64>>, grads: &[Array2<f64>]) {
        self.t += 1;
        let bias1 = 1.0 - self.beta1.powi(self.t);
        let bias2 = 1.0 - self.beta2.powi(self.t);
        let (b1, b2, lr, eps) = (self.beta1, self.beta2, self.learning_rate, self.eps);

        for (((param, grad), m), v) in params
            .into_iter()
            .zip(grads)
            .zip(self.m.iter_mut())
            .zip(self.v.iter_mut())
        {
            m.zip_mut_with(grad, |m, &g| *m = b1 * *m + (1.0 - b1) * g);
            v.zip_mut_with(grad, |v, &g| *v = b2 * *v + (1.0 - b2) * g * g);
            ndarray::Zip::from(param)
                .and(&*m)
                .and(&*v)
                .for_each(|p, &m, &v| {
                    *p -= lr * (m / bias1) / ((v / bias2).sqrt() + eps);
                });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    #[test]
    fn test_sparsemax() {
        let out = Sparsemax.forward(&[2.0, 1.0, 0.1, -1.0]);

        // Output should sum to 1
        assert!((out.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        // Should be sparse (some zeros)
        assert!(out.iter().any(|&v| v == 0.0));
    }

    #[test]
    fn test_sparsemax_uniform_input() {
        let out = Sparsemax.forward(&[0.3, 0.3, 0.3, 0.3]);
        for v in out {
            assert!((v - 0.25).abs() < 1e-12);
        }
    }

    #[test]
    fn test_sparsemax_backward_centres_on_support() {
        let x = Array2::from_shape_vec((1, 3), vec![1.0, 0.9, -3.0]).unwrap();
        let out = Sparsemax.forward_batch(&x);
        let grad = Array2::from_shape_vec((1, 3), vec![1.0, 3.0, 5.0]).unwrap();
        let back = Sparsemax.backward_batch(&out, &grad);
        assert_eq!(back[[0, 0]], -1.0);
        assert_eq!(back[[0, 1]], 1.0);
        assert_eq!(back[[0, 2]], 0.0);
    }

    #[test]
    fn test_softmax_rows_sum_to_one() {
        let x = Array2::from_shape_vec((2, 3), vec![1.0, 2.0, 3.0, -1.0, 0.0, 1000.0]).unwrap();
        let s = softmax_2d(&x);
        for row in s.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_running_norm() {
        let x = Array2::from_shape_vec((4, 1), vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let norm = RunningNorm::from_data(&x, 0.02);
        let out = norm.apply(&x);
        assert!(out.mean().unwrap().abs() < 1e-12);
    }

    #[test]
    fn test_adam_descends_quadratic() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(1);
        let mut w = xavier(&mut rng, 2, 2);
        let mut adam = Adam::new(0.05, &[&w]);
        for _ in 0..500 {
            let grad = &w * 2.0;
            adam.step(vec![&mut w], &[grad]);
        }
        assert!(w.iter().all(|v| v.abs() < 1e-2));
    }
}
