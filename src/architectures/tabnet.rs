//! TabNet Architecture
//!
//! TabNet: Attentive Interpretable Tabular Learning
//! Based on the paper: https://arxiv.org/abs/1908.07442
//!
//! Each decision step learns a sparse feature mask from the previous step's
//! attention output, scaled by a prior that discourages reusing features.
//! The masked input goes through a feature transformer whose output is split
//! into a decision part (aggregated for the head) and an attention part
//! (driving the next mask).

use ndarray::{s, Array1, Array2, Axis};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

use super::layers::{relu, relu_grad, softmax_2d, xavier, Adam, RunningNorm, Sparsemax};
use crate::error::{ChaosError, Result};
use crate::optimizer::HyperparameterConfig;
use crate::training::{FitReport, TrainableClassifier};

const MASK_EPS: f64 = 1e-15;

/// TabNet configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TabNetConfig {
    /// Number of decision steps
    pub n_steps: usize,
    /// Width of the decision output of each step
    pub n_d: usize,
    /// Width of the attention output of each step
    pub n_a: usize,
    /// Relaxation factor for feature reuse
    pub gamma: f64,
    /// Sparsity regularization coefficient
    pub lambda_sparse: f64,
    /// Momentum of the input normalisation statistics
    pub momentum: f64,
    pub learning_rate: f64,
    /// Epoch budget
    pub max_epochs: usize,
    /// Epochs without validation improvement before stopping
    pub patience: usize,
    pub batch_size: usize,
    /// Seed for weight init and batch shuffling
    pub random_state: u64,
}

impl Default for TabNetConfig {
    fn default() -> Self {
        Self::from_hyperparameters(&HyperparameterConfig::default())
    }
}

impl TabNetConfig {
    /// Architecture taken from a search candidate, default training budget
    pub fn from_hyperparameters(params: &HyperparameterConfig) -> Self {
        Self {
            n_steps: params.n_steps,
            n_d: params.n_d,
            n_a: params.n_a,
            gamma: params.gamma,
            lambda_sparse: params.lambda_sparse,
            momentum: params.momentum,
            learning_rate: params.learning_rate,
            max_epochs: 50,
            patience: 20,
            batch_size: 256,
            random_state: 0,
        }
    }

    /// Keep this budget, replace the architecture
    pub fn with_hyperparameters(&self, params: &HyperparameterConfig) -> Self {
        Self {
            max_epochs: self.max_epochs,
            patience: self.patience,
            batch_size: self.batch_size,
            random_state: self.random_state,
            ..Self::from_hyperparameters(params)
        }
    }

    pub fn with_max_epochs(mut self, max_epochs: usize) -> Self {
        self.max_epochs = max_epochs;
        self
    }

    pub fn with_patience(mut self, patience: usize) -> Self {
        self.patience = patience;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    fn validate(&self) -> Result<()> {
        let checks: [(&str, bool, String); 5] = [
            ("n_steps", self.n_steps >= 1, self.n_steps.to_string()),
            ("n_d", self.n_d >= 1, self.n_d.to_string()),
            ("n_a", self.n_a >= 1, self.n_a.to_string()),
            ("batch_size", self.batch_size >= 1, self.batch_size.to_string()),
            (
                "learning_rate",
                self.learning_rate.is_finite() && self.learning_rate > 0.0,
                self.learning_rate.to_string(),
            ),
        ];
        for (name, ok, value) in checks {
            if !ok {
                return Err(ChaosError::InvalidParameter {
                    name: name.to_string(),
                    value,
                    reason: "must be positive".to_string(),
                });
            }
        }
        Ok(())
    }
}

impl From<&HyperparameterConfig> for TabNetConfig {
    fn from(params: &HyperparameterConfig) -> Self {
        Self::from_hyperparameters(params)
    }
}

/// Learnable tensors. Biases are single-row matrices.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TabNetWeights {
    init_w: Array2<f64>,
    init_b: Array2<f64>,
    att_w: Vec<Array2<f64>>,
    ft_w: Vec<Array2<f64>>,
    ft_b: Vec<Array2<f64>>,
    out_w: Array2<f64>,
    out_b: Array2<f64>,
}

impl TabNetWeights {
    fn init(config: &TabNetConfig, n_features: usize, n_classes: usize, rng: &mut Xoshiro256PlusPlus) -> Self {
        let width = config.n_d + config.n_a;
        Self {
            init_w: xavier(rng, n_features, config.n_a),
            init_b: Array2::zeros((1, config.n_a)),
            att_w: (0..config.n_steps)
                .map(|_| xavier(rng, config.n_a, n_features))
                .collect(),
            ft_w: (0..config.n_steps)
                .map(|_| xavier(rng, n_features, width))
                .collect(),
            ft_b: (0..config.n_steps).map(|_| Array2::zeros((1, width))).collect(),
            out_w: xavier(rng, config.n_d, n_classes),
            out_b: Array2::zeros((1, n_classes)),
        }
    }

    fn tensors(&self) -> Vec<&Array2<f64>> {
        let mut out = vec![&self.init_w, &self.init_b];
        out.extend(self.att_w.iter());
        out.extend(self.ft_w.iter());
        out.extend(self.ft_b.iter());
        out.push(&self.out_w);
        out.push(&self.out_b);
        out
    }

    fn tensors_mut(&mut self) -> Vec<&mut Array2<f64>> {
        let mut out = vec![&mut self.init_w, &mut self.init_b];
        out.extend(self.att_w.iter_mut());
        out.extend(self.ft_w.iter_mut());
        out.extend(self.ft_b.iter_mut());
        out.push(&mut self.out_w);
        out.push(&mut self.out_b);
        out
    }
}

struct StepCache {
    attention_in: Array2<f64>,
    prior: Array2<f64>,
    mask: Array2<f64>,
    masked: Array2<f64>,
    hidden_pre: Array2<f64>,
}

struct ForwardPass {
    x: Array2<f64>,
    init_pre: Array2<f64>,
    steps: Vec<StepCache>,
    aggregated: Array2<f64>,
    probabilities: Array2<f64>,
}

/// Attentive tabular classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TabNetClassifier {
    config: TabNetConfig,
    weights: Option<TabNetWeights>,
    norm: Option<RunningNorm>,
    n_features: usize,
    n_classes: usize,
    feature_importances: Option<Array1<f64>>,
    is_fitted: bool,
}

impl TabNetClassifier {
    pub fn new(config: TabNetConfig) -> Self {
        Self {
            config,
            weights: None,
            norm: None,
            n_features: 0,
            n_classes: 0,
            feature_importances: None,
            is_fitted: false,
        }
    }

    pub fn config(&self) -> &TabNetConfig {
        &self.config
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    fn forward(&self, weights: &TabNetWeights, x: Array2<f64>) -> ForwardPass {
        let n_d = self.config.n_d;
        let gamma = self.config.gamma;
        let batch = x.nrows();

        let init_pre = x.dot(&weights.init_w) + &weights.init_b.row(0);
        let mut attention = relu(&init_pre);
        let mut prior = Array2::<f64>::ones(x.raw_dim());
        let mut aggregated = Array2::<f64>::zeros((batch, n_d));
        let mut steps = Vec::with_capacity(self.config.n_steps);

        for step in 0..self.config.n_steps {
            let logits = attention.dot(&weights.att_w[step]) * &prior;
            let mask = Sparsemax.forward_batch(&logits);
            let masked = &mask * &x;
            let hidden_pre = masked.dot(&weights.ft_w[step]) + &weights.ft_b[step].row(0);
            let hidden = relu(&hidden_pre);

            aggregated += &hidden.slice(s![.., ..n_d]);
            let next_attention = hidden.slice(s![.., n_d..]).to_owned();
            let next_prior = &prior * &mask.mapv(|m| gamma - m);

            steps.push(StepCache {
                attention_in: attention,
                prior,
                mask,
                masked,
                hidden_pre,
            });
            attention = next_attention;
            prior = next_prior;
        }

        let logits = aggregated.dot(&weights.out_w) + &weights.out_b.row(0);
        ForwardPass {
            x,
            init_pre,
            steps,
            aggregated,
            probabilities: softmax_2d(&logits),
        }
    }

    /// Cross-entropy plus the mask entropy penalty
    fn loss(&self, pass: &ForwardPass, y: &[usize]) -> f64 {
        let batch = y.len() as f64;
        let ce = y
            .iter()
            .enumerate()
            .map(|(i, &c)| -(pass.probabilities[[i, c]] + MASK_EPS).ln())
            .sum::<f64>()
            / batch;
        let entropy: f64 = pass
            .steps
            .iter()
            .map(|st| st.mask.iter().map(|&m| -m * (m + MASK_EPS).ln()).sum::<f64>())
            .sum();
        ce + self.config.lambda_sparse * entropy / (batch * self.config.n_steps as f64)
    }

    /// Gradients in `TabNetWeights::tensors` order
    fn backward(&self, weights: &TabNetWeights, pass: &ForwardPass, y: &[usize]) -> Vec<Array2<f64>> {
        let n_d = self.config.n_d;
        let n_steps = self.config.n_steps;
        let batch = y.len() as f64;
        let sparsity = self.config.lambda_sparse / (batch * n_steps as f64);

        let mut d_logits = pass.probabilities.clone();
        for (i, &c) in y.iter().enumerate() {
            d_logits[[i, c]] -= 1.0;
        }
        d_logits /= batch;

        let d_out_w = pass.aggregated.t().dot(&d_logits);
        let d_out_b = d_logits.sum_axis(Axis(0)).insert_axis(Axis(0));
        let d_aggregated = d_logits.dot(&weights.out_w.t());

        let mut d_att_w = vec![Array2::zeros((0, 0)); n_steps];
        let mut d_ft_w = vec![Array2::zeros((0, 0)); n_steps];
        let mut d_ft_b = vec![Array2::zeros((0, 0)); n_steps];
        let mut d_attention = Array2::<f64>::zeros((y.len(), self.config.n_a));

        for step in (0..n_steps).rev() {
            let cache = &pass.steps[step];

            let mut d_hidden = Array2::<f64>::zeros(cache.hidden_pre.raw_dim());
            d_hidden.slice_mut(s![.., ..n_d]).assign(&d_aggregated);
            d_hidden.slice_mut(s![.., n_d..]).assign(&d_attention);
            let d_hidden_pre = d_hidden * relu_grad(&cache.hidden_pre);

            d_ft_w[step] = cache.masked.t().dot(&d_hidden_pre);
            d_ft_b[step] = d_hidden_pre.sum_axis(Axis(0)).insert_axis(Axis(0));

            // prior is treated as a constant
            let d_masked = d_hidden_pre.dot(&weights.ft_w[step].t());
            let d_mask = &d_masked * &pass.x
                - &cache.mask.mapv(|m| sparsity * ((m + MASK_EPS).ln() + m / (m + MASK_EPS)));
            let d_scores = Sparsemax.backward_batch(&cache.mask, &d_mask) * &cache.prior;

            d_att_w[step] = cache.attention_in.t().dot(&d_scores);
            d_attention = d_scores.dot(&weights.att_w[step].t());
        }

        let d_init_pre = d_attention * relu_grad(&pass.init_pre);
        let d_init_w = pass.x.t().dot(&d_init_pre);
        let d_init_b = d_init_pre.sum_axis(Axis(0)).insert_axis(Axis(0));

        let mut grads = vec![d_init_w, d_init_b];
        grads.extend(d_att_w);
        grads.extend(d_ft_w);
        grads.extend(d_ft_b);
        grads.push(d_out_w);
        grads.push(d_out_b);
        grads
    }

    fn check_input(&self, x: &Array2<f64>) -> Result<(&TabNetWeights, &RunningNorm)> {
        let (weights, norm) = match (&self.weights, &self.norm) {
            (Some(w), Some(n)) if self.is_fitted => (w, n),
            _ => return Err(ChaosError::ModelNotFitted),
        };
        if x.ncols() != self.n_features {
            return Err(ChaosError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }
        Ok((weights, norm))
    }

    /// Per-row feature attributions: masks weighted by each step's decision magnitude
    pub fn explain(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let (weights, norm) = self.check_input(x)?;
        let pass = self.forward(weights, norm.apply(x));
        Ok(Self::aggregate_masks(&pass, self.config.n_d))
    }

    fn aggregate_masks(pass: &ForwardPass, n_d: usize) -> Array2<f64> {
        let mut explain = Array2::<f64>::zeros(pass.x.raw_dim());
        for cache in &pass.steps {
            let contribution = relu(&cache.hidden_pre.slice(s![.., ..n_d]).to_owned())
                .sum_axis(Axis(1))
                .insert_axis(Axis(1));
            explain += &(&cache.mask * &contribution);
        }
        explain
    }

    fn accuracy_on(&self, weights: &TabNetWeights, norm: &RunningNorm, x: &Array2<f64>, y: &Array1<usize>) -> f64 {
        if y.is_empty() {
            return 0.0;
        }
        let pass = self.forward(weights, norm.apply(x));
        let correct = argmax_rows(&pass.probabilities)
            .iter()
            .zip(y.iter())
            .filter(|(p, t)| p == t)
            .count();
        correct as f64 / y.len() as f64
    }

    fn validate_training_data(
        x_train: &Array2<f64>,
        y_train: &Array1<usize>,
        x_valid: &Array2<f64>,
        y_valid: &Array1<usize>,
    ) -> Result<usize> {
        if x_train.nrows() != y_train.len() {
            return Err(ChaosError::ShapeError {
                expected: format!("{} training labels", x_train.nrows()),
                actual: format!("{} training labels", y_train.len()),
            });
        }
        if x_valid.nrows() != y_valid.len() {
            return Err(ChaosError::ShapeError {
                expected: format!("{} validation labels", x_valid.nrows()),
                actual: format!("{} validation labels", y_valid.len()),
            });
        }
        if x_train.ncols() == 0 || x_valid.ncols() != x_train.ncols() {
            return Err(ChaosError::ShapeError {
                expected: format!("{} features in both sets", x_train.ncols()),
                actual: format!("{} validation features", x_valid.ncols()),
            });
        }
        if x_train.iter().any(|v| !v.is_finite()) {
            return Err(ChaosError::TrainingError(
                "training matrix contains non-finite values".to_string(),
            ));
        }

        let mut classes: Vec<usize> = y_train.to_vec();
        classes.sort_unstable();
        classes.dedup();
        if classes.len() < 2 {
            return Err(ChaosError::TrainingError(format!(
                "need at least 2 classes to train, found {}",
                classes.len()
            )));
        }
        let max_label = y_train.iter().chain(y_valid.iter()).copied().max().unwrap_or(0);
        Ok(max_label + 1)
    }
}

impl TrainableClassifier for TabNetClassifier {
    fn fit(
        &mut self,
        x_train: &Array2<f64>,
        y_train: &Array1<usize>,
        x_valid: &Array2<f64>,
        y_valid: &Array1<usize>,
    ) -> Result<FitReport> {
        self.config.validate()?;
        let n_classes = Self::validate_training_data(x_train, y_train, x_valid, y_valid)?;
        let start = Instant::now();

        self.n_features = x_train.ncols();
        self.n_classes = n_classes;

        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.config.random_state);
        let mut weights = TabNetWeights::init(&self.config, self.n_features, n_classes, &mut rng);
        let mut norm = RunningNorm::from_data(x_train, self.config.momentum);
        let mut adam = Adam::new(self.config.learning_rate, &weights.tensors());

        let n_samples = x_train.nrows();
        let mut indices: Vec<usize> = (0..n_samples).collect();
        let mut best = (weights.clone(), norm.clone());
        let mut best_accuracy = f64::NEG_INFINITY;
        let mut best_epoch = 0;
        let mut patience_counter = 0;
        let mut epochs_run = 0;
        let mut last_loss = f64::NAN;

        for epoch in 0..self.config.max_epochs {
            indices.shuffle(&mut rng);
            let mut epoch_loss = 0.0;
            let mut n_batches = 0;

            for batch_indices in indices.chunks(self.config.batch_size) {
                let x_batch = x_train.select(Axis(0), batch_indices);
                let y_batch: Vec<usize> = batch_indices.iter().map(|&i| y_train[i]).collect();

                norm.update(&x_batch);
                let pass = self.forward(&weights, norm.apply(&x_batch));
                let loss = self.loss(&pass, &y_batch);
                if !loss.is_finite() {
                    return Err(ChaosError::TrainingError(format!(
                        "training diverged at epoch {} (loss {})",
                        epoch, loss
                    )));
                }
                let grads = self.backward(&weights, &pass, &y_batch);
                adam.step(weights.tensors_mut(), &grads);

                epoch_loss += loss;
                n_batches += 1;
            }

            epochs_run = epoch + 1;
            last_loss = epoch_loss / n_batches.max(1) as f64;
            let accuracy = self.accuracy_on(&weights, &norm, x_valid, y_valid);
            debug!(epoch, loss = last_loss, valid_accuracy = accuracy, "epoch finished");

            if accuracy > best_accuracy {
                best_accuracy = accuracy;
                best_epoch = epoch;
                best = (weights.clone(), norm.clone());
                patience_counter = 0;
            } else {
                patience_counter += 1;
                if patience_counter >= self.config.patience {
                    debug!(epoch, best_epoch, "early stopping");
                    break;
                }
            }
        }

        let (weights, norm) = best;
        let importances = if x_valid.nrows() > 0 { x_valid } else { x_train };
        let pass = self.forward(&weights, norm.apply(importances));
        let totals = Self::aggregate_masks(&pass, self.config.n_d).sum_axis(Axis(0));
        let total: f64 = totals.sum();
        self.feature_importances = Some(if total > 0.0 {
            totals / total
        } else {
            Array1::from_elem(self.n_features, 1.0 / self.n_features as f64)
        });

        self.weights = Some(weights);
        self.norm = Some(norm);
        self.is_fitted = true;

        let report = FitReport {
            epochs_run,
            best_epoch,
            best_valid_accuracy: best_accuracy.max(0.0),
            final_train_loss: last_loss,
            training_time_secs: start.elapsed().as_secs_f64(),
        };
        info!(
            epochs = report.epochs_run,
            best_epoch = report.best_epoch,
            valid_accuracy = report.best_valid_accuracy,
            "TabNet fit complete"
        );
        Ok(report)
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let (weights, norm) = self.check_input(x)?;
        Ok(self.forward(weights, norm.apply(x)).probabilities)
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<usize>> {
        Ok(argmax_rows(&self.predict_proba(x)?))
    }

    fn feature_importances(&self) -> Option<Array1<f64>> {
        self.feature_importances.clone()
    }
}

fn argmax_rows(probabilities: &Array2<f64>) -> Array1<usize> {
    probabilities
        .rows()
        .into_iter()
        .map(|row| {
            row.iter()
                .enumerate()
                .fold((0, f64::NEG_INFINITY), |(bi, bv), (i, &v)| if v > bv { (i, v) } else { (bi, bv) })
                .0
        })
        .collect()
}
