//! Multilayer Perceptron Classifier
//!
//! Logistic hidden layers, softmax output, cross-entropy loss with an L2
//! penalty, trained by mini-batch Adam. Inputs are standardised with the
//! training mean and standard deviation.

use super::{argmax, check_training_data, check_width, Classifier};
use crate::{Dataset, ModelError};
use ndarray::{Array1, Array2, Axis};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

const BETA_1: f64 = 0.9;
const BETA_2: f64 = 0.999;
const ADAM_EPSILON: f64 = 1e-8;

/// Network and optimiser configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Units per hidden layer
    pub hidden_layers: Vec<usize>,
    /// L2 penalty
    pub alpha: f64,
    pub learning_rate: f64,
    /// Maximum epochs
    pub max_iter: usize,
    pub batch_size: usize,
    /// Minimum loss improvement that resets the patience counter
    pub tolerance: f64,
    /// Epochs without improvement before stopping
    pub n_iter_no_change: usize,
    pub seed: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            hidden_layers: vec![100],
            alpha: 1e-4,
            learning_rate: 1e-3,
            max_iter: 2000,
            batch_size: 200,
            tolerance: 1e-4,
            n_iter_no_change: 10,
            seed: 0,
        }
    }
}

/// Adam moment estimates for one layer
#[derive(Debug, Clone)]
struct Moments {
    m_w: Array2<f64>,
    v_w: Array2<f64>,
    m_b: Array1<f64>,
    v_b: Array1<f64>,
}

/// Feed-forward neural network classifier
#[derive(Debug, Clone)]
pub struct NeuralNetwork {
    config: NetworkConfig,
    weights: Vec<Array2<f64>>,
    biases: Vec<Array1<f64>>,
    means: Array1<f64>,
    scales: Array1<f64>,
    loss_curve: Vec<f64>,
}

impl NeuralNetwork {
    pub fn new(config: NetworkConfig) -> Self {
        Self {
            config,
            weights: Vec::new(),
            biases: Vec::new(),
            means: Array1::zeros(0),
            scales: Array1::zeros(0),
            loss_curve: Vec::new(),
        }
    }

    /// Mean training loss per epoch
    pub fn loss_curve(&self) -> &[f64] {
        &self.loss_curve
    }

    fn standardize(&self, features: &Array2<f64>) -> Array2<f64> {
        (features - &self.means) / &self.scales
    }

    /// Activations of every layer, input first and class probabilities last
    fn forward(&self, input: Array2<f64>) -> Vec<Array2<f64>> {
        let last = self.weights.len() - 1;
        let mut activations = Vec::with_capacity(self.weights.len() + 1);
        activations.push(input);

        for (layer, (w, b)) in self.weights.iter().zip(&self.biases).enumerate() {
            let mut z = activations[layer].dot(w) + b;
            if layer == last {
                softmax_rows(&mut z);
            } else {
                z.mapv_inplace(|v| 1.0 / (1.0 + (-v).exp()));
            }
            activations.push(z);
        }
        activations
    }

    fn initialize(&mut self, sizes: &[usize], rng: &mut ChaCha8Rng) {
        self.weights.clear();
        self.biases.clear();
        for pair in sizes.windows(2) {
            let (fan_in, fan_out) = (pair[0], pair[1]);
            // Glorot uniform with the factor used for logistic units
            let bound = (2.0 / (fan_in + fan_out) as f64).sqrt();
            self.weights
                .push(Array2::from_shape_fn((fan_in, fan_out), |_| rng.gen_range(-bound..bound)));
            self.biases
                .push(Array1::from_shape_fn(fan_out, |_| rng.gen_range(-bound..bound)));
        }
    }

    /// One Adam step on a mini-batch; returns the batch loss
    fn train_batch(
        &mut self,
        input: Array2<f64>,
        targets: &[usize],
        moments: &mut [Moments],
        step: i32,
    ) -> f64 {
        let batch = targets.len() as f64;
        let alpha = self.config.alpha;
        let activations = self.forward(input);
        let output = &activations[activations.len() - 1];

        let penalty: f64 = self.weights.iter().map(|w| w.mapv(|v| v * v).sum()).sum();
        let loss = -targets
            .iter()
            .enumerate()
            .map(|(i, &t)| output[[i, t]].max(1e-15).ln())
            .sum::<f64>()
            / batch
            + 0.5 * alpha * penalty / batch;

        let mut delta = output.clone();
        for (i, &t) in targets.iter().enumerate() {
            delta[[i, t]] -= 1.0;
        }
        delta /= batch;

        let mut gradients = Vec::with_capacity(self.weights.len());
        for layer in (0..self.weights.len()).rev() {
            let grad_w = activations[layer].t().dot(&delta) + &(&self.weights[layer] * (alpha / batch));
            let grad_b = delta.sum_axis(Axis(0));
            if layer > 0 {
                let a = &activations[layer];
                delta = delta.dot(&self.weights[layer].t()) * &a.mapv(|v| v * (1.0 - v));
            }
            gradients.push((layer, grad_w, grad_b));
        }

        let lr = self.config.learning_rate * (1.0 - BETA_2.powi(step)).sqrt() / (1.0 - BETA_1.powi(step));
        for (layer, grad_w, grad_b) in gradients {
            let m = &mut moments[layer];
            m.m_w.zip_mut_with(&grad_w, |m, g| *m = BETA_1 * *m + (1.0 - BETA_1) * g);
            m.v_w.zip_mut_with(&grad_w, |v, g| *v = BETA_2 * *v + (1.0 - BETA_2) * g * g);
            m.m_b.zip_mut_with(&grad_b, |m, g| *m = BETA_1 * *m + (1.0 - BETA_1) * g);
            m.v_b.zip_mut_with(&grad_b, |v, g| *v = BETA_2 * *v + (1.0 - BETA_2) * g * g);

            let update_w = &m.m_w / &m.v_w.mapv(|v| v.sqrt() + ADAM_EPSILON) * lr;
            let update_b = &m.m_b / &m.v_b.mapv(|v| v.sqrt() + ADAM_EPSILON) * lr;
            self.weights[layer] -= &update_w;
            self.biases[layer] -= &update_b;
        }

        loss
    }
}

fn softmax_rows(z: &mut Array2<f64>) {
    for mut row in z.rows_mut() {
        let max = row.fold(f64::NEG_INFINITY, |m, v| m.max(*v));
        row.mapv_inplace(|v| (v - max).exp());
        let sum = row.sum();
        row /= sum;
    }
}

impl Classifier for NeuralNetwork {
    fn name(&self) -> &'static str {
        "NeuralNetwork"
    }

    fn fit(&mut self, data: &Dataset) -> Result<(), ModelError> {
        check_training_data(data)?;
        if self.config.hidden_layers.iter().any(|&units| units == 0) {
            return Err(ModelError::InvalidParameter("hidden layers need at least one unit".to_string()));
        }
        if self.config.batch_size == 0 || self.config.max_iter == 0 {
            return Err(ModelError::InvalidParameter(
                "batch_size and max_iter must be positive".to_string(),
            ));
        }

        let (n, p) = data.features.dim();
        self.means = data.features.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(p));
        self.scales = data
            .features
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s > 1e-12 { s } else { 1.0 });
        let input = self.standardize(&data.features);

        let mut sizes = vec![p];
        sizes.extend(&self.config.hidden_layers);
        sizes.push(data.n_classes());

        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        self.initialize(&sizes, &mut rng);
        let mut moments: Vec<Moments> = self
            .weights
            .iter()
            .zip(&self.biases)
            .map(|(w, b)| Moments {
                m_w: Array2::zeros(w.dim()),
                v_w: Array2::zeros(w.dim()),
                m_b: Array1::zeros(b.len()),
                v_b: Array1::zeros(b.len()),
            })
            .collect();

        let batch_size = self.config.batch_size.min(n);
        let mut order: Vec<usize> = (0..n).collect();
        let mut best_loss = f64::INFINITY;
        let mut stale = 0;
        let mut step = 0;
        self.loss_curve.clear();

        for epoch in 0..self.config.max_iter {
            order.shuffle(&mut rng);
            let mut epoch_loss = 0.0;

            for chunk in order.chunks(batch_size) {
                step += 1;
                let batch = input.select(Axis(0), chunk);
                let targets: Vec<usize> = chunk.iter().map(|&r| data.targets[r]).collect();
                epoch_loss += self.train_batch(batch, &targets, &mut moments, step) * chunk.len() as f64;
            }

            let epoch_loss = epoch_loss / n as f64;
            self.loss_curve.push(epoch_loss);

            if epoch_loss > best_loss - self.config.tolerance {
                stale += 1;
            } else {
                stale = 0;
            }
            best_loss = best_loss.min(epoch_loss);

            if stale > self.config.n_iter_no_change {
                debug!("Network converged after {} epochs, loss {:.5}", epoch + 1, epoch_loss);
                break;
            }
        }

        Ok(())
    }

    fn predict(&self, features: &Array2<f64>) -> Result<Vec<usize>, ModelError> {
        if self.weights.is_empty() {
            return Err(ModelError::NotFitted("NeuralNetwork"));
        }
        check_width(self.means.len(), features)?;

        let activations = self.forward(self.standardize(features));
        let output = &activations[activations.len() - 1];
        Ok(output
            .rows()
            .into_iter()
            .map(|row| argmax(&row.to_vec()))
            .collect())
    }
}
