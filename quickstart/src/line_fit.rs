use federated_client::{EvaluateSummary, Model, TrainSummary};
use log::debug;
use ndarray::{Array1, Axis};
use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::synthetic::SyntheticDataset;

#[derive(Debug, thiserror::Error)]
pub enum LineFitError {
    #[error("dataset is empty")]
    EmptyDataset,
    #[error("dataset has {got} features but the model has {expected} weights")]
    DimensionMismatch { got: usize, expected: usize },
}

/// Linear model `y = x·w + b` fitted with mini-batch SGD on squared error.
#[derive(Clone, Debug)]
pub struct LineFitModel {
    weights: Array1<f64>,
    bias: f64,
    learning_rate: f64,
    num_iterations: usize,
    batch_size: usize,
    rng: StdRng,
}

impl LineFitModel {
    pub fn new(
        dims: usize,
        learning_rate: f64,
        num_iterations: usize,
        batch_size: usize,
        seed: u64,
    ) -> Self {
        Self {
            weights: Array1::zeros(dims),
            bias: 0.0,
            learning_rate,
            num_iterations,
            batch_size: batch_size.max(1),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn predict(&self, dataset: &SyntheticDataset) -> Array1<f64> {
        dataset.points().dot(&self.weights) + self.bias
    }

    fn check(&self, dataset: &SyntheticDataset) -> Result<(), LineFitError> {
        if dataset.is_empty() {
            return Err(LineFitError::EmptyDataset);
        }
        if dataset.dims() != self.weights.len() {
            return Err(LineFitError::DimensionMismatch {
                got: dataset.dims(),
                expected: self.weights.len(),
            });
        }
        Ok(())
    }

    /// Mean squared and mean absolute error over the whole dataset.
    fn errors(&self, dataset: &SyntheticDataset) -> (f64, f64) {
        let residuals = self.predict(dataset) - dataset.targets();
        let n = residuals.len() as f64;
        let mse = residuals.mapv(|r| r * r).sum() / n;
        let mae = residuals.mapv(f64::abs).sum() / n;
        (mse, mae)
    }
}

impl Model for LineFitModel {
    type Dataset = SyntheticDataset;
    type Error = LineFitError;

    fn weights(&self) -> Vec<f64> {
        self.weights.to_vec()
    }

    fn set_weights(&mut self, weights: Vec<f64>) {
        self.weights = Array1::from(weights);
    }

    fn bias(&self) -> f64 {
        self.bias
    }

    fn set_bias(&mut self, bias: f64) {
        self.bias = bias;
    }

    fn train(&mut self, dataset: &SyntheticDataset) -> Result<TrainSummary, LineFitError> {
        self.check(dataset)?;
        let n = dataset.len();
        let batch_size = self.batch_size.min(n);
        let scale = 2.0 / batch_size as f64;

        for _ in 0..self.num_iterations {
            let batch: Vec<usize> = (0..batch_size)
                .map(|_| self.rng.random_range(0..n))
                .collect();
            let points = dataset.points().select(Axis(0), &batch);
            let targets = dataset.targets().select(Axis(0), &batch);

            let residuals = points.dot(&self.weights) + self.bias - targets;
            let grad_weights = points.t().dot(&residuals) * scale;
            let grad_bias = residuals.sum() * scale;

            self.weights.scaled_add(-self.learning_rate, &grad_weights);
            self.bias -= self.learning_rate * grad_bias;
        }

        let (mse, mae) = self.errors(dataset);
        debug!(mse = mse, mae = mae; "trained line fit model");
        Ok(TrainSummary {
            num_examples: n as u64,
            loss: mse as f32,
            metric: mae,
        })
    }

    fn evaluate(&mut self, dataset: &SyntheticDataset) -> Result<EvaluateSummary, LineFitError> {
        self.check(dataset)?;
        let (mse, mae) = self.errors(dataset);
        Ok(EvaluateSummary {
            num_examples: dataset.len() as u64,
            loss: mse,
            metric: mae,
        })
    }
}
