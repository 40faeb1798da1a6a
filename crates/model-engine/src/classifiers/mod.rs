//! Classifier Implementations

mod decision_tree;
mod knn;
mod naive_bayes;
mod neural_network;
mod random_forest;

pub use decision_tree::{Criterion, DecisionTree, TreeConfig};
pub use knn::KNearestNeighbors;
pub use naive_bayes::GaussianNaiveBayes;
pub use neural_network::{NetworkConfig, NeuralNetwork};
pub use random_forest::{ForestConfig, RandomForest};

use crate::{Dataset, ModelError};
use ndarray::Array2;

/// Common interface of every model the evaluator trains
pub trait Classifier: Send + Sync {
    /// Short model name used in log lines
    fn name(&self) -> &'static str;

    /// Train on every sample of `data`
    fn fit(&mut self, data: &Dataset) -> Result<(), ModelError>;

    /// Class index per row of `features`
    fn predict(&self, features: &Array2<f64>) -> Result<Vec<usize>, ModelError>;
}

/// Reject empty or degenerate training data
pub(crate) fn check_training_data(data: &Dataset) -> Result<(), ModelError> {
    if data.is_empty() {
        return Err(ModelError::EmptyDataset);
    }
    if data.n_features() == 0 {
        return Err(ModelError::InvalidData("no feature columns".to_string()));
    }
    if data.n_classes() == 0 {
        return Err(ModelError::InvalidData("no class labels".to_string()));
    }
    Ok(())
}

/// Reject prediction input whose width differs from the training data
pub(crate) fn check_width(expected: usize, features: &Array2<f64>) -> Result<(), ModelError> {
    if features.ncols() != expected {
        return Err(ModelError::DimensionMismatch {
            expected,
            actual: features.ncols(),
        });
    }
    Ok(())
}

/// Index of the largest value, lowest index on ties
pub(crate) fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate() {
        if *v > values[best] {
            best = i;
        }
    }
    best
}
