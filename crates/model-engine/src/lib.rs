//! Model Engine
//!
//! In-house classifiers (decision tree, random forest, k-nearest neighbours,
//! Gaussian naive Bayes, multilayer perceptron), cross-validated grid
//! search, greedy forward feature selection and the evaluator that scores
//! every classifier on every candidate feature set.

mod artifact;
mod classifiers;
mod dataset;
mod error;
mod evaluator;
mod grid_search;
mod metrics;
mod selection;

#[cfg(test)]
pub(crate) mod test_support;

pub use artifact::{DataFingerprint, SelectionArtifact, ARTIFACT_VERSION};
pub use classifiers::{
    Classifier, Criterion, DecisionTree, ForestConfig, GaussianNaiveBayes, KNearestNeighbors, NetworkConfig,
    NeuralNetwork, RandomForest, TreeConfig,
};
pub use dataset::Dataset;
pub use error::ModelError;
pub use evaluator::{
    evaluate, BestCell, EvaluationConfig, EvaluationOutcome, ModelKind, ScoreRecord, ScoreTable,
};
pub use grid_search::{grid_search, GridResult};
pub use metrics::{accuracy, ConfusionMatrix};
pub use selection::{forward_selection, SelectionConfig, SelectionResult};
