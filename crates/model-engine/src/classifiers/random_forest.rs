//! Random Forest Classifier

use super::{argmax, check_training_data, check_width, Classifier, Criterion, DecisionTree, TreeConfig};
use crate::{Dataset, ModelError};
use ndarray::Array2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Random forest configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestConfig {
    /// Number of trees
    pub n_estimators: usize,
    pub criterion: Criterion,
    pub min_samples_leaf: usize,
    pub max_depth: Option<usize>,
    /// Features considered per split (None = ceil(sqrt(n_features)))
    pub max_features: Option<usize>,
    /// Draw each tree's rows with replacement
    pub bootstrap: bool,
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_estimators: 10,
            criterion: Criterion::Gini,
            min_samples_leaf: 5,
            max_depth: None,
            max_features: None,
            bootstrap: true,
            seed: 0,
        }
    }
}

/// Bagged ensemble of decision trees, fitted in parallel
#[derive(Debug, Clone)]
pub struct RandomForest {
    config: ForestConfig,
    trees: Vec<DecisionTree>,
    n_classes: usize,
}

impl RandomForest {
    pub fn new(config: ForestConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            n_classes: 0,
        }
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Mean leaf class distribution over all trees, per row
    pub fn predict_proba(&self, features: &Array2<f64>) -> Result<Vec<Vec<f64>>, ModelError> {
        let first = self.trees.first().ok_or(ModelError::NotFitted("RandomForest"))?;
        check_width(first.n_features(), features)?;

        (0..features.nrows())
            .into_par_iter()
            .map(|r| -> Result<Vec<f64>, ModelError> {
                let row = features.row(r);
                let mut mean = vec![0.0; self.n_classes];
                for tree in &self.trees {
                    for (m, p) in mean.iter_mut().zip(tree.predict_proba_row(row)?) {
                        *m += p;
                    }
                }
                let n = self.trees.len() as f64;
                Ok(mean.into_iter().map(|m| m / n).collect())
            })
            .collect()
    }
}

impl Classifier for RandomForest {
    fn name(&self) -> &'static str {
        "RandomForest"
    }

    fn fit(&mut self, data: &Dataset) -> Result<(), ModelError> {
        check_training_data(data)?;
        if self.config.n_estimators == 0 {
            return Err(ModelError::InvalidParameter("n_estimators must be at least 1".to_string()));
        }

        let n = data.n_samples();
        let max_features = self
            .config
            .max_features
            .unwrap_or_else(|| (data.n_features() as f64).sqrt().ceil() as usize);

        let trees = (0..self.config.n_estimators)
            .into_par_iter()
            .map(|i| -> Result<DecisionTree, ModelError> {
                let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed.wrapping_add(i as u64));
                let rows: Vec<usize> = if self.config.bootstrap {
                    (0..n).map(|_| rng.gen_range(0..n)).collect()
                } else {
                    (0..n).collect()
                };

                let mut tree = DecisionTree::new(TreeConfig {
                    criterion: self.config.criterion,
                    min_samples_leaf: self.config.min_samples_leaf,
                    min_samples_split: 2,
                    max_depth: self.config.max_depth,
                    max_features: Some(max_features),
                    seed: rng.gen(),
                });
                tree.fit_rows(data, &rows)?;
                Ok(tree)
            })
            .collect::<Result<Vec<_>, ModelError>>()?;

        debug!(
            "Fitted {} trees (max_features {}, min_samples_leaf {})",
            trees.len(),
            max_features,
            self.config.min_samples_leaf
        );
        self.trees = trees;
        self.n_classes = data.n_classes();
        Ok(())
    }

    fn predict(&self, features: &Array2<f64>) -> Result<Vec<usize>, ModelError> {
        Ok(self.predict_proba(features)?.iter().map(|p| argmax(p)).collect())
    }
}
