//! CART Decision Tree Classifier

use super::{argmax, check_training_data, check_width, Classifier};
use crate::{Dataset, ModelError};
use ndarray::{Array2, ArrayView1};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Split quality measure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Criterion {
    Gini,
    Entropy,
}

impl Criterion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Criterion::Gini => "gini",
            Criterion::Entropy => "entropy",
        }
    }

    fn impurity(&self, counts: &[usize], total: usize) -> f64 {
        if total == 0 {
            return 0.0;
        }
        let total = total as f64;
        match self {
            Criterion::Gini => 1.0 - counts.iter().map(|&c| (c as f64 / total).powi(2)).sum::<f64>(),
            Criterion::Entropy => -counts
                .iter()
                .filter(|&&c| c > 0)
                .map(|&c| {
                    let p = c as f64 / total;
                    p * p.log2()
                })
                .sum::<f64>(),
        }
    }
}

/// Decision tree configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    pub criterion: Criterion,
    /// Minimum samples in each leaf
    pub min_samples_leaf: usize,
    /// Minimum samples required to split a node
    pub min_samples_split: usize,
    /// Maximum depth (None = unlimited)
    pub max_depth: Option<usize>,
    /// Features considered per split (None = all)
    pub max_features: Option<usize>,
    /// Seed of the per-node feature shuffle; decides ties between equally good splits
    pub seed: u64,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            criterion: Criterion::Gini,
            min_samples_leaf: 1,
            min_samples_split: 2,
            max_depth: None,
            max_features: None,
            seed: 0,
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        probabilities: Vec<f64>,
        n_samples: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    fn depth(&self) -> usize {
        match self {
            Node::Leaf { .. } => 1,
            Node::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }

    fn leaves(&self) -> Vec<usize> {
        match self {
            Node::Leaf { n_samples, .. } => vec![*n_samples],
            Node::Split { left, right, .. } => {
                let mut sizes = left.leaves();
                sizes.extend(right.leaves());
                sizes
            }
        }
    }
}

/// Decision tree model
#[derive(Debug, Clone)]
pub struct DecisionTree {
    config: TreeConfig,
    root: Option<Node>,
    n_features: usize,
    n_classes: usize,
}

impl DecisionTree {
    pub fn new(config: TreeConfig) -> Self {
        Self {
            config,
            root: None,
            n_features: 0,
            n_classes: 0,
        }
    }

    /// Train on the given rows of `data` (repeated rows count repeatedly)
    pub fn fit_rows(&mut self, data: &Dataset, rows: &[usize]) -> Result<(), ModelError> {
        check_training_data(data)?;
        if rows.is_empty() {
            return Err(ModelError::EmptyDataset);
        }
        if self.config.min_samples_leaf == 0 {
            return Err(ModelError::InvalidParameter("min_samples_leaf must be at least 1".to_string()));
        }

        self.n_features = data.n_features();
        self.n_classes = data.n_classes();

        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        let root = self.build(data, rows.to_vec(), 0, &mut rng);
        debug!(
            "Fitted tree on {} rows: depth {}, {} leaves",
            rows.len(),
            root.depth(),
            root.leaves().len()
        );
        self.root = Some(root);
        Ok(())
    }

    /// Class distribution of the leaf reached by `row`
    pub fn predict_proba_row(&self, row: ArrayView1<f64>) -> Result<&[f64], ModelError> {
        let mut node = self.root.as_ref().ok_or(ModelError::NotFitted("DecisionTree"))?;
        loop {
            match node {
                Node::Leaf { probabilities, .. } => return Ok(probabilities.as_slice()),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature] <= *threshold { &**left } else { &**right };
                }
            }
        }
    }

    pub fn depth(&self) -> usize {
        self.root.as_ref().map_or(0, Node::depth)
    }

    /// Training samples per leaf, left to right
    pub fn leaf_sizes(&self) -> Vec<usize> {
        self.root.as_ref().map_or_else(Vec::new, Node::leaves)
    }

    pub(crate) fn n_features(&self) -> usize {
        self.n_features
    }

    fn class_counts(&self, data: &Dataset, rows: &[usize]) -> Vec<usize> {
        let mut counts = vec![0; self.n_classes];
        for &r in rows {
            counts[data.targets[r]] += 1;
        }
        counts
    }

    fn build(&self, data: &Dataset, rows: Vec<usize>, depth: usize, rng: &mut ChaCha8Rng) -> Node {
        let n = rows.len();
        let counts = self.class_counts(data, &rows);
        let impurity = self.config.criterion.impurity(&counts, n);

        let too_small = n < self.config.min_samples_split.max(2 * self.config.min_samples_leaf);
        let too_deep = self.config.max_depth.is_some_and(|max| depth >= max);
        if impurity <= 1e-12 || too_small || too_deep {
            return Self::leaf(&counts, n);
        }

        match self.best_split(data, &rows, &counts, impurity, rng) {
            Some((feature, threshold)) => {
                let (left, right): (Vec<usize>, Vec<usize>) = rows
                    .into_iter()
                    .partition(|&r| data.features[[r, feature]] <= threshold);
                Node::Split {
                    feature,
                    threshold,
                    left: Box::new(self.build(data, left, depth + 1, rng)),
                    right: Box::new(self.build(data, right, depth + 1, rng)),
                }
            }
            None => Self::leaf(&counts, n),
        }
    }

    fn leaf(counts: &[usize], n: usize) -> Node {
        Node::Leaf {
            probabilities: counts.iter().map(|&c| c as f64 / n as f64).collect(),
            n_samples: n,
        }
    }

    /// Lowest weighted child impurity over a shuffled subset of features.
    ///
    /// Features are scanned in shuffled order and only a strictly better
    /// split replaces the current best, so the seed decides ties.
    fn best_split(
        &self,
        data: &Dataset,
        rows: &[usize],
        counts: &[usize],
        impurity: f64,
        rng: &mut ChaCha8Rng,
    ) -> Option<(usize, f64)> {
        let n = rows.len();
        let leaf = self.config.min_samples_leaf;
        let criterion = self.config.criterion;

        let mut features: Vec<usize> = (0..self.n_features).collect();
        features.shuffle(rng);
        features.truncate(self.config.max_features.unwrap_or(self.n_features).clamp(1, self.n_features));

        let mut best_score = impurity * n as f64;
        let mut best: Option<(usize, f64)> = None;

        for &feature in &features {
            let mut sorted: Vec<(f64, usize)> = rows
                .iter()
                .map(|&r| (data.features[[r, feature]], data.targets[r]))
                .collect();
            sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut left = vec![0usize; counts.len()];
            let mut right = counts.to_vec();

            for i in 0..n - 1 {
                let (value, target) = sorted[i];
                left[target] += 1;
                right[target] -= 1;

                let next = sorted[i + 1].0;
                let n_left = i + 1;
                let n_right = n - n_left;
                if value == next || n_left < leaf || n_right < leaf {
                    continue;
                }

                let score = n_left as f64 * criterion.impurity(&left, n_left)
                    + n_right as f64 * criterion.impurity(&right, n_right);
                if score < best_score - 1e-12 {
                    best_score = score;
                    let mid = value + (next - value) / 2.0;
                    best = Some((feature, if mid < next { mid } else { value }));
                }
            }
        }
        best
    }
}

impl Classifier for DecisionTree {
    fn name(&self) -> &'static str {
        "DecisionTree"
    }

    fn fit(&mut self, data: &Dataset) -> Result<(), ModelError> {
        let rows: Vec<usize> = (0..data.n_samples()).collect();
        self.fit_rows(data, &rows)
    }

    fn predict(&self, features: &Array2<f64>) -> Result<Vec<usize>, ModelError> {
        if self.root.is_none() {
            return Err(ModelError::NotFitted("DecisionTree"));
        }
        check_width(self.n_features, features)?;
        features
            .rows()
            .into_iter()
            .map(|row| self.predict_proba_row(row).map(argmax))
            .collect()
    }
}
