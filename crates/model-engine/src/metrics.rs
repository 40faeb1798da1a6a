//! Classification Metrics

use crate::ModelError;
use serde::{Deserialize, Serialize};

/// Share of exact matches between `truth` and `predicted`
pub fn accuracy(truth: &[usize], predicted: &[usize]) -> Result<f64, ModelError> {
    if truth.len() != predicted.len() {
        return Err(ModelError::DimensionMismatch {
            expected: truth.len(),
            actual: predicted.len(),
        });
    }
    if truth.is_empty() {
        return Err(ModelError::EmptyDataset);
    }
    let correct = truth.iter().zip(predicted).filter(|(t, p)| t == p).count();
    Ok(correct as f64 / truth.len() as f64)
}

/// Counts of (true class, predicted class) pairs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub classes: Vec<String>,
    /// `counts[true][predicted]`
    pub counts: Vec<Vec<usize>>,
}

impl ConfusionMatrix {
    pub fn new(classes: &[String], truth: &[usize], predicted: &[usize]) -> Result<Self, ModelError> {
        if truth.len() != predicted.len() {
            return Err(ModelError::DimensionMismatch {
                expected: truth.len(),
                actual: predicted.len(),
            });
        }

        let k = classes.len();
        let mut counts = vec![vec![0; k]; k];
        for (&t, &p) in truth.iter().zip(predicted) {
            if t >= k || p >= k {
                return Err(ModelError::InvalidData(format!(
                    "class index {} outside {} classes",
                    t.max(p),
                    k
                )));
            }
            counts[t][p] += 1;
        }

        Ok(Self {
            classes: classes.to_vec(),
            counts,
        })
    }

    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }

    /// Diagonal share of all counts
    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        let diagonal: usize = (0..self.classes.len()).map(|i| self.counts[i][i]).sum();
        diagonal as f64 / total as f64
    }
}
