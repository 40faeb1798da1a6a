//! Greedy Forward Feature Selection

use crate::{accuracy, Classifier, Criterion, Dataset, DecisionTree, ModelError, TreeConfig};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Forward selection parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Number of selection rounds
    pub max_features: usize,
    /// Share of the training split held out to score candidates
    pub validation_ratio: f64,
    /// Seed of the validation split and of the scoring tree
    pub seed: u64,
    /// Leaf size of the scoring tree
    pub min_samples_leaf: usize,
    pub criterion: Criterion,
    /// Columns never offered as candidates, e.g. `duration`, which is
    /// constant within a set and so identifies the set
    pub exclude: Vec<String>,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            max_features: 10,
            validation_ratio: 0.25,
            seed: 0,
            min_samples_leaf: 50,
            criterion: Criterion::Gini,
            exclude: Vec::new(),
        }
    }
}

/// Outcome of forward selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionResult {
    /// Selected columns in the order they were added
    pub selected: Vec<String>,
    /// Validation accuracy right after each addition
    pub scores: Vec<f64>,
}

impl SelectionResult {
    /// `(round, column, accuracy)` triples, rounds counted from 1
    pub fn curve(&self) -> Vec<(usize, &str, f64)> {
        self.selected
            .iter()
            .zip(&self.scores)
            .enumerate()
            .map(|(i, (column, score))| (i + 1, column.as_str(), *score))
            .collect()
    }
}

/// Greedily add the column that maximises validation accuracy of a decision tree.
///
/// Every column of `train` not listed in `exclude` is a candidate. Each
/// round scores every remaining candidate together with the columns
/// already selected; the best one (first in column order on ties) is kept.
/// Stops after `max_features` rounds or when no candidate is left.
/// Accuracy is not guaranteed to increase from round to round.
///
/// The result is not seed independent. `seed` picks the validation rows and
/// the feature order the scoring tree scans, and the tree keeps the first of
/// equally good splits, so two seeds can select different columns. Persist
/// the result as a [`SelectionArtifact`](crate::SelectionArtifact) to reuse
/// one selection across runs.
pub fn forward_selection(train: &Dataset, config: &SelectionConfig) -> Result<SelectionResult, ModelError> {
    let (fit_part, validation) = train.train_test_split(config.validation_ratio, config.seed)?;

    let mut candidates: Vec<String> = train
        .feature_names
        .iter()
        .filter(|name| !config.exclude.contains(name))
        .cloned()
        .collect();
    let mut selected: Vec<String> = Vec::new();
    let mut scores = Vec::new();

    info!(
        "Forward selection over {} candidates (max {}), {} fit / {} validation rows",
        candidates.len(),
        config.max_features,
        fit_part.n_samples(),
        validation.n_samples()
    );

    for round in 0..config.max_features {
        if candidates.is_empty() {
            break;
        }

        let results: Vec<Result<f64, ModelError>> = candidates
            .par_iter()
            .map(|candidate| {
                let mut columns = selected.clone();
                columns.push(candidate.clone());
                score_columns(&fit_part, &validation, &columns, config)
            })
            .collect();

        let mut best: Option<(usize, f64)> = None;
        for (i, result) in results.into_iter().enumerate() {
            let score = result?;
            if best.map_or(true, |(_, b)| score > b) {
                best = Some((i, score));
            }
        }

        let Some((index, score)) = best else {
            break;
        };
        let column = candidates.remove(index);
        debug!("Round {}: added {} (accuracy {:.4})", round + 1, column, score);
        selected.push(column);
        scores.push(score);
    }

    info!("Selected {} features: {:?}", selected.len(), selected);
    Ok(SelectionResult { selected, scores })
}

fn score_columns(
    fit_part: &Dataset,
    validation: &Dataset,
    columns: &[String],
    config: &SelectionConfig,
) -> Result<f64, ModelError> {
    let mut tree = DecisionTree::new(TreeConfig {
        criterion: config.criterion,
        min_samples_leaf: config.min_samples_leaf,
        seed: config.seed,
        ..Default::default()
    });
    tree.fit(&fit_part.select_columns(columns)?)?;
    let predicted = tree.predict(&validation.select_columns(columns)?.features)?;
    accuracy(&validation.targets, &predicted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::toy_dataset;
    use ndarray::{concatenate, Axis};

    fn config(max_features: usize) -> SelectionConfig {
        SelectionConfig {
            max_features,
            min_samples_leaf: 2,
            ..Default::default()
        }
    }

    #[test]
    fn test_informative_column_first() {
        let data = toy_dataset(120, 5);
        let result = forward_selection(&data, &config(2)).unwrap();

        assert_eq!(result.selected[0], "x0");
        assert_eq!(result.selected.len(), 2);
        assert_eq!(result.scores.len(), 2);
        assert!(result.scores[0] > 0.95);
    }

    #[test]
    fn test_stops_when_candidates_run_out() {
        let data = toy_dataset(60, 1);
        let result = forward_selection(&data, &config(10)).unwrap();
        assert_eq!(result.selected.len(), 3);
        assert_eq!(result.curve().len(), 3);
        assert_eq!(result.curve()[0].0, 1);
    }

    #[test]
    fn test_excluded_columns_are_not_candidates() {
        let mut data = toy_dataset(60, 1);
        // a perfect predictor named like the duration column
        let leak = data.features.column(0).to_owned().insert_axis(Axis(1));
        data.features = concatenate(Axis(1), &[data.features.view(), leak.view()]).unwrap();
        data.feature_names.push("duration".to_string());

        let result = forward_selection(&data, &config(10)).unwrap();
        assert_eq!(result.selected.len(), 4);
        assert!(result.selected.contains(&"duration".to_string()));

        let excluding = SelectionConfig {
            exclude: vec!["duration".to_string()],
            ..config(10)
        };
        let result = forward_selection(&data, &excluding).unwrap();
        assert!(!result.selected.contains(&"duration".to_string()));
        assert_eq!(result.selected.len(), 3);
    }

    #[test]
    fn test_same_seed_same_selection() {
        let data = toy_dataset(80, 6);
        let config = SelectionConfig {
            seed: 17,
            ..config(3)
        };
        let a = forward_selection(&data, &config).unwrap();
        let b = forward_selection(&data, &config).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_selection_is_bounded() {
        let data = toy_dataset(60, 2);
        for max in 0..=2 {
            let result = forward_selection(&data, &config(max)).unwrap();
            assert!(result.selected.len() <= max);
            assert_eq!(result.selected.len(), result.scores.len());
        }
    }
}
