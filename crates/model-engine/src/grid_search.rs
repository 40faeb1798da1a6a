//! Cross-Validated Grid Search

use crate::{accuracy, Classifier, Dataset, ModelError};
use rayon::prelude::*;
use std::fmt::Debug;
use tracing::{debug, info};

/// Best candidate of a grid search
#[derive(Debug, Clone)]
pub struct GridResult<P> {
    pub params: P,
    /// Mean accuracy over the validation folds
    pub mean_accuracy: f64,
    /// Candidates that could be scored, with their mean accuracy
    pub scores: Vec<(P, f64)>,
}

/// Score every candidate with stratified `folds`-fold cross-validation.
///
/// The highest mean accuracy wins; ties go to the earlier candidate.
/// Candidates whose classifier fails on any fold are left out, and an error
/// is returned only if no candidate can be scored.
pub fn grid_search<P, C, F>(
    data: &Dataset,
    candidates: &[P],
    folds: usize,
    seed: u64,
    build: F,
) -> Result<GridResult<P>, ModelError>
where
    P: Clone + Debug + Send + Sync,
    C: Classifier,
    F: Fn(&P) -> C + Sync,
{
    if candidates.is_empty() {
        return Err(ModelError::InvalidParameter("empty parameter grid".to_string()));
    }
    let splits = data.stratified_folds(folds, seed)?;
    let parts: Vec<(Dataset, Dataset)> = splits
        .iter()
        .map(|(train, test)| (data.subset(train), data.subset(test)))
        .collect();

    let results: Vec<Result<f64, ModelError>> = candidates
        .par_iter()
        .map(|params| -> Result<f64, ModelError> {
            let mut total = 0.0;
            for (train, test) in &parts {
                let mut model = build(params);
                model.fit(train)?;
                total += accuracy(&test.targets, &model.predict(&test.features)?)?;
            }
            Ok(total / parts.len() as f64)
        })
        .collect();

    let mut scores = Vec::with_capacity(candidates.len());
    for (params, result) in candidates.iter().zip(results) {
        match result {
            Ok(score) => {
                debug!("Grid candidate {:?}: {:.4}", params, score);
                scores.push((params.clone(), score));
            }
            Err(e) => debug!("Grid candidate {:?} failed: {}", params, e),
        }
    }

    let mut best: Option<&(P, f64)> = None;
    for entry in &scores {
        if best.map_or(true, |b| entry.1 > b.1) {
            best = Some(entry);
        }
    }
    let (params, mean_accuracy) = best
        .cloned()
        .ok_or_else(|| ModelError::InvalidParameter("no grid candidate could be scored".to_string()))?;

    info!(
        "Grid search over {} candidates ({} folds): best {:?} at {:.4}",
        candidates.len(),
        folds,
        params,
        mean_accuracy
    );
    Ok(GridResult {
        params,
        mean_accuracy,
        scores,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::toy_dataset;
    use crate::{DecisionTree, KNearestNeighbors, TreeConfig};

    #[test]
    fn test_picks_reasonable_k() {
        let data = toy_dataset(60, 4);
        let result = grid_search(&data, &[1usize, 3, 5], 5, 0, |&k| KNearestNeighbors::new(k)).unwrap();

        assert_eq!(result.scores.len(), 3);
        assert!(result.mean_accuracy > 0.9);
        assert!([1, 3, 5].contains(&result.params));
    }

    #[test]
    fn test_failing_candidates_are_skipped() {
        let data = toy_dataset(20, 4);
        // 16 training rows per fold, so k = 50 cannot be fitted
        let result = grid_search(&data, &[50usize, 3], 5, 0, |&k| KNearestNeighbors::new(k)).unwrap();
        assert_eq!(result.params, 3);
        assert_eq!(result.scores.len(), 1);
    }

    #[test]
    fn test_all_candidates_failing() {
        let data = toy_dataset(20, 4);
        assert!(grid_search(&data, &[100usize], 5, 0, |&k| KNearestNeighbors::new(k)).is_err());
    }

    #[test]
    fn test_tree_grid() {
        let data = toy_dataset(80, 2);
        let grid: Vec<TreeConfig> = [2, 10, 50]
            .into_iter()
            .map(|leaf| TreeConfig {
                min_samples_leaf: leaf,
                ..Default::default()
            })
            .collect();
        let result = grid_search(&data, &grid, 4, 1, |c| DecisionTree::new(c.clone())).unwrap();
        assert!(result.params.min_samples_leaf < 50);
    }
}
