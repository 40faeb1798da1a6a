//! Classifier x Feature Set Evaluation
//!
//! Trains every classifier family on every candidate feature set, scores it
//! on the test split and collects the accuracies into a score table.
//! A failing classifier leaves a missing cell and the run continues.

use crate::{
    accuracy, grid_search, Classifier, ConfusionMatrix, Criterion, Dataset, DecisionTree, ForestConfig,
    GaussianNaiveBayes, KNearestNeighbors, ModelError, NetworkConfig, NeuralNetwork, RandomForest, TreeConfig,
};
use feature_engine::FeatureSet;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::{debug, info, warn};

/// Classifier families, in evaluation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelKind {
    #[serde(rename = "NN")]
    NeuralNetwork,
    #[serde(rename = "RF")]
    RandomForest,
    #[serde(rename = "KNN")]
    KNearestNeighbors,
    #[serde(rename = "DT")]
    DecisionTree,
    #[serde(rename = "NB")]
    NaiveBayes,
}

impl ModelKind {
    pub fn all() -> [ModelKind; 5] {
        [
            ModelKind::NeuralNetwork,
            ModelKind::RandomForest,
            ModelKind::KNearestNeighbors,
            ModelKind::DecisionTree,
            ModelKind::NaiveBayes,
        ]
    }

    /// Short code used in result tables
    pub fn code(&self) -> &'static str {
        match self {
            ModelKind::NeuralNetwork => "NN",
            ModelKind::RandomForest => "RF",
            ModelKind::KNearestNeighbors => "KNN",
            ModelKind::DecisionTree => "DT",
            ModelKind::NaiveBayes => "NB",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Evaluation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Repetitions averaged for the seeded classifiers (NN and RF)
    pub iterations: usize,
    /// Tune RF, KNN and DT by cross-validated grid search
    pub grid_search: bool,
    /// Cross-validation folds of the grid search
    pub folds: usize,
    /// Base seed; repetition `i` uses `seed + i`
    pub seed: u64,
    pub rf_min_samples_leaf: Vec<usize>,
    pub rf_n_estimators: Vec<usize>,
    pub dt_min_samples_leaf: Vec<usize>,
    /// Split criteria searched for RF and DT
    pub criteria: Vec<Criterion>,
    pub knn_neighbors: Vec<usize>,
    /// Used when grid search is off
    pub knn_default: usize,
    pub forest: ForestConfig,
    pub tree: TreeConfig,
    pub network: NetworkConfig,
    pub var_smoothing: f64,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            iterations: 1,
            grid_search: true,
            folds: 5,
            seed: 0,
            rf_min_samples_leaf: vec![2, 10, 50, 100, 200],
            rf_n_estimators: vec![10, 50, 100],
            dt_min_samples_leaf: vec![2, 10, 50, 100, 200],
            criteria: vec![Criterion::Gini, Criterion::Entropy],
            knn_neighbors: vec![1, 2, 5, 10],
            knn_default: 5,
            forest: ForestConfig::default(),
            tree: TreeConfig::default(),
            network: NetworkConfig::default(),
            var_smoothing: 1e-9,
        }
    }
}

impl EvaluationConfig {
    fn forest_grid(&self) -> Vec<ForestConfig> {
        let mut grid = Vec::new();
        for &min_samples_leaf in &self.rf_min_samples_leaf {
            for &n_estimators in &self.rf_n_estimators {
                for &criterion in &self.criteria {
                    grid.push(ForestConfig {
                        min_samples_leaf,
                        n_estimators,
                        criterion,
                        seed: self.seed,
                        ..self.forest.clone()
                    });
                }
            }
        }
        grid
    }

    fn tree_grid(&self) -> Vec<TreeConfig> {
        let mut grid = Vec::new();
        for &min_samples_leaf in &self.dt_min_samples_leaf {
            for &criterion in &self.criteria {
                grid.push(TreeConfig {
                    min_samples_leaf,
                    criterion,
                    seed: self.seed,
                    ..self.tree.clone()
                });
            }
        }
        grid
    }
}

/// One cell of the score table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub model: ModelKind,
    pub feature_set: String,
    /// `None` when the classifier failed
    pub accuracy: Option<f64>,
}

/// Accuracy per (model, feature set), in evaluation order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreTable {
    pub records: Vec<ScoreRecord>,
}

impl ScoreTable {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, model: ModelKind, feature_set: &str) -> Option<f64> {
        self.records
            .iter()
            .find(|r| r.model == model && r.feature_set == feature_set)
            .and_then(|r| r.accuracy)
    }

    /// Highest scored cell; the earlier record wins a tie
    pub fn best(&self) -> Option<&ScoreRecord> {
        self.best_index().map(|i| &self.records[i])
    }

    fn best_index(&self) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (i, record) in self.records.iter().enumerate() {
            if let Some(acc) = record.accuracy {
                if best.map_or(true, |(_, b)| acc > b) {
                    best = Some((i, acc));
                }
            }
        }
        best.map(|(i, _)| i)
    }

    /// Write `model,feature_set,accuracy` rows; failed cells have an empty accuracy
    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<(), ModelError> {
        let mut writer = csv::Writer::from_path(path.as_ref())?;
        writer.write_record(["model", "feature_set", "accuracy"])?;
        for record in &self.records {
            let accuracy = record.accuracy.map(|a| a.to_string()).unwrap_or_default();
            writer.write_record([record.model.code(), record.feature_set.as_str(), accuracy.as_str()])?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Best cell with its test-split confusion matrix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestCell {
    pub model: ModelKind,
    pub feature_set: String,
    pub accuracy: f64,
    pub confusion: ConfusionMatrix,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationOutcome {
    pub scores: ScoreTable,
    pub best: Option<BestCell>,
}

/// Score every classifier family on every feature set.
///
/// Unknown feature columns are an error; classifier failures are logged
/// and recorded as missing accuracies.
pub fn evaluate(
    train: &Dataset,
    test: &Dataset,
    sets: &[FeatureSet],
    config: &EvaluationConfig,
) -> Result<EvaluationOutcome, ModelError> {
    if config.iterations == 0 {
        return Err(ModelError::InvalidParameter("iterations must be at least 1".to_string()));
    }
    if train.classes != test.classes {
        return Err(ModelError::InvalidData(
            "train and test splits have different class lists".to_string(),
        ));
    }

    let mut scores = ScoreTable::default();
    let mut predictions: Vec<Option<Vec<usize>>> = Vec::new();

    for (i, set) in sets.iter().enumerate() {
        let columns = set.column_list();
        info!(
            "Evaluating feature set {}/{}: {} ({} columns)",
            i + 1,
            sets.len(),
            set.name,
            columns.len()
        );
        let train_set = train.select_columns(&columns)?;
        let test_set = test.select_columns(&columns)?;

        for kind in ModelKind::all() {
            let (accuracy, predicted) = match evaluate_cell(kind, &train_set, &test_set, config) {
                Ok((accuracy, predicted)) => {
                    info!("{} on {}: accuracy {:.4}", kind, set.name, accuracy);
                    (Some(accuracy), Some(predicted))
                }
                Err(e) => {
                    warn!("{} on {} failed: {}", kind, set.name, e);
                    (None, None)
                }
            };
            scores.records.push(ScoreRecord {
                model: kind,
                feature_set: set.name.clone(),
                accuracy,
            });
            predictions.push(predicted);
        }
    }

    let best = match scores.best_index() {
        Some(index) => {
            let record = &scores.records[index];
            match (&predictions[index], record.accuracy) {
                (Some(predicted), Some(accuracy)) => Some(BestCell {
                    model: record.model,
                    feature_set: record.feature_set.clone(),
                    accuracy,
                    confusion: ConfusionMatrix::new(&test.classes, &test.targets, predicted)?,
                }),
                _ => None,
            }
        }
        None => None,
    };

    if let Some(best) = &best {
        info!(
            "Best cell: {} on {} with accuracy {:.4}",
            best.model, best.feature_set, best.accuracy
        );
    } else {
        warn!("No classifier produced a score");
    }
    Ok(EvaluationOutcome { scores, best })
}

/// Accuracy and the test predictions of the last repetition
fn evaluate_cell(
    kind: ModelKind,
    train: &Dataset,
    test: &Dataset,
    config: &EvaluationConfig,
) -> Result<(f64, Vec<usize>), ModelError> {
    match kind {
        ModelKind::NeuralNetwork => repeated(config, |seed| {
            score(
                NeuralNetwork::new(NetworkConfig {
                    seed,
                    ..config.network.clone()
                }),
                train,
                test,
            )
        }),
        ModelKind::RandomForest => {
            let params = if config.grid_search {
                grid_search(train, &config.forest_grid(), config.folds, config.seed, |c| {
                    RandomForest::new(c.clone())
                })?
                .params
            } else {
                config.forest.clone()
            };
            debug!("RF parameters: {:?}", params);
            repeated(config, |seed| {
                score(
                    RandomForest::new(ForestConfig {
                        seed,
                        ..params.clone()
                    }),
                    train,
                    test,
                )
            })
        }
        ModelKind::KNearestNeighbors => {
            let k = if config.grid_search {
                grid_search(train, &config.knn_neighbors, config.folds, config.seed, |&k| {
                    KNearestNeighbors::new(k)
                })?
                .params
            } else {
                config.knn_default
            };
            debug!("KNN k = {}", k);
            score(KNearestNeighbors::new(k), train, test)
        }
        ModelKind::DecisionTree => {
            let params = if config.grid_search {
                grid_search(train, &config.tree_grid(), config.folds, config.seed, |c| {
                    DecisionTree::new(c.clone())
                })?
                .params
            } else {
                TreeConfig {
                    seed: config.seed,
                    ..config.tree.clone()
                }
            };
            debug!("DT parameters: {:?}", params);
            score(DecisionTree::new(params), train, test)
        }
        ModelKind::NaiveBayes => score(GaussianNaiveBayes::new(config.var_smoothing), train, test),
    }
}

fn repeated<F>(config: &EvaluationConfig, mut run: F) -> Result<(f64, Vec<usize>), ModelError>
where
    F: FnMut(u64) -> Result<(f64, Vec<usize>), ModelError>,
{
    let mut total = 0.0;
    let mut last = Vec::new();
    for i in 0..config.iterations {
        let (accuracy, predicted) = run(config.seed + i as u64)?;
        total += accuracy;
        last = predicted;
    }
    Ok((total / config.iterations as f64, last))
}

fn score<C: Classifier>(mut model: C, train: &Dataset, test: &Dataset) -> Result<(f64, Vec<usize>), ModelError> {
    model.fit(train)?;
    let predicted = model.predict(&test.features)?;
    let accuracy = accuracy(&test.targets, &predicted)?;
    debug!(
        "{} fitted on {} rows, test accuracy {:.4}",
        model.name(),
        train.n_samples(),
        accuracy
    );
    Ok((accuracy, predicted))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{blobs, toy_dataset};
    use tempfile::tempdir;

    fn quick_config() -> EvaluationConfig {
        EvaluationConfig {
            folds: 3,
            rf_min_samples_leaf: vec![2, 5],
            rf_n_estimators: vec![5],
            dt_min_samples_leaf: vec![2, 5],
            criteria: vec![Criterion::Gini],
            knn_neighbors: vec![1, 3],
            network: NetworkConfig {
                hidden_layers: vec![8],
                max_iter: 200,
                learning_rate: 1e-2,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn sets() -> Vec<FeatureSet> {
        vec![
            FeatureSet::new("Feature Set 1", ["x0"]),
            FeatureSet::new("Feature Set 2", ["x0", "x1", "x2"]),
        ]
    }

    #[test]
    fn test_model_codes() {
        let codes: Vec<&str> = ModelKind::all().iter().map(|k| k.code()).collect();
        assert_eq!(codes, vec!["NN", "RF", "KNN", "DT", "NB"]);
        assert_eq!(serde_json::to_string(&ModelKind::KNearestNeighbors).unwrap(), "\"KNN\"");
    }

    #[test]
    fn test_full_grid_of_cells() {
        let (train, test) = toy_dataset(80, 3).train_test_split(0.25, 42).unwrap();
        let outcome = evaluate(&train, &test, &sets(), &quick_config()).unwrap();

        assert_eq!(outcome.scores.len(), 10);
        for record in &outcome.scores.records {
            let acc = record.accuracy.unwrap();
            assert!((0.0..=1.0).contains(&acc));
        }
        assert!(outcome.scores.get(ModelKind::DecisionTree, "Feature Set 1").unwrap() > 0.9);

        let best = outcome.best.unwrap();
        assert_eq!(best.confusion.total(), test.n_samples());
        assert!((best.confusion.accuracy() - best.accuracy).abs() < 1e-12);
    }

    #[test]
    fn test_failures_become_missing_cells() {
        let (train, test) = blobs(10, 1).train_test_split(0.25, 0).unwrap();
        let config = EvaluationConfig {
            grid_search: false,
            // more neighbours than training rows
            knn_default: 1000,
            ..quick_config()
        };
        let outcome = evaluate(&train, &test, &[FeatureSet::new("uv", ["u", "v"])], &config).unwrap();

        assert_eq!(outcome.scores.len(), 5);
        assert_eq!(outcome.scores.get(ModelKind::KNearestNeighbors, "uv"), None);
        assert!(outcome.scores.get(ModelKind::NaiveBayes, "uv").is_some());
        assert!(outcome.best.is_some());
    }

    #[test]
    fn test_classifier_names() {
        let names = [
            NeuralNetwork::new(NetworkConfig::default()).name(),
            RandomForest::new(ForestConfig::default()).name(),
            KNearestNeighbors::new(5).name(),
            DecisionTree::new(TreeConfig::default()).name(),
            GaussianNaiveBayes::new(1e-9).name(),
        ];
        assert_eq!(
            names,
            ["NeuralNetwork", "RandomForest", "KNearestNeighbors", "DecisionTree", "GaussianNaiveBayes"]
        );
    }

    #[test]
    fn test_repeated_runs_use_consecutive_seeds() {
        let config = EvaluationConfig {
            iterations: 3,
            seed: 5,
            ..Default::default()
        };
        let mut seeds = Vec::new();
        let (mean, last) = repeated(&config, |seed| {
            seeds.push(seed);
            Ok((seed as f64 / 10.0, vec![seed as usize]))
        })
        .unwrap();

        assert_eq!(seeds, vec![5, 6, 7]);
        assert!((mean - 0.6).abs() < 1e-12);
        assert_eq!(last, vec![7]);
    }

    #[test]
    fn test_iterations_average_seeded_fits() {
        let (train, test) = toy_dataset(60, 7).train_test_split(0.25, 42).unwrap();
        let config = EvaluationConfig {
            iterations: 3,
            grid_search: false,
            seed: 11,
            ..quick_config()
        };
        let set = FeatureSet::new("all", ["x0", "x1", "x2"]);
        let outcome = evaluate(&train, &test, &[set], &config).unwrap();

        let mut network_total = 0.0;
        let mut forest_total = 0.0;
        for i in 0..3 {
            let seed = config.seed + i;
            let network = NeuralNetwork::new(NetworkConfig {
                seed,
                ..config.network.clone()
            });
            network_total += score(network, &train, &test).unwrap().0;
            let forest = RandomForest::new(ForestConfig {
                seed,
                ..config.forest.clone()
            });
            forest_total += score(forest, &train, &test).unwrap().0;
        }

        let network = outcome.scores.get(ModelKind::NeuralNetwork, "all").unwrap();
        let forest = outcome.scores.get(ModelKind::RandomForest, "all").unwrap();
        assert!((network - network_total / 3.0).abs() < 1e-12);
        assert!((forest - forest_total / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_iterations_rejected() {
        let (train, test) = toy_dataset(40, 3).train_test_split(0.25, 42).unwrap();
        let config = EvaluationConfig {
            iterations: 0,
            ..quick_config()
        };
        assert!(matches!(
            evaluate(&train, &test, &sets(), &config),
            Err(ModelError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_unknown_column_is_an_error() {
        let (train, test) = toy_dataset(40, 3).train_test_split(0.25, 42).unwrap();
        let sets = [FeatureSet::new("bad", ["missing"])];
        assert!(matches!(
            evaluate(&train, &test, &sets, &quick_config()),
            Err(ModelError::UnknownColumn(_))
        ));
    }

    #[test]
    fn test_best_prefers_earliest_on_tie() {
        let table = ScoreTable {
            records: vec![
                ScoreRecord {
                    model: ModelKind::NeuralNetwork,
                    feature_set: "a".to_string(),
                    accuracy: None,
                },
                ScoreRecord {
                    model: ModelKind::RandomForest,
                    feature_set: "a".to_string(),
                    accuracy: Some(0.9),
                },
                ScoreRecord {
                    model: ModelKind::DecisionTree,
                    feature_set: "a".to_string(),
                    accuracy: Some(0.9),
                },
            ],
        };
        assert_eq!(table.best().unwrap().model, ModelKind::RandomForest);
    }

    #[test]
    fn test_write_csv() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("results.csv");
        let table = ScoreTable {
            records: vec![
                ScoreRecord {
                    model: ModelKind::NaiveBayes,
                    feature_set: "Feature Set 1".to_string(),
                    accuracy: Some(0.5),
                },
                ScoreRecord {
                    model: ModelKind::NeuralNetwork,
                    feature_set: "Feature Set 1".to_string(),
                    accuracy: None,
                },
            ],
        };
        table.write_csv(&path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines, vec!["model,feature_set,accuracy", "NB,Feature Set 1,0.5", "NN,Feature Set 1,"]);
    }
}
