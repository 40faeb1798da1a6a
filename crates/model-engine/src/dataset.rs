//! Labelled Feature Matrix

use crate::ModelError;
use ndarray::{Array2, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use sensor_table::SensorTable;
use std::collections::BTreeSet;
use tracing::debug;

/// Feature matrix with integer-encoded class targets.
///
/// `classes` is shared by every subset derived from a dataset, so a class
/// index means the same label in train, test and validation parts.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub feature_names: Vec<String>,
    /// `samples x features`
    pub features: Array2<f64>,
    /// Index into `classes` per sample
    pub targets: Vec<usize>,
    /// Sorted distinct labels
    pub classes: Vec<String>,
}

impl Dataset {
    /// Build from the named table columns, with the `label` column as target.
    ///
    /// Missing values are rejected.
    pub fn from_table<S: AsRef<str>>(table: &SensorTable, columns: &[S]) -> Result<Self, ModelError> {
        if table.is_empty() {
            return Err(ModelError::EmptyDataset);
        }
        let features = table.to_matrix(columns)?;
        if let Some((row, col)) = features
            .indexed_iter()
            .find(|(_, v)| v.is_nan())
            .map(|(pos, _)| pos)
        {
            return Err(ModelError::InvalidData(format!(
                "missing value in column {} at row {}",
                columns[col].as_ref(),
                row
            )));
        }

        let classes: Vec<String> = table
            .labels()
            .iter()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let targets = table
            .labels()
            .iter()
            .map(|label| classes.iter().position(|c| c == label).unwrap_or(0))
            .collect();

        Ok(Self {
            feature_names: columns.iter().map(|c| c.as_ref().to_string()).collect(),
            features,
            targets,
            classes,
        })
    }

    /// Every numeric column of the table is a feature
    pub fn from_table_all(table: &SensorTable) -> Result<Self, ModelError> {
        let columns: Vec<String> = table.column_names().into_iter().map(String::from).collect();
        Self::from_table(table, &columns)
    }

    pub fn n_samples(&self) -> usize {
        self.features.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.features.ncols()
    }

    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.n_samples() == 0
    }

    /// Samples per class, indexed like `classes`
    pub fn class_counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.n_classes()];
        for &t in &self.targets {
            counts[t] += 1;
        }
        counts
    }

    /// Rows in the given order (duplicates allowed)
    pub fn subset(&self, rows: &[usize]) -> Dataset {
        Dataset {
            feature_names: self.feature_names.clone(),
            features: self.features.select(Axis(0), rows),
            targets: rows.iter().map(|&r| self.targets[r]).collect(),
            classes: self.classes.clone(),
        }
    }

    /// Restrict to the named feature columns, in the given order
    pub fn select_columns<S: AsRef<str>>(&self, names: &[S]) -> Result<Dataset, ModelError> {
        let positions = names
            .iter()
            .map(|name| {
                self.feature_names
                    .iter()
                    .position(|f| f == name.as_ref())
                    .ok_or_else(|| ModelError::UnknownColumn(name.as_ref().to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Dataset {
            feature_names: names.iter().map(|n| n.as_ref().to_string()).collect(),
            features: self.features.select(Axis(1), &positions),
            targets: self.targets.clone(),
            classes: self.classes.clone(),
        })
    }

    /// Stratified split into `(train, test)`.
    ///
    /// Each class contributes `round(count * test_ratio)` rows to the test
    /// side, clamped so a class with at least two rows appears on both sides.
    /// Rows keep their original relative order.
    pub fn train_test_split(&self, test_ratio: f64, seed: u64) -> Result<(Dataset, Dataset), ModelError> {
        if !(test_ratio > 0.0 && test_ratio < 1.0) {
            return Err(ModelError::InvalidParameter(format!(
                "test ratio must lie in (0, 1), got {}",
                test_ratio
            )));
        }
        if self.n_samples() < 2 {
            return Err(ModelError::InvalidData(format!(
                "cannot split {} samples",
                self.n_samples()
            )));
        }

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut train = Vec::with_capacity(self.n_samples());
        let mut test = Vec::new();

        for mut rows in self.rows_by_class() {
            rows.shuffle(&mut rng);
            let count = rows.len();
            let mut n_test = (count as f64 * test_ratio).round() as usize;
            if count >= 2 {
                n_test = n_test.clamp(1, count - 1);
            }
            test.extend_from_slice(&rows[..n_test]);
            train.extend_from_slice(&rows[n_test..]);
        }

        train.sort_unstable();
        test.sort_unstable();
        debug!("Stratified split: {} train, {} test rows", train.len(), test.len());
        Ok((self.subset(&train), self.subset(&test)))
    }

    /// Stratified `k`-fold partition as `(train_rows, test_rows)` pairs
    pub fn stratified_folds(&self, k: usize, seed: u64) -> Result<Vec<(Vec<usize>, Vec<usize>)>, ModelError> {
        if k < 2 {
            return Err(ModelError::InvalidParameter(format!("need at least 2 folds, got {}", k)));
        }
        if self.n_samples() < k {
            return Err(ModelError::InvalidData(format!(
                "cannot build {} folds from {} samples",
                k,
                self.n_samples()
            )));
        }

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut fold_of = vec![0usize; self.n_samples()];
        let mut next = 0;
        for mut rows in self.rows_by_class() {
            rows.shuffle(&mut rng);
            for row in rows {
                fold_of[row] = next % k;
                next += 1;
            }
        }

        Ok((0..k)
            .map(|fold| {
                let (test, train): (Vec<usize>, Vec<usize>) =
                    (0..self.n_samples()).partition(|&r| fold_of[r] == fold);
                (train, test)
            })
            .collect())
    }

    fn rows_by_class(&self) -> Vec<Vec<usize>> {
        let mut rows = vec![Vec::new(); self.n_classes()];
        for (row, &t) in self.targets.iter().enumerate() {
            rows[t].push(row);
        }
        rows
    }
}
