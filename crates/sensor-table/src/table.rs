//! Column-Oriented Sensor Table

use crate::TableError;
use chrono::{DateTime, Utc};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Named numeric column (`NaN` marks a missing value)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NumericColumn {
    pub name: String,
    pub values: Vec<f64>,
}

/// Row positions belonging to one set, in index order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetGroup {
    pub set: u32,
    pub rows: Vec<usize>,
}

/// Timestamped sensor samples plus derived feature columns.
///
/// Every column has exactly `len()` values. Stages never mutate a table they
/// were handed; they clone it and return the transformed copy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SensorTable {
    index: Vec<DateTime<Utc>>,
    columns: Vec<NumericColumn>,
    sets: Vec<u32>,
    categories: Vec<String>,
    labels: Vec<String>,
    participants: Vec<String>,
}

impl SensorTable {
    /// Create a table with its index and categorical columns; numeric columns are added afterwards
    pub fn new(
        index: Vec<DateTime<Utc>>,
        sets: Vec<u32>,
        categories: Vec<String>,
        labels: Vec<String>,
        participants: Vec<String>,
    ) -> Result<Self, TableError> {
        let expected = index.len();
        for (column, actual) in [
            ("set", sets.len()),
            ("category", categories.len()),
            ("label", labels.len()),
            ("participant", participants.len()),
        ] {
            if actual != expected {
                return Err(TableError::LengthMismatch {
                    column: column.to_string(),
                    expected,
                    actual,
                });
            }
        }

        Ok(Self {
            index,
            columns: Vec::new(),
            sets,
            categories,
            labels,
            participants,
        })
    }

    /// Builder-style variant of [`insert_column`](Self::insert_column)
    pub fn with_column(mut self, name: impl Into<String>, values: Vec<f64>) -> Result<Self, TableError> {
        self.insert_column(name, values)?;
        Ok(self)
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Check if the table has no rows
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn index(&self) -> &[DateTime<Utc>] {
        &self.index
    }

    pub fn sets(&self) -> &[u32] {
        &self.sets
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn participants(&self) -> &[String] {
        &self.participants
    }

    /// Numeric column names in insertion order
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    /// Get a numeric column by name
    pub fn column(&self, name: &str) -> Result<&[f64], TableError> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
            .ok_or_else(|| TableError::MissingColumn(name.to_string()))
    }

    /// Insert a numeric column, replacing any column with the same name in place
    pub fn insert_column(&mut self, name: impl Into<String>, values: Vec<f64>) -> Result<(), TableError> {
        let name = name.into();
        if values.len() != self.len() {
            return Err(TableError::LengthMismatch {
                column: name,
                expected: self.len(),
                actual: values.len(),
            });
        }

        match self.columns.iter_mut().find(|c| c.name == name) {
            Some(existing) => existing.values = values,
            None => self.columns.push(NumericColumn { name, values }),
        }
        Ok(())
    }

    /// Remove a numeric column, returning its values
    pub fn remove_column(&mut self, name: &str) -> Option<Vec<f64>> {
        let pos = self.columns.iter().position(|c| c.name == name)?;
        Some(self.columns.remove(pos).values)
    }

    /// Fail with the first missing name
    pub fn require_columns<S: AsRef<str>>(&self, names: &[S]) -> Result<(), TableError> {
        for name in names {
            if !self.has_column(name.as_ref()) {
                return Err(TableError::MissingColumn(name.as_ref().to_string()));
            }
        }
        Ok(())
    }

    /// Number of missing values in a column
    pub fn missing_count(&self, name: &str) -> Result<usize, TableError> {
        Ok(self.column(name)?.iter().filter(|v| v.is_nan()).count())
    }

    /// Gather the named columns into a row-major `rows x columns` matrix
    pub fn to_matrix<S: AsRef<str>>(&self, names: &[S]) -> Result<Array2<f64>, TableError> {
        let columns = names
            .iter()
            .map(|n| self.column(n.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Array2::from_shape_fn((self.len(), columns.len()), |(row, col)| {
            columns[col][row]
        }))
    }

    /// Row positions grouped by set, ordered by each set's first appearance
    pub fn set_groups(&self) -> Vec<SetGroup> {
        let mut position: HashMap<u32, usize> = HashMap::new();
        let mut groups: Vec<SetGroup> = Vec::new();

        for (row, &set) in self.sets.iter().enumerate() {
            match position.get(&set) {
                Some(&idx) => groups[idx].rows.push(row),
                None => {
                    position.insert(set, groups.len());
                    groups.push(SetGroup { set, rows: vec![row] });
                }
            }
        }
        groups
    }

    /// New table containing the given rows, in the given order
    pub fn take_rows(&self, rows: &[usize]) -> SensorTable {
        SensorTable {
            index: rows.iter().map(|&r| self.index[r]).collect(),
            columns: self
                .columns
                .iter()
                .map(|c| NumericColumn {
                    name: c.name.clone(),
                    values: rows.iter().map(|&r| c.values[r]).collect(),
                })
                .collect(),
            sets: rows.iter().map(|&r| self.sets[r]).collect(),
            categories: rows.iter().map(|&r| self.categories[r].clone()).collect(),
            labels: rows.iter().map(|&r| self.labels[r].clone()).collect(),
            participants: rows.iter().map(|&r| self.participants[r].clone()).collect(),
        }
    }

    /// Drop every row that has a missing value in any numeric column
    pub fn drop_missing(&self) -> SensorTable {
        let rows: Vec<usize> = (0..self.len())
            .filter(|&r| self.columns.iter().all(|c| !c.values[r].is_nan()))
            .collect();
        self.take_rows(&rows)
    }

    /// Keep every `step`-th row starting from the first
    pub fn step_rows(&self, step: usize) -> SensorTable {
        let rows: Vec<usize> = (0..self.len()).step_by(step.max(1)).collect();
        self.take_rows(&rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn table(sets: &[u32]) -> SensorTable {
        let n = sets.len();
        SensorTable::new(
            (0..n)
                .map(|i| Utc.timestamp_millis_opt(i as i64 * 200).unwrap())
                .collect(),
            sets.to_vec(),
            vec!["heavy".to_string(); n],
            vec!["squat".to_string(); n],
            vec!["A".to_string(); n],
        )
        .unwrap()
    }

    #[test]
    fn test_insert_and_replace_column() {
        let mut t = table(&[1, 1, 2]);
        t.insert_column("acc_x", vec![1.0, 2.0, 3.0]).unwrap();
        t.insert_column("acc_y", vec![0.0; 3]).unwrap();
        t.insert_column("acc_x", vec![4.0, 5.0, 6.0]).unwrap();

        assert_eq!(t.column_names(), vec!["acc_x", "acc_y"]);
        assert_eq!(t.column("acc_x").unwrap(), &[4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_length_mismatch() {
        let mut t = table(&[1, 1, 2]);
        let err = t.insert_column("acc_x", vec![1.0]).unwrap_err();
        assert!(matches!(err, TableError::LengthMismatch { expected: 3, actual: 1, .. }));
    }

    #[test]
    fn test_missing_column() {
        let t = table(&[1]);
        assert!(matches!(t.column("gyr_z"), Err(TableError::MissingColumn(_))));
        assert!(t.require_columns(&["gyr_z"]).is_err());
        assert!(t.to_matrix(&["gyr_z"]).is_err());
    }

    #[test]
    fn test_set_groups_in_order_of_appearance() {
        let t = table(&[7, 7, 3, 3, 3, 9]);
        let groups = t.set_groups();
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0], SetGroup { set: 7, rows: vec![0, 1] });
        assert_eq!(groups[1].rows, vec![2, 3, 4]);
        assert_eq!(groups[2].set, 9);
    }

    #[test]
    fn test_drop_missing_and_step_rows() {
        let t = table(&[1, 1, 1, 1, 1])
            .with_column("acc_x", vec![1.0, f64::NAN, 3.0, 4.0, 5.0])
            .unwrap()
            .with_column("acc_y", vec![1.0, 2.0, 3.0, f64::NAN, 5.0])
            .unwrap();

        let clean = t.drop_missing();
        assert_eq!(clean.len(), 3);
        assert_eq!(clean.column("acc_x").unwrap(), &[1.0, 3.0, 5.0]);

        let stepped = clean.step_rows(2);
        assert_eq!(stepped.column("acc_x").unwrap(), &[1.0, 5.0]);
        assert_eq!(stepped.index()[1], clean.index()[2]);
    }

    #[test]
    fn test_to_matrix_layout() {
        let t = table(&[1, 1])
            .with_column("a", vec![1.0, 2.0])
            .unwrap()
            .with_column("b", vec![3.0, 4.0])
            .unwrap();
        let m = t.to_matrix(&["b", "a"]).unwrap();
        assert_eq!(m.dim(), (2, 2));
        assert_eq!(m[[0, 0]], 3.0);
        assert_eq!(m[[1, 1]], 2.0);
    }
}
