//! Set and Repetition Durations

use crate::{CleaningError, DURATION_COLUMN};
use sensor_table::SensorTable;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Elapsed time of one set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetDuration {
    pub set: u32,
    pub category: String,
    /// Whole seconds between the earliest and latest sample of the set
    pub seconds: f64,
}

/// Average set duration of a category and the derived duration of one repetition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryDuration {
    pub category: String,
    /// Row-weighted mean of the duration column
    pub mean_set_seconds: f64,
    /// Expected repetitions per set, if configured
    pub expected_reps: Option<u32>,
    /// `mean_set_seconds / expected_reps`
    pub rep_seconds: Option<f64>,
}

/// Compute the duration of every set, in order of first appearance
pub fn set_durations(table: &SensorTable) -> Vec<SetDuration> {
    let index = table.index();

    table
        .set_groups()
        .into_iter()
        .map(|group| {
            let start = group.rows.iter().map(|&r| index[r]).min();
            let stop = group.rows.iter().map(|&r| index[r]).max();
            let seconds = match (start, stop) {
                (Some(start), Some(stop)) => (stop - start).num_seconds() as f64,
                _ => 0.0,
            };

            SetDuration {
                set: group.set,
                category: table.categories()[group.rows[0]].clone(),
                seconds,
            }
        })
        .collect()
}

/// Return a copy of `table` with a `duration` column broadcast to every row of each set
pub fn annotate_durations(table: &SensorTable) -> Result<SensorTable, CleaningError> {
    let durations: BTreeMap<u32, f64> = set_durations(table)
        .into_iter()
        .map(|d| (d.set, d.seconds))
        .collect();

    let column: Vec<f64> = table
        .sets()
        .iter()
        .map(|set| durations.get(set).copied().unwrap_or(f64::NAN))
        .collect();

    let mut annotated = table.clone();
    annotated.insert_column(DURATION_COLUMN, column)?;

    info!("Annotated durations for {} sets", durations.len());
    Ok(annotated)
}

/// Mean duration per category divided by the expected repetitions per set.
///
/// Categories missing from `expected_reps` still report their mean set duration.
pub fn rep_durations(
    table: &SensorTable,
    expected_reps: &BTreeMap<String, u32>,
) -> Result<Vec<CategoryDuration>, CleaningError> {
    let durations = table.column(DURATION_COLUMN)?;

    let mut sums: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
    for (category, &duration) in table.categories().iter().zip(durations) {
        if duration.is_nan() {
            continue;
        }
        let entry = sums.entry(category.as_str()).or_insert((0.0, 0));
        entry.0 += duration;
        entry.1 += 1;
    }

    let mut result = Vec::with_capacity(sums.len());
    for (category, (sum, count)) in sums {
        let mean_set_seconds = sum / count as f64;
        let expected = expected_reps.get(category).copied();

        let rep_seconds = match expected {
            Some(0) => {
                return Err(CleaningError::InvalidConfig(format!(
                    "expected reps for category {} must be positive",
                    category
                )))
            }
            Some(reps) => Some(mean_set_seconds / reps as f64),
            None => {
                warn!("No expected rep count for category {}", category);
                None
            }
        };

        info!(
            "Category {}: mean set {:.2}s, rep {:?}s",
            category, mean_set_seconds, rep_seconds
        );
        result.push(CategoryDuration {
            category: category.to_string(),
            mean_set_seconds,
            expected_reps: expected,
            rep_seconds,
        });
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    /// Two sets: set 1 spans 0..=12.4s (heavy), set 2 spans 20..=40s (medium)
    fn two_set_table() -> SensorTable {
        let start = Utc.timestamp_millis_opt(1_600_000_000_000).unwrap();
        let mut index = Vec::new();
        let mut sets = Vec::new();
        let mut categories = Vec::new();

        for i in 0..=62 {
            index.push(start + Duration::milliseconds(i * 200));
            sets.push(1);
            categories.push("heavy".to_string());
        }
        for i in 0..=100 {
            index.push(start + Duration::seconds(20) + Duration::milliseconds(i * 200));
            sets.push(2);
            categories.push("medium".to_string());
        }

        let n = index.len();
        SensorTable::new(index, sets, categories, vec!["squat".into(); n], vec!["A".into(); n]).unwrap()
    }

    #[test]
    fn test_set_durations() {
        let durations = set_durations(&two_set_table());
        assert_eq!(durations.len(), 2);
        // 12.4s truncates to whole seconds
        assert_eq!(durations[0].seconds, 12.0);
        assert_eq!(durations[1].seconds, 20.0);
        assert_eq!(durations[1].category, "medium");
    }

    #[test]
    fn test_duration_broadcast_to_every_row() {
        let table = two_set_table();
        let annotated = annotate_durations(&table).unwrap();
        let column = annotated.column(DURATION_COLUMN).unwrap();

        for (set, duration) in annotated.sets().iter().zip(column) {
            match set {
                1 => assert_eq!(*duration, 12.0),
                2 => assert_eq!(*duration, 20.0),
                _ => unreachable!(),
            }
        }
        assert!(!table.has_column(DURATION_COLUMN));
    }

    #[test]
    fn test_rep_durations() {
        let annotated = annotate_durations(&two_set_table()).unwrap();
        let reps = BTreeMap::from([("heavy".to_string(), 5), ("medium".to_string(), 10)]);

        let result = rep_durations(&annotated, &reps).unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].category, "heavy");
        assert!((result[0].rep_seconds.unwrap() - 2.4).abs() < 1e-9);
        assert!((result[1].rep_seconds.unwrap() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_unconfigured_category_has_no_rep_duration() {
        let annotated = annotate_durations(&two_set_table()).unwrap();
        let reps = BTreeMap::from([("heavy".to_string(), 5)]);

        let result = rep_durations(&annotated, &reps).unwrap();
        assert_eq!(result[1].rep_seconds, None);
        assert_eq!(result[1].mean_set_seconds, 20.0);
    }

    #[test]
    fn test_zero_expected_reps_is_rejected() {
        let annotated = annotate_durations(&two_set_table()).unwrap();
        let reps = BTreeMap::from([("heavy".to_string(), 0)]);
        assert!(matches!(
            rep_durations(&annotated, &reps),
            Err(CleaningError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_rep_durations_requires_annotation() {
        assert!(rep_durations(&two_set_table(), &BTreeMap::new()).is_err());
    }
}
