//! Synthetic sensor tables for unit tests

use chrono::{Duration, TimeZone, Utc};
use sensor_table::{SensorTable, SENSOR_COLUMNS};
use std::f64::consts::PI;

/// `sets` consecutive sets of `rows_per_set` samples at 5 Hz.
///
/// Even sets are "squat" with a slow rhythm, odd sets are "bench" with a
/// faster one, so both time and frequency features separate the labels.
pub fn synthetic_table(sets: u32, rows_per_set: usize) -> SensorTable {
    let start = Utc.timestamp_millis_opt(1_600_000_000_000).unwrap();
    let n = sets as usize * rows_per_set;

    let mut index = Vec::with_capacity(n);
    let mut set_ids = Vec::with_capacity(n);
    let mut labels = Vec::with_capacity(n);
    let mut columns: Vec<Vec<f64>> = vec![Vec::with_capacity(n); SENSOR_COLUMNS.len()];

    for set in 0..sets {
        let squat = set % 2 == 0;
        let rhythm = if squat { 0.4 } else { 1.1 };
        for i in 0..rows_per_set {
            let row = set as usize * rows_per_set + i;
            let t = i as f64 / 5.0;
            index.push(start + Duration::milliseconds(row as i64 * 200));
            set_ids.push(set + 1);
            labels.push(if squat { "squat" } else { "bench" }.to_string());

            for (c, column) in columns.iter_mut().enumerate() {
                let phase = c as f64 * 0.7;
                let offset = if squat { 0.2 * c as f64 } else { -0.3 };
                column.push((2.0 * PI * rhythm * t + phase).sin() + offset);
            }
        }
    }

    let mut table = SensorTable::new(
        index,
        set_ids,
        vec!["heavy".to_string(); n],
        labels,
        vec!["A".to_string(); n],
    )
    .unwrap();
    for (name, values) in SENSOR_COLUMNS.iter().zip(columns) {
        table.insert_column(*name, values).unwrap();
    }
    table
}
