//! Synthetic recordings for pipeline tests

use chrono::{Duration, TimeZone, Utc};
use sensor_table::{SensorTable, SENSOR_COLUMNS};
use std::f64::consts::PI;

/// Four sets (bench/squat x heavy/medium) of `rows_per_set` samples at 5 Hz.
///
/// Bench presses oscillate slowly on the x axes, squats faster on the y axes,
/// with a small deterministic jitter on every channel.
pub fn synthetic_recording(rows_per_set: usize) -> SensorTable {
    let sets = [
        (1, "bench", "heavy", "A"),
        (2, "squat", "heavy", "A"),
        (3, "bench", "medium", "B"),
        (4, "squat", "medium", "B"),
    ];
    let start = Utc.with_ymd_and_hms(2019, 1, 11, 15, 8, 0).unwrap();

    let mut index = Vec::new();
    let mut set_ids = Vec::new();
    let mut categories = Vec::new();
    let mut labels = Vec::new();
    let mut participants = Vec::new();
    let mut columns: Vec<Vec<f64>> = vec![Vec::new(); SENSOR_COLUMNS.len()];

    for (s, (set, label, category, participant)) in sets.iter().enumerate() {
        let set_start = start + Duration::seconds(s as i64 * 60);
        let (freq, axis) = if *label == "bench" { (0.4, 0) } else { (0.9, 1) };

        for i in 0..rows_per_set {
            index.push(set_start + Duration::milliseconds(i as i64 * 200));
            set_ids.push(*set);
            categories.push(category.to_string());
            labels.push(label.to_string());
            participants.push(participant.to_string());

            let t = i as f64 / 5.0;
            for (c, column) in columns.iter_mut().enumerate() {
                let jitter = ((i * 31 + c * 17 + s * 7) % 11) as f64 / 11.0 - 0.5;
                let base = if c % 3 == axis { (2.0 * PI * freq * t).sin() } else { 0.2 * c as f64 };
                column.push(base + 0.1 * jitter);
            }
        }
    }

    let mut table = SensorTable::new(index, set_ids, categories, labels, participants).unwrap();
    for (name, values) in SENSOR_COLUMNS.iter().zip(columns) {
        table.insert_column(*name, values).unwrap();
    }
    table
}
