//! Small labelled datasets for unit tests

use crate::Dataset;
use chrono::{TimeZone, Utc};
use ndarray::Array2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sensor_table::SensorTable;

/// One row per label with two numeric columns `f1` and `f2`
pub fn labelled_table(labels: &[&str]) -> SensorTable {
    let n = labels.len();
    SensorTable::new(
        (0..n).map(|i| Utc.timestamp_millis_opt(i as i64 * 200).unwrap()).collect(),
        vec![1; n],
        vec!["heavy".to_string(); n],
        labels.iter().map(|l| l.to_string()).collect(),
        vec!["A".to_string(); n],
    )
    .unwrap()
    .with_column("f1", (0..n).map(|i| i as f64).collect())
    .unwrap()
    .with_column("f2", (0..n).map(|i| (i * i) as f64).collect())
    .unwrap()
}

/// Alternating classes `a`/`b`.
///
/// `x0` separates the classes with a wide margin, `x1` is pure noise and
/// `x2` overlaps between the classes.
pub fn toy_dataset(n: usize, seed: u64) -> Dataset {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let targets: Vec<usize> = (0..n).map(|i| i % 2).collect();

    let mut features = Array2::zeros((n, 3));
    for (row, &t) in targets.iter().enumerate() {
        let sign = if t == 0 { -1.0 } else { 1.0 };
        features[[row, 0]] = sign * 2.0 + rng.gen_range(-0.5..0.5);
        features[[row, 1]] = rng.gen_range(-3.0..3.0);
        features[[row, 2]] = sign * 0.5 + rng.gen_range(-1.0..1.0);
    }

    Dataset {
        feature_names: vec!["x0".to_string(), "x1".to_string(), "x2".to_string()],
        features,
        targets,
        classes: vec!["a".to_string(), "b".to_string()],
    }
}

/// Three well separated Gaussian-like blobs in two dimensions
pub fn blobs(per_class: usize, seed: u64) -> Dataset {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let centres = [(0.0, 0.0), (6.0, 6.0), (-6.0, 6.0)];
    let n = per_class * centres.len();

    let mut features = Array2::zeros((n, 2));
    let mut targets = Vec::with_capacity(n);
    for (class, (cx, cy)) in centres.iter().enumerate() {
        for i in 0..per_class {
            let row = class * per_class + i;
            features[[row, 0]] = cx + rng.gen_range(-1.0..1.0);
            features[[row, 1]] = cy + rng.gen_range(-1.0..1.0);
            targets.push(class);
        }
    }

    Dataset {
        feature_names: vec!["u".to_string(), "v".to_string()],
        features,
        targets,
        classes: vec!["bench".to_string(), "ohp".to_string(), "squat".to_string()],
    }
}
