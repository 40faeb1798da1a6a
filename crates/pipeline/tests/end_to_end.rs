//! End-to-end runs on a synthetic two-exercise recording

use model_engine::{Criterion, ModelKind, NetworkConfig};
use pipeline::{load_table, run, PipelineConfig};
use std::f64::consts::PI;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

const ROWS_PER_SET: usize = 120;

/// Two sets, one bench press and one squat, 6 sensor channels at 5 Hz.
///
/// `phase` shifts every channel, giving a different recording of the same shape.
fn write_recording(path: &Path, phase: f64) {
    let mut csv = String::from("timestamp,set,category,label,participant,acc_x,acc_y,acc_z,gyr_x,gyr_y,gyr_z\n");
    let start_ms: i64 = 1_547_219_280_000;

    for (s, (label, category, freq)) in [("bench", "heavy", 0.4), ("squat", "medium", 1.1)].iter().enumerate() {
        for i in 0..ROWS_PER_SET {
            let ts = start_ms + s as i64 * 60_000 + i as i64 * 200;
            let t = i as f64 / 5.0;
            write!(csv, "{},{},{},{},A", ts, s + 1, category, label).unwrap();
            for c in 0..6 {
                let jitter = ((i * 13 + c * 5) % 7) as f64 / 70.0;
                let value = (2.0 * PI * freq * t + c as f64 + phase).sin() * (1.0 + s as f64) + jitter;
                write!(csv, ",{:.5}", value).unwrap();
            }
            csv.push('\n');
        }
    }
    fs::write(path, csv).unwrap();
}

fn quick_config(output: &Path) -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.output.dir = output.to_path_buf();
    config.cluster.kmeans.n_init = 2;
    config.cluster.inertia_ks = vec![2, 3, 4];
    config.selection.max_features = 3;
    config.selection.min_samples_leaf = 5;

    let eval = &mut config.evaluation;
    eval.folds = 3;
    eval.rf_min_samples_leaf = vec![2, 10];
    eval.rf_n_estimators = vec![5];
    eval.dt_min_samples_leaf = vec![2, 10];
    eval.criteria = vec![Criterion::Gini];
    eval.knn_neighbors = vec![1, 5];
    eval.network = NetworkConfig {
        hidden_layers: vec![8],
        max_iter: 50,
        ..Default::default()
    };
    config
}

#[test]
fn test_full_run_scores_every_cell() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("recording.csv");
    write_recording(&input, 0.0);

    let config = quick_config(&dir.path().join("out"));
    let table = load_table(&input).unwrap();
    assert_eq!(table.len(), 2 * ROWS_PER_SET);

    let report = run(&table, &config).unwrap();

    assert_eq!(report.classes, vec!["bench".to_string(), "squat".to_string()]);
    assert_eq!(report.feature_sets.len(), 5);
    assert_eq!(report.scores.len(), 25);
    for set in &report.feature_sets {
        let rows = report.scores.records.iter().filter(|r| r.feature_set == set.name).count();
        assert_eq!(rows, 5);
    }
    for record in &report.scores.records {
        if let Some(acc) = record.accuracy {
            assert!((0.0..=1.0).contains(&acc));
        }
    }
    assert!(report.scores.get(ModelKind::DecisionTree, "Feature Set 1").is_some());

    assert!(report.selection.selected.len() <= 3);
    assert_eq!(report.selection.selected.len(), report.selection.scores.len());
    assert!(!report.selection.reused);

    let durations: Vec<f64> = report.set_durations.iter().map(|d| d.seconds).collect();
    assert_eq!(durations, vec![23.0, 23.0]);
    assert_eq!(report.explained_variance.len(), 6);
    assert_eq!(report.render.style, "fivethirtyeight");
}

#[test]
fn test_outputs_and_artifact_reuse() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("recording.csv");
    write_recording(&input, 0.0);
    let out = dir.path().join("out");
    let config = quick_config(&out);
    let table = load_table(&input).unwrap();

    let first = run(&table, &config).unwrap();
    let written = first.write(&config.output).unwrap();

    let results = fs::read_to_string(&written.results).unwrap();
    let mut lines = results.lines();
    assert_eq!(lines.next(), Some("model,feature_set,accuracy"));
    assert_eq!(lines.count(), 25);
    assert!(out.join("selection.json").exists());

    let report = pipeline::PipelineReport::read_json(&written.report).unwrap();
    assert_eq!(report.run_id, first.run_id);

    let second = run(&table, &config).unwrap();
    assert!(second.selection.reused);
    assert_eq!(second.selection.selected, first.selection.selected);
}

#[test]
fn test_stale_artifact_is_recomputed() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("recording.csv");
    write_recording(&input, 0.0);
    let out = dir.path().join("out");
    let config = quick_config(&out);
    let table = load_table(&input).unwrap();

    let first = run(&table, &config).unwrap();
    assert!(!first.selection.reused);

    let mut reseeded = config.clone();
    reseeded.selection.seed = 99;
    reseeded.selection.min_samples_leaf = 1;
    let second = run(&table, &reseeded).unwrap();
    assert!(!second.selection.reused);

    // the artifact now belongs to the reseeded run
    let third = run(&table, &reseeded).unwrap();
    assert!(third.selection.reused);
    assert_eq!(third.selection.selected, second.selection.selected);

    let other = dir.path().join("other.csv");
    write_recording(&other, 0.7);
    let other_table = load_table(&other).unwrap();
    let fourth = run(&other_table, &reseeded).unwrap();
    assert!(!fourth.selection.reused);

    let mut fresh = reseeded.clone();
    fresh.artifact.reuse = false;
    fresh.output.dir = dir.path().join("fresh");
    let expected = run(&other_table, &fresh).unwrap();
    assert_eq!(fourth.selection.selected, expected.selection.selected);
}
