//! Exercise Classification Pipeline
//!
//! Loads a sensor recording, engineers features, selects a feature subset
//! and scores five classifier families on five feature sets.

use chrono::Utc;
use feature_engine::{cumulative_feature_sets, FeatureGroups, FeatureSet};
use model_engine::{evaluate, forward_selection, Dataset, SelectionArtifact, SelectionResult};
use sensor_table::{load_snapshot, read_csv, SensorTable};
use std::path::{Path, PathBuf};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;
use uuid::Uuid;

mod config;
mod error;
mod report;
mod stages;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::{
    ArtifactConfig, ClusterSettings, DataConfig, OutputConfig, PcaConfig, PipelineConfig, RenderConfig, SplitConfig,
    ENV_PREFIX,
};
pub use error::PipelineError;
pub use report::{FeatureSetSummary, PipelineReport, SelectionSummary, WrittenFiles};
pub use stages::{prepare_features, PreparedData};

/// Initialize logging
pub fn init_logging(level: &str, json: bool) -> Result<(), PipelineError> {
    let level: Level = level
        .parse()
        .map_err(|_| PipelineError::InvalidConfig(format!("unknown log level {:?}", level)))?;

    let builder = FmtSubscriber::builder().with_max_level(level).with_target(true);
    let result = if json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };
    result.map_err(|e| PipelineError::Logging(e.to_string()))
}

/// Read a CSV recording, or a table snapshot for any other extension
pub fn load_table(path: &Path) -> Result<SensorTable, PipelineError> {
    let is_csv = path
        .extension()
        .map_or(false, |ext| ext.eq_ignore_ascii_case("csv"));
    let table = if is_csv { read_csv(path)? } else { load_snapshot(path)? };
    info!("Loaded {} rows from {}", table.len(), path.display());
    Ok(table)
}

/// Run every stage on `raw` and collect the report
pub fn run(raw: &SensorTable, config: &PipelineConfig) -> Result<PipelineReport, PipelineError> {
    config.validate()?;
    let run_id = Uuid::new_v4();
    let started_at = Utc::now();
    info!("Pipeline run {} started", run_id);

    let prepared = prepare_features(raw, config)?;
    if let Some(name) = &config.output.snapshot_file {
        std::fs::create_dir_all(&config.output.dir)?;
        sensor_table::save_snapshot(&prepared.table, config.output.dir.join(name))?;
    }

    let dataset = Dataset::from_table_all(&prepared.table)?;
    let (train, test) = dataset.train_test_split(config.split.test_ratio, config.split.seed)?;
    info!(
        "Split {} rows into {} train / {} test over {} classes",
        dataset.n_samples(),
        train.n_samples(),
        test.n_samples(),
        dataset.n_classes()
    );

    let groups = FeatureGroups::from_columns(&dataset.feature_names, &config.feature_sets)?;
    let mut sets = cumulative_feature_sets(&groups);

    let (selection, reused, artifact) = select_features(&train, config)?;
    sets.push(FeatureSet::selected(selection.selected.iter().cloned()));

    let outcome = evaluate(&train, &test, &sets, &config.evaluation)?;

    let report = PipelineReport {
        run_id,
        started_at,
        finished_at: Utc::now(),
        rows_loaded: raw.len(),
        rows_used: prepared.table.len(),
        train_rows: train.n_samples(),
        test_rows: test.n_samples(),
        classes: dataset.classes.clone(),
        set_durations: prepared.set_durations,
        rep_durations: prepared.rep_durations,
        explained_variance: prepared.explained_variance,
        inertia: prepared.inertia,
        feature_sets: sets
            .iter()
            .map(|s| FeatureSetSummary {
                name: s.name.clone(),
                columns: s.len(),
            })
            .collect(),
        selection: SelectionSummary::new(&selection, reused, artifact),
        scores: outcome.scores,
        best: outcome.best,
        render: config.render.clone(),
    };
    info!("Pipeline run {} finished", run_id);
    Ok(report)
}

/// Reuse a compatible selection artifact or run forward selection and persist it
fn select_features(
    train: &Dataset,
    config: &PipelineConfig,
) -> Result<(SelectionResult, bool, PathBuf), PipelineError> {
    let path = config.artifact_path();

    if config.artifact.reuse && path.exists() {
        match SelectionArtifact::load(&path) {
            Ok(artifact) if artifact.is_compatible(&config.selection, train) => {
                info!("Reusing selection artifact {} from {}", artifact.run_id, path.display());
                return Ok((artifact.result(), true, path));
            }
            Ok(_) => info!("Selection artifact {} is stale, recomputing", path.display()),
            Err(e) => warn!("Ignoring unreadable selection artifact {}: {}", path.display(), e),
        }
    }

    let result = forward_selection(train, &config.selection)?;
    SelectionArtifact::new(&result, &config.selection, train).save(&path)?;
    Ok((result, false, path))
}
