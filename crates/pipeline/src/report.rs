//! Run report and result files

use crate::{OutputConfig, PipelineError, RenderConfig};
use chrono::{DateTime, Utc};
use model_engine::{BestCell, ScoreTable, SelectionResult};
use serde::{Deserialize, Serialize};
use signal_cleaning::{CategoryDuration, SetDuration};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;

/// Size of one evaluated feature set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSetSummary {
    pub name: String,
    pub columns: usize,
}

/// Forward selection outcome and where it came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionSummary {
    pub selected: Vec<String>,
    /// Validation accuracy after each addition
    pub scores: Vec<f64>,
    /// Loaded from an existing artifact instead of recomputed
    pub reused: bool,
    pub artifact: PathBuf,
}

impl SelectionSummary {
    pub fn new(result: &SelectionResult, reused: bool, artifact: PathBuf) -> Self {
        Self {
            selected: result.selected.clone(),
            scores: result.scores.clone(),
            reused,
            artifact,
        }
    }
}

/// Everything a run produces besides the results CSV
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub rows_loaded: usize,
    /// Rows left after feature engineering
    pub rows_used: usize,
    pub train_rows: usize,
    pub test_rows: usize,
    pub classes: Vec<String>,
    pub set_durations: Vec<SetDuration>,
    pub rep_durations: Vec<CategoryDuration>,
    pub explained_variance: Vec<f64>,
    pub inertia: Vec<(usize, f64)>,
    pub feature_sets: Vec<FeatureSetSummary>,
    pub selection: SelectionSummary,
    pub scores: ScoreTable,
    pub best: Option<BestCell>,
    pub render: RenderConfig,
}

/// Paths of the files written by [`PipelineReport::write`]
#[derive(Debug, Clone, PartialEq)]
pub struct WrittenFiles {
    pub results: PathBuf,
    pub report: PathBuf,
}

impl PipelineReport {
    /// Write the results CSV and the JSON report into the output directory
    pub fn write(&self, output: &OutputConfig) -> Result<WrittenFiles, PipelineError> {
        fs::create_dir_all(&output.dir)?;

        let results = output.dir.join(&output.results_file);
        self.scores.write_csv(&results)?;

        let report = output.dir.join(&output.report_file);
        self.write_json(&report)?;

        info!("Wrote {} and {}", results.display(), report.display());
        Ok(WrittenFiles { results, report })
    }

    pub fn write_json(&self, path: &Path) -> Result<(), PipelineError> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn read_json(path: &Path) -> Result<Self, PipelineError> {
        Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
    }
}
