//! Pipeline configuration

use crate::PipelineError;
use feature_engine::{ClusterConfig, FeatureSetConfig, FrequencyConfig, MagnitudeGroup, TemporalConfig};
use model_engine::{EvaluationConfig, SelectionConfig};
use sensor_table::SENSOR_COLUMNS;
use serde::{Deserialize, Serialize};
use signal_cleaning::LowPassConfig;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Prefix of environment overrides, e.g. `EXERCISE__SPLIT__SEED=7`
pub const ENV_PREFIX: &str = "EXERCISE";

/// Complete pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub data: DataConfig,
    pub lowpass: LowPassConfig,
    pub pca: PcaConfig,
    /// Magnitude columns derived from sensor axes
    pub magnitudes: Vec<MagnitudeGroup>,
    pub temporal: TemporalConfig,
    pub frequency: FrequencyConfig,
    /// Keep every n-th row after dropping incomplete ones
    pub subsample_step: usize,
    pub cluster: ClusterSettings,
    pub split: SplitConfig,
    pub feature_sets: FeatureSetConfig,
    pub selection: SelectionConfig,
    pub artifact: ArtifactConfig,
    pub evaluation: EvaluationConfig,
    pub output: OutputConfig,
    pub render: RenderConfig,
}

/// Input data settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// CSV file or table snapshot
    pub input: Option<PathBuf>,
    /// Sensor columns cleaned and used as predictors
    pub predictors: Vec<String>,
    /// Expected repetitions per set, by category
    pub expected_reps: BTreeMap<String, u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PcaConfig {
    /// Principal components appended to the table
    pub components: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterSettings {
    #[serde(flatten)]
    pub kmeans: ClusterConfig,
    /// Cluster counts of the reported inertia curve
    pub inertia_ks: Vec<usize>,
}

/// Train/test split
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    pub test_ratio: f64,
    pub seed: u64,
}

/// Forward selection artifact handling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactConfig {
    /// Artifact location (default: `selection.json` in the output directory)
    pub path: Option<PathBuf>,
    /// Load a compatible artifact instead of running forward selection
    pub reuse: bool,
}

/// Output locations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub results_file: String,
    pub report_file: String,
    /// Also write the engineered table as a snapshot
    pub snapshot_file: Option<String>,
}

/// Plot styling handed to whatever renders the report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub style: String,
    /// Width and height in inches
    pub figure_size: (f64, f64),
    pub dpi: u32,
    pub line_width: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data: DataConfig::default(),
            lowpass: LowPassConfig::default(),
            pca: PcaConfig::default(),
            magnitudes: MagnitudeGroup::defaults(),
            temporal: TemporalConfig::default(),
            frequency: FrequencyConfig::default(),
            subsample_step: 2,
            cluster: ClusterSettings::default(),
            split: SplitConfig::default(),
            feature_sets: FeatureSetConfig::default(),
            selection: SelectionConfig::default(),
            artifact: ArtifactConfig::default(),
            evaluation: EvaluationConfig::default(),
            output: OutputConfig::default(),
            render: RenderConfig::default(),
        }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            input: None,
            predictors: SENSOR_COLUMNS.iter().map(|c| c.to_string()).collect(),
            expected_reps: BTreeMap::from([("heavy".to_string(), 5), ("medium".to_string(), 10)]),
        }
    }
}

impl Default for PcaConfig {
    fn default() -> Self {
        Self { components: 3 }
    }
}

impl Default for ClusterSettings {
    fn default() -> Self {
        Self {
            kmeans: ClusterConfig::default(),
            inertia_ks: (2..10).collect(),
        }
    }
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            test_ratio: 0.25,
            seed: 42,
        }
    }
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            path: None,
            reuse: true,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("results"),
            results_file: "results.csv".to_string(),
            report_file: "report.json".to_string(),
            snapshot_file: None,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            style: "fivethirtyeight".to_string(),
            figure_size: (20.0, 5.0),
            dpi: 100,
            line_width: 2.0,
        }
    }
}

impl PipelineConfig {
    /// Load defaults, then the optional file, then `EXERCISE__*` environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self, PipelineError> {
        Self::load_layers(path, Self::environment())
    }

    /// `EXERCISE__SECTION__KEY` variables, e.g. `EXERCISE__SPLIT__SEED=7`
    fn environment() -> config::Environment {
        config::Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true)
    }

    fn load_layers(path: Option<&Path>, env: config::Environment) -> Result<Self, PipelineError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }
        let settings = builder.add_source(env).build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings no stage can run with
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.data.predictors.is_empty() {
            return Err(PipelineError::InvalidConfig("no predictor columns".to_string()));
        }
        if self.pca.components == 0 || self.pca.components > self.data.predictors.len() {
            return Err(PipelineError::InvalidConfig(format!(
                "pca.components must be in 1..={}, got {}",
                self.data.predictors.len(),
                self.pca.components
            )));
        }
        if self.subsample_step == 0 {
            return Err(PipelineError::InvalidConfig("subsample_step must be at least 1".to_string()));
        }
        if !(self.split.test_ratio > 0.0 && self.split.test_ratio < 1.0) {
            return Err(PipelineError::InvalidConfig(format!(
                "split.test_ratio must be in (0, 1), got {}",
                self.split.test_ratio
            )));
        }
        if self.evaluation.iterations == 0 {
            return Err(PipelineError::InvalidConfig("evaluation.iterations must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Where the selection artifact is read from and written to
    pub fn artifact_path(&self) -> PathBuf {
        self.artifact
            .path
            .clone()
            .unwrap_or_else(|| self.output.dir.join("selection.json"))
    }

    /// Predictors plus the magnitude columns, the inputs of the window features
    pub fn window_columns(&self) -> Vec<String> {
        let mut columns = self.data.predictors.clone();
        columns.extend(self.magnitudes.iter().map(|g| g.name.clone()));
        columns
    }
}
