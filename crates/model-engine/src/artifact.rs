//! Persisted Forward Selection Results

use crate::{Dataset, ModelError, SelectionConfig, SelectionResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;
use tracing::{info, warn};
use uuid::Uuid;

/// Current artifact layout version
pub const ARTIFACT_VERSION: u32 = 2;

/// Identity of the training data a selection was computed on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataFingerprint {
    pub rows: usize,
    pub classes: Vec<String>,
    pub feature_names: Vec<String>,
    /// SHA256 over names, classes, targets and the feature matrix, hex encoded
    pub digest: String,
}

impl DataFingerprint {
    pub fn of(data: &Dataset) -> Self {
        let mut hasher = Sha256::new();
        for name in data.feature_names.iter().chain(&data.classes) {
            hasher.update((name.len() as u64).to_le_bytes());
            hasher.update(name.as_bytes());
        }
        for &target in &data.targets {
            hasher.update((target as u64).to_le_bytes());
        }
        for value in data.features.iter() {
            hasher.update(value.to_bits().to_le_bytes());
        }

        Self {
            rows: data.n_samples(),
            classes: data.classes.clone(),
            feature_names: data.feature_names.clone(),
            digest: hex::encode(hasher.finalize()),
        }
    }
}

/// Forward selection output written to disk so later runs can skip the search.
///
/// Selection depends on the seed, so the artifact pins the exact
/// configuration and training data it was produced from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionArtifact {
    pub version: u32,
    pub created_at: DateTime<Utc>,
    /// Identifier of the run that produced the artifact
    pub run_id: Uuid,
    pub config: SelectionConfig,
    pub data: DataFingerprint,
    pub selected: Vec<String>,
    pub scores: Vec<f64>,
}

impl SelectionArtifact {
    pub fn new(result: &SelectionResult, config: &SelectionConfig, train: &Dataset) -> Self {
        Self {
            version: ARTIFACT_VERSION,
            created_at: Utc::now(),
            run_id: Uuid::new_v4(),
            config: config.clone(),
            data: DataFingerprint::of(train),
            selected: result.selected.clone(),
            scores: result.scores.clone(),
        }
    }

    pub fn result(&self) -> SelectionResult {
        SelectionResult {
            selected: self.selected.clone(),
            scores: self.scores.clone(),
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ModelError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        info!("Saved selection artifact {} to {}", self.run_id, path.display());
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let artifact: Self = serde_json::from_str(&fs::read_to_string(path)?)?;
        if artifact.version != ARTIFACT_VERSION {
            return Err(ModelError::Artifact(format!(
                "{} has version {}, expected {}",
                path.display(),
                artifact.version,
                ARTIFACT_VERSION
            )));
        }
        if artifact.selected.len() != artifact.scores.len() {
            return Err(ModelError::Artifact(format!(
                "{} lists {} features but {} scores",
                path.display(),
                artifact.selected.len(),
                artifact.scores.len()
            )));
        }
        Ok(artifact)
    }

    /// Whether this artifact can stand in for running `config` on `train`
    pub fn is_compatible(&self, config: &SelectionConfig, train: &Dataset) -> bool {
        if &self.config != config {
            warn!("Selection artifact was built with a different selection config");
            return false;
        }
        let data = DataFingerprint::of(train);
        if self.data != data {
            warn!(
                "Selection artifact was built on other training data ({} rows, digest {}), now {} rows, digest {}",
                self.data.rows, self.data.digest, data.rows, data.digest
            );
            return false;
        }
        if let Some(missing) = self.selected.iter().find(|name| !train.feature_names.contains(name)) {
            warn!("Selection artifact refers to unknown column {}", missing);
            return false;
        }
        true
    }
}
